use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// User-facing failure taxonomy. Every message is a fixed template; the raw
/// upstream error only ever reaches the diagnostic log, not the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    #[error("Could not read the uploaded image. Please re-select the file and try again.")]
    Read,
    #[error("The image service is at capacity right now. Wait a minute, then try again.")]
    RateLimited,
    #[error("The image service rejected the request. Try again with different photos.")]
    InvalidInput,
    #[error("Generation was blocked by the content safety filter. Try different source photos.")]
    SafetyBlocked,
    #[error("Image generation failed. This is usually temporary, so please try again.")]
    Unknown,
}

impl ClassifiedError {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedError::Read => "read_error",
            ClassifiedError::RateLimited => "rate_limited",
            ClassifiedError::InvalidInput => "invalid_input",
            ClassifiedError::SafetyBlocked => "safety_blocked",
            ClassifiedError::Unknown => "unknown",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ClassifiedError::Read => StatusCode::BAD_REQUEST,
            ClassifiedError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ClassifiedError::InvalidInput | ClassifiedError::SafetyBlocked => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ClassifiedError::Unknown => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.kind(), "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Substring classification of an upstream failure. First match wins; the
/// substrings track the REST error strings Gemini actually emits.
pub fn classify(raw: &str) -> ClassifiedError {
    error!("❌ Upstream generation failure: {}", raw);
    if raw.contains("429") || raw.contains("RESOURCE_EXHAUSTED") {
        ClassifiedError::RateLimited
    } else if raw.contains("400") || raw.contains("INVALID_ARGUMENT") {
        ClassifiedError::InvalidInput
    } else if raw.to_ascii_lowercase().contains("safety") {
        ClassifiedError::SafetyBlocked
    } else {
        ClassifiedError::Unknown
    }
}

/// Status-code classification for non-2xx HTTP responses. Prefers the
/// structured code over text matching; the body-substring shim only runs for
/// statuses with no direct mapping.
pub fn classify_status(status: u16, body: &str) -> ClassifiedError {
    match status {
        429 => {
            error!("❌ Upstream HTTP 429: {}", body);
            ClassifiedError::RateLimited
        }
        400 => {
            error!("❌ Upstream HTTP 400: {}", body);
            ClassifiedError::InvalidInput
        }
        _ => classify(&format!("status={} body={}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rate_limit_by_code_substring() {
        assert_eq!(classify("Error: 429 Too Many Requests"), ClassifiedError::RateLimited);
        assert_eq!(classify("RESOURCE_EXHAUSTED: quota"), ClassifiedError::RateLimited);
    }

    #[test]
    fn invalid_input_by_code_substring() {
        assert_eq!(classify("INVALID_ARGUMENT: bad image"), ClassifiedError::InvalidInput);
        assert_eq!(classify("HTTP 400 Bad Request"), ClassifiedError::InvalidInput);
    }

    #[test]
    fn safety_match_is_case_insensitive() {
        assert_eq!(classify("blocked for SAFETY reasons"), ClassifiedError::SafetyBlocked);
        assert_eq!(classify("candidate dropped: safety"), ClassifiedError::SafetyBlocked);
    }

    #[test]
    fn anything_else_is_unknown() {
        assert_eq!(classify("socket hang up"), ClassifiedError::Unknown);
        assert_eq!(classify(""), ClassifiedError::Unknown);
    }

    #[test]
    fn rate_limit_outranks_invalid_input() {
        // "429" and "400" can both appear in one proxy error body.
        assert_eq!(classify("429 via proxy (upstream 400)"), ClassifiedError::RateLimited);
    }

    #[test]
    fn status_code_wins_over_body_text() {
        assert_eq!(classify_status(429, "something about safety"), ClassifiedError::RateLimited);
        assert_eq!(classify_status(400, "no recognizable text"), ClassifiedError::InvalidInput);
        assert_eq!(classify_status(503, "safety system overloaded"), ClassifiedError::SafetyBlocked);
        assert_eq!(classify_status(500, "internal"), ClassifiedError::Unknown);
    }
}
