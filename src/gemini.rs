use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{classify, classify_status, ClassifiedError};
use crate::models::{GeneratedImage, ImageAsset};

const MODEL: &str = "gemini-2.5-flash-image";

/// Seam between the workflow and the remote model. The batch and redo code
/// only see this trait, which is what lets tests drive them with a scripted
/// generator instead of the network.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// One remote round trip: two source images plus a prompt in, one
    /// generated image out. Calls are independent; the remote model is
    /// non-deterministic and nothing is cached, so repeating a call with
    /// identical inputs is expected and safe.
    async fn generate_one(
        &self,
        person: &ImageAsset,
        outfit: &ImageAsset,
        prompt: &str,
    ) -> Result<GeneratedImage, ClassifiedError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let base_url = std::env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        Self { client: Client::new(), api_key, base_url }
    }

    fn inline_part(asset: &ImageAsset) -> serde_json::Value {
        json!({
            "inlineData": {
                "mimeType": asset.mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&asset.data),
            }
        })
    }

    async fn perform_api_call(
        &self,
        person: &ImageAsset,
        outfit: &ImageAsset,
        prompt: &str,
    ) -> Result<GeneratedImage, ClassifiedError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, MODEL, self.api_key
        );
        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));

        let request_body = json!({
            "contents": [{
                "parts": [
                    Self::inline_part(person),
                    Self::inline_part(outfit),
                    { "text": prompt },
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE", "TEXT"],
                "candidateCount": 1
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| classify(&e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        let body = response.text().await.map_err(|e| classify(&e.to_string()))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| classify(&format!("response parse error: {}", e)))?;
        extract_image(&parsed)
    }

    /// Local SVG stand-in used when the key is the literal DEMO_KEY, so the
    /// whole workflow can be exercised without API quota. Never used to mask
    /// a failed live call.
    fn placeholder_image(&self, prompt: &str) -> GeneratedImage {
        let colors = ["#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6"];
        let color = colors[prompt.len() % colors.len()];
        let svg = format!(
            r#"<svg width="400" height="500" xmlns="http://www.w3.org/2000/svg">
            <rect width="400" height="500" fill="{}" />
            <text x="200" y="240" font-family="Arial, sans-serif" font-size="26" font-weight="bold"
                  text-anchor="middle" fill="white">AI Style Fusion</text>
            <text x="200" y="280" font-family="Arial, sans-serif" font-size="13"
                  text-anchor="middle" fill="white" opacity="0.8">demo preview (no API key set)</text>
        </svg>"#,
            color
        );
        GeneratedImage {
            mime_type: "image/svg+xml".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(svg.as_bytes()),
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_one(
        &self,
        person: &ImageAsset,
        outfit: &ImageAsset,
        prompt: &str,
    ) -> Result<GeneratedImage, ClassifiedError> {
        if self.api_key == "DEMO_KEY" {
            info!("Using demo mode - no real images generated");
            return Ok(self.placeholder_image(prompt));
        }

        let image = self.perform_api_call(person, outfit, prompt).await?;
        info!(
            "✅ Generated {} image ({} base64 chars)",
            image.mime_type,
            image.data.len()
        );
        Ok(image)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

/// Pulls the first inline image out of a completed response. A response with
/// no image part is still a failure: a safety finish reason (or a prompt-level
/// block) is reported as such, anything else as a retriable unknown.
fn extract_image(resp: &GenerateContentResponse) -> Result<GeneratedImage, ClassifiedError> {
    for candidate in &resp.candidates {
        for part in &candidate.content.parts {
            if let Part::Inline { inline_data } = part {
                info!("🖼️ Found image data with mime type: {}", inline_data.mime_type);
                return Ok(GeneratedImage {
                    mime_type: inline_data.mime_type.clone(),
                    data: inline_data.data.clone(),
                });
            }
        }
    }

    if let Some(reason) = resp.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
        warn!("⚠️ Prompt blocked before generation: {}", reason);
        return Err(ClassifiedError::SafetyBlocked);
    }
    for candidate in &resp.candidates {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason.to_ascii_uppercase().contains("SAFETY") {
                warn!("⚠️ Candidate stopped by safety filter: {}", reason);
                return Err(ClassifiedError::SafetyBlocked);
            }
        }
    }

    warn!("⚠️ Model completed without returning image data");
    Err(ClassifiedError::Unknown)
}
