use axum::extract::multipart::Field;
use tracing::{error, info};

use crate::error::ClassifiedError;
use crate::models::ImageAsset;

/// Reads one uploaded multipart field to completion and wraps it as a
/// transport-ready asset. The content type is carried verbatim from what the
/// upload declared; whether it is a supported image format is the front-end's
/// concern. The bytes are never decoded or re-encoded here.
pub async fn encode(field: Field<'_>) -> Result<ImageAsset, ClassifiedError> {
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field.bytes().await.map_err(|e| {
        error!("❌ Failed to read uploaded image body: {}", e);
        ClassifiedError::Read
    })?;
    info!("📦 Encoded upload: {} ({} bytes)", mime_type, data.len());
    Ok(ImageAsset { mime_type, data })
}
