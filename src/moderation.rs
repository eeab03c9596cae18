//! Image moderation: upload checks and the classifier round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::extract::extract_json;
use crate::llm::{LanguageModel, Part};
use crate::prompts::build_media_prompt;

/// Accepted upload types, sorted.
pub const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/gif", "image/jpeg", "image/png", "image/webp"];

const FALLBACK_NOTE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLikelihood {
    pub name: String,
    pub likelihood: Likelihood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaClassification {
    pub overall_risk: RiskLevel,
    pub categories: Vec<CategoryLikelihood>,
    pub notes: Vec<String>,
}

impl MediaClassification {
    /// Low risk, no categories, the (truncated) reply as the only note.
    pub fn fallback(raw_text: &str) -> Self {
        MediaClassification {
            overall_risk: RiskLevel::Low,
            categories: Vec::new(),
            notes: vec![raw_text.trim().chars().take(FALLBACK_NOTE_CHARS).collect()],
        }
    }
}

/// Declared content type, else a guess from the filename, else octet-stream.
pub fn resolve_mime_type(declared: Option<&str>, filename: &str) -> String {
    declared
        .and_then(|raw| raw.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
        .filter(|essence| !essence.is_empty())
        .or_else(|| mime_guess::from_path(filename).first_raw().map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

pub fn is_supported(mime_type: &str) -> bool {
    SUPPORTED_IMAGE_TYPES.contains(&mime_type)
}

/// Make sure the bytes decode as an image before they are sent anywhere.
pub fn verify_image(bytes: &[u8]) -> Result<()> {
    image::load_from_memory(bytes).map(|_| ()).map_err(|e| {
        tracing::warn!(error = %e, len = bytes.len(), "upload failed to decode");
        AppError::InvalidImage
    })
}

pub fn classification_from_reply(raw_text: &str) -> Value {
    extract_json(raw_text).unwrap_or_else(|reason| {
        tracing::warn!(?reason, "classifier reply was not JSON, using fallback");
        serde_json::to_value(MediaClassification::fallback(raw_text)).unwrap_or(Value::Null)
    })
}

pub async fn classify_media(
    model: &dyn LanguageModel,
    bytes: Vec<u8>,
    mime_type: &str,
) -> Result<Value> {
    if !is_supported(mime_type) {
        return Err(AppError::UnsupportedMediaType(mime_type.to_string()));
    }
    verify_image(&bytes)?;

    tracing::info!(mime_type, len = bytes.len(), "classifying image");
    let parts = vec![
        Part::Text(build_media_prompt()),
        Part::InlineData { mime_type: mime_type.to_string(), data: bytes },
    ];
    let raw_text = model
        .generate(parts)
        .await
        .map_err(|e| AppError::LlmError(format!("classification_failed: {}", e)))?;

    Ok(classification_from_reply(&raw_text))
}
