//! Best-effort recovery of a JSON object from chatty model output.

use serde_json::Value;

/// Why a reply could not be used as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    NoJsonBlock,
    InvalidJson(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(Value),
    Fallback(FallbackReason),
}

impl Extraction {
    /// The parsed value, or whatever `fallback` builds from the reason.
    pub fn unwrap_or_else<F>(self, fallback: F) -> Value
    where
        F: FnOnce(FallbackReason) -> Value,
    {
        match self {
            Extraction::Parsed(value) => value,
            Extraction::Fallback(reason) => fallback(reason),
        }
    }
}

/// Greedy match from the first `{` to the last `}`. Braces are not balanced,
/// so two separate objects in one reply come back as a single invalid block.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn extract_json(text: &str) -> Extraction {
    let Some(block) = extract_json_block(text) else {
        return Extraction::Fallback(FallbackReason::NoJsonBlock);
    };

    match serde_json::from_str::<Value>(block) {
        Ok(value) => Extraction::Parsed(value),
        Err(e) => Extraction::Fallback(FallbackReason::InvalidJson(e.to_string())),
    }
}
