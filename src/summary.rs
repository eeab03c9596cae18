use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::extract::extract_json;
use crate::llm::{LanguageModel, Part};
use crate::prompts::build_summary_prompt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub summary: Vec<String>,
    pub main_problem: String,
    pub solutions: Vec<String>,
}

impl PostSummary {
    /// Raw reply kept as the only summary bullet.
    pub fn fallback(raw_text: &str) -> Self {
        let trimmed = raw_text.trim();
        PostSummary {
            summary: if raw_text.is_empty() { Vec::new() } else { vec![trimmed.to_string()] },
            main_problem: String::new(),
            solutions: Vec::new(),
        }
    }
}

/// Turn the model reply into the response body. Parsed JSON is returned as-is.
pub fn summary_from_reply(raw_text: &str) -> Value {
    extract_json(raw_text).unwrap_or_else(|reason| {
        tracing::warn!(?reason, "summary reply was not JSON, using fallback");
        serde_json::to_value(PostSummary::fallback(raw_text)).unwrap_or(Value::Null)
    })
}

pub async fn summarize_post(model: &dyn LanguageModel, title: &str, chats: &[String]) -> Result<Value> {
    let prompt = build_summary_prompt(title, chats);
    tracing::info!(title, chats = chats.len(), prompt_len = prompt.len(), "summarizing post");

    let raw_text = model.generate(vec![Part::Text(prompt)]).await?;
    Ok(summary_from_reply(&raw_text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parsed_reply_passes_through() {
        let raw = r#"Here: {"summary":["a"],"main_problem":"p","solutions":["s"],"confidence":0.4}"#;
        assert_eq!(
            summary_from_reply(raw),
            json!({ "summary": ["a"], "main_problem": "p", "solutions": ["s"], "confidence": 0.4 })
        );
    }

    #[test]
    fn prose_reply_becomes_single_bullet() {
        assert_eq!(
            summary_from_reply("  The thread is about billing.  "),
            json!({ "summary": ["The thread is about billing."], "main_problem": "", "solutions": [] })
        );
    }

    #[test]
    fn broken_json_falls_back() {
        let value = summary_from_reply("{\"summary\": [\"a\",}");
        assert_eq!(value["main_problem"], json!(""));
        assert_eq!(value["summary"], json!(["{\"summary\": [\"a\",}"]));
    }

    #[test]
    fn empty_reply_has_no_bullets() {
        assert_eq!(PostSummary::fallback(""), PostSummary::default());
    }
}
