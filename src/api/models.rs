use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

impl ChatRequest {
    pub fn into_prompt(self) -> Result<String> {
        match self.prompt {
            Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
            _ => Err(AppError::BadRequest("Request must include a non-empty 'prompt'.".to_string())),
        }
    }
}

/// Validated `/post` body.
#[derive(Debug, PartialEq)]
pub struct PostRequest {
    pub title: String,
    pub chats: Vec<String>,
}

impl PostRequest {
    /// Validate a loosely-typed body. Non-string chat entries are rendered as
    /// JSON text; nulls are skipped.
    pub fn from_json(body: &Value) -> Result<Self> {
        let title = body
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        let chats = body.get("chats").and_then(Value::as_array);

        match chats {
            Some(chats) if !title.is_empty() && !chats.is_empty() => {
                let chats = chats
                    .iter()
                    .filter(|chat| !chat.is_null())
                    .map(|chat| match chat {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                Ok(PostRequest { title, chats })
            }
            _ => Err(AppError::BadRequest(
                "Request must include 'title' and a non-empty 'chats' list.".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_post_body() {
        let req = PostRequest::from_json(&json!({ "title": "  Crash  ", "chats": ["a", 2, null] })).unwrap();
        assert_eq!(req.title, "Crash");
        assert_eq!(req.chats, vec!["a".to_string(), "2".to_string()]);
    }

    #[test]
    fn post_body_rejections() {
        for body in [
            json!({}),
            json!({ "title": "", "chats": ["hi"] }),
            json!({ "title": "   ", "chats": ["hi"] }),
            json!({ "title": "t", "chats": [] }),
            json!({ "title": "t", "chats": "hi" }),
            json!({ "title": 5, "chats": ["hi"] }),
        ] {
            assert!(PostRequest::from_json(&body).is_err(), "accepted {}", body);
        }
    }

    #[test]
    fn chat_prompt_required() {
        assert!(ChatRequest { prompt: None }.into_prompt().is_err());
        assert!(ChatRequest { prompt: Some(" ".into()) }.into_prompt().is_err());
        assert_eq!(ChatRequest { prompt: Some("hi".into()) }.into_prompt().unwrap(), "hi");
    }
}
