use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

/// One piece of model input.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }
}

/// Text/image in, text out. Handlers only ever see this trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single-shot generation returning the full reply text.
    async fn generate(&self, parts: Vec<Part>) -> Result<String>;

    /// Streamed generation; each item is the text of one chunk.
    async fn stream(&self, prompt: &str) -> Result<BoxStream<'static, Result<String>>>;
}

/// Drain a chunk stream into one buffer.
pub async fn collect_stream(mut chunks: BoxStream<'static, Result<String>>) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl From<Part> for RequestPart {
    fn from(part: Part) -> Self {
        match part {
            Part::Text(text) => RequestPart { text: Some(text), inline_data: None },
            Part::InlineData { mime_type, data } => RequestPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type,
                    data: BASE64.encode(data),
                }),
            },
        }
    }
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn user(parts: Vec<Part>) -> Self {
        GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: parts.into_iter().map(RequestPart::from).collect(),
            }],
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if content.parts.iter().any(|part| part.text.is_some()) {
            Some(text)
        } else {
            None
        }
    }

    fn missing_text_reason(&self) -> String {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            return format!("prompt blocked: {}", reason);
        }
        match self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason) => format!("model returned no text (finish reason {})", reason),
            None => "model returned no candidates".to_string(),
        }
    }
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.llm_timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(GeminiClient {
            client,
            api_key: config.google_api_key.clone(),
            api_base: config.gemini_api_base.clone(),
            model: config.gemini_model.clone(),
        })
    }

    pub fn shared(config: &Config) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::new(Self::new(config)?))
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_base, self.model, method)
    }

    async fn post(&self, url: &str, body: &GenerateRequest) -> Result<Response> {
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(AppError::LlmError(format!(
                "Gemini API returned {}: {}",
                status,
                detail.trim()
            )));
        }
        Ok(res)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = self.endpoint("generateContent");
        tracing::debug!(model = %self.model, parts = parts.len(), "calling generateContent");

        let res = self.post(&url, &GenerateRequest::user(parts)).await?;
        let reply: GenerateResponse = res.json().await?;

        reply
            .text()
            .ok_or_else(|| AppError::LlmError(reply.missing_text_reason()))
    }

    async fn stream(&self, prompt: &str) -> Result<BoxStream<'static, Result<String>>> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        tracing::debug!(model = %self.model, "calling streamGenerateContent");

        let res = self
            .post(&url, &GenerateRequest::user(vec![Part::text(prompt)]))
            .await?;

        let state = SseState {
            body: res.bytes_stream().boxed(),
            buffer: Vec::new(),
        };
        Ok(stream::try_unfold(state, next_sse_text).boxed())
    }
}

struct SseState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
}

/// Pull lines off the event stream until one carries chunk text.
async fn next_sse_text(mut state: SseState) -> Result<Option<(String, SseState)>> {
    loop {
        if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = state.buffer.drain(..=pos).collect();
            if let Some(text) = parse_sse_line(&String::from_utf8_lossy(&line))? {
                return Ok(Some((text, state)));
            }
            continue;
        }

        match state.body.next().await {
            Some(chunk) => state.buffer.extend_from_slice(&chunk?),
            None => {
                let rest = std::mem::take(&mut state.buffer);
                return match parse_sse_line(&String::from_utf8_lossy(&rest))? {
                    Some(text) => Ok(Some((text, state))),
                    None => Ok(None),
                };
            }
        }
    }
}

/// Text carried by one `data:` line; `None` for comments, blank lines and
/// chunks without text.
fn parse_sse_line(line: &str) -> Result<Option<String>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: GenerateResponse = serde_json::from_str(payload)
        .map_err(|e| AppError::LlmError(format!("Invalid stream chunk from Gemini: {}", e)))?;
    Ok(chunk.text().filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_text_and_inline_parts() {
        let request = GenerateRequest::user(vec![
            Part::text("describe"),
            Part::InlineData { mime_type: "image/png".into(), data: vec![1, 2, 3] },
        ]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "describe" },
                        { "inline_data": { "mime_type": "image/png", "data": "AQID" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn response_text_joins_parts() {
        let reply: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }]
        }))
        .unwrap();
        assert_eq!(reply.text().as_deref(), Some("Hello there"));
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let reply: GenerateResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(reply.text(), None);
        assert_eq!(reply.missing_text_reason(), "prompt blocked: SAFETY");
    }

    #[test]
    fn empty_candidate_reports_finish_reason() {
        let reply: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert_eq!(reply.text(), None);
        assert!(reply.missing_text_reason().contains("SAFETY"));
    }

    #[test]
    fn sse_data_line_yields_text() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap().as_deref(), Some("chunk"));
    }

    #[test]
    fn sse_non_data_lines_are_skipped() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line("\r\n").unwrap(), None);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
    }

    #[test]
    fn sse_garbage_payload_is_an_error() {
        assert!(parse_sse_line("data: {not json").is_err());
    }

    #[tokio::test]
    async fn sse_stream_reassembles_split_lines() {
        let raw = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\r\n\r\n",
        )
        .as_bytes();
        let pieces: Vec<reqwest::Result<Bytes>> = raw
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let state = SseState {
            body: stream::iter(pieces).boxed(),
            buffer: Vec::new(),
        };

        let chunks = stream::try_unfold(state, next_sse_text).boxed();
        assert_eq!(collect_stream(chunks).await.unwrap(), "Hello");
    }
}
