use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Json, Multipart, State,
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::api::models::{ChatRequest, PostRequest};
use crate::api::response;
use crate::error::{AppError, Result};
use crate::formatter::parse_response;
use crate::llm::collect_stream;
use crate::moderation::{classify_media, resolve_mime_type};
use crate::summary::summarize_post;
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub fn create_router(app_state: AppState) -> Router {
    let upload_limit = app_state.config.upload_body_limit();

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_handler))
        .route("/post", post(post_handler))
        .route(
            "/moderate-media",
            post(moderate_media_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn index_handler() -> Response {
    response::page(INDEX_HTML)
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let prompt = req.into_prompt()?;
    tracing::info!(prompt_len = prompt.len(), "chat request");
    let start_time = Instant::now();

    let chunks = state.model.stream(&prompt).await?;
    let text = collect_stream(chunks).await?;
    tracing::info!(reply_len = text.len(), elapsed = ?start_time.elapsed(), "chat reply buffered");

    Ok(response::html_fragment(parse_response(&text)))
}

async fn post_handler(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse> {
    // Unparseable bodies are validated as if they were empty.
    let body: Value = serde_json::from_slice(&body).unwrap_or_else(|_| Value::Object(Default::default()));
    let req = PostRequest::from_json(&body)?;
    let start_time = Instant::now();

    let summary = summarize_post(state.model.as_ref(), &req.title, &req.chats).await?;
    tracing::info!(elapsed = ?start_time.elapsed(), "post summarized");

    Ok(response::success(summary))
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn moderate_media_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let max_mb = state.config.max_upload_mb;
    let too_large = || AppError::PayloadTooLarge(format!("File exceeds max size of {} MB.", max_mb));
    let read_failed = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large()
        } else {
            tracing::warn!(error = %e, "multipart read failed");
            AppError::BadRequest("Failed to read uploaded file.".to_string())
        }
    };
    let no_file_part = || AppError::BadRequest("No file part in the request (expected field 'file').".to_string());

    let mut multipart = multipart.map_err(|_| no_file_part())?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(read_failed)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::BadRequest("No file selected.".to_string()));
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(read_failed)?;
        upload = Some(Upload { filename, content_type, bytes });
        break;
    }
    let upload = upload.ok_or_else(no_file_part)?;

    if state.config.exceeds_upload_limit(upload.bytes.len()) {
        return Err(too_large());
    }

    let mime_type = resolve_mime_type(upload.content_type.as_deref(), &upload.filename);
    tracing::info!(
        filename = %upload.filename,
        mime_type = %mime_type,
        len = upload.bytes.len(),
        "media upload received"
    );

    let classification = classify_media(state.model.as_ref(), upload.bytes.to_vec(), &mime_type).await?;
    Ok(response::success(classification))
}
