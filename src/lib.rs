pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod formatter;
pub mod llm;
pub mod moderation;
pub mod prompts;
pub mod summary;

use std::sync::Arc;
use config::Config;
use llm::{GeminiClient, LanguageModel};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub model: Arc<dyn LanguageModel>,
}

impl AppState {
    /// State backed by the Gemini API.
    pub fn new(config: Config) -> error::Result<Self> {
        let model = GeminiClient::shared(&config)?;
        Ok(Self::with_model(config, model))
    }

    pub fn with_model(config: Config, model: Arc<dyn LanguageModel>) -> Self {
        AppState {
            config: Arc::new(config),
            model,
        }
    }
}
