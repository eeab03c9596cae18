use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MAX_UPLOAD_MB: f64 = 10.0;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 90;

/// Extra room on top of the upload limit so oversized files still reach the
/// handler and get a JSON 413 instead of a bare extractor rejection.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub max_upload_mb: f64,
    pub llm_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from the process environment.
    ///
    /// `GOOGLE_API_KEY` is required; everything else falls back to a default.
    pub fn from_env() -> Result<Self> {
        let google_api_key = env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError(
                    "No API key found. Please set the GOOGLE_API_KEY environment variable.".to_string(),
                )
            })?;

        let gemini_model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let gemini_api_base = env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let max_upload_mb = match env::var("MAX_UPLOAD_MB") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| AppError::ConfigError(format!("Invalid MAX_UPLOAD_MB: {}", e)))?;
                if !value.is_finite() || value <= 0.0 {
                    return Err(AppError::ConfigError(format!(
                        "MAX_UPLOAD_MB must be a positive number, got {}",
                        raw
                    )));
                }
                value
            }
            Err(_) => DEFAULT_MAX_UPLOAD_MB,
        };

        let llm_timeout = match env::var("LLM_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| AppError::ConfigError(format!("Invalid LLM_TIMEOUT_SECS: {}", e)))?,
            Err(_) => Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        };

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        tracing::info!(
            server_addr = %server_addr,
            model = %gemini_model,
            max_upload_mb,
            llm_timeout_secs = llm_timeout.as_secs(),
            "configuration loaded"
        );

        Ok(Config {
            server_addr,
            google_api_key,
            gemini_model,
            gemini_api_base,
            max_upload_mb,
            llm_timeout,
        })
    }

    /// Configuration with defaults for everything except the credential.
    pub fn with_api_key(google_api_key: impl Into<String>) -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            google_api_key: google_api_key.into(),
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }

    pub fn exceeds_upload_limit(&self, len: usize) -> bool {
        len as f64 > self.max_upload_mb * 1024.0 * 1024.0
    }

    /// Request body cap for the upload route.
    pub fn upload_body_limit(&self) -> usize {
        (self.max_upload_mb * 1024.0 * 1024.0).ceil() as usize + MULTIPART_OVERHEAD_BYTES
    }
}
