use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Endpoint path must start with '/': {0}")]
    InvalidEndpointPath(String),

    #[error("max_body_bytes must be greater than 0")]
    InvalidBodyLimit,

    #[error("Empty FCM project id")]
    EmptyProjectId,

    #[error("Sender timeout must be greater than 0")]
    InvalidTimeout,

    #[error("Empty origin in cors.allowed_origins")]
    EmptyOrigin,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for notification requests
    pub listener: Listener,
    /// Admin listener for health and readiness endpoints
    pub admin_listener: Listener,
    /// Path the notification endpoint is served on
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    /// Requests with larger bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Backend the assembled messages are delivered to
    pub sender: SenderConfig,
}

fn default_endpoint_path() -> String {
    "/sendTestNotification".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Config {
    /// Validates the gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if !self.endpoint_path.starts_with('/') {
            return Err(ValidationError::InvalidEndpointPath(
                self.endpoint_path.clone(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidBodyLimit);
        }

        self.cors.validate()?;
        self.sender.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Cross-origin settings for the notification endpoint
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CorsConfig {
    /// Origins that receive CORS headers. `None` reflects any origin.
    pub allowed_origins: Option<Vec<String>>,
    /// Value of `Access-Control-Max-Age` on preflight responses
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(origins) = &self.allowed_origins
            && origins.iter().any(|origin| origin.trim().is_empty())
        {
            return Err(ValidationError::EmptyOrigin);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SenderConfig {
    /// Firebase Cloud Messaging HTTP v1 API
    Fcm(FcmConfig),
    /// Log messages instead of delivering them
    Log,
}

impl SenderConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SenderConfig::Fcm(fcm) => fcm.validate(),
            SenderConfig::Log => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FcmConfig {
    /// Firebase project the messages are sent through
    pub project_id: String,
    /// Service account key file. When unset, Application Default Credentials
    /// are used (`GOOGLE_APPLICATION_CREDENTIALS`, then the metadata server).
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Base URL of the FCM API
    ///
    /// Note: Uses the `url::Url` type so invalid URLs are rejected during
    /// config deserialization.
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Timeout for a single send, covering connect and response body
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> Url {
    Url::parse("https://fcm.googleapis.com").expect("static URL is valid")
}

fn default_timeout_secs() -> u64 {
    10
}

impl FcmConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_id.trim().is_empty() {
            return Err(ValidationError::EmptyProjectId);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}
