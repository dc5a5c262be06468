use thiserror::Error;

/// Result type alias for push-gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that stop the gateway from starting or serving
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ValidationError),

    #[error("sender setup failed: {0}")]
    SenderSetup(#[from] SendError),
}

/// Rejection produced by the request validator.
///
/// The `Display` output of each variant is the exact message returned to the
/// caller in the `error` field of a 400 response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request body must be a valid JSON object")]
    Shape,

    #[error(
        "Exactly one target is required: provide a non-empty \"token\", \"topic\", or \"condition\" field."
    )]
    TargetSelection,

    #[error("\"{field}\" must be a non-empty string.")]
    TargetType { field: &'static str },

    #[error("\"notification\" must be an object")]
    NotificationShape,

    #[error("\"notification.{field}\" must be a string")]
    NotificationField { field: &'static str },

    #[error("\"data\" must be an object with string key-value pairs")]
    DataShape,

    #[error("\"data.{key}\" must be a string. FCM data payload only accepts string values.")]
    DataValueType { key: String },

    #[error("\"extraOptions\" must be an object")]
    ExtraOptionsShape,
}

/// Failure reported by a [`crate::sender::Sender`].
///
/// The `Display` output is surfaced verbatim in the `error` field of a 500
/// response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Request to push service timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),

    #[error("Invalid response from push service: {0}")]
    InvalidResponse(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SendError::Timeout
        } else if e.is_decode() {
            SendError::InvalidResponse(e.to_string())
        } else {
            SendError::Transport(e.to_string())
        }
    }
}
