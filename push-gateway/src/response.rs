//! JSON bodies returned by the notification endpoint.

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use shared::http::json_response;
use std::convert::Infallible;

pub type ResponseBody = BoxBody<Bytes, Infallible>;

/// Envelope shared by every response of the endpoint.
///
/// # Example
/// ```json
/// {"success": false, "message": "Validation failed", "error": "\"data.k\" must be a string. ..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn failure(message: &'static str, error: Option<String>) -> Self {
        Self {
            success: false,
            message,
            message_id: None,
            error,
        }
    }

    pub fn sent(message_id: String) -> Self {
        Self {
            success: true,
            message: "Successfully sent message",
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn validation_failed(error: String) -> Self {
        Self::failure("Validation failed", Some(error))
    }

    pub fn send_failed(error: String) -> Self {
        Self::failure("Failed to send notification", Some(error))
    }

    pub fn method_not_allowed() -> Self {
        Self::failure("Method not allowed. Use POST.", None)
    }

    pub fn payload_too_large() -> Self {
        Self::failure("Request body too large", None)
    }

    pub fn not_found() -> Self {
        Self::failure("Not found", None)
    }

    pub fn into_response(self, status: StatusCode) -> Response<ResponseBody> {
        json_response(status, &self)
    }
}
