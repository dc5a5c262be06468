//! Sender for the Firebase Cloud Messaging HTTP v1 API.
//!
//! The outbound message is wrapped as `{"message": ...}` and posted to
//! `{base_url}/v1/projects/{project_id}/messages:send`. The only field renamed
//! on the way out is `notification.imageUrl`, which the REST API calls
//! `image`. Platform sections are forwarded as given and must already be in
//! the REST API's shape.
//!
//! Every send asks its [`TokenSource`] for the `Authorization` header, so
//! expired access tokens are replaced without a restart.

use crate::config::FcmConfig;
use crate::errors::SendError;
use crate::message::{OutboundMessage, Target};
use crate::sender::Sender;
use async_trait::async_trait;
use google_cloud_auth::credentials::service_account::{self, AccessSpecifier};
use google_cloud_auth::credentials::{self, CacheableResource, Credentials};
use hyper::StatusCode;
use hyper::header::{AUTHORIZATION, HeaderValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

/// OAuth2 scope required by the FCM HTTP v1 API.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Supplies the `Authorization` header for FCM requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn authorization(&self) -> Result<HeaderValue, SendError>;
}

/// Google OAuth2 credentials. Access tokens are cached by
/// `google-cloud-auth` and refreshed before they expire.
pub struct GoogleTokenSource {
    credentials: Credentials,
}

impl GoogleTokenSource {
    pub fn new(config: &FcmConfig) -> Result<Self, SendError> {
        let credentials = match &config.credentials_file {
            Some(path) => service_account::Builder::new(read_service_account_key(path)?)
                .with_access_specifier(AccessSpecifier::from_scopes([FCM_SCOPE]))
                .build()
                .map_err(|e| SendError::Credentials(e.to_string()))?,
            None => credentials::Builder::default()
                .with_scopes([FCM_SCOPE])
                .build()
                .map_err(|e| SendError::Credentials(e.to_string()))?,
        };

        Ok(Self { credentials })
    }
}

fn read_service_account_key(path: &Path) -> Result<Value, SendError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        SendError::Credentials(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        SendError::Credentials(format!("{} is not valid JSON: {e}", path.display()))
    })
}

#[async_trait]
impl TokenSource for GoogleTokenSource {
    async fn authorization(&self) -> Result<HeaderValue, SendError> {
        let headers = match self
            .credentials
            .headers(http::Extensions::new())
            .await
            .map_err(|e| SendError::Credentials(e.to_string()))?
        {
            CacheableResource::New { data, .. } => data,
            // Only returned when the caller passes an entity tag.
            CacheableResource::NotModified => {
                return Err(SendError::Credentials(
                    "credentials returned no headers".to_string(),
                ));
            }
        };

        headers.get(AUTHORIZATION).cloned().ok_or_else(|| {
            SendError::Credentials("credentials returned no Authorization header".to_string())
        })
    }
}

pub struct FcmSender {
    client: reqwest::Client,
    endpoint: Url,
    token_source: Arc<dyn TokenSource>,
    /// Outcome of the last attempt to authorize a request.
    credentials_ok: AtomicBool,
}

impl FcmSender {
    pub fn new(config: &FcmConfig, token_source: Arc<dyn TokenSource>) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut endpoint = config.base_url.clone();
        endpoint.set_path(&format!(
            "/v1/projects/{}/messages:send",
            config.project_id.trim()
        ));

        Ok(Self {
            client,
            endpoint,
            token_source,
            credentials_ok: AtomicBool::new(true),
        })
    }

    /// Builds the sender with Google credentials loaded as the config describes.
    pub fn from_config(config: &FcmConfig) -> Result<Self, SendError> {
        Self::new(config, Arc::new(GoogleTokenSource::new(config)?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches an access token and records whether that worked.
    pub async fn authorize(&self) -> Result<HeaderValue, SendError> {
        let result = self.token_source.authorization().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Failed to obtain FCM access token");
        }
        self.credentials_ok.store(result.is_ok(), Ordering::Relaxed);
        result
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    #[serde(flatten)]
    target: &'a Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<WireNotification<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webpush: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apns: Option<&'a Value>,
}

#[derive(Serialize)]
struct WireNotification<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

impl<'a> From<&'a OutboundMessage> for WireMessage<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        WireMessage {
            target: &message.target,
            notification: message
                .notification
                .as_ref()
                .map(|notification| WireNotification {
                    title: notification.title.as_deref(),
                    body: notification.body.as_deref(),
                    image: notification.image_url.as_deref(),
                }),
            data: message.data.as_ref(),
            android: message.android.as_ref(),
            webpush: message.webpush.as_ref(),
            apns: message.apns.as_ref(),
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    /// Message id, e.g. `projects/demo/messages/0:1500415314455276%31bd1c96`
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorStatus,
}

#[derive(Deserialize)]
struct ErrorStatus {
    message: String,
}

#[async_trait]
impl Sender for FcmSender {
    fn name(&self) -> &'static str {
        "fcm"
    }

    fn is_ready(&self) -> bool {
        self.credentials_ok.load(Ordering::Relaxed)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<String, SendError> {
        let authorization = self.authorize().await?;
        let request = SendRequest {
            message: WireMessage::from(message),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, authorization)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<SendResponse>().await?.name);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.credentials_ok.store(false, Ordering::Relaxed);
        }

        let body = response.bytes().await?;
        let message = serde_json::from_slice::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        tracing::warn!(status = status.as_u16(), error = %message, "FCM rejected message");
        Err(SendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
