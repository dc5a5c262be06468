use crate::config::Config;
use crate::cors::Cors;
use crate::errors::GatewayError;
use crate::message::assemble;
use crate::metrics_defs::{NOTIFICATION_REQUESTS, SEND_DURATION};
use crate::payload::validate;
use crate::response::{ApiResponse, ResponseBody};
use crate::sender::Sender;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// HTTP front of the notification pipeline.
///
/// Each request is handled independently: the body is decoded, validated,
/// assembled into an outbound message and handed to the sender once.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

struct Inner {
    endpoint_path: String,
    max_body_bytes: usize,
    cors: Cors,
    sender: Arc<dyn Sender>,
}

impl NotificationService {
    pub fn new(config: &Config, sender: Arc<dyn Sender>) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint_path: config.endpoint_path.clone(),
                max_body_bytes: config.max_body_bytes,
                cors: Cors::new(&config.cors),
                sender,
            }),
        }
    }

    /// Handles one request end to end. Never fails: every outcome is
    /// expressed as a status code and JSON body.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<ResponseBody>
    where
        B: Body + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        if parts.uri.path() != self.inner.endpoint_path {
            counter!(NOTIFICATION_REQUESTS, "outcome" => "not_found").increment(1);
            return ApiResponse::not_found().into_response(StatusCode::NOT_FOUND);
        }

        if parts.method == Method::OPTIONS {
            counter!(NOTIFICATION_REQUESTS, "outcome" => "preflight").increment(1);
            return self.inner.cors.preflight(&parts.headers);
        }

        let mut response = if parts.method != Method::POST {
            counter!(NOTIFICATION_REQUESTS, "outcome" => "method_not_allowed").increment(1);
            ApiResponse::method_not_allowed().into_response(StatusCode::METHOD_NOT_ALLOWED)
        } else {
            match self.read_json(body).await {
                Some(raw) => {
                    let (status, api_response) = self.process(&raw).await;
                    api_response.into_response(status)
                }
                None => {
                    counter!(NOTIFICATION_REQUESTS, "outcome" => "too_large").increment(1);
                    ApiResponse::payload_too_large().into_response(StatusCode::PAYLOAD_TOO_LARGE)
                }
            }
        };

        self.inner
            .cors
            .apply(&parts.headers, response.headers_mut());
        response
    }

    /// Reads and decodes the request body. An empty, unreadable or malformed
    /// body decodes to `null` so validation rejects it as a non-object.
    /// Returns `None` only when the body exceeds the configured limit.
    async fn read_json<B>(&self, body: B) -> Option<Value>
    where
        B: Body + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let bytes = match Limited::new(body, self.inner.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.is::<LengthLimitError>() => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                return Some(Value::Null);
            }
        };

        if bytes.is_empty() {
            return Some(Value::Null);
        }

        Some(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Request body is not valid JSON");
            Value::Null
        }))
    }

    /// Runs validation, assembly and delivery for a decoded body.
    pub async fn process(&self, raw: &Value) -> (StatusCode, ApiResponse) {
        let payload = match validate(raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(error = %e, "Validation failed");
                counter!(NOTIFICATION_REQUESTS, "outcome" => "invalid").increment(1);
                return (
                    StatusCode::BAD_REQUEST,
                    ApiResponse::validation_failed(e.to_string()),
                );
            }
        };

        let message = assemble(payload);
        let sender = &self.inner.sender;

        let start = Instant::now();
        let result = sender.send(&message).await;
        let outcome = if result.is_ok() { "sent" } else { "send_failed" };
        histogram!(SEND_DURATION, "sender" => sender.name(), "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());
        counter!(NOTIFICATION_REQUESTS, "outcome" => outcome).increment(1);

        match result {
            Ok(message_id) => {
                tracing::info!(
                    message_id = %message_id,
                    target_kind = message.target.kind().field(),
                    "Successfully sent message"
                );
                (StatusCode::OK, ApiResponse::sent(message_id))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    sender = sender.name(),
                    "Error sending message"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::send_failed(e.to_string()),
                )
            }
        }
    }
}

impl Service<Request<Incoming>> for NotificationService {
    type Response = Response<ResponseBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorsConfig, Listener, SenderConfig};
    use crate::message::Target;
    use crate::testutils::MockSender;
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
    use serde_json::json;

    const EXACTLY_ONE_TARGET: &str =
        r#"Exactly one target is required: provide a non-empty "token", "topic", or "condition" field."#;

    fn test_config() -> Config {
        Config {
            listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            admin_listener: Listener {
                host: "127.0.0.1".to_string(),
                port: 8081,
            },
            endpoint_path: "/sendTestNotification".to_string(),
            max_body_bytes: 1024,
            cors: CorsConfig::default(),
            sender: SenderConfig::Log,
        }
    }

    fn service(sender: Arc<MockSender>) -> NotificationService {
        NotificationService::new(&test_config(), sender)
    }

    fn request(method: Method, path: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .header("origin", "http://localhost:3000")
            .body(Full::new(body.into()))
            .unwrap()
    }

    fn post(body: Value) -> Request<Full<Bytes>> {
        request(
            Method::POST,
            "/sendTestNotification",
            serde_json::to_vec(&body).unwrap(),
        )
    }

    async fn call(
        service: &NotificationService,
        req: Request<Full<Bytes>>,
    ) -> (StatusCode, Value) {
        let response = service.handle(req).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_sends_token_notification() {
        let sender = Arc::new(MockSender::succeeding(
            "projects/test-project/messages/test-message-id",
        ));
        let service = service(sender.clone());

        let (status, body) = call(
            &service,
            post(json!({
                "token": "test_device_token",
                "notification": {"title": "Test Title", "body": "Test Body"}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "Successfully sent message",
                "messageId": "projects/test-project/messages/test-message-id"
            })
        );

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            json!({
                "token": "test_device_token",
                "notification": {"title": "Test Title", "body": "Test Body"}
            })
        );
    }

    #[tokio::test]
    async fn test_sends_topic_with_data_and_android() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        let (status, _) = call(
            &service,
            post(json!({
                "topic": " news ",
                "data": {"key1": "value1", "key2": "value2"},
                "extraOptions": {"android": {"priority": "high", "ttl": "3600s"}}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let sent = sender.sent();
        assert_eq!(sent[0].target, Target::Topic("news".to_string()));
        assert_eq!(
            serde_json::to_value(&sent[0]).unwrap(),
            json!({
                "topic": "news",
                "data": {"key1": "value1", "key2": "value2"},
                "android": {"priority": "high", "ttl": "3600s"}
            })
        );
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        let cases = [
            (json!({"data": {"k": "v"}}), EXACTLY_ONE_TARGET),
            (
                json!({"token": 12345, "notification": {"title": "T"}}),
                EXACTLY_ONE_TARGET,
            ),
            (json!({"token": "T", "topic": "news"}), EXACTLY_ONE_TARGET),
            (
                json!({"token": "T", "data": {"k": 1}}),
                r#""data.k" must be a string. FCM data payload only accepts string values."#,
            ),
            (json!([1, 2]), EXACTLY_ONE_TARGET),
            (json!("token"), "Request body must be a valid JSON object"),
        ];

        for (input, expected) in cases {
            let (status, body) = call(&service, post(input)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({"success": false, "message": "Validation failed", "error": expected})
            );
        }
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_empty_bodies() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        for raw in ["", "{not json", "null"] {
            let (status, body) = call(
                &service,
                request(Method::POST, "/sendTestNotification", raw),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Request body must be a valid JSON object");
        }
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure() {
        let sender = Arc::new(MockSender::failing("FCM send error"));
        let service = service(sender.clone());

        let (status, body) = call(
            &service,
            post(json!({"token": "T", "notification": {"title": "Error Test"}})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "success": false,
                "message": "Failed to send notification",
                "error": "FCM send error"
            })
        );
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        let response = service
            .handle(request(Method::GET, "/sendTestNotification", ""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "message": "Method not allowed. Use POST."})
        );
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_preflight() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        let mut req = request(Method::OPTIONS, "/sendTestNotification", "");
        req.headers_mut().insert(
            "access-control-request-method",
            "POST".parse().unwrap(),
        );
        let response = service.handle(req).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let service = service(Arc::new(MockSender::succeeding("id")));
        let (status, body) = call(&service, request(Method::POST, "/other", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "message": "Not found"}));
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let sender = Arc::new(MockSender::succeeding("id"));
        let service = service(sender.clone());

        let big = json!({"token": "T", "data": {"blob": "x".repeat(2048)}});
        let (status, body) = call(&service, post(big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body,
            json!({"success": false, "message": "Request body too large"})
        );
        assert!(sender.sent().is_empty());
    }
}
