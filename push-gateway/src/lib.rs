pub mod config;
pub mod cors;
pub mod errors;
pub mod fcm;
pub mod message;
pub mod metrics_defs;
pub mod payload;
pub mod response;
pub mod sender;
pub mod service;

#[cfg(test)]
mod testutils;

use config::{Config, SenderConfig};
use errors::GatewayError;
use fcm::FcmSender;
use sender::{LogSender, Sender};
use service::NotificationService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Builds the sender described by the config.
///
/// Credentials that cannot be loaded stop startup. A failure to fetch the
/// first access token only leaves the sender not ready.
pub async fn build_sender(config: &SenderConfig) -> Result<Arc<dyn Sender>, GatewayError> {
    match config {
        SenderConfig::Fcm(fcm) => {
            tracing::info!(project_id = %fcm.project_id, "Using FCM project");
            let sender = FcmSender::from_config(fcm)?;
            if sender.authorize().await.is_ok() {
                tracing::info!("FCM credentials ready");
            }
            Ok(Arc::new(sender))
        }
        SenderConfig::Log => {
            tracing::warn!("Using log sender, messages will not be delivered");
            Ok(Arc::new(LogSender::new()))
        }
    }
}

/// Validates the config, sets up the sender and serves until a listener fails.
pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;
    let sender = build_sender(&config.sender).await?;
    run_with_sender(config, sender).await
}

pub async fn run_with_sender(config: Config, sender: Arc<dyn Sender>) -> Result<(), GatewayError> {
    let notification_service = NotificationService::new(&config, sender.clone());
    let admin_service: AdminService<GatewayError> =
        AdminService::new(Arc::new(move || sender.is_ready()));

    tracing::info!(path = %config.endpoint_path, "Serving notification endpoint");

    let gateway_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        notification_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(gateway_task, admin_task)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FcmConfig;
    use url::Url;

    #[tokio::test]
    async fn test_build_sender() {
        let sender = build_sender(&SenderConfig::Log).await.unwrap();
        assert_eq!(sender.name(), "log");
        assert!(sender.is_ready());

        let fcm = SenderConfig::Fcm(FcmConfig {
            project_id: "demo".to_string(),
            credentials_file: Some("/nonexistent/service-account.json".into()),
            base_url: Url::parse("https://fcm.googleapis.com").unwrap(),
            timeout_secs: 10,
        });
        assert!(matches!(
            build_sender(&fcm).await,
            Err(GatewayError::SenderSetup(_))
        ));
    }
}
