use loan_origination::config::DatabaseConfig;
use loan_origination::workflows::origination::{
    ApplicationStatus, Notification, NotificationError, NotificationPublisher, RepositoryError,
    SqliteApplicationStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Delivery happens in the messaging gateway; this side only records the event.
#[derive(Debug, Default, Clone)]
pub(crate) struct TracingNotificationPublisher;

impl NotificationPublisher for TracingNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            reference = %notification.reference,
            details = ?notification.details,
            "notification queued"
        );
        Ok(())
    }
}

pub(crate) async fn open_store(
    database: &DatabaseConfig,
    url_override: Option<&str>,
) -> Result<SqliteApplicationStore, RepositoryError> {
    let url = url_override.unwrap_or(&database.url);
    SqliteApplicationStore::connect(url, database.max_connections).await
}

pub(crate) fn parse_status(raw: &str) -> Result<ApplicationStatus, String> {
    raw.parse::<ApplicationStatus>()
        .map_err(|err| err.to_string())
}
