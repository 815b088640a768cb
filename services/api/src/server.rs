use crate::cli::ServeArgs;
use crate::infra::{open_store, AppState, TracingNotificationPublisher};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_origination::config::AppConfig;
use loan_origination::error::AppError;
use loan_origination::telemetry;
use loan_origination::workflows::origination::LoanApplicationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(url) = args.database_url.take() {
        config.database.url = url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = open_store(&config.database, None).await?;
    info!(database = %config.database.url, "application store connected");

    let application_service = Arc::new(LoanApplicationService::new(
        Arc::new(store),
        Arc::new(TracingNotificationPublisher),
        config.intake,
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "loan origination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
