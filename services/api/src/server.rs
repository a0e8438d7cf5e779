use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryReceiptRepository, InMemoryRuleStore};
use crate::routes::with_receipt_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use receipt_points::config::AppConfig;
use receipt_points::error::AppError;
use receipt_points::receipts::{ReceiptService, RuleSet};
use receipt_points::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(rules) = args.rules.take() {
        config.rules.path = rules;
    }

    telemetry::init(&config.telemetry)?;

    let rules = RuleSet::from_path(&config.rules.path).map_err(|err| {
        error!(path = %config.rules.path.display(), error = %err, "failed to load rules");
        err
    })?;
    info!(
        path = %config.rules.path.display(),
        rules = rules.len(),
        "loaded points rules"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let receipts = Arc::new(InMemoryReceiptRepository::default());
    let rule_store = Arc::new(InMemoryRuleStore::new(rules));
    let receipt_service = Arc::new(ReceiptService::new(receipts, rule_store));

    let app = with_receipt_routes(receipt_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "receipt points service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
