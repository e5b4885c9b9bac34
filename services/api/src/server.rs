use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState, EngineService};
use crate::routes::with_admission_routes;
use admission::config::AppConfig;
use admission::error::AppError;
use admission::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = build_service(&config);
    inspect_store(&service);

    let app = with_admission_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, departments = config.departments.len(), "merit allocation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Logs the state of the applicant store at startup. Store problems are reported per
/// request (409/500/503), so an unusable store never stops the server from starting.
pub(crate) fn inspect_store(service: &EngineService) -> bool {
    let data_path = service.repository().backend().path().display();
    match service.repository().load() {
        Ok(population) => {
            info!(
                applicants = population.count(),
                skipped = population.warnings.len(),
                data_path = %data_path,
                "applicant store opened"
            );
            true
        }
        Err(err) => {
            warn!(
                error = %err,
                data_path = %data_path,
                "applicant store is not usable yet; serving anyway"
            );
            false
        }
    }
}
