use admission::admissions::{AdmissionService, ApplicantRepository, FileBackend, FileReportWriter};
use admission::config::AppConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type EngineService = AdmissionService<FileBackend, FileReportWriter>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// File-backed engine wired from the loaded configuration.
pub(crate) fn build_service(config: &AppConfig) -> Arc<EngineService> {
    let repository = Arc::new(ApplicantRepository::new(
        FileBackend::new(config.store.data_path.clone()),
        config.departments.clone(),
        config.store.max_applicants,
    ));
    let reports = Arc::new(FileReportWriter::new(config.store.report_path.clone()));
    Arc::new(AdmissionService::new(repository, reports))
}
