use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::admissions::domain::{
    Applicant, ApplicantId, Department, DepartmentRoster, UNALLOCATED,
};
use crate::admissions::intake::Registration;
use crate::admissions::report::{MemoryReportWriter, MeritReport, ReportError, ReportWriter};
use crate::admissions::service::AdmissionService;
use crate::admissions::store::{
    encode_population, ApplicantRepository, MemoryBackend, StorageBackend, StoreError,
};

pub(super) fn applicant(id: u32, jee_rank: u32, marks: u8, preferences: [&str; 4]) -> Applicant {
    Applicant {
        id: ApplicantId(id),
        name: format!("Applicant {id}"),
        password: "pass123".to_string(),
        category: "GEN".to_string(),
        preferences: preferences.map(String::from),
        department: UNALLOCATED.to_string(),
        marks,
        jee_rank,
        allocated: false,
    }
}

pub(super) fn roster(departments: &[(&str, u32)]) -> DepartmentRoster {
    DepartmentRoster::new(
        departments
            .iter()
            .map(|(code, capacity)| Department::new(*code, *capacity))
            .collect(),
    )
    .expect("valid roster")
}

pub(super) fn registration(name: &str, jee_rank: u32) -> Registration {
    Registration {
        name: name.to_string(),
        password: "abc123".to_string(),
        category: "OBC".to_string(),
        preferences: ["CSE", "IT", "TT", "APM"].map(String::from).to_vec(),
        marks: 80,
        jee_rank,
    }
}

pub(super) fn memory_backend(applicants: &[Applicant]) -> MemoryBackend {
    MemoryBackend::with_contents(encode_population(applicants).expect("encodes"))
}

pub(super) fn memory_repository(
    applicants: &[Applicant],
    roster: DepartmentRoster,
    max_population: usize,
) -> Arc<ApplicantRepository<MemoryBackend>> {
    Arc::new(ApplicantRepository::new(
        memory_backend(applicants),
        roster,
        max_population,
    ))
}

pub(super) type MemoryService = AdmissionService<MemoryBackend, MemoryReportWriter>;

pub(super) fn build_service(
    applicants: &[Applicant],
    roster: DepartmentRoster,
) -> (Arc<MemoryService>, Arc<MemoryReportWriter>) {
    let repository = memory_repository(applicants, roster, 100);
    let reports = Arc::new(MemoryReportWriter::default());
    let service = Arc::new(AdmissionService::new(repository, reports.clone()));
    (service, reports)
}

/// Backend whose reads succeed but whose writes can be switched to fail.
#[derive(Default)]
pub(super) struct FlakyBackend {
    pub(super) inner: MemoryBackend,
    pub(super) fail_writes: AtomicBool,
}

impl FlakyBackend {
    pub(super) fn failing(applicants: &[Applicant]) -> Self {
        Self {
            inner: memory_backend(applicants),
            fail_writes: AtomicBool::new(true),
        }
    }
}

impl StorageBackend for FlakyBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.read()
    }

    fn write(&self, contents: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::StorageWrite {
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.write(contents)
    }
}

pub(super) struct BrokenReports;

impl ReportWriter for BrokenReports {
    fn write_report(&self, _report: &MeritReport) -> Result<(), ReportError> {
        Err(ReportError::Io(std::io::Error::other("report volume offline")))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
