use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::allocator::{SeatAllocator, SeatLedger};
use super::domain::{ApplicantId, ApplicantView};
use super::intake::{ApplicantUpdate, Registration, ValidationError};
use super::ranking::{merit_position, rank, MeritPosition};
use super::report::{MeritReport, ReportWriter};
use super::store::{next_applicant_id, ApplicantRepository, StorageBackend, StoreError};

/// Result surface of one allocation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    pub total: usize,
    pub allocated: usize,
    pub waiting: usize,
    pub seats: BTreeMap<String, u32>,
    pub skipped_records: usize,
    pub report_written: bool,
    pub completed_at: DateTime<Utc>,
}

impl AllocationSummary {
    /// Zero-valued summary for runs with nothing to allocate.
    pub fn empty(seats: impl IntoIterator<Item = String>) -> Self {
        Self {
            total: 0,
            allocated: 0,
            waiting: 0,
            seats: seats.into_iter().map(|code| (code, 0)).collect(),
            skipped_records: 0,
            report_written: false,
            completed_at: Utc::now(),
        }
    }
}

/// Service composing the applicant repository, the seat allocator, and the report sink.
pub struct AdmissionService<B, W> {
    repository: Arc<ApplicantRepository<B>>,
    allocator: SeatAllocator,
    reports: Arc<W>,
}

impl<B, W> AdmissionService<B, W>
where
    B: StorageBackend + 'static,
    W: ReportWriter + 'static,
{
    pub fn new(repository: Arc<ApplicantRepository<B>>, reports: Arc<W>) -> Self {
        let allocator = SeatAllocator::new(repository.roster().clone());
        Self {
            repository,
            allocator,
            reports,
        }
    }

    pub fn repository(&self) -> &ApplicantRepository<B> {
        &self.repository
    }

    /// Ranks and allocates the whole population, persists it, then regenerates the report.
    ///
    /// The store is only written when the pass succeeds; the report is written after the
    /// store and before the store lock is released, so the last report always describes
    /// the last saved population. A report failure is logged and flagged in the summary.
    pub fn run_allocation(&self) -> Result<AllocationSummary, AllocationError> {
        let ((report, ledger, skipped_records), report_written) = self.repository.transaction_then(
            |population| {
                if population.is_empty() {
                    return Err(AllocationError::EmptyPopulation);
                }

                let ranked = rank(std::mem::take(&mut population.applicants));
                population.applicants = ranked;
                let ledger = self.allocator.allocate(&mut population.applicants);
                let report = MeritReport::from_ranked(&population.applicants);
                Ok((report, ledger, population.warnings.len()))
            },
            |committed: &(MeritReport, SeatLedger, usize)| self.publish_report(&committed.0),
        )?;

        let total = report.lines.len();
        let allocated = report.selected();
        let summary = AllocationSummary {
            total,
            allocated,
            waiting: total - allocated,
            seats: ledger.to_map(),
            skipped_records,
            report_written,
            completed_at: Utc::now(),
        };

        info!(
            total = summary.total,
            allocated = summary.allocated,
            skipped = summary.skipped_records,
            "allocation pass completed"
        );
        Ok(summary)
    }

    fn publish_report(&self, report: &MeritReport) -> bool {
        match self.reports.write_report(report) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "merit report could not be written");
                false
            }
        }
    }

    /// Current merit order of the stored population, without mutating it.
    pub fn merit_list(&self) -> Result<MeritReport, StoreError> {
        let population = self.repository.load()?;
        Ok(MeritReport::from_ranked(&rank(population.applicants)))
    }

    /// Register a new applicant with the next free id.
    pub fn register(
        &self,
        registration: Registration,
    ) -> Result<ApplicantView, ApplicantServiceError> {
        let view = self.repository.transaction(|population| {
            let id = next_applicant_id(&population.applicants)?;
            let applicant = registration.into_applicant(id)?;
            let view = applicant.view();
            population.applicants.push(applicant);
            Ok::<_, ApplicantServiceError>(view)
        })?;

        info!(applicant = %view.id, "applicant registered");
        Ok(view)
    }

    /// Change an applicant's password and/or preference list.
    pub fn update(
        &self,
        id: ApplicantId,
        update: ApplicantUpdate,
    ) -> Result<ApplicantView, ApplicantServiceError> {
        self.repository.transaction(|population| {
            let applicant = population
                .find_mut(id)
                .ok_or(ApplicantServiceError::NotFound(id))?;
            update.apply(applicant)?;
            Ok(applicant.view())
        })
    }

    pub fn list(&self) -> Result<Vec<ApplicantView>, ApplicantServiceError> {
        let population = self.repository.load()?;
        Ok(population.applicants.iter().map(|a| a.view()).collect())
    }

    pub fn get(&self, id: ApplicantId) -> Result<ApplicantView, ApplicantServiceError> {
        let population = self.repository.load()?;
        population
            .applicants
            .iter()
            .find(|applicant| applicant.id == id)
            .map(|applicant| applicant.view())
            .ok_or(ApplicantServiceError::NotFound(id))
    }

    pub fn merit_position(&self, id: ApplicantId) -> Result<MeritPosition, ApplicantServiceError> {
        let population = self.repository.load()?;
        merit_position(&population.applicants, id).ok_or(ApplicantServiceError::NotFound(id))
    }
}

/// Error raised by an allocation pass.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("no applicants found")]
    EmptyPopulation,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error raised by applicant record operations.
#[derive(Debug, thiserror::Error)]
pub enum ApplicantServiceError {
    #[error("invalid applicant data: {0}")]
    Invalid(#[from] ValidationError),
    #[error("applicant {0} not found")]
    NotFound(ApplicantId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
