//! Admission applicants: durable records, merit ranking, seat allocation, and the merit
//! report derived from each allocation pass.

pub mod allocator;
pub mod domain;
pub mod intake;
pub mod ranking;
pub mod report;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use allocator::{SeatAllocator, SeatCount, SeatLedger};
pub use domain::{
    AllocationStatus, Applicant, ApplicantId, ApplicantView, Department, DepartmentRoster,
    RosterError, PREFERENCE_COUNT, UNALLOCATED,
};
pub use intake::{ApplicantUpdate, Registration, ValidationError};
pub use ranking::{merit_order, merit_position, rank, MeritPosition};
pub use report::{
    FileReportWriter, MemoryReportWriter, MeritReport, MeritReportLine, ReportError,
    ReportWriter,
};
pub use router::admission_router;
pub use service::{AdmissionService, AllocationError, AllocationSummary, ApplicantServiceError};
pub use store::{
    ApplicantRepository, FileBackend, LoadedPopulation, MemoryBackend, RecordFormatError,
    StorageBackend, StorageLock, StoreError,
};
