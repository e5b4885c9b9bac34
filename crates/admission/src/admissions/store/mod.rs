//! Whole-population durable storage for applicants.
//!
//! Records are encoded as quoted CSV and persisted through a pluggable
//! [`StorageBackend`]. Every write replaces the full population.

mod backend;
mod codec;
mod repository;

pub use backend::{FileBackend, MemoryBackend, StorageLock, DEFAULT_LOCK_TIMEOUT};
pub(crate) use backend::replace_atomically;
pub use codec::{decode_population, encode_population, RecordFormatError, STORE_HEADER};
pub use repository::{
    next_applicant_id, ApplicantRepository, LoadedPopulation, StorageBackend, StoreError,
};
