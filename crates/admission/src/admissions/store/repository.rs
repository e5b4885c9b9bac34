use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::backend::StorageLock;
use super::codec::{decode_population, encode_population, RecordFormatError};
use crate::admissions::domain::{Applicant, ApplicantId, DepartmentRoster, APPLICANT_ID_FLOOR};

/// Raw byte storage the repository encodes into and decodes from.
pub trait StorageBackend: Send + Sync {
    /// Returns `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;
    /// Replaces the stored bytes in full.
    fn write(&self, contents: &[u8]) -> Result<(), StoreError>;
    /// Excludes every other writer of the same storage, including other processes,
    /// until the returned guard is dropped.
    fn lock(&self) -> Result<StorageLock, StoreError> {
        Ok(StorageLock::in_process())
    }
}

/// Error enumeration for store failures surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read applicant store: {source}")]
    StorageRead { source: std::io::Error },
    #[error("failed to persist applicant store: {source}")]
    StorageWrite { source: std::io::Error },
    #[error("population of {count} applicants exceeds the configured maximum of {max}")]
    CapacityExceeded { count: usize, max: usize },
    #[error("applicant store is locked by another writer ({path:?}); gave up after {waited:?}")]
    LockTimeout { path: PathBuf, waited: Duration },
    #[error("no applicant ids remain above {highest}")]
    IdSpaceExhausted { highest: u32 },
}

/// Population as read from storage, plus the rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedPopulation {
    pub applicants: Vec<Applicant>,
    pub warnings: Vec<RecordFormatError>,
}

impl LoadedPopulation {
    pub fn count(&self) -> usize {
        self.applicants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applicants.is_empty()
    }

    pub fn find_mut(&mut self, id: ApplicantId) -> Option<&mut Applicant> {
        self.applicants.iter_mut().find(|applicant| applicant.id == id)
    }
}

/// Whole-population repository over a [`StorageBackend`].
///
/// All mutations run through [`ApplicantRepository::transaction`], which holds the
/// in-process writer lock and the backend's [`StorageLock`] across load, mutate, and save
/// so concurrent writers, in this process or another, cannot lose updates.
pub struct ApplicantRepository<B> {
    backend: B,
    roster: DepartmentRoster,
    max_population: usize,
    writer: Mutex<()>,
}

impl<B> ApplicantRepository<B>
where
    B: StorageBackend,
{
    pub fn new(backend: B, roster: DepartmentRoster, max_population: usize) -> Self {
        Self {
            backend,
            roster,
            max_population,
            writer: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn roster(&self) -> &DepartmentRoster {
        &self.roster
    }

    pub fn max_population(&self) -> usize {
        self.max_population
    }

    /// Reads the whole population in stored order. Missing storage is an empty population.
    pub fn load(&self) -> Result<LoadedPopulation, StoreError> {
        let Some(contents) = self.backend.read()? else {
            debug!("applicant store is empty");
            return Ok(LoadedPopulation::default());
        };

        let population = decode_population(&contents, &self.roster)?;
        for warning in &population.warnings {
            warn!(line = warning.line, reason = %warning.reason, "skipping malformed applicant record");
        }
        self.check_capacity(population.count())?;

        Ok(population)
    }

    /// Replaces the stored population with `applicants`.
    pub fn save(&self, applicants: &[Applicant]) -> Result<(), StoreError> {
        let _writer = self.lock_writer();
        let _storage = self.backend.lock()?;
        self.persist(applicants)
    }

    /// Runs `mutate` against a fresh load and saves the result while holding the writer lock.
    ///
    /// If `mutate` fails nothing is written.
    pub fn transaction<T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        F: FnOnce(&mut LoadedPopulation) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.transaction_then(mutate, |_| ()).map(|(output, ())| output)
    }

    /// Like [`ApplicantRepository::transaction`], then runs `after_save` on the committed
    /// output before either lock is released, so derived artifacts are written in the same
    /// order as the saves they describe.
    pub fn transaction_then<T, R, E, F, A>(&self, mutate: F, after_save: A) -> Result<(T, R), E>
    where
        F: FnOnce(&mut LoadedPopulation) -> Result<T, E>,
        A: FnOnce(&T) -> R,
        E: From<StoreError>,
    {
        let _writer = self.lock_writer();
        let _storage = self.backend.lock()?;
        let mut population = self.load()?;
        let output = mutate(&mut population)?;
        self.persist(&population.applicants)?;
        let follow_up = after_save(&output);
        Ok((output, follow_up))
    }

    fn persist(&self, applicants: &[Applicant]) -> Result<(), StoreError> {
        self.check_capacity(applicants.len())?;
        let contents = encode_population(applicants)?;
        self.backend.write(&contents)?;
        info!(count = applicants.len(), "applicant store saved");
        Ok(())
    }

    fn check_capacity(&self, count: usize) -> Result<(), StoreError> {
        if count > self.max_population {
            return Err(StoreError::CapacityExceeded {
                count,
                max: self.max_population,
            });
        }
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next free id: one above the larger of the highest stored id and the id floor.
pub fn next_applicant_id(applicants: &[Applicant]) -> Result<ApplicantId, StoreError> {
    let highest = applicants
        .iter()
        .map(|applicant| applicant.id.0)
        .fold(APPLICANT_ID_FLOOR, u32::max);
    highest
        .checked_add(1)
        .map(ApplicantId)
        .ok_or(StoreError::IdSpaceExhausted { highest })
}
