use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::repository::{LoadedPopulation, StoreError};
use crate::admissions::domain::{Applicant, ApplicantId, DepartmentRoster, UNALLOCATED};

/// Column layout of the applicant store.
pub const STORE_HEADER: [&str; 12] = [
    "id",
    "name",
    "password",
    "category",
    "pref1",
    "pref2",
    "pref3",
    "pref4",
    "department",
    "marks",
    "jee_rank",
    "allocated",
];

const MAX_MARKS: u8 = 100;

/// A stored row that could not be turned into an [`Applicant`]; the row is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record on line {line} is malformed: {reason}")]
pub struct RecordFormatError {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApplicantRow {
    id: u32,
    name: String,
    password: String,
    category: String,
    pref1: String,
    pref2: String,
    pref3: String,
    pref4: String,
    department: String,
    marks: u8,
    jee_rank: u32,
    #[serde(with = "allocation_flag")]
    allocated: bool,
}

impl ApplicantRow {
    fn from_applicant(applicant: &Applicant) -> Self {
        let [pref1, pref2, pref3, pref4] = applicant.preferences.clone();
        Self {
            id: applicant.id.0,
            name: applicant.name.clone(),
            password: applicant.password.clone(),
            category: applicant.category.clone(),
            pref1,
            pref2,
            pref3,
            pref4,
            department: applicant.department.clone(),
            marks: applicant.marks,
            jee_rank: applicant.jee_rank,
            allocated: applicant.allocated,
        }
    }

    fn into_applicant(self, roster: &DepartmentRoster) -> Result<Applicant, String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        if self.marks > MAX_MARKS {
            return Err(format!("marks {} exceed {MAX_MARKS}", self.marks));
        }

        let mut applicant = Applicant {
            id: ApplicantId(self.id),
            name: self.name,
            password: self.password,
            category: self.category,
            preferences: [self.pref1, self.pref2, self.pref3, self.pref4],
            department: self.department,
            marks: self.marks,
            jee_rank: self.jee_rank,
            allocated: self.allocated,
        };

        // A seat only counts when it names a configured department.
        if !applicant.allocated || !roster.contains(&applicant.department) {
            applicant.reset_allocation();
        }

        Ok(applicant)
    }
}

mod allocation_flag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "1" | "true" => Ok(true),
            "0" | "false" | "" => Ok(false),
            other => Err(D::Error::custom(format!(
                "invalid allocation flag '{other}'"
            ))),
        }
    }
}

/// Parses a stored population, skipping malformed rows.
///
/// Rows are read positionally, so any header naming is accepted. Duplicate ids keep the
/// first occurrence. Only I/O failures abort the decode.
pub fn decode_population(
    contents: &[u8],
    roster: &DepartmentRoster,
) -> Result<LoadedPopulation, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(contents);

    let mut population = LoadedPopulation::default();
    let mut seen = HashSet::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|pos| pos.line()).unwrap_or_default();
                if let csv::ErrorKind::Io(_) = err.kind() {
                    return Err(StoreError::StorageRead {
                        source: std::io::Error::other(err),
                    });
                }
                population.warnings.push(RecordFormatError {
                    line,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        if record.len() != STORE_HEADER.len() {
            population.warnings.push(RecordFormatError {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    STORE_HEADER.len(),
                    record.len()
                ),
            });
            continue;
        }

        let parsed = record
            .deserialize::<ApplicantRow>(None)
            .map_err(|err| err.to_string())
            .and_then(|row| row.into_applicant(roster));

        match parsed {
            Ok(applicant) if !seen.insert(applicant.id) => {
                population.warnings.push(RecordFormatError {
                    line,
                    reason: format!("duplicate applicant id {}", applicant.id),
                });
            }
            Ok(applicant) => population.applicants.push(applicant),
            Err(reason) => population.warnings.push(RecordFormatError { line, reason }),
        }
    }

    Ok(population)
}

/// Encodes the full population with a header row; every field is quoted as needed.
pub fn encode_population(applicants: &[Applicant]) -> Result<Vec<u8>, StoreError> {
    let encode_error = |err: csv::Error| StoreError::StorageWrite {
        source: std::io::Error::other(err),
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(STORE_HEADER).map_err(encode_error)?;
    for applicant in applicants {
        writer
            .serialize(ApplicantRow::from_applicant(applicant))
            .map_err(encode_error)?;
    }

    writer
        .into_inner()
        .map_err(|err| StoreError::StorageWrite {
            source: err.into_error(),
        })
}
