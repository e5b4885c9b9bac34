use std::fmt;

use serde::{Deserialize, Serialize};

/// Department value recorded for applicants without a seat.
pub const UNALLOCATED: &str = "NA";

/// Number of department preferences every applicant lists.
pub const PREFERENCE_COUNT: usize = 4;

/// Ids are assigned above this floor, so the first applicant receives `1000`.
pub const APPLICANT_ID_FLOOR: u32 = 999;

/// Identifier wrapper for stored applicants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u32);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One admission candidate with merit metrics, preferences, and allocation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicant {
    pub id: ApplicantId,
    pub name: String,
    pub password: String,
    pub category: String,
    pub preferences: [String; PREFERENCE_COUNT],
    pub department: String,
    pub marks: u8,
    pub jee_rank: u32,
    pub allocated: bool,
}

impl Applicant {
    /// Clears any seat so the next allocation pass starts from scratch.
    pub fn reset_allocation(&mut self) {
        self.department = UNALLOCATED.to_string();
        self.allocated = false;
    }

    pub(crate) fn assign(&mut self, code: &str) {
        self.department = code.to_string();
        self.allocated = true;
    }

    pub fn status(&self) -> AllocationStatus {
        if self.allocated {
            AllocationStatus::Selected
        } else {
            AllocationStatus::Waiting
        }
    }

    /// Public projection that never carries the credential.
    pub fn view(&self) -> ApplicantView {
        ApplicantView {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            preferences: self.preferences.clone(),
            department: self.department.clone(),
            marks: self.marks,
            jee_rank: self.jee_rank,
            allocated: self.allocated,
            status: self.status(),
        }
    }
}

/// Derived seat status shown in reports and API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AllocationStatus {
    Selected,
    Waiting,
}

impl AllocationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationStatus::Selected => "SELECTED",
            AllocationStatus::Waiting => "WAITING",
        }
    }
}

/// Sanitized representation of an applicant exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantView {
    pub id: ApplicantId,
    pub name: String,
    pub category: String,
    #[serde(rename = "pref")]
    pub preferences: [String; PREFERENCE_COUNT],
    pub department: String,
    pub marks: u8,
    pub jee_rank: u32,
    pub allocated: bool,
    pub status: AllocationStatus,
}

/// A seat allocation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub code: String,
    pub capacity: u32,
}

impl Department {
    pub fn new(code: impl Into<String>, capacity: u32) -> Self {
        Self {
            code: code.into(),
            capacity,
        }
    }
}

/// Ordered set of departments and their seat capacities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRoster {
    departments: Vec<Department>,
}

impl DepartmentRoster {
    pub fn new(departments: Vec<Department>) -> Result<Self, RosterError> {
        let mut seen: Vec<&str> = Vec::with_capacity(departments.len());
        for department in &departments {
            let code = department.code.as_str();
            if code.trim().is_empty() {
                return Err(RosterError::EmptyCode);
            }
            if code != code.trim() {
                return Err(RosterError::PaddedCode(code.to_string()));
            }
            if code == UNALLOCATED {
                return Err(RosterError::ReservedCode);
            }
            if seen.contains(&code) {
                return Err(RosterError::DuplicateCode(code.to_string()));
            }
            seen.push(code);
        }

        Ok(Self { departments })
    }

    /// CSE, IT, TT, and APM with ten seats each.
    pub fn standard() -> Self {
        Self {
            departments: ["CSE", "IT", "TT", "APM"]
                .into_iter()
                .map(|code| Department::new(code, 10))
                .collect(),
        }
    }

    /// Parses `CODE:CAPACITY` pairs separated by commas, e.g. `CSE:10,IT:10`.
    pub fn parse(raw: &str) -> Result<Self, RosterError> {
        let mut departments = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (code, capacity) = entry
                .split_once(':')
                .ok_or_else(|| RosterError::MalformedEntry(entry.to_string()))?;
            let capacity = capacity
                .trim()
                .parse::<u32>()
                .map_err(|_| RosterError::MalformedEntry(entry.to_string()))?;
            departments.push(Department::new(code.trim(), capacity));
        }

        Self::new(departments)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn contains(&self, code: &str) -> bool {
        self.departments
            .iter()
            .any(|department| department.code == code)
    }

    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }
}

impl Default for DepartmentRoster {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("department code must not be empty")]
    EmptyCode,
    #[error("department code '{0}' has surrounding whitespace")]
    PaddedCode(String),
    #[error("department code 'NA' is reserved for unallocated applicants")]
    ReservedCode,
    #[error("department code '{0}' is listed more than once")]
    DuplicateCode(String),
    #[error("department entry '{0}' must look like CODE:CAPACITY")]
    MalformedEntry(String),
}
