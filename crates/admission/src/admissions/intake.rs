use serde::{Deserialize, Serialize};

use super::domain::{Applicant, ApplicantId, PREFERENCE_COUNT, UNALLOCATED};

const PASSWORD_MIN: usize = 3;
const PASSWORD_MAX: usize = 9;
const MAX_MARKS: u8 = 100;

/// Registration payload for a new applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub password: String,
    pub category: String,
    #[serde(rename = "pref")]
    pub preferences: Vec<String>,
    pub marks: u8,
    pub jee_rank: u32,
}

/// Partial update: credential change and/or a replacement preference list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantUpdate {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "pref")]
    pub preferences: Option<Vec<String>>,
}

/// Field-level rejection reasons for registration and updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("category must not be empty")]
    EmptyCategory,
    #[error("password must be 3-9 characters, got {length}")]
    PasswordLength { length: usize },
    #[error("exactly 4 preferences are required, got {count}")]
    PreferenceCount { count: usize },
    #[error("marks must be between 0 and 100, got {marks}")]
    MarksOutOfRange { marks: u8 },
}

impl Registration {
    /// Validates the payload and builds an unallocated applicant with the given id.
    pub fn into_applicant(self, id: ApplicantId) -> Result<Applicant, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        validate_password(&self.password)?;
        if self.marks > MAX_MARKS {
            return Err(ValidationError::MarksOutOfRange { marks: self.marks });
        }
        let preferences = preference_array(self.preferences)?;

        Ok(Applicant {
            id,
            name: self.name.trim().to_string(),
            password: self.password,
            category: self.category.trim().to_string(),
            preferences,
            department: UNALLOCATED.to_string(),
            marks: self.marks,
            jee_rank: self.jee_rank,
            allocated: false,
        })
    }
}

impl ApplicantUpdate {
    /// Applies the update in place; on error the applicant is left untouched.
    pub fn apply(self, applicant: &mut Applicant) -> Result<(), ValidationError> {
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        let preferences = self.preferences.map(preference_array).transpose()?;

        if let Some(password) = self.password {
            applicant.password = password;
        }
        if let Some(preferences) = preferences {
            applicant.preferences = preferences;
        }
        Ok(())
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if (PASSWORD_MIN..=PASSWORD_MAX).contains(&length) {
        Ok(())
    } else {
        Err(ValidationError::PasswordLength { length })
    }
}

fn preference_array(
    preferences: Vec<String>,
) -> Result<[String; PREFERENCE_COUNT], ValidationError> {
    let count = preferences.len();
    let trimmed: Vec<String> = preferences
        .into_iter()
        .map(|code| code.trim().to_string())
        .collect();
    trimmed
        .try_into()
        .map_err(|_| ValidationError::PreferenceCount { count })
}
