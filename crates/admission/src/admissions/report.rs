use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::domain::{Applicant, AllocationStatus, ApplicantId};
use super::store::replace_atomically;

/// One merit list row, in the column order of the published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeritReportLine {
    #[serde(rename = "JEE_Rank")]
    pub jee_rank: u32,
    #[serde(rename = "ID")]
    pub id: ApplicantId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "Marks")]
    pub marks: u8,
    #[serde(rename = "Status")]
    pub status: AllocationStatus,
}

/// Audit projection of a ranked and allocated population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeritReport {
    pub lines: Vec<MeritReportLine>,
}

impl MeritReport {
    /// Builds one line per applicant, preserving the given (merit) order.
    pub fn from_ranked(applicants: &[Applicant]) -> Self {
        let lines = applicants
            .iter()
            .map(|applicant| MeritReportLine {
                jee_rank: applicant.jee_rank,
                id: applicant.id,
                name: applicant.name.clone(),
                category: applicant.category.clone(),
                department: applicant.department.clone(),
                marks: applicant.marks,
                status: applicant.status(),
            })
            .collect();

        Self { lines }
    }

    pub fn selected(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.status == AllocationStatus::Selected)
            .count()
    }

    pub fn render_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.lines.is_empty() {
            writer.write_record([
                "JEE_Rank",
                "ID",
                "Name",
                "Category",
                "Department",
                "Marks",
                "Status",
            ])?;
        }
        for line in &self.lines {
            writer.serialize(line)?;
        }
        writer
            .into_inner()
            .map_err(|err| ReportError::Io(err.into_error()))
    }
}

/// Destination for the regenerated merit list.
pub trait ReportWriter: Send + Sync {
    fn write_report(&self, report: &MeritReport) -> Result<(), ReportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to encode merit report: {0}")]
    Encode(#[from] csv::Error),
    #[error("failed to write merit report: {0}")]
    Io(#[from] std::io::Error),
}

/// Replaces the report file in full on every run.
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    path: PathBuf,
}

impl FileReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportWriter for FileReportWriter {
    fn write_report(&self, report: &MeritReport) -> Result<(), ReportError> {
        let contents = report.render_csv()?;
        replace_atomically(&self.path, &contents)?;
        Ok(())
    }
}

/// Keeps the last rendered report in memory.
#[derive(Debug, Default)]
pub struct MemoryReportWriter {
    last: Mutex<Option<String>>,
}

impl MemoryReportWriter {
    pub fn last(&self) -> Option<String> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportWriter for MemoryReportWriter {
    fn write_report(&self, report: &MeritReport) -> Result<(), ReportError> {
        let rendered = String::from_utf8_lossy(&report.render_csv()?).into_owned();
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(rendered);
        Ok(())
    }
}
