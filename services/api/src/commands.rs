use crate::infra::build_service;
use admission::admissions::{AllocationError, AllocationSummary, MeritReport};
use admission::config::AppConfig;
use admission::error::AppError;
use admission::telemetry;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct AllocateArgs {
    /// Applicant store to read and rewrite (defaults to ADMISSION_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
    /// Merit report destination (defaults to ADMISSION_REPORT_PATH)
    #[arg(long)]
    pub(crate) report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Applicant store to read (defaults to ADMISSION_DATA_PATH)
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

fn load_config(data: Option<PathBuf>, report: Option<PathBuf>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(data) = data {
        config.store.data_path = data;
    }
    if let Some(report) = report {
        config.store.report_path = report;
    }
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let config = load_config(args.data, args.report)?;
    let service = build_service(&config);

    match service.run_allocation() {
        Ok(summary) => {
            render_summary(&summary, &config.store.report_path);
            Ok(())
        }
        Err(AllocationError::EmptyPopulation) => {
            println!(
                "No applicants found in {}; nothing to allocate.",
                config.store.data_path.display()
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = load_config(args.data, None)?;
    let service = build_service(&config);
    let report = service.merit_list()?;
    render_merit_list(&report);
    Ok(())
}

fn render_summary(summary: &AllocationSummary, report_path: &std::path::Path) {
    println!("Merit list generated");
    println!(
        "- {} applicants | {} selected | {} waiting",
        summary.total, summary.allocated, summary.waiting
    );
    if summary.skipped_records > 0 {
        println!(
            "- {} malformed records skipped while loading",
            summary.skipped_records
        );
    }
    println!("Seats filled:");
    for (code, filled) in &summary.seats {
        println!("  - {code}: {filled}");
    }
    if summary.report_written {
        println!("Report written to {}", report_path.display());
    } else {
        println!("Report could not be written to {}", report_path.display());
    }
    println!(
        "Completed at {}",
        summary.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

fn render_merit_list(report: &MeritReport) {
    if report.lines.is_empty() {
        println!("No applicants on record.");
        return;
    }

    println!(
        "{:<6} {:<8} {:<24} {:<10} {:<6} {:>5}  {}",
        "Rank", "ID", "Name", "Category", "Dept", "Marks", "Status"
    );
    for line in &report.lines {
        println!(
            "{:<6} {:<8} {:<24} {:<10} {:<6} {:>5}  {}",
            line.jee_rank,
            line.id.0,
            line.name,
            line.category,
            line.department,
            line.marks,
            line.status.label()
        );
    }
}
