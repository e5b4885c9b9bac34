use std::fs;
use std::path::Path;
use std::sync::Arc;

use admission::admissions::{
    AdmissionService, AllocationError, ApplicantId, ApplicantRepository, Department,
    DepartmentRoster, FileBackend, FileReportWriter, Registration, UNALLOCATED,
};
use tempfile::TempDir;

type FileService = AdmissionService<FileBackend, FileReportWriter>;

fn roster() -> DepartmentRoster {
    DepartmentRoster::new(vec![
        Department::new("CSE", 1),
        Department::new("IT", 1),
        Department::new("TT", 1),
        Department::new("APM", 0),
    ])
    .expect("valid roster")
}

fn service_in(dir: &Path, roster: DepartmentRoster) -> FileService {
    let repository = Arc::new(ApplicantRepository::new(
        FileBackend::new(dir.join("applicants.csv")),
        roster,
        100,
    ));
    AdmissionService::new(repository, Arc::new(FileReportWriter::new(dir.join("merit_list.csv"))))
}

fn seeded_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("applicants.csv"),
        include_bytes!("fixtures/applicants.csv"),
    )
    .expect("seed store");
    dir
}

fn read_report(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("merit_list.csv"))
        .expect("report exists")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn allocation_pass_ranks_allocates_and_reports() {
    let dir = seeded_dir();
    let service = service_in(dir.path(), roster());

    let summary = service.run_allocation().expect("allocation succeeds");
    assert_eq!(summary.total, 5);
    assert_eq!(summary.allocated, 3);
    assert_eq!(summary.waiting, 2);
    assert_eq!(summary.skipped_records, 1);
    assert!(summary.report_written);
    assert_eq!(summary.seats.get("APM"), Some(&0));

    let report = read_report(dir.path());
    assert_eq!(
        report,
        vec![
            "JEE_Rank,ID,Name,Category,Department,Marks,Status",
            "7,1005,Mitali Pal,ST,CSE,70,SELECTED",
            "12,1000,Ananya Roy,GEN,IT,91,SELECTED",
            "12,1002,Priya Mondal,SC,TT,77,SELECTED",
            "40,1001,\"Sen, Arindam\",OBC,NA,84,WAITING",
            "90,1004,Rahul Bose,GEN,NA,65,WAITING",
        ]
    );

    let stored = service.list().expect("stored population");
    let ids: Vec<u32> = stored.iter().map(|view| view.id.0).collect();
    assert_eq!(ids, vec![1005, 1000, 1002, 1001, 1004]);
    assert!(stored
        .iter()
        .all(|view| view.allocated == (view.department != UNALLOCATED)));
}

#[test]
fn rerun_regenerates_report_instead_of_appending() {
    let dir = seeded_dir();
    let service = service_in(dir.path(), roster());

    service.run_allocation().expect("first run");
    let first_report = read_report(dir.path());
    let first_store = fs::read(dir.path().join("applicants.csv")).expect("store");

    let second = service.run_allocation().expect("second run");
    assert_eq!(second.skipped_records, 0, "malformed row dropped by the first save");
    assert_eq!(read_report(dir.path()), first_report);
    assert_eq!(
        fs::read(dir.path().join("applicants.csv")).expect("store"),
        first_store
    );
}

#[test]
fn zero_capacity_department_never_fills() {
    let dir = seeded_dir();
    let service = service_in(
        dir.path(),
        DepartmentRoster::new(vec![Department::new("CSE", 0), Department::new("IT", 5)])
            .expect("valid roster"),
    );

    let summary = service.run_allocation().expect("allocation succeeds");
    assert_eq!(summary.seats.get("CSE"), Some(&0));
    assert_eq!(summary.seats.get("IT"), Some(&5));
    assert!(service
        .list()
        .expect("stored population")
        .iter()
        .all(|view| view.department != "CSE"));
}

#[test]
fn missing_store_is_an_empty_population() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = service_in(dir.path(), DepartmentRoster::standard());

    assert!(matches!(
        service.run_allocation(),
        Err(AllocationError::EmptyPopulation)
    ));
    assert!(!dir.path().join("applicants.csv").exists());
    assert!(!dir.path().join("merit_list.csv").exists());
}

#[test]
fn registered_applicants_join_the_next_pass() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = service_in(dir.path(), DepartmentRoster::standard());

    for (name, jee_rank) in [("Kunal Sarkar", 30), ("Ishita Nag", 3)] {
        service
            .register(Registration {
                name: name.to_string(),
                password: "abc123".to_string(),
                category: "GEN".to_string(),
                preferences: ["IT", "CSE", "TT", "APM"].map(String::from).to_vec(),
                marks: 75,
                jee_rank,
            })
            .expect("registers");
    }

    let summary = service.run_allocation().expect("allocation succeeds");
    assert_eq!(summary.allocated, 2);
    assert_eq!(summary.seats.get("IT"), Some(&2));

    let position = service.merit_position(ApplicantId(1001)).expect("ranked");
    assert_eq!(position.position, 1);
    assert_eq!(read_report(dir.path())[1], "3,1001,Ishita Nag,GEN,IT,75,SELECTED");
}
