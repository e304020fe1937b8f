// core/tests/test_reimport.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tourmerge_core::{
    CancelHandle, ReimportConfig, ReimportError, ReimportJob, ReimportPart, ReimportRequest, ReimportStatus,
    TourReimporter,
};

/// Teller kall per tur og svarer ut fra id-en.
#[derive(Default)]
struct CountingImporter {
    calls: Mutex<HashMap<i64, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingImporter {
    fn calls_for(&self, tour_id: i64) -> usize {
        self.calls.lock().unwrap().get(&tour_id).copied().unwrap_or(0)
    }
}

impl TourReimporter for CountingImporter {
    fn reimport_tour(&self, tour_id: i64, request: &ReimportRequest<'_>) -> Result<ReimportStatus, ReimportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(tour_id).or_insert(0) += 1;

        std::thread::sleep(std::time::Duration::from_millis(2));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match tour_id % 10 {
            7 if request.skip_tours_with_file_not_found => Ok(ReimportStatus::SkippedFileNotFound),
            7 => Err(ReimportError::FileNotFound { tour_id, path: format!("/tours/{tour_id}.hrm") }),
            8 => Ok(ReimportStatus::Unchanged),
            9 => panic!("corrupt file"),
            _ => Ok(ReimportStatus::Reimported),
        }
    }
}

/// Avbryter jobben når en gitt tur re-importeres.
struct CancellingImporter {
    cancel_on: i64,
    handle: CancelHandle,
}

impl TourReimporter for CancellingImporter {
    fn reimport_tour(&self, tour_id: i64, _request: &ReimportRequest<'_>) -> Result<ReimportStatus, ReimportError> {
        if tour_id == self.cancel_on {
            self.handle.cancel();
        }
        Ok(ReimportStatus::Reimported)
    }
}

#[test]
fn every_tour_is_reimported_exactly_once() {
    let ids: Vec<i64> = (1..=40).filter(|id| id % 10 < 7).collect();
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig { parallelism: Some(4), ..Default::default() });

    let report = job.run(&ids, &importer);

    assert_eq!(report.reimported, ids);
    assert!(!report.was_cancelled);
    for id in &ids {
        assert_eq!(importer.calls_for(*id), 1, "tour {id}");
    }
    assert_eq!(job.progress(), (ids.len(), ids.len()));
}

#[test]
fn duplicate_ids_are_submitted_once() {
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig { parallelism: Some(2), ..Default::default() });

    let report = job.run(&[1, 2, 1, 3, 2], &importer);

    assert_eq!(report.reimported, vec![1, 2, 3]);
    assert_eq!(importer.calls_for(1), 1);
    assert_eq!(importer.calls_for(2), 1);
    assert_eq!(job.progress(), (3, 3));
}

#[test]
fn parallelism_is_bounded() {
    let ids: Vec<i64> = (0..30).map(|i| i * 10 + 1).collect();
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig { parallelism: Some(3), ..Default::default() });

    job.run(&ids, &importer);
    assert!(importer.max_in_flight.load(Ordering::SeqCst) <= 3);
}

#[test]
fn single_threaded_runs_one_at_a_time() {
    let ids: Vec<i64> = (0..10).map(|i| i * 10 + 2).collect();
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig {
        single_threaded: true,
        parallelism: Some(8),
        ..Default::default()
    });

    let report = job.run(&ids, &importer);
    assert_eq!(report.reimported.len(), 10);
    assert_eq!(importer.max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn outcomes_are_sorted_into_report() {
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig {
        parallelism: Some(2),
        parts: vec![ReimportPart::Altitude, ReimportPart::Temperature],
        ..Default::default()
    });

    let report = job.run(&[1, 7, 8, 9], &importer);

    assert_eq!(report.reimported, vec![1]);
    assert_eq!(report.unchanged, vec![8]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].0, 7);
    assert!(report.failed[0].1.contains("/tours/7.hrm"));
    assert_eq!(report.failed[1].0, 9);
    assert!(report.failed[1].1.contains("panicked"));
    assert_eq!(report.total(), 4);
}

#[test]
fn missing_files_can_be_skipped() {
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig {
        parallelism: Some(2),
        skip_tours_with_file_not_found: true,
        ..Default::default()
    });

    let report = job.run(&[17, 27, 3], &importer);
    assert_eq!(report.skipped, vec![17, 27]);
    assert_eq!(report.reimported, vec![3]);
    assert!(report.failed.is_empty());
}

#[test]
fn cancellation_keeps_partial_results() {
    let job = ReimportJob::new(ReimportConfig { single_threaded: true, ..Default::default() });
    let importer = CancellingImporter { cancel_on: 2, handle: job.cancel_handle() };

    let report = job.run(&[1, 2, 3, 4, 5], &importer);

    assert!(report.was_cancelled);
    // tur 2 var i gang da avbruddet kom og fullføres
    assert_eq!(report.reimported, vec![1, 2]);
    assert_eq!(report.cancelled, vec![3, 4, 5]);
    // låsen er talt ned for alle, også de som ikke ble kjørt
    assert_eq!(job.progress(), (5, 5));
}

#[test]
fn cancelled_before_start_runs_nothing() {
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig { parallelism: Some(4), ..Default::default() });
    job.cancel_handle().cancel();

    let report = job.run(&[1, 2, 3], &importer);
    assert_eq!(report.cancelled, vec![1, 2, 3]);
    assert!(report.reimported.is_empty());
    assert_eq!(importer.calls_for(1), 0);
}

#[test]
fn job_can_run_again_after_cancellation() {
    let job = ReimportJob::new(ReimportConfig { single_threaded: true, ..Default::default() });
    let handle = job.cancel_handle();
    let importer = CancellingImporter { cancel_on: 1, handle: handle.clone() };

    let first = job.run(&[1, 2], &importer);
    assert!(first.was_cancelled);
    assert_eq!(first.cancelled, vec![2]);
    assert!(!handle.is_cancelled());

    let counting = CountingImporter::default();
    let second = job.run(&[3, 4], &counting);
    assert!(!second.was_cancelled);
    assert_eq!(second.reimported, vec![3, 4]);

    // samme håndtak virker fortsatt
    handle.cancel();
    let third = job.run(&[5], &counting);
    assert_eq!(third.cancelled, vec![5]);
}

#[test]
fn empty_batch_finishes_immediately() {
    let importer = CountingImporter::default();
    let job = ReimportJob::new(ReimportConfig::default());
    let report = job.run(&[], &importer);
    assert_eq!(report.total(), 0);
    assert_eq!(job.progress(), (0, 0));
}
