// core/src/reimport.rs
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ReimportError;
use crate::metrics;

/// Hvilke data som hentes på nytt fra importfilen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReimportPart {
    EntireTour,
    AllTimeSlices,
    Altitude,
    Cadence,
    Gear,
    PowerAndPulse,
    PowerAndSpeed,
    RunningDynamics,
    Swimming,
    Temperature,
    TourTimerPauses,
    Training,
    TourMarkers,
    ImportFileLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReimportConfig {
    /// Antall arbeidertråder; None = antall prosessorer.
    pub parallelism: Option<usize>,
    /// Tvinger én arbeidertråd.
    pub single_threaded: bool,
    /// Kapasitet på køen mellom driver og arbeidere; None = antall arbeidere.
    pub queue_capacity: Option<usize>,
    pub skip_tours_with_file_not_found: bool,
    pub parts: Vec<ReimportPart>,
}

impl ReimportConfig {
    pub fn worker_count(&self) -> usize {
        if self.single_threaded {
            return 1;
        }
        self.parallelism
            .filter(|n| *n > 0)
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .filter(|n| *n > 0)
            .unwrap_or_else(|| self.worker_count())
    }
}

/// Det en importer får vite om hver re-import.
#[derive(Debug, Clone, Copy)]
pub struct ReimportRequest<'a> {
    pub parts: &'a [ReimportPart],
    pub skip_tours_with_file_not_found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReimportStatus {
    Reimported,
    SkippedFileNotFound,
    Unchanged,
}

/// Utfører selve re-importen av én tur (parser + lagring ligger utenfor kjernen).
pub trait TourReimporter: Send + Sync {
    fn reimport_tour(&self, tour_id: i64, request: &ReimportRequest<'_>) -> Result<ReimportStatus, ReimportError>;
}

/// Teller ned til 0; `wait` blokkerer til alle oppgaver er ferdige.
#[derive(Debug)]
pub struct CountDownLatch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count > 0 {
            *count -= 1;
            if *count == 0 {
                self.zero.notify_all();
            }
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self.zero.wait(count).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReimportReport {
    pub reimported: Vec<i64>,
    pub unchanged: Vec<i64>,
    pub skipped: Vec<i64>,
    pub failed: Vec<(i64, String)>,
    pub cancelled: Vec<i64>,
    pub was_cancelled: bool,
}

impl ReimportReport {
    pub fn total(&self) -> usize {
        self.reimported.len() + self.unchanged.len() + self.skipped.len() + self.failed.len() + self.cancelled.len()
    }
}

enum Outcome {
    Done(ReimportStatus),
    Failed(ReimportError),
    Cancelled,
}

/// Batch re-import med begrenset trådpool, kø og nedtellingslås.
pub struct ReimportJob {
    config: ReimportConfig,
    cancel: CancelHandle,
    done: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl ReimportJob {
    pub fn new(config: ReimportConfig) -> Self {
        Self {
            config,
            cancel: CancelHandle::default(),
            done: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &ReimportConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// (ferdige, totalt) for pågående eller siste kjøring.
    pub fn progress(&self) -> (usize, usize) {
        (self.done.load(Ordering::SeqCst), self.total.load(Ordering::SeqCst))
    }

    /// Kjører re-import for alle id-er og blokkerer til låsen er 0.
    ///
    /// Hver id sendes inn nøyaktig én gang. Avbrudd sjekkes før hver innsending
    /// og før en arbeider starter en oppgave; oppgaver som allerede kjører
    /// fullføres. Resultater fram til avbruddet beholdes i rapporten.
    /// Avbruddsflagget nullstilles når kjøringen er ferdig, så jobben kan
    /// kjøres igjen med de samme håndtakene.
    pub fn run<I>(&self, tour_ids: &[i64], importer: &I) -> ReimportReport
    where
        I: TourReimporter + ?Sized,
    {
        let mut seen = HashSet::with_capacity(tour_ids.len());
        let ids: Vec<i64> = tour_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let workers = self.config.worker_count().min(ids.len().max(1));
        let capacity = self.config.queue_capacity();

        self.done.store(0, Ordering::SeqCst);
        self.total.store(ids.len(), Ordering::SeqCst);

        info!(
            "re-import started: {} tours, {} workers, queue capacity {}",
            ids.len(),
            workers,
            capacity
        );

        let latch = CountDownLatch::new(ids.len());
        let request = ReimportRequest {
            parts: &self.config.parts,
            skip_tours_with_file_not_found: self.config.skip_tours_with_file_not_found,
        };

        let (queue_tx, queue_rx) = bounded::<(usize, i64)>(capacity);
        let (result_tx, result_rx) = unbounded::<(usize, Outcome)>();

        thread::scope(|scope| {
            for worker in 0..workers {
                let queue_rx = queue_rx.clone();
                let result_tx = result_tx.clone();
                let latch = &latch;
                let request = &request;
                let cancel = &self.cancel;
                let done = &self.done;

                scope.spawn(move || {
                    for (position, tour_id) in queue_rx.iter() {
                        let outcome = if cancel.is_cancelled() {
                            Outcome::Cancelled
                        } else {
                            debug!("worker {worker}: re-importing tour {tour_id}");
                            match panic::catch_unwind(AssertUnwindSafe(|| importer.reimport_tour(tour_id, request))) {
                                Ok(Ok(status)) => Outcome::Done(status),
                                Ok(Err(e)) => Outcome::Failed(e),
                                Err(_) => Outcome::Failed(ReimportError::Panicked { tour_id }),
                            }
                        };

                        let _ = result_tx.send((position, outcome));
                        done.fetch_add(1, Ordering::SeqCst);
                        latch.count_down();
                    }
                });
            }
            drop(queue_rx);

            for (position, &tour_id) in ids.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    let _ = result_tx.send((position, Outcome::Cancelled));
                    self.done.fetch_add(1, Ordering::SeqCst);
                    latch.count_down();
                    continue;
                }

                // blokkerer når køen er full
                if queue_tx.send((position, tour_id)).is_err() {
                    let error = ReimportError::Failed {
                        tour_id,
                        reason: "worker pool closed".to_string(),
                    };
                    let _ = result_tx.send((position, Outcome::Failed(error)));
                    self.done.fetch_add(1, Ordering::SeqCst);
                    latch.count_down();
                }
            }
            drop(queue_tx);

            latch.wait();
        });
        drop(result_tx);

        let mut outcomes: Vec<Option<Outcome>> = ids.iter().map(|_| None).collect();
        for (position, outcome) in result_rx.try_iter() {
            outcomes[position] = Some(outcome);
        }

        let mut report = ReimportReport {
            was_cancelled: self.cancel.is_cancelled(),
            ..Default::default()
        };
        self.cancel.reset();

        for (tour_id, outcome) in ids.iter().copied().zip(outcomes) {
            match outcome {
                Some(Outcome::Done(ReimportStatus::Reimported)) => report.reimported.push(tour_id),
                Some(Outcome::Done(ReimportStatus::Unchanged)) => report.unchanged.push(tour_id),
                Some(Outcome::Done(ReimportStatus::SkippedFileNotFound)) => report.skipped.push(tour_id),
                Some(Outcome::Failed(e)) => {
                    warn!("{e}");
                    report.failed.push((tour_id, e.to_string()));
                }
                Some(Outcome::Cancelled) => report.cancelled.push(tour_id),
                None => report.failed.push((tour_id, "no result".to_string())),
            }
        }

        metrics::reimport_tours_total("reimported").inc_by(report.reimported.len() as u64);
        metrics::reimport_tours_total("unchanged").inc_by(report.unchanged.len() as u64);
        metrics::reimport_tours_total("skipped").inc_by(report.skipped.len() as u64);
        metrics::reimport_tours_total("failed").inc_by(report.failed.len() as u64);
        metrics::reimport_tours_total("cancelled").inc_by(report.cancelled.len() as u64);

        info!(
            "re-import finished: {} re-imported, {} unchanged, {} skipped, {} failed, {} cancelled",
            report.reimported.len(),
            report.unchanged.len(),
            report.skipped.len(),
            report.failed.len(),
            report.cancelled.len()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_counts_down_to_zero() {
        let latch = CountDownLatch::new(2);
        latch.count_down();
        assert_eq!(latch.count(), 1);
        latch.count_down();
        latch.count_down(); // under 0 ignoreres
        assert_eq!(latch.count(), 0);
        latch.wait();
    }

    #[test]
    fn latch_releases_waiting_thread() {
        let latch = Arc::new(CountDownLatch::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.count_down())
            })
            .collect();
        latch.wait();
        assert_eq!(latch.count(), 0);
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn worker_count_defaults() {
        let single = ReimportConfig { single_threaded: true, parallelism: Some(8), ..Default::default() };
        assert_eq!(single.worker_count(), 1);

        let fixed = ReimportConfig { parallelism: Some(3), ..Default::default() };
        assert_eq!(fixed.worker_count(), 3);
        assert_eq!(fixed.queue_capacity(), 3);

        let auto = ReimportConfig::default();
        assert!(auto.worker_count() >= 1);
    }
}
