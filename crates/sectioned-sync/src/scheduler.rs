//! Apply-cycle scheduling.
//!
//! At most one apply cycle is in flight at a time. A mutation that lands
//! while a cycle is running only raises a flag; when the renderer signals
//! completion, the flag triggers exactly one follow-up cycle that picks up
//! everything recorded in the meantime.
//!
//! A cycle runs on the apply executor and:
//!
//! 1. swaps out the change log,
//! 2. finishes immediately if the batch is empty,
//! 3. reconciles the batch against the displayed snapshot's shape,
//! 4. applies the result to the displayed snapshot,
//! 5. hands the operation set to the renderer together with a
//!    [`BatchCompletion`] that ends the cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use sectioned_sync_core::logging::targets;
use sectioned_sync_core::{Executor, PerfSpan, Signal};

use crate::change_log::ChangeLog;
use crate::error::SectionsError;
use crate::operations::RendererOperationSet;
use crate::reconcile::reconcile;
use crate::renderer::{BatchCompletion, Renderer};
use crate::sections::Sections;

/// Summary of a completed apply cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Sequence number of the batch.
    pub sequence: u64,
    /// Number of logical edits in the batch.
    pub edits: usize,
    /// The operations delivered to the renderer.
    pub operations: RendererOperationSet,
    /// Pending additions deleted again within the batch.
    pub cancelled: usize,
    /// Inconsistent edits dropped in release builds.
    pub dropped: usize,
}

/// Signals emitted around each non-empty apply cycle.
pub struct CycleSignals {
    /// Emitted with the batch sequence number before reconciliation.
    pub cycle_started: Signal<u64>,
    /// Emitted when a cycle with edits ends, after renderer completion if
    /// there was anything to deliver.
    pub cycle_finished: Signal<CycleReport>,
}

impl CycleSignals {
    fn new() -> Self {
        Self {
            cycle_started: Signal::new(),
            cycle_finished: Signal::new(),
        }
    }
}

#[derive(Debug, Default)]
struct CycleState {
    in_flight: bool,
    requested: bool,
}

/// Drives apply cycles from the change log to the renderer.
pub(crate) struct ApplyScheduler<T> {
    log: Arc<Mutex<ChangeLog<T>>>,
    displayed: Arc<RwLock<Sections<T>>>,
    executor: Arc<dyn Executor>,
    renderer: Arc<dyn Renderer>,
    validate: bool,
    state: Mutex<CycleState>,
    idle: Condvar,
    cycles_completed: AtomicU64,
    signals: CycleSignals,
}

impl<T> ApplyScheduler<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new(
        log: Arc<Mutex<ChangeLog<T>>>,
        displayed: Arc<RwLock<Sections<T>>>,
        executor: Arc<dyn Executor>,
        renderer: Arc<dyn Renderer>,
        validate: bool,
    ) -> Self {
        Self {
            log,
            displayed,
            executor,
            renderer,
            validate,
            state: Mutex::new(CycleState::default()),
            idle: Condvar::new(),
            cycles_completed: AtomicU64::new(0),
            signals: CycleSignals::new(),
        }
    }

    /// Called after every recorded mutation.
    pub(crate) fn notify(self: &Arc<Self>) {
        let start = {
            let mut state = self.state.lock();
            if state.in_flight {
                state.requested = true;
                false
            } else {
                state.in_flight = true;
                true
            }
        };
        if start {
            self.schedule();
        }
    }

    pub(crate) fn is_cycle_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    pub(crate) fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Acquire)
    }

    pub(crate) fn signals(&self) -> &CycleSignals {
        &self.signals
    }

    /// Blocks until no cycle is in flight, or `timeout` elapses.
    ///
    /// Returns `true` if the scheduler went idle.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.in_flight {
            if self.idle.wait_until(&mut state, deadline).timed_out() {
                return !state.in_flight;
            }
        }
        true
    }

    fn schedule(self: &Arc<Self>) {
        let this = Arc::clone(self);
        self.executor.execute(Box::new(move || this.run_cycle()));
    }

    fn run_cycle(self: &Arc<Self>) {
        let batch = self.log.lock().take();
        if batch.is_empty() {
            tracing::trace!(target: targets::APPLY, "empty batch, cycle finished");
            self.finish_cycle(None);
            return;
        }

        let sequence = batch.sequence();
        let edits = batch.len();
        self.signals.cycle_started.emit(sequence);

        let applied = {
            let _span = PerfSpan::new("apply_cycle");
            let mut displayed = self.displayed.write();
            let before = displayed.shape();
            let reconciliation = reconcile(&before, batch);
            let cancelled = reconciliation.cancelled();
            let dropped = reconciliation.dropped();
            reconciliation.apply_to(&mut displayed).map(|operations| {
                if self.validate
                    && let Err(err) = operations.validate(&before, &displayed.shape())
                {
                    tracing::error!(target: targets::APPLY, sequence, %err, "inconsistent batch update");
                }
                CycleReport {
                    sequence,
                    edits,
                    operations,
                    cancelled,
                    dropped,
                }
            })
        };

        let report = match applied {
            Ok(report) => report,
            Err(err) => {
                apply_failed(sequence, &err);
                self.finish_cycle(None);
                return;
            }
        };

        if report.operations.is_empty() {
            tracing::debug!(target: targets::APPLY, sequence, edits, "batch reconciled to no operations");
            self.finish_cycle(Some(report));
            return;
        }

        tracing::debug!(
            target: targets::APPLY,
            sequence,
            edits,
            operations = %report.operations,
            "delivering batch update"
        );
        let operations = report.operations.clone();
        let this = Arc::clone(self);
        let completion = BatchCompletion::new(sequence, move || this.finish_cycle(Some(report)));
        self.renderer.perform_batch_updates(operations, completion);
    }

    fn finish_cycle(self: &Arc<Self>, report: Option<CycleReport>) {
        if let Some(report) = report {
            self.cycles_completed.fetch_add(1, Ordering::AcqRel);
            self.signals.cycle_finished.emit(report);
        }

        let again = {
            let mut state = self.state.lock();
            if state.requested {
                state.requested = false;
                true
            } else {
                state.in_flight = false;
                self.idle.notify_all();
                false
            }
        };
        if again {
            self.schedule();
        }
    }
}

/// A reconciled batch that does not fit the snapshot it was computed from.
fn apply_failed(sequence: u64, err: &SectionsError) {
    if cfg!(debug_assertions) {
        panic!("failed to apply batch {sequence} to displayed snapshot: {err}");
    }
    tracing::error!(
        target: targets::APPLY,
        sequence,
        %err,
        "failed to apply batch to displayed snapshot"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Edit;
    use crate::position::Position;
    use sectioned_sync_core::TaskQueue;

    /// Holds on to completions so tests decide when the renderer finishes.
    #[derive(Default)]
    struct HeldRenderer {
        batches: Mutex<Vec<(RendererOperationSet, BatchCompletion)>>,
    }

    impl Renderer for HeldRenderer {
        fn perform_batch_updates(&self, operations: RendererOperationSet, completion: BatchCompletion) {
            self.batches.lock().push((operations, completion));
        }
    }

    impl HeldRenderer {
        fn complete_all(&self) -> usize {
            let batches: Vec<_> = self.batches.lock().drain(..).collect();
            let count = batches.len();
            for (_, completion) in batches {
                completion.complete();
            }
            count
        }
    }

    fn scheduler(
        seed: Vec<Vec<u32>>,
    ) -> (
        Arc<ApplyScheduler<u32>>,
        Arc<Mutex<ChangeLog<u32>>>,
        Arc<TaskQueue>,
        Arc<HeldRenderer>,
    ) {
        let log = Arc::new(Mutex::new(ChangeLog::new()));
        let displayed = Arc::new(RwLock::new(Sections::from_sections(seed)));
        let queue = Arc::new(TaskQueue::new());
        let renderer = Arc::new(HeldRenderer::default());
        let scheduler = Arc::new(ApplyScheduler::new(
            log.clone(),
            displayed,
            queue.clone(),
            renderer.clone(),
            true,
        ));
        (scheduler, log, queue, renderer)
    }

    #[test]
    fn test_single_cycle_in_flight() {
        let (scheduler, log, queue, renderer) = scheduler(vec![vec![1, 2]]);

        log.lock().record(Edit::DeleteItem {
            position: Position::new(0, 0),
        });
        scheduler.notify();
        assert!(scheduler.is_cycle_in_flight());
        queue.run_until_idle();
        assert_eq!(renderer.batches.lock().len(), 1);

        // A mutation during the cycle does not start a second one.
        log.lock().record(Edit::DeleteItem {
            position: Position::new(0, 0),
        });
        scheduler.notify();
        scheduler.notify();
        assert_eq!(queue.run_until_idle(), 0);
        assert_eq!(renderer.batches.lock().len(), 1);

        // Completion triggers exactly one follow-up cycle.
        renderer.complete_all();
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(renderer.batches.lock().len(), 1);
        renderer.complete_all();
        assert!(!scheduler.is_cycle_in_flight());
        assert_eq!(scheduler.cycles_completed(), 2);
    }

    #[test]
    fn test_empty_batch_skips_renderer() {
        let (scheduler, _log, queue, renderer) = scheduler(vec![vec![1]]);
        scheduler.notify();
        queue.run_until_idle();
        assert!(renderer.batches.lock().is_empty());
        assert!(!scheduler.is_cycle_in_flight());
        assert_eq!(scheduler.cycles_completed(), 0);
    }

    #[test]
    fn test_cycle_finished_reports_operations() {
        let (scheduler, log, queue, renderer) = scheduler(vec![vec![]]);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let reports_clone = reports.clone();
        scheduler.signals().cycle_finished.connect(move |report: &CycleReport| {
            reports_clone.lock().push(report.clone());
        });

        log.lock().record(Edit::AppendItem {
            item: 5,
            position: Position::new(0, 0),
        });
        scheduler.notify();
        queue.run_until_idle();
        renderer.complete_all();

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].sequence, 1);
        assert_eq!(reports[0].edits, 1);
        assert_eq!(reports[0].operations.inserted_items().len(), 1);
    }

    #[test]
    fn test_wait_idle_times_out_while_renderer_holds_completion() {
        let (scheduler, log, queue, renderer) = scheduler(vec![vec![1]]);
        log.lock().record(Edit::DeleteLastItem {
            position: Position::new(0, 0),
        });
        scheduler.notify();
        queue.run_until_idle();
        assert!(!scheduler.wait_idle(Duration::from_millis(20)));
        renderer.complete_all();
        assert!(scheduler.wait_idle(Duration::from_millis(20)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "failed to apply batch 7 to displayed snapshot")]
    fn test_apply_failure_panics_in_debug() {
        apply_failed(7, &SectionsError::SectionOutOfRange { section: 3, count: 1 });
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_apply_failure_is_logged_in_release() {
        apply_failed(7, &SectionsError::SectionOutOfRange { section: 3, count: 1 });
    }
}
