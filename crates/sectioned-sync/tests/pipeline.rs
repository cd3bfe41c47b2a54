//! End-to-end tests driving edits from the caller API through to the renderer.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sectioned_sync::{
    BatchCompletion, CycleReport, Position, Renderer, RendererOperationSet, RendererStep,
    SectionedDataSource,
};
use sectioned_sync_core::TaskQueue;
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test output. Set `RUST_LOG` to widen the filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sectioned_sync=debug,sectioned_sync_core=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// An `io::Write` sink shared with the test body.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

/// Records every batch and can hold completions back.
#[derive(Default)]
struct RecordingRenderer {
    batches: Mutex<Vec<RendererOperationSet>>,
    held: Mutex<Vec<BatchCompletion>>,
    hold: AtomicBool,
}

impl Renderer for RecordingRenderer {
    fn perform_batch_updates(&self, operations: RendererOperationSet, completion: BatchCompletion) {
        self.batches.lock().push(operations);
        if self.hold.load(Ordering::SeqCst) {
            self.held.lock().push(completion);
        } else {
            completion.complete();
        }
    }
}

impl RecordingRenderer {
    fn holding() -> Self {
        let renderer = Self::default();
        renderer.hold.store(true, Ordering::SeqCst);
        renderer
    }

    fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    fn last_batch(&self) -> RendererOperationSet {
        self.batches.lock().last().cloned().unwrap()
    }

    fn release(&self) {
        let held: Vec<_> = self.held.lock().drain(..).collect();
        for completion in held {
            completion.complete();
        }
    }
}

struct Harness {
    source: SectionedDataSource<u32>,
    ui: Arc<TaskQueue>,
    renderer: Arc<RecordingRenderer>,
}

impl Harness {
    fn new(seed: Vec<Vec<u32>>) -> Self {
        Self::with_renderer(seed, RecordingRenderer::default())
    }

    fn with_renderer(seed: Vec<Vec<u32>>, renderer: RecordingRenderer) -> Self {
        init_logging();
        let ui = Arc::new(TaskQueue::new());
        let renderer = Arc::new(renderer);
        let source = SectionedDataSource::builder(renderer.clone())
            .seed(seed)
            .apply_executor(ui.clone())
            .validate_batches(true)
            .build()
            .unwrap();
        Self {
            source,
            ui,
            renderer,
        }
    }

    /// Lets the serializer finish, then runs the renderer's queue dry.
    fn settle(&self) {
        assert!(self.source.wait_for_mutations());
        self.ui.run_until_idle();
    }

    fn displayed(&self) -> Vec<Vec<u32>> {
        self.source.displayed_snapshot().into_inner()
    }

    fn canonical(&self) -> Vec<Vec<u32>> {
        self.source.canonical_snapshot().into_inner()
    }
}

fn pos(section: usize, item: usize) -> Position {
    Position::new(section, item)
}

#[test]
fn test_append_then_delete_head_in_one_batch() {
    let harness = Harness::new(vec![(0..10).collect()]);
    harness.source.append_item(0, 10);
    harness.source.delete_item(pos(0, 0));
    harness.settle();

    assert_eq!(harness.renderer.batch_count(), 1);
    let batch = harness.renderer.last_batch();
    assert_eq!(
        batch.steps(),
        vec![RendererStep::DeleteItem(pos(0, 0)), RendererStep::InsertItem(pos(0, 9))]
    );
    assert_eq!(harness.displayed(), vec![(1..=10).collect::<Vec<_>>()]);
}

#[test]
fn test_repeated_second_to_last_closure_deletes() {
    let harness = Harness::new(vec![(0..11).collect()]);
    for _ in 0..3 {
        harness.source.delete_with(|store| {
            let count = store.item_count(0)?;
            count.checked_sub(2).map(|item| Position::new(0, item))
        });
    }
    harness.source.delete_item(pos(0, 0));
    harness.settle();

    let batch = harness.renderer.last_batch();
    assert_eq!(harness.renderer.batch_count(), 1);
    assert_eq!(batch.deleted_items().len(), 4);
    assert!(batch.inserted_items().is_empty());
    assert!(batch.validate(&[11], &[7]).is_ok());
    assert_eq!(harness.displayed(), vec![vec![1, 2, 3, 4, 5, 6, 10]]);
    assert_eq!(harness.displayed(), harness.canonical());
}

#[test]
fn test_new_section_arrives_before_its_items() {
    let harness = Harness::new(Vec::new());
    harness.source.append_section();
    harness.source.append_item(0, 42);
    harness.settle();

    let batch = harness.renderer.last_batch();
    assert_eq!(
        batch.steps(),
        vec![RendererStep::InsertSection(0), RendererStep::InsertItem(pos(0, 0))]
    );
    assert_eq!(harness.source.section_count(), 1);
    assert_eq!(harness.displayed(), vec![vec![42]]);
}

#[test]
fn test_insert_and_delete_in_one_batch_reaches_nobody() {
    let harness = Harness::new(vec![vec![1, 2, 3]]);
    harness.source.insert_item(pos(0, 1), 9);
    harness.source.delete_item(pos(0, 1));
    harness.settle();

    assert_eq!(harness.renderer.batch_count(), 0);
    assert_eq!(harness.displayed(), vec![vec![1, 2, 3]]);
    assert!(!harness.source.is_cycle_in_flight());
}

#[test]
fn test_no_edits_no_batches() {
    let harness = Harness::new(vec![vec![1]]);
    harness.settle();
    assert_eq!(harness.ui.pending_count(), 0);
    assert_eq!(harness.renderer.batch_count(), 0);
    assert_eq!(harness.source.cycles_completed(), 0);
}

#[test]
fn test_next_cycle_waits_for_completion() {
    let harness = Harness::with_renderer(vec![vec![]], RecordingRenderer::holding());
    let started = Arc::new(AtomicUsize::new(0));
    let started_clone = started.clone();
    harness.source.signals().cycle_started.connect(move |_| {
        started_clone.fetch_add(1, Ordering::SeqCst);
    });

    harness.source.append_item(0, 1);
    harness.settle();
    assert!(harness.source.is_cycle_in_flight());
    assert_eq!(started.load(Ordering::SeqCst), 1);

    // Edits pile up while the renderer is busy.
    harness.source.append_item(0, 2);
    harness.source.append_item(0, 3);
    harness.settle();
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(harness.renderer.batch_count(), 1);
    assert_eq!(harness.displayed(), vec![vec![1]]);

    harness.renderer.release();
    harness.ui.run_until_idle();
    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(harness.renderer.batch_count(), 2);
    assert_eq!(harness.renderer.last_batch().inserted_items().len(), 2);
    assert_eq!(harness.displayed(), vec![vec![1, 2, 3]]);

    harness.renderer.release();
    harness.ui.run_until_idle();
    assert!(!harness.source.is_cycle_in_flight());
    assert_eq!(harness.source.cycles_completed(), 2);
}

#[test]
fn test_cycle_reports_follow_batch_order() {
    let harness = Harness::new(vec![vec![0, 1, 2]]);
    let reports: Arc<Mutex<Vec<CycleReport>>> = Arc::new(Mutex::new(Vec::new()));
    let reports_clone = reports.clone();
    harness.source.signals().cycle_finished.connect(move |report| {
        reports_clone.lock().push(report.clone());
    });

    harness.source.move_item(pos(0, 0), pos(0, 2));
    harness.settle();
    harness.source.delete_section(0);
    harness.settle();

    let reports = reports.lock();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].sequence < reports[1].sequence);
    assert_eq!(reports[0].operations.moved_items(), &[(pos(0, 0), pos(0, 2))]);
    assert_eq!(reports[1].operations.deleted_sections().len(), 1);
    assert!(harness.displayed().is_empty());
}

#[test]
fn test_apply_cycle_logs_under_apply_target() {
    let harness = Harness::new(vec![vec![1, 2]]);
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("sectioned_sync::apply=debug"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    // The apply executor is pumped on this thread, so the scoped subscriber
    // sees the whole cycle.
    tracing::subscriber::with_default(subscriber, || {
        harness.source.delete_item(pos(0, 0));
        harness.settle();
    });

    let output = logs.contents();
    assert!(output.contains("sectioned_sync::apply"));
    assert!(output.contains("delivering batch update"));
    assert!(!output.contains("TRACE"));
    assert_eq!(harness.renderer.batch_count(), 1);
}

#[test]
fn test_concurrent_producers_converge() {
    init_logging();
    let renderer = Arc::new(RecordingRenderer::default());
    let source = Arc::new(
        SectionedDataSource::builder(renderer.clone())
            .seed(vec![Vec::new(), Vec::new()])
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..4u32)
        .map(|producer| {
            let source = source.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    source.append_item((producer % 2) as usize, producer * 100 + i);
                    if i % 7 == 0 {
                        source.delete_last_item((producer % 2) as usize);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(source.wait_until_settled(Duration::from_secs(10)));
    let displayed = source.displayed_snapshot();
    assert_eq!(displayed, source.canonical_snapshot());
    assert_eq!(displayed.total_items(), 4 * (50 - 8));
    assert!(renderer.batch_count() >= 1);
}
