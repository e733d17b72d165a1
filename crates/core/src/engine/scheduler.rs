use crate::buffer::EditorBuffer;
use crate::engine::Analyzer;
use crate::fold_store::{FoldStore, ToggleOutcome};
use crate::models::{AnalysisResult, AnchorId, Language, SourceSnapshot};
use crate::scanners::{CancelFlag, ScannerError};
use parking_lot::{Mutex, MutexGuard};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Runs analysis off the input path with optimistic, version-stamped result
/// application.
///
/// Every edit bumps the buffer version; enqueueing a snapshot supersedes any
/// in-flight pass by raising its cancel flag. A completed pass applies its
/// result only if the buffer has not advanced past the pass's version in the
/// meantime; stale results are discarded, so at most one result is applied
/// per version. Toggles requested while a newer result is pending are
/// deferred until it lands.
pub struct AnalysisScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    language: Option<Language>,
    analyzer: Mutex<Analyzer>,
    /// Newest buffer version seen, via edits or enqueued snapshots
    latest: AtomicU64,
    inflight: Mutex<Option<CancelFlag>>,
    current: Mutex<Option<AnalysisResult>>,
    fold_store: Mutex<FoldStore>,
    deferred: Mutex<Vec<AnchorId>>,
}

impl AnalysisScheduler {
    pub fn new(language: Option<Language>) -> Result<Self, ScannerError> {
        Ok(Self {
            inner: Arc::new(Inner {
                language,
                analyzer: Mutex::new(Analyzer::new(language)?),
                latest: AtomicU64::new(0),
                inflight: Mutex::new(None),
                current: Mutex::new(None),
                fold_store: Mutex::new(FoldStore::new()),
                deferred: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn language(&self) -> Option<Language> {
        self.inner.language
    }

    /// Record that the buffer reached `version`. Cancels any in-flight pass:
    /// its result would be stale by the time it lands. Wire this to
    /// `EditorBuffer::on_change`.
    pub fn note_edit(&self, version: u64) {
        self.inner.latest.fetch_max(version, Ordering::SeqCst);
        if let Some(flag) = self.inner.inflight.lock().take() {
            flag.cancel();
        }
    }

    /// Start a background pass over `snapshot`, superseding any in-flight
    /// one. The returned handle is for tests and shutdown; the result is
    /// applied (or discarded) by the worker itself.
    pub fn enqueue(&self, snapshot: SourceSnapshot) -> JoinHandle<()> {
        self.inner
            .latest
            .fetch_max(snapshot.version(), Ordering::SeqCst);

        let cancel = CancelFlag::new();
        {
            let mut inflight = self.inner.inflight.lock();
            if let Some(previous) = inflight.take() {
                previous.cancel();
            }
            *inflight = Some(cancel.clone());
        }

        let inner = Arc::clone(&self.inner);
        thread::spawn(move || run_pass(inner, snapshot, cancel))
    }

    /// The last applied result, if any
    pub fn current_result(&self) -> Option<AnalysisResult> {
        self.inner.current.lock().clone()
    }

    /// Whether an analysis for a newer version than the applied one is still
    /// outstanding
    pub fn result_pending(&self) -> bool {
        let applied = self
            .inner
            .current
            .lock()
            .as_ref()
            .map(|r| r.version)
            .unwrap_or(0);
        self.inner.latest.load(Ordering::SeqCst) > applied
    }

    /// Toggle a fold. Returns `None` when the request was deferred because a
    /// newer analysis result is pending; call
    /// [`drain_deferred`](Self::drain_deferred) once it has applied.
    pub fn toggle(&self, buffer: &mut EditorBuffer, anchor: AnchorId) -> Option<ToggleOutcome> {
        if self.result_pending() {
            tracing::debug!(anchor = anchor.0, "toggle deferred: newer result pending");
            self.inner.deferred.lock().push(anchor);
            return None;
        }
        Some(self.inner.fold_store.lock().toggle(buffer, anchor))
    }

    /// Apply every deferred toggle, in request order. A no-op while a newer
    /// result is still pending. Returns how many were applied.
    pub fn drain_deferred(&self, buffer: &mut EditorBuffer) -> usize {
        if self.result_pending() {
            return 0;
        }
        let pending: Vec<AnchorId> = std::mem::take(&mut *self.inner.deferred.lock());
        let count = pending.len();
        let mut store = self.inner.fold_store.lock();
        for anchor in pending {
            store.toggle(buffer, anchor);
        }
        count
    }

    /// Direct access to the fold store, for overlay emission and fold-all
    /// operations by the owning consumer
    pub fn fold_store(&self) -> MutexGuard<'_, FoldStore> {
        self.inner.fold_store.lock()
    }
}

fn run_pass(inner: Arc<Inner>, snapshot: SourceSnapshot, cancel: CancelFlag) {
    let version = snapshot.version();
    let language = inner.language;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        inner.analyzer.lock().analyze_cancellable(&snapshot, &cancel)
    }));

    let result = match outcome {
        Ok(Some(result)) => result,
        Ok(None) => {
            tracing::trace!(version, "analysis cancelled");
            return;
        }
        Err(_) => {
            // Failures never reach the editing surface; the pass just
            // produces nothing.
            tracing::warn!(version, "analysis task failed; applying empty pass");
            AnalysisResult::empty(version, language)
        }
    };

    inner.apply(result);
}

impl Inner {
    fn apply(&self, result: AnalysisResult) -> bool {
        let mut current = self.current.lock();
        if self.latest.load(Ordering::SeqCst) != result.version {
            tracing::debug!(version = result.version, "stale analysis result discarded");
            return false;
        }
        self.fold_store.lock().apply_result(&result);
        *current = Some(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> AnalysisScheduler {
        AnalysisScheduler::new(Some(Language::Python)).unwrap()
    }

    #[test]
    fn test_result_applies_when_current() {
        let s = scheduler();
        let handle = s.enqueue(SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        handle.join().unwrap();

        let result = s.current_result().unwrap();
        assert_eq!(result.version, 1);
        assert_eq!(result.regions.len(), 1);
        assert!(!s.result_pending());
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let s = scheduler();
        // The buffer has already advanced to version 2; a pass over the old
        // version-1 snapshot must never apply.
        s.note_edit(2);
        let handle = s.enqueue(SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        handle.join().unwrap();

        assert!(s.current_result().is_none());
        assert!(s.result_pending());
    }

    #[test]
    fn test_newer_pass_wins() {
        let s = scheduler();
        let h1 = s.enqueue(SourceSnapshot::from_text(1, "def foo():\n    pass\n"));
        let h2 = s.enqueue(SourceSnapshot::from_text(
            2,
            "def foo():\n    pass\ndef bar():\n    pass\n",
        ));
        h1.join().unwrap();
        h2.join().unwrap();

        let result = s.current_result().unwrap();
        assert_eq!(result.version, 2);
        assert_eq!(result.regions.len(), 2);
    }

    #[test]
    fn test_toggle_defers_while_pending_and_drains_after() {
        let mut buffer = EditorBuffer::from_text("def foo():\n    pass\n");
        let s = scheduler();
        let handle = s.enqueue(buffer.snapshot());
        handle.join().unwrap();
        let anchor = s.current_result().unwrap().regions[0].anchor;

        // An edit arrives; until its analysis lands, toggles are deferred.
        s.note_edit(2);
        assert_eq!(s.toggle(&mut buffer, anchor), None);
        assert_eq!(s.drain_deferred(&mut buffer), 0);

        let handle = s.enqueue(SourceSnapshot::new(
            2,
            buffer.snapshot().iter_lines().map(|l| l.to_string()).collect(),
        ));
        handle.join().unwrap();
        assert!(!s.result_pending());

        assert_eq!(s.drain_deferred(&mut buffer), 1);
        assert!(s.fold_store().is_collapsed(anchor));
    }

    #[test]
    fn test_toggle_applies_directly_when_idle() {
        let mut buffer = EditorBuffer::from_text("def foo():\n    pass\n");
        let s = scheduler();
        let handle = s.enqueue(buffer.snapshot());
        handle.join().unwrap();
        let anchor = s.current_result().unwrap().regions[0].anchor;

        assert_eq!(s.toggle(&mut buffer, anchor), Some(ToggleOutcome::Collapsed));
        assert_eq!(s.toggle(&mut buffer, anchor), Some(ToggleOutcome::Expanded));
    }
}
