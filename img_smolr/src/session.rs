//! Shared conversion session
//!
//! The queue, run-level messages and statistics live behind one mutex. The
//! caller adds and removes files through `Session` at any time, including
//! while a run is in progress on another thread. Sinks are notified after the
//! lock is released, so a sink may call back into the session.

use crate::messages::MessageBoard;
use crate::pipeline::Capabilities;
use crate::queue::FileQueue;
use crate::settings::ConversionSettings;
use crate::stats::RunStats;
use crate::status::{ConversionStatus, FileItem, ItemId};
use crate::validation::{check_disk_space, check_output_conflicts, OVERWRITE_MARKER};
use shared_utils::batch::collect_images;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Everything an observer is told about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ItemStatus {
        id: ItemId,
        path: PathBuf,
        status: ConversionStatus,
    },
    Warnings(Vec<String>),
    Errors(Vec<String>),
    Stats(RunStats),
    RunStarted {
        total: usize,
    },
    RunFinished {
        cancelled: bool,
    },
}

/// Read-only observer of a session.
pub trait StatusSink: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// Point-in-time copy of the session for display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub items: Vec<FileItem>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub stats: RunStats,
}

pub(crate) struct SessionState {
    pub(crate) queue: FileQueue,
    pub(crate) board: MessageBoard,
    pub(crate) stats: RunStats,
    pub(crate) settings: ConversionSettings,
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    sinks: Arc<Mutex<Vec<Arc<dyn StatusSink>>>>,
    caps: Capabilities,
}

/// Events gathered while the lock is held, dispatched once it is released.
#[derive(Default)]
pub(crate) struct Pending(Vec<SessionEvent>);

impl Pending {
    pub(crate) fn status(&mut self, state: &SessionState, id: ItemId) {
        if let Some(item) = state.queue.get(id) {
            self.0.push(SessionEvent::ItemStatus {
                id,
                path: item.path().to_path_buf(),
                status: item.status().clone(),
            });
        }
    }

    pub(crate) fn warnings(&mut self, state: &SessionState) {
        self.0
            .push(SessionEvent::Warnings(state.board.warnings().to_vec()));
    }

    pub(crate) fn errors(&mut self, state: &SessionState) {
        self.0.push(SessionEvent::Errors(state.board.errors().to_vec()));
    }

    pub(crate) fn stats(&mut self, state: &SessionState) {
        self.0.push(SessionEvent::Stats(state.stats));
    }

    pub(crate) fn push(&mut self, event: SessionEvent) {
        self.0.push(event);
    }
}

impl Session {
    pub fn new(settings: ConversionSettings, caps: Capabilities) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                queue: FileQueue::new(),
                board: MessageBoard::default(),
                stats: RunStats::default(),
                settings,
            })),
            sinks: Arc::new(Mutex::new(Vec::new())),
            caps,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn add_sink(&self, sink: Arc<dyn StatusSink>) {
        self.sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sink);
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `f` under the lock, then hands whatever it queued to the sinks.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SessionState, &mut Pending) -> R) -> R {
        let mut pending = Pending::default();
        let (result, hide_warnings) = {
            let mut state = self.lock();
            let result = f(&mut *state, &mut pending);
            (result, state.settings.hide_warnings)
        };
        self.dispatch(pending, hide_warnings);
        result
    }

    fn dispatch(&self, pending: Pending, hide_warnings: bool) {
        if pending.0.is_empty() {
            return;
        }
        let sinks = self
            .sinks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for event in &pending.0 {
            if hide_warnings && matches!(event, SessionEvent::Warnings(_)) {
                continue;
            }
            for sink in &sinks {
                sink.on_event(event);
            }
        }
    }

    /// Queues files and directories. Directories contribute their image files
    /// recursively, hidden entries skipped; files are queued as given.
    /// Nonexistent paths are ignored.
    pub fn add_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<ItemId> {
        let mut found = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !self.caps.fs.exists(path) {
                debug!(path = %path.display(), "Ignoring nonexistent path");
                continue;
            }
            if self.caps.fs.is_dir(path) {
                found.extend(collect_images(path));
            } else {
                found.push(path.to_path_buf());
            }
        }

        self.update(|state, pending| {
            state.stats = RunStats::default();
            state.board.clear_errors();
            let ids: Vec<ItemId> = found.into_iter().map(|p| state.queue.push(p)).collect();
            info!(added = ids.len(), queued = state.queue.len(), "Files queued");
            for id in &ids {
                pending.status(state, *id);
            }
            self.run_checks(state, pending, true);
            pending.errors(state);
            pending.stats(state);
            ids
        })
    }

    /// Removes items, possibly mid-run. A removed item's pending result is
    /// discarded by the orchestrator.
    pub fn remove(&self, ids: &[ItemId]) -> usize {
        self.update(|state, pending| {
            let removed = ids
                .iter()
                .filter(|id| state.queue.remove(**id).is_some())
                .count();
            self.run_checks(state, pending, false);
            removed
        })
    }

    pub fn clear(&self) {
        self.update(|state, pending| {
            state.queue.clear();
            self.run_checks(state, pending, false);
        })
    }

    /// Replaces the settings and re-checks collisions against the new names.
    pub fn set_settings(&self, settings: ConversionSettings) {
        self.update(|state, pending| {
            state.settings = settings;
            self.run_checks(state, pending, false);
        })
    }

    /// Re-runs the collision and disk-space checks.
    pub fn refresh_checks(&self) {
        self.update(|state, pending| self.run_checks(state, pending, true))
    }

    fn run_checks(&self, state: &mut SessionState, pending: &mut Pending, disk: bool) {
        let SessionState {
            queue,
            board,
            settings,
            ..
        } = &mut *state;
        let changed = check_output_conflicts(queue, board, settings, self.caps.fs.as_ref());
        if disk {
            if let Some(warning) =
                check_disk_space(queue, settings, self.caps.fs.as_ref(), &self.caps.scratch_dir)
            {
                board.add_warning(warning);
            }
        }
        for (id, _) in changed {
            pending.status(state, id);
        }
        pending.warnings(state);
    }

    pub fn dismiss_warning(&self, index: usize) -> Option<String> {
        self.update(|state, pending| {
            let removed = state.board.dismiss_warning(index);
            if removed.is_some() {
                pending.warnings(state);
            }
            removed
        })
    }

    pub fn dismiss_error(&self, index: usize) -> Option<String> {
        self.update(|state, pending| {
            let removed = state.board.dismiss_error(index);
            if removed.is_some() {
                pending.errors(state);
            }
            removed
        })
    }

    pub fn settings(&self) -> ConversionSettings {
        self.lock().settings.clone()
    }

    pub fn stats(&self) -> RunStats {
        self.lock().stats
    }

    pub fn item(&self, id: ItemId) -> Option<FileItem> {
        self.lock().queue.get(id).cloned()
    }

    pub fn is_processed(&self, id: ItemId) -> bool {
        self.lock().queue.is_processed(id)
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Warnings as the user should see them: empty when hidden.
    pub fn visible_warnings(&self) -> Vec<String> {
        let state = self.lock();
        if state.settings.hide_warnings {
            Vec::new()
        } else {
            state.board.warnings().to_vec()
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            items: state.queue.iter().cloned().collect(),
            warnings: state.board.warnings().to_vec(),
            errors: state.board.errors().to_vec(),
            stats: state.stats,
        }
    }

    // Run steps, driven by the orchestrator.

    /// Resets counters and errors, marks pending images `Waiting` and returns
    /// the ids to visit in queue order.
    pub(crate) fn begin_run(&self) -> Vec<ItemId> {
        self.update(|state, pending| {
            let eligible: Vec<ItemId> = state.queue.pending_images().map(|i| i.id()).collect();
            state.stats = RunStats::for_run(eligible.len());
            state.board.clear_errors();
            for id in &eligible {
                state.queue.set_status(*id, ConversionStatus::Waiting);
                pending.status(state, *id);
            }
            pending.errors(state);
            pending.stats(state);
            pending.push(SessionEvent::RunStarted {
                total: eligible.len(),
            });
            state.queue.ids()
        })
    }

    /// Moves a still-queued, unprocessed image to `Converting` and returns its
    /// path. `None` means skip it.
    pub(crate) fn claim(&self, id: ItemId) -> Option<PathBuf> {
        self.update(|state, pending| {
            let item = match state.queue.get(id) {
                Some(item) => item,
                None => {
                    debug!(%id, "Item removed before conversion");
                    return None;
                }
            };
            if !item.is_image() || state.queue.is_processed(id) {
                return None;
            }
            let path = item.path().to_path_buf();
            state.queue.set_status(id, ConversionStatus::Converting);
            pending.status(state, id);
            Some(path)
        })
    }

    /// Records a success unless the item was removed meanwhile. Returns
    /// whether the result was kept.
    pub(crate) fn commit_success(
        &self,
        id: ItemId,
        original: Option<u64>,
        output: Option<u64>,
    ) -> bool {
        self.update(|state, pending| {
            if !state.queue.contains(id) {
                debug!(%id, "Discarding result for removed item");
                return false;
            }
            state.queue.mark_processed(id);
            state.queue.set_status(id, ConversionStatus::Done);
            state.stats.record_success(original, output);
            pending.status(state, id);
            pending.stats(state);
            true
        })
    }

    pub(crate) fn commit_failure(&self, id: ItemId, message: String) -> bool {
        self.update(|state, pending| {
            if !state.queue.contains(id) {
                debug!(%id, "Discarding failure for removed item");
                return false;
            }
            state.queue.set_status(id, ConversionStatus::Failed);
            state.board.add_error(message);
            pending.status(state, id);
            pending.errors(state);
            true
        })
    }

    pub(crate) fn finish_run(&self, cancelled: bool) {
        self.update(|state, pending| {
            if state.board.remove_warnings_containing(OVERWRITE_MARKER) {
                pending.warnings(state);
            }
            pending.push(SessionEvent::RunFinished { cancelled });
        })
    }
}
