//! Undo/Redo History Engine
//!
//! Maintains undo and redo stacks of canonical text snapshots. The rules
//! that keep the stacks honest:
//!
//! - `commit` (and its coalescing variant `amend`) is the only operation
//!   that clears the redo stack,
//! - `undo`/`redo` never commit, or redo history would be wiped,
//! - `with_suspend` exempts programmatic restores from generating entries,
//! - the baseline at index 0 can never be undone past and survives trimming.
//!
//! Stacks are fields of a per-session instance, never module state, so
//! independent documents can coexist in tests.

use std::fs;
use std::path::Path;

use log::error;

use crate::error::{Result, TruegisError};
use crate::feature::FeatureStore;
use crate::geojson::{export_state, import_state, ApplyStyle};

/// One canonical export text, representing the full feature set (minus the
/// preview marker) at one instant. Compared by string equality only.
pub type Snapshot = String;

/// Default bound on the undo stack. Prevents unbounded memory growth when
/// someone draws for hours.
pub const DEFAULT_MAX_UNDO_DEPTH: usize = 250;

/// File name for the persisted undo stack.
const UNDO_STACK_FILE: &str = "undo_stack.json";

/// File name for the persisted redo stack.
const REDO_STACK_FILE: &str = "redo_stack.json";

/// Snapshot-based undo/redo history for one drawing session.
#[derive(Debug, Clone)]
pub struct History {
    /// Snapshots that can be returned to, oldest first. Index 0 is the
    /// baseline once initialized.
    undo_stack: Vec<Snapshot>,

    /// Undone snapshots, most recently undone last.
    redo_stack: Vec<Snapshot>,

    /// Maximum undo stack length before trimming.
    max_depth: usize,

    /// While set, commits are no-ops. See [`History::with_suspend`].
    suspended: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history with the default depth bound.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_MAX_UNDO_DEPTH)
    }

    /// Create an empty history with a custom depth bound.
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            suspended: false,
        }
    }

    /// Reset both stacks and push `snapshot` as the sole undo entry.
    ///
    /// Called at startup and again whenever autosave is restored, so the
    /// restored state becomes the new undo floor: undo never jumps past
    /// what the user actually saw.
    pub fn initialize_baseline(&mut self, snapshot: Snapshot) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.undo_stack.push(snapshot);
    }

    /// Snapshot the store and push it if it differs from the top entry.
    ///
    /// Returns true when a new undo step was added. No-ops (returning
    /// false) while suspended or when the snapshot equals the current top,
    /// which suppresses duplicate entries from display-only changes.
    pub fn commit<S: FeatureStore + ?Sized>(&mut self, store: &S) -> bool {
        if self.suspended {
            return false;
        }
        let Some(snapshot) = self.snapshot_of(store) else {
            return false;
        };
        self.push_if_changed(snapshot)
    }

    /// Like [`History::commit`], but replaces the newest non-baseline entry
    /// instead of pushing.
    ///
    /// Used to coalesce rapid style tweaks into a single undo step. Still a
    /// commit: the redo stack is cleared. Falls back to a push when only
    /// the baseline exists.
    pub fn amend<S: FeatureStore + ?Sized>(&mut self, store: &S) -> bool {
        if self.suspended {
            return false;
        }
        let Some(snapshot) = self.snapshot_of(store) else {
            return false;
        };
        if self.current() == Some(snapshot.as_str()) {
            return false;
        }
        if self.undo_stack.len() <= 1 {
            return self.push_if_changed(snapshot);
        }
        if let Some(top) = self.undo_stack.last_mut() {
            *top = snapshot;
        }
        self.redo_stack.clear();
        true
    }

    /// Step back one snapshot, restoring the store.
    ///
    /// Fails silently (returns false) at the floor: the baseline can never
    /// be undone past. Never commits.
    pub fn undo<S: FeatureStore + ?Sized>(
        &mut self,
        store: &mut S,
        apply_style: ApplyStyle<'_>,
    ) -> bool {
        if !self.can_undo() {
            return false;
        }
        let Some(current) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(current);

        let Some(target) = self.undo_stack.last().cloned() else {
            return false;
        };
        self.restore_from_text(&target, store, apply_style);
        true
    }

    /// Step forward one undone snapshot, restoring the store.
    ///
    /// Fails silently when the redo stack is empty. Never commits.
    pub fn redo<S: FeatureStore + ?Sized>(
        &mut self,
        store: &mut S,
        apply_style: ApplyStyle<'_>,
    ) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.push_undo(next.clone());
        self.restore_from_text(&next, store, apply_style);
        true
    }

    /// Run `action` with commits suspended.
    ///
    /// Restoring a snapshot into the feature store triggers the same
    /// mutation events as a user edit; without suspension a restore would
    /// commit itself as a "new" edit and corrupt the stack. The flag is
    /// cleared on every exit path, including unwinding.
    pub fn with_suspend<T>(&mut self, action: impl FnOnce(&mut History) -> T) -> T {
        struct ResetOnDrop<'a>(&'a mut History);
        impl Drop for ResetOnDrop<'_> {
            fn drop(&mut self) {
                self.0.suspended = false;
            }
        }

        self.suspended = true;
        let mut guard = ResetOnDrop(self);
        action(&mut *guard.0)
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// The newest committed snapshot, if any.
    pub fn current(&self) -> Option<&str> {
        self.undo_stack.last().map(String::as_str)
    }

    /// Number of entries on the undo stack (baseline included).
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries on the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether commits are currently suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Undo snapshots, oldest first. For history display.
    pub fn undo_entries(&self) -> &[Snapshot] {
        &self.undo_stack
    }

    /// Load persisted stacks from a history directory.
    ///
    /// Missing files yield empty stacks; the caller decides whether to
    /// adopt the result or re-baseline.
    pub fn load(history_dir: &Path) -> Result<Self> {
        let undo_stack = read_stack(&history_dir.join(UNDO_STACK_FILE))?;
        let redo_stack = read_stack(&history_dir.join(REDO_STACK_FILE))?;
        Ok(Self {
            undo_stack,
            redo_stack,
            max_depth: DEFAULT_MAX_UNDO_DEPTH,
            suspended: false,
        })
    }

    /// Persist both stacks into a history directory.
    pub fn save(&self, history_dir: &Path) -> Result<()> {
        if !history_dir.exists() {
            fs::create_dir_all(history_dir).map_err(|e| TruegisError::DirectoryCreate {
                path: history_dir.to_path_buf(),
                source: e,
            })?;
        }
        write_stack(&history_dir.join(UNDO_STACK_FILE), &self.undo_stack)?;
        write_stack(&history_dir.join(REDO_STACK_FILE), &self.redo_stack)?;
        Ok(())
    }

    fn snapshot_of<S: FeatureStore + ?Sized>(&self, store: &S) -> Option<Snapshot> {
        match export_state(&store.list_features()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!("failed to snapshot feature store: {e}");
                None
            }
        }
    }

    fn push_if_changed(&mut self, snapshot: Snapshot) -> bool {
        if self.current() == Some(snapshot.as_str()) {
            return false;
        }
        self.push_undo(snapshot);
        self.redo_stack.clear();
        true
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > self.max_depth {
            // Trim from just after index 0 so the baseline is retained.
            let excess = self.undo_stack.len() - self.max_depth;
            self.undo_stack.drain(1..1 + excess);
        }
    }

    fn restore_from_text<S: FeatureStore + ?Sized>(
        &mut self,
        text: &str,
        store: &mut S,
        apply_style: ApplyStyle<'_>,
    ) {
        // Parse before mutating: a corrupt snapshot must not leave the
        // store half cleared.
        let features = match import_state(text, apply_style) {
            Ok(features) => features,
            Err(e) => {
                error!("failed to restore snapshot: {e}");
                return;
            }
        };
        self.with_suspend(|_| {
            store.clear_all();
            store.add_features(features);
        });
    }
}

fn read_stack(path: &Path) -> Result<Vec<Snapshot>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| TruegisError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn write_stack(path: &Path, stack: &[Snapshot]) -> Result<()> {
    let content = serde_json::to_string_pretty(stack)?;
    fs::write(path, content).map_err(|e| TruegisError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
