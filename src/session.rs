//! Session Orchestrator
//!
//! Wires the canonical serializer, the history engine, and autosave to the
//! feature store's edit events. Gesture handling lives outside the core and
//! reports mutations through explicit dispatches; the orchestrator owns the
//! action enum and sequences the three subsystems deterministically, so
//! there is exactly one answer to "who commits after undo" (nobody).

use std::time::{Duration, Instant};

use log::error;
use serde_json::Value;

use crate::autosave::Autosave;
use crate::error::Result;
use crate::feature::{Feature, FeatureStore, PREVIEW_FLAG};
use crate::geojson::{export_state, import_state};
use crate::history::{History, Snapshot};
use crate::style::{normalize, StyleRecord};

/// What kind of user edit a dispatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Geometry added, moved, deleted, imported or cleared.
    Shape,
    /// Style properties changed (slider/color input).
    Style,
}

/// One sequenced state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The user committed an edit of the given kind.
    UserEdit(EditKind),
    Undo,
    Redo,
    /// Programmatic restore of previously exported text (autosave, drop-in
    /// file). Replaces the store and resets the undo floor.
    Restore(Snapshot),
}

/// Tunable session policy.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Window inside which consecutive style edits coalesce into a single
    /// undo step instead of one step per slider tick. Zero (the default)
    /// keeps one step per dispatch.
    pub style_commit_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            style_commit_debounce: Duration::ZERO,
        }
    }
}

/// One drawing session: a feature store plus its derived views (history
/// stacks and autosave), kept consistent through [`Session::dispatch`].
pub struct Session<S, F>
where
    S: FeatureStore,
    F: FnMut(&mut Feature, &StyleRecord),
{
    store: S,
    history: History,
    autosave: Autosave,
    apply_style: F,
    config: SessionConfig,
    last_style_commit: Option<Instant>,
}

impl<S, F> Session<S, F>
where
    S: FeatureStore,
    F: FnMut(&mut Feature, &StyleRecord),
{
    /// Create a session with default policy.
    pub fn new(store: S, autosave: Autosave, apply_style: F) -> Self {
        Self::with_config(store, autosave, apply_style, SessionConfig::default())
    }

    /// Create a session with explicit policy.
    pub fn with_config(store: S, autosave: Autosave, apply_style: F, config: SessionConfig) -> Self {
        Self {
            store,
            history: History::new(),
            autosave,
            apply_style,
            config,
            last_style_commit: None,
        }
    }

    /// Startup protocol: baseline the current store, persist it, then
    /// restore the last autosaved state if one exists.
    ///
    /// Returns true when an autosave was found and restored. After a
    /// restore, the restored state is the new undo floor.
    pub fn start(&mut self) -> bool {
        // Read the previous session's state before the baseline persist
        // below overwrites the key.
        let saved = self.autosave.load();

        let baseline = match self.export_current() {
            Ok(text) => {
                self.history.initialize_baseline(text.clone());
                self.autosave.persist(&text);
                text
            }
            Err(e) => {
                error!("session start: failed to snapshot initial state: {e}");
                return false;
            }
        };

        // A saved state identical to the baseline is already live.
        match saved {
            Some(saved) if saved != baseline => self.dispatch(Action::Restore(saved)),
            _ => false,
        }
    }

    /// Sequence one action through history and autosave.
    ///
    /// Returns whether the action changed state (a new or replaced undo
    /// entry, a successful undo/redo, a successful restore).
    pub fn dispatch(&mut self, action: Action) -> bool {
        match action {
            Action::UserEdit(kind) => self.on_user_edit(kind),
            Action::Undo => self.on_history_step(true),
            Action::Redo => self.on_history_step(false),
            Action::Restore(text) => self.on_restore(&text),
        }
    }

    /// Convenience for `dispatch(Action::UserEdit(kind))`.
    pub fn commit_edit(&mut self, kind: EditKind) -> bool {
        self.dispatch(Action::UserEdit(kind))
    }

    /// Convenience for `dispatch(Action::Undo)`.
    pub fn undo(&mut self) -> bool {
        self.dispatch(Action::Undo)
    }

    /// Convenience for `dispatch(Action::Redo)`.
    pub fn redo(&mut self) -> bool {
        self.dispatch(Action::Redo)
    }

    /// Export the current store as canonical text.
    ///
    /// This is the canonicalization point: normalized style records are
    /// written back into the store's features (preview excluded) so the
    /// live state matches what was exported and later imports need no
    /// repair.
    pub fn export_current(&mut self) -> Result<Snapshot> {
        for index in 0..self.store.len() {
            let Some(mut attributes) = self.store.get_attributes(index) else {
                continue;
            };
            if attributes
                .get(PREVIEW_FLAG)
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                continue;
            }
            let style = normalize(&attributes);
            style.apply_to(&mut attributes);
            self.store.set_attributes(index, attributes);
        }
        export_state(&self.store.list_features())
    }

    /// Import features from export text as a single user edit.
    ///
    /// Parses before touching the store: malformed input returns the parse
    /// error and leaves the session exactly as it was. On success the added
    /// features form one undo step.
    pub fn import_text(&mut self, text: &str) -> Result<usize> {
        let features = import_state(text, &mut self.apply_style)?;
        let count = features.len();
        self.store.add_features(features);
        self.dispatch(Action::UserEdit(EditKind::Shape));
        Ok(count)
    }

    /// Remove every feature and commit the empty state, so clearing all
    /// drawings is itself undoable and persisted.
    pub fn clear_all(&mut self) -> bool {
        self.store.clear_all();
        self.dispatch(Action::UserEdit(EditKind::Shape))
    }

    /// The feature store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable feature store access for the gesture layer. Mutations do not
    /// reach history or autosave until a [`Session::commit_edit`].
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The history engine (undo/redo availability for UI state).
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Replace the history stacks wholesale.
    ///
    /// Used when adopting stacks persisted by an earlier process. Adoption
    /// is refused (keeping the current baseline) when the candidate has no
    /// baseline or its top entry disagrees with the current state —
    /// otherwise undo would restore something the user never saw.
    pub fn adopt_history(&mut self, candidate: History) -> bool {
        if candidate.undo_depth() == 0 {
            return false;
        }
        let current = match self.export_current() {
            Ok(text) => text,
            Err(_) => return false,
        };
        if candidate.current() != Some(current.as_str()) {
            return false;
        }
        self.history = candidate;
        true
    }

    /// The autosave synchronizer.
    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    fn on_user_edit(&mut self, kind: EditKind) -> bool {
        let coalesce = kind == EditKind::Style && self.within_style_window();
        let committed = if coalesce {
            self.history.amend(&self.store)
        } else {
            self.history.commit(&self.store)
        };

        self.last_style_commit = match kind {
            EditKind::Style => Some(Instant::now()),
            EditKind::Shape => None,
        };

        // Unconditional, even when the commit was a duplicate no-op:
        // display-only changes may still need an autosave refresh.
        self.persist_current();
        committed
    }

    fn on_history_step(&mut self, undo: bool) -> bool {
        let moved = if undo {
            self.history.undo(&mut self.store, &mut self.apply_style)
        } else {
            self.history.redo(&mut self.store, &mut self.apply_style)
        };
        if moved {
            self.last_style_commit = None;
            self.persist_current();
        }
        moved
    }

    fn on_restore(&mut self, text: &str) -> bool {
        // Parse first: a failed restore must leave the store untouched.
        let features = match import_state(text, &mut self.apply_style) {
            Ok(features) => features,
            Err(e) => {
                error!("restore failed, keeping current state: {e}");
                return false;
            }
        };

        let store = &mut self.store;
        self.history.with_suspend(|_| {
            store.clear_all();
            store.add_features(features);
        });
        self.last_style_commit = None;

        match self.export_current() {
            Ok(restored) => {
                self.history.initialize_baseline(restored.clone());
                self.autosave.persist(&restored);
                true
            }
            Err(e) => {
                error!("failed to re-baseline after restore: {e}");
                false
            }
        }
    }

    fn persist_current(&mut self) {
        match self.export_current() {
            Ok(text) => self.autosave.persist(&text),
            Err(e) => error!("autosave skipped, export failed: {e}"),
        }
    }

    fn within_style_window(&self) -> bool {
        if self.config.style_commit_debounce.is_zero() {
            return false;
        }
        self.last_style_commit
            .is_some_and(|at| at.elapsed() <= self.config.style_commit_debounce)
    }
}
