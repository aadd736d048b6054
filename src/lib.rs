//! TrueGIS - Deterministic Drawing State
//!
//! TrueGIS keeps three derived views of "current drawing state" — the live
//! feature set, the undo/redo stacks, and durable autosave — perfectly
//! consistent. The load-bearing guarantee is canonical serialization: two
//! exports of the same logical state are byte-identical, so history
//! equality checks and storage writes are stable.
//!
//! # Architecture
//!
//! - [`style`] — pure normalization of loose style input
//! - [`geojson`] — the canonical serializer (the only producer of export text)
//! - [`history`] — snapshot undo/redo stacks with a suspend scope
//! - [`autosave`] — two-tier best-effort persistence of the latest snapshot
//! - [`session`] — the orchestrator sequencing the three around edit events
//!
//! Map rendering, gesture handling and the rest of the UI live outside this
//! crate; they speak to the core through the [`feature::FeatureStore`]
//! contract and the `apply_style` callback.

pub mod autosave;
pub mod cli;
pub mod error;
pub mod feature;
pub mod geojson;
pub mod history;
pub mod session;
pub mod style;

pub use autosave::{Autosave, AUTOSAVE_KEY};
pub use error::{Result, TruegisError};
pub use feature::{Feature, FeatureCollection, FeatureStore, Geometry, MemoryFeatureStore};
pub use geojson::{export_state, import_state};
pub use history::{History, Snapshot};
pub use session::{Action, EditKind, Session, SessionConfig};
pub use style::{normalize, StyleRecord};
