//! Autosave Synchronizer
//!
//! Persists the latest canonical snapshot under a fixed versioned key so a
//! session survives reloads. Autosave is intentionally dumb storage: it
//! always reflects the serializer's view of the actual current feature
//! store, never a pointer into the undo stack, and it is advisory — every
//! failure degrades to a logged no-op rather than interrupting the user.
//!
//! Two tiers: a primary durable directory, and a secondary volatile
//! directory (the OS temp dir by default) written best-effort as a fallback
//! for when the primary is unavailable.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::history::Snapshot;

/// Versioned storage key. Bumping the version is the migration path for
/// incompatible schema changes; old keys are simply ignored.
pub const AUTOSAVE_KEY: &str = "truegis_autosave_v1";

const AUTOSAVE_EXTENSION: &str = "geojson";

/// Two-tier, best-effort persistence of the current snapshot.
#[derive(Debug, Clone)]
pub struct Autosave {
    /// Durable tier: `<dir>/truegis_autosave_v1.geojson`.
    primary: PathBuf,

    /// Volatile fallback tier, written independently of primary success.
    fallback: PathBuf,
}

impl Autosave {
    /// Autosave rooted at a durable directory, with the fallback tier in
    /// the OS temp dir.
    ///
    /// The fallback file name is tagged with a digest of the primary
    /// directory, so independent sessions sharing one temp dir never read
    /// each other's state.
    pub fn new(primary_dir: &Path) -> Self {
        let tag = Sha256::digest(primary_dir.to_string_lossy().as_bytes());
        let file = format!(
            "{AUTOSAVE_KEY}-{:.8}.{AUTOSAVE_EXTENSION}",
            format!("{tag:x}")
        );
        Self {
            primary: tier_path(primary_dir),
            fallback: std::env::temp_dir().join(file),
        }
    }

    /// Autosave with explicit directories for both tiers.
    pub fn with_fallback(primary_dir: &Path, fallback_dir: &Path) -> Self {
        Self {
            primary: tier_path(primary_dir),
            fallback: tier_path(fallback_dir),
        }
    }

    /// Overwrite both tiers with the latest snapshot.
    ///
    /// Writes unconditionally — empty-state text included, so clearing all
    /// drawings is itself persisted. Failures (quota, permissions, missing
    /// directory) are logged and swallowed; the fallback write happens
    /// regardless of whether the primary succeeded.
    pub fn persist(&self, text: &str) {
        if let Err(e) = fs::write(&self.primary, text) {
            warn!("autosave: primary write failed: {}: {e}", self.primary.display());
        }
        if let Err(e) = fs::write(&self.fallback, text) {
            debug!(
                "autosave: fallback write failed: {}: {e}",
                self.fallback.display()
            );
        }
    }

    /// Read the last saved snapshot, preferring the primary tier.
    ///
    /// Returns `None` for "no prior state" — absent files, empty files and
    /// unreadable tiers all collapse to that; this never fails.
    pub fn load(&self) -> Option<Snapshot> {
        read_tier(&self.primary).or_else(|| read_tier(&self.fallback))
    }

    /// Remove both tiers. Errors are swallowed.
    pub fn clear(&self) {
        for path in [&self.primary, &self.fallback] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("autosave: clear failed: {}: {e}", path.display());
                }
            }
        }
    }

    /// Path of the primary tier file.
    pub fn primary_path(&self) -> &Path {
        &self.primary
    }
}

fn tier_path(dir: &Path) -> PathBuf {
    dir.join(format!("{AUTOSAVE_KEY}.{AUTOSAVE_EXTENSION}"))
}

fn read_tier(path: &Path) -> Option<Snapshot> {
    match fs::read_to_string(path) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("autosave: read failed: {}: {e}", path.display());
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_tiers_load_none() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(primary.path(), fallback.path());
        assert_eq!(autosave.load(), None);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(primary.path(), fallback.path());

        autosave.persist(r#"{"features":[],"type":"FeatureCollection"}"#);
        assert_eq!(
            autosave.load().as_deref(),
            Some(r#"{"features":[],"type":"FeatureCollection"}"#)
        );
    }

    #[test]
    fn persist_overwrites_previous_state() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(primary.path(), fallback.path());

        autosave.persist("first");
        autosave.persist("second");
        assert_eq!(autosave.load().as_deref(), Some("second"));
    }

    #[test]
    fn fallback_tier_serves_when_primary_is_unavailable() {
        let missing = TempDir::new().unwrap().path().join("gone");
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(&missing, fallback.path());

        // Primary directory does not exist: the write is swallowed and the
        // fallback still lands.
        autosave.persist("saved anyway");
        assert_eq!(autosave.load().as_deref(), Some("saved anyway"));
    }

    #[test]
    fn empty_file_counts_as_no_prior_state() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(primary.path(), fallback.path());

        std::fs::write(autosave.primary_path(), "").unwrap();
        assert_eq!(autosave.load(), None);
    }

    #[test]
    fn fallback_is_scoped_per_primary_dir() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let autosave_a = Autosave::new(a.path());
        let autosave_b = Autosave::new(b.path());

        autosave_a.persist("a state");
        std::fs::remove_file(autosave_a.primary_path()).unwrap();

        // a still loads from its own fallback; b sees nothing.
        assert_eq!(autosave_a.load().as_deref(), Some("a state"));
        assert_eq!(autosave_b.load(), None);

        autosave_a.clear();
    }

    #[test]
    fn clear_removes_both_tiers() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let autosave = Autosave::with_fallback(primary.path(), fallback.path());

        autosave.persist("state");
        autosave.clear();
        assert_eq!(autosave.load(), None);
        // Clearing twice is harmless.
        autosave.clear();
    }
}
