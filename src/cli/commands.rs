//! CLI Command Implementations
//!
//! Each command opens the session directory, performs one dispatch through
//! the orchestrator, and saves the history stacks and session metadata back
//! to disk. The feature store itself is reconstructed from autosave on every
//! invocation; persisted history stacks are adopted only while they still
//! agree with the autosaved state.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::autosave::Autosave;
use crate::cli::{Shape, StyleArgs};
use crate::error::{Result, TruegisError};
use crate::feature::{circle_to_polygon, Feature, FeatureStore, Geometry, MemoryFeatureStore, Position};
use crate::history::History;
use crate::session::{EditKind, Session};
use crate::style::StyleRecord;

/// Session directory structure constants.
pub const SESSION_FILE: &str = "session.json";
pub const HISTORY_DIR: &str = "history";

/// Current session schema version. Bumped together with the autosave key on
/// incompatible changes; there is no in-place migration.
pub const SCHEMA_VERSION: &str = "1";

const TRUEGIS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session metadata stored as `session.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Schema version of the session directory layout.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Timestamp when the session was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last modification.
    pub modified_at: DateTime<Utc>,

    /// TrueGIS version that last modified this session.
    pub truegis_version: String,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, Value>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

type CliSession = Session<MemoryFeatureStore, fn(&mut Feature, &StyleRecord)>;

/// The CLI has no rendering layer to re-style features.
fn no_style(_: &mut Feature, _: &StyleRecord) {}

/// Create a new session directory.
pub fn init(path: &Path) -> Result<()> {
    info!("Creating new session at: {}", path.display());

    if path.join(SESSION_FILE).exists() {
        return Err(TruegisError::SessionAlreadyExists {
            path: path.to_path_buf(),
        });
    }

    for dir in [path.to_path_buf(), path.join(HISTORY_DIR)] {
        fs::create_dir_all(&dir).map_err(|e| TruegisError::DirectoryCreate {
            path: dir.clone(),
            source: e,
        })?;
    }

    let now = Utc::now();
    let meta = SessionMeta {
        schema_version: SCHEMA_VERSION.to_string(),
        created_at: now,
        modified_at: now,
        truegis_version: TRUEGIS_VERSION.to_string(),
        unknown_fields: HashMap::new(),
    };
    write_meta(path, &meta)?;

    let mut session = new_session(path);
    // A recycled directory may still hold an old autosave; a new session
    // starts empty.
    session.autosave().clear();
    session.start();
    session.history().save(&path.join(HISTORY_DIR))?;

    println!("Session created: {}", path.display());
    Ok(())
}

/// Draw one shape into the session.
pub fn add(path: &Path, shape: Shape) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    let (geometry, style) = build_shape(shape)?;
    let label = geometry.type_name();

    let mut feature = Feature::with_id(Uuid::new_v4().to_string(), geometry);
    apply_style_args(&mut feature, &style);

    session.store_mut().add_features(vec![feature]);
    session.commit_edit(EditKind::Shape);
    save_session(path, &mut session, &mut meta)?;

    println!("Added {} ({} features total)", label, session.store().len());
    Ok(())
}

/// Translate one feature by an offset.
pub fn move_feature(path: &Path, index: usize, dx: f64, dy: f64) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    let len = session.store().len();
    let mut geometry = session
        .store()
        .get_geometry(index)
        .ok_or(TruegisError::FeatureIndexOutOfRange { index, len })?;
    geometry.translate(dx, dy);
    session.store_mut().set_geometry(index, geometry);

    session.commit_edit(EditKind::Shape);
    save_session(path, &mut session, &mut meta)?;

    println!("Moved feature {index} by ({dx}, {dy})");
    Ok(())
}

/// Change style properties on one feature or on all of them.
pub fn restyle(path: &Path, index: Option<usize>, style: StyleArgs) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    let len = session.store().len();
    let indices: Vec<usize> = match index {
        Some(i) if i < len => vec![i],
        Some(i) => return Err(TruegisError::FeatureIndexOutOfRange { index: i, len }),
        None => (0..len).collect(),
    };

    for i in &indices {
        let Some(mut attributes) = session.store().get_attributes(*i) else {
            continue;
        };
        merge_style_args(&mut attributes, &style);
        session.store_mut().set_attributes(*i, attributes);
    }

    session.commit_edit(EditKind::Style);
    save_session(path, &mut session, &mut meta)?;

    println!("Restyled {} feature(s)", indices.len());
    Ok(())
}

/// Undo the last edit.
pub fn undo(path: &Path) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    if session.undo() {
        println!("Undone. {} features.", session.store().len());
    } else {
        println!("Nothing to undo.");
    }

    save_session(path, &mut session, &mut meta)
}

/// Redo the last undone edit.
pub fn redo(path: &Path) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    if session.redo() {
        println!("Redone. {} features.", session.store().len());
    } else {
        println!("Nothing to redo.");
    }

    save_session(path, &mut session, &mut meta)
}

/// List the snapshot history.
pub fn show_history(path: &Path) -> Result<()> {
    let (session, _) = open_session(path)?;
    let history = session.history();

    println!("Snapshot history (oldest first):");
    println!("{:-<48}", "");
    let depth = history.undo_depth();
    for (i, snapshot) in history.undo_entries().iter().enumerate() {
        let digest = Sha256::digest(snapshot.as_bytes());
        let marker = if i + 1 == depth { "->" } else { "  " };
        let label = if i == 0 { " (baseline)" } else { "" };
        println!(
            "{marker} {i}: {:.8} {} bytes{label}",
            format!("{digest:x}"),
            snapshot.len()
        );
    }
    println!("{} redo entries pending", history.redo_depth());

    Ok(())
}

/// Export the session as canonical GeoJSON text.
pub fn export(path: &Path, output: Option<&Path>) -> Result<()> {
    let (mut session, _) = open_session(path)?;
    let text = session.export_current()?;

    match output {
        Some(file) => {
            fs::write(file, &text).map_err(|e| TruegisError::FileWrite {
                path: file.to_path_buf(),
                source: e,
            })?;
            println!("Exported {} features to {}", session.store().len(), file.display());
        }
        None => println!("{text}"),
    }

    Ok(())
}

/// Import features from a GeoJSON file as one undoable edit.
pub fn import(path: &Path, file: &Path) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    let text = fs::read_to_string(file).map_err(|e| TruegisError::FileRead {
        path: file.to_path_buf(),
        source: e,
    })?;

    match session.import_text(&text) {
        Ok(count) => {
            save_session(path, &mut session, &mut meta)?;
            println!("Imported {count} features from {}", file.display());
        }
        Err(e) => {
            // Malformed input is messaged, not fatal; the session is
            // untouched.
            warn!("import failed: {e}");
            println!("Could not read file: {}", file.display());
        }
    }

    Ok(())
}

/// Remove all drawings. The empty state is committed and persisted, so this
/// is undoable and survives reloads as "empty", not "nothing saved".
pub fn clear(path: &Path) -> Result<()> {
    let (mut session, mut meta) = open_session(path)?;

    session.clear_all();
    save_session(path, &mut session, &mut meta)?;

    println!("Cleared all drawings.");
    Ok(())
}

/// Show session metadata and a feature summary.
pub fn status(path: &Path) -> Result<()> {
    let (session, meta) = open_session(path)?;

    println!("Session: {}", path.display());
    println!("Schema version: {}", meta.schema_version);
    println!("Created: {}", meta.created_at);
    println!("Last modified: {}", meta.modified_at);
    println!("Autosave: {}", session.autosave().primary_path().display());
    println!(
        "History: {} undo / {} redo",
        session.history().undo_depth(),
        session.history().redo_depth()
    );

    let features = session.store().list_features();
    println!("Features: {}", features.len());
    for (i, feature) in features.iter().enumerate() {
        let id = feature.id.as_deref().unwrap_or("-");
        println!("  {i}: {} id={id}", feature.geometry.type_name());
    }

    Ok(())
}

fn new_session(path: &Path) -> CliSession {
    Session::new(
        MemoryFeatureStore::new(),
        Autosave::new(path),
        no_style as fn(&mut Feature, &StyleRecord),
    )
}

fn open_session(path: &Path) -> Result<(CliSession, SessionMeta)> {
    let meta = read_meta(path)?;

    let mut session = new_session(path);
    session.start();

    // Adopt stacks persisted by the previous invocation, as long as they
    // still agree with the autosaved state.
    match History::load(&path.join(HISTORY_DIR)) {
        Ok(persisted) => {
            if persisted.undo_depth() > 0 && !session.adopt_history(persisted) {
                warn!("persisted history diverged from autosave; starting fresh baseline");
            }
        }
        Err(e) => warn!("could not load persisted history: {e}"),
    }

    Ok((session, meta))
}

fn save_session(path: &Path, session: &mut CliSession, meta: &mut SessionMeta) -> Result<()> {
    session.history().save(&path.join(HISTORY_DIR))?;

    meta.modified_at = Utc::now();
    meta.truegis_version = TRUEGIS_VERSION.to_string();
    write_meta(path, meta)
}

fn read_meta(path: &Path) -> Result<SessionMeta> {
    let meta_path = path.join(SESSION_FILE);
    if !meta_path.exists() {
        return Err(TruegisError::SessionNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(&meta_path).map_err(|e| TruegisError::FileRead {
        path: meta_path,
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn write_meta(path: &Path, meta: &SessionMeta) -> Result<()> {
    let meta_path = path.join(SESSION_FILE);
    let content = serde_json::to_string_pretty(meta)?;
    fs::write(&meta_path, content).map_err(|e| TruegisError::FileWrite {
        path: meta_path,
        source: e,
    })
}

fn build_shape(shape: Shape) -> Result<(Geometry, StyleArgs)> {
    match shape {
        Shape::Point { at, style } => Ok((Geometry::Point(parse_position(&at)?), style)),
        Shape::Line { points, style } => {
            let positions = parse_positions(&points)?;
            Ok((Geometry::LineString(positions), style))
        }
        Shape::Polygon { points, style } => {
            let mut ring = parse_positions(&points)?;
            // Close the ring on the first vertex.
            if ring.first() != ring.last() {
                if let Some(first) = ring.first().cloned() {
                    ring.push(first);
                }
            }
            Ok((Geometry::Polygon(vec![ring]), style))
        }
        Shape::Circle {
            center,
            radius,
            sides,
            style,
        } => {
            let center = parse_position(&center)?;
            Ok((
                circle_to_polygon([center[0], center[1]], radius, sides),
                style,
            ))
        }
    }
}

fn parse_position(text: &str) -> Result<Position> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| TruegisError::InvalidCoordinate {
            text: text.to_string(),
        })?;
    if parts.len() < 2 {
        return Err(TruegisError::InvalidCoordinate {
            text: text.to_string(),
        });
    }
    Ok(parts)
}

fn parse_positions(texts: &[String]) -> Result<Vec<Position>> {
    texts.iter().map(|text| parse_position(text)).collect()
}

fn apply_style_args(feature: &mut Feature, style: &StyleArgs) {
    merge_style_args(&mut feature.properties, style);
}

fn merge_style_args(properties: &mut serde_json::Map<String, Value>, style: &StyleArgs) {
    if let Some(color) = &style.fill_color {
        properties.insert("fillColor".into(), Value::String(color.clone()));
    }
    if let Some(opacity) = style.fill_opacity {
        properties.insert("fillOpacity".into(), Value::from(opacity));
    }
    if let Some(color) = &style.stroke_color {
        properties.insert("strokeColor".into(), Value::String(color.clone()));
    }
    if let Some(opacity) = style.stroke_opacity {
        properties.insert("strokeOpacity".into(), Value::from(opacity));
    }
    if let Some(width) = style.stroke_width {
        properties.insert("strokeWidth".into(), Value::from(width));
    }
}
