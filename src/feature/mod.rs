//! Feature Model and Store Contract
//!
//! A [`Feature`] is externally-owned geometry plus a mapping of named
//! properties. The core only reads and writes the five reserved style keys
//! and the preview flag; every other property is opaque pass-through data
//! preserved verbatim across export and import.

pub mod geometry;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::style::StyleRecord;

pub use geometry::{circle_to_polygon, round_coord, Geometry, Position, CIRCLE_SIDES, COORD_DECIMALS};

/// Reserved boolean property marking the transient print-preview feature.
///
/// The preview is owned by the map-preview collaborator; the core's only
/// obligation is to filter it out of every serialization, history snapshot,
/// and autosave write.
pub const PREVIEW_FLAG: &str = "__truegis_preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FeatureKind {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionKind {
    FeatureCollection,
}

/// A single drawable feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: FeatureKind,

    /// Explicit identifier, if any. Used verbatim as the export sort key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The feature geometry.
    pub geometry: Geometry,

    /// Named properties. Style keys and the preview flag are reserved;
    /// everything else passes through untouched.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature with no id and empty properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: FeatureKind::Feature,
            id: None,
            geometry,
            properties: Map::new(),
        }
    }

    /// Create a feature with an explicit identifier.
    pub fn with_id(id: impl Into<String>, geometry: Geometry) -> Self {
        let mut feature = Self::new(geometry);
        feature.id = Some(id.into());
        feature
    }

    /// Whether this feature is the transient preview overlay.
    pub fn is_preview(&self) -> bool {
        self.properties
            .get(PREVIEW_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Overwrite the reserved style keys with a normalized record.
    pub fn set_style(&mut self, style: &StyleRecord) {
        style.apply_to(&mut self.properties);
    }
}

/// A GeoJSON feature collection — the document shape of the export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionKind,

    /// The member features, in emission order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Wrap a list of features in a collection document.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }
}

/// The feature-store contract the core consumes.
///
/// The rendering layer owns an implementation of this (a vector source in
/// the original application); the core never touches rendering state and
/// delegates visual re-styling to the session's `apply_style` callback.
pub trait FeatureStore {
    /// Number of features currently in the store, preview included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all features, in store order.
    fn list_features(&self) -> Vec<Feature>;

    /// Append features to the store.
    fn add_features(&mut self, features: Vec<Feature>);

    /// Remove every feature, preview included.
    fn clear_all(&mut self);

    /// Properties of the feature at `index`, if in range.
    fn get_attributes(&self, index: usize) -> Option<Map<String, Value>>;

    /// Replace the properties of the feature at `index`. Out-of-range
    /// indices are ignored.
    fn set_attributes(&mut self, index: usize, attributes: Map<String, Value>);

    /// Geometry of the feature at `index`, if in range.
    fn get_geometry(&self, index: usize) -> Option<Geometry>;

    /// Replace the geometry of the feature at `index`. Out-of-range indices
    /// are ignored.
    fn set_geometry(&mut self, index: usize, geometry: Geometry);
}

/// In-process feature store backed by a `Vec`.
///
/// Used by the CLI and tests; a rendering frontend would implement
/// [`FeatureStore`] over its own scene instead.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeatureStore {
    features: Vec<Feature>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct access for tests and diagnostics.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn len(&self) -> usize {
        self.features.len()
    }

    fn list_features(&self) -> Vec<Feature> {
        self.features.clone()
    }

    fn add_features(&mut self, features: Vec<Feature>) {
        self.features.extend(features);
    }

    fn clear_all(&mut self) {
        self.features.clear();
    }

    fn get_attributes(&self, index: usize) -> Option<Map<String, Value>> {
        self.features.get(index).map(|f| f.properties.clone())
    }

    fn set_attributes(&mut self, index: usize, attributes: Map<String, Value>) {
        if let Some(feature) = self.features.get_mut(index) {
            feature.properties = attributes;
        }
    }

    fn get_geometry(&self, index: usize) -> Option<Geometry> {
        self.features.get(index).map(|f| f.geometry.clone())
    }

    fn set_geometry(&mut self, index: usize, geometry: Geometry) {
        if let Some(feature) = self.features.get_mut(index) {
            feature.geometry = geometry;
        }
    }
}
