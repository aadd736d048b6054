//! Canonical GeoJSON Serialization
//!
//! Undo/redo history and autosave both store snapshots as text, so two
//! exports of the same logical state must be byte-identical: any ordering or
//! precision wobble would break snapshot equality and wipe redo history even
//! though the map "looks the same". This module is the only place export
//! text is produced, and it is canonical by construction:
//!
//! - the preview feature is filtered out,
//! - style properties are normalized before emission,
//! - features are sorted by a stable key (explicit id, else a surrogate),
//! - coordinates are rounded to a fixed precision,
//! - object keys are recursively sorted,
//! - no whitespace is inserted.

use log::debug;

use crate::error::{Result, TruegisError};
use crate::feature::{Feature, FeatureCollection, PREVIEW_FLAG};
use crate::style::{normalize, StyleRecord, STYLE_KEYS};

/// Callback invoked for every imported feature so the rendering layer can
/// re-derive a visual style from the canonical record.
pub type ApplyStyle<'a> = &'a mut dyn FnMut(&mut Feature, &StyleRecord);

/// Export features as canonical GeoJSON text.
///
/// For any two feature sets that are semantically equal (same geometries up
/// to rounding, same normalized styles, same extra properties), the returned
/// strings are byte-identical regardless of insertion order.
pub fn export_state(features: &[Feature]) -> Result<String> {
    let mut keyed: Vec<(String, Feature)> = features
        .iter()
        .filter(|f| !f.is_preview())
        .enumerate()
        .map(|(index, feature)| {
            let clean = canonical_feature(feature);
            (sort_key(&clean, index), clean)
        })
        .collect();

    // Stable feature order: lexicographic by key, not insertion order.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let collection = FeatureCollection::new(keyed.into_iter().map(|(_, f)| f).collect());

    // serde_json's default object map is a BTreeMap, so converting through
    // Value sorts every object key in the document tree; compact printing
    // adds no whitespace.
    let canonical = serde_json::to_value(&collection)?;
    Ok(serde_json::to_string(&canonical)?)
}

/// Parse export text back into features.
///
/// Preview-flagged features are dropped; every survivor gets its style
/// normalized and written back into its properties before `apply_style`
/// runs. Malformed input fails with [`TruegisError::Parse`] without any
/// side effects; the caller decides how to surface that.
pub fn import_state(text: &str, apply_style: ApplyStyle<'_>) -> Result<Vec<Feature>> {
    let collection: FeatureCollection =
        serde_json::from_str(text).map_err(TruegisError::parse)?;

    let mut imported = Vec::with_capacity(collection.features.len());
    for mut feature in collection.features {
        if feature.is_preview() {
            continue;
        }
        let style = normalize(&feature.properties);
        feature.set_style(&style);
        apply_style(&mut feature, &style);
        imported.push(feature);
    }

    debug!("imported {} features", imported.len());
    Ok(imported)
}

/// The canonical form of one feature: normalized style overwriting the loose
/// values, preview flag stripped, coordinates rounded.
fn canonical_feature(feature: &Feature) -> Feature {
    let mut clean = feature.clone();
    clean.geometry = feature.geometry.rounded();
    clean.properties.remove(PREVIEW_FLAG);
    let style = normalize(&clean.properties);
    clean.set_style(&style);
    clean
}

/// Stable sort key for export ordering.
///
/// An explicit feature id is used verbatim. Otherwise the key is derived
/// from geometry type, rounded extent, and the normalized style in fixed key
/// order; `index` (the feature's position before sorting) is appended only
/// to break ties deterministically.
fn sort_key(feature: &Feature, index: usize) -> String {
    if let Some(id) = &feature.id {
        return id.clone();
    }

    let extent_key = match feature.geometry.extent() {
        Some(extent) => extent
            .iter()
            .map(|v| (v.round() as i64).to_string())
            .collect::<Vec<_>>()
            .join(","),
        None => String::new(),
    };

    // The key reflects normalized values even when callers pass
    // un-normalized features, so equal styles always key equally.
    let style = normalize(&feature.properties);
    let style_values = [
        style.fill_color.clone(),
        style.fill_opacity.to_string(),
        style.stroke_color.clone(),
        style.stroke_opacity.to_string(),
        style.stroke_width.to_string(),
    ];
    let style_key = STYLE_KEYS
        .iter()
        .zip(style_values)
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join("|");

    format!(
        "{}|{}|{}|{}",
        feature.geometry.type_name(),
        extent_key,
        style_key,
        index
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{circle_to_polygon, Geometry, CIRCLE_SIDES};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn apply_noop() -> impl FnMut(&mut Feature, &StyleRecord) {
        |_, _| {}
    }

    fn styled_point(x: f64, y: f64, fill: &str) -> Feature {
        let mut feature = Feature::new(Geometry::Point(vec![x, y]));
        feature
            .properties
            .insert("fillColor".into(), json!(fill));
        feature
    }

    #[test]
    fn empty_export_is_stable() {
        let text = export_state(&[]).unwrap();
        assert_eq!(text, r#"{"features":[],"type":"FeatureCollection"}"#);
    }

    #[test]
    fn export_is_order_independent() {
        let a = styled_point(1.0, 2.0, "#111111");
        let b = styled_point(3.0, 4.0, "#222222");

        let forward = export_state(&[a.clone(), b.clone()]).unwrap();
        let backward = export_state(&[b, a]).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn reverse_order_circles_export_identically() {
        let mut red = Feature::new(circle_to_polygon([0.5, 0.5], 0.1, CIRCLE_SIDES));
        red.properties.insert("fillColor".into(), json!("#ff0000"));
        let mut blue = Feature::new(circle_to_polygon([-10.0, 3.0], 0.2, CIRCLE_SIDES));
        blue.properties.insert("fillColor".into(), json!("#0000ff"));

        let drawn = export_state(&[red.clone(), blue.clone()]).unwrap();
        let reversed = export_state(&[blue, red]).unwrap();
        assert_eq!(drawn, reversed);
    }

    #[test]
    fn preview_feature_is_never_emitted() {
        let mut preview = styled_point(0.0, 0.0, "#ff0000");
        preview
            .properties
            .insert(crate::feature::PREVIEW_FLAG.into(), json!(true));

        let text = export_state(&[preview, styled_point(1.0, 1.0, "#ff0000")]).unwrap();
        assert!(!text.contains("__truegis_preview"));
        assert_eq!(text.matches("\"Point\"").count(), 1);
    }

    #[test]
    fn export_normalizes_styles_and_rounds_coordinates() {
        let mut feature = Feature::new(Geometry::Point(vec![1.23456789, -0.000000049]));
        feature.properties.insert("fillOpacity".into(), json!("0.5"));
        feature.properties.insert("strokeWidth".into(), json!(0));

        let text = export_state(&[feature]).unwrap();
        assert!(text.contains("1.2345679"));
        assert!(text.contains(r#""fillOpacity":0.5"#));
        assert!(text.contains(r#""strokeWidth":1"#));
        assert!(text.contains(r##""strokeColor":"#000000""##));
    }

    #[test]
    fn export_has_no_whitespace_and_sorted_keys() {
        let mut feature = styled_point(1.0, 2.0, "#abcdef");
        feature.properties.insert("zebra".into(), json!("last"));
        feature.properties.insert("alpha".into(), json!("first"));

        let text = export_state(&[feature]).unwrap();
        assert!(!text.contains(' '));
        assert!(!text.contains('\n'));

        // Document keys sorted: "features" before "type"; extra properties
        // interleave with style keys lexicographically.
        assert!(text.starts_with(r#"{"features":"#));
        let alpha = text.find(r#""alpha""#).unwrap();
        let fill = text.find(r#""fillColor""#).unwrap();
        let zebra = text.find(r#""zebra""#).unwrap();
        assert!(alpha < fill && fill < zebra);
    }

    #[test]
    fn explicit_ids_drive_ordering() {
        let a = Feature::with_id("b-second", Geometry::Point(vec![0.0, 0.0]));
        let b = Feature::with_id("a-first", Geometry::Point(vec![1.0, 1.0]));

        let text = export_state(&[a, b]).unwrap();
        let first = text.find("a-first").unwrap();
        let second = text.find("b-second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn identical_features_keep_both_via_index_tiebreak() {
        let twin = styled_point(5.0, 5.0, "#333333");
        let text = export_state(&[twin.clone(), twin]).unwrap();
        assert_eq!(text.matches("\"Point\"").count(), 2);
    }

    #[test]
    fn round_trip_re_export_is_identical() {
        let mut line = Feature::new(Geometry::LineString(vec![
            vec![0.123456789, 51.5],
            vec![-1.9, 52.48],
        ]));
        line.properties.insert("name".into(), json!("route"));
        line.properties.insert("strokeWidth".into(), json!("4"));

        let first = export_state(&[line]).unwrap();
        let imported = import_state(&first, &mut apply_noop()).unwrap();
        let second = export_state(&imported).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn import_normalizes_and_invokes_callback() {
        let text = r#"{"features":[{"geometry":{"coordinates":[0,0],"type":"Point"},"properties":{"fillOpacity":"junk"},"type":"Feature"}],"type":"FeatureCollection"}"#;

        let mut seen = Vec::new();
        let mut capture = |_: &mut Feature, style: &StyleRecord| seen.push(style.clone());
        let imported = import_state(text, &mut capture).unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].fill_opacity, 0.4);
        assert_eq!(
            imported[0].properties.get("fillOpacity"),
            Some(&json!(0.4))
        );
    }

    #[test]
    fn import_skips_preview_features() {
        let text = r#"{"features":[{"geometry":{"coordinates":[0,0],"type":"Point"},"properties":{"__truegis_preview":true},"type":"Feature"}],"type":"FeatureCollection"}"#;
        let imported = import_state(text, &mut apply_noop()).unwrap();
        assert!(imported.is_empty());
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let result = import_state("not geojson at all", &mut apply_noop());
        assert!(matches!(result, Err(TruegisError::Parse { .. })));

        let wrong_shape = import_state(r#"{"type":"Feature"}"#, &mut apply_noop());
        assert!(wrong_shape.is_err());
    }

    #[test]
    fn opaque_properties_survive_round_trip() {
        let mut feature = styled_point(2.0, 3.0, "#445566");
        feature.properties.insert(
            "metadata".into(),
            json!({"survey": {"crew": ["a", "b"], "pass": 2}}),
        );

        let text = export_state(&[feature]).unwrap();
        let imported = import_state(&text, &mut apply_noop()).unwrap();
        assert_eq!(
            imported[0].properties.get("metadata"),
            Some(&json!({"survey": {"crew": ["a", "b"], "pass": 2}}))
        );
    }
}
