//! Style Normalization
//!
//! Turns loosely-typed style properties (sliders, imported files, hand-edited
//! JSON) into a canonical [`StyleRecord`]. Normalization is pure and
//! idempotent; it is the single point that decides what a feature's style
//! means, both at export time and on import.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default fill color applied when none is set.
pub const DEFAULT_FILL_COLOR: &str = "#ff0000";
/// Default stroke color applied when none is set.
pub const DEFAULT_STROKE_COLOR: &str = "#000000";
/// Default fill opacity.
pub const DEFAULT_FILL_OPACITY: f64 = 0.4;
/// Default stroke opacity.
pub const DEFAULT_STROKE_OPACITY: f64 = 1.0;
/// Default stroke width in pixels.
pub const DEFAULT_STROKE_WIDTH: u32 = 2;

/// The reserved style property keys, in canonical order.
pub const STYLE_KEYS: [&str; 5] = [
    "fillColor",
    "fillOpacity",
    "strokeColor",
    "strokeOpacity",
    "strokeWidth",
];

/// A fully normalized feature style.
///
/// Every persisted or exported feature carries one of these; no feature is
/// ever written out with missing or out-of-range style values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRecord {
    /// Fill color as a hex string. Not validated beyond "non-empty".
    pub fill_color: String,

    /// Fill opacity in [0, 1].
    pub fill_opacity: f64,

    /// Stroke color as a hex string.
    pub stroke_color: String,

    /// Stroke opacity in [0, 1].
    pub stroke_opacity: f64,

    /// Stroke width in pixels, at least 1. No upper bound.
    pub stroke_width: u32,
}

impl Default for StyleRecord {
    fn default() -> Self {
        Self {
            fill_color: DEFAULT_FILL_COLOR.to_string(),
            fill_opacity: DEFAULT_FILL_OPACITY,
            stroke_color: DEFAULT_STROKE_COLOR.to_string(),
            stroke_opacity: DEFAULT_STROKE_OPACITY,
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl StyleRecord {
    /// Merge the five reserved style keys into a property map, overwriting
    /// whatever loose values were there. Non-style properties are untouched.
    pub fn apply_to(&self, properties: &mut Map<String, Value>) {
        properties.insert("fillColor".into(), Value::String(self.fill_color.clone()));
        properties.insert("fillOpacity".into(), json_f64(self.fill_opacity));
        properties.insert(
            "strokeColor".into(),
            Value::String(self.stroke_color.clone()),
        );
        properties.insert("strokeOpacity".into(), json_f64(self.stroke_opacity));
        properties.insert("strokeWidth".into(), Value::from(self.stroke_width));
    }

    /// Render the record as a property map holding only the style keys.
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut out = Map::new();
        self.apply_to(&mut out);
        out
    }
}

/// Normalize loosely-typed style properties into a canonical [`StyleRecord`].
///
/// Colors pass through when present as a non-empty string and default
/// otherwise. Opacities accept numbers or numeric strings, default on
/// anything non-finite, and clamp to [0, 1]. Stroke width accepts numbers or
/// numeric strings, truncates toward zero, defaults on anything non-finite,
/// and is floored at 1.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(properties: &Map<String, Value>) -> StyleRecord {
    StyleRecord {
        fill_color: color_or(properties, "fillColor", DEFAULT_FILL_COLOR),
        fill_opacity: opacity_or(properties, "fillOpacity", DEFAULT_FILL_OPACITY),
        stroke_color: color_or(properties, "strokeColor", DEFAULT_STROKE_COLOR),
        stroke_opacity: opacity_or(properties, "strokeOpacity", DEFAULT_STROKE_OPACITY),
        stroke_width: width_or(properties, "strokeWidth", DEFAULT_STROKE_WIDTH),
    }
}

fn color_or(properties: &Map<String, Value>, key: &str, default: &str) -> String {
    match properties.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => default.to_string(),
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn opacity_or(properties: &Map<String, Value>, key: &str, default: f64) -> f64 {
    let raw = properties.get(key).and_then(coerce_f64);
    let value = match raw {
        Some(v) if v.is_finite() => v,
        _ => default,
    };
    value.clamp(0.0, 1.0)
}

fn width_or(properties: &Map<String, Value>, key: &str, default: u32) -> u32 {
    let raw = properties.get(key).and_then(coerce_f64);
    let value = match raw {
        Some(v) if v.is_finite() => v.trunc(),
        _ => f64::from(default),
    };
    // Floor at 1; no upper bound beyond u32 range.
    value.max(1.0).min(f64::from(u32::MAX)) as u32
}

fn json_f64(value: f64) -> Value {
    // Opacities are clamped to [0, 1] before this runs, so the value is
    // always finite and representable.
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;
    use test_case::test_case;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn empty_input_yields_defaults() {
        let record = normalize(&Map::new());
        assert_eq!(record, StyleRecord::default());
    }

    #[test]
    fn numbers_pass_through_clamped() {
        let record = normalize(&props(json!({
            "fillColor": "#00ff00",
            "fillOpacity": 0.75,
            "strokeColor": "#123456",
            "strokeOpacity": 2.5,
            "strokeWidth": 9
        })));

        assert_eq!(record.fill_color, "#00ff00");
        assert_relative_eq!(record.fill_opacity, 0.75);
        assert_eq!(record.stroke_color, "#123456");
        assert_relative_eq!(record.stroke_opacity, 1.0);
        assert_eq!(record.stroke_width, 9);
    }

    #[test]
    fn numeric_strings_are_parsed() {
        let record = normalize(&props(json!({
            "fillOpacity": "0.25",
            "strokeOpacity": " 0.5 ",
            "strokeWidth": "7"
        })));

        assert_relative_eq!(record.fill_opacity, 0.25);
        assert_relative_eq!(record.stroke_opacity, 0.5);
        assert_eq!(record.stroke_width, 7);
    }

    #[test_case(json!({"fillOpacity": "garbage"}) ; "non-numeric string")]
    #[test_case(json!({"fillOpacity": null}) ; "null")]
    #[test_case(json!({"fillOpacity": true}) ; "boolean")]
    #[test_case(json!({"fillOpacity": []}) ; "array")]
    fn garbage_opacity_defaults(input: Value) {
        let record = normalize(&props(input));
        assert_relative_eq!(record.fill_opacity, DEFAULT_FILL_OPACITY);
    }

    #[test]
    fn opacity_clamps_below_zero() {
        let record = normalize(&props(json!({"strokeOpacity": -3.0})));
        assert_relative_eq!(record.stroke_opacity, 0.0);
    }

    #[test]
    fn width_truncates_and_floors() {
        assert_eq!(
            normalize(&props(json!({"strokeWidth": 2.9}))).stroke_width,
            2
        );
        assert_eq!(
            normalize(&props(json!({"strokeWidth": 0.4}))).stroke_width,
            1
        );
        assert_eq!(
            normalize(&props(json!({"strokeWidth": -5}))).stroke_width,
            1
        );
        assert_eq!(
            normalize(&props(json!({"strokeWidth": "abc"}))).stroke_width,
            DEFAULT_STROKE_WIDTH
        );
    }

    #[test]
    fn empty_color_string_defaults() {
        let record = normalize(&props(json!({"fillColor": "", "strokeColor": ""})));
        assert_eq!(record.fill_color, DEFAULT_FILL_COLOR);
        assert_eq!(record.stroke_color, DEFAULT_STROKE_COLOR);
    }

    #[test]
    fn non_string_color_defaults() {
        let record = normalize(&props(json!({"fillColor": 42})));
        assert_eq!(record.fill_color, DEFAULT_FILL_COLOR);
    }

    #[test_case(json!({}) ; "empty")]
    #[test_case(json!({"fillColor": "#abcdef", "fillOpacity": "0.9", "strokeWidth": 3.7}) ; "mixed types")]
    #[test_case(json!({"fillOpacity": f64::MAX, "strokeOpacity": "NaN", "strokeWidth": "1e9"}) ; "extremes")]
    fn normalize_is_idempotent(input: Value) {
        let once = normalize(&props(input));
        let twice = normalize(&once.to_properties());
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_to_preserves_extra_properties() {
        let mut properties = props(json!({"name": "field edge", "fillOpacity": "bad"}));
        let record = normalize(&properties);
        record.apply_to(&mut properties);

        assert_eq!(properties.get("name"), Some(&json!("field edge")));
        assert_eq!(properties.get("fillOpacity"), Some(&json!(0.4)));
        assert_eq!(properties.get("strokeWidth"), Some(&json!(2)));
    }

    #[test]
    fn serde_uses_camel_case_keys() {
        let text = serde_json::to_string(&StyleRecord::default()).unwrap();
        assert!(text.contains("\"fillColor\""));
        assert!(text.contains("\"strokeWidth\""));
    }
}
