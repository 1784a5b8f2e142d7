//! The JSON interchange document exchanged with the editor front-end.
//!
//! Layer records are kept as raw JSON objects so fields this engine does not
//! interpret (editor state, extraction metadata) survive a build round trip
//! unchanged. Typed access goes through [`LayerRecord`]'s accessors, and
//! [`LayerRecord::to_layer`] produces the engine's [`Layer`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use matteline_core::{FrameBuffer, MattelineError, MattelineResult, MatteBuffer};

use crate::animation::CurveSet;
use crate::layer::{FitMode, Layer};
use crate::project::ProjectSettings;

/// `type` value marking the background layer.
pub const BACKGROUND_TYPE: &str = "background";
/// `type` value written for foreground layers.
pub const FOREGROUND_TYPE: &str = "foreground";

/// The full animation description: `{ "project": {...}, "layers": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationDocument {
    #[serde(default)]
    pub project: ProjectSettings,
    #[serde(default)]
    pub layers: Vec<LayerRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnimationDocument {
    pub fn new(project: ProjectSettings) -> Self {
        Self {
            project,
            layers: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Parse a document from JSON text.
    pub fn parse(json: &str) -> MattelineResult<Self> {
        serde_json::from_str(json).map_err(|e| MattelineError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> MattelineResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One entry of the document's `layers` array.
///
/// Wraps the raw JSON value. A record that is not a JSON object reads as
/// empty and fails [`LayerRecord::to_layer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerRecord(Value);

impl Default for LayerRecord {
    fn default() -> Self {
        Self(Value::Object(Map::new()))
    }
}

impl From<Value> for LayerRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl LayerRecord {
    pub fn new(id: &str, name: &str, layer_type: &str) -> Self {
        let mut record = Self::default();
        record.set("id", Value::from(id));
        record.set("name", Value::from(name));
        record.set("type", Value::from(layer_type));
        record
    }

    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|obj| obj.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a field, turning a non-object record into an object first.
    pub fn set(&mut self, key: &str, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        if let Value::Object(obj) = &mut self.0 {
            obj.insert(key.to_string(), value);
        }
    }

    /// Copy `key` from `other` when `other` has it.
    pub fn copy_field(&mut self, other: &LayerRecord, key: &str) {
        if let Some(value) = other.get(key) {
            self.set(key, value.clone());
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.str_field("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn layer_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// Only the exact type string `"background"` marks a background.
    pub fn is_background(&self) -> bool {
        self.layer_type() == Some(BACKGROUND_TYPE)
    }

    /// The image data URL, if present and non-empty.
    pub fn image_data(&self) -> Option<&str> {
        self.str_field("image_data").filter(|s| !s.is_empty())
    }

    /// The custom mask data URL, if present and non-empty.
    pub fn custom_mask(&self) -> Option<&str> {
        self.str_field("customMask").filter(|s| !s.is_empty())
    }

    pub fn bezier_path(&self) -> Option<&Value> {
        self.get("bezierPath").filter(|v| !v.is_null())
    }

    pub fn bg_mode(&self) -> FitMode {
        self.str_field("bg_mode")
            .map(FitMode::parse)
            .unwrap_or_default()
    }

    /// A numeric field, or `default` when absent or not a number.
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn keyframes(&self) -> Option<&Map<String, Value>> {
        self.get("keyframes").and_then(Value::as_object)
    }

    /// Describe this record for log messages.
    pub fn label(&self) -> String {
        match (self.id(), self.name()) {
            (Some(id), Some(name)) => format!("{} ({})", name, id),
            (Some(id), None) => id.to_string(),
            (None, Some(name)) => name.to_string(),
            (None, None) => "<unnamed layer>".to_string(),
        }
    }

    /// Build the engine layer from this record and its decoded payloads.
    pub fn to_layer(
        &self,
        image: FrameBuffer,
        custom_mask: Option<MatteBuffer>,
    ) -> MattelineResult<Layer> {
        if !self.is_object() {
            return Err(MattelineError::Validation(format!(
                "layer record must be an object, got {}",
                self.0
            )));
        }

        let id = self.id().unwrap_or_default();
        let curves = self.keyframes().map(CurveSet::from_json).unwrap_or_default();

        let mut layer = if self.is_background() {
            Layer::background(id, image, self.bg_mode())
        } else {
            let mut layer =
                Layer::foreground(id, image).with_opacity(self.number_or("opacity", 1.0));
            if let Some(mask) = custom_mask {
                layer = layer.with_custom_mask(mask);
            }
            if let Some(path) = self.bezier_path() {
                layer = layer.with_bezier_path(path.clone());
            }
            layer
        };

        if let Some(name) = self.name() {
            layer = layer.with_name(name);
        }

        Ok(layer
            .with_position(self.number_or("x", 0.0), self.number_or("y", 0.0))
            .with_scale(self.number_or("scale", 1.0))
            .with_rotation(self.number_or("rotation", 0.0))
            .with_curves(curves))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use matteline_core::Color;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_document() {
        let doc = AnimationDocument::parse("{}").unwrap();
        assert_eq!(doc.project, ProjectSettings::default());
        assert!(doc.layers.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = AnimationDocument::parse("{not json").unwrap_err();
        assert!(matches!(err, MattelineError::Parse(_)));
        assert!(AnimationDocument::parse("[1, 2]").is_err());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let text = r#"{"project":{"width":100,"height":50,"fps":10,"total_frames":3,"mask_expansion":0,"mask_feather":0,"bg_color":"black"},"layers":[{"id":"extracted_1","type":"foreground","x":3,"scale":1.5,"editorState":{"locked":true},"customMask":null}],"version":2}"#;
        let doc = AnimationDocument::parse(text).unwrap();
        assert_eq!(doc.extra.get("version"), Some(&json!(2)));
        assert_eq!(doc.project.extra.get("bg_color"), Some(&json!("black")));
        assert_eq!(doc.to_json().unwrap(), text);
    }

    #[test]
    fn test_record_accessors() {
        let record = LayerRecord::from(json!({
            "id": "layer_0",
            "name": "Layer 1",
            "type": "foreground",
            "image_data": "",
            "x": 12,
            "y": "bad",
            "customMask": "data:image/png;base64,AAAA",
            "bezierPath": null,
        }));
        assert_eq!(record.id(), Some("layer_0"));
        assert!(!record.is_background());
        assert_eq!(record.image_data(), None);
        assert_eq!(record.number_or("x", 0.0), 12.0);
        assert_eq!(record.number_or("y", 7.0), 7.0);
        assert_eq!(record.custom_mask(), Some("data:image/png;base64,AAAA"));
        assert!(record.bezier_path().is_none());
        assert_eq!(record.label(), "Layer 1 (layer_0)");
    }

    #[test]
    fn test_only_exact_background_type_is_background() {
        assert!(LayerRecord::from(json!({"type": "background"})).is_background());
        assert!(!LayerRecord::from(json!({"type": "Background"})).is_background());
        assert!(!LayerRecord::from(json!({})).is_background());
    }

    #[test]
    fn test_to_layer_foreground() {
        let record = LayerRecord::from(json!({
            "id": "layer_2",
            "type": "mystery",
            "x": 5, "y": -4, "scale": 0.5, "rotation": 30, "opacity": 0.6,
            "keyframes": {"x": [{"time": 0, "value": 1}, {"time": 1, "value": 3}]},
            "bezierPath": [[0, 0], [1, 1]],
        }));
        let layer = record
            .to_layer(FrameBuffer::solid(2, 2, &Color::WHITE), Some(MatteBuffer::new(1, 1)))
            .unwrap();
        assert!(!layer.is_background());
        assert_eq!(layer.name, "layer_2");
        assert_eq!(layer.transform.x, 5.0);
        assert_eq!(layer.transform.y, -4.0);
        assert_eq!(layer.transform.scale, 0.5);
        assert_eq!(layer.transform.rotation, 30.0);
        assert_eq!(layer.transform.opacity, 0.6);
        assert!(layer.curves.x.is_some());
        assert!(layer.custom_mask().is_some());
        match &layer.kind {
            LayerKind::Foreground { bezier_path, .. } => assert!(bezier_path.is_some()),
            LayerKind::Background { .. } => panic!("expected foreground"),
        }
    }

    #[test]
    fn test_to_layer_background_defaults() {
        let record = LayerRecord::from(json!({
            "id": "background",
            "name": "Background",
            "type": "background",
            "opacity": 0.1,
        }));
        let layer = record
            .to_layer(FrameBuffer::solid(2, 2, &Color::WHITE), None)
            .unwrap();
        assert_eq!(layer.kind, LayerKind::Background { fit: FitMode::Fit });
        assert_eq!(layer.name, "Background");
        // Background opacity is not read from the record.
        assert_eq!(layer.transform.opacity, 1.0);
        assert_eq!(layer.transform.scale, 1.0);
    }

    #[test]
    fn test_to_layer_rejects_non_object() {
        let record = LayerRecord::from(json!("layer"));
        assert!(record
            .to_layer(FrameBuffer::solid(1, 1, &Color::WHITE), None)
            .is_err());
    }

    #[test]
    fn test_set_and_copy_field() {
        let cached = LayerRecord::from(json!({"x": 4, "keyframes": {}}));
        let mut fresh = LayerRecord::new("layer_0", "Layer 1", FOREGROUND_TYPE);
        fresh.copy_field(&cached, "x");
        fresh.copy_field(&cached, "y");
        assert_eq!(fresh.get("x"), Some(&json!(4)));
        assert!(!fresh.contains("y"));
        assert_eq!(
            serde_json::to_string(&fresh).unwrap(),
            r#"{"id":"layer_0","name":"Layer 1","type":"foreground","x":4}"#
        );
    }
}
