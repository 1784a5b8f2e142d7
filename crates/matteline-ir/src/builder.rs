//! Assembles the animation document from project parameters, freshly
//! supplied images and the editor's cached layer records.

use serde_json::{Map, Value};

use matteline_core::MattelineResult;

use crate::document::{AnimationDocument, LayerRecord, BACKGROUND_TYPE, FOREGROUND_TYPE};
use crate::project::ProjectSettings;

/// Id of the background layer.
pub const BACKGROUND_ID: &str = "background";
/// Id prefix of layers produced outside the build, which the build preserves.
pub const EXTRACTED_PREFIX: &str = "extracted_";

const BACKGROUND_FIELDS: &[&str] = &["x", "y", "scale", "rotation"];
const FOREGROUND_FIELDS: &[&str] = &["x", "y", "scale", "rotation", "opacity", "mask_size"];
/// Copied only when the cached value is non-empty.
const FOREGROUND_OPTIONAL_FIELDS: &[&str] = &["customMask", "bezierPath"];

/// Id of the foreground layer built from the image at `index`.
pub fn foreground_id(index: usize) -> String {
    format!("layer_{}", index)
}

/// Builds an [`AnimationDocument`].
///
/// Images are given as encoded data URLs. A fresh image always replaces the
/// cached record's `image_data`; every other cached field is carried over.
pub struct AnimationBuilder {
    project: ProjectSettings,
    cached: Vec<LayerRecord>,
    background: Option<String>,
    foregrounds: Vec<Option<String>>,
}

impl AnimationBuilder {
    pub fn new(project: ProjectSettings) -> Self {
        Self {
            project,
            cached: Vec::new(),
            background: None,
            foregrounds: Vec::new(),
        }
    }

    /// Load the editor's cached layer records from their JSON text.
    /// Unparsable text or a non-array value leaves the cache empty.
    pub fn cached_layers(&mut self, json: &str) -> &mut Self {
        self.cached = parse_cached_layers(json);
        self
    }

    pub fn background(&mut self, data_url: impl Into<String>) -> &mut Self {
        self.background = Some(data_url.into());
        self
    }

    /// Add the next foreground image. `None` stands for an image that could
    /// not be encoded: it produces no layer but still consumes its index.
    pub fn add_foreground(&mut self, data_url: Option<String>) -> &mut Self {
        self.foregrounds.push(data_url);
        self
    }

    pub fn build(self) -> AnimationDocument {
        let Self {
            project,
            cached,
            background,
            foregrounds,
        } = self;
        let mut document = AnimationDocument::new(project);

        match &background {
            Some(image) => {
                let cached = find_cached(&cached, BACKGROUND_ID);
                document.layers.push(background_record(image, cached));
            }
            None => {
                let reused = cached
                    .iter()
                    .find(|l| l.id() == Some(BACKGROUND_ID) && l.image_data().is_some());
                if let Some(reused) = reused {
                    let mut record = reused.clone();
                    if !record.contains("name") {
                        record.set("name", Value::from("Background"));
                    }
                    if !record.contains("type") {
                        record.set("type", Value::from(BACKGROUND_TYPE));
                    }
                    document.layers.push(record);
                }
            }
        }

        let mut produced = Vec::new();
        for (index, image) in foregrounds.iter().enumerate() {
            let Some(image) = image else {
                continue;
            };
            let id = foreground_id(index);
            let previous = find_cached(&cached, &id);
            document
                .layers
                .push(foreground_record(&id, index, image, previous));
            produced.push(id);
        }

        let mut extracted = 0usize;
        for record in &cached {
            let keep = record.layer_type() == Some(FOREGROUND_TYPE)
                && record.image_data().is_some()
                && !record.id().is_some_and(|id| produced.iter().any(|p| p == id));
            if keep {
                if record.id().is_some_and(|id| id.starts_with(EXTRACTED_PREFIX)) {
                    extracted += 1;
                }
                document.layers.push(record.clone());
            }
        }

        if extracted > 0 {
            tracing::info!("Preserved {} extracted layer(s)", extracted);
        }
        tracing::info!("Built animation with {} layer(s)", document.layers.len());

        document
    }
}

fn find_cached<'a>(cached: &'a [LayerRecord], id: &str) -> Option<&'a LayerRecord> {
    cached.iter().find(|l| l.id() == Some(id))
}

fn parse_cached_layers(json: &str) -> Vec<LayerRecord> {
    if json.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(entries)) => entries
            .into_iter()
            .filter(Value::is_object)
            .map(LayerRecord::from)
            .collect(),
        Ok(other) => {
            tracing::warn!("Cached layers are not a list (got {}), ignoring them", other);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to parse cached layers: {}", e);
            Vec::new()
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

fn base_record(
    id: &str,
    name: &str,
    layer_type: &str,
    image: &str,
    cached: Option<&LayerRecord>,
) -> LayerRecord {
    let mut record = LayerRecord::new(id, name, layer_type);
    record.set("image_data", Value::from(image));
    let keyframes = cached
        .and_then(|c| c.get("keyframes"))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    record.set("keyframes", keyframes);
    record
}

fn background_record(image: &str, cached: Option<&LayerRecord>) -> LayerRecord {
    let mut record = base_record(BACKGROUND_ID, "Background", BACKGROUND_TYPE, image, cached);
    let bg_mode = cached
        .and_then(|c| c.get("bg_mode"))
        .cloned()
        .unwrap_or_else(|| Value::from("fit"));
    record.set("bg_mode", bg_mode);
    if let Some(cached) = cached {
        for key in BACKGROUND_FIELDS {
            record.copy_field(cached, key);
        }
    }
    record
}

fn foreground_record(
    id: &str,
    index: usize,
    image: &str,
    cached: Option<&LayerRecord>,
) -> LayerRecord {
    let name = format!("Layer {}", index + 1);
    let mut record = base_record(id, &name, FOREGROUND_TYPE, image, cached);
    if let Some(cached) = cached {
        for key in FOREGROUND_FIELDS {
            record.copy_field(cached, key);
        }
        for key in FOREGROUND_OPTIONAL_FIELDS {
            if let Some(value) = cached.get(key).filter(|v| is_truthy(v)) {
                record.set(key, value.clone());
            }
        }
    }
    record
}

/// The serialized result of a build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    /// The animation document as JSON text.
    pub animation: String,
    /// A copy of `animation` when a preview was requested.
    pub preview: Option<String>,
}

impl BuildOutput {
    pub fn from_document(document: &AnimationDocument, preview: bool) -> MattelineResult<Self> {
        let animation = document.to_json()?;
        let preview = preview.then(|| animation.clone());
        Ok(Self { animation, preview })
    }
}
