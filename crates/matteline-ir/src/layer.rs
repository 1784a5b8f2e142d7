use serde::{Deserialize, Serialize};

use matteline_core::{FrameBuffer, LayerTransform, MatteBuffer};

use crate::animation::{AnimatableProperty, Curve, CurveSet};

/// Unique identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a background image is sized to the canvas before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Largest uniform scale that fits entirely inside the canvas.
    #[default]
    Fit,
    /// Smallest uniform scale that covers the canvas.
    Fill,
    /// Resize to the canvas dimensions, ignoring aspect ratio.
    Stretch,
    /// Keep the native size. Used for unrecognized modes.
    Native,
}

impl FitMode {
    /// Parse a `bg_mode` string.
    pub fn parse(mode: &str) -> Self {
        match mode {
            "fit" => FitMode::Fit,
            "fill" => FitMode::Fill,
            "stretch" => FitMode::Stretch,
            _ => FitMode::Native,
        }
    }
}

/// Role-specific layer data.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// Painted under everything. Never contributes to the matte and always
    /// draws at full opacity.
    Background { fit: FitMode },
    /// Contributes to the matte.
    Foreground {
        /// Per-pixel alpha multiplier, at any resolution.
        custom_mask: Option<MatteBuffer>,
        /// Editor path data, carried but not rendered.
        bezier_path: Option<serde_json::Value>,
    },
}

/// A decoded layer ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Decoded RGBA image at native resolution.
    pub image: FrameBuffer,
    pub kind: LayerKind,
    /// Static transform used where no curve exists.
    pub transform: LayerTransform,
    pub curves: CurveSet,
}

impl Layer {
    pub fn background(id: impl Into<String>, image: FrameBuffer, fit: FitMode) -> Self {
        Self::new(id, image, LayerKind::Background { fit })
    }

    pub fn foreground(id: impl Into<String>, image: FrameBuffer) -> Self {
        Self::new(
            id,
            image,
            LayerKind::Foreground {
                custom_mask: None,
                bezier_path: None,
            },
        )
    }

    fn new(id: impl Into<String>, image: FrameBuffer, kind: LayerKind) -> Self {
        let id = LayerId::new(id);
        Self {
            name: id.0.clone(),
            id,
            image,
            kind,
            transform: LayerTransform::identity(),
            curves: CurveSet::default(),
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self.kind, LayerKind::Background { .. })
    }

    pub fn custom_mask(&self) -> Option<&MatteBuffer> {
        match &self.kind {
            LayerKind::Foreground { custom_mask, .. } => custom_mask.as_ref(),
            LayerKind::Background { .. } => None,
        }
    }

    // Builder-style methods

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.transform.rotation = degrees;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.transform.opacity = opacity;
        self
    }

    pub fn with_curve(mut self, property: AnimatableProperty, curve: Curve) -> Self {
        self.curves.set(property, curve);
        self
    }

    pub fn with_curves(mut self, curves: CurveSet) -> Self {
        self.curves = curves;
        self
    }

    /// Attach a custom mask. Ignored on background layers.
    pub fn with_custom_mask(mut self, mask: MatteBuffer) -> Self {
        if let LayerKind::Foreground { custom_mask, .. } = &mut self.kind {
            *custom_mask = Some(mask);
        }
        self
    }

    /// Attach editor path data. Ignored on background layers.
    pub fn with_bezier_path(mut self, path: serde_json::Value) -> Self {
        if let LayerKind::Foreground { bezier_path, .. } = &mut self.kind {
            *bezier_path = Some(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use matteline_core::Color;

    #[test]
    fn test_fit_mode_parse() {
        assert_eq!(FitMode::parse("fit"), FitMode::Fit);
        assert_eq!(FitMode::parse("fill"), FitMode::Fill);
        assert_eq!(FitMode::parse("stretch"), FitMode::Stretch);
        assert_eq!(FitMode::parse("cover"), FitMode::Native);
        assert_eq!(FitMode::default(), FitMode::Fit);
    }

    #[test]
    fn test_foreground_builder() {
        let layer = Layer::foreground("layer_0", FrameBuffer::solid(4, 4, &Color::RED))
            .with_name("Layer 1")
            .with_position(10.0, -5.0)
            .with_scale(0.5)
            .with_rotation(45.0)
            .with_opacity(0.25)
            .with_curve(
                AnimatableProperty::X,
                Curve::new(vec![Keyframe::new(0.0, 1.0)]),
            )
            .with_custom_mask(MatteBuffer::new(2, 2));

        assert_eq!(layer.id.as_str(), "layer_0");
        assert_eq!(layer.name, "Layer 1");
        assert!(!layer.is_background());
        assert_eq!(layer.transform.x, 10.0);
        assert_eq!(layer.transform.y, -5.0);
        assert_eq!(layer.transform.scale, 0.5);
        assert_eq!(layer.transform.rotation, 45.0);
        assert_eq!(layer.transform.opacity, 0.25);
        assert!(layer.curves.x.is_some());
        assert_eq!(layer.custom_mask().map(|m| m.width), Some(2));
    }

    #[test]
    fn test_background_ignores_mask() {
        let layer = Layer::background("background", FrameBuffer::solid(2, 2, &Color::BLUE), FitMode::Fill)
            .with_custom_mask(MatteBuffer::new(2, 2))
            .with_bezier_path(serde_json::json!([]));
        assert!(layer.is_background());
        assert!(layer.custom_mask().is_none());
        assert_eq!(layer.kind, LayerKind::Background { fit: FitMode::Fill });
        assert_eq!(layer.name, "background");
    }
}
