use matteline_core::LayerTransform;
use matteline_ir::{AnimatableProperty, Layer};

/// Resolve a layer's effective transform at `time` (seconds).
///
/// Each property takes its curve value when a curve exists, otherwise the
/// layer's static value. Background layers always resolve to full opacity.
pub fn resolve(layer: &Layer, time: f64) -> LayerTransform {
    let base = &layer.transform;
    let curves = &layer.curves;

    let opacity = if layer.is_background() {
        1.0
    } else {
        curves.evaluate(AnimatableProperty::Opacity, time, base.opacity)
    };

    LayerTransform {
        x: curves.evaluate(AnimatableProperty::X, time, base.x),
        y: curves.evaluate(AnimatableProperty::Y, time, base.y),
        scale: curves.evaluate(AnimatableProperty::Scale, time, base.scale),
        rotation: curves.evaluate(AnimatableProperty::Rotation, time, base.rotation),
        opacity,
    }
}
