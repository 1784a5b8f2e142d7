//! Per-layer rasterization: custom mask, sizing, rotation and placement.
//! Produces a transformed copy of the layer image; the canvas is untouched.

use matteline_core::{
    FrameBuffer, LayerTransform, MattelineError, MattelineResult, MatteBuffer, PixelFormat,
};
use matteline_ir::{FitMode, Layer, LayerKind};

use crate::image_loader::{resize_frame, resize_matte};

/// Rotations at or below this magnitude (degrees) are not applied.
pub const ROTATION_THRESHOLD: f64 = 0.1;

/// Largest width or height a layer may be resized to.
pub const MAX_LAYER_DIMENSION: u32 = 32_768;

/// A layer image ready to be pasted, with its top-left canvas offset.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedLayer {
    pub buffer: FrameBuffer,
    pub paste_x: i64,
    pub paste_y: i64,
}

/// Rasterize `layer` with its resolved transform for a canvas of the given size.
///
/// A custom mask that cannot be applied is logged and skipped.
pub fn rasterize(
    layer: &Layer,
    transform: &LayerTransform,
    canvas_width: u32,
    canvas_height: u32,
) -> MattelineResult<RasterizedLayer> {
    let mut buffer = layer.image.clone();

    if let Some(mask) = layer.custom_mask() {
        if let Err(e) = apply_custom_mask(&mut buffer, mask) {
            tracing::warn!("Skipping custom mask for layer '{}': {}", layer.id, e);
        }
    }

    let (width, height) = target_size(
        &layer.kind,
        transform.scale,
        (buffer.width, buffer.height),
        (canvas_width, canvas_height),
    );
    if width > MAX_LAYER_DIMENSION || height > MAX_LAYER_DIMENSION {
        return Err(MattelineError::Render(format!(
            "layer '{}' would be resized to {}x{}, limit is {}",
            layer.id, width, height, MAX_LAYER_DIMENSION
        )));
    }
    if width != buffer.width || height != buffer.height {
        buffer = resize_frame(&buffer, width, height)?;
    }

    if transform.rotation.abs() > ROTATION_THRESHOLD {
        buffer = rotate(&buffer, transform.rotation);
    }

    let (paste_x, paste_y) = placement(
        transform,
        (buffer.width, buffer.height),
        (canvas_width, canvas_height),
    );

    Ok(RasterizedLayer {
        buffer,
        paste_x,
        paste_y,
    })
}

/// Multiply `mask` into the alpha channel of `buffer`, resampling the mask to
/// the buffer's size first.
pub fn apply_custom_mask(buffer: &mut FrameBuffer, mask: &MatteBuffer) -> MattelineResult<()> {
    if buffer.format != PixelFormat::Rgba8 {
        return Err(MattelineError::mask("layer image has no alpha channel"));
    }

    let resized;
    let mask = if mask.width != buffer.width || mask.height != buffer.height {
        resized = resize_matte(mask, buffer.width, buffer.height)?;
        &resized
    } else {
        mask
    };

    if mask.data.len() != buffer.pixel_count() {
        return Err(MattelineError::mask(format!(
            "mask has {} values for {} pixels",
            mask.data.len(),
            buffer.pixel_count()
        )));
    }

    for (px, &m) in buffer.data.chunks_exact_mut(4).zip(mask.data.iter()) {
        px[3] = (px[3] as f32 * (m as f32 / 255.0)) as u8;
    }
    Ok(())
}

/// The size a layer image is resized to before rotation. Never below 1×1.
pub fn target_size(
    kind: &LayerKind,
    scale: f64,
    (width, height): (u32, u32),
    (canvas_width, canvas_height): (u32, u32),
) -> (u32, u32) {
    let (w, h) = (width as f64, height as f64);
    let (cw, ch) = (canvas_width as f64, canvas_height as f64);

    match kind {
        LayerKind::Background { fit } => {
            let base = match fit {
                FitMode::Stretch => {
                    return (dimension(cw * scale), dimension(ch * scale));
                }
                FitMode::Fit => (cw / w).min(ch / h),
                FitMode::Fill => (cw / w).max(ch / h),
                FitMode::Native => 1.0,
            };
            let factor = base * scale;
            (dimension(w * factor), dimension(h * factor))
        }
        LayerKind::Foreground { .. } => {
            if scale != 1.0 && scale > 0.0 {
                (dimension(w * scale), dimension(h * scale))
            } else {
                (width, height)
            }
        }
    }
}

fn dimension(value: f64) -> u32 {
    (value as i64).clamp(1, u32::MAX as i64) as u32
}

/// Rotate about the pixel `(width / 2, height / 2)` by `degrees`,
/// counter-clockwise on screen. Output keeps the input size; uncovered
/// pixels are transparent black.
pub fn rotate(fb: &FrameBuffer, degrees: f64) -> FrameBuffer {
    let (width, height) = (fb.width, fb.height);
    let cx = (width / 2) as f64;
    let cy = (height / 2) as f64;
    let (sin, cos) = degrees.to_radians().sin_cos();

    let mut out = FrameBuffer::new(width, height, PixelFormat::Rgba8);
    for dy in 0..height {
        for dx in 0..width {
            let rx = dx as f64 - cx;
            let ry = dy as f64 - cy;
            let sx = cos * rx - sin * ry + cx;
            let sy = sin * rx + cos * ry + cy;
            out.set_pixel(dx, dy, sample_bilinear(fb, sx, sy));
        }
    }
    out
}

/// Bilinear sample with pixel centers on integer coordinates. Neighbors
/// outside the image count as transparent black.
fn sample_bilinear(fb: &FrameBuffer, x: f64, y: f64) -> [u8; 4] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ];

    let mut acc = [0.0f64; 4];
    for (ox, oy, weight) in taps {
        if weight <= 0.0 {
            continue;
        }
        let (px, py) = (x0 + ox, y0 + oy);
        if px < 0 || py < 0 || px >= fb.width as i64 || py >= fb.height as i64 {
            continue;
        }
        if let Some(rgba) = fb.get_pixel(px as u32, py as u32) {
            for c in 0..4 {
                acc[c] += weight * rgba[c] as f64;
            }
        }
    }

    acc.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Top-left canvas offset that centers the layer at `(x, y)` relative to the
/// canvas center. Offsets are clamped to `±(canvas + layer size)`, which
/// keeps far off-canvas layers off-canvas.
pub fn placement(
    transform: &LayerTransform,
    (width, height): (u32, u32),
    (canvas_width, canvas_height): (u32, u32),
) -> (i64, i64) {
    let paste_x = (canvas_width / 2) as f64 + transform.x - (width / 2) as f64;
    let paste_y = (canvas_height / 2) as f64 + transform.y - (height / 2) as f64;
    let limit_x = canvas_width as f64 + width as f64;
    let limit_y = canvas_height as f64 + height as f64;
    (
        paste_x.floor().clamp(-limit_x, limit_x) as i64,
        paste_y.floor().clamp(-limit_y, limit_y) as i64,
    )
}
