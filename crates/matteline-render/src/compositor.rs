//! Paints rasterized layers onto the frame canvas and accumulates the matte.

use matteline_core::{FrameBuffer, MatteBuffer, PixelFormat, Rect};

/// Composite one layer buffer onto `canvas` at `(paste_x, paste_y)`.
///
/// Color uses "over" blending with `a = source_alpha/255 × opacity`; the
/// canvas alpha keeps the per-pixel maximum of its value and `a`. Foreground
/// layers also raise `matte` to `source_alpha × opacity` by per-pixel maximum.
/// A layer entirely off-canvas is a no-op. Opacity is clamped to `[0, 1]`.
pub fn composite(
    canvas: &mut FrameBuffer,
    matte: &mut MatteBuffer,
    layer: &FrameBuffer,
    paste_x: i64,
    paste_y: i64,
    opacity: f64,
    is_foreground: bool,
) {
    debug_assert_eq!(canvas.format, PixelFormat::Rgba8);

    let canvas_rect = Rect::new(0, 0, canvas.width as i64, canvas.height as i64);
    let layer_rect = Rect::new(paste_x, paste_y, layer.width as i64, layer.height as i64);
    let Some(region) = canvas_rect.intersect(&layer_rect) else {
        return;
    };

    let opacity = opacity.clamp(0.0, 1.0) as f32;
    let src_bpp = layer.format.bytes_per_pixel();
    let canvas_w = canvas.width as usize;
    let layer_w = layer.width as usize;

    for y in region.y..region.y + region.height {
        let sy = (y - paste_y) as usize;
        for x in region.x..region.x + region.width {
            let sx = (x - paste_x) as usize;
            let src_idx = (sy * layer_w + sx) * src_bpp;
            let Some(src) = layer.data.get(src_idx..src_idx + src_bpp) else {
                continue;
            };

            let (a, coverage) = match layer.format {
                PixelFormat::Rgba8 => {
                    let alpha = src[3] as f32;
                    ((alpha / 255.0) * opacity, (alpha * opacity) as u8)
                }
                PixelFormat::Rgb8 => (opacity, (255.0 * opacity) as u8),
            };

            let pixel = y as usize * canvas_w + x as usize;

            if is_foreground {
                let m = &mut matte.data[pixel];
                *m = (*m).max(coverage);
            }

            let dst = &mut canvas.data[pixel * 4..pixel * 4 + 4];
            for c in 0..3 {
                dst[c] = (dst[c] as f32 * (1.0 - a) + src[c] as f32 * a) as u8;
            }
            dst[3] = dst[3].max((a * 255.0) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matteline_core::Color;

    fn canvas(w: u32, h: u32) -> (FrameBuffer, MatteBuffer) {
        (
            FrameBuffer::new(w, h, PixelFormat::Rgba8),
            MatteBuffer::new(w, h),
        )
    }

    fn white_with_alpha(w: u32, h: u32, alpha: u8) -> FrameBuffer {
        let data = [255, 255, 255, alpha].repeat((w * h) as usize);
        FrameBuffer::from_raw(w, h, PixelFormat::Rgba8, data).unwrap()
    }

    #[test]
    fn test_full_cover_opaque_foreground() {
        let (mut c, mut m) = canvas(8, 8);
        let layer = FrameBuffer::solid(8, 8, &Color::RED);
        composite(&mut c, &mut m, &layer, 0, 0, 1.0, true);
        assert!(m.data.iter().all(|&v| v == 255));
        assert!(c.data.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_background_does_not_touch_matte() {
        let (mut c, mut m) = canvas(4, 4);
        let layer = FrameBuffer::solid(4, 4, &Color::BLUE);
        composite(&mut c, &mut m, &layer, 0, 0, 1.0, false);
        assert!(m.data.iter().all(|&v| v == 0));
        assert_eq!(c.get_pixel(2, 2), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_overlapping_mattes_take_maximum() {
        let (mut c, mut m) = canvas(4, 1);
        let strong = white_with_alpha(3, 1, 150);
        let weak = white_with_alpha(3, 1, 100);
        // strong covers x 0..3, weak covers x 1..4 and is painted later.
        composite(&mut c, &mut m, &strong, 0, 0, 1.0, true);
        composite(&mut c, &mut m, &weak, 1, 0, 1.0, true);
        assert_eq!(m.data, vec![150, 150, 150, 100]);
    }

    #[test]
    fn test_opacity_scales_matte_and_color() {
        let (mut c, mut m) = canvas(2, 2);
        let layer = FrameBuffer::solid(2, 2, &Color::WHITE);
        composite(&mut c, &mut m, &layer, 0, 0, 0.5, true);
        assert_eq!(m.data, vec![127; 4]);
        assert_eq!(c.get_pixel(0, 0), Some([127, 127, 127, 127]));
    }

    #[test]
    fn test_canvas_alpha_keeps_maximum() {
        let (mut c, mut m) = canvas(1, 1);
        composite(&mut c, &mut m, &FrameBuffer::solid(1, 1, &Color::RED), 0, 0, 1.0, false);
        composite(&mut c, &mut m, &FrameBuffer::solid(1, 1, &Color::BLUE), 0, 0, 0.2, true);
        let px = c.get_pixel(0, 0).unwrap();
        assert_eq!(px[3], 255);
        assert!(px[0] > px[2]);
    }

    #[test]
    fn test_off_canvas_is_noop() {
        let (mut c, mut m) = canvas(4, 4);
        let layer = FrameBuffer::solid(2, 2, &Color::RED);
        composite(&mut c, &mut m, &layer, 4, 0, 1.0, true);
        composite(&mut c, &mut m, &layer, -2, -2, 1.0, true);
        composite(&mut c, &mut m, &layer, 0, 100, 1.0, true);
        assert!(c.data.iter().all(|&v| v == 0));
        assert!(m.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_partial_overlap_is_clipped() {
        let (mut c, mut m) = canvas(4, 4);
        let layer = FrameBuffer::solid(2, 2, &Color::GREEN);
        composite(&mut c, &mut m, &layer, -1, 3, 1.0, true);
        assert_eq!(c.get_pixel(0, 3), Some([0, 255, 0, 255]));
        assert_eq!(m.get(0, 3), Some(255));
        assert_eq!(m.data.iter().filter(|&&v| v > 0).count(), 1);
    }

    #[test]
    fn test_rgb_source_uses_opacity() {
        let (mut c, mut m) = canvas(1, 1);
        let layer = FrameBuffer::solid(1, 1, &Color::WHITE).to_rgb8();
        composite(&mut c, &mut m, &layer, 0, 0, 1.0, true);
        assert_eq!(m.get(0, 0), Some(255));
        assert_eq!(c.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_opacity_is_clamped() {
        let (mut c, mut m) = canvas(1, 1);
        let layer = FrameBuffer::solid(1, 1, &Color::WHITE);
        composite(&mut c, &mut m, &layer, 0, 0, 3.0, true);
        assert_eq!(m.get(0, 0), Some(255));
        assert_eq!(c.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }
}
