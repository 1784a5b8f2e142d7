//! Image payload codec.
//! Decodes `data:` URLs and image files into frame buffers and mattes, and
//! encodes buffers back to PNG.

use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use image::{GrayImage, ImageFormat, RgbImage, RgbaImage};

use matteline_core::{FrameBuffer, MattelineError, MattelineResult, MatteBuffer, PixelFormat};

/// Extract and decode the base64 payload of a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url_bytes(url: &str, origin: &str) -> MattelineResult<Vec<u8>> {
    let (_, payload) = url
        .split_once(',')
        .ok_or_else(|| MattelineError::decode("data URL has no payload separator", origin))?;
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| MattelineError::decode(format!("invalid base64 payload: {}", e), origin))
}

/// Decode an image data URL into an RGBA frame buffer.
pub fn decode_data_url(url: &str, origin: &str) -> MattelineResult<FrameBuffer> {
    let bytes = decode_data_url_bytes(url, origin)?;
    load_image_from_bytes(&bytes, origin)
}

/// Decode a mask data URL into an 8-bit single-channel matte.
/// Color images are converted to luma.
pub fn decode_mask_data_url(url: &str, origin: &str) -> MattelineResult<MatteBuffer> {
    let bytes = decode_data_url_bytes(url, origin)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| MattelineError::decode(format!("failed to decode mask: {}", e), origin))?;
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    MatteBuffer::from_raw(width, height, gray.into_raw())
}

/// Load an image file and convert it to an RGBA frame buffer.
pub fn load_image(path: &Path) -> MattelineResult<FrameBuffer> {
    let img = image::open(path).map_err(|e| {
        MattelineError::decode(
            format!("failed to load image: {}", e),
            path.display().to_string(),
        )
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, PixelFormat::Rgba8, rgba.into_raw())
}

/// Load an image from raw encoded bytes (PNG, JPEG, WebP...).
pub fn load_image_from_bytes(data: &[u8], origin: &str) -> MattelineResult<FrameBuffer> {
    let img = image::load_from_memory(data)
        .map_err(|e| MattelineError::decode(format!("failed to decode image: {}", e), origin))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameBuffer::from_raw(width, height, PixelFormat::Rgba8, rgba.into_raw())
}

fn to_rgba_image(fb: &FrameBuffer) -> MattelineResult<RgbaImage> {
    let rgba = match fb.format {
        PixelFormat::Rgba8 => fb.data.clone(),
        PixelFormat::Rgb8 => fb
            .data
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
    };
    RgbaImage::from_raw(fb.width, fb.height, rgba).ok_or_else(|| {
        MattelineError::InvalidArgument(format!(
            "frame buffer data does not match {}x{}",
            fb.width, fb.height
        ))
    })
}

fn to_gray_image(matte: &MatteBuffer) -> MattelineResult<GrayImage> {
    GrayImage::from_raw(matte.width, matte.height, matte.data.clone()).ok_or_else(|| {
        MattelineError::InvalidArgument(format!(
            "matte data does not match {}x{}",
            matte.width, matte.height
        ))
    })
}

/// Encode a frame buffer as PNG bytes. RGB buffers stay RGB.
pub fn encode_png(fb: &FrameBuffer) -> MattelineResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let written = match fb.format {
        PixelFormat::Rgba8 => to_rgba_image(fb)?.write_to(&mut out, ImageFormat::Png),
        PixelFormat::Rgb8 => RgbImage::from_raw(fb.width, fb.height, fb.data.clone())
            .ok_or_else(|| {
                MattelineError::InvalidArgument(format!(
                    "frame buffer data does not match {}x{}",
                    fb.width, fb.height
                ))
            })?
            .write_to(&mut out, ImageFormat::Png),
    };
    written.map_err(|e| MattelineError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

/// Encode a frame buffer as a `data:image/png;base64,...` URL.
pub fn encode_data_url(fb: &FrameBuffer) -> MattelineResult<String> {
    let png = encode_png(fb)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Write a frame buffer to a PNG file.
pub fn save_frame_png(fb: &FrameBuffer, path: &Path) -> MattelineResult<()> {
    let png = encode_png(fb)?;
    std::fs::write(path, png)?;
    Ok(())
}

/// Write a matte to a grayscale PNG file.
pub fn save_matte_png(matte: &MatteBuffer, path: &Path) -> MattelineResult<()> {
    to_gray_image(matte)?
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| MattelineError::Render(format!("failed to write '{}': {}", path.display(), e)))
}

/// Resize an RGBA buffer with linear filtering.
pub fn resize_frame(fb: &FrameBuffer, width: u32, height: u32) -> MattelineResult<FrameBuffer> {
    let img = to_rgba_image(fb)?;
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);
    FrameBuffer::from_raw(width, height, PixelFormat::Rgba8, resized.into_raw())
}

/// Resize a matte with linear filtering.
pub fn resize_matte(matte: &MatteBuffer, width: u32, height: u32) -> MattelineResult<MatteBuffer> {
    if matte.width == 0 || matte.height == 0 {
        return Err(MattelineError::mask("cannot resample an empty mask"));
    }
    let img = to_gray_image(matte)?;
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);
    MatteBuffer::from_raw(width, height, resized.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matteline_core::Color;

    #[test]
    fn test_load_image_missing_file() {
        let result = load_image(Path::new("/nonexistent/image.png"));
        assert!(matches!(result, Err(MattelineError::Decode { .. })));
    }

    #[test]
    fn test_data_url_round_trip() {
        let mut fb = FrameBuffer::new(3, 2, PixelFormat::Rgba8);
        fb.set_pixel(0, 0, [255, 0, 0, 255]);
        fb.set_pixel(2, 1, [10, 20, 30, 40]);
        let url = encode_data_url(&fb).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        let decoded = decode_data_url(&url, "test").unwrap();
        assert_eq!(decoded, fb);
    }

    #[test]
    fn test_decode_rgb_png_gains_alpha() {
        let rgb = FrameBuffer::solid(2, 2, &Color::GREEN).to_rgb8();
        let url = encode_data_url(&rgb).unwrap();
        let decoded = decode_data_url(&url, "test").unwrap();
        assert_eq!(decoded.format, PixelFormat::Rgba8);
        assert_eq!(decoded.get_pixel(1, 1), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_decode_rejects_missing_separator() {
        let err = decode_data_url("data:image/png;base64", "layer_0").unwrap_err();
        assert!(err.to_string().contains("layer_0"));
    }

    #[test]
    fn test_decode_rejects_bad_payload() {
        assert!(decode_data_url("data:image/png;base64,@@@@", "x").is_err());
        // Valid base64, not an image.
        assert!(decode_data_url("data:image/png;base64,aGVsbG8=", "x").is_err());
    }

    #[test]
    fn test_decode_mask_converts_to_gray() {
        let white = FrameBuffer::solid(4, 2, &Color::WHITE);
        let url = encode_data_url(&white).unwrap();
        let mask = decode_mask_data_url(&url, "mask").unwrap();
        assert_eq!((mask.width, mask.height), (4, 2));
        assert!(mask.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_resize_frame_dimensions() {
        let fb = FrameBuffer::solid(200, 100, &Color::RED);
        let resized = resize_frame(&fb, 100, 50).unwrap();
        assert_eq!((resized.width, resized.height), (100, 50));
        let px = resized.get_pixel(50, 25).unwrap();
        assert!(px[0] >= 254 && px[1] <= 1 && px[3] >= 254);
    }

    #[test]
    fn test_resize_matte_rejects_empty() {
        assert!(resize_matte(&MatteBuffer::new(0, 0), 4, 4).is_err());
        let up = resize_matte(&MatteBuffer::from_raw(1, 1, vec![200]).unwrap(), 3, 3).unwrap();
        assert!(up.data.iter().all(|&v| v.abs_diff(200) <= 1));
    }
}
