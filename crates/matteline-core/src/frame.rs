use serde::{Deserialize, Serialize};

use crate::error::{MattelineError, MattelineResult};

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
    /// 8-bit RGB (3 bytes per pixel, no alpha).
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A raw pixel buffer: a decoded layer image, a working canvas, or an output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    /// Raw pixel data, row-major.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Wrap an existing byte vector, checking that its length matches the dimensions.
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> MattelineResult<Self> {
        let expected = (width as usize) * (height as usize) * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(MattelineError::InvalidArgument(format!(
                "buffer of {} bytes does not match {}x{} {:?}",
                data.len(),
                width,
                height,
                format
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &crate::Color) -> Self {
        let format = PixelFormat::Rgba8;
        let pixel = color.to_rgba8();
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                self.data[offset + 3],
            ]),
            PixelFormat::Rgb8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                255,
            ]),
        }
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => {
                self.data[offset..offset + 4].copy_from_slice(&rgba);
            }
            PixelFormat::Rgb8 => {
                self.data[offset..offset + 3].copy_from_slice(&rgba[..3]);
            }
        }
    }

    /// Drop the alpha channel, producing an RGB8 copy.
    pub fn to_rgb8(&self) -> FrameBuffer {
        match self.format {
            PixelFormat::Rgb8 => self.clone(),
            PixelFormat::Rgba8 => {
                let mut data = Vec::with_capacity(self.pixel_count() * 3);
                for px in self.data.chunks_exact(4) {
                    data.extend_from_slice(&px[..3]);
                }
                FrameBuffer {
                    data,
                    width: self.width,
                    height: self.height,
                    format: PixelFormat::Rgb8,
                }
            }
        }
    }

    /// Pixel data scaled to `[0.0, 1.0]`, one value per channel.
    pub fn to_normalized(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32 / 255.0).collect()
    }
}

/// A single-channel 8-bit coverage map (the matte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatteBuffer {
    /// One byte per pixel, row-major.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl MatteBuffer {
    /// Create a zero-filled matte.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Wrap an existing byte vector, checking that its length matches the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> MattelineResult<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(MattelineError::InvalidArgument(format!(
                "matte of {} bytes does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Get the matte value at a pixel coordinate. Returns None if out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[(y as usize) * (self.width as usize) + (x as usize)])
    }

    /// Set the matte value at a pixel coordinate. No-op if out of bounds.
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.data[idx] = value;
    }

    /// Matte values scaled to `[0.0, 1.0]`.
    pub fn to_normalized(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32 / 255.0).collect()
    }
}

/// A frame position on the animation timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Zero-based frame index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    /// The instant this frame shows. Frame rates below 1 are treated as 1.
    pub fn to_timestamp(&self, fps: f64) -> crate::Timestamp {
        crate::Timestamp::from_seconds(self.index as f64 / fps.max(1.0))
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(1920, 1080, PixelFormat::Rgba8);
        assert_eq!(fb.width, 1920);
        assert_eq!(fb.height, 1080);
        assert_eq!(fb.byte_size(), 1920 * 1080 * 4);
        assert_eq!(fb.pixel_count(), 1920 * 1080);
        assert!(fb.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_buffer_solid() {
        let fb = FrameBuffer::solid(2, 2, &Color::RED);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_frame_buffer_get_set_pixel() {
        let mut fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
    }

    #[test]
    fn test_frame_buffer_out_of_bounds() {
        let fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(FrameBuffer::from_raw(2, 2, PixelFormat::Rgba8, vec![0; 15]).is_err());
        assert!(FrameBuffer::from_raw(2, 2, PixelFormat::Rgb8, vec![0; 12]).is_ok());
        assert!(MatteBuffer::from_raw(3, 3, vec![0; 8]).is_err());
    }

    #[test]
    fn test_to_rgb8_drops_alpha() {
        let mut fb = FrameBuffer::new(2, 1, PixelFormat::Rgba8);
        fb.set_pixel(0, 0, [10, 20, 30, 40]);
        fb.set_pixel(1, 0, [50, 60, 70, 80]);
        let rgb = fb.to_rgb8();
        assert_eq!(rgb.format, PixelFormat::Rgb8);
        assert_eq!(rgb.data, vec![10, 20, 30, 50, 60, 70]);
        assert_eq!(rgb.get_pixel(1, 0), Some([50, 60, 70, 255]));
    }

    #[test]
    fn test_matte_get_set_and_normalize() {
        let mut matte = MatteBuffer::new(4, 4);
        matte.set(3, 3, 255);
        matte.set(4, 4, 255); // out of bounds, ignored
        assert_eq!(matte.get(3, 3), Some(255));
        assert_eq!(matte.get(4, 0), None);
        let norm = matte.to_normalized();
        assert_eq!(norm.len(), 16);
        assert_eq!(norm[15], 1.0);
        assert_eq!(norm[0], 0.0);
    }

    #[test]
    fn test_frame_to_timestamp() {
        assert!((Frame::new(30).to_timestamp(30.0).as_seconds() - 1.0).abs() < 1e-9);
        assert_eq!(Frame::new(3).to_timestamp(0.0).as_seconds(), 3.0);
    }
}
