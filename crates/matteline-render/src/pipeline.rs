use std::ops::Range;

use rayon::prelude::*;

use matteline_core::hash::{self, ContentHash};
use matteline_core::{
    Frame, FrameBuffer, MattelineError, MattelineResult, MatteBuffer, PixelFormat, Timestamp,
};
use matteline_ir::{validate_document, AnimationDocument, Layer, LayerRecord, ProjectSettings};

use crate::compositor::composite;
use crate::image_loader::{decode_data_url, decode_mask_data_url};
use crate::matte::postprocess;
use crate::rasterize::rasterize;
use crate::resolve::resolve;

/// Width and height of the placeholder frame and matte.
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Options controlling how a render is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Shard whole frames across the rayon pool. Output order and content
    /// are identical either way.
    pub parallel: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Result of a render: one RGB frame and one matte per frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    /// Rendered frames in order, RGB8.
    pub frames: Vec<FrameBuffer>,
    /// Post-processed mattes, one per frame.
    pub mattes: Vec<MatteBuffer>,
    pub width: u32,
    pub height: u32,
    /// Index of the first rendered frame.
    pub start_frame: u64,
}

impl RenderResult {
    /// A single black frame and empty matte, returned when there is nothing
    /// to render or the animation could not be read.
    pub fn placeholder() -> Self {
        Self {
            frames: vec![FrameBuffer::new(
                PLACEHOLDER_SIZE,
                PLACEHOLDER_SIZE,
                PixelFormat::Rgb8,
            )],
            mattes: vec![MatteBuffer::new(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)],
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            start_frame: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Compute the content hash of every frame and matte.
    ///
    /// Two renders of the same animation and frame range hash identically.
    pub fn content_hash(&self) -> ContentHash {
        hash::hash_sequence(&self.frames, &self.mattes)
    }

    /// Compute the content hash of a single frame by position.
    pub fn frame_hash(&self, index: usize) -> Option<ContentHash> {
        self.frames.get(index).map(hash::hash_frame)
    }

    /// Compute the content hash of a single matte by position.
    pub fn matte_hash(&self, index: usize) -> Option<ContentHash> {
        self.mattes.get(index).map(hash::hash_matte)
    }

    /// Frame pixels scaled to `[0, 1]`, laid out height × width × 3 per frame.
    pub fn frames_normalized(&self) -> Vec<Vec<f32>> {
        self.frames.iter().map(FrameBuffer::to_normalized).collect()
    }

    /// Matte values scaled to `[0, 1]`, laid out height × width per frame.
    pub fn mattes_normalized(&self) -> Vec<Vec<f32>> {
        self.mattes.iter().map(MatteBuffer::to_normalized).collect()
    }
}

/// The timeline driver: renders decoded layers over a frame range.
pub struct RenderPipeline {
    settings: ProjectSettings,
    layers: Vec<Layer>,
    options: RenderOptions,
}

impl RenderPipeline {
    pub fn new(settings: ProjectSettings, layers: Vec<Layer>) -> Self {
        Self {
            settings,
            layers,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Decode every layer of `document`. Layers that fail to decode are
    /// logged and left out; validation issues are logged only.
    pub fn from_document(document: &AnimationDocument) -> Self {
        if let Err(errors) = validate_document(document) {
            for e in &errors {
                tracing::warn!("{}", e);
            }
        }
        Self::new(document.project.clone(), decode_layers(document))
    }

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Clamp a requested `[start, end)` range to the animation.
    /// `end == -1` or an `end` past the last frame means "to the end".
    pub fn frame_range(&self, start_frame: i64, end_frame: i64) -> Range<u64> {
        let total = self.settings.frame_count();
        let start = start_frame.max(0) as u64;
        let end = match end_frame {
            -1 => total,
            e if e < 0 => 0,
            e => (e as u64).min(total),
        };
        start..end.max(start)
    }

    /// Render `[start_frame, end_frame)`. An empty range yields the placeholder.
    pub fn render_range(&self, start_frame: i64, end_frame: i64) -> RenderResult {
        let range = self.frame_range(start_frame, end_frame);
        tracing::info!(
            "Render: {}x{}, frames {}..{} of {}, {} layer(s)",
            self.settings.width,
            self.settings.height,
            range.start,
            range.end,
            self.settings.frame_count(),
            self.layers.len()
        );

        if range.is_empty() {
            tracing::info!("Requested range has no frames, returning placeholder");
            return RenderResult::placeholder();
        }

        let start = range.start;
        let rendered: Vec<(FrameBuffer, MatteBuffer)> = if self.options.parallel {
            range
                .into_par_iter()
                .map(|index| self.render_frame_index(index))
                .collect()
        } else {
            range.map(|index| self.render_frame_index(index)).collect()
        };
        let (frames, mattes): (Vec<_>, Vec<_>) = rendered.into_iter().unzip();

        RenderResult {
            frames,
            mattes,
            width: self.settings.width,
            height: self.settings.height,
            start_frame: start,
        }
    }

    /// Render exactly one frame by index, returning the RGB frame and its
    /// post-processed matte.
    pub fn render_frame_index(&self, index: u64) -> (FrameBuffer, MatteBuffer) {
        let (width, height) = (self.settings.width, self.settings.height);
        let time = self.settings.frame_time(index);
        tracing::debug!(
            "Rendering {} at {}",
            Frame::new(index),
            Timestamp::from_seconds(time)
        );

        let mut canvas = FrameBuffer::new(width, height, PixelFormat::Rgba8);
        let mut matte = MatteBuffer::new(width, height);

        for layer in &self.layers {
            let transform = resolve(layer, time);
            match rasterize(layer, &transform, width, height) {
                Ok(raster) => composite(
                    &mut canvas,
                    &mut matte,
                    &raster.buffer,
                    raster.paste_x,
                    raster.paste_y,
                    transform.opacity,
                    !layer.is_background(),
                ),
                Err(e) => {
                    tracing::warn!("Skipping layer '{}' in frame {}: {}", layer.id, index, e);
                }
            }
        }

        let matte = postprocess(
            &matte,
            self.settings.mask_expansion,
            self.settings.mask_feather,
        );
        (canvas.to_rgb8(), matte)
    }
}

/// Decode the layers of a document in order, skipping any that fail.
pub fn decode_layers(document: &AnimationDocument) -> Vec<Layer> {
    document
        .layers
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            tracing::debug!(
                "Layer {}: {} - {}",
                index,
                record.label(),
                record.layer_type().unwrap_or("unknown")
            );
            match decode_layer(record) {
                Ok(layer) => Some(layer),
                Err(e) => {
                    tracing::warn!("Skipping layer {}: {}", record.label(), e);
                    None
                }
            }
        })
        .collect()
}

/// Decode one layer record. A custom mask that fails to decode is logged
/// and dropped; the layer itself still decodes.
pub fn decode_layer(record: &LayerRecord) -> MattelineResult<Layer> {
    let origin = record.label();
    let url = record
        .image_data()
        .ok_or_else(|| MattelineError::decode("layer has no image_data", origin.as_str()))?;
    let image = decode_data_url(url, &origin)?;

    let custom_mask = if record.is_background() {
        None
    } else {
        record
            .custom_mask()
            .and_then(|mask_url| match decode_mask_data_url(mask_url, &origin) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    tracing::warn!("Ignoring custom mask of {}: {}", origin, e);
                    None
                }
            })
    };

    record.to_layer(image, custom_mask)
}

/// Render entry point: parse the animation JSON, decode its layers and
/// render `[start_frame, end_frame)`.
///
/// Never fails: unreadable input yields the placeholder result.
pub fn render_document(
    json: &str,
    start_frame: i64,
    end_frame: i64,
    options: RenderOptions,
) -> RenderResult {
    let document = match AnimationDocument::parse(json) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Failed to read animation, returning placeholder: {}", e);
            return RenderResult::placeholder();
        }
    };

    RenderPipeline::from_document(&document)
        .with_options(options)
        .render_range(start_frame, end_frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matteline_core::Color;
    use matteline_ir::FitMode;

    fn settings(width: u32, height: u32, frames: u64) -> ProjectSettings {
        ProjectSettings {
            width,
            height,
            fps: 10.into(),
            total_frames: Some(frames),
            ..ProjectSettings::default()
        }
    }

    #[test]
    fn test_frame_range_clamping() {
        let pipeline = RenderPipeline::new(settings(4, 4, 10), vec![]);
        assert_eq!(pipeline.frame_range(0, -1), 0..10);
        assert_eq!(pipeline.frame_range(2, 5), 2..5);
        assert_eq!(pipeline.frame_range(-3, 4), 0..4);
        assert_eq!(pipeline.frame_range(3, 50), 3..10);
        assert_eq!(pipeline.frame_range(8, 2), 8..8);
        assert_eq!(pipeline.frame_range(0, -7), 0..0);
        assert_eq!(pipeline.frame_range(12, -1), 12..12);
    }

    #[test]
    fn test_empty_range_returns_placeholder() {
        let pipeline = RenderPipeline::new(settings(4, 4, 10), vec![]);
        let result = pipeline.render_range(5, 5);
        assert_eq!(result, RenderResult::placeholder());
        assert_eq!(result.frames[0].format, PixelFormat::Rgb8);
        assert_eq!(result.frames[0].byte_size(), 64 * 64 * 3);
    }

    #[test]
    fn test_render_without_layers_is_black() {
        let pipeline = RenderPipeline::new(settings(4, 3, 2), vec![]);
        let result = pipeline.render_range(0, -1);
        assert_eq!(result.frame_count(), 2);
        assert!(result.frames.iter().all(|f| f.data.iter().all(|&v| v == 0)));
        assert_eq!((result.frames[0].width, result.frames[0].height), (4, 3));
        assert_eq!(result.mattes[0].pixel_count(), 12);
    }

    #[test]
    fn test_background_then_foreground_order() {
        let bg = Layer::background("background", FrameBuffer::solid(4, 4, &Color::BLUE), FitMode::Fit);
        let fg = Layer::foreground("layer_0", FrameBuffer::solid(2, 2, &Color::RED));
        let pipeline = RenderPipeline::new(settings(4, 4, 1), vec![bg, fg]);
        let (frame, matte) = pipeline.render_frame_index(0);
        assert_eq!(frame.get_pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(frame.get_pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(matte.get(0, 0), Some(0));
        assert_eq!(matte.get(2, 2), Some(255));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let fg = Layer::foreground("layer_0", FrameBuffer::solid(3, 3, &Color::GREEN))
            .with_rotation(33.0)
            .with_position(1.0, -1.0);
        let mut project = settings(8, 8, 6);
        project.mask_expansion = 1;
        project.mask_feather = 1;

        let parallel = RenderPipeline::new(project.clone(), vec![fg.clone()]).render_range(0, -1);
        let sequential = RenderPipeline::new(project, vec![fg])
            .with_options(RenderOptions { parallel: false })
            .render_range(0, -1);
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.content_hash(), sequential.content_hash());
    }

    #[test]
    fn test_render_document_malformed_json() {
        let result = render_document("{\"project\": ", 0, -1, RenderOptions::default());
        assert_eq!(result, RenderResult::placeholder());
    }

    #[test]
    fn test_decode_layer_requires_image() {
        let record = LayerRecord::from(serde_json::json!({"id": "layer_0", "type": "foreground"}));
        assert!(matches!(
            decode_layer(&record),
            Err(MattelineError::Decode { .. })
        ));
    }

    #[test]
    fn test_normalized_outputs() {
        let result = RenderResult::placeholder();
        let frames = result.frames_normalized();
        let mattes = result.mattes_normalized();
        assert_eq!(frames[0].len(), 64 * 64 * 3);
        assert_eq!(mattes[0].len(), 64 * 64);
        assert!(result.frame_hash(0).is_some());
        assert!(result.matte_hash(1).is_none());
    }
}
