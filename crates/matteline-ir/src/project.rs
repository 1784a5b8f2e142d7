use std::ops::RangeInclusive;

use matteline_core::Frame;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Accepted ranges for build parameters. Out-of-range input is clamped.
pub mod limits {
    use std::ops::RangeInclusive;

    pub const DIMENSION: RangeInclusive<i64> = 64..=8192;
    pub const FPS: RangeInclusive<i64> = 1..=120;
    pub const TOTAL_FRAMES: RangeInclusive<i64> = 1..=9999;
    pub const MASK_EXPANSION: RangeInclusive<i64> = -255..=255;
    pub const MASK_FEATHER: RangeInclusive<i64> = 0..=100;
}

fn default_dimension() -> u32 {
    512
}

fn default_fps() -> Number {
    Number::from(30)
}

/// Canvas, timing and matte post-processing settings of an animation document.
///
/// `fps` and `duration` keep their JSON spelling (`10` stays `10`, `10.0`
/// stays `10.0`) and keys this engine does not read are kept in `extra`, so
/// a parsed project serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Canvas width in pixels.
    #[serde(default = "default_dimension")]
    pub width: u32,
    /// Canvas height in pixels.
    #[serde(default = "default_dimension")]
    pub height: u32,
    /// Frames per second. Read through [`ProjectSettings::frame_rate`].
    #[serde(default = "default_fps")]
    pub fps: Number,
    /// Duration in seconds. Only consulted when `total_frames` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    /// Signed matte dilation (positive) or erosion (negative) iteration count.
    #[serde(default)]
    pub mask_expansion: i32,
    /// Matte blur radius.
    #[serde(default)]
    pub mask_feather: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            width: default_dimension(),
            height: default_dimension(),
            fps: default_fps(),
            duration: None,
            total_frames: None,
            mask_expansion: 0,
            mask_feather: 0,
            extra: Map::new(),
        }
    }
}

impl ProjectSettings {
    /// Settings for a build, with every parameter clamped into its accepted
    /// range and `duration` derived from the frame count.
    pub fn for_build(
        width: i64,
        height: i64,
        fps: i64,
        total_frames: i64,
        mask_expansion: i64,
        mask_feather: i64,
    ) -> Self {
        let width = clamp_param("width", width, limits::DIMENSION);
        let height = clamp_param("height", height, limits::DIMENSION);
        let fps = clamp_param("fps", fps, limits::FPS);
        let total_frames = clamp_param("total_frames", total_frames, limits::TOTAL_FRAMES);
        let mask_expansion = clamp_param("mask_expansion", mask_expansion, limits::MASK_EXPANSION);
        let mask_feather = clamp_param("mask_feather", mask_feather, limits::MASK_FEATHER);

        Self {
            width: width as u32,
            height: height as u32,
            fps: Number::from(fps),
            duration: Number::from_f64(total_frames as f64 / fps.max(1) as f64),
            total_frames: Some(total_frames as u64),
            mask_expansion: mask_expansion as i32,
            mask_feather: mask_feather as u32,
            extra: Map::new(),
        }
    }

    /// Frames per second as a float.
    pub fn frame_rate(&self) -> f64 {
        self.fps.as_f64().unwrap_or(0.0)
    }

    /// Replace the frame rate.
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        if let Some(fps) = Number::from_f64(fps) {
            self.fps = fps;
        }
        self
    }

    /// Number of frames in the animation. Falls back to `duration × fps`
    /// (duration defaults to one second), never less than one.
    pub fn frame_count(&self) -> u64 {
        match self.total_frames {
            Some(n) => n,
            None => {
                let duration = self.duration.as_ref().and_then(Number::as_f64).unwrap_or(1.0);
                ((duration * self.frame_rate()).floor().max(1.0)) as u64
            }
        }
    }

    /// The frame rate used to map frame indices to curve time.
    /// Rates below one frame per second are treated as one.
    pub fn time_base(&self) -> f64 {
        self.frame_rate().max(1.0)
    }

    /// Time in seconds of a frame index.
    pub fn frame_time(&self, index: u64) -> f64 {
        Frame::new(index).to_timestamp(self.frame_rate()).as_seconds()
    }
}

fn clamp_param(name: &str, value: i64, range: RangeInclusive<i64>) -> i64 {
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        tracing::warn!(
            "{} = {} is outside {}..={}, using {}",
            name,
            value,
            range.start(),
            range.end(),
            clamped
        );
    }
    clamped
}
