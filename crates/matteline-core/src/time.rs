use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds from the start of an animation. Curves are evaluated at these.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    /// Negative values clamp to zero.
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = (self.seconds * 1000.0).round() as u64;
        let minutes = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        write!(f, "{:02}:{:02}.{:03}", minutes, secs, ms)
    }
}
