//! # matteline-core
//!
//! Core types and primitives for the Matteline compositing engine.
//! This crate contains foundational types shared across all Matteline crates:
//! pixel and matte buffers, colors, layer transforms, timestamps, content
//! hashes, configuration, and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod math;
pub mod time;

pub use config::*;

pub use color::Color;
pub use error::{MattelineError, MattelineResult};
pub use frame::{Frame, FrameBuffer, MatteBuffer, PixelFormat};
pub use math::{LayerTransform, Rect};
pub use time::Timestamp;
