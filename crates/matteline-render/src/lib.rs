//! # matteline-render
//!
//! The Matteline rendering engine. Takes an animation document and produces,
//! per frame, an RGB image and a single-channel matte covering every
//! foreground layer. CPU-only; whole frames may be rendered in parallel.

pub mod build;
pub mod compositor;
pub mod image_loader;
pub mod matte;
pub mod pipeline;
pub mod rasterize;
pub mod resolve;

pub use build::{build_animation, build_document, BuildRequest};
pub use pipeline::{render_document, RenderOptions, RenderPipeline, RenderResult};
