//! # matteline-ir
//!
//! The animation description shared by the editor and the renderer: the JSON
//! interchange document, keyframe curves, project settings and the decoded
//! layer model the renderer consumes.

pub mod animation;
pub mod builder;
pub mod document;
pub mod layer;
pub mod project;
pub mod validate;

pub use animation::{AnimatableProperty, Curve, CurveSet, Keyframe};
pub use builder::{AnimationBuilder, BuildOutput};
pub use document::{AnimationDocument, LayerRecord};
pub use layer::{FitMode, Layer, LayerId, LayerKind};
pub use project::ProjectSettings;
pub use validate::validate_document;
