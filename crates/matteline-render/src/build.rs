//! The build entry point: encodes freshly supplied images and merges them
//! with the editor's cached layers into an animation document.

use matteline_core::{FrameBuffer, MattelineResult};
use matteline_ir::{AnimationBuilder, AnimationDocument, BuildOutput, ProjectSettings};

use crate::image_loader::encode_data_url;

/// Everything a build consumes.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    pub settings: ProjectSettings,
    /// JSON text of the editor's cached layer records.
    pub cached_layers: String,
    pub background: Option<FrameBuffer>,
    /// Foreground images in index order. `None` entries keep their index.
    pub foregrounds: Vec<Option<FrameBuffer>>,
    /// Also return the animation as a preview.
    pub preview: bool,
}

/// Assemble the animation document for `request`.
/// Images that fail to encode are logged and produce no layer.
pub fn build_document(request: &BuildRequest) -> AnimationDocument {
    let mut builder = AnimationBuilder::new(request.settings.clone());
    builder.cached_layers(&request.cached_layers);

    if let Some(image) = &request.background {
        match encode_data_url(image) {
            Ok(url) => {
                builder.background(url);
            }
            Err(e) => tracing::warn!("Failed to encode background image: {}", e),
        }
    }

    for (index, image) in request.foregrounds.iter().enumerate() {
        let url = image.as_ref().and_then(|fb| match encode_data_url(fb) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Failed to encode foreground image {}: {}", index, e);
                None
            }
        });
        builder.add_foreground(url);
    }

    builder.build()
}

/// Build and serialize the animation document.
pub fn build_animation(request: &BuildRequest) -> MattelineResult<BuildOutput> {
    let document = build_document(request);
    BuildOutput::from_document(&document, request.preview)
}
