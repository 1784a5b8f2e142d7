use std::collections::HashSet;

use matteline_core::MattelineError;

use crate::document::AnimationDocument;

/// Validate an animation document for structural correctness.
///
/// Rendering tolerates every issue reported here; callers log them.
pub fn validate_document(document: &AnimationDocument) -> Result<(), Vec<MattelineError>> {
    let mut errors = Vec::new();
    let project = &document.project;

    if project.width == 0 || project.height == 0 {
        errors.push(MattelineError::Validation(
            "canvas resolution must be non-zero".into(),
        ));
    }

    if project.frame_rate() <= 0.0 {
        errors.push(MattelineError::Validation(
            "project fps must be positive".into(),
        ));
    }

    let backgrounds = document.layers.iter().filter(|l| l.is_background()).count();
    if backgrounds > 1 {
        errors.push(MattelineError::Validation(format!(
            "expected at most one background layer, found {}",
            backgrounds
        )));
    }

    let mut layer_ids = HashSet::new();
    for (index, layer) in document.layers.iter().enumerate() {
        if !layer.is_object() {
            errors.push(MattelineError::Validation(format!(
                "layer {} is not an object",
                index
            )));
            continue;
        }
        if let Some(id) = layer.id() {
            if !layer_ids.insert(id) {
                errors.push(MattelineError::Validation(format!(
                    "duplicate layer id '{}'",
                    id
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
