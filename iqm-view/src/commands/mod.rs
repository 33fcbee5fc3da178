//! Command implementations

pub mod animate;
pub mod info;
pub mod retarget;
pub mod synth;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use iqm_model::{IqmModel, TextureHandle};
use log::debug;

/// Load a model, handing out a texture handle for every material image that
/// exists next to it
pub(crate) fn load_model(path: &Path) -> Result<IqmModel> {
    let mut next = 0u32;
    let mut loader = |texture: &Path| {
        if texture.is_file() {
            next += 1;
            debug!("Texture {} -> handle {}", texture.display(), next);
            Some(TextureHandle(next))
        } else {
            None
        }
    };
    IqmModel::load_with(path, &mut loader)
        .with_context(|| format!("Failed to load IQM model from {}", path.display()))
}

/// The image path a mesh material resolves to
pub(crate) fn material_path(model: &IqmModel, material: &str) -> Option<PathBuf> {
    if material.is_empty() {
        None
    } else {
        Some(iqm_model::material::resolve_material_path(
            &model.directory,
            material,
        ))
    }
}
