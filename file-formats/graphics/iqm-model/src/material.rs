//! Material name to texture resolution
//!
//! Texture decoding lives outside this crate. The model only computes the
//! image path for each mesh and asks a [`TextureLoader`] for an opaque handle.

use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Opaque handle returned by a texture loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// External collaborator that turns an image path into a texture
pub trait TextureLoader {
    /// Load the image at `path`; `None` leaves the mesh untextured
    fn load_texture(&mut self, path: &Path) -> Option<TextureHandle>;
}

/// A loader that never produces a texture
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTextures;

impl TextureLoader for NoTextures {
    fn load_texture(&mut self, _path: &Path) -> Option<TextureHandle> {
        None
    }
}

impl<F> TextureLoader for F
where
    F: FnMut(&Path) -> Option<TextureHandle>,
{
    fn load_texture(&mut self, path: &Path) -> Option<TextureHandle> {
        self(path)
    }
}

/// Image path for a material name
///
/// Exporters often write material names as `texture,shader`; everything from
/// the last comma on is replaced with `.png`. Names without a comma are used
/// as given.
pub fn resolve_material_path(dir: &Path, material: &str) -> PathBuf {
    let file = match material.rfind(',') {
        Some(comma) => format!("{}.png", &material[..comma]),
        None => material.to_string(),
    };
    dir.join(file)
}

/// Directory that relative material names resolve against
///
/// The part of `path` before its last separator, or `./` when there is none.
pub fn model_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("./"),
    }
}

/// Resolve one material through `loader`, logging failures
pub fn load_material(
    loader: &mut dyn TextureLoader,
    dir: &Path,
    material: &str,
) -> Option<TextureHandle> {
    if material.is_empty() {
        return None;
    }
    let path = resolve_material_path(dir, material);
    match loader.load_texture(&path) {
        Some(handle) => {
            debug!("Material '{}' -> {} ({:?})", material, path.display(), handle);
            Some(handle)
        }
        None => {
            warn!(
                "Cannot load texture {} for material '{}'",
                path.display(),
                material
            );
            None
        }
    }
}
