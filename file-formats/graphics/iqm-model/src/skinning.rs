//! CPU vertex skinning
//!
//! Each vertex blends up to four bone skinning matrices with byte weights
//! interpreted as `weight / 255`. Positions go through the full affine
//! transform, normals through the upper 3x3 only and are not renormalized.
//! Weights are expected to sum to 255; that is not checked here.
//!
//! # Example
//!
//! ```rust
//! use glam::{Mat4, Vec3};
//! use iqm_model::skinning::skin_position;
//!
//! let bones = [Mat4::from_translation(Vec3::X), Mat4::IDENTITY];
//! let p = skin_position(&bones, Vec3::ZERO, [0, 1, 0, 0], [128, 127, 0, 0])?;
//! assert!((p.x - 128.0 / 255.0).abs() < 1e-6);
//! # Ok::<(), iqm_model::IqmError>(())
//! ```

use glam::{Mat4, Vec3};

use crate::chunks::VertexData;
use crate::error::{IqmError, Result};

/// Weighted blend of the matrices a vertex references
///
/// Zero weights are skipped, so their indices are never looked up.
fn blend<F>(bones: &[Mat4], indices: [u8; 4], weights: [u8; 4], mut apply: F) -> Result<Vec3>
where
    F: FnMut(&Mat4) -> Vec3,
{
    let mut sum = Vec3::ZERO;
    for (&index, &weight) in indices.iter().zip(&weights) {
        if weight == 0 {
            continue;
        }
        let matrix = bones.get(usize::from(index)).ok_or_else(|| {
            IqmError::ReferenceError(format!(
                "vertex references bone {index} of {}",
                bones.len()
            ))
        })?;
        sum += apply(matrix) * (f32::from(weight) / 255.0);
    }
    Ok(sum)
}

/// Skin one position
pub fn skin_position(bones: &[Mat4], position: Vec3, indices: [u8; 4], weights: [u8; 4]) -> Result<Vec3> {
    blend(bones, indices, weights, |m| m.transform_point3(position))
}

/// Skin one normal through the linear part of each matrix
pub fn skin_normal(bones: &[Mat4], normal: Vec3, indices: [u8; 4], weights: [u8; 4]) -> Result<Vec3> {
    blend(bones, indices, weights, |m| m.transform_vector3(normal))
}

/// Reusable output buffers for skinned vertices
#[derive(Debug, Clone, Default)]
pub struct CpuSkinner {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl CpuSkinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skin every vertex of `vertices` with `bones`
    ///
    /// Vertices without blend arrays, or a model with no bones, are copied
    /// through unchanged.
    pub fn skin(&mut self, vertices: &VertexData, bones: &[Mat4]) -> Result<()> {
        self.positions.clear();
        self.normals.clear();

        let positions = vertices.positions.as_deref().unwrap_or_default();
        let normals = vertices.normals.as_deref().unwrap_or_default();

        let blend_arrays = vertices
            .blend_indices
            .as_deref()
            .zip(vertices.blend_weights.as_deref());
        let Some((indices, weights)) = blend_arrays.filter(|_| !bones.is_empty()) else {
            self.positions.extend_from_slice(positions);
            self.normals.extend_from_slice(normals);
            return Ok(());
        };

        let needed = positions.len().max(normals.len());
        if indices.len() < needed || weights.len() < needed {
            return Err(IqmError::ParseError(format!(
                "blend arrays cover {} vertices, {} needed",
                indices.len().min(weights.len()),
                needed
            )));
        }

        self.positions.reserve(positions.len());
        for ((&position, &index), &weight) in positions.iter().zip(indices).zip(weights) {
            self.positions
                .push(skin_position(bones, position, index, weight)?);
        }
        self.normals.reserve(normals.len());
        for ((&normal, &index), &weight) in normals.iter().zip(indices).zip(weights) {
            self.normals.push(skin_normal(bones, normal, index, weight)?);
        }
        Ok(())
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }
}
