use log::trace;

use crate::chunks::text::TextPool;
use crate::error::{IqmError, Result};
use crate::material::TextureHandle;
use crate::reader::ByteView;

/// Size of one mesh record
pub const MESH_RECORD_SIZE: usize = 24;

/// A drawable segment of the model: one material over a range of triangles
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub name: String,
    /// Material name as stored in the file
    pub material: String,
    /// Texture resolved for the material, if a loader was supplied and succeeded
    #[cfg_attr(feature = "serde-support", serde(skip))]
    pub texture: Option<TextureHandle>,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_triangle: u32,
    pub triangle_count: u32,
}

impl Mesh {
    pub fn parse(view: &ByteView<'_>, text: &TextPool<'_>, offset: usize) -> Result<Self> {
        let mesh = Self {
            name: text.name_at(view.u32_at(offset)?)?,
            material: text.name_at(view.u32_at(offset + 4)?)?,
            texture: None,
            first_vertex: view.u32_at(offset + 8)?,
            vertex_count: view.u32_at(offset + 12)?,
            first_triangle: view.u32_at(offset + 16)?,
            triangle_count: view.u32_at(offset + 20)?,
        };
        trace!("Mesh '{}' material '{}'", mesh.name, mesh.material);
        Ok(mesh)
    }

    /// Range of this mesh inside the model's triangle array
    pub fn triangle_range(&self) -> std::ops::Range<usize> {
        let first = self.first_triangle as usize;
        first..first + self.triangle_count as usize
    }

    /// Fail unless the triangle range lies inside a table of `num_triangles`
    pub fn validate(&self, num_triangles: u32) -> Result<()> {
        let end = u64::from(self.first_triangle) + u64::from(self.triangle_count);
        if end > u64::from(num_triangles) {
            return Err(IqmError::ParseError(format!(
                "mesh '{}' covers triangles {}..{} of {}",
                self.name, self.first_triangle, end, num_triangles
            )));
        }
        Ok(())
    }
}

/// Read the triangle index table
///
/// With the `flip-winding` feature the second and third index of every
/// triangle swap places.
pub fn parse_triangles(
    view: &ByteView<'_>,
    ofs_triangles: u32,
    num_triangles: u32,
    num_vertexes: u32,
) -> Result<Vec<[u32; 3]>> {
    view.table(ofs_triangles, num_triangles, 12)?;
    let mut triangles = Vec::with_capacity(num_triangles as usize);
    for i in 0..num_triangles as usize {
        let base = ofs_triangles as usize + i * 12;
        let a = view.u32_at(base)?;
        let b = view.u32_at(base + 4)?;
        let c = view.u32_at(base + 8)?;
        if let Some(&bad) = [a, b, c].iter().find(|&&v| v >= num_vertexes) {
            return Err(IqmError::ParseError(format!(
                "triangle {i} references vertex {bad} of {num_vertexes}"
            )));
        }
        #[cfg(not(feature = "flip-winding"))]
        triangles.push([a, b, c]);
        #[cfg(feature = "flip-winding")]
        triangles.push([a, c, b]);
    }
    Ok(triangles)
}
