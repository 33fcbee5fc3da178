use glam::{Vec2, Vec3, Vec4};
use log::{debug, trace};

use crate::error::{IqmError, Result};
use crate::reader::ByteView;

/// Size of one vertex array descriptor record
pub const VERTEX_ARRAY_RECORD_SIZE: usize = 20;

/// Semantic of a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexArrayType {
    Position,
    TexCoord,
    Normal,
    Tangent,
    BlendIndexes,
    BlendWeights,
    Color,
    /// Custom arrays (0x10 and above) and unknown values
    Custom(u32),
}

impl VertexArrayType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Position,
            1 => Self::TexCoord,
            2 => Self::Normal,
            3 => Self::Tangent,
            4 => Self::BlendIndexes,
            5 => Self::BlendWeights,
            6 => Self::Color,
            other => Self::Custom(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::TexCoord => 1,
            Self::Normal => 2,
            Self::Tangent => 3,
            Self::BlendIndexes => 4,
            Self::BlendWeights => 5,
            Self::Color => 6,
            Self::Custom(value) => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::TexCoord => "texcoord",
            Self::Normal => "normal",
            Self::Tangent => "tangent",
            Self::BlendIndexes => "blend index",
            Self::BlendWeights => "blend weight",
            Self::Color => "color",
            Self::Custom(_) => "custom",
        }
    }

    /// The (format, component count) a loader accepts for this semantic
    pub fn expected_layout(self) -> Option<(VertexFormat, u32)> {
        match self {
            Self::Position | Self::Normal => Some((VertexFormat::Float, 3)),
            Self::TexCoord => Some((VertexFormat::Float, 2)),
            Self::Tangent => Some((VertexFormat::Float, 4)),
            Self::BlendIndexes | Self::BlendWeights | Self::Color => {
                Some((VertexFormat::UByte, 4))
            }
            Self::Custom(_) => None,
        }
    }
}

/// Component storage format of a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VertexFormat {
    Byte = 0,
    UByte = 1,
    Short = 2,
    UShort = 3,
    Int = 4,
    UInt = 5,
    Half = 6,
    Float = 7,
    Double = 8,
}

impl VertexFormat {
    pub fn from_raw(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Byte,
            1 => Self::UByte,
            2 => Self::Short,
            3 => Self::UShort,
            4 => Self::Int,
            5 => Self::UInt,
            6 => Self::Half,
            7 => Self::Float,
            8 => Self::Double,
            _ => return None,
        })
    }
}

/// One vertex array descriptor: {type, flags, format, size, offset}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArrayDescriptor {
    pub kind: VertexArrayType,
    pub flags: u32,
    /// Raw component format
    pub format: u32,
    /// Components per vertex
    pub size: u32,
    /// Absolute offset of the tightly packed array
    pub offset: u32,
}

impl VertexArrayDescriptor {
    pub fn parse(view: &ByteView<'_>, offset: usize) -> Result<Self> {
        Ok(Self {
            kind: VertexArrayType::from_raw(view.u32_at(offset)?),
            flags: view.u32_at(offset + 4)?,
            format: view.u32_at(offset + 8)?,
            size: view.u32_at(offset + 12)?,
            offset: view.u32_at(offset + 16)?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        for value in [self.kind.to_raw(), self.flags, self.format, self.size, self.offset] {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Reject formats the loader cannot store for this semantic
    fn check_layout(&self) -> Result<()> {
        match self.kind.expected_layout() {
            Some((format, size)) if self.format == format as u32 && self.size == size => Ok(()),
            Some(_) => Err(IqmError::InvalidVertexArray {
                kind: self.kind.name(),
                format: self.format,
                size: self.size,
            }),
            None => Ok(()),
        }
    }
}

/// Per-vertex attribute arrays; only the declared ones are populated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexData {
    pub count: usize,
    pub positions: Option<Vec<Vec3>>,
    pub texcoords: Option<Vec<Vec2>>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
    pub blend_indices: Option<Vec<[u8; 4]>>,
    pub blend_weights: Option<Vec<[u8; 4]>>,
    pub colors: Option<Vec<[u8; 4]>>,
}

impl VertexData {
    /// Load every declared vertex array
    pub fn parse(
        view: &ByteView<'_>,
        ofs_vertex_arrays: u32,
        num_vertex_arrays: u32,
        num_vertexes: u32,
    ) -> Result<Self> {
        let count = num_vertexes as usize;
        let mut data = Self {
            count,
            ..Default::default()
        };

        view.table(
            ofs_vertex_arrays,
            num_vertex_arrays,
            VERTEX_ARRAY_RECORD_SIZE,
        )?;
        debug!(
            "Loading {} vertex arrays for {} vertices",
            num_vertex_arrays, count
        );

        for i in 0..num_vertex_arrays as usize {
            let descriptor = VertexArrayDescriptor::parse(
                view,
                ofs_vertex_arrays as usize + i * VERTEX_ARRAY_RECORD_SIZE,
            )?;
            trace!("Vertex array {}: {:?}", i, descriptor);
            descriptor.check_layout()?;

            let ofs = descriptor.offset;
            match descriptor.kind {
                VertexArrayType::Position => {
                    data.positions = Some(read_floats(view, ofs, count, |[x, y, z]| {
                        Vec3::new(x, y, z)
                    })?);
                }
                VertexArrayType::TexCoord => {
                    data.texcoords = Some(read_floats(view, ofs, count, |[u, v]| Vec2::new(u, v))?);
                }
                VertexArrayType::Normal => {
                    let normals = read_floats(view, ofs, count, |[x, y, z]| Vec3::new(x, y, z))?;
                    #[cfg(feature = "flip-winding")]
                    let normals = normals.into_iter().map(|n| -n).collect();
                    data.normals = Some(normals);
                }
                VertexArrayType::Tangent => {
                    data.tangents = Some(read_floats(view, ofs, count, |[x, y, z, w]| {
                        Vec4::new(x, y, z, w)
                    })?);
                }
                VertexArrayType::BlendIndexes => {
                    data.blend_indices = Some(read_bytes4(view, ofs, count)?);
                }
                VertexArrayType::BlendWeights => {
                    data.blend_weights = Some(read_bytes4(view, ofs, count)?);
                }
                VertexArrayType::Color => {
                    data.colors = Some(read_bytes4(view, ofs, count)?);
                }
                VertexArrayType::Custom(kind) => {
                    debug!("Skipping custom vertex array type {:#x}", kind);
                }
            }
        }

        Ok(data)
    }

    /// Whether the arrays needed for skinning are present
    pub fn is_skinnable(&self) -> bool {
        self.positions.is_some() && self.blend_indices.is_some() && self.blend_weights.is_some()
    }
}

fn read_floats<const N: usize, T>(
    view: &ByteView<'_>,
    offset: u32,
    count: usize,
    build: impl Fn([f32; N]) -> T,
) -> Result<Vec<T>> {
    view.table(offset, count as u32, N * 4)?;
    (0..count)
        .map(|i| view.f32_array::<N>(offset as usize + i * N * 4).map(&build))
        .collect()
}

fn read_bytes4(view: &ByteView<'_>, offset: u32, count: usize) -> Result<Vec<[u8; 4]>> {
    let block = view.table(offset, count as u32, 4)?;
    Ok(block
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: VertexArrayType, format: VertexFormat, size: u32, offset: u32) -> Vec<u8> {
        let mut out = Vec::new();
        VertexArrayDescriptor {
            kind,
            flags: 0,
            format: format as u32,
            size,
            offset,
        }
        .write(&mut out);
        out
    }

    #[test]
    fn test_position_and_blend_arrays() {
        // Two descriptors (40 bytes), then 2 positions (24 bytes), then 2 blend index sets
        let mut data = descriptor(VertexArrayType::Position, VertexFormat::Float, 3, 40);
        data.extend(descriptor(
            VertexArrayType::BlendIndexes,
            VertexFormat::UByte,
            4,
            64,
        ));
        for v in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]);

        let view = ByteView::new(&data);
        let vertices = VertexData::parse(&view, 0, 2, 2).unwrap();
        assert_eq!(vertices.count, 2);
        assert_eq!(
            vertices.positions.as_deref(),
            Some(&[Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)][..])
        );
        assert_eq!(
            vertices.blend_indices.as_deref(),
            Some(&[[0, 1, 2, 3], [4, 5, 6, 7]][..])
        );
        assert!(vertices.normals.is_none());
        assert!(vertices.texcoords.is_none());
        assert!(!vertices.is_skinnable());
    }

    #[test]
    fn test_wrong_position_format() {
        let data = descriptor(VertexArrayType::Position, VertexFormat::Half, 3, 20);
        let view = ByteView::new(&data);
        let err = VertexData::parse(&view, 0, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            IqmError::InvalidVertexArray {
                kind: "position",
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_blend_weight_size() {
        let data = descriptor(VertexArrayType::BlendWeights, VertexFormat::UByte, 3, 20);
        let view = ByteView::new(&data);
        assert!(VertexData::parse(&view, 0, 1, 0).is_err());
    }

    #[test]
    fn test_custom_array_skipped() {
        let data = descriptor(VertexArrayType::Custom(0x10), VertexFormat::Double, 7, 9999);
        let view = ByteView::new(&data);
        let vertices = VertexData::parse(&view, 0, 1, 4).unwrap();
        assert_eq!(vertices.count, 4);
        assert!(vertices.positions.is_none());
    }

    #[test]
    fn test_array_past_end_of_file() {
        let data = descriptor(VertexArrayType::Color, VertexFormat::UByte, 4, 16);
        let view = ByteView::new(&data);
        assert!(matches!(
            VertexData::parse(&view, 0, 1, 2),
            Err(IqmError::ParseError(_))
        ));
    }
}
