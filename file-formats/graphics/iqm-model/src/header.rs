use byteorder::{ByteOrder, LittleEndian};

use crate::error::{IqmError, Result};
use crate::reader::ByteView;

/// Magic signature for IQM files ("INTERQUAKEMODEL" plus a NUL)
pub const IQM_MAGIC: [u8; 16] = *b"INTERQUAKEMODEL\0";

/// The only format version this crate reads
pub const IQM_VERSION: u32 = 2;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 124;

/// IQM file header
///
/// Counts and absolute byte offsets for every table in the file. All fields
/// are little-endian `u32`; the layout is fixed and has no padding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct IqmHeader {
    /// Format version (always [`IQM_VERSION`] once parsed)
    pub version: u32,
    /// Declared total size of the file
    pub filesize: u32,
    /// Header flags (unused by version 2)
    pub flags: u32,

    /// Text pool
    pub num_text: u32,
    pub ofs_text: u32,

    /// Mesh records
    pub num_meshes: u32,
    pub ofs_meshes: u32,

    /// Vertex array descriptors and the shared vertex count
    pub num_vertex_arrays: u32,
    pub num_vertexes: u32,
    pub ofs_vertex_arrays: u32,

    /// Triangles and their adjacency table
    pub num_triangles: u32,
    pub ofs_triangles: u32,
    pub ofs_adjacency: u32,

    /// Joint (bone) records
    pub num_joints: u32,
    pub ofs_joints: u32,

    /// Pose channel descriptors, one per joint
    pub num_poses: u32,
    pub ofs_poses: u32,

    /// Animation clip records
    pub num_anims: u32,
    pub ofs_anims: u32,

    /// Compressed frame stream
    pub num_frames: u32,
    pub num_frame_channels: u32,
    pub ofs_frames: u32,
    pub ofs_bounds: u32,

    /// Comment block
    pub num_comment: u32,
    pub ofs_comment: u32,

    /// Extension chain
    pub num_extensions: u32,
    pub ofs_extensions: u32,
}

impl IqmHeader {
    /// Parse and validate the header at the start of `data`
    ///
    /// Checks the magic signature, the exact version, and that the declared
    /// file size fits inside the buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let view = ByteView::new(data);

        let magic = data.get(..IQM_MAGIC.len()).unwrap_or(data);
        if magic != IQM_MAGIC {
            return Err(IqmError::InvalidMagic {
                expected: String::from_utf8_lossy(&IQM_MAGIC[..15]).to_string(),
                actual: String::from_utf8_lossy(magic)
                    .trim_end_matches('\0')
                    .to_string(),
            });
        }

        let version = view.u32_at(16)?;
        if version != IQM_VERSION {
            return Err(IqmError::UnsupportedVersion(version));
        }

        if data.len() < HEADER_SIZE {
            return Err(IqmError::ParseError(format!(
                "header needs {HEADER_SIZE} bytes, file has {}",
                data.len()
            )));
        }

        let field = |index: usize| LittleEndian::read_u32(&data[16 + index * 4..20 + index * 4]);
        let header = Self {
            version,
            filesize: field(1),
            flags: field(2),
            num_text: field(3),
            ofs_text: field(4),
            num_meshes: field(5),
            ofs_meshes: field(6),
            num_vertex_arrays: field(7),
            num_vertexes: field(8),
            ofs_vertex_arrays: field(9),
            num_triangles: field(10),
            ofs_triangles: field(11),
            ofs_adjacency: field(12),
            num_joints: field(13),
            ofs_joints: field(14),
            num_poses: field(15),
            ofs_poses: field(16),
            num_anims: field(17),
            ofs_anims: field(18),
            num_frames: field(19),
            num_frame_channels: field(20),
            ofs_frames: field(21),
            ofs_bounds: field(22),
            num_comment: field(23),
            ofs_comment: field(24),
            num_extensions: field(25),
            ofs_extensions: field(26),
        };

        if header.filesize as usize > data.len() {
            return Err(IqmError::ParseError(format!(
                "header declares {} bytes but only {} are present",
                header.filesize,
                data.len()
            )));
        }

        Ok(header)
    }

    /// Serialize the header (magic included) into `out`
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&IQM_MAGIC);
        for value in self.fields() {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn fields(&self) -> [u32; 27] {
        [
            self.version,
            self.filesize,
            self.flags,
            self.num_text,
            self.ofs_text,
            self.num_meshes,
            self.ofs_meshes,
            self.num_vertex_arrays,
            self.num_vertexes,
            self.ofs_vertex_arrays,
            self.num_triangles,
            self.ofs_triangles,
            self.ofs_adjacency,
            self.num_joints,
            self.ofs_joints,
            self.num_poses,
            self.ofs_poses,
            self.num_anims,
            self.ofs_anims,
            self.num_frames,
            self.num_frame_channels,
            self.ofs_frames,
            self.ofs_bounds,
            self.num_comment,
            self.ofs_comment,
            self.num_extensions,
            self.ofs_extensions,
        ]
    }

    /// Whether the file carries any animation frames
    pub fn has_animation(&self) -> bool {
        self.num_anims > 0 && self.num_frames > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(header: &IqmHeader) -> Vec<u8> {
        let mut data = Vec::new();
        header.write(&mut data);
        data
    }

    #[test]
    fn test_header_round_trip() {
        let header = IqmHeader {
            version: IQM_VERSION,
            filesize: HEADER_SIZE as u32,
            num_joints: 2,
            num_poses: 2,
            ofs_joints: 124,
            num_frames: 7,
            ..Default::default()
        };
        let data = header_bytes(&header);
        assert_eq!(data.len(), HEADER_SIZE);

        let parsed = IqmHeader::parse(&data).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = header_bytes(&IqmHeader {
            version: IQM_VERSION,
            filesize: HEADER_SIZE as u32,
            ..Default::default()
        });
        data[0] = b'X';
        let err = IqmHeader::parse(&data).unwrap_err();
        assert!(matches!(err, IqmError::InvalidMagic { .. }));
    }

    #[test]
    fn test_short_buffer_is_bad_magic() {
        let err = IqmHeader::parse(b"INTER").unwrap_err();
        assert!(matches!(err, IqmError::InvalidMagic { .. }));
    }

    #[test]
    fn test_wrong_version() {
        let data = header_bytes(&IqmHeader {
            version: 1,
            filesize: HEADER_SIZE as u32,
            ..Default::default()
        });
        let err = IqmHeader::parse(&data).unwrap_err();
        assert!(matches!(err, IqmError::UnsupportedVersion(1)));
    }

    #[test]
    fn test_truncated_file() {
        let data = header_bytes(&IqmHeader {
            version: IQM_VERSION,
            filesize: 4096,
            ..Default::default()
        });
        let err = IqmHeader::parse(&data).unwrap_err();
        assert!(matches!(err, IqmError::ParseError(_)));
    }
}
