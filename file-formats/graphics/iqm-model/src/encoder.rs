//! Writing IQM files
//!
//! [`IqmEncoder`] assembles a complete version 2 file from in-memory pieces.
//! Full per-frame poses are quantized into the 16-bit delta channels the
//! format stores: each channel's offset is its minimum over all frames and its
//! scale spreads the range over `0..=65535`. Channels that never change get no
//! mask bit and cost nothing per frame.

use std::fs;
use std::ops::Range;
use std::path::Path;

use glam::{Quat, Vec2, Vec3, Vec4};
use log::debug;

use crate::animation::pose::{CHANNEL_COUNT, ChannelMask, Pose, PoseChannel};
use crate::animation::FrameTable;
use crate::chunks::{
    AnimFlags, AnimationClip, FrameBounds, JointRecord, VertexArrayDescriptor, VertexArrayType,
    VertexFormat,
};
use crate::error::{IqmError, Result};
use crate::header::{HEADER_SIZE, IQM_VERSION, IqmHeader};
use crate::MAX_FRAMES;

#[derive(Debug, Clone)]
struct MeshEntry {
    name: String,
    material: String,
    vertices: Range<u32>,
    triangles: Range<u32>,
}

/// Builder for IQM files
#[derive(Debug, Clone, Default)]
pub struct IqmEncoder {
    positions: Option<Vec<Vec3>>,
    texcoords: Option<Vec<Vec2>>,
    normals: Option<Vec<Vec3>>,
    tangents: Option<Vec<Vec4>>,
    blend_indices: Option<Vec<[u8; 4]>>,
    blend_weights: Option<Vec<[u8; 4]>>,
    colors: Option<Vec<[u8; 4]>>,
    triangles: Vec<[u32; 3]>,
    meshes: Vec<MeshEntry>,
    joints: Vec<JointRecord>,
    channels: Vec<PoseChannel>,
    frame_data: Vec<u16>,
    /// Explicit frame count; constant channels store no deltas to count
    frame_count: Option<usize>,
    clips: Vec<AnimationClip>,
    bounds: Vec<FrameBounds>,
    comment: Option<String>,
}

impl IqmEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(mut self, positions: Vec<Vec3>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn texcoords(mut self, texcoords: Vec<Vec2>) -> Self {
        self.texcoords = Some(texcoords);
        self
    }

    pub fn normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn tangents(mut self, tangents: Vec<Vec4>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Per-vertex bone indices and 0-255 weights
    pub fn blend(mut self, indices: Vec<[u8; 4]>, weights: Vec<[u8; 4]>) -> Self {
        self.blend_indices = Some(indices);
        self.blend_weights = Some(weights);
        self
    }

    pub fn colors(mut self, colors: Vec<[u8; 4]>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn triangles(mut self, triangles: Vec<[u32; 3]>) -> Self {
        self.triangles = triangles;
        self
    }

    pub fn mesh(
        mut self,
        name: &str,
        material: &str,
        vertices: Range<u32>,
        triangles: Range<u32>,
    ) -> Self {
        self.meshes.push(MeshEntry {
            name: name.to_string(),
            material: material.to_string(),
            vertices,
            triangles,
        });
        self
    }

    /// Append a joint; `parent` must name an earlier joint or be negative
    pub fn joint(mut self, name: &str, parent: i32, pose: Pose) -> Self {
        self.joints.push(JointRecord {
            name: name.to_string(),
            parent,
            pose,
        });
        self
    }

    /// Use pre-built channels and an already packed delta stream
    ///
    /// When every channel is constant the stream is empty; set the count with
    /// [`IqmEncoder::frame_count`] or it is taken from the longest clip.
    pub fn raw_frames(mut self, channels: Vec<PoseChannel>, data: Vec<u16>) -> Self {
        self.channels = channels;
        self.frame_data = data;
        self.frame_count = None;
        self
    }

    /// Set the number of frames written to the header
    pub fn frame_count(mut self, count: usize) -> Self {
        self.frame_count = Some(count);
        self
    }

    /// Quantize full poses, one `Vec` of per-bone poses per frame
    ///
    /// Call after every joint has been added; channel parents are copied from
    /// the joints.
    pub fn frames(mut self, frames: &[Vec<Pose>]) -> Self {
        let parents: Vec<i32> = self.joints.iter().map(|j| j.parent).collect();
        let (channels, data) = quantize_frames(frames, &parents);
        self.channels = channels;
        self.frame_data = data;
        self.frame_count = Some(frames.len());
        self
    }

    pub fn clip(
        mut self,
        name: &str,
        first_frame: u32,
        frame_count: u32,
        frame_rate: f32,
        looping: bool,
    ) -> Self {
        self.clips.push(AnimationClip {
            name: name.to_string(),
            first_frame,
            frame_count,
            frame_rate,
            flags: if looping {
                AnimFlags::LOOP
            } else {
                AnimFlags::empty()
            },
        });
        self
    }

    /// One bounds record per frame
    pub fn bounds(mut self, bounds: Vec<FrameBounds>) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Write the encoded file to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.encode()?)?;
        Ok(())
    }

    /// Serialize everything into one IQM buffer
    pub fn encode(&self) -> Result<Vec<u8>> {
        let vertex_count = self.vertex_count()?;
        let frames = FrameTable::new(self.channels.clone(), self.frame_data.clone())?;
        if !self.channels.is_empty() && self.channels.len() != self.joints.len() {
            return Err(IqmError::ChannelCountMismatch {
                bones: self.joints.len() as u32,
                channels: self.channels.len() as u32,
            });
        }
        let num_frames = self.num_frames(&frames)?;
        if !self.bounds.is_empty() && self.bounds.len() != num_frames as usize {
            return Err(IqmError::ParseError(format!(
                "{} bounds records for {} frames",
                self.bounds.len(),
                num_frames
            )));
        }

        let mut text = TextBuilder::default();
        let mesh_names: Vec<(u32, u32)> = self
            .meshes
            .iter()
            .map(|m| (text.add(&m.name), text.add(&m.material)))
            .collect();
        let joint_names: Vec<u32> = self.joints.iter().map(|j| text.add(&j.name)).collect();
        let clip_names: Vec<u32> = self.clips.iter().map(|c| text.add(&c.name)).collect();

        let mut header = IqmHeader {
            version: IQM_VERSION,
            num_vertexes: vertex_count as u32,
            ..Default::default()
        };
        let mut body = Vec::new();
        let here = |body: &Vec<u8>| (HEADER_SIZE + body.len()) as u32;

        if !text.data.is_empty() {
            header.num_text = text.data.len() as u32;
            header.ofs_text = here(&body);
            body.extend_from_slice(&text.data);
            pad4(&mut body);
        }

        if !self.meshes.is_empty() {
            header.num_meshes = self.meshes.len() as u32;
            header.ofs_meshes = here(&body);
            for (mesh, (name, material)) in self.meshes.iter().zip(&mesh_names) {
                for value in [
                    *name,
                    *material,
                    mesh.vertices.start,
                    mesh.vertices.len() as u32,
                    mesh.triangles.start,
                    mesh.triangles.len() as u32,
                ] {
                    body.extend_from_slice(&value.to_le_bytes());
                }
            }
        }

        let arrays = self.vertex_arrays();
        if !arrays.is_empty() {
            header.num_vertex_arrays = arrays.len() as u32;
            header.ofs_vertex_arrays = here(&body);
            let mut data_offset = header.ofs_vertex_arrays as usize + arrays.len() * 20;
            for (kind, format, size, bytes) in &arrays {
                VertexArrayDescriptor {
                    kind: *kind,
                    flags: 0,
                    format: *format as u32,
                    size: *size,
                    offset: data_offset as u32,
                }
                .write(&mut body);
                data_offset += bytes.len();
            }
            for (_, _, _, bytes) in &arrays {
                body.extend_from_slice(bytes);
            }
            pad4(&mut body);
        }

        if !self.triangles.is_empty() {
            header.num_triangles = self.triangles.len() as u32;
            header.ofs_triangles = here(&body);
            for index in self.triangles.iter().flatten() {
                body.extend_from_slice(&index.to_le_bytes());
            }
        }

        if !self.joints.is_empty() {
            header.num_joints = self.joints.len() as u32;
            header.ofs_joints = here(&body);
            for (joint, name) in self.joints.iter().zip(&joint_names) {
                joint.write(*name, &mut body);
            }
        }

        if !self.channels.is_empty() {
            header.num_poses = self.channels.len() as u32;
            header.ofs_poses = here(&body);
            for channel in &self.channels {
                channel.write(&mut body);
            }
        }

        if !self.clips.is_empty() {
            header.num_anims = self.clips.len() as u32;
            header.ofs_anims = here(&body);
            for (clip, name) in self.clips.iter().zip(&clip_names) {
                clip.write(*name, &mut body);
            }
        }

        if num_frames > 0 {
            header.num_frames = num_frames;
            header.num_frame_channels = frames.channels_per_frame() as u32;
            header.ofs_frames = here(&body);
            for delta in frames.data() {
                body.extend_from_slice(&delta.to_le_bytes());
            }
            pad4(&mut body);
        }

        if !self.bounds.is_empty() {
            header.ofs_bounds = here(&body);
            for bounds in &self.bounds {
                bounds.write(&mut body);
            }
        }

        if let Some(comment) = &self.comment {
            header.num_comment = comment.len() as u32 + 1;
            header.ofs_comment = here(&body);
            body.extend_from_slice(comment.as_bytes());
            body.push(0);
        }

        header.filesize = here(&body);
        let mut out = Vec::with_capacity(header.filesize as usize);
        header.write(&mut out);
        out.extend_from_slice(&body);
        debug!("Encoded {} byte IQM file", out.len());
        Ok(out)
    }

    fn vertex_count(&self) -> Result<usize> {
        let lengths = [
            ("position", self.positions.as_ref().map(Vec::len)),
            ("texcoord", self.texcoords.as_ref().map(Vec::len)),
            ("normal", self.normals.as_ref().map(Vec::len)),
            ("tangent", self.tangents.as_ref().map(Vec::len)),
            ("blend index", self.blend_indices.as_ref().map(Vec::len)),
            ("blend weight", self.blend_weights.as_ref().map(Vec::len)),
            ("color", self.colors.as_ref().map(Vec::len)),
        ];
        let mut count = None;
        for (name, len) in lengths {
            let Some(len) = len else { continue };
            match count {
                None => count = Some(len),
                Some(expected) if expected != len => {
                    return Err(IqmError::ParseError(format!(
                        "{name} array has {len} entries, expected {expected}"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(count.unwrap_or(0))
    }

    fn vertex_arrays(&self) -> Vec<(VertexArrayType, VertexFormat, u32, Vec<u8>)> {
        fn floats<const N: usize, T>(items: &[T], parts: impl Fn(&T) -> [f32; N]) -> Vec<u8> {
            items
                .iter()
                .flat_map(|item| parts(item))
                .flat_map(f32::to_le_bytes)
                .collect()
        }
        fn bytes(items: &[[u8; 4]]) -> Vec<u8> {
            items.iter().flatten().copied().collect()
        }

        let mut arrays = Vec::new();
        if let Some(v) = &self.positions {
            arrays.push((VertexArrayType::Position, VertexFormat::Float, 3, floats(v, |p| p.to_array())));
        }
        if let Some(v) = &self.texcoords {
            arrays.push((VertexArrayType::TexCoord, VertexFormat::Float, 2, floats(v, |t| t.to_array())));
        }
        if let Some(v) = &self.normals {
            arrays.push((VertexArrayType::Normal, VertexFormat::Float, 3, floats(v, |n| n.to_array())));
        }
        if let Some(v) = &self.tangents {
            arrays.push((VertexArrayType::Tangent, VertexFormat::Float, 4, floats(v, |t| t.to_array())));
        }
        if let Some(v) = &self.blend_indices {
            arrays.push((VertexArrayType::BlendIndexes, VertexFormat::UByte, 4, bytes(v)));
        }
        if let Some(v) = &self.blend_weights {
            arrays.push((VertexArrayType::BlendWeights, VertexFormat::UByte, 4, bytes(v)));
        }
        if let Some(v) = &self.colors {
            arrays.push((VertexArrayType::Color, VertexFormat::UByte, 4, bytes(v)));
        }
        arrays
    }

    fn num_frames(&self, frames: &FrameTable) -> Result<u32> {
        let count = match self.frame_count {
            Some(count) => {
                if frames.channels_per_frame() > 0 && count != frames.frame_count() {
                    return Err(IqmError::ParseError(format!(
                        "frame count {count} but the delta stream holds {} frames",
                        frames.frame_count()
                    )));
                }
                count
            }
            None if frames.channels_per_frame() == 0 && !self.channels.is_empty() => self
                .clips
                .iter()
                .map(|c| c.first_frame as usize + c.frame_count as usize)
                .max()
                .unwrap_or(0),
            None => frames.frame_count(),
        };
        if count > MAX_FRAMES {
            return Err(IqmError::ResourceLimit {
                what: "frames",
                count,
                max: MAX_FRAMES,
            });
        }
        Ok(count as u32)
    }

    /// Two bones, one triangle, one two-frame clip
    ///
    /// The root holds vertex 0; the child, one unit up the Y axis, holds
    /// vertices 1 and 2 and slides two units along X in frame 1. Sampling
    /// frame 1 moves vertex 1 from (0, 1, 0) to (2, 1, 0) and vertex 2 from
    /// (1, 1, 0) to (3, 1, 0).
    pub fn two_bone_demo() -> Self {
        let child_pose = Pose::new(Vec3::Y, Quat::IDENTITY, Vec3::ONE);
        let root = PoseChannel::constant(-1, &Pose::IDENTITY);
        let mut child = PoseChannel::constant(0, &child_pose);
        child.mask = ChannelMask::TRANSLATE_X;
        child.scale[0] = 1.0;

        let rest = vec![Vec3::ZERO, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        let moved = vec![Vec3::ZERO, Vec3::new(2.0, 1.0, 0.0), Vec3::new(3.0, 1.0, 0.0)];

        Self::new()
            .positions(rest.clone())
            .normals(vec![Vec3::Z; 3])
            .texcoords(vec![Vec2::ZERO, Vec2::Y, Vec2::ONE])
            .blend(
                vec![[0, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]],
                vec![[255, 0, 0, 0]; 3],
            )
            .triangles(vec![[0, 1, 2]])
            .mesh("body", "skin,default", 0..3, 0..1)
            .joint("root", -1, Pose::IDENTITY)
            .joint("child", 0, child_pose)
            .raw_frames(vec![root, child], vec![0, 2])
            .clip("wave", 0, 2, 2.0, true)
            .bounds(vec![
                FrameBounds::from_points(&rest),
                FrameBounds::from_points(&moved),
            ])
            .comment("two-bone demo")
    }
}

#[derive(Debug)]
struct TextBuilder {
    data: Vec<u8>,
}

impl Default for TextBuilder {
    fn default() -> Self {
        // Offset 0 is the empty string
        Self { data: vec![0] }
    }
}

impl TextBuilder {
    fn add(&mut self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(text.as_bytes());
        self.data.push(0);
        offset
    }
}

fn pad4(body: &mut Vec<u8>) {
    while body.len() % 4 != 0 {
        body.push(0);
    }
}

/// Quantize per-frame poses into channel descriptors and a delta stream
///
/// `parents` supplies each channel's parent field; missing entries are -1.
pub fn quantize_frames(frames: &[Vec<Pose>], parents: &[i32]) -> (Vec<PoseChannel>, Vec<u16>) {
    let bone_count = frames.iter().map(Vec::len).min().unwrap_or(0);
    let values: Vec<Vec<[f32; CHANNEL_COUNT]>> = frames
        .iter()
        .map(|frame| frame[..bone_count].iter().map(Pose::to_channels).collect())
        .collect();

    let channels: Vec<PoseChannel> = (0..bone_count)
        .map(|bone| {
            let mut channel = PoseChannel {
                parent: parents.get(bone).copied().unwrap_or(-1),
                mask: ChannelMask::empty(),
                offset: [0.0; CHANNEL_COUNT],
                scale: [0.0; CHANNEL_COUNT],
            };
            for slot in 0..CHANNEL_COUNT {
                let (min, max) = values.iter().map(|frame| frame[bone][slot]).fold(
                    (f32::INFINITY, f32::NEG_INFINITY),
                    |(lo, hi), v| (lo.min(v), hi.max(v)),
                );
                channel.offset[slot] = min;
                if max > min {
                    channel.mask |= ChannelMask::from_bits_truncate(1 << slot);
                    channel.scale[slot] = (max - min) / f32::from(u16::MAX);
                }
            }
            channel
        })
        .collect();

    let mut data = Vec::new();
    for frame in &values {
        for (bone, channel) in channels.iter().enumerate() {
            for slot in 0..CHANNEL_COUNT {
                if channel.mask.has_slot(slot) {
                    let steps = (frame[bone][slot] - channel.offset[slot]) / channel.scale[slot];
                    data.push(steps.round().clamp(0.0, f32::from(u16::MAX)) as u16);
                }
            }
        }
    }
    (channels, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::IQM_MAGIC;

    #[test]
    fn test_empty_file() {
        let data = IqmEncoder::new().encode().unwrap();
        assert_eq!(&data[..16], &IQM_MAGIC);
        let header = IqmHeader::parse(&data).unwrap();
        assert_eq!(header.filesize as usize, data.len());
        assert_eq!(header.num_joints, 0);
    }

    #[test]
    fn test_mismatched_vertex_arrays() {
        let encoder = IqmEncoder::new()
            .positions(vec![Vec3::ZERO; 3])
            .normals(vec![Vec3::Z; 2]);
        assert!(encoder.encode().is_err());
    }

    #[test]
    fn test_channel_count_must_match_joints() {
        let encoder = IqmEncoder::new()
            .joint("root", -1, Pose::IDENTITY)
            .raw_frames(vec![], vec![])
            .frames(&[vec![Pose::IDENTITY, Pose::IDENTITY]]);
        assert!(matches!(
            encoder.encode(),
            Err(IqmError::ChannelCountMismatch { bones: 1, channels: 2 })
        ));
    }

    #[test]
    fn test_quantize_constant_channels() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY, Vec3::ONE);
        let (channels, data) = quantize_frames(&[vec![pose], vec![pose]], &[-1]);
        assert_eq!(channels[0].mask, ChannelMask::empty());
        assert!(data.is_empty());
        assert_eq!(channels[0].base_pose(), pose);
    }

    #[test]
    fn test_still_frames_keep_their_count() {
        let encoder = IqmEncoder::new()
            .joint("root", -1, Pose::IDENTITY)
            .frames(&vec![vec![Pose::IDENTITY]; 3])
            .clip("hold", 0, 3, 10.0, true);
        let data = encoder.encode().unwrap();
        let header = IqmHeader::parse(&data).unwrap();
        assert_eq!(header.num_frames, 3);
        assert_eq!(header.num_frame_channels, 0);
    }

    #[test]
    fn test_constant_raw_frames_count_from_clips() {
        let encoder = IqmEncoder::new()
            .joint("root", -1, Pose::IDENTITY)
            .raw_frames(vec![PoseChannel::constant(-1, &Pose::IDENTITY)], Vec::new())
            .clip("hold", 0, 4, 10.0, true);
        let header = IqmHeader::parse(&encoder.encode().unwrap()).unwrap();
        assert_eq!(header.num_frames, 4);

        let header = IqmHeader::parse(&encoder.frame_count(6).encode().unwrap()).unwrap();
        assert_eq!(header.num_frames, 6);
    }

    #[test]
    fn test_frame_count_must_match_stream() {
        let mut channel = PoseChannel::constant(-1, &Pose::IDENTITY);
        channel.mask = ChannelMask::TRANSLATE_X;
        let err = IqmEncoder::new()
            .joint("root", -1, Pose::IDENTITY)
            .raw_frames(vec![channel], vec![0, 1])
            .frame_count(3)
            .encode()
            .unwrap_err();
        assert!(matches!(err, IqmError::ParseError(_)));
    }

    #[test]
    fn test_quantize_extremes_exact() {
        let a = Pose::new(Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let b = Pose::new(Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let (channels, data) = quantize_frames(&[vec![a], vec![b]], &[]);
        assert_eq!(channels[0].parent, -1);
        assert_eq!(channels[0].mask, ChannelMask::TRANSLATE_X);
        assert_eq!(data, vec![0, u16::MAX]);

        let decoded = channels[0].decode(&mut data[1..].iter().copied()).unwrap();
        assert!((decoded.translate.x - 3.0).abs() < 1e-5);
    }
}
