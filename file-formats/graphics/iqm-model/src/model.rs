use std::fs;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use log::{debug, info};

use crate::{MAX_BONES, MAX_FRAMES};
use crate::animation::{FrameTable, Pose};
use crate::chunks::animation::ANIM_RECORD_SIZE;
use crate::chunks::bounds::parse_bounds;
use crate::chunks::joint::parse_joints;
use crate::chunks::mesh::{MESH_RECORD_SIZE, parse_triangles};
use crate::chunks::{AnimationClip, FrameBounds, Mesh, TextPool, VertexData};
use crate::error::{IqmError, Result};
use crate::header::IqmHeader;
use crate::material::{NoTextures, TextureLoader, load_material, model_directory};
use crate::reader::ByteView;
use crate::skeleton::Skeleton;

/// A fully loaded IQM model
///
/// Immutable once built; per-instance animation lives in
/// [`AnimationState`](crate::AnimationState).
#[derive(Debug, Clone)]
pub struct IqmModel {
    pub header: IqmHeader,
    /// Directory material names resolve against
    pub directory: PathBuf,
    pub vertices: VertexData,
    pub triangles: Vec<[u32; 3]>,
    pub meshes: Vec<Mesh>,
    pub skeleton: Skeleton,
    pub frames: FrameTable,
    pub clips: Vec<AnimationClip>,
    /// One entry per frame when the file carries bounds
    pub bounds: Vec<FrameBounds>,
    pub comment: Option<String>,
}

impl IqmModel {
    /// Load a model from disk without resolving textures
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, &mut NoTextures)
    }

    /// Load a model from disk, resolving mesh materials through `loader`
    pub fn load_with<P: AsRef<Path>>(path: P, loader: &mut dyn TextureLoader) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let model = Self::from_bytes_with(&data, model_directory(path), loader)?;
        info!(
            "Loaded {}: {} meshes, {} vertices, {} bones, {} clips",
            path.display(),
            model.meshes.len(),
            model.vertices.count,
            model.skeleton.len(),
            model.clips.len()
        );
        Ok(model)
    }

    /// Parse a model held in memory
    pub fn from_bytes(data: &[u8], directory: impl Into<PathBuf>) -> Result<Self> {
        Self::from_bytes_with(data, directory, &mut NoTextures)
    }

    /// Parse a model held in memory, resolving mesh materials through `loader`
    ///
    /// Nothing is returned unless every table parses and validates.
    pub fn from_bytes_with(
        data: &[u8],
        directory: impl Into<PathBuf>,
        loader: &mut dyn TextureLoader,
    ) -> Result<Self> {
        let directory = directory.into();
        let header = IqmHeader::parse(data)?;
        debug!("IQM header: {:?}", header);
        let view = ByteView::new(data);

        if header.num_joints as usize > MAX_BONES {
            return Err(IqmError::ResourceLimit {
                what: "bones",
                count: header.num_joints as usize,
                max: MAX_BONES,
            });
        }
        if header.num_frames as usize > MAX_FRAMES {
            return Err(IqmError::ResourceLimit {
                what: "frames",
                count: header.num_frames as usize,
                max: MAX_FRAMES,
            });
        }
        // Poses describe the same bones as joints; a file with neither
        // poses nor frames is a static model
        let animated = header.num_poses > 0 || header.num_frames > 0;
        if animated && header.num_poses != header.num_joints {
            return Err(IqmError::ChannelCountMismatch {
                bones: header.num_joints,
                channels: header.num_poses,
            });
        }

        let text = TextPool::new(view.table(header.ofs_text, header.num_text, 1)?);

        let vertices = VertexData::parse(
            &view,
            header.ofs_vertex_arrays,
            header.num_vertex_arrays,
            header.num_vertexes,
        )?;
        let triangles = parse_triangles(
            &view,
            header.ofs_triangles,
            header.num_triangles,
            header.num_vertexes,
        )?;

        view.table(header.ofs_meshes, header.num_meshes, MESH_RECORD_SIZE)?;
        let mut meshes = (0..header.num_meshes as usize)
            .map(|i| Mesh::parse(&view, &text, header.ofs_meshes as usize + i * MESH_RECORD_SIZE))
            .collect::<Result<Vec<_>>>()?;
        for mesh in &meshes {
            mesh.validate(header.num_triangles)?;
        }

        let joints = parse_joints(&view, &text, header.ofs_joints, header.num_joints)?;
        let skeleton = Skeleton::from_joints(&joints)?;
        validate_blend_indices(&vertices, skeleton.len())?;

        let frames = if animated {
            FrameTable::parse(&view, &header)?
        } else {
            FrameTable::default()
        };

        view.table(header.ofs_anims, header.num_anims, ANIM_RECORD_SIZE)?;
        let clips = (0..header.num_anims as usize)
            .map(|i| {
                let clip = AnimationClip::parse(
                    &view,
                    &text,
                    header.ofs_anims as usize + i * ANIM_RECORD_SIZE,
                )?;
                clip.validate(header.num_frames)?;
                Ok(clip)
            })
            .collect::<Result<Vec<_>>>()?;

        let bounds = parse_bounds(&view, header.ofs_bounds, header.num_frames)?;

        let comment = if header.num_comment > 0 {
            Some(TextPool::block(view.table(
                header.ofs_comment,
                header.num_comment,
                1,
            )?))
        } else {
            None
        };

        if header.num_extensions > 0 {
            debug!("Ignoring {} extensions", header.num_extensions);
        }

        for mesh in &mut meshes {
            mesh.texture = load_material(loader, &directory, &mesh.material);
        }

        Ok(Self {
            header,
            directory,
            vertices,
            triangles,
            meshes,
            skeleton,
            frames,
            clips,
            bounds,
            comment,
        })
    }

    pub fn find_clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|clip| clip.name == name)
    }

    pub fn is_animated(&self) -> bool {
        self.frames.frame_count() > 0 && !self.clips.is_empty()
    }

    /// Decode one absolute frame of the shared frame table
    pub fn decode_frame(&self, frame: usize, out: &mut [Pose]) -> Result<()> {
        self.frames.decode(frame, out)
    }

    /// Decode every frame of `clip`
    pub fn decode_clip(&self, clip: &AnimationClip) -> Result<Vec<Vec<Pose>>> {
        self.frames.decode_clip(clip)
    }

    /// Bind-pose bone lines, parent joint to child joint
    pub fn bind_segments(&self) -> Vec<(Vec3, Vec3)> {
        self.skeleton.bone_segments(&self.skeleton.bind_matrices())
    }

    /// Bone lines for a live pose given its absolute matrices
    pub fn pose_segments(&self, absolute: &[Mat4]) -> Vec<(Vec3, Vec3)> {
        self.skeleton.bone_segments(absolute)
    }

    /// Condensed description for reports
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            version: self.header.version,
            filesize: self.header.filesize,
            vertex_count: self.vertices.count,
            triangle_count: self.triangles.len(),
            vertex_arrays: self.vertex_array_names(),
            meshes: self
                .meshes
                .iter()
                .map(|mesh| MeshSummary {
                    name: mesh.name.clone(),
                    material: mesh.material.clone(),
                    first_triangle: mesh.first_triangle,
                    triangle_count: mesh.triangle_count,
                })
                .collect(),
            bones: self
                .skeleton
                .bones()
                .iter()
                .map(|bone| BoneSummary {
                    name: bone.name.clone(),
                    parent: bone.parent,
                })
                .collect(),
            clips: self.clips.clone(),
            frame_count: self.frames.frame_count(),
            frame_channels: self.frames.channels_per_frame(),
            comment: self.comment.clone(),
        }
    }

    fn vertex_array_names(&self) -> Vec<String> {
        let v = &self.vertices;
        [
            ("position", v.positions.is_some()),
            ("texcoord", v.texcoords.is_some()),
            ("normal", v.normals.is_some()),
            ("tangent", v.tangents.is_some()),
            ("blend index", v.blend_indices.is_some()),
            ("blend weight", v.blend_weights.is_some()),
            ("color", v.colors.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

/// Every weighted blend index must name a bone of the skeleton
fn validate_blend_indices(vertices: &VertexData, bone_count: usize) -> Result<()> {
    let (Some(indices), Some(weights)) = (&vertices.blend_indices, &vertices.blend_weights) else {
        return Ok(());
    };
    if bone_count == 0 {
        return Ok(());
    }
    for (vertex, (index, weight)) in indices.iter().zip(weights).enumerate() {
        for (&bone, &w) in index.iter().zip(weight) {
            if w > 0 && usize::from(bone) >= bone_count {
                return Err(IqmError::ParseError(format!(
                    "vertex {vertex} is weighted to bone {bone} of {bone_count}"
                )));
            }
        }
    }
    Ok(())
}

/// Mesh entry of a [`ModelSummary`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshSummary {
    pub name: String,
    pub material: String,
    pub first_triangle: u32,
    pub triangle_count: u32,
}

/// Bone entry of a [`ModelSummary`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneSummary {
    pub name: String,
    pub parent: Option<usize>,
}

/// What a model contains, without the bulk data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSummary {
    pub version: u32,
    pub filesize: u32,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub vertex_arrays: Vec<String>,
    pub meshes: Vec<MeshSummary>,
    pub bones: Vec<BoneSummary>,
    pub clips: Vec<AnimationClip>,
    pub frame_count: usize,
    pub frame_channels: usize,
    pub comment: Option<String>,
}
