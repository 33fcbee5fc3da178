//! Bone hierarchy with baked bind and inverse-bind matrices

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};
use log::debug;

use crate::MAX_BONES;
use crate::animation::pose::Pose;
use crate::chunks::JointRecord;
use crate::error::{IqmError, Result};

static NEXT_SKELETON_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded skeleton, used to key retarget maps
///
/// Clones of a skeleton share its id; the bone names are identical so any map
/// built against one is valid for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkeletonId(u64);

impl SkeletonId {
    fn next() -> Self {
        Self(NEXT_SKELETON_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// One bone of a skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    /// Parent bone, always at a lower index
    pub parent: Option<usize>,
    /// Bind-local transform
    pub bind_pose: Pose,
    /// Model-space bind transform (parent bind matrix times local)
    pub bind_matrix: Mat4,
    pub inverse_bind_matrix: Mat4,
}

/// An ordered bone array where every parent precedes its children
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    id: SkeletonId,
    bones: Vec<Bone>,
}

impl Skeleton {
    /// A skeleton with no bones
    pub fn empty() -> Self {
        Self {
            id: SkeletonId::next(),
            bones: Vec::new(),
        }
    }

    /// Build the skeleton and bake bind matrices in one forward pass
    pub fn from_joints(joints: &[JointRecord]) -> Result<Self> {
        if joints.len() > MAX_BONES {
            return Err(IqmError::ResourceLimit {
                what: "bones",
                count: joints.len(),
                max: MAX_BONES,
            });
        }

        let mut bones: Vec<Bone> = Vec::with_capacity(joints.len());
        for (index, joint) in joints.iter().enumerate() {
            let parent = match joint.parent {
                p if p < 0 => None,
                p if (p as usize) < index => Some(p as usize),
                p => {
                    return Err(IqmError::InvalidHierarchy {
                        bone: index,
                        parent: p,
                    });
                }
            };

            let local = joint.pose.to_matrix();
            let bind_matrix = match parent {
                Some(p) => bones[p].bind_matrix * local,
                None => local,
            };
            let inverse_bind_matrix = invert_bind(index, &joint.name, &bind_matrix)?;

            bones.push(Bone {
                name: joint.name.clone(),
                parent,
                bind_pose: joint.pose,
                bind_matrix,
                inverse_bind_matrix,
            });
        }

        debug!("Skeleton with {} bones", bones.len());
        Ok(Self {
            id: SkeletonId::next(),
            bones,
        })
    }

    pub fn id(&self) -> SkeletonId {
        self.id
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Index of the first bone called `name`
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn parents(&self) -> Vec<Option<usize>> {
        self.bones.iter().map(|bone| bone.parent).collect()
    }

    /// Indices of the bones whose parent is `index`
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, bone)| bone.parent == Some(index))
            .map(|(i, _)| i)
    }

    /// Line segments from each parent joint to its child joint
    ///
    /// `absolute` holds one model-space matrix per bone: the live pose, or
    /// the bind matrices for the rest pose.
    pub fn bone_segments(&self, absolute: &[Mat4]) -> Vec<(Vec3, Vec3)> {
        self.bones
            .iter()
            .zip(absolute)
            .filter_map(|(bone, matrix)| {
                let parent = absolute.get(bone.parent?)?;
                Some((parent.w_axis.truncate(), matrix.w_axis.truncate()))
            })
            .collect()
    }

    pub fn bind_matrices(&self) -> Vec<Mat4> {
        self.bones.iter().map(|bone| bone.bind_matrix).collect()
    }
}

fn invert_bind(index: usize, name: &str, bind: &Mat4) -> Result<Mat4> {
    let singular = || IqmError::SingularBindMatrix {
        bone: index,
        name: name.to_string(),
    };
    let det = bind.determinant();
    if det == 0.0 || !det.is_finite() {
        return Err(singular());
    }
    let inverse = bind.inverse();
    if !inverse.is_finite() {
        return Err(singular());
    }
    Ok(inverse)
}
