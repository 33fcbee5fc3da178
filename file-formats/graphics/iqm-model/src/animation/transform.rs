//! Local pose to model space to skinning matrices
//!
//! Parents always precede their children, so one left-to-right sweep over the
//! bone array composes the whole hierarchy.

use glam::Mat4;

use crate::animation::pose::Pose;
use crate::error::{IqmError, Result};
use crate::skeleton::Skeleton;

fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(IqmError::ParseError(format!(
            "{what} holds {actual} bones, expected {expected}"
        )))
    }
}

/// Compose each pose into its local matrix
pub fn compute_local(poses: &[Pose], out: &mut [Mat4]) -> Result<()> {
    check_len("local matrix buffer", out.len(), poses.len())?;
    for (pose, matrix) in poses.iter().zip(out.iter_mut()) {
        *matrix = pose.to_matrix();
    }
    Ok(())
}

/// `abs[i] = abs[parent[i]] * local[i]`, or `local[i]` for a root
pub fn compute_absolute(local: &[Mat4], parents: &[Option<usize>], out: &mut [Mat4]) -> Result<()> {
    check_len("parent list", parents.len(), local.len())?;
    check_len("absolute matrix buffer", out.len(), local.len())?;
    for (i, parent) in parents.iter().enumerate() {
        out[i] = match *parent {
            Some(p) if p < i => out[p] * local[i],
            Some(p) => {
                return Err(IqmError::InvalidHierarchy {
                    bone: i,
                    parent: p as i32,
                });
            }
            None => local[i],
        };
    }
    Ok(())
}

/// `skin[i] = abs[i] * inverse_bind[i]`
pub fn compute_skinning(absolute: &[Mat4], skeleton: &Skeleton, out: &mut [Mat4]) -> Result<()> {
    check_len("absolute matrices", absolute.len(), skeleton.len())?;
    check_len("skin matrix buffer", out.len(), skeleton.len())?;
    for ((abs, bone), skin) in absolute.iter().zip(skeleton.bones()).zip(out.iter_mut()) {
        *skin = *abs * bone.inverse_bind_matrix;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::JointRecord;
    use glam::{Quat, Vec3};

    #[test]
    fn test_chain_accumulates() {
        let step = Mat4::from_translation(Vec3::X);
        let local = [step; 4];
        let parents = [None, Some(0), Some(1), Some(2)];
        let mut out = [Mat4::IDENTITY; 4];
        compute_absolute(&local, &parents, &mut out).unwrap();
        assert_eq!(out[3].transform_point3(Vec3::ZERO), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_forward_parent_rejected() {
        let local = [Mat4::IDENTITY; 2];
        let mut out = [Mat4::IDENTITY; 2];
        assert!(compute_absolute(&local, &[Some(1), None], &mut out).is_err());
        assert!(compute_absolute(&local, &[None], &mut out).is_err());
    }

    #[test]
    fn test_bind_pose_skins_to_identity() {
        let joints = [
            JointRecord {
                name: "root".into(),
                parent: -1,
                pose: Pose::new(Vec3::Y, Quat::from_rotation_x(0.3), Vec3::splat(1.5)),
            },
            JointRecord {
                name: "tip".into(),
                parent: 0,
                pose: Pose::new(Vec3::X, Quat::from_rotation_y(-0.7), Vec3::ONE),
            },
        ];
        let skeleton = Skeleton::from_joints(&joints).unwrap();
        let poses: Vec<Pose> = skeleton.bones().iter().map(|b| b.bind_pose).collect();

        let mut local = [Mat4::IDENTITY; 2];
        let mut absolute = [Mat4::IDENTITY; 2];
        let mut skin = [Mat4::ZERO; 2];
        compute_local(&poses, &mut local).unwrap();
        compute_absolute(&local, &skeleton.parents(), &mut absolute).unwrap();
        compute_skinning(&absolute, &skeleton, &mut skin).unwrap();

        for matrix in skin {
            assert!(matrix.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }
    }
}
