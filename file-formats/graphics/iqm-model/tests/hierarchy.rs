//! Randomized checks of the single-pass hierarchy sweep

use glam::{Mat4, Quat, Vec3};
use iqm_model::Skeleton;
use iqm_model::animation::{Pose, compute_absolute, compute_local};
use iqm_model::chunks::JointRecord;
use proptest::prelude::*;

type BoneSeed = (f32, [f32; 3], [f32; 3], f32, [f32; 3]);

fn bone_seed() -> impl Strategy<Value = BoneSeed> {
    (
        0.0f32..1.0,
        prop::array::uniform3(-1.0f32..1.0),
        prop::array::uniform3(-1.0f32..1.0),
        -3.0f32..3.0,
        prop::array::uniform3(0.9f32..1.1),
    )
}

/// The first five bones form a chain so every skeleton is at least five deep
fn skeleton_from(seeds: &[BoneSeed]) -> Skeleton {
    let joints: Vec<JointRecord> = seeds
        .iter()
        .enumerate()
        .map(|(i, (pick, t, axis, angle, s))| {
            let parent = match i {
                0 => -1,
                1..=4 => i as i32 - 1,
                _ => (pick * i as f32) as i32,
            };
            let axis = Vec3::from_array(*axis).try_normalize().unwrap_or(Vec3::X);
            JointRecord {
                name: format!("bone{i}"),
                parent,
                pose: Pose::new(
                    Vec3::from_array(*t),
                    Quat::from_axis_angle(axis, *angle),
                    Vec3::from_array(*s),
                ),
            }
        })
        .collect();
    Skeleton::from_joints(&joints).unwrap()
}

fn recursive_absolute(skeleton: &Skeleton, local: &[Mat4], bone: usize) -> Mat4 {
    match skeleton.bones()[bone].parent {
        Some(parent) => recursive_absolute(skeleton, local, parent) * local[bone],
        None => local[bone],
    }
}

proptest! {
    #[test]
    fn sweep_matches_recursive_composition(seeds in prop::collection::vec(bone_seed(), 5..16)) {
        let skeleton = skeleton_from(&seeds);
        for (i, bone) in skeleton.bones().iter().enumerate() {
            prop_assert!(bone.parent.is_none_or(|p| p < i));
        }

        let poses: Vec<Pose> = skeleton.bones().iter().map(|b| b.bind_pose).collect();
        let mut local = vec![Mat4::IDENTITY; poses.len()];
        let mut absolute = vec![Mat4::IDENTITY; poses.len()];
        compute_local(&poses, &mut local).unwrap();
        compute_absolute(&local, &skeleton.parents(), &mut absolute).unwrap();

        for (i, matrix) in absolute.iter().enumerate() {
            let expected = recursive_absolute(&skeleton, &local, i);
            prop_assert!(matrix.abs_diff_eq(expected, 1e-4));
        }
    }

    #[test]
    fn bind_times_inverse_is_identity(seeds in prop::collection::vec(bone_seed(), 5..16)) {
        let skeleton = skeleton_from(&seeds);
        for bone in skeleton.bones() {
            let product = bone.bind_matrix * bone.inverse_bind_matrix;
            prop_assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        }
    }
}
