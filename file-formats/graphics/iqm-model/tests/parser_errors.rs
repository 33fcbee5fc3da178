//! Malformed files must fail with a typed error and never yield a model

mod common;

use glam::{Quat, Vec3};
use iqm_model::animation::Pose;
use iqm_model::header::IqmHeader;
use iqm_model::{IqmEncoder, IqmError, IqmModel, MAX_FRAMES};

use common::init_logging;

/// Byte offset of header field `index` (0 is the version)
fn field_offset(index: usize) -> usize {
    16 + index * 4
}

fn patch_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn demo() -> Vec<u8> {
    IqmEncoder::two_bone_demo().encode().unwrap()
}

fn load(data: &[u8]) -> Result<IqmModel, IqmError> {
    init_logging();
    IqmModel::from_bytes(data, ".")
}

#[test]
fn test_demo_loads() {
    assert!(load(&demo()).is_ok());
}

#[test]
fn test_bad_magic() {
    let mut data = demo();
    data[..4].copy_from_slice(b"JUNK");
    let err = load(&data).unwrap_err();
    assert!(matches!(err, IqmError::InvalidMagic { .. }));
    assert!(err.is_format_error());
}

#[test]
fn test_wrong_version() {
    let mut data = demo();
    patch_u32(&mut data, field_offset(0), 1);
    assert!(matches!(load(&data), Err(IqmError::UnsupportedVersion(1))));
}

#[test]
fn test_truncated_file() {
    let mut data = demo();
    data.truncate(data.len() - 8);
    assert!(matches!(load(&data), Err(IqmError::ParseError(_))));
}

#[test]
fn test_pose_count_must_match_joint_count() {
    let mut data = demo();
    patch_u32(&mut data, field_offset(15), 1);
    assert!(matches!(
        load(&data),
        Err(IqmError::ChannelCountMismatch {
            bones: 2,
            channels: 1
        })
    ));
}

#[test]
fn test_frame_channel_count_must_match_masks() {
    let mut data = demo();
    patch_u32(&mut data, field_offset(20), 5);
    assert!(matches!(load(&data), Err(IqmError::ParseError(_))));
}

#[test]
fn test_position_array_must_be_float3() {
    let mut data = demo();
    let header = IqmHeader::parse(&data).unwrap();
    // The first descriptor is the position array; its size field is at +12
    patch_u32(&mut data, header.ofs_vertex_arrays as usize + 12, 4);
    assert!(matches!(
        load(&data),
        Err(IqmError::InvalidVertexArray {
            kind: "position",
            size: 4,
            ..
        })
    ));
}

#[test]
fn test_bone_limit_enforced() {
    let mut data = demo();
    patch_u32(&mut data, field_offset(13), 300);
    assert!(matches!(
        load(&data),
        Err(IqmError::ResourceLimit {
            what: "bones",
            count: 300,
            ..
        })
    ));
}

#[test]
fn test_forward_parent_rejected() {
    let data = IqmEncoder::new()
        .joint("a", 1, Default::default())
        .joint("b", -1, Default::default())
        .encode()
        .unwrap();
    assert!(matches!(
        load(&data),
        Err(IqmError::InvalidHierarchy { bone: 0, parent: 1 })
    ));
}

#[test]
fn test_clip_past_frame_table() {
    let data = IqmEncoder::two_bone_demo()
        .clip("overrun", 1, 5, 10.0, false)
        .encode()
        .unwrap();
    assert!(matches!(load(&data), Err(IqmError::ParseError(_))));
}

#[test]
fn test_blend_index_past_skeleton() {
    let data = IqmEncoder::two_bone_demo()
        .blend(
            vec![[0, 0, 0, 0], [1, 0, 0, 0], [7, 0, 0, 0]],
            vec![[255, 0, 0, 0]; 3],
        )
        .encode()
        .unwrap();
    assert!(matches!(load(&data), Err(IqmError::ParseError(_))));
}

#[test]
fn test_static_model_without_poses() {
    let data = IqmEncoder::new()
        .joint("root", -1, Default::default())
        .encode()
        .unwrap();
    let model = load(&data).unwrap();
    assert_eq!(model.skeleton.len(), 1);
    assert!(!model.is_animated());
}

#[test]
fn test_frame_limit_enforced() {
    let mut data = IqmEncoder::new()
        .joint("root", -1, Pose::IDENTITY)
        .encode()
        .unwrap();
    patch_u32(&mut data, field_offset(19), u32::MAX);
    assert!(matches!(
        load(&data),
        Err(IqmError::ResourceLimit {
            what: "frames",
            max: MAX_FRAMES,
            ..
        })
    ));
}

#[test]
fn test_singular_bind_pose_rejected() {
    let flat = Pose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(1.0, 0.0, 1.0));
    let data = IqmEncoder::new()
        .joint("root", -1, Pose::IDENTITY)
        .joint("flat", 0, flat)
        .encode()
        .unwrap();
    assert!(matches!(
        load(&data),
        Err(IqmError::SingularBindMatrix { bone: 1, .. })
    ));
}

#[test]
fn test_bind_rotation_normalized_on_load() {
    let doubled = Pose::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 2.0), Vec3::ONE);
    let data = IqmEncoder::new()
        .joint("root", -1, doubled)
        .encode()
        .unwrap();
    let model = load(&data).unwrap();
    let bone = &model.skeleton.bones()[0];
    assert!((bone.bind_pose.rotate.length() - 1.0).abs() < 1e-6);
    let x = bone.bind_matrix.transform_vector3(Vec3::X);
    assert!((x.length() - 1.0).abs() < 1e-6);
}
