//! Driving one skeleton with a clip authored for another

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use iqm_model::animation::{Pose, RetargetMap};
use iqm_model::{AnimationState, IqmEncoder, IqmModel, Scene, Transform};

fn pose(x: f32, y: f32) -> Pose {
    Pose::new(Vec3::new(x, y, 0.0), Quat::IDENTITY, Vec3::ONE)
}

fn origin(matrix: &Mat4) -> Vec3 {
    matrix.transform_point3(Vec3::ZERO)
}

/// root -> spine -> {cape, head}
fn character() -> IqmModel {
    let data = IqmEncoder::new()
        .joint("root", -1, Pose::IDENTITY)
        .joint("spine", 0, pose(0.0, 1.0))
        .joint("cape", 1, pose(0.0, -0.5))
        .joint("head", 1, pose(0.0, 1.0))
        .encode()
        .unwrap();
    IqmModel::from_bytes(&data, ".").unwrap()
}

/// Animation-only file without a cape; the head slides along X in frame 1
fn moves() -> IqmModel {
    let rest = vec![Pose::IDENTITY, pose(0.0, 1.0), pose(0.0, 1.0)];
    let nod = vec![Pose::IDENTITY, pose(0.0, 1.0), pose(0.5, 1.0)];
    let data = IqmEncoder::new()
        .joint("root", -1, Pose::IDENTITY)
        .joint("spine", 0, pose(0.0, 1.0))
        .joint("head", 1, pose(0.0, 1.0))
        .frames(&[rest, nod])
        .clip("nod", 0, 2, 4.0, true)
        .encode()
        .unwrap();
    IqmModel::from_bytes(&data, ".").unwrap()
}

#[test]
fn test_partial_map() {
    let character = character();
    let moves = moves();
    let map = RetargetMap::build(&character.skeleton, &moves.skeleton);
    assert_eq!(map.entries(), &[Some(0), Some(1), None, Some(2)]);
    assert_eq!(map.mapped_count(), 3);

    // Same inputs, same map; a skeleton against itself is the identity
    assert_eq!(map, RetargetMap::build(&character.skeleton, &moves.skeleton));
    assert!(RetargetMap::build(&character.skeleton, &character.skeleton).is_identity());
}

#[test]
fn test_unmapped_bone_keeps_rest_pose() {
    let character = character();
    let moves = moves();
    let map = RetargetMap::build(&character.skeleton, &moves.skeleton);

    let mut state = AnimationState::for_model(&character).unwrap();
    state.bind(moves.find_clip("nod").unwrap().clone());
    state.set_time(1.0);
    state
        .evaluate_retargeted(&character.skeleton, &moves, &map)
        .unwrap();

    let absolute = state.absolute_matrices();
    let head = origin(&absolute[3]);
    assert!((head - Vec3::new(0.5, 2.0, 0.0)).length() < 1e-4);
    assert_eq!(origin(&absolute[2]), Vec3::new(0.0, 0.5, 0.0));
    assert_eq!(state.poses()[2], character.skeleton.bones()[2].bind_pose);
}

#[test]
fn test_scene_caches_maps_per_skeleton_pair() {
    let character = Arc::new(character());
    let moves = Arc::new(moves());

    let mut scene = Scene::new();
    let first = scene
        .add_armature(character.clone(), Transform::IDENTITY)
        .unwrap();
    let second = scene
        .add_armature(character.clone(), Transform::from_translation(Vec3::X))
        .unwrap();
    scene.play_anim(first, moves.clone(), "nod").unwrap();
    scene.play_anim(second, moves.clone(), "nod").unwrap();
    assert_eq!(scene.retarget_cache().len(), 1);

    // 4 fps: a quarter second reaches frame 1
    scene.update(0.25).unwrap();
    let state = scene.armature_state(first).unwrap();
    assert_eq!(state.sampled_frame(), Some(1));
    let head = origin(&state.absolute_matrices()[3]);
    assert!((head - Vec3::new(0.5, 2.0, 0.0)).length() < 1e-4);

    scene.stop_anim(first).unwrap();
    scene.update(0.25).unwrap();
    let state = scene.armature_state(first).unwrap();
    assert_eq!(origin(&state.absolute_matrices()[3]), Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(
        origin(&scene.armature_world(second).unwrap()),
        Vec3::X
    );

    scene.clear_retarget_cache();
    assert!(scene.retarget_cache().is_empty());
}
