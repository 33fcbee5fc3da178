//! Per-instance playback state and matrix buffers

use glam::Mat4;

use crate::MAX_BONES;
use crate::animation::pose::Pose;
use crate::animation::retarget::RetargetMap;
use crate::animation::transform::{compute_absolute, compute_local, compute_skinning};
use crate::chunks::AnimationClip;
use crate::error::{IqmError, Result};
use crate::model::IqmModel;
use crate::skeleton::Skeleton;

/// Where an instance is in its playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// A clip is assigned and time is zero
    Bound,
    /// Time advances on every tick
    Playing,
    /// Time is zero and the next evaluation produces the rest pose
    #[default]
    Stopped,
}

/// Animation state owned by one model instance
///
/// Every buffer is private to the instance, so two instances of the same model
/// can sit at different times.
#[derive(Debug, Clone)]
pub struct AnimationState {
    clip: Option<AnimationClip>,
    /// Logical time in frames
    time: f32,
    playback: PlaybackState,
    source_poses: Vec<Pose>,
    poses: Vec<Pose>,
    local: Vec<Mat4>,
    absolute: Vec<Mat4>,
    skin: Vec<Mat4>,
}

impl AnimationState {
    /// Allocate buffers for `bone_count` bones
    pub fn new(bone_count: usize) -> Result<Self> {
        check_bone_count(bone_count)?;
        Ok(Self {
            clip: None,
            time: 0.0,
            playback: PlaybackState::Stopped,
            source_poses: Vec::with_capacity(bone_count),
            poses: vec![Pose::IDENTITY; bone_count],
            local: vec![Mat4::IDENTITY; bone_count],
            absolute: vec![Mat4::IDENTITY; bone_count],
            skin: vec![Mat4::IDENTITY; bone_count],
        })
    }

    pub fn for_model(model: &IqmModel) -> Result<Self> {
        Self::new(model.skeleton.len())
    }

    /// Assign a clip and rewind to its first frame
    pub fn bind(&mut self, clip: AnimationClip) {
        self.clip = Some(clip);
        self.time = 0.0;
        self.playback = PlaybackState::Bound;
    }

    /// Advance time by `delta_seconds` times the clip's frame rate
    ///
    /// A clip without a usable rate advances one frame per second. Does
    /// nothing while stopped.
    pub fn advance(&mut self, delta_seconds: f32) {
        let Some(clip) = &self.clip else {
            return;
        };
        if self.playback == PlaybackState::Stopped {
            return;
        }
        let rate = if clip.frame_rate > 0.0 && clip.frame_rate.is_finite() {
            clip.frame_rate
        } else {
            1.0
        };
        self.time += delta_seconds * rate;
        self.playback = PlaybackState::Playing;
    }

    /// Jump to a logical frame time
    pub fn set_time(&mut self, time: f32) {
        if self.clip.is_some() {
            self.time = time;
            self.playback = PlaybackState::Playing;
        }
    }

    /// Rewind and fall back to the rest pose
    pub fn stop(&mut self) {
        self.time = 0.0;
        self.playback = PlaybackState::Stopped;
    }

    /// Resume a stopped clip from time zero
    pub fn restart(&mut self) {
        if self.clip.is_some() {
            self.time = 0.0;
            self.playback = PlaybackState::Bound;
        }
    }

    pub fn clip(&self) -> Option<&AnimationClip> {
        self.clip.as_ref()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// Absolute frame index the next evaluation samples, `None` when stopped
    pub fn sampled_frame(&self) -> Option<u32> {
        match self.playback {
            PlaybackState::Stopped => None,
            PlaybackState::Bound | PlaybackState::Playing => {
                self.clip.as_ref().map(|clip| clip.frame_at(self.time))
            }
        }
    }

    pub fn bone_count(&self) -> usize {
        self.poses.len()
    }

    /// Local poses from the last evaluation
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn local_matrices(&self) -> &[Mat4] {
        &self.local
    }

    /// Model-space bone matrices from the last evaluation
    pub fn absolute_matrices(&self) -> &[Mat4] {
        &self.absolute
    }

    /// Skinning matrices from the last evaluation
    pub fn skin_matrices(&self) -> &[Mat4] {
        &self.skin
    }

    /// Evaluate using the model's own frames
    pub fn evaluate(&mut self, model: &IqmModel) -> Result<()> {
        self.evaluate_with(&model.skeleton, Some(model), None)
    }

    /// Evaluate `skeleton` driven by a clip from another model
    pub fn evaluate_retargeted(
        &mut self,
        skeleton: &Skeleton,
        source: &IqmModel,
        map: &RetargetMap,
    ) -> Result<()> {
        self.evaluate_with(skeleton, Some(source), Some(map))
    }

    /// Evaluate the rest pose of `skeleton`
    pub fn evaluate_rest(&mut self, skeleton: &Skeleton) -> Result<()> {
        self.evaluate_with(skeleton, None, None)
    }

    fn evaluate_with(
        &mut self,
        skeleton: &Skeleton,
        source: Option<&IqmModel>,
        map: Option<&RetargetMap>,
    ) -> Result<()> {
        if skeleton.len() != self.poses.len() {
            return Err(IqmError::ReferenceError(format!(
                "animation state sized for {} bones used with a {} bone skeleton",
                self.poses.len(),
                skeleton.len()
            )));
        }

        let frame = self.sampled_frame();
        match (frame, source) {
            (Some(frame), Some(source)) if source.frames.frame_count() > 0 => {
                let source_bones = source.frames.bone_count();
                check_bone_count(source_bones)?;
                self.source_poses.clear();
                self.source_poses.resize(source_bones, Pose::IDENTITY);
                source.frames.decode(frame as usize, &mut self.source_poses)?;

                for (i, (pose, bone)) in self.poses.iter_mut().zip(skeleton.bones()).enumerate() {
                    let mapped = match map {
                        Some(map) => map.get(i),
                        None => Some(i),
                    };
                    *pose = mapped
                        .and_then(|s| self.source_poses.get(s))
                        .copied()
                        .unwrap_or(bone.bind_pose);
                }
            }
            _ => {
                for (pose, bone) in self.poses.iter_mut().zip(skeleton.bones()) {
                    *pose = bone.bind_pose;
                }
            }
        }

        compute_local(&self.poses, &mut self.local)?;
        compute_absolute(&self.local, &skeleton.parents(), &mut self.absolute)?;
        compute_skinning(&self.absolute, skeleton, &mut self.skin)
    }
}

fn check_bone_count(count: usize) -> Result<()> {
    if count > MAX_BONES {
        return Err(IqmError::ResourceLimit {
            what: "bones",
            count,
            max: MAX_BONES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::AnimFlags;
    use test_case::test_case;

    fn clip(frame_count: u32, frame_rate: f32) -> AnimationClip {
        AnimationClip {
            name: "idle".to_string(),
            first_frame: 0,
            frame_count,
            frame_rate,
            flags: AnimFlags::LOOP,
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut state = AnimationState::new(2).unwrap();
        assert_eq!(state.playback(), PlaybackState::Stopped);
        assert_eq!(state.sampled_frame(), None);

        state.bind(clip(10, 10.0));
        assert_eq!(state.playback(), PlaybackState::Bound);
        assert_eq!(state.sampled_frame(), Some(0));

        state.advance(0.35);
        assert_eq!(state.playback(), PlaybackState::Playing);
        assert_eq!(state.sampled_frame(), Some(3));

        state.stop();
        assert_eq!(state.time(), 0.0);
        assert_eq!(state.sampled_frame(), None);
        state.advance(1.0);
        assert_eq!(state.time(), 0.0);

        state.restart();
        assert_eq!(state.playback(), PlaybackState::Bound);
    }

    #[test_case(10.0, 0 ; "time equal to count")]
    #[test_case(-1.0, 9 ; "negative time")]
    #[test_case(23.0, 3 ; "past two loops")]
    fn test_wraparound(time: f32, frame: u32) {
        let mut state = AnimationState::new(0).unwrap();
        state.bind(clip(10, 30.0));
        state.set_time(time);
        assert_eq!(state.sampled_frame(), Some(frame));
    }

    #[test]
    fn test_zero_rate_advances_one_frame_per_second() {
        let mut state = AnimationState::new(0).unwrap();
        state.bind(clip(4, 0.0));
        state.advance(2.0);
        assert_eq!(state.time(), 2.0);
    }

    #[test]
    fn test_bone_limit() {
        assert!(AnimationState::new(MAX_BONES).is_ok());
        assert!(matches!(
            AnimationState::new(MAX_BONES + 1),
            Err(IqmError::ResourceLimit { .. })
        ));
    }

    #[test]
    fn test_skeleton_size_mismatch() {
        let mut state = AnimationState::new(3).unwrap();
        assert!(state.evaluate_rest(&Skeleton::empty()).is_err());
    }
}
