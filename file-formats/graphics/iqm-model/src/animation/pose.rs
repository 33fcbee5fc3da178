//! Local bone poses and the delta-compressed channel codec
//!
//! Every bone has ten animated channels stored in this fixed order:
//!
//! | slot | 0  | 1  | 2  | 3  | 4  | 5  | 6  | 7  | 8  | 9  |
//! |------|----|----|----|----|----|----|----|----|----|----|
//! | pose | Tx | Ty | Tz | Rx | Ry | Rz | Rw | Sx | Sy | Sz |
//!
//! A frame stores one `u16` per channel whose mask bit is set; the value is
//! `offset[slot] + delta * scale[slot]`. Channels without a mask bit hold their
//! offset for the whole animation.

use glam::{Mat4, Quat, Vec3};

use crate::error::{IqmError, Result};
use crate::reader::ByteView;

/// Number of animated channels per bone
pub const CHANNEL_COUNT: usize = 10;

/// Size of one pose channel descriptor record
pub const POSE_CHANNEL_RECORD_SIZE: usize = 88;

bitflags::bitflags! {
    /// Which of a bone's ten channels carry a per-frame delta
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelMask: u32 {
        const TRANSLATE_X = 0x001;
        const TRANSLATE_Y = 0x002;
        const TRANSLATE_Z = 0x004;
        const ROTATE_X = 0x008;
        const ROTATE_Y = 0x010;
        const ROTATE_Z = 0x020;
        const ROTATE_W = 0x040;
        const SCALE_X = 0x080;
        const SCALE_Y = 0x100;
        const SCALE_Z = 0x200;
    }
}

impl ChannelMask {
    /// Whether channel `slot` is stored per frame
    pub fn has_slot(self, slot: usize) -> bool {
        slot < CHANNEL_COUNT && self.bits() & (1 << slot) != 0
    }

    /// Number of `u16` deltas this bone contributes to every frame
    pub fn stored_count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

/// One bone's local transform
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub translate: Vec3,
    /// Unit quaternion
    pub rotate: Quat,
    pub scale: Vec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translate: Vec3::ZERO,
        rotate: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translate: Vec3, rotate: Quat, scale: Vec3) -> Self {
        Self {
            translate,
            rotate,
            scale,
        }
    }

    /// Build a pose from channel values in storage order, renormalizing the rotation
    pub fn from_channels(values: &[f32; CHANNEL_COUNT]) -> Self {
        Self {
            translate: Vec3::new(values[0], values[1], values[2]),
            rotate: normalize_quat(Quat::from_xyzw(values[3], values[4], values[5], values[6])),
            scale: Vec3::new(values[7], values[8], values[9]),
        }
    }

    /// Channel values in storage order
    pub fn to_channels(&self) -> [f32; CHANNEL_COUNT] {
        let t = self.translate;
        let r = self.rotate;
        let s = self.scale;
        [t.x, t.y, t.z, r.x, r.y, r.z, r.w, s.x, s.y, s.z]
    }

    /// Local matrix: scale, then rotate, then translate
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotate, self.translate)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalize a quaternion, falling back to identity for a zero-length input
pub fn normalize_quat(q: Quat) -> Quat {
    let length = q.length();
    if length > 0.0 && length.is_finite() {
        q / length
    } else {
        Quat::IDENTITY
    }
}

/// Per-bone channel descriptor: {parent, mask, offsets, scales}
#[derive(Debug, Clone, PartialEq)]
pub struct PoseChannel {
    /// Parent index recorded with the pose (mirrors the joint's parent)
    pub parent: i32,
    pub mask: ChannelMask,
    pub offset: [f32; CHANNEL_COUNT],
    pub scale: [f32; CHANNEL_COUNT],
}

impl PoseChannel {
    /// A channel that holds `pose` for every frame
    pub fn constant(parent: i32, pose: &Pose) -> Self {
        Self {
            parent,
            mask: ChannelMask::empty(),
            offset: pose.to_channels(),
            scale: [0.0; CHANNEL_COUNT],
        }
    }

    pub fn parse(view: &ByteView<'_>, offset: usize) -> Result<Self> {
        Ok(Self {
            parent: view.i32_at(offset)?,
            // Only the low ten bits name channels
            mask: ChannelMask::from_bits_truncate(view.u32_at(offset + 4)?),
            offset: view.f32_array::<CHANNEL_COUNT>(offset + 8)?,
            scale: view.f32_array::<CHANNEL_COUNT>(offset + 8 + CHANNEL_COUNT * 4)?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.parent.to_le_bytes());
        out.extend_from_slice(&self.mask.bits().to_le_bytes());
        for value in self.offset.iter().chain(self.scale.iter()) {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Pose held by channels that carry no delta
    pub fn base_pose(&self) -> Pose {
        Pose::from_channels(&self.offset)
    }

    /// Decode this bone's pose, consuming one delta per set mask bit
    pub fn decode<I: Iterator<Item = u16>>(&self, deltas: &mut I) -> Result<Pose> {
        let mut values = self.offset;
        for (slot, value) in values.iter_mut().enumerate() {
            if self.mask.has_slot(slot) {
                let delta = deltas.next().ok_or_else(|| {
                    IqmError::ParseError("frame stream ended inside a pose".to_string())
                })?;
                *value += f32::from(delta) * self.scale[slot];
            }
        }
        Ok(Pose::from_channels(&values))
    }
}

/// Decode one frame's poses from its slice of the delta stream
///
/// `frame_data` must hold exactly the deltas of one frame, bones in order.
pub fn decode_frame(channels: &[PoseChannel], frame_data: &[u16], out: &mut [Pose]) -> Result<()> {
    if out.len() < channels.len() {
        return Err(IqmError::ParseError(format!(
            "pose buffer holds {} bones, frame has {}",
            out.len(),
            channels.len()
        )));
    }
    let mut deltas = frame_data.iter().copied();
    for (channel, pose) in channels.iter().zip(out.iter_mut()) {
        *pose = channel.decode(&mut deltas)?;
    }
    if deltas.next().is_some() {
        return Err(IqmError::ParseError(
            "frame stream has deltas left over after the last bone".to_string(),
        ));
    }
    Ok(())
}
