use log::trace;

use crate::chunks::text::TextPool;
use crate::error::{IqmError, Result};
use crate::reader::ByteView;

/// Size of one animation record
pub const ANIM_RECORD_SIZE: usize = 20;

bitflags::bitflags! {
    /// Animation clip flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
    pub struct AnimFlags: u32 {
        /// The clip is meant to loop
        const LOOP = 0x1;
    }
}

/// A named range of frames in the model's shared frame table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationClip {
    pub name: String,
    pub first_frame: u32,
    pub frame_count: u32,
    /// Frames per second
    pub frame_rate: f32,
    pub flags: AnimFlags,
}

impl AnimationClip {
    pub fn parse(view: &ByteView<'_>, text: &TextPool<'_>, offset: usize) -> Result<Self> {
        let clip = Self {
            name: text.name_at(view.u32_at(offset)?)?,
            first_frame: view.u32_at(offset + 4)?,
            frame_count: view.u32_at(offset + 8)?,
            frame_rate: view.f32_at(offset + 12)?,
            flags: AnimFlags::from_bits_retain(view.u32_at(offset + 16)?),
        };
        trace!(
            "Clip '{}' frames {}+{} at {} fps",
            clip.name, clip.first_frame, clip.frame_count, clip.frame_rate
        );
        Ok(clip)
    }

    pub fn write(&self, name_offset: u32, out: &mut Vec<u8>) {
        out.extend_from_slice(&name_offset.to_le_bytes());
        out.extend_from_slice(&self.first_frame.to_le_bytes());
        out.extend_from_slice(&self.frame_count.to_le_bytes());
        out.extend_from_slice(&self.frame_rate.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
    }

    pub fn is_looping(&self) -> bool {
        self.flags.contains(AnimFlags::LOOP)
    }

    /// Length of the clip in seconds, `None` for a non-positive rate
    pub fn duration(&self) -> Option<f32> {
        (self.frame_rate > 0.0).then(|| self.frame_count as f32 / self.frame_rate)
    }

    /// Absolute frame index for a clip-relative logical frame
    ///
    /// Always wraps: `floor(time)` modulo the frame count, so any finite time
    /// (negative or past the end) samples a valid frame. An empty clip
    /// samples its first frame.
    pub fn frame_at(&self, time: f32) -> u32 {
        if self.frame_count == 0 || !time.is_finite() {
            return self.first_frame;
        }
        let count = i64::from(self.frame_count);
        let frame = (time.floor() as i64).rem_euclid(count);
        self.first_frame + frame as u32
    }

    /// Fail unless the clip's frames lie inside a table of `num_frames`
    pub fn validate(&self, num_frames: u32) -> Result<()> {
        let end = u64::from(self.first_frame) + u64::from(self.frame_count);
        if end > u64::from(num_frames) {
            return Err(IqmError::ParseError(format!(
                "clip '{}' covers frames {}..{} of {}",
                self.name, self.first_frame, end, num_frames
            )));
        }
        Ok(())
    }
}
