//! The model's shared table of delta-compressed frames

use log::debug;

use crate::animation::pose::{POSE_CHANNEL_RECORD_SIZE, Pose, PoseChannel, decode_frame};
use crate::chunks::AnimationClip;
use crate::error::{IqmError, Result};
use crate::header::IqmHeader;
use crate::reader::ByteView;

/// Pose channel descriptors plus every frame's packed deltas
///
/// Frame `i` occupies `data[i * channels_per_frame..(i + 1) * channels_per_frame]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    channels: Vec<PoseChannel>,
    channels_per_frame: usize,
    frame_count: usize,
    data: Vec<u16>,
}

impl FrameTable {
    /// Build a table from decoded parts, checking that `data` holds whole frames
    pub fn new(channels: Vec<PoseChannel>, data: Vec<u16>) -> Result<Self> {
        let channels_per_frame: usize = channels.iter().map(|c| c.mask.stored_count()).sum();
        let frame_count = match channels_per_frame {
            0 => 0,
            n if data.len() % n == 0 => data.len() / n,
            n => {
                return Err(IqmError::ParseError(format!(
                    "{} deltas do not divide into frames of {}",
                    data.len(),
                    n
                )));
            }
        };
        Ok(Self {
            channels,
            channels_per_frame,
            frame_count,
            data,
        })
    }

    /// Read the pose channels and frame stream described by `header`
    pub fn parse(view: &ByteView<'_>, header: &IqmHeader) -> Result<Self> {
        view.table(header.ofs_poses, header.num_poses, POSE_CHANNEL_RECORD_SIZE)?;
        let channels = (0..header.num_poses as usize)
            .map(|i| {
                PoseChannel::parse(view, header.ofs_poses as usize + i * POSE_CHANNEL_RECORD_SIZE)
            })
            .collect::<Result<Vec<_>>>()?;

        let channels_per_frame: usize = channels.iter().map(|c| c.mask.stored_count()).sum();
        if channels_per_frame != header.num_frame_channels as usize {
            return Err(IqmError::ParseError(format!(
                "pose masks select {} channels but the header declares {}",
                channels_per_frame, header.num_frame_channels
            )));
        }

        let frame_count = header.num_frames as usize;
        let total = frame_count
            .checked_mul(channels_per_frame)
            .ok_or(IqmError::ResourceLimit {
                what: "frame channels",
                count: frame_count,
                max: usize::MAX / channels_per_frame.max(1),
            })?;
        let block = view.slice(header.ofs_frames as usize, total.saturating_mul(2))?;
        let data = block
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        debug!(
            "Frame table: {} poses, {} frames of {} channels",
            channels.len(),
            frame_count,
            channels_per_frame
        );

        Ok(Self {
            channels,
            channels_per_frame,
            frame_count,
            data,
        })
    }

    pub fn channels(&self) -> &[PoseChannel] {
        &self.channels
    }

    pub fn bone_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn channels_per_frame(&self) -> usize {
        self.channels_per_frame
    }

    /// Raw deltas of the whole table
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Raw deltas of one frame
    pub fn frame_data(&self, frame: usize) -> Result<&[u16]> {
        if frame >= self.frame_count {
            return Err(IqmError::ReferenceError(format!(
                "frame {frame} out of {} frames",
                self.frame_count
            )));
        }
        let start = frame * self.channels_per_frame;
        Ok(&self.data[start..start + self.channels_per_frame])
    }

    /// Decode one frame into `out`, one pose per bone
    pub fn decode(&self, frame: usize, out: &mut [Pose]) -> Result<()> {
        decode_frame(&self.channels, self.frame_data(frame)?, out)
    }

    /// Decode every frame of `clip`
    pub fn decode_clip(&self, clip: &AnimationClip) -> Result<Vec<Vec<Pose>>> {
        clip.validate(self.frame_count as u32)?;
        let first = clip.first_frame as usize;
        (first..first + clip.frame_count as usize)
            .map(|frame| {
                let mut poses = vec![Pose::IDENTITY; self.channels.len()];
                self.decode(frame, &mut poses)?;
                Ok(poses)
            })
            .collect()
    }
}
