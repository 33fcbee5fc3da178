use glam::{Quat, Vec3};
use log::trace;

use crate::animation::pose::{Pose, normalize_quat};
use crate::chunks::text::TextPool;
use crate::error::Result;
use crate::reader::ByteView;

/// Size of one joint record
pub const JOINT_RECORD_SIZE: usize = 48;

/// A joint as stored in the file: name, parent and bind-local pose
#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    pub name: String,
    /// Parent joint index, negative for a root
    pub parent: i32,
    pub pose: Pose,
}

impl JointRecord {
    pub fn parse(view: &ByteView<'_>, text: &TextPool<'_>, offset: usize) -> Result<Self> {
        let name = text.name_at(view.u32_at(offset)?)?;
        let parent = view.i32_at(offset + 4)?;
        let [tx, ty, tz] = view.f32_array::<3>(offset + 8)?;
        let [rx, ry, rz, rw] = view.f32_array::<4>(offset + 20)?;
        let [sx, sy, sz] = view.f32_array::<3>(offset + 36)?;

        let pose = Pose::new(
            Vec3::new(tx, ty, tz),
            normalize_quat(Quat::from_xyzw(rx, ry, rz, rw)),
            Vec3::new(sx, sy, sz),
        );
        trace!("Joint '{}' parent {} {:?}", name, parent, pose);
        Ok(Self { name, parent, pose })
    }

    /// Serialize with `name_offset` pointing into the text pool
    pub fn write(&self, name_offset: u32, out: &mut Vec<u8>) {
        out.extend_from_slice(&name_offset.to_le_bytes());
        out.extend_from_slice(&self.parent.to_le_bytes());
        for value in self.pose.to_channels() {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Read `count` joint records starting at `offset`
pub fn parse_joints(
    view: &ByteView<'_>,
    text: &TextPool<'_>,
    offset: u32,
    count: u32,
) -> Result<Vec<JointRecord>> {
    view.table(offset, count, JOINT_RECORD_SIZE)?;
    (0..count as usize)
        .map(|i| JointRecord::parse(view, text, offset as usize + i * JOINT_RECORD_SIZE))
        .collect()
}
