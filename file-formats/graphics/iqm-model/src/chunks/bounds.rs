use glam::Vec3;

use crate::error::Result;
use crate::reader::ByteView;

/// Size of one bounds record
pub const BOUNDS_RECORD_SIZE: usize = 32;

/// Bounding volume of the model at one animation frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameBounds {
    pub min: Vec3,
    pub max: Vec3,
    /// Radius of the bounding circle in the XY plane
    pub xy_radius: f32,
    pub radius: f32,
}

impl FrameBounds {
    pub fn parse(view: &ByteView<'_>, offset: usize) -> Result<Self> {
        let [x0, y0, z0, x1, y1, z1, xy_radius, radius] = view.f32_array::<8>(offset)?;
        Ok(Self {
            min: Vec3::new(x0, y0, z0),
            max: Vec3::new(x1, y1, z1),
            xy_radius,
            radius,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        for value in self
            .min
            .to_array()
            .into_iter()
            .chain(self.max.to_array())
            .chain([self.xy_radius, self.radius])
        {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    /// Bounds enclosing a set of points
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let xy_radius = points
            .iter()
            .map(|p| p.truncate().length())
            .fold(0.0f32, f32::max);
        let radius = points.iter().map(|p| p.length()).fold(0.0f32, f32::max);
        Self {
            min,
            max,
            xy_radius,
            radius,
        }
    }
}

impl Default for FrameBounds {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            xy_radius: 0.0,
            radius: 0.0,
        }
    }
}

/// Read one bounds record per frame, or none when the file has no table
pub fn parse_bounds(view: &ByteView<'_>, offset: u32, num_frames: u32) -> Result<Vec<FrameBounds>> {
    if offset == 0 {
        return Ok(Vec::new());
    }
    view.table(offset, num_frames, BOUNDS_RECORD_SIZE)?;
    (0..num_frames as usize)
        .map(|i| FrameBounds::parse(view, offset as usize + i * BOUNDS_RECORD_SIZE))
        .collect()
}
