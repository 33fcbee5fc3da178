//! Formatting utilities

use glam::Vec3;
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a vector with a fixed number of decimals, trimming `-0`
pub fn format_vec3(v: Vec3, precision: usize) -> String {
    let component = |c: f32| {
        let text = format!("{c:.precision$}");
        match text.strip_prefix('-') {
            Some(rest) if rest.chars().all(|ch| ch == '0' || ch == '.') => rest.to_string(),
            _ => text,
        }
    };
    format!("{}, {}, {}", component(v.x), component(v.y), component(v.z))
}

/// Format an optional parent bone index
pub fn format_parent(parent: Option<usize>) -> String {
    parent.map_or_else(|| "-".to_string(), |p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
        assert_eq!(format_bytes(1048576), "1.05 MB");
    }

    #[test]
    fn test_format_vec3() {
        assert_eq!(format_vec3(Vec3::new(2.0, 1.0, 0.0), 3), "2.000, 1.000, 0.000");
        assert_eq!(format_vec3(Vec3::new(-0.0001, 0.5, -1.0), 2), "0.00, 0.50, -1.00");
    }

    #[test]
    fn test_format_parent() {
        assert_eq!(format_parent(None), "-");
        assert_eq!(format_parent(Some(3)), "3");
    }
}
