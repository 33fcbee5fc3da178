use memchr::memchr;

use crate::MAX_NAME_LEN;
use crate::error::{IqmError, Result};

/// The NUL-separated string pool that names meshes, materials, joints and clips
#[derive(Debug, Clone, Copy)]
pub struct TextPool<'a> {
    data: &'a [u8],
}

impl<'a> TextPool<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Look up the string starting at `offset` within the pool
    ///
    /// Names are cut to `MAX_NAME_LEN - 1` bytes, the size of the name
    /// buffers IQM tooling has always assumed.
    pub fn name_at(&self, offset: u32) -> Result<String> {
        let rest = self.data.get(offset as usize..).ok_or_else(|| {
            IqmError::ParseError(format!(
                "text offset {offset} outside the {} byte pool",
                self.data.len()
            ))
        })?;
        let end = memchr(0, rest).unwrap_or(rest.len());
        let bytes = &rest[..end.min(MAX_NAME_LEN - 1)];
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a free-form block (the comment) without truncation
    pub fn block(data: &[u8]) -> String {
        let end = memchr(0, data).unwrap_or(data.len());
        String::from_utf8_lossy(&data[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_lookup() {
        let pool = TextPool::new(b"\0root\0child\0");
        assert_eq!(pool.name_at(0).unwrap(), "");
        assert_eq!(pool.name_at(1).unwrap(), "root");
        assert_eq!(pool.name_at(6).unwrap(), "child");
        assert!(pool.name_at(64).is_err());
    }

    #[test]
    fn test_unterminated_name() {
        let pool = TextPool::new(b"\0tail");
        assert_eq!(pool.name_at(1).unwrap(), "tail");
    }

    #[test]
    fn test_long_name_truncated() {
        let mut data = vec![b'a'; 200];
        data.push(0);
        let pool = TextPool::new(&data);
        assert_eq!(pool.name_at(0).unwrap().len(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn test_comment_block() {
        assert_eq!(TextPool::block(b"exported by hand\0junk"), "exported by hand");
    }
}
