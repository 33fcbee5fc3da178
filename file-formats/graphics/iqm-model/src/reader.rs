//! Offset-addressed little-endian reads over a flat byte buffer
//!
//! Every record in an IQM file is located by an absolute offset and a fixed
//! stride, so the parser never streams: it asks for "the u32 at byte N" and
//! gets a bounds-checked answer.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{IqmError, Result};

/// Bounds-checked view over the bytes of one file
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or_else(|| {
            IqmError::ParseError(format!("range {offset}+{len} overflows the address space"))
        })?;
        self.data.get(offset..end).ok_or_else(|| {
            IqmError::ParseError(format!(
                "{len} bytes at offset {offset} exceed the {} byte buffer",
                self.data.len()
            ))
        })
    }

    /// Borrow the block holding `count` records of `stride` bytes at `offset`
    pub fn table(&self, offset: u32, count: u32, stride: usize) -> Result<&'a [u8]> {
        let len = (count as usize).checked_mul(stride).ok_or_else(|| {
            IqmError::ParseError(format!("{count} records of {stride} bytes overflow"))
        })?;
        self.slice(offset as usize, len)
    }

    pub fn u16_at(&self, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.slice(offset, 2)?))
    }

    pub fn u32_at(&self, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.slice(offset, 4)?))
    }

    pub fn f32_at(&self, offset: usize) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.slice(offset, 4)?))
    }

    /// Read `N` consecutive floats starting at `offset`
    pub fn f32_array<const N: usize>(&self, offset: usize) -> Result<[f32; N]> {
        let bytes = self.slice(offset, N * 4)?;
        let mut out = [0.0f32; N];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x1234_5678u32.to_le_bytes());
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&0xBEEFu16.to_le_bytes());

        let view = ByteView::new(&data);
        assert_eq!(view.u32_at(0).unwrap(), 0x1234_5678);
        assert_eq!(view.i32_at(4).unwrap(), -1);
        assert_eq!(view.f32_at(8).unwrap(), 1.5);
        assert_eq!(view.u16_at(12).unwrap(), 0xBEEF);
    }

    #[test]
    fn test_unaligned_reads() {
        let mut data = vec![0xFFu8];
        data.extend_from_slice(&2.0f32.to_le_bytes());
        data.extend_from_slice(&3.0f32.to_le_bytes());

        let view = ByteView::new(&data);
        assert_eq!(view.f32_array::<2>(1).unwrap(), [2.0, 3.0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let data = [0u8; 6];
        let view = ByteView::new(&data);
        assert!(view.u32_at(2).is_ok());
        assert!(matches!(view.u32_at(3), Err(IqmError::ParseError(_))));
        assert!(view.slice(usize::MAX, 2).is_err());
        assert!(view.table(0, u32::MAX, usize::MAX).is_err());
    }
}
