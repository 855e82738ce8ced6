use bytebuffer::ByteBuffer;

use crate::error::{DbError, Result};

/// An in-memory buffer the size of one disk block, with typed get/set at byte offsets.
///
/// Backed by `bytebuffer::ByteBuffer` (the teacher's choice). Integers and the 4-byte
/// string/byte-array length prefix use the buffer's native big-endian byte order;
/// strings are UTF-8. Both choices are internal encoding details — every read goes
/// through this same type, so nothing outside the page format observes them (see
/// SPEC_FULL.md's Page module note).
#[derive(Debug)]
pub struct Page {
    buf: ByteBuffer,
    block_size: usize,
}

impl Page {
    pub fn new(block_size: usize) -> Self {
        Self {
            buf: ByteBuffer::from_vec(vec![0; block_size]),
            block_size,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Page {
        let block_size = bytes.len();
        Self {
            buf: ByteBuffer::from_vec(bytes),
            block_size,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn clear(&mut self) {
        let size = self.block_size;
        self.buf = ByteBuffer::from_vec(vec![0; size]);
    }

    pub fn get_i8(&mut self, offset: usize) -> Result<i8> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_i8()?)
    }

    pub fn set_i8(&mut self, offset: usize, n: i8) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_i8(n);
        Ok(())
    }

    pub fn get_u8(&mut self, offset: usize) -> Result<u8> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_u8()?)
    }

    pub fn set_u8(&mut self, offset: usize, n: u8) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u8(n);
        Ok(())
    }

    pub fn get_i16(&mut self, offset: usize) -> Result<i16> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_i16()?)
    }

    pub fn set_i16(&mut self, offset: usize, n: i16) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_i16(n);
        Ok(())
    }

    pub fn get_u16(&mut self, offset: usize) -> Result<u16> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_u16()?)
    }

    pub fn set_u16(&mut self, offset: usize, n: u16) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u16(n);
        Ok(())
    }

    pub fn get_int(&mut self, offset: usize) -> Result<i32> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_i32()?)
    }

    pub fn set_int(&mut self, offset: usize, n: i32) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_i32(n);
        Ok(())
    }

    pub fn get_u32(&mut self, offset: usize) -> Result<u32> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_u32()?)
    }

    pub fn set_u32(&mut self, offset: usize, n: u32) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u32(n);
        Ok(())
    }

    pub fn get_i64(&mut self, offset: usize) -> Result<i64> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_i64()?)
    }

    pub fn set_i64(&mut self, offset: usize, n: i64) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_i64(n);
        Ok(())
    }

    pub fn get_u64(&mut self, offset: usize) -> Result<u64> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_u64()?)
    }

    pub fn set_u64(&mut self, offset: usize, n: u64) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u64(n);
        Ok(())
    }

    pub fn get_f32(&mut self, offset: usize) -> Result<f32> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_f32()?)
    }

    pub fn set_f32(&mut self, offset: usize, n: f32) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_f32(n);
        Ok(())
    }

    pub fn get_f64(&mut self, offset: usize) -> Result<f64> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_f64()?)
    }

    pub fn set_f64(&mut self, offset: usize, n: f64) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_f64(n);
        Ok(())
    }

    pub fn get_bool(&mut self, offset: usize) -> Result<bool> {
        self.buf.set_rpos(offset);
        Ok(self.buf.read_u8()? != 0)
    }

    pub fn set_bool(&mut self, offset: usize, b: bool) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u8(if b { 1 } else { 0 });
        Ok(())
    }

    /// Raw length-prefixed bytes, unconstrained by any reserved field capacity.
    /// Used by the log manager, whose records are sized exactly to their payload.
    pub fn get_bytes(&mut self, offset: usize) -> Result<Vec<u8>> {
        self.buf.set_rpos(offset);
        let len = self.buf.read_u32()? as usize;
        Ok(self.buf.read_bytes(len)?)
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.buf.set_wpos(offset);
        self.buf.write_u32(bytes.len() as u32);
        self.buf.write_bytes(bytes);
        Ok(())
    }

    /// Reads a length-prefixed UTF-8 string. Defensive per spec §6: a length prefix
    /// that is non-positive or larger than the block yields an empty string instead
    /// of erroring, since a never-written slot reads back as all zero bytes.
    pub fn get_string(&mut self, offset: usize) -> Result<String> {
        self.buf.set_rpos(offset);
        let len = self.buf.read_i32()?;
        if len <= 0 || len as usize > self.block_size {
            return Ok(String::new());
        }
        let bytes = self.buf.read_bytes(len as usize)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes a length-prefixed UTF-8 string, raw (no reserved-capacity check). Used
    /// for log records, whose pages are sized exactly to fit the value being written.
    pub fn set_string(&mut self, offset: usize, val: &str) -> Result<()> {
        self.buf.set_wpos(offset);
        let bytes = val.as_bytes();
        self.buf.write_i32(bytes.len() as i32);
        self.buf.write_bytes(bytes);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string into a field with a fixed reserved
    /// capacity (`max_bytes`, prefix included), failing with `InvalidValue` rather
    /// than silently truncating or corrupting the following field (spec §4.2).
    pub fn set_string_checked(&mut self, offset: usize, val: &str, max_bytes: usize) -> Result<()> {
        let needed = Self::max_length(val.len());
        if needed > max_bytes {
            return Err(DbError::InvalidValue(format!(
                "string of {} bytes does not fit in a {}-byte field",
                val.len(),
                max_bytes
            )));
        }
        self.set_string(offset, val)
    }

    /// Total bytes needed to store a string of `strlen` encoded bytes: a 4-byte
    /// length prefix plus the payload.
    pub fn max_length(strlen: usize) -> usize {
        std::mem::size_of::<i32>() + strlen
    }

    pub(crate) fn contents(&mut self) -> &mut ByteBuffer {
        self.buf.set_rpos(0);
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn round_trips_int() {
        let mut p = Page::new(64);
        p.set_int(0, -42).unwrap();
        assert_eq!(p.get_int(0).unwrap(), -42);
    }

    #[test]
    fn round_trips_string() {
        let mut p = Page::new(64);
        p.set_string(0, "hello").unwrap();
        assert_eq!(p.get_string(0).unwrap(), "hello");
    }

    #[test]
    fn rejects_oversized_string() {
        let mut p = Page::new(64);
        let cap = Page::max_length(3);
        assert!(p.set_string_checked(0, "abc", cap).is_ok());
        assert!(p.set_string_checked(0, "abcd", cap).is_err());
    }

    #[test]
    fn defensive_empty_string_on_garbage_length() {
        let mut p = Page::new(64);
        // Never written: length prefix reads back as 0.
        assert_eq!(p.get_string(8).unwrap(), "");
    }

    #[test]
    fn round_trips_bytes() {
        let mut p = Page::new(64);
        p.set_bytes(0, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(p.get_bytes(0).unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
