//! Cursor buffer for writing and parsing delta payloads.
//!
//! All multi-byte integers are little-endian `u32`. Reads past the end
//! return `None` instead of failing, so a truncated payload simply ends
//! early.

/// A buffer with a cursor for sequential reading or writing.
pub struct BufferStream {
    buffer: Vec<u8>,
    cursor: usize,
}

impl BufferStream {
    /// Creates a new buffer with the specified initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Creates a new buffer wrapping existing data, positioned at the start.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Returns the current cursor position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Consumes the buffer and returns the underlying vector.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns the number of bytes remaining from the cursor to the end.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Writes a single byte to the buffer.
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
        self.cursor += 1;
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a slice of bytes to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        self.cursor += data.len();
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.cursor)?;
        self.cursor += 1;
        Some(value)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    /// Reads a slice of bytes.
    pub fn read_bytes(&mut self, len: usize) -> Option<&[u8]> {
        let end = self.cursor.checked_add(len)?;
        if end > self.buffer.len() {
            return None;
        }
        let start = self.cursor;
        self.cursor = end;
        Some(&self.buffer[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_read_write() {
        let mut buf = BufferStream::with_capacity(16);

        buf.write_u8(42);
        buf.write_u32(0x0403_0201);
        buf.write_bytes(&[9, 8]);

        assert_eq!(buf.position(), 7);

        let bytes = buf.into_vec();
        assert_eq!(bytes.len(), 7);
        let mut buf = BufferStream::from_vec(bytes);
        assert_eq!(buf.read_u8(), Some(42));
        assert_eq!(buf.read_bytes(4), Some(&[1, 2, 3, 4][..]));
        assert_eq!(buf.remaining(), 2);
        assert_eq!(buf.read_bytes(2), Some(&[9, 8][..]));
    }

    #[test]
    fn test_buffer_underflow() {
        let mut buf = BufferStream::from_vec(vec![1, 2, 3]);

        assert_eq!(buf.read_u32(), None);
        assert_eq!(buf.position(), 0);
        assert_eq!(buf.read_u8(), Some(1));
        assert_eq!(buf.read_bytes(3), None);
        assert_eq!(buf.read_bytes(2), Some(&[2, 3][..]));
        assert_eq!(buf.read_u8(), None);
    }
}
