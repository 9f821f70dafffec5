//! # Buffer Module
//!
//! A growable write buffer that recursive object serialization can `push`
//! a fresh frame onto and `pop` back off of, so an outer object's cursor
//! stays put while an inner, `embedded_key`-referenced object is written to
//! its own top-level record. A read buffer is a borrowed view over
//! engine-owned bytes and only needs to track a cursor into it.

use crate::codec;
use crate::error::StoreResult;

/// Default minimum capacity reserved for a freshly started frame.
pub const DEFAULT_MIN_ALLOC: usize = 128;

/// A chain of byte frames supporting nested, recursive serialization.
///
/// `start` resets the buffer to a single empty frame. `push` opens a new
/// frame on top of the stack so a nested write can proceed independently;
/// `pop` closes it and hands the caller its bytes, without discarding the
/// frame's allocation (it is kept, cleared, for reuse by the next `push`).
pub struct WriteBuffer {
    frames: Vec<Vec<u8>>,
    spare: Vec<Vec<u8>>,
    min_alloc: usize,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::with_min_alloc(DEFAULT_MIN_ALLOC)
    }

    pub fn with_min_alloc(min_alloc: usize) -> Self {
        Self {
            frames: vec![Vec::with_capacity(min_alloc)],
            spare: Vec::new(),
            min_alloc,
        }
    }

    /// Resets the active (bottom) frame, reserving at least `size_hint`
    /// bytes of capacity.
    pub fn start(&mut self, size_hint: usize) {
        self.frames.clear();
        self.spare.clear();
        let mut frame = Vec::with_capacity(size_hint.max(self.min_alloc));
        frame.clear();
        self.frames.push(frame);
    }

    /// Opens a new frame on top of the stack.
    pub fn push(&mut self) {
        let mut frame = self.spare.pop().unwrap_or_default();
        frame.clear();
        if frame.capacity() < self.min_alloc {
            frame.reserve(self.min_alloc - frame.capacity());
        }
        self.frames.push(frame);
    }

    /// Closes the top frame and returns its bytes. The frame's allocation is
    /// retained in a spare pool for the next `push` to reuse.
    pub fn pop(&mut self) -> Vec<u8> {
        assert!(self.frames.len() > 1, "cannot pop the base frame");
        let finished = self.frames.pop().unwrap();
        let bytes = finished.clone();
        self.spare.push(finished);
        bytes
    }

    /// Reserves `n` bytes at the end of the active frame and returns their
    /// index range, for callers that want to fill them in place (e.g. a
    /// length prefix computed after the fact).
    pub fn allocate(&mut self, n: usize) -> std::ops::Range<usize> {
        let frame = self.active_mut();
        let start = frame.len();
        frame.resize(start + n, 0);
        start..start + n
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.active_mut().extend_from_slice(bytes);
    }

    pub fn append_integer(&mut self, value: u64, width: usize) {
        codec::write_uint(self.active_mut(), value, width);
    }

    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        self.active()
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.frames.pop().unwrap_or_default()
    }

    fn active(&self) -> &Vec<u8> {
        self.frames.last().expect("write buffer has no active frame")
    }

    fn active_mut(&mut self) -> &mut Vec<u8> {
        self.frames.last_mut().expect("write buffer has no active frame")
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed, cursor-advancing view over bytes owned by the engine. All
/// data a `ReadBuffer` points into remains valid only for the lifetime of
/// the enclosing transaction; `read_cstring` hands back a borrow of that
/// same lifetime, which the caller must copy if it needs to outlive it.
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_uint(&mut self, width: usize) -> StoreResult<u64> {
        let value = codec::read_uint(&self.data[self.cursor..], width)?;
        self.cursor += width;
        Ok(value)
    }

    pub fn read_int(&mut self, width: usize) -> StoreResult<i64> {
        let value = codec::read_int(&self.data[self.cursor..], width)?;
        self.cursor += width;
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> StoreResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(crate::error::StoreError::Persistence(format!(
                "buffer underrun: need {} bytes, have {}",
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    pub fn read_cstring(&mut self) -> StoreResult<&'a str> {
        let (s, consumed) = codec::read_cstring(&self.data[self.cursor..])?;
        self.cursor += consumed;
        Ok(s)
    }

    pub fn read_f32_native(&mut self) -> StoreResult<f32> {
        let value = codec::read_f32_native(&self.data[self.cursor..])?;
        self.cursor += 4;
        Ok(value)
    }

    pub fn read_f64_native(&mut self) -> StoreResult<f64> {
        let value = codec::read_f64_native(&self.data[self.cursor..])?;
        self.cursor += 8;
        Ok(value)
    }

    pub fn skip(&mut self, n: usize) -> StoreResult<()> {
        self.read_bytes(n).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_keeps_outer_cursor_put() {
        let mut buf = WriteBuffer::new();
        buf.start(0);
        buf.append(b"outer-before");
        buf.push();
        buf.append(b"inner");
        let inner = buf.pop();
        buf.append(b"outer-after");
        assert_eq!(inner, b"inner");
        assert_eq!(buf.bytes(), b"outer-beforeouter-after");
    }

    #[test]
    fn allocate_reserves_fillable_range() {
        let mut buf = WriteBuffer::new();
        buf.start(0);
        let range = buf.allocate(4);
        assert_eq!(range, 0..4);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn read_buffer_tracks_cursor() {
        let mut data = Vec::new();
        codec::write_uint(&mut data, 7, 2);
        data.extend_from_slice(b"hi\0");
        let mut rb = ReadBuffer::new(&data);
        assert_eq!(rb.read_uint(2).unwrap(), 7);
        assert_eq!(rb.read_cstring().unwrap(), "hi");
        assert!(rb.is_empty());
    }
}
