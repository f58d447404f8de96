//! Fixed-capacity message buffer.

use std::borrow::Cow;

use crate::error::CapacityError;

/// A byte buffer with a fixed capacity and a filled length.
///
/// Receives fill at most [`capacity`](Self::capacity) bytes; writes that would exceed the capacity
/// fail instead of overrunning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedBuffer {
    /// One byte longer than the capacity, so a datagram receive can tell an exact fit from a
    /// truncated datagram.
    storage: Box<[u8]>,
    len: usize,
}

impl BoundedBuffer {
    /// Creates an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity + 1].into_boxed_slice(),
            len: 0,
        }
    }

    /// Maximum number of bytes the buffer holds.
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    /// Number of filled bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes are filled.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes still free.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// The filled bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    /// Empties the buffer, keeping its capacity.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends all of `data`, or nothing if it does not fit.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<(), CapacityError> {
        if data.len() > self.remaining() {
            return Err(CapacityError {
                requested: data.len(),
                remaining: self.remaining(),
                capacity: self.capacity(),
            });
        }

        let end = self.len + data.len();
        self.storage[self.len..end].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// The filled bytes as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_slice())
    }

    /// Clears the buffer and hands out `capacity` bytes for a receive.
    pub(crate) fn receive_slot(&mut self) -> &mut [u8] {
        let capacity = self.capacity();
        self.len = 0;
        &mut self.storage[..capacity]
    }

    /// Like [`receive_slot`](Self::receive_slot), plus the spare byte past the capacity.
    ///
    /// A receive that fills the spare byte was longer than the capacity.
    pub(crate) fn receive_slot_with_spare(&mut self) -> &mut [u8] {
        self.len = 0;
        &mut self.storage
    }

    /// Marks the first `len` bytes as filled after a receive; a spare byte is never filled.
    pub(crate) fn set_filled(&mut self, len: usize) {
        self.len = len.min(self.capacity());
    }
}
