/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Data destinations.
//!
//! A [`DataDestination`] assembles one linear byte stream from an ordered
//! list of buffers. The encoder reserves a buffer for a presence map, writes
//! field bytes into a later buffer, then comes back and fills the reserved
//! one; the final stream is always the concatenation of buffers in creation
//! order, regardless of the order they were written in.
//!
//! Buffers are addressed through [`BufferHandle`], a small index interpreted
//! only by the owning destination. Selecting a handle changes where appends
//! land, never the output order.

use bytes::{Bytes, BytesMut};
use fastcast_core::{FastError, FieldIdentity, Result, TemplateId};
use tracing::trace;

const DEFAULT_BUFFER_CAPACITY: usize = 128;

/// Opaque token identifying one buffer inside a [`DataDestination`].
///
/// Handles become invalid when a message completes; selecting a stale handle
/// is reported as a usage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(usize);

/// Append-only byte sink built from an ordered list of buffers.
#[derive(Debug)]
pub struct DataDestination {
    buffers: Vec<BytesMut>,
    current: usize,
    buffer_capacity: usize,
    in_message: bool,
    completed: Vec<Bytes>,
}

impl DataDestination {
    /// Creates a destination with the default per-buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Creates a destination whose buffers pre-allocate the given capacity.
    #[must_use]
    pub fn with_buffer_capacity(buffer_capacity: usize) -> Self {
        Self {
            buffers: Vec::new(),
            current: 0,
            buffer_capacity,
            in_message: false,
            completed: Vec::new(),
        }
    }

    fn ensure_buffer(&mut self) {
        if self.buffers.is_empty() {
            self.buffers
                .push(BytesMut::with_capacity(self.buffer_capacity));
            self.current = 0;
        }
    }

    /// Appends a new empty buffer at the end and makes it current.
    pub fn start_buffer(&mut self) -> BufferHandle {
        self.buffers
            .push(BytesMut::with_capacity(self.buffer_capacity));
        self.current = self.buffers.len() - 1;
        BufferHandle(self.current)
    }

    /// Returns a handle to the current buffer, creating one if none exists.
    pub fn get_current(&mut self) -> BufferHandle {
        self.ensure_buffer();
        BufferHandle(self.current)
    }

    /// Makes the given buffer current; subsequent writes append to it.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when the handle does not refer to a
    /// live buffer.
    pub fn select_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if handle.0 >= self.buffers.len() {
            return Err(FastError::usage(format!(
                "selected invalid buffer handle {}",
                handle.0
            )));
        }
        self.current = handle.0;
        Ok(())
    }

    /// Appends one byte to the current buffer.
    #[inline]
    pub fn put_byte(&mut self, byte: u8) {
        self.ensure_buffer();
        self.buffers[self.current].extend_from_slice(&[byte]);
    }

    /// Appends a slice to the current buffer.
    #[inline]
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.ensure_buffer();
        self.buffers[self.current].extend_from_slice(bytes);
    }

    /// Marks the start of a message.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when a message is already open.
    pub fn start_message(&mut self, template_id: TemplateId) -> Result<()> {
        if self.in_message {
            return Err(FastError::usage(
                "start_message while a message is already open",
            ));
        }
        trace!(template_id, "start message");
        self.buffers.clear();
        self.current = 0;
        self.in_message = true;
        Ok(())
    }

    /// Completes the open message: concatenates all buffers in creation
    /// order and queues the result for the consumer. All handles issued for
    /// this message become invalid.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when no message is open.
    pub fn end_message(&mut self) -> Result<()> {
        if !self.in_message {
            return Err(FastError::usage("end_message without start_message"));
        }
        let total: usize = self.buffers.iter().map(BytesMut::len).sum();
        let mut assembled = BytesMut::with_capacity(total);
        for buffer in self.buffers.drain(..) {
            assembled.extend_from_slice(&buffer);
        }
        trace!(bytes = assembled.len(), "end message");
        self.completed.push(assembled.freeze());
        self.current = 0;
        self.in_message = false;
        Ok(())
    }

    /// Observer hook: a field is about to be encoded. Emits no bytes.
    pub fn start_field(&self, identity: &FieldIdentity) {
        trace!(field = %identity, "start field");
    }

    /// Observer hook: a field finished encoding. Emits no bytes.
    pub fn end_field(&self, identity: &FieldIdentity) {
        trace!(field = %identity, "end field");
    }

    /// Returns the number of completed messages awaiting the consumer.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.completed.len()
    }

    /// Removes and returns the oldest completed message.
    pub fn pop_message(&mut self) -> Option<Bytes> {
        if self.completed.is_empty() {
            None
        } else {
            Some(self.completed.remove(0))
        }
    }

    /// Removes and returns all completed messages in completion order.
    pub fn take_messages(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.completed)
    }

    /// Concatenates the open (not yet completed) buffers in creation order.
    ///
    /// Diagnostic view used by tests and tooling; completed messages are not
    /// included.
    #[must_use]
    pub fn pending_bytes(&self) -> Bytes {
        let total: usize = self.buffers.iter().map(BytesMut::len).sum();
        let mut assembled = BytesMut::with_capacity(total);
        for buffer in &self.buffers {
            assembled.extend_from_slice(buffer);
        }
        assembled.freeze()
    }
}

impl Default for DataDestination {
    fn default() -> Self {
        Self::new()
    }
}
