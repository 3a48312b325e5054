/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Presence maps.
//!
//! The presence map (PMAP) precedes a segment's body and carries one bit per
//! operator that needs to signal "value is on the wire". Bits are packed
//! seven per byte starting at the most significant data bit; the high bit of
//! the final wire byte is the stop marker.

use crate::destination::DataDestination;
use crate::primitives::STOP_BIT;
use fastcast_core::{FastError, Result};
use smallvec::SmallVec;

/// A fixed-capacity presence map.
///
/// Built bit by bit while encoding a segment, then serialised into the
/// buffer reserved for it. The decode side reads bits in the same order;
/// bits beyond the wire form read as zero.
#[derive(Debug, Clone)]
pub struct PresenceMap {
    /// Seven data bits per entry; stop bits are applied only on the wire.
    bytes: SmallVec<[u8; 8]>,
    /// Maximum number of bits this map may hold.
    capacity: usize,
    /// Bits appended so far.
    used: usize,
    /// Bits consumed so far (decode side).
    position: usize,
}

impl PresenceMap {
    /// Creates an empty presence map with the given bit capacity.
    ///
    /// The byte storage is pre-sized to `ceil(capacity / 7)`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut bytes = SmallVec::new();
        bytes.resize(capacity.div_ceil(7), 0);
        Self {
            bytes,
            capacity,
            used: 0,
            position: 0,
        }
    }

    /// Decodes a presence map from the wire.
    ///
    /// # Arguments
    /// * `data` - The input bytes
    /// * `offset` - Current position in the data, updated past the map
    ///
    /// # Errors
    /// Returns [`FastError::UnexpectedEof`] if the input ends before a stop
    /// bit.
    pub fn decode(data: &[u8], offset: &mut usize) -> Result<Self> {
        let mut bytes = SmallVec::new();
        loop {
            let byte = *data.get(*offset).ok_or(FastError::UnexpectedEof)?;
            *offset += 1;
            bytes.push(byte & 0x7f);
            if byte & STOP_BIT != 0 {
                break;
            }
        }
        let used = bytes.len() * 7;
        Ok(Self {
            bytes,
            capacity: used,
            used,
            position: 0,
        })
    }

    /// Appends one bit.
    ///
    /// # Errors
    /// Returns [`FastError::TemplateInvariantViolated`] when the declared
    /// capacity is exceeded.
    pub fn set_next(&mut self, bit: bool) -> Result<()> {
        if self.used >= self.capacity {
            return Err(FastError::pmap_overflow(self.capacity));
        }
        if bit {
            self.bytes[self.used / 7] |= 0x40 >> (self.used % 7);
        }
        self.used += 1;
        Ok(())
    }

    /// Returns the next bit, consuming it. Bits beyond the wire form read as
    /// zero.
    #[inline]
    pub fn next_bit(&mut self) -> bool {
        if self.position >= self.used {
            return false;
        }
        let bit = self.bytes[self.position / 7] & (0x40 >> (self.position % 7)) != 0;
        self.position += 1;
        bit
    }

    /// Returns the number of bits appended so far.
    #[inline]
    #[must_use]
    pub const fn bits_used(&self) -> usize {
        self.used
    }

    /// Returns the declared bit capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serialises the map into the destination's current buffer.
    ///
    /// Trailing all-zero bytes are trimmed and the stop bit is set on the
    /// final byte. A map with no bits set still emits exactly one byte.
    pub fn encode(&self, dest: &mut DataDestination) {
        let mut last = None;
        for (index, &byte) in self.bytes.iter().enumerate() {
            if byte != 0 {
                last = Some(index);
            }
        }
        match last {
            None => dest.put_byte(STOP_BIT),
            Some(last) => {
                for &byte in &self.bytes[..last] {
                    dest.put_byte(byte);
                }
                dest.put_byte(self.bytes[last] | STOP_BIT);
            }
        }
    }
}
