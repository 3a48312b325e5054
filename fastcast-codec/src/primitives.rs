/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Stop-bit wire primitives.
//!
//! FAST encodes integers and strings as stop-bit byte sequences: seven data
//! bits per byte, high bit set on the final byte. Nullable forms reserve the
//! zero representation for null and shift non-negative values by one.
//!
//! Integer encoders build the byte sequence least-significant-group-first in
//! a reusable [`WorkingBuffer`] and emit it reversed, so no per-value
//! allocation happens on the hot path.

use crate::destination::DataDestination;
use fastcast_core::{FastError, Result};
use smallvec::SmallVec;

/// High bit marking the final byte of a stop-bit sequence.
pub const STOP_BIT: u8 = 0x80;

/// Scratch buffer for building stop-bit sequences back to front.
///
/// One instance lives in the codec context and is reused across fields.
#[derive(Debug, Default)]
pub struct WorkingBuffer {
    bytes: SmallVec<[u8; 16]>,
}

impl WorkingBuffer {
    /// Creates an empty working buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any pending bytes.
    #[inline]
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Appends one seven-bit group. Groups are pushed least significant
    /// first and emitted in reverse.
    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Sets the stop bit on the group that will be emitted last.
    #[inline]
    fn mark_stop(&mut self) {
        if let Some(first) = self.bytes.first_mut() {
            *first |= STOP_BIT;
        }
    }

    /// Writes the pending groups to the destination in wire order.
    #[inline]
    fn emit(&self, dest: &mut DataDestination) {
        for &byte in self.bytes.iter().rev() {
            dest.put_byte(byte);
        }
    }
}

/// Emits the single-byte null token.
#[inline]
pub fn encode_null(dest: &mut DataDestination) {
    dest.put_byte(STOP_BIT);
}

/// Encodes an unsigned integer in mandatory (non-nullable) form.
pub fn encode_unsigned(dest: &mut DataDestination, working: &mut WorkingBuffer, value: u64) {
    working.clear();
    let mut v = value;
    working.push((v & 0x7f) as u8);
    v >>= 7;
    while v != 0 {
        working.push((v & 0x7f) as u8);
        v >>= 7;
    }
    working.mark_stop();
    working.emit(dest);
}

/// Encodes an optional unsigned integer: null is the reserved zero
/// representation, present values are shifted up by one.
///
/// # Errors
/// Returns [`FastError::ValueOutOfRange`] when the shifted value overflows.
pub fn encode_unsigned_nullable(
    dest: &mut DataDestination,
    working: &mut WorkingBuffer,
    value: Option<u64>,
    name: &str,
) -> Result<()> {
    match value {
        None => encode_null(dest),
        Some(v) => {
            let shifted = v.checked_add(1).ok_or_else(|| FastError::ValueOutOfRange {
                name: name.to_string(),
                detail: "nullable value has no room for the null shift".to_string(),
            })?;
            encode_unsigned(dest, working, shifted);
        }
    }
    Ok(())
}

/// Encodes a signed integer in mandatory form: two's complement seven-bit
/// groups, minimal length preserving the sign bit.
pub fn encode_signed(dest: &mut DataDestination, working: &mut WorkingBuffer, value: i64) {
    working.clear();
    let mut v = value;
    loop {
        let byte = (v & 0x7f) as u8;
        working.push(byte);
        v >>= 7;
        let sign_bit = byte & 0x40 != 0;
        if (v == 0 && !sign_bit) || (v == -1 && sign_bit) {
            break;
        }
    }
    working.mark_stop();
    working.emit(dest);
}

/// Encodes an optional signed integer: null is zero, non-negative values
/// shift up by one, negative values are unchanged.
///
/// # Errors
/// Returns [`FastError::ValueOutOfRange`] when the shifted value overflows.
pub fn encode_signed_nullable(
    dest: &mut DataDestination,
    working: &mut WorkingBuffer,
    value: Option<i64>,
    name: &str,
) -> Result<()> {
    match value {
        None => encode_null(dest),
        Some(v) if v < 0 => encode_signed(dest, working, v),
        Some(v) => {
            let shifted = v.checked_add(1).ok_or_else(|| FastError::ValueOutOfRange {
                name: name.to_string(),
                detail: "nullable value has no room for the null shift".to_string(),
            })?;
            encode_signed(dest, working, shifted);
        }
    }
    Ok(())
}

/// Encodes an ASCII string in mandatory form: raw bytes, stop bit on the
/// final character. The empty string is the single byte `0x80`.
pub fn encode_ascii(dest: &mut DataDestination, value: &[u8]) {
    match value.split_last() {
        None => dest.put_byte(STOP_BIT),
        Some((last, head)) => {
            dest.put_slice(head);
            dest.put_byte(*last | STOP_BIT);
        }
    }
}

/// Encodes an optional ASCII string: null is `0x80`, the empty string is
/// `0x00 0x80`, other values are the mandatory form.
pub fn encode_ascii_nullable(dest: &mut DataDestination, value: Option<&[u8]>) {
    match value {
        None => dest.put_byte(STOP_BIT),
        Some([]) => {
            dest.put_byte(0x00);
            dest.put_byte(STOP_BIT);
        }
        Some(bytes) => encode_ascii(dest, bytes),
    }
}

/// Encodes a byte vector in mandatory form: stop-bit length then raw bytes.
pub fn encode_byte_vector(dest: &mut DataDestination, working: &mut WorkingBuffer, value: &[u8]) {
    encode_unsigned(dest, working, value.len() as u64);
    dest.put_slice(value);
}

/// Encodes an optional byte vector: null length token, or length shifted by
/// one then raw bytes.
pub fn encode_byte_vector_nullable(
    dest: &mut DataDestination,
    working: &mut WorkingBuffer,
    value: Option<&[u8]>,
) {
    match value {
        None => encode_null(dest),
        Some(bytes) => {
            encode_unsigned(dest, working, bytes.len() as u64 + 1);
            dest.put_slice(bytes);
        }
    }
}

/// Decodes a mandatory unsigned integer.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input and
/// [`FastError::ValueOutOfRange`] on overflow.
pub fn decode_unsigned(data: &[u8], offset: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    loop {
        let byte = *data.get(*offset).ok_or(FastError::UnexpectedEof)?;
        *offset += 1;
        if result > (u64::MAX >> 7) {
            return Err(FastError::ValueOutOfRange {
                name: String::new(),
                detail: "unsigned integer overflow while decoding".to_string(),
            });
        }
        result = (result << 7) | u64::from(byte & 0x7f);
        if byte & STOP_BIT != 0 {
            return Ok(result);
        }
    }
}

/// Decodes an optional unsigned integer; zero decodes to null.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_unsigned_nullable(data: &[u8], offset: &mut usize) -> Result<Option<u64>> {
    let raw = decode_unsigned(data, offset)?;
    Ok(raw.checked_sub(1))
}

/// Decodes a mandatory signed integer.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_signed(data: &[u8], offset: &mut usize) -> Result<i64> {
    let first = *data.get(*offset).ok_or(FastError::UnexpectedEof)?;
    let mut result: i64 = if first & 0x40 != 0 { -1 } else { 0 };
    loop {
        let byte = *data.get(*offset).ok_or(FastError::UnexpectedEof)?;
        *offset += 1;
        result = (result << 7) | i64::from(byte & 0x7f);
        if byte & STOP_BIT != 0 {
            return Ok(result);
        }
    }
}

/// Decodes an optional signed integer; zero decodes to null, positive values
/// shift down by one.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_signed_nullable(data: &[u8], offset: &mut usize) -> Result<Option<i64>> {
    let raw = decode_signed(data, offset)?;
    Ok(match raw {
        0 => None,
        v if v > 0 => Some(v - 1),
        v => Some(v),
    })
}

/// Reads one stop-bit character sequence, returning the seven-bit contents
/// and the number of wire bytes consumed.
fn decode_char_sequence(data: &[u8], offset: &mut usize) -> Result<(Vec<u8>, usize)> {
    let mut chars = Vec::new();
    let mut consumed = 0;
    loop {
        let byte = *data.get(*offset).ok_or(FastError::UnexpectedEof)?;
        *offset += 1;
        consumed += 1;
        chars.push(byte & 0x7f);
        if byte & STOP_BIT != 0 {
            return Ok((chars, consumed));
        }
    }
}

/// Decodes a mandatory ASCII string; the single byte `0x80` is the empty
/// string.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_ascii(data: &[u8], offset: &mut usize) -> Result<Vec<u8>> {
    let (chars, consumed) = decode_char_sequence(data, offset)?;
    if consumed == 1 && chars[0] == 0 {
        return Ok(Vec::new());
    }
    Ok(chars)
}

/// Decodes an optional ASCII string: `0x80` is null, `0x00 0x80` is the
/// empty string.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_ascii_nullable(data: &[u8], offset: &mut usize) -> Result<Option<Vec<u8>>> {
    let (chars, consumed) = decode_char_sequence(data, offset)?;
    if consumed == 1 && chars[0] == 0 {
        return Ok(None);
    }
    if consumed == 2 && chars == [0, 0] {
        return Ok(Some(Vec::new()));
    }
    Ok(Some(chars))
}

/// Decodes a mandatory byte vector.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_byte_vector(data: &[u8], offset: &mut usize) -> Result<Vec<u8>> {
    let length = usize::try_from(decode_unsigned(data, offset)?).map_err(|_| {
        FastError::ValueOutOfRange {
            name: String::new(),
            detail: "byte vector length exceeds addressable size".to_string(),
        }
    })?;
    take_bytes(data, offset, length)
}

/// Decodes an optional byte vector; a zero length token is null.
///
/// # Errors
/// Returns [`FastError::UnexpectedEof`] on truncated input.
pub fn decode_byte_vector_nullable(data: &[u8], offset: &mut usize) -> Result<Option<Vec<u8>>> {
    match decode_unsigned_nullable(data, offset)? {
        None => Ok(None),
        Some(length) => {
            let length = usize::try_from(length).map_err(|_| FastError::ValueOutOfRange {
                name: String::new(),
                detail: "byte vector length exceeds addressable size".to_string(),
            })?;
            take_bytes(data, offset, length).map(Some)
        }
    }
}

fn take_bytes(data: &[u8], offset: &mut usize, length: usize) -> Result<Vec<u8>> {
    let end = offset.checked_add(length).ok_or(FastError::UnexpectedEof)?;
    let bytes = data.get(*offset..end).ok_or(FastError::UnexpectedEof)?;
    *offset = end;
    Ok(bytes.to_vec())
}
