/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Transfer operator semantics.
//!
//! Each scalar instruction variant reduces to a small function over the
//! accessor value and the operator's dictionary entry: decide the presence
//! map bit, emit wire bytes when the value cannot be elided, and update the
//! dictionary. The decode functions mirror the encode functions bit for bit.

use crate::context::{Context, DictionaryValue};
use crate::destination::DataDestination;
use crate::pmap::PresenceMap;
use crate::primitives::{self, WorkingBuffer};
use bytes::Bytes;
use fastcast_core::{Decimal, FastError, FieldIdentity, Result};
use fastcast_templates::{DictionaryScope, Operator, Presence, ScalarInstruction};

fn required(name: &str) -> FastError {
    FastError::FieldRequiredButAbsent {
        name: name.to_string(),
    }
}

fn out_of_range(name: &str, detail: &str) -> FastError {
    FastError::ValueOutOfRange {
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

/// Integer primitive behind a scalar instruction.
pub(crate) trait IntegerField: Copy + PartialEq + Sized {
    /// Reads the field from an accessor, range-checking the declared width.
    fn read(
        accessor: &dyn crate::accessor::MessageAccessor,
        identity: &FieldIdentity,
    ) -> Result<Option<Self>>;

    /// Converts into a dictionary entry.
    fn to_dictionary(self) -> DictionaryValue;

    /// Extracts from a dictionary entry of the matching kind.
    fn from_dictionary(value: &DictionaryValue) -> Option<Self>;

    /// Emits the mandatory wire form.
    fn emit(self, dest: &mut DataDestination, working: &mut WorkingBuffer);

    /// Emits the nullable wire form.
    fn emit_nullable(
        self,
        dest: &mut DataDestination,
        working: &mut WorkingBuffer,
        name: &str,
    ) -> Result<()>;

    /// Reads the mandatory wire form.
    fn parse(data: &[u8], offset: &mut usize, name: &str) -> Result<Self>;

    /// Reads the nullable wire form.
    fn parse_nullable(data: &[u8], offset: &mut usize, name: &str) -> Result<Option<Self>>;

    /// Returns `self - base` for delta encoding.
    fn delta_from(self, base: Self, name: &str) -> Result<i64>;

    /// Returns `base + delta` for delta decoding.
    fn apply_delta(base: Self, delta: i64, name: &str) -> Result<Self>;

    /// Returns `self + 1` for the increment operator.
    fn successor(self) -> Option<Self>;

    /// The delta base when neither dictionary nor initial value applies.
    fn zero() -> Self;
}

impl IntegerField for u64 {
    fn read(
        accessor: &dyn crate::accessor::MessageAccessor,
        identity: &FieldIdentity,
    ) -> Result<Option<Self>> {
        Ok(accessor.get_unsigned_integer(identity))
    }

    fn to_dictionary(self) -> DictionaryValue {
        DictionaryValue::UInt(self)
    }

    fn from_dictionary(value: &DictionaryValue) -> Option<Self> {
        match value {
            DictionaryValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    fn emit(self, dest: &mut DataDestination, working: &mut WorkingBuffer) {
        primitives::encode_unsigned(dest, working, self);
    }

    fn emit_nullable(
        self,
        dest: &mut DataDestination,
        working: &mut WorkingBuffer,
        name: &str,
    ) -> Result<()> {
        primitives::encode_unsigned_nullable(dest, working, Some(self), name)
    }

    fn parse(data: &[u8], offset: &mut usize, _name: &str) -> Result<Self> {
        primitives::decode_unsigned(data, offset)
    }

    fn parse_nullable(data: &[u8], offset: &mut usize, _name: &str) -> Result<Option<Self>> {
        primitives::decode_unsigned_nullable(data, offset)
    }

    fn delta_from(self, base: Self, name: &str) -> Result<i64> {
        i64::try_from(i128::from(self) - i128::from(base))
            .map_err(|_| out_of_range(name, "delta exceeds 64-bit signed range"))
    }

    fn apply_delta(base: Self, delta: i64, name: &str) -> Result<Self> {
        Self::try_from(i128::from(base) + i128::from(delta))
            .map_err(|_| out_of_range(name, "delta lands outside the unsigned range"))
    }

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn zero() -> Self {
        0
    }
}

impl IntegerField for u32 {
    fn read(
        accessor: &dyn crate::accessor::MessageAccessor,
        identity: &FieldIdentity,
    ) -> Result<Option<Self>> {
        match accessor.get_unsigned_integer(identity) {
            None => Ok(None),
            Some(v) => Self::try_from(v)
                .map(Some)
                .map_err(|_| out_of_range(identity.name(), "value exceeds 32 bits")),
        }
    }

    fn to_dictionary(self) -> DictionaryValue {
        DictionaryValue::UInt(u64::from(self))
    }

    fn from_dictionary(value: &DictionaryValue) -> Option<Self> {
        match value {
            DictionaryValue::UInt(v) => Self::try_from(*v).ok(),
            _ => None,
        }
    }

    fn emit(self, dest: &mut DataDestination, working: &mut WorkingBuffer) {
        primitives::encode_unsigned(dest, working, u64::from(self));
    }

    fn emit_nullable(
        self,
        dest: &mut DataDestination,
        working: &mut WorkingBuffer,
        name: &str,
    ) -> Result<()> {
        primitives::encode_unsigned_nullable(dest, working, Some(u64::from(self)), name)
    }

    fn parse(data: &[u8], offset: &mut usize, name: &str) -> Result<Self> {
        let raw = primitives::decode_unsigned(data, offset)?;
        Self::try_from(raw).map_err(|_| out_of_range(name, "value exceeds 32 bits"))
    }

    fn parse_nullable(data: &[u8], offset: &mut usize, name: &str) -> Result<Option<Self>> {
        match primitives::decode_unsigned_nullable(data, offset)? {
            None => Ok(None),
            Some(raw) => Self::try_from(raw)
                .map(Some)
                .map_err(|_| out_of_range(name, "value exceeds 32 bits")),
        }
    }

    fn delta_from(self, base: Self, _name: &str) -> Result<i64> {
        Ok(i64::from(self) - i64::from(base))
    }

    fn apply_delta(base: Self, delta: i64, name: &str) -> Result<Self> {
        Self::try_from(i64::from(base) + delta)
            .map_err(|_| out_of_range(name, "delta lands outside the 32-bit unsigned range"))
    }

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn zero() -> Self {
        0
    }
}

impl IntegerField for i64 {
    fn read(
        accessor: &dyn crate::accessor::MessageAccessor,
        identity: &FieldIdentity,
    ) -> Result<Option<Self>> {
        Ok(accessor.get_signed_integer(identity))
    }

    fn to_dictionary(self) -> DictionaryValue {
        DictionaryValue::Int(self)
    }

    fn from_dictionary(value: &DictionaryValue) -> Option<Self> {
        match value {
            DictionaryValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn emit(self, dest: &mut DataDestination, working: &mut WorkingBuffer) {
        primitives::encode_signed(dest, working, self);
    }

    fn emit_nullable(
        self,
        dest: &mut DataDestination,
        working: &mut WorkingBuffer,
        name: &str,
    ) -> Result<()> {
        primitives::encode_signed_nullable(dest, working, Some(self), name)
    }

    fn parse(data: &[u8], offset: &mut usize, _name: &str) -> Result<Self> {
        primitives::decode_signed(data, offset)
    }

    fn parse_nullable(data: &[u8], offset: &mut usize, _name: &str) -> Result<Option<Self>> {
        primitives::decode_signed_nullable(data, offset)
    }

    fn delta_from(self, base: Self, name: &str) -> Result<i64> {
        i64::try_from(i128::from(self) - i128::from(base))
            .map_err(|_| out_of_range(name, "delta exceeds 64-bit signed range"))
    }

    fn apply_delta(base: Self, delta: i64, name: &str) -> Result<Self> {
        Self::try_from(i128::from(base) + i128::from(delta))
            .map_err(|_| out_of_range(name, "delta lands outside the signed range"))
    }

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn zero() -> Self {
        0
    }
}

impl IntegerField for i32 {
    fn read(
        accessor: &dyn crate::accessor::MessageAccessor,
        identity: &FieldIdentity,
    ) -> Result<Option<Self>> {
        match accessor.get_signed_integer(identity) {
            None => Ok(None),
            Some(v) => Self::try_from(v)
                .map(Some)
                .map_err(|_| out_of_range(identity.name(), "value exceeds 32 bits")),
        }
    }

    fn to_dictionary(self) -> DictionaryValue {
        DictionaryValue::Int(i64::from(self))
    }

    fn from_dictionary(value: &DictionaryValue) -> Option<Self> {
        match value {
            DictionaryValue::Int(v) => Self::try_from(*v).ok(),
            _ => None,
        }
    }

    fn emit(self, dest: &mut DataDestination, working: &mut WorkingBuffer) {
        primitives::encode_signed(dest, working, i64::from(self));
    }

    fn emit_nullable(
        self,
        dest: &mut DataDestination,
        working: &mut WorkingBuffer,
        name: &str,
    ) -> Result<()> {
        primitives::encode_signed_nullable(dest, working, Some(i64::from(self)), name)
    }

    fn parse(data: &[u8], offset: &mut usize, name: &str) -> Result<Self> {
        let raw = primitives::decode_signed(data, offset)?;
        Self::try_from(raw).map_err(|_| out_of_range(name, "value exceeds 32 bits"))
    }

    fn parse_nullable(data: &[u8], offset: &mut usize, name: &str) -> Result<Option<Self>> {
        match primitives::decode_signed_nullable(data, offset)? {
            None => Ok(None),
            Some(raw) => Self::try_from(raw)
                .map(Some)
                .map_err(|_| out_of_range(name, "value exceeds 32 bits")),
        }
    }

    fn delta_from(self, base: Self, _name: &str) -> Result<i64> {
        Ok(i64::from(self) - i64::from(base))
    }

    fn apply_delta(base: Self, delta: i64, name: &str) -> Result<Self> {
        Self::try_from(i64::from(base) + delta)
            .map_err(|_| out_of_range(name, "delta lands outside the 32-bit signed range"))
    }

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn zero() -> Self {
        0
    }
}

/// Encodes an integer field read from the accessor.
pub(crate) fn encode_integer<T: IntegerField>(
    instruction: &ScalarInstruction<T>,
    dest: &mut DataDestination,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
    accessor: &dyn crate::accessor::MessageAccessor,
) -> Result<()> {
    let value = T::read(accessor, instruction.identity())?;
    encode_integer_value(instruction, value, dest, pmap, ctx)
}

/// Encodes an integer field with an externally supplied value; also drives
/// sequence length fields.
pub(crate) fn encode_integer_value<T: IntegerField>(
    instruction: &ScalarInstruction<T>,
    value: Option<T>,
    dest: &mut DataDestination,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<()> {
    let identity = instruction.identity();
    let name = identity.name();
    let optional = instruction.presence().is_optional();
    let scope = instruction.scope();

    match instruction.operator() {
        Operator::None => match value {
            Some(v) if optional => v.emit_nullable(dest, ctx.working_mut(), name),
            Some(v) => {
                v.emit(dest, ctx.working_mut());
                Ok(())
            }
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Constant => {
            let constant = instruction
                .initial()
                .copied()
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            match value {
                Some(v) => {
                    if v != constant {
                        return Err(FastError::constant_mismatch(name));
                    }
                    if optional {
                        pmap.set_next(true)?;
                    }
                    Ok(())
                }
                None if optional => pmap.set_next(false),
                None => Err(required(name)),
            }
        }
        Operator::Default => {
            let initial = instruction.initial().copied();
            match value {
                Some(v) if initial == Some(v) => pmap.set_next(false),
                Some(v) => {
                    pmap.set_next(true)?;
                    if optional {
                        v.emit_nullable(dest, ctx.working_mut(), name)
                    } else {
                        v.emit(dest, ctx.working_mut());
                        Ok(())
                    }
                }
                None if optional => {
                    if initial.is_none() {
                        pmap.set_next(false)
                    } else {
                        pmap.set_next(true)?;
                        primitives::encode_null(dest);
                        Ok(())
                    }
                }
                None if initial.is_some() => pmap.set_next(false),
                None => Err(required(name)),
            }
        }
        Operator::Copy => {
            let previous = ctx.dictionary_get(scope, identity);
            match value {
                Some(v) => {
                    let elided = match T::from_dictionary(&previous) {
                        Some(prev) => prev == v,
                        None if previous.is_undefined() => instruction.initial().copied() == Some(v),
                        None => false,
                    };
                    if elided {
                        pmap.set_next(false)?;
                    } else {
                        pmap.set_next(true)?;
                        if optional {
                            v.emit_nullable(dest, ctx.working_mut(), name)?;
                        } else {
                            v.emit(dest, ctx.working_mut());
                        }
                    }
                    ctx.dictionary_set(scope, identity, v.to_dictionary());
                    Ok(())
                }
                None if optional => {
                    encode_null_with_state(&previous, instruction.initial().is_some(), dest, pmap)?;
                    ctx.dictionary_set(scope, identity, DictionaryValue::Empty);
                    Ok(())
                }
                None => Err(required(name)),
            }
        }
        Operator::Increment => {
            let previous = ctx.dictionary_get(scope, identity);
            match value {
                Some(v) => {
                    let elided = match T::from_dictionary(&previous) {
                        Some(prev) => prev.successor() == Some(v),
                        None if previous.is_undefined() => instruction.initial().copied() == Some(v),
                        None => false,
                    };
                    if elided {
                        pmap.set_next(false)?;
                    } else {
                        pmap.set_next(true)?;
                        if optional {
                            v.emit_nullable(dest, ctx.working_mut(), name)?;
                        } else {
                            v.emit(dest, ctx.working_mut());
                        }
                    }
                    ctx.dictionary_set(scope, identity, v.to_dictionary());
                    Ok(())
                }
                None if optional => {
                    encode_null_with_state(&previous, instruction.initial().is_some(), dest, pmap)?;
                    ctx.dictionary_set(scope, identity, DictionaryValue::Empty);
                    Ok(())
                }
                None => Err(required(name)),
            }
        }
        Operator::Delta => match value {
            Some(v) => {
                let previous = ctx.dictionary_get(scope, identity);
                let base = T::from_dictionary(&previous)
                    .or_else(|| instruction.initial().copied())
                    .unwrap_or_else(T::zero);
                let delta = v.delta_from(base, name)?;
                if optional {
                    primitives::encode_signed_nullable(dest, ctx.working_mut(), Some(delta), name)?;
                } else {
                    primitives::encode_signed(dest, ctx.working_mut(), delta);
                }
                ctx.dictionary_set(scope, identity, v.to_dictionary());
                Ok(())
            }
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Tail => Err(FastError::usage(format!(
            "tail operator is not defined for integer field {name}"
        ))),
    }
}

/// Shared null handling for copy and increment: elide when the entry is
/// already null or there is nothing the decoder would substitute.
fn encode_null_with_state(
    previous: &DictionaryValue,
    has_initial: bool,
    dest: &mut DataDestination,
    pmap: &mut PresenceMap,
) -> Result<()> {
    let elided = previous.is_empty() || (previous.is_undefined() && !has_initial);
    if elided {
        pmap.set_next(false)?;
    } else {
        pmap.set_next(true)?;
        primitives::encode_null(dest);
    }
    Ok(())
}

/// Decodes an integer field, returning `None` for absent optional values.
pub(crate) fn decode_integer_value<T: IntegerField>(
    instruction: &ScalarInstruction<T>,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<Option<T>> {
    let identity = instruction.identity();
    let name = identity.name();
    let optional = instruction.presence().is_optional();
    let scope = instruction.scope();

    match instruction.operator() {
        Operator::None => {
            if optional {
                T::parse_nullable(data, offset, name)
            } else {
                T::parse(data, offset, name).map(Some)
            }
        }
        Operator::Constant => {
            let constant = instruction
                .initial()
                .copied()
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(constant))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                if optional {
                    T::parse_nullable(data, offset, name)
                } else {
                    T::parse(data, offset, name).map(Some)
                }
            } else {
                let initial = instruction.initial().copied();
                match initial {
                    Some(v) => Ok(Some(v)),
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = if optional {
                    T::parse_nullable(data, offset, name)?
                } else {
                    Some(T::parse(data, offset, name)?)
                };
                let entry = match value {
                    Some(v) => v.to_dictionary(),
                    None => DictionaryValue::Empty,
                };
                ctx.dictionary_set(scope, identity, entry);
                Ok(value)
            } else {
                let previous = ctx.dictionary_get(scope, identity);
                if let Some(prev) = T::from_dictionary(&previous) {
                    return Ok(Some(prev));
                }
                if previous.is_empty() {
                    return if optional { Ok(None) } else { Err(required(name)) };
                }
                match instruction.initial().copied() {
                    Some(v) => {
                        ctx.dictionary_set(scope, identity, v.to_dictionary());
                        Ok(Some(v))
                    }
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Increment => {
            if pmap.next_bit() {
                let value = if optional {
                    T::parse_nullable(data, offset, name)?
                } else {
                    Some(T::parse(data, offset, name)?)
                };
                let entry = match value {
                    Some(v) => v.to_dictionary(),
                    None => DictionaryValue::Empty,
                };
                ctx.dictionary_set(scope, identity, entry);
                Ok(value)
            } else {
                let previous = ctx.dictionary_get(scope, identity);
                if let Some(prev) = T::from_dictionary(&previous) {
                    let next = prev
                        .successor()
                        .ok_or_else(|| out_of_range(name, "increment overflows the type"))?;
                    ctx.dictionary_set(scope, identity, next.to_dictionary());
                    return Ok(Some(next));
                }
                if previous.is_empty() {
                    return if optional { Ok(None) } else { Err(required(name)) };
                }
                match instruction.initial().copied() {
                    Some(v) => {
                        ctx.dictionary_set(scope, identity, v.to_dictionary());
                        Ok(Some(v))
                    }
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Delta => {
            let delta = if optional {
                match primitives::decode_signed_nullable(data, offset)? {
                    None => return Ok(None),
                    Some(d) => d,
                }
            } else {
                primitives::decode_signed(data, offset)?
            };
            let previous = ctx.dictionary_get(scope, identity);
            let base = T::from_dictionary(&previous)
                .or_else(|| instruction.initial().copied())
                .unwrap_or_else(T::zero);
            let value = T::apply_delta(base, delta, name)?;
            ctx.dictionary_set(scope, identity, value.to_dictionary());
            Ok(Some(value))
        }
        Operator::Tail => Err(FastError::usage(format!(
            "tail operator is not defined for integer field {name}"
        ))),
    }
}

/// Wire form of a vector (string or byte) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VectorMode {
    /// Stop-bit terminated characters (ASCII strings).
    AsciiStopBit,
    /// Stop-bit length followed by raw bytes (Unicode strings, byte vectors).
    LengthPrefixed,
}

/// Flattened view of a string or byte vector instruction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VectorField<'a> {
    pub identity: &'a FieldIdentity,
    pub presence: Presence,
    pub operator: Operator,
    pub scope: DictionaryScope,
    pub initial: Option<&'a [u8]>,
    pub mode: VectorMode,
    /// Dictionary entries are strings rather than byte values.
    pub text: bool,
}

impl<'a> VectorField<'a> {
    pub(crate) fn from_text(instruction: &'a ScalarInstruction<String>, mode: VectorMode) -> Self {
        Self {
            identity: instruction.identity(),
            presence: instruction.presence(),
            operator: instruction.operator(),
            scope: instruction.scope(),
            initial: instruction.initial().map(String::as_bytes),
            mode,
            text: true,
        }
    }

    pub(crate) fn from_bytes(instruction: &'a ScalarInstruction<Bytes>) -> Self {
        Self {
            identity: instruction.identity(),
            presence: instruction.presence(),
            operator: instruction.operator(),
            scope: instruction.scope(),
            initial: instruction.initial().map(|b| b.as_ref()),
            mode: VectorMode::LengthPrefixed,
            text: false,
        }
    }

    fn dictionary_value(&self, bytes: &[u8]) -> Result<DictionaryValue> {
        if self.text {
            let s = std::str::from_utf8(bytes).map_err(|_| FastError::InvalidString)?;
            Ok(DictionaryValue::String(s.to_string()))
        } else {
            Ok(DictionaryValue::Bytes(Bytes::copy_from_slice(bytes)))
        }
    }

    fn previous_bytes<'d>(&self, previous: &'d DictionaryValue) -> Option<&'d [u8]> {
        match (previous, self.text) {
            (DictionaryValue::String(s), true) => Some(s.as_bytes()),
            (DictionaryValue::Bytes(b), false) => Some(b),
            _ => None,
        }
    }
}

fn emit_vector(
    dest: &mut DataDestination,
    working: &mut WorkingBuffer,
    bytes: &[u8],
    mode: VectorMode,
    nullable: bool,
) {
    match (mode, nullable) {
        (VectorMode::AsciiStopBit, false) => primitives::encode_ascii(dest, bytes),
        (VectorMode::AsciiStopBit, true) => primitives::encode_ascii_nullable(dest, Some(bytes)),
        (VectorMode::LengthPrefixed, false) => primitives::encode_byte_vector(dest, working, bytes),
        (VectorMode::LengthPrefixed, true) => {
            primitives::encode_byte_vector_nullable(dest, working, Some(bytes));
        }
    }
}

fn read_vector(
    data: &[u8],
    offset: &mut usize,
    mode: VectorMode,
    nullable: bool,
) -> Result<Option<Vec<u8>>> {
    match (mode, nullable) {
        (VectorMode::AsciiStopBit, false) => primitives::decode_ascii(data, offset).map(Some),
        (VectorMode::AsciiStopBit, true) => primitives::decode_ascii_nullable(data, offset),
        (VectorMode::LengthPrefixed, false) => {
            primitives::decode_byte_vector(data, offset).map(Some)
        }
        (VectorMode::LengthPrefixed, true) => primitives::decode_byte_vector_nullable(data, offset),
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Encodes a string or byte vector field.
pub(crate) fn encode_vector_value(
    field: &VectorField<'_>,
    value: Option<&[u8]>,
    dest: &mut DataDestination,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<()> {
    let name = field.identity.name();
    let optional = field.presence.is_optional();

    match field.operator {
        Operator::None => match value {
            Some(v) => {
                emit_vector(dest, ctx.working_mut(), v, field.mode, optional);
                Ok(())
            }
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Constant => {
            let constant = field
                .initial
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            match value {
                Some(v) => {
                    if v != constant {
                        return Err(FastError::constant_mismatch(name));
                    }
                    if optional {
                        pmap.set_next(true)?;
                    }
                    Ok(())
                }
                None if optional => pmap.set_next(false),
                None => Err(required(name)),
            }
        }
        Operator::Default => match value {
            Some(v) if field.initial == Some(v) => pmap.set_next(false),
            Some(v) => {
                pmap.set_next(true)?;
                emit_vector(dest, ctx.working_mut(), v, field.mode, optional);
                Ok(())
            }
            None if optional => {
                if field.initial.is_none() {
                    pmap.set_next(false)
                } else {
                    pmap.set_next(true)?;
                    primitives::encode_null(dest);
                    Ok(())
                }
            }
            None if field.initial.is_some() => pmap.set_next(false),
            None => Err(required(name)),
        },
        Operator::Copy => {
            let previous = ctx.dictionary_get(field.scope, field.identity);
            match value {
                Some(v) => {
                    let elided = match field.previous_bytes(&previous) {
                        Some(prev) => prev == v,
                        None if previous.is_undefined() => field.initial == Some(v),
                        None => false,
                    };
                    if elided {
                        pmap.set_next(false)?;
                    } else {
                        pmap.set_next(true)?;
                        emit_vector(dest, ctx.working_mut(), v, field.mode, optional);
                    }
                    let entry = field.dictionary_value(v)?;
                    ctx.dictionary_set(field.scope, field.identity, entry);
                    Ok(())
                }
                None if optional => {
                    encode_null_with_state(&previous, field.initial.is_some(), dest, pmap)?;
                    ctx.dictionary_set(field.scope, field.identity, DictionaryValue::Empty);
                    Ok(())
                }
                None => Err(required(name)),
            }
        }
        Operator::Delta => match value {
            Some(v) => {
                let previous = ctx.dictionary_get(field.scope, field.identity);
                let base = field
                    .previous_bytes(&previous)
                    .or(field.initial)
                    .unwrap_or(&[]);
                let prefix = common_prefix(base, v);
                let suffix = common_suffix(base, v);
                let (subtraction, diff) = if prefix >= suffix {
                    ((base.len() - prefix) as i64, &v[prefix..])
                } else {
                    (
                        -((base.len() - suffix) as i64) - 1,
                        &v[..v.len() - suffix],
                    )
                };
                if optional {
                    primitives::encode_signed_nullable(
                        dest,
                        ctx.working_mut(),
                        Some(subtraction),
                        name,
                    )?;
                } else {
                    primitives::encode_signed(dest, ctx.working_mut(), subtraction);
                }
                emit_vector(dest, ctx.working_mut(), diff, field.mode, false);
                let entry = field.dictionary_value(v)?;
                ctx.dictionary_set(field.scope, field.identity, entry);
                Ok(())
            }
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Tail => {
            let previous = ctx.dictionary_get(field.scope, field.identity);
            match value {
                Some(v) => {
                    let base = field
                        .previous_bytes(&previous)
                        .or(field.initial)
                        .unwrap_or(&[]);
                    if base == v {
                        pmap.set_next(false)?;
                    } else {
                        pmap.set_next(true)?;
                        let tail = if v.len() == base.len() {
                            &v[common_prefix(base, v)..]
                        } else {
                            v
                        };
                        emit_vector(dest, ctx.working_mut(), tail, field.mode, optional);
                    }
                    let entry = field.dictionary_value(v)?;
                    ctx.dictionary_set(field.scope, field.identity, entry);
                    Ok(())
                }
                None if optional => {
                    encode_null_with_state(&previous, field.initial.is_some(), dest, pmap)?;
                    ctx.dictionary_set(field.scope, field.identity, DictionaryValue::Empty);
                    Ok(())
                }
                None => Err(required(name)),
            }
        }
        Operator::Increment => Err(FastError::usage(format!(
            "increment operator is not defined for field {name}"
        ))),
    }
}

/// Decodes a string or byte vector field.
pub(crate) fn decode_vector_value(
    field: &VectorField<'_>,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<Option<Vec<u8>>> {
    let name = field.identity.name();
    let optional = field.presence.is_optional();

    match field.operator {
        Operator::None => read_vector(data, offset, field.mode, optional),
        Operator::Constant => {
            let constant = field
                .initial
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(constant.to_vec()))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                read_vector(data, offset, field.mode, optional)
            } else {
                match field.initial {
                    Some(v) => Ok(Some(v.to_vec())),
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = read_vector(data, offset, field.mode, optional)?;
                let entry = match &value {
                    Some(v) => field.dictionary_value(v)?,
                    None => DictionaryValue::Empty,
                };
                ctx.dictionary_set(field.scope, field.identity, entry);
                Ok(value)
            } else {
                let previous = ctx.dictionary_get(field.scope, field.identity);
                if let Some(prev) = field.previous_bytes(&previous) {
                    return Ok(Some(prev.to_vec()));
                }
                if previous.is_empty() {
                    return if optional { Ok(None) } else { Err(required(name)) };
                }
                match field.initial {
                    Some(v) => {
                        let entry = field.dictionary_value(v)?;
                        ctx.dictionary_set(field.scope, field.identity, entry);
                        Ok(Some(v.to_vec()))
                    }
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Delta => {
            let subtraction = if optional {
                match primitives::decode_signed_nullable(data, offset)? {
                    None => return Ok(None),
                    Some(s) => s,
                }
            } else {
                primitives::decode_signed(data, offset)?
            };
            let diff = read_vector(data, offset, field.mode, false)?
                .unwrap_or_default();
            let previous = ctx.dictionary_get(field.scope, field.identity);
            let base = field
                .previous_bytes(&previous)
                .or(field.initial)
                .unwrap_or(&[]);
            let value = apply_subtraction(base, subtraction, &diff, name)?;
            let entry = field.dictionary_value(&value)?;
            ctx.dictionary_set(field.scope, field.identity, entry);
            Ok(Some(value))
        }
        Operator::Tail => {
            if pmap.next_bit() {
                let tail = read_vector(data, offset, field.mode, optional)?;
                match tail {
                    None => {
                        ctx.dictionary_set(field.scope, field.identity, DictionaryValue::Empty);
                        Ok(None)
                    }
                    Some(tail) => {
                        let previous = ctx.dictionary_get(field.scope, field.identity);
                        let base = field
                            .previous_bytes(&previous)
                            .or(field.initial)
                            .unwrap_or(&[]);
                        let value = if tail.len() >= base.len() {
                            tail
                        } else {
                            let mut value = base[..base.len() - tail.len()].to_vec();
                            value.extend_from_slice(&tail);
                            value
                        };
                        let entry = field.dictionary_value(&value)?;
                        ctx.dictionary_set(field.scope, field.identity, entry);
                        Ok(Some(value))
                    }
                }
            } else {
                let previous = ctx.dictionary_get(field.scope, field.identity);
                if let Some(prev) = field.previous_bytes(&previous) {
                    return Ok(Some(prev.to_vec()));
                }
                if previous.is_empty() {
                    return if optional { Ok(None) } else { Err(required(name)) };
                }
                match field.initial {
                    Some(v) => {
                        let entry = field.dictionary_value(v)?;
                        ctx.dictionary_set(field.scope, field.identity, entry);
                        Ok(Some(v.to_vec()))
                    }
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Increment => Err(FastError::usage(format!(
            "increment operator is not defined for field {name}"
        ))),
    }
}

fn apply_subtraction(base: &[u8], subtraction: i64, diff: &[u8], name: &str) -> Result<Vec<u8>> {
    if subtraction >= 0 {
        let removed = usize::try_from(subtraction).map_err(|_| {
            FastError::TemplateInvariantViolated {
                reason: format!("invalid subtraction length for {name}"),
            }
        })?;
        if removed > base.len() {
            return Err(FastError::TemplateInvariantViolated {
                reason: format!("invalid subtraction length for {name}"),
            });
        }
        let mut value = base[..base.len() - removed].to_vec();
        value.extend_from_slice(diff);
        Ok(value)
    } else {
        let removed = subtraction
            .checked_neg()
            .and_then(|v| v.checked_sub(1))
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| FastError::TemplateInvariantViolated {
                reason: format!("invalid subtraction length for {name}"),
            })?;
        if removed > base.len() {
            return Err(FastError::TemplateInvariantViolated {
                reason: format!("invalid subtraction length for {name}"),
            });
        }
        let mut value = diff.to_vec();
        value.extend_from_slice(&base[removed..]);
        Ok(value)
    }
}

fn check_exponent(value: Decimal, name: &str) -> Result<()> {
    if (-64..=63).contains(&value.exponent()) {
        Ok(())
    } else {
        Err(out_of_range(name, "decimal exponent outside [-64, 63]"))
    }
}

fn emit_decimal(
    dest: &mut DataDestination,
    working: &mut WorkingBuffer,
    value: Decimal,
    nullable: bool,
    name: &str,
) -> Result<()> {
    check_exponent(value, name)?;
    if nullable {
        primitives::encode_signed_nullable(dest, working, Some(i64::from(value.exponent())), name)?;
    } else {
        primitives::encode_signed(dest, working, i64::from(value.exponent()));
    }
    primitives::encode_signed(dest, working, value.mantissa());
    Ok(())
}

fn read_decimal(data: &[u8], offset: &mut usize, nullable: bool, name: &str) -> Result<Option<Decimal>> {
    let exponent = if nullable {
        match primitives::decode_signed_nullable(data, offset)? {
            None => return Ok(None),
            Some(e) => e,
        }
    } else {
        primitives::decode_signed(data, offset)?
    };
    let exponent = i32::try_from(exponent)
        .map_err(|_| out_of_range(name, "decimal exponent outside [-64, 63]"))?;
    let mantissa = primitives::decode_signed(data, offset)?;
    Ok(Some(Decimal::new(mantissa, exponent)))
}

/// Encodes a decimal field with an externally supplied value.
pub(crate) fn encode_decimal_value(
    instruction: &ScalarInstruction<Decimal>,
    value: Option<Decimal>,
    dest: &mut DataDestination,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<()> {
    let identity = instruction.identity();
    let name = identity.name();
    let optional = instruction.presence().is_optional();
    let scope = instruction.scope();

    match instruction.operator() {
        Operator::None => match value {
            Some(v) => emit_decimal(dest, ctx.working_mut(), v, optional, name),
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Constant => {
            let constant = instruction
                .initial()
                .copied()
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            match value {
                Some(v) => {
                    if v != constant {
                        return Err(FastError::constant_mismatch(name));
                    }
                    if optional {
                        pmap.set_next(true)?;
                    }
                    Ok(())
                }
                None if optional => pmap.set_next(false),
                None => Err(required(name)),
            }
        }
        Operator::Default => {
            let initial = instruction.initial().copied();
            match value {
                Some(v) if initial == Some(v) => pmap.set_next(false),
                Some(v) => {
                    pmap.set_next(true)?;
                    emit_decimal(dest, ctx.working_mut(), v, optional, name)
                }
                None if optional => {
                    if initial.is_none() {
                        pmap.set_next(false)
                    } else {
                        pmap.set_next(true)?;
                        primitives::encode_null(dest);
                        Ok(())
                    }
                }
                None if initial.is_some() => pmap.set_next(false),
                None => Err(required(name)),
            }
        }
        Operator::Copy => {
            let previous = ctx.dictionary_get(scope, identity);
            match value {
                Some(v) => {
                    let elided = match previous {
                        DictionaryValue::Decimal(prev) => prev == v,
                        DictionaryValue::Undefined => instruction.initial().copied() == Some(v),
                        _ => false,
                    };
                    if elided {
                        pmap.set_next(false)?;
                    } else {
                        pmap.set_next(true)?;
                        emit_decimal(dest, ctx.working_mut(), v, optional, name)?;
                    }
                    ctx.dictionary_set(scope, identity, DictionaryValue::Decimal(v));
                    Ok(())
                }
                None if optional => {
                    encode_null_with_state(&previous, instruction.initial().is_some(), dest, pmap)?;
                    ctx.dictionary_set(scope, identity, DictionaryValue::Empty);
                    Ok(())
                }
                None => Err(required(name)),
            }
        }
        Operator::Delta => match value {
            Some(v) => {
                check_exponent(v, name)?;
                let previous = ctx.dictionary_get(scope, identity);
                let base = match previous {
                    DictionaryValue::Decimal(prev) => prev,
                    _ => instruction.initial().copied().unwrap_or_default(),
                };
                let exponent_delta = i64::from(v.exponent()) - i64::from(base.exponent());
                let mantissa_delta = v
                    .mantissa()
                    .checked_sub(base.mantissa())
                    .ok_or_else(|| out_of_range(name, "mantissa delta exceeds 64 bits"))?;
                if optional {
                    primitives::encode_signed_nullable(
                        dest,
                        ctx.working_mut(),
                        Some(exponent_delta),
                        name,
                    )?;
                } else {
                    primitives::encode_signed(dest, ctx.working_mut(), exponent_delta);
                }
                primitives::encode_signed(dest, ctx.working_mut(), mantissa_delta);
                ctx.dictionary_set(scope, identity, DictionaryValue::Decimal(v));
                Ok(())
            }
            None if optional => {
                primitives::encode_null(dest);
                Ok(())
            }
            None => Err(required(name)),
        },
        Operator::Increment | Operator::Tail => Err(FastError::usage(format!(
            "operator is not defined for decimal field {name}"
        ))),
    }
}

/// Decodes a decimal field, returning `None` for absent optional values.
pub(crate) fn decode_decimal_value(
    instruction: &ScalarInstruction<Decimal>,
    data: &[u8],
    offset: &mut usize,
    pmap: &mut PresenceMap,
    ctx: &mut Context,
) -> Result<Option<Decimal>> {
    let identity = instruction.identity();
    let name = identity.name();
    let optional = instruction.presence().is_optional();
    let scope = instruction.scope();

    match instruction.operator() {
        Operator::None => read_decimal(data, offset, optional, name),
        Operator::Constant => {
            let constant = instruction
                .initial()
                .copied()
                .ok_or_else(|| FastError::usage(format!("constant field {name} has no value")))?;
            if optional && !pmap.next_bit() {
                Ok(None)
            } else {
                Ok(Some(constant))
            }
        }
        Operator::Default => {
            if pmap.next_bit() {
                read_decimal(data, offset, optional, name)
            } else {
                match instruction.initial().copied() {
                    Some(v) => Ok(Some(v)),
                    None if optional => Ok(None),
                    None => Err(required(name)),
                }
            }
        }
        Operator::Copy => {
            if pmap.next_bit() {
                let value = read_decimal(data, offset, optional, name)?;
                let entry = match value {
                    Some(v) => DictionaryValue::Decimal(v),
                    None => DictionaryValue::Empty,
                };
                ctx.dictionary_set(scope, identity, entry);
                Ok(value)
            } else {
                let previous = ctx.dictionary_get(scope, identity);
                match previous {
                    DictionaryValue::Decimal(prev) => Ok(Some(prev)),
                    DictionaryValue::Empty => {
                        if optional {
                            Ok(None)
                        } else {
                            Err(required(name))
                        }
                    }
                    _ => match instruction.initial().copied() {
                        Some(v) => {
                            ctx.dictionary_set(scope, identity, DictionaryValue::Decimal(v));
                            Ok(Some(v))
                        }
                        None if optional => Ok(None),
                        None => Err(required(name)),
                    },
                }
            }
        }
        Operator::Delta => {
            let exponent_delta = if optional {
                match primitives::decode_signed_nullable(data, offset)? {
                    None => return Ok(None),
                    Some(d) => d,
                }
            } else {
                primitives::decode_signed(data, offset)?
            };
            let mantissa_delta = primitives::decode_signed(data, offset)?;
            let previous = ctx.dictionary_get(scope, identity);
            let base = match previous {
                DictionaryValue::Decimal(prev) => prev,
                _ => instruction.initial().copied().unwrap_or_default(),
            };
            let exponent = i32::try_from(i64::from(base.exponent()) + exponent_delta)
                .map_err(|_| out_of_range(name, "decimal exponent outside [-64, 63]"))?;
            let mantissa = base
                .mantissa()
                .checked_add(mantissa_delta)
                .ok_or_else(|| out_of_range(name, "mantissa delta exceeds 64 bits"))?;
            let value = Decimal::new(mantissa, exponent);
            ctx.dictionary_set(scope, identity, DictionaryValue::Decimal(value));
            Ok(Some(value))
        }
        Operator::Increment | Operator::Tail => Err(FastError::usage(format!(
            "operator is not defined for decimal field {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcast_templates::TemplateRegistryBuilder;
    use std::sync::Arc;

    fn context() -> Context {
        Context::new(Arc::new(TemplateRegistryBuilder::new().build().unwrap()))
    }

    fn copy_u32(name: &str) -> ScalarInstruction<u32> {
        ScalarInstruction::new(FieldIdentity::new(name), Presence::Mandatory, Operator::Copy)
    }

    fn encode_once<T: IntegerField>(
        instruction: &ScalarInstruction<T>,
        value: Option<T>,
        ctx: &mut Context,
        pmap: &mut PresenceMap,
    ) -> Vec<u8> {
        let mut dest = DataDestination::new();
        encode_integer_value(instruction, value, &mut dest, pmap, ctx).unwrap();
        dest.pending_bytes().to_vec()
    }

    #[test]
    fn test_copy_elides_repeated_value() {
        let instruction = copy_u32("price");
        let mut ctx = context();

        let mut pmap = PresenceMap::new(1);
        let first = encode_once(&instruction, Some(1000), &mut ctx, &mut pmap);
        assert_eq!(first, vec![0x07, 0xe8]);
        assert_eq!(pmap.bits_used(), 1);

        let mut pmap = PresenceMap::new(1);
        let second = encode_once(&instruction, Some(1000), &mut ctx, &mut pmap);
        assert!(second.is_empty());

        let mut pmap = PresenceMap::new(1);
        let third = encode_once(&instruction, Some(1001), &mut ctx, &mut pmap);
        assert_eq!(third, vec![0x07, 0xe9]);
    }

    #[test]
    fn test_copy_against_initial_value() {
        let instruction = copy_u32("price").with_initial(1000);
        let mut ctx = context();

        let mut pmap = PresenceMap::new(1);
        let bytes = encode_once(&instruction, Some(1000), &mut ctx, &mut pmap);
        assert!(bytes.is_empty());
        assert!(!{
            let mut p = pmap.clone();
            p.next_bit()
        });
    }

    #[test]
    fn test_increment_elides_successor() {
        let instruction = ScalarInstruction::<u64>::new(
            FieldIdentity::new("seq"),
            Presence::Mandatory,
            Operator::Increment,
        );
        let mut ctx = context();

        let mut pmap = PresenceMap::new(1);
        let first = encode_once(&instruction, Some(10), &mut ctx, &mut pmap);
        assert_eq!(first, vec![0x8a]);

        let mut pmap = PresenceMap::new(1);
        let second = encode_once(&instruction, Some(11), &mut ctx, &mut pmap);
        assert!(second.is_empty());

        let mut pmap = PresenceMap::new(1);
        let skipped = encode_once(&instruction, Some(20), &mut ctx, &mut pmap);
        assert_eq!(skipped, vec![0x94]);
    }

    #[test]
    fn test_delta_uses_previous_as_base() {
        let instruction = ScalarInstruction::<i64>::new(
            FieldIdentity::new("px"),
            Presence::Mandatory,
            Operator::Delta,
        );
        let mut ctx = context();

        let mut pmap = PresenceMap::new(0);
        let first = encode_once(&instruction, Some(100), &mut ctx, &mut pmap);
        // delta from zero
        assert_eq!(first, vec![0x00, 0xe4]);
        assert_eq!(pmap.bits_used(), 0);

        let mut pmap = PresenceMap::new(0);
        let second = encode_once(&instruction, Some(98), &mut ctx, &mut pmap);
        assert_eq!(second, vec![0xfe]);
    }

    #[test]
    fn test_mandatory_absent_is_rejected() {
        let instruction = copy_u32("price");
        let mut ctx = context();
        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(1);
        let err = encode_integer_value(&instruction, None, &mut dest, &mut pmap, &mut ctx);
        assert!(matches!(err, Err(FastError::FieldRequiredButAbsent { .. })));
    }

    #[test]
    fn test_optional_copy_null_states() {
        let instruction = ScalarInstruction::<u32>::new(
            FieldIdentity::new("qty"),
            Presence::Optional,
            Operator::Copy,
        );
        let mut ctx = context();

        // dictionary undefined, no initial: absent stays off the wire
        let mut pmap = PresenceMap::new(1);
        let first = encode_once(&instruction, None, &mut ctx, &mut pmap);
        assert!(first.is_empty());

        // now a value, then null again: null token goes on the wire
        let mut pmap = PresenceMap::new(1);
        let _ = encode_once(&instruction, Some(5), &mut ctx, &mut pmap);
        let mut pmap = PresenceMap::new(1);
        let null = encode_once(&instruction, None, &mut ctx, &mut pmap);
        assert_eq!(null, vec![0x80]);
    }

    #[test]
    fn test_integer_copy_decode_mirrors_encode() {
        let instruction = copy_u32("price");
        let mut encode_ctx = context();
        let mut decode_ctx = context();

        for value in [1000u32, 1000, 1001, 7] {
            let mut pmap = PresenceMap::new(1);
            let bytes = encode_once(&instruction, Some(value), &mut encode_ctx, &mut pmap);
            let mut offset = 0;
            let decoded =
                decode_integer_value(&instruction, &bytes, &mut offset, &mut pmap, &mut decode_ctx)
                    .unwrap();
            assert_eq!(decoded, Some(value));
            assert_eq!(offset, bytes.len());
        }
    }

    #[test]
    fn test_string_delta_roundtrip() {
        let instruction = ScalarInstruction::<String>::new(
            FieldIdentity::new("sym"),
            Presence::Mandatory,
            Operator::Delta,
        );
        let mut encode_ctx = context();
        let mut decode_ctx = context();

        for value in ["GEH6", "GEM6", "GEM7", "AEM7"] {
            let field = VectorField::from_text(&instruction, VectorMode::AsciiStopBit);
            let mut dest = DataDestination::new();
            let mut pmap = PresenceMap::new(0);
            encode_vector_value(
                &field,
                Some(value.as_bytes()),
                &mut dest,
                &mut pmap,
                &mut encode_ctx,
            )
            .unwrap();
            let bytes = dest.pending_bytes().to_vec();

            let mut offset = 0;
            let decoded =
                decode_vector_value(&field, &bytes, &mut offset, &mut pmap, &mut decode_ctx)
                    .unwrap();
            assert_eq!(decoded.as_deref(), Some(value.as_bytes()));
        }
    }

    #[test]
    fn test_string_tail_suffix_only() {
        let instruction = ScalarInstruction::<String>::new(
            FieldIdentity::new("sym"),
            Presence::Mandatory,
            Operator::Tail,
        );
        let mut ctx = context();
        let field = VectorField::from_text(&instruction, VectorMode::AsciiStopBit);

        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(1);
        encode_vector_value(&field, Some(b"GEH6"), &mut dest, &mut pmap, &mut ctx).unwrap();
        // first time: whole value
        assert_eq!(dest.pending_bytes().to_vec(), vec![0x47, 0x45, 0x48, 0xb6]);

        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(1);
        encode_vector_value(&field, Some(b"GEM6"), &mut dest, &mut pmap, &mut ctx).unwrap();
        // same length: only the differing suffix
        assert_eq!(dest.pending_bytes().to_vec(), vec![0x4d, 0xb6]);

        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(1);
        encode_vector_value(&field, Some(b"GEM6"), &mut dest, &mut pmap, &mut ctx).unwrap();
        // unchanged: elided entirely
        assert!(dest.pending_bytes().is_empty());
        let mut check = pmap;
        assert!(!check.next_bit());
    }

    #[test]
    fn test_constant_mismatch_is_rejected() {
        let instruction = ScalarInstruction::<u32>::new(
            FieldIdentity::new("ver"),
            Presence::Mandatory,
            Operator::Constant,
        )
        .with_initial(5);
        let mut ctx = context();
        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(0);
        let err = encode_integer_value(&instruction, Some(6), &mut dest, &mut pmap, &mut ctx);
        assert!(matches!(
            err,
            Err(FastError::TemplateInvariantViolated { .. })
        ));
    }

    #[test]
    fn test_decimal_copy_roundtrip() {
        let instruction = ScalarInstruction::<Decimal>::new(
            FieldIdentity::new("px"),
            Presence::Mandatory,
            Operator::Copy,
        );
        let mut encode_ctx = context();
        let mut decode_ctx = context();

        for value in [
            Decimal::new(9415, -2),
            Decimal::new(9415, -2),
            Decimal::new(-3, 4),
        ] {
            let mut dest = DataDestination::new();
            let mut pmap = PresenceMap::new(1);
            encode_decimal_value(&instruction, Some(value), &mut dest, &mut pmap, &mut encode_ctx)
                .unwrap();
            let bytes = dest.pending_bytes().to_vec();

            let mut offset = 0;
            let decoded =
                decode_decimal_value(&instruction, &bytes, &mut offset, &mut pmap, &mut decode_ctx)
                    .unwrap();
            assert_eq!(decoded, Some(value));
        }
    }

    #[test]
    fn test_decimal_exponent_range_enforced() {
        let instruction = ScalarInstruction::<Decimal>::new(
            FieldIdentity::new("px"),
            Presence::Mandatory,
            Operator::None,
        );
        let mut ctx = context();
        let mut dest = DataDestination::new();
        let mut pmap = PresenceMap::new(0);
        let err = encode_decimal_value(
            &instruction,
            Some(Decimal::new(1, 70)),
            &mut dest,
            &mut pmap,
            &mut ctx,
        );
        assert!(matches!(err, Err(FastError::ValueOutOfRange { .. })));
    }
}
