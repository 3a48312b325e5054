/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Field instructions.
//!
//! A [`FieldInstruction`] pairs a primitive type with a transfer operator and
//! a field identity. Scalar instructions carry an operator-specific initial
//! value; group and sequence instructions carry a nested segment body.

use crate::operator::{DictionaryScope, Operator};
use crate::template::SegmentBody;
use bytes::Bytes;
use fastcast_core::{Decimal, FastError, FieldIdentity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Whether a field must be present in application data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Presence {
    /// The field is required.
    #[default]
    Mandatory,
    /// The field may be absent; absence is encoded as null where needed.
    Optional,
}

impl Presence {
    /// Returns true for [`Presence::Mandatory`].
    #[inline]
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::Mandatory)
    }

    /// Returns true for [`Presence::Optional`].
    #[inline]
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Optional)
    }
}

/// A scalar field instruction: identity, presence, operator, dictionary
/// scope, and an operator-specific initial value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarInstruction<T> {
    identity: FieldIdentity,
    presence: Presence,
    operator: Operator,
    scope: DictionaryScope,
    initial: Option<T>,
}

impl<T> ScalarInstruction<T> {
    /// Creates a scalar instruction with no initial value and global scope.
    ///
    /// # Arguments
    /// * `identity` - The field identity
    /// * `presence` - Whether the field is mandatory
    /// * `operator` - The transfer operator
    #[must_use]
    pub fn new(identity: FieldIdentity, presence: Presence, operator: Operator) -> Self {
        Self {
            identity,
            presence,
            operator,
            scope: DictionaryScope::Global,
            initial: None,
        }
    }

    /// Sets the operator-specific initial value.
    #[must_use]
    pub fn with_initial(mut self, initial: T) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Sets the dictionary scope.
    #[must_use]
    pub fn with_scope(mut self, scope: DictionaryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Returns the field identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &FieldIdentity {
        &self.identity
    }

    /// Returns the field presence.
    #[inline]
    #[must_use]
    pub const fn presence(&self) -> Presence {
        self.presence
    }

    /// Returns the transfer operator.
    #[inline]
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the dictionary scope.
    #[inline]
    #[must_use]
    pub const fn scope(&self) -> DictionaryScope {
        self.scope
    }

    /// Returns the initial value, if declared.
    #[inline]
    #[must_use]
    pub const fn initial(&self) -> Option<&T> {
        self.initial.as_ref()
    }

    /// Returns true if this instruction claims a presence map bit.
    #[inline]
    #[must_use]
    pub const fn uses_presence_map_bit(&self) -> bool {
        self.operator.uses_presence_map_bit(self.presence)
    }
}

/// A group instruction: a nested segment encoded inline.
#[derive(Debug, Clone)]
pub struct GroupInstruction {
    identity: FieldIdentity,
    presence: Presence,
    body: Arc<SegmentBody>,
}

impl GroupInstruction {
    /// Creates a group instruction.
    ///
    /// # Arguments
    /// * `identity` - The group's field identity
    /// * `presence` - Whether the group is mandatory
    /// * `body` - The instructions making up the group body
    #[must_use]
    pub fn new(identity: FieldIdentity, presence: Presence, body: SegmentBody) -> Self {
        Self {
            identity,
            presence,
            body: Arc::new(body),
        }
    }

    /// Returns the group's field identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &FieldIdentity {
        &self.identity
    }

    /// Returns the group presence.
    #[inline]
    #[must_use]
    pub const fn presence(&self) -> Presence {
        self.presence
    }

    /// Returns the group body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &SegmentBody {
        &self.body
    }
}

/// A sequence instruction: a length field followed by repeated entries.
#[derive(Debug, Clone)]
pub struct SequenceInstruction {
    identity: FieldIdentity,
    presence: Presence,
    length: ScalarInstruction<u32>,
    body: Arc<SegmentBody>,
}

impl SequenceInstruction {
    /// Creates a sequence instruction.
    ///
    /// The length instruction's presence is forced to match the sequence
    /// presence; the length field is what carries optionality on the wire.
    ///
    /// # Arguments
    /// * `identity` - The sequence's field identity
    /// * `presence` - Whether the sequence is mandatory
    /// * `length` - The instruction encoding the entry count
    /// * `body` - The instructions making up each entry
    #[must_use]
    pub fn new(
        identity: FieldIdentity,
        presence: Presence,
        length: ScalarInstruction<u32>,
        body: SegmentBody,
    ) -> Self {
        let length = ScalarInstruction {
            presence,
            ..length
        };
        Self {
            identity,
            presence,
            length,
            body: Arc::new(body),
        }
    }

    /// Returns the sequence's field identity.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &FieldIdentity {
        &self.identity
    }

    /// Returns the sequence presence.
    #[inline]
    #[must_use]
    pub const fn presence(&self) -> Presence {
        self.presence
    }

    /// Returns the length instruction.
    #[inline]
    #[must_use]
    pub fn length(&self) -> &ScalarInstruction<u32> {
        &self.length
    }

    /// Returns the per-entry body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &SegmentBody {
        &self.body
    }
}

/// A field instruction: one primitive type paired with its operator logic.
#[derive(Debug, Clone)]
pub enum FieldInstruction {
    /// 32-bit unsigned integer.
    UInt32(ScalarInstruction<u32>),
    /// 64-bit unsigned integer.
    UInt64(ScalarInstruction<u64>),
    /// 32-bit signed integer.
    Int32(ScalarInstruction<i32>),
    /// 64-bit signed integer.
    Int64(ScalarInstruction<i64>),
    /// Decimal (mantissa and exponent).
    Decimal(ScalarInstruction<Decimal>),
    /// ASCII string, stop-bit terminated on the wire.
    Ascii(ScalarInstruction<String>),
    /// Unicode string, length-prefixed UTF-8 on the wire.
    Unicode(ScalarInstruction<String>),
    /// Opaque byte vector, length-prefixed on the wire.
    ByteVector(ScalarInstruction<Bytes>),
    /// Nested group.
    Group(GroupInstruction),
    /// Repeated sequence of entries.
    Sequence(SequenceInstruction),
}

impl FieldInstruction {
    /// Returns the field identity of this instruction.
    #[must_use]
    pub fn identity(&self) -> &FieldIdentity {
        match self {
            Self::UInt32(s) => s.identity(),
            Self::UInt64(s) => s.identity(),
            Self::Int32(s) => s.identity(),
            Self::Int64(s) => s.identity(),
            Self::Decimal(s) => s.identity(),
            Self::Ascii(s) | Self::Unicode(s) => s.identity(),
            Self::ByteVector(s) => s.identity(),
            Self::Group(g) => g.identity(),
            Self::Sequence(s) => s.identity(),
        }
    }

    /// Returns the field presence of this instruction.
    #[must_use]
    pub fn presence(&self) -> Presence {
        match self {
            Self::UInt32(s) => s.presence(),
            Self::UInt64(s) => s.presence(),
            Self::Int32(s) => s.presence(),
            Self::Int64(s) => s.presence(),
            Self::Decimal(s) => s.presence(),
            Self::Ascii(s) | Self::Unicode(s) => s.presence(),
            Self::ByteVector(s) => s.presence(),
            Self::Group(g) => g.presence(),
            Self::Sequence(s) => s.presence(),
        }
    }

    /// Returns the number of presence map bits this instruction claims in
    /// the enclosing segment.
    ///
    /// An optional group claims one bit for its presence; a sequence claims
    /// whatever its length instruction claims. Bits claimed inside group or
    /// sequence bodies belong to the nested segment, not this one.
    #[must_use]
    pub fn presence_map_bits(&self) -> usize {
        let claimed = match self {
            Self::UInt32(s) => s.uses_presence_map_bit(),
            Self::UInt64(s) => s.uses_presence_map_bit(),
            Self::Int32(s) => s.uses_presence_map_bit(),
            Self::Int64(s) => s.uses_presence_map_bit(),
            Self::Decimal(s) => s.uses_presence_map_bit(),
            Self::Ascii(s) | Self::Unicode(s) => s.uses_presence_map_bit(),
            Self::ByteVector(s) => s.uses_presence_map_bit(),
            Self::Group(g) => g.presence().is_optional(),
            Self::Sequence(s) => s.length().uses_presence_map_bit(),
        };
        usize::from(claimed)
    }

    /// Validates operator/type combinations.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when a constant has no declared
    /// value, an increment is applied to a non-integer, or a tail is applied
    /// to a non-vector type. Group and sequence bodies are checked
    /// recursively.
    pub fn validate(&self) -> Result<(), FastError> {
        let name = self.identity().name().to_string();
        match self {
            Self::UInt32(s) => validate_scalar(&name, s.operator(), s.initial().is_some(), true),
            Self::UInt64(s) => validate_scalar(&name, s.operator(), s.initial().is_some(), true),
            Self::Int32(s) => validate_scalar(&name, s.operator(), s.initial().is_some(), true),
            Self::Int64(s) => validate_scalar(&name, s.operator(), s.initial().is_some(), true),
            Self::Decimal(s) => {
                if s.operator() == Operator::Tail || s.operator() == Operator::Increment {
                    return Err(FastError::usage(format!(
                        "operator {:?} is not defined for decimal field {name}",
                        s.operator()
                    )));
                }
                validate_scalar(&name, s.operator(), s.initial().is_some(), false)
            }
            Self::Ascii(s) | Self::Unicode(s) => {
                validate_vector(&name, s.operator(), s.initial().is_some())
            }
            Self::ByteVector(s) => validate_vector(&name, s.operator(), s.initial().is_some()),
            Self::Group(g) => {
                for instruction in g.body().iter() {
                    instruction.validate()?;
                }
                Ok(())
            }
            Self::Sequence(s) => {
                validate_scalar(
                    &name,
                    s.length().operator(),
                    s.length().initial().is_some(),
                    true,
                )?;
                for instruction in s.body().iter() {
                    instruction.validate()?;
                }
                Ok(())
            }
        }
    }
}

fn validate_scalar(
    name: &str,
    operator: Operator,
    has_initial: bool,
    is_integer: bool,
) -> Result<(), FastError> {
    if operator == Operator::Constant && !has_initial {
        return Err(FastError::usage(format!(
            "constant field {name} has no declared value"
        )));
    }
    if operator == Operator::Tail {
        return Err(FastError::usage(format!(
            "tail operator is not defined for scalar field {name}"
        )));
    }
    if operator == Operator::Increment && !is_integer {
        return Err(FastError::usage(format!(
            "increment operator is not defined for field {name}"
        )));
    }
    Ok(())
}

fn validate_vector(name: &str, operator: Operator, has_initial: bool) -> Result<(), FastError> {
    if operator == Operator::Constant && !has_initial {
        return Err(FastError::usage(format!(
            "constant field {name} has no declared value"
        )));
    }
    if operator == Operator::Increment {
        return Err(FastError::usage(format!(
            "increment operator is not defined for field {name}"
        )));
    }
    Ok(())
}
