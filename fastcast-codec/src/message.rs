/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Concrete messages.
//!
//! [`Message`] is an ordered field set: fields are kept in insertion order
//! and looked up by identity with a linear scan, which beats hashing for the
//! small field counts typical of market data templates. It implements
//! [`MessageAccessor`] so it can be handed straight to the encoder, and it
//! is what the decoder produces.

use crate::accessor::MessageAccessor;
use bytes::Bytes;
use fastcast_core::{Decimal, FieldIdentity, TemplateId};
use std::fmt;

/// A field value inside a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unsigned integer value.
    UInt(u64),
    /// Signed integer value.
    Int(i64),
    /// Decimal value.
    Decimal(Decimal),
    /// String value (ASCII or Unicode fields).
    String(String),
    /// Opaque byte sequence.
    Bytes(Bytes),
    /// Nested group.
    Group(Message),
    /// Sequence of entries.
    Sequence(Vec<Message>),
}

impl FieldValue {
    /// Returns the value as a u64, if it is a UInt variant.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an Int variant.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a decimal, if it is a Decimal variant.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is a String variant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a byte slice, if it is a Bytes variant.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Group(_) => write!(f, "<group>"),
            Self::Sequence(entries) => write!(f, "<{} entries>", entries.len()),
        }
    }
}

/// An ordered field set with a template id.
///
/// Equality compares the template id and the fields pairwise in order: the
/// value of `lhs[i]` against the value of `rhs[i]`.
#[derive(Debug, Clone, Default)]
pub struct Message {
    template_id: TemplateId,
    fields: Vec<(FieldIdentity, FieldValue)>,
    picked: bool,
}

impl Message {
    /// Creates an empty message for the given template.
    #[must_use]
    pub fn new(template_id: TemplateId) -> Self {
        Self {
            template_id,
            fields: Vec::new(),
            picked: false,
        }
    }

    /// Creates an empty nested field set for a group or sequence entry.
    #[must_use]
    pub fn nested() -> Self {
        Self::new(0)
    }

    /// Returns the template id.
    #[inline]
    #[must_use]
    pub const fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Appends a field.
    pub fn add_field(&mut self, identity: FieldIdentity, value: FieldValue) {
        self.fields.push((identity, value));
    }

    /// Appends a field, consuming and returning the message.
    #[must_use]
    pub fn with_field(mut self, identity: FieldIdentity, value: FieldValue) -> Self {
        self.add_field(identity, value);
        self
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the message has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks up a field by identity.
    #[must_use]
    pub fn find(&self, identity: &FieldIdentity) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(id, _)| id == identity)
            .map(|(_, value)| value)
    }

    /// Iterates over the fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldIdentity, &FieldValue)> {
        self.fields.iter().map(|(id, value)| (id, value))
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        if self.template_id != other.template_id || self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .zip(other.fields.iter())
            .all(|((lhs_id, lhs_value), (rhs_id, rhs_value))| {
                lhs_id == rhs_id && lhs_value == rhs_value
            })
    }
}

impl MessageAccessor for Message {
    fn pick_template(&mut self) -> Option<TemplateId> {
        if self.picked {
            None
        } else {
            self.picked = true;
            Some(self.template_id)
        }
    }

    fn is_present(&self, identity: &FieldIdentity) -> bool {
        self.find(identity).is_some()
    }

    fn get_unsigned_integer(&self, identity: &FieldIdentity) -> Option<u64> {
        self.find(identity).and_then(FieldValue::as_u64)
    }

    fn get_signed_integer(&self, identity: &FieldIdentity) -> Option<i64> {
        self.find(identity).and_then(FieldValue::as_i64)
    }

    fn get_decimal(&self, identity: &FieldIdentity) -> Option<Decimal> {
        self.find(identity).and_then(FieldValue::as_decimal)
    }

    fn get_string(&self, identity: &FieldIdentity) -> Option<&str> {
        self.find(identity).and_then(FieldValue::as_str)
    }

    fn get_byte_vector(&self, identity: &FieldIdentity) -> Option<&[u8]> {
        self.find(identity).and_then(FieldValue::as_bytes)
    }

    fn get_group(&self, identity: &FieldIdentity) -> Option<&dyn MessageAccessor> {
        match self.find(identity) {
            Some(FieldValue::Group(group)) => Some(group),
            _ => None,
        }
    }

    fn get_sequence_length(&self, identity: &FieldIdentity) -> Option<usize> {
        match self.find(identity) {
            Some(FieldValue::Sequence(entries)) => Some(entries.len()),
            _ => None,
        }
    }

    fn get_sequence_entry(
        &self,
        identity: &FieldIdentity,
        index: usize,
    ) -> Option<&dyn MessageAccessor> {
        match self.find(identity) {
            Some(FieldValue::Sequence(entries)) => {
                entries.get(index).map(|entry| entry as &dyn MessageAccessor)
            }
            _ => None,
        }
    }
}

/// A queue of messages presented as one accessor.
///
/// [`MessageAccessor::pick_template`] advances the cursor; all other getters
/// address the message the cursor last passed.
#[derive(Debug, Default)]
pub struct MessageFeed {
    messages: Vec<Message>,
    cursor: usize,
}

impl MessageFeed {
    /// Creates a feed over the given messages.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            cursor: 0,
        }
    }

    /// Appends a message to the feed.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn current(&self) -> Option<&Message> {
        self.cursor.checked_sub(1).and_then(|i| self.messages.get(i))
    }
}

impl MessageAccessor for MessageFeed {
    fn pick_template(&mut self) -> Option<TemplateId> {
        let message = self.messages.get(self.cursor)?;
        self.cursor += 1;
        Some(message.template_id())
    }

    fn is_present(&self, identity: &FieldIdentity) -> bool {
        self.current().is_some_and(|m| m.is_present(identity))
    }

    fn get_unsigned_integer(&self, identity: &FieldIdentity) -> Option<u64> {
        self.current().and_then(|m| m.get_unsigned_integer(identity))
    }

    fn get_signed_integer(&self, identity: &FieldIdentity) -> Option<i64> {
        self.current().and_then(|m| m.get_signed_integer(identity))
    }

    fn get_decimal(&self, identity: &FieldIdentity) -> Option<Decimal> {
        self.current().and_then(|m| m.get_decimal(identity))
    }

    fn get_string(&self, identity: &FieldIdentity) -> Option<&str> {
        self.current().and_then(|m| m.get_string(identity))
    }

    fn get_byte_vector(&self, identity: &FieldIdentity) -> Option<&[u8]> {
        self.current().and_then(|m| m.get_byte_vector(identity))
    }

    fn get_group(&self, identity: &FieldIdentity) -> Option<&dyn MessageAccessor> {
        self.current().and_then(|m| m.get_group(identity))
    }

    fn get_sequence_length(&self, identity: &FieldIdentity) -> Option<usize> {
        self.current().and_then(|m| m.get_sequence_length(identity))
    }

    fn get_sequence_entry(
        &self,
        identity: &FieldIdentity,
        index: usize,
    ) -> Option<&dyn MessageAccessor> {
        self.current().and_then(|m| m.get_sequence_entry(identity, index))
    }
}
