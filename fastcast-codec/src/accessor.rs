/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Message accessors.
//!
//! The encoder never sees a concrete message type; it reads application data
//! through [`MessageAccessor`], a borrowed view supplied by the caller.
//! Getters return `None` for absent fields — for optional fields the encoder
//! turns absence into the null representation the operator calls for.

use fastcast_core::{Decimal, FieldIdentity, TemplateId};

/// Read interface over application messages.
///
/// One accessor may span several messages: [`MessageAccessor::pick_template`]
/// advances to the next message and reports its template id, returning
/// `None` at the end of the stream. All other getters address fields of the
/// current message.
pub trait MessageAccessor {
    /// Advances to the next message and returns its template id, or `None`
    /// when no message remains.
    fn pick_template(&mut self) -> Option<TemplateId>;

    /// Returns true if the field carries a value in the current message.
    fn is_present(&self, identity: &FieldIdentity) -> bool;

    /// Returns the field as an unsigned integer.
    fn get_unsigned_integer(&self, identity: &FieldIdentity) -> Option<u64>;

    /// Returns the field as a signed integer.
    fn get_signed_integer(&self, identity: &FieldIdentity) -> Option<i64>;

    /// Returns the field as a decimal.
    fn get_decimal(&self, identity: &FieldIdentity) -> Option<Decimal>;

    /// Returns the field as a string slice borrowed from the accessor.
    fn get_string(&self, identity: &FieldIdentity) -> Option<&str>;

    /// Returns the field as a byte slice borrowed from the accessor.
    fn get_byte_vector(&self, identity: &FieldIdentity) -> Option<&[u8]>;

    /// Returns a nested accessor for a group field.
    fn get_group(&self, identity: &FieldIdentity) -> Option<&dyn MessageAccessor>;

    /// Notification that the encoder finished with a group.
    fn end_group(&self, _identity: &FieldIdentity) {}

    /// Returns the number of entries in a sequence field.
    fn get_sequence_length(&self, identity: &FieldIdentity) -> Option<usize>;

    /// Returns a nested accessor for one sequence entry.
    fn get_sequence_entry(
        &self,
        identity: &FieldIdentity,
        index: usize,
    ) -> Option<&dyn MessageAccessor>;

    /// Notification that the encoder finished with a sequence entry.
    fn end_sequence_entry(&self, _identity: &FieldIdentity, _index: usize) {}

    /// Notification that the encoder finished with a sequence.
    fn end_sequence(&self, _identity: &FieldIdentity) {}
}
