/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! FAST transfer operators.
//!
//! Operators define how a field value relates to previous values in the
//! dictionary and whether the field claims a presence map bit.

use crate::instruction::Presence;
use serde::{Deserialize, Serialize};

/// FAST field operator types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operator {
    /// No operator: the value is always carried on the wire.
    #[default]
    None,
    /// Constant: the value is never on the wire, always the declared constant.
    Constant,
    /// Default: elided when the value equals the declared initial value.
    Default,
    /// Copy: elided when the value equals the previous value.
    Copy,
    /// Increment: elided when the value is the previous value plus one.
    Increment,
    /// Delta: the wire carries the difference from the previous value.
    Delta,
    /// Tail: the wire carries only the differing tail of the value.
    Tail,
}

impl Operator {
    /// Returns true if this operator reads or writes dictionary state.
    #[must_use]
    pub const fn uses_dictionary(&self) -> bool {
        matches!(
            self,
            Self::Copy | Self::Increment | Self::Delta | Self::Tail
        )
    }

    /// Returns true if a field with this operator claims a presence map bit.
    ///
    /// Per FAST 1.1: fields without an operator and delta fields are always
    /// on the wire and claim no bit; a constant claims a bit only when the
    /// field is optional (the bit carries presence); default, copy, increment
    /// and tail always claim one bit.
    #[must_use]
    pub const fn uses_presence_map_bit(&self, presence: Presence) -> bool {
        match self {
            Self::None | Self::Delta => false,
            Self::Constant => presence.is_optional(),
            Self::Default | Self::Copy | Self::Increment | Self::Tail => true,
        }
    }
}

/// Dictionary scope for operator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DictionaryScope {
    /// Global dictionary shared across all templates.
    #[default]
    Global,
    /// Dictionary local to the enclosing template.
    Template,
    /// Dictionary keyed by the field's application type.
    Type,
}
