/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Error types for FAST encoding and decoding.
//!
//! Dynamic errors carry the stable error codes from the FAST specification
//! (`[ERR D5]`, `[ERR D6]`, `[ERR D7]`, `[ERR D9]`) in their display form so
//! that session-level fault handling can match on them.

use thiserror::Error;

/// Result type alias using [`FastError`] as the error type.
pub type Result<T> = std::result::Result<T, FastError>;

/// Errors that can occur during FAST encoding and decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FastError {
    /// Template registry lookup failed during message or group dispatch.
    #[error("[ERR D9] unknown template id: {id}")]
    UnknownTemplate {
        /// The template id that was not found.
        id: u32,
    },

    /// A template-declared invariant was broken while encoding: a presence
    /// map overflowed its declared bit count, or a constant operator observed
    /// a value different from its declared constant.
    #[error("template invariant violated: {reason}")]
    TemplateInvariantViolated {
        /// Description of the broken invariant.
        reason: String,
    },

    /// A mandatory field was absent under an operator that cannot represent
    /// null on the wire.
    #[error("[ERR D5] mandatory field absent: {name}")]
    FieldRequiredButAbsent {
        /// Name of the missing field.
        name: String,
    },

    /// A value does not fit the field's declared primitive type.
    #[error("[ERR D6] value out of range for {name}: {detail}")]
    ValueOutOfRange {
        /// Name of the offending field.
        name: String,
        /// Description of the range violation.
        detail: String,
    },

    /// API misuse, such as selecting an invalidated buffer handle or
    /// mismatched message boundary calls.
    #[error("usage error: {detail}")]
    UsageError {
        /// Description of the misuse.
        detail: String,
    },

    /// Input exhausted while decoding.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A decoded string field is not valid UTF-8.
    #[error("invalid string encoding")]
    InvalidString,
}

impl FastError {
    /// Builds the constant-operator mismatch error (`[ERR D7]`).
    ///
    /// # Arguments
    /// * `name` - Name of the field whose value differed from its constant
    #[must_use]
    pub fn constant_mismatch(name: &str) -> Self {
        Self::TemplateInvariantViolated {
            reason: format!("[ERR D7] constant field {name} does not match declared value"),
        }
    }

    /// Builds the presence map overflow error.
    ///
    /// # Arguments
    /// * `capacity` - The declared presence map bit capacity that was exceeded
    #[must_use]
    pub fn pmap_overflow(capacity: usize) -> Self {
        Self::TemplateInvariantViolated {
            reason: format!("presence map overflow: capacity is {capacity} bits"),
        }
    }

    /// Builds a usage error from any displayable detail.
    #[must_use]
    pub fn usage(detail: impl Into<String>) -> Self {
        Self::UsageError {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_template_display() {
        let err = FastError::UnknownTemplate { id: 99 };
        assert_eq!(err.to_string(), "[ERR D9] unknown template id: 99");
    }

    #[test]
    fn test_constant_mismatch_carries_code() {
        let err = FastError::constant_mismatch("AppVerID");
        assert!(err.to_string().contains("[ERR D7]"));
        assert!(matches!(
            err,
            FastError::TemplateInvariantViolated { .. }
        ));
    }

    #[test]
    fn test_mandatory_absent_display() {
        let err = FastError::FieldRequiredButAbsent {
            name: "price".to_string(),
        };
        assert_eq!(err.to_string(), "[ERR D5] mandatory field absent: price");
    }

    #[test]
    fn test_pmap_overflow_is_invariant_violation() {
        let err = FastError::pmap_overflow(3);
        assert!(matches!(
            err,
            FastError::TemplateInvariantViolated { .. }
        ));
    }
}
