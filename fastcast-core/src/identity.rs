/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Field identities.
//!
//! A [`FieldIdentity`] names a field within a template: the local name, an
//! optional namespace, and the application type the field belongs to. The
//! triple is hashable and serves as the dictionary key for operator state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a field within a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldIdentity {
    /// Local field name.
    name: String,
    /// Namespace the name lives in; empty when unqualified.
    namespace: String,
    /// Application type the field belongs to; empty when unspecified.
    application_type: String,
}

impl FieldIdentity {
    /// Creates an identity with the given local name and no namespace.
    ///
    /// # Arguments
    /// * `name` - The local field name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            application_type: String::new(),
        }
    }

    /// Sets the namespace, consuming and returning the identity.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the application type, consuming and returning the identity.
    #[must_use]
    pub fn with_application_type(mut self, application_type: impl Into<String>) -> Self {
        self.application_type = application_type.into();
        self
    }

    /// Returns the local field name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace; empty when unqualified.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the application type; empty when unspecified.
    #[inline]
    #[must_use]
    pub fn application_type(&self) -> &str {
        &self.application_type
    }
}

impl fmt::Display for FieldIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace, self.name)
        }
    }
}

impl From<&str> for FieldIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        let plain = FieldIdentity::new("price");
        assert_eq!(plain.to_string(), "price");

        let qualified = FieldIdentity::new("price").with_namespace("md");
        assert_eq!(qualified.to_string(), "md:price");
    }

    #[test]
    fn test_identity_equality_includes_namespace() {
        let a = FieldIdentity::new("price");
        let b = FieldIdentity::new("price").with_namespace("md");
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_application_type() {
        let id = FieldIdentity::new("symbol").with_application_type("Quote");
        assert_eq!(id.application_type(), "Quote");
    }
}
