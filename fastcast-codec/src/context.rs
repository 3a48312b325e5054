/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Codec context and operator dictionaries.
//!
//! The context holds the per-session mutable state shared by every field
//! while a message is encoded or decoded: the template registry, the last
//! template id put on the wire, the operator dictionaries, and the scratch
//! working buffer used by the integer primitives.

use crate::primitives::WorkingBuffer;
use bytes::Bytes;
use fastcast_core::{Decimal, FieldIdentity, TemplateId};
use fastcast_templates::{DictionaryScope, TemplateRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// State of one dictionary entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DictionaryValue {
    /// No value has been assigned yet.
    #[default]
    Undefined,
    /// The entry was explicitly set to null.
    Empty,
    /// Unsigned integer value.
    UInt(u64),
    /// Signed integer value.
    Int(i64),
    /// String value.
    String(String),
    /// Byte sequence value.
    Bytes(Bytes),
    /// Decimal value.
    Decimal(Decimal),
}

impl DictionaryValue {
    /// Returns true if no value has been assigned.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns true if the entry was set to null.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Operator dictionaries grouped by scope.
#[derive(Debug, Default)]
struct Dictionaries {
    global: HashMap<FieldIdentity, DictionaryValue>,
    per_template: HashMap<TemplateId, HashMap<FieldIdentity, DictionaryValue>>,
    per_type: HashMap<String, HashMap<FieldIdentity, DictionaryValue>>,
}

impl Dictionaries {
    fn clear(&mut self) {
        self.global.clear();
        self.per_template.clear();
        self.per_type.clear();
    }
}

/// Per-session codec state.
#[derive(Debug)]
pub struct Context {
    registry: Arc<TemplateRegistry>,
    last_template_id: Option<TemplateId>,
    active_template: Option<TemplateId>,
    dictionaries: Dictionaries,
    working: WorkingBuffer,
}

impl Context {
    /// Creates a context over a shared template registry.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            last_template_id: None,
            active_template: None,
            dictionaries: Dictionaries::default(),
            working: WorkingBuffer::new(),
        }
    }

    /// Returns the template registry.
    #[must_use]
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Returns the template id most recently put on the wire, if any.
    #[inline]
    #[must_use]
    pub const fn last_template_id(&self) -> Option<TemplateId> {
        self.last_template_id
    }

    /// Records a template id as emitted on the wire.
    #[inline]
    pub fn set_last_template_id(&mut self, id: TemplateId) {
        self.last_template_id = Some(id);
    }

    /// Sets the template whose segment is currently being processed; used to
    /// address template-scoped dictionaries.
    #[inline]
    pub fn set_active_template(&mut self, id: TemplateId) {
        self.active_template = Some(id);
    }

    /// Returns the scratch buffer used by the integer primitives.
    #[inline]
    pub fn working_mut(&mut self) -> &mut WorkingBuffer {
        &mut self.working
    }

    /// Clears all dictionaries; when `clear_template_id` is set, also
    /// forgets the last emitted template id so the next segment carries the
    /// id on the wire again.
    pub fn reset(&mut self, clear_template_id: bool) {
        debug!(clear_template_id, "reset codec context");
        self.dictionaries.clear();
        if clear_template_id {
            self.last_template_id = None;
        }
    }

    /// Reads a dictionary entry; missing entries read as
    /// [`DictionaryValue::Undefined`].
    #[must_use]
    pub fn dictionary_get(
        &self,
        scope: DictionaryScope,
        identity: &FieldIdentity,
    ) -> DictionaryValue {
        let map = match scope {
            DictionaryScope::Global => Some(&self.dictionaries.global),
            DictionaryScope::Template => self
                .active_template
                .and_then(|id| self.dictionaries.per_template.get(&id)),
            DictionaryScope::Type => self
                .dictionaries
                .per_type
                .get(identity.application_type()),
        };
        map.and_then(|m| m.get(identity)).cloned().unwrap_or_default()
    }

    /// Writes a dictionary entry.
    pub fn dictionary_set(
        &mut self,
        scope: DictionaryScope,
        identity: &FieldIdentity,
        value: DictionaryValue,
    ) {
        let map = match scope {
            DictionaryScope::Global => &mut self.dictionaries.global,
            DictionaryScope::Template => self
                .dictionaries
                .per_template
                .entry(self.active_template.unwrap_or(0))
                .or_default(),
            DictionaryScope::Type => self
                .dictionaries
                .per_type
                .entry(identity.application_type().to_string())
                .or_default(),
        };
        map.insert(identity.clone(), value);
    }
}
