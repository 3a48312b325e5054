/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Template registry.
//!
//! The registry is an immutable map from template id to [`Template`], shared
//! between encoder and decoder. It is built once through
//! [`TemplateRegistryBuilder`] and safe for concurrent reads.

use crate::template::Template;
use fastcast_core::{FastError, TemplateId};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable lookup from template id to template.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    by_id: HashMap<TemplateId, Arc<Template>>,
    by_name: HashMap<String, TemplateId>,
}

impl TemplateRegistry {
    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: TemplateId) -> Option<&Arc<Template>> {
        self.by_id.get(&id)
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Template>> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns true if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterates over the registered templates in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.by_id.values()
    }
}

/// Builder for [`TemplateRegistry`].
#[derive(Debug, Default)]
pub struct TemplateRegistryBuilder {
    templates: Vec<Template>,
}

impl TemplateRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template.
    #[must_use]
    pub fn template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when two templates share an id.
    pub fn build(self) -> Result<TemplateRegistry, FastError> {
        let mut registry = TemplateRegistry::default();
        for template in self.templates {
            let id = template.id();
            if registry.by_id.contains_key(&id) {
                return Err(FastError::usage(format!("duplicate template id {id}")));
            }
            registry.by_name.insert(template.name().to_string(), id);
            registry.by_id.insert(id, Arc::new(template));
        }
        Ok(registry)
    }
}
