/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Templates and segment bodies.
//!
//! A [`SegmentBody`] is an ordered list of field instructions together with
//! the number of presence map bits those instructions claim. A [`Template`]
//! wraps a segment body with the template id, name, namespace, and the reset
//! flag that discards dictionary state at segment entry.

use crate::instruction::FieldInstruction;
use fastcast_core::{FastError, TemplateId};

/// An ordered list of field instructions forming one segment.
#[derive(Debug, Clone, Default)]
pub struct SegmentBody {
    instructions: Vec<FieldInstruction>,
    pmap_bit_count: usize,
}

impl SegmentBody {
    /// Builds a segment body, computing the presence map bit count from the
    /// instructions.
    #[must_use]
    pub fn from_instructions(instructions: Vec<FieldInstruction>) -> Self {
        let pmap_bit_count = instructions
            .iter()
            .map(FieldInstruction::presence_map_bits)
            .sum();
        Self {
            instructions,
            pmap_bit_count,
        }
    }

    /// Returns the number of presence map bits the body's instructions claim.
    #[inline]
    #[must_use]
    pub const fn pmap_bit_count(&self) -> usize {
        self.pmap_bit_count
    }

    /// Returns the number of instructions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the body has no instructions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the instruction at the given position.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FieldInstruction> {
        self.instructions.get(index)
    }

    /// Iterates over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldInstruction> {
        self.instructions.iter()
    }
}

/// An immutable message template.
#[derive(Debug, Clone)]
pub struct Template {
    id: TemplateId,
    name: String,
    namespace: String,
    reset: bool,
    body: SegmentBody,
}

impl Template {
    /// Returns the template id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Returns the template name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the template namespace; empty when unqualified.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns true if dictionary state is discarded at segment entry.
    #[inline]
    #[must_use]
    pub const fn reset(&self) -> bool {
        self.reset
    }

    /// Returns the top-level segment body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &SegmentBody {
        &self.body
    }

    /// Returns the presence map bit capacity of the top-level segment: one
    /// bit for the template id plus the bits the body claims.
    #[inline]
    #[must_use]
    pub const fn pmap_bit_count(&self) -> usize {
        1 + self.body.pmap_bit_count()
    }
}

/// Builder for [`Template`].
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    id: TemplateId,
    name: String,
    namespace: String,
    reset: bool,
    instructions: Vec<FieldInstruction>,
}

impl TemplateBuilder {
    /// Creates a builder for a template with the given id and name.
    #[must_use]
    pub fn new(id: TemplateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the template namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the reset flag.
    #[must_use]
    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Appends a field instruction.
    #[must_use]
    pub fn field(mut self, instruction: FieldInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Validates the instructions and builds the template.
    ///
    /// # Errors
    /// Returns [`FastError::UsageError`] when an instruction has an invalid
    /// operator/type combination.
    pub fn build(self) -> Result<Template, FastError> {
        for instruction in &self.instructions {
            instruction.validate()?;
        }
        Ok(Template {
            id: self.id,
            name: self.name,
            namespace: self.namespace,
            reset: self.reset,
            body: SegmentBody::from_instructions(self.instructions),
        })
    }
}
