/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! The FAST decoder.
//!
//! Template-driven mirror of the encoder: reads a presence map, resolves the
//! template (from the wire or from the remembered last id), then walks the
//! same instruction list the encoder walked, consuming presence map bits and
//! wire bytes in the same order and replaying the same dictionary updates.

use crate::context::Context;
use crate::message::{FieldValue, Message};
use crate::operators::{self, VectorField, VectorMode};
use crate::pmap::PresenceMap;
use crate::primitives;
use fastcast_core::{FastError, Result, TemplateId};
use fastcast_templates::{FieldInstruction, SegmentBody, TemplateRegistry};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Template-driven FAST decoder.
#[derive(Debug)]
pub struct Decoder {
    ctx: Context,
}

impl Decoder {
    /// Creates a decoder over a shared template registry.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            ctx: Context::new(registry),
        }
    }

    /// Clears dictionary state; see [`Context::reset`].
    pub fn reset(&mut self, clear_template_id: bool) {
        self.ctx.reset(clear_template_id);
    }

    /// Decodes messages until the input is exhausted.
    ///
    /// # Errors
    /// Propagates the first decoding error.
    pub fn decode_messages(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        let mut offset = 0;
        let mut messages = Vec::new();
        while offset < data.len() {
            messages.push(self.decode_message(data, &mut offset)?);
        }
        Ok(messages)
    }

    /// Decodes one message starting at `offset`, advancing it past the
    /// message.
    ///
    /// # Errors
    /// Returns [`FastError::UnknownTemplate`] for unregistered ids,
    /// [`FastError::UnexpectedEof`] for truncated input, and field-level
    /// errors from the operators.
    pub fn decode_message(&mut self, data: &[u8], offset: &mut usize) -> Result<Message> {
        let mut pmap = PresenceMap::decode(data, offset)?;

        let template_id: TemplateId = if pmap.next_bit() {
            u32::try_from(primitives::decode_unsigned(data, offset)?).map_err(|_| {
                FastError::ValueOutOfRange {
                    name: "template id".to_string(),
                    detail: "value exceeds 32 bits".to_string(),
                }
            })?
        } else {
            self.ctx.last_template_id().ok_or_else(|| {
                FastError::usage("template id elided but no template has been seen")
            })?
        };

        let template = self
            .ctx
            .registry()
            .get(template_id)
            .cloned()
            .ok_or(FastError::UnknownTemplate { id: template_id })?;

        debug!(template_id, "decode message");
        if template.reset() {
            self.ctx.reset(true);
        }
        self.ctx.set_last_template_id(template_id);
        self.ctx.set_active_template(template_id);

        let mut message = Message::new(template_id);
        self.decode_segment_body(data, offset, &mut pmap, template.body(), &mut message)?;
        Ok(message)
    }

    fn decode_segment_body(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        pmap: &mut PresenceMap,
        segment: &SegmentBody,
        message: &mut Message,
    ) -> Result<()> {
        for instruction in segment.iter() {
            self.decode_instruction(data, offset, pmap, instruction, message)?;
        }
        Ok(())
    }

    fn decode_nested(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        body: &SegmentBody,
    ) -> Result<Message> {
        let mut nested = Message::nested();
        if body.pmap_bit_count() > 0 {
            let mut pmap = PresenceMap::decode(data, offset)?;
            self.decode_segment_body(data, offset, &mut pmap, body, &mut nested)?;
        } else {
            let mut pmap = PresenceMap::new(0);
            self.decode_segment_body(data, offset, &mut pmap, body, &mut nested)?;
        }
        Ok(nested)
    }

    fn decode_instruction(
        &mut self,
        data: &[u8],
        offset: &mut usize,
        pmap: &mut PresenceMap,
        instruction: &FieldInstruction,
        message: &mut Message,
    ) -> Result<()> {
        match instruction {
            FieldInstruction::UInt32(s) => {
                if let Some(v) =
                    operators::decode_integer_value(s, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::UInt(u64::from(v)));
                }
            }
            FieldInstruction::UInt64(s) => {
                if let Some(v) =
                    operators::decode_integer_value(s, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::UInt(v));
                }
            }
            FieldInstruction::Int32(s) => {
                if let Some(v) =
                    operators::decode_integer_value(s, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::Int(i64::from(v)));
                }
            }
            FieldInstruction::Int64(s) => {
                if let Some(v) =
                    operators::decode_integer_value(s, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::Int(v));
                }
            }
            FieldInstruction::Decimal(s) => {
                if let Some(v) =
                    operators::decode_decimal_value(s, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::Decimal(v));
                }
            }
            FieldInstruction::Ascii(s) => {
                let field = VectorField::from_text(s, VectorMode::AsciiStopBit);
                if let Some(bytes) =
                    operators::decode_vector_value(&field, data, offset, pmap, &mut self.ctx)?
                {
                    let text =
                        String::from_utf8(bytes).map_err(|_| FastError::InvalidString)?;
                    message.add_field(s.identity().clone(), FieldValue::String(text));
                }
            }
            FieldInstruction::Unicode(s) => {
                let field = VectorField::from_text(s, VectorMode::LengthPrefixed);
                if let Some(bytes) =
                    operators::decode_vector_value(&field, data, offset, pmap, &mut self.ctx)?
                {
                    let text =
                        String::from_utf8(bytes).map_err(|_| FastError::InvalidString)?;
                    message.add_field(s.identity().clone(), FieldValue::String(text));
                }
            }
            FieldInstruction::ByteVector(s) => {
                let field = VectorField::from_bytes(s);
                if let Some(bytes) =
                    operators::decode_vector_value(&field, data, offset, pmap, &mut self.ctx)?
                {
                    message.add_field(s.identity().clone(), FieldValue::Bytes(Bytes::from(bytes)));
                }
            }
            FieldInstruction::Group(group) => {
                let present = if group.presence().is_optional() {
                    pmap.next_bit()
                } else {
                    true
                };
                if present {
                    let nested = self.decode_nested(data, offset, group.body())?;
                    message.add_field(group.identity().clone(), FieldValue::Group(nested));
                }
            }
            FieldInstruction::Sequence(sequence) => {
                let length = operators::decode_integer_value(
                    sequence.length(),
                    data,
                    offset,
                    pmap,
                    &mut self.ctx,
                )?;
                if let Some(count) = length {
                    let mut entries = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        entries.push(self.decode_nested(data, offset, sequence.body())?);
                    }
                    message.add_field(
                        sequence.identity().clone(),
                        FieldValue::Sequence(entries),
                    );
                }
            }
        }
        Ok(())
    }
}
