/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! The FAST encoder.
//!
//! Drives the template traversal: message, segment, group, sequence. A
//! segment is encoded body-first: a buffer is reserved for the presence map,
//! field bytes go into a following buffer, and once the body is complete the
//! presence map is written back into the reserved buffer. The destination
//! concatenates buffers in creation order, so the map always precedes the
//! body on the wire no matter when it was written.

use crate::accessor::MessageAccessor;
use crate::context::Context;
use crate::destination::DataDestination;
use crate::operators::{self, VectorField, VectorMode};
use crate::pmap::PresenceMap;
use crate::primitives;
use fastcast_core::{FastError, FieldIdentity, Result, TemplateId};
use fastcast_templates::{
    FieldInstruction, GroupInstruction, SegmentBody, SequenceInstruction, TemplateRegistry,
};
use std::sync::Arc;
use tracing::debug;

fn pmap_identity(scope: &str) -> FieldIdentity {
    FieldIdentity::new("PMAP").with_namespace(scope)
}

/// Template-driven FAST encoder.
///
/// Holds the per-session [`Context`]; one encoder instance serves one
/// logical stream and is not shared across threads.
#[derive(Debug)]
pub struct Encoder {
    ctx: Context,
}

impl Encoder {
    /// Creates an encoder over a shared template registry.
    #[must_use]
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            ctx: Context::new(registry),
        }
    }

    /// Returns the codec context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Clears dictionary state; see [`Context::reset`].
    pub fn reset(&mut self, clear_template_id: bool) {
        self.ctx.reset(clear_template_id);
    }

    /// Encodes every message the accessor yields, in order.
    ///
    /// # Errors
    /// Propagates the first encoding error; the partially written message is
    /// not rolled back and the caller should discard the destination and
    /// reset the context.
    pub fn encode_messages(
        &mut self,
        dest: &mut DataDestination,
        accessor: &mut dyn MessageAccessor,
    ) -> Result<()> {
        while let Some(template_id) = accessor.pick_template() {
            self.encode_message(dest, template_id, &*accessor)?;
        }
        Ok(())
    }

    /// Encodes one message between destination boundary markers.
    ///
    /// # Errors
    /// Propagates errors from the segment encode; on error `end_message` is
    /// never reached, so the consumer observes no message.
    pub fn encode_message(
        &mut self,
        dest: &mut DataDestination,
        template_id: TemplateId,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        debug!(template_id, "encode message");
        dest.start_message(template_id)?;
        self.encode_segment(dest, template_id, accessor)?;
        dest.end_message()
    }

    /// Encodes one top-level segment: presence map, optional template id,
    /// and the template body.
    ///
    /// # Errors
    /// Returns [`FastError::UnknownTemplate`] when the id is not registered,
    /// and propagates field-level errors.
    pub fn encode_segment(
        &mut self,
        dest: &mut DataDestination,
        template_id: TemplateId,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        let template = self
            .ctx
            .registry()
            .get(template_id)
            .cloned()
            .ok_or(FastError::UnknownTemplate { id: template_id })?;

        if template.reset() {
            self.ctx.reset(true);
        }
        self.ctx.set_active_template(template_id);

        let mut pmap = PresenceMap::new(template.pmap_bit_count());

        // Reserve the presence map buffer, then open the body buffer. Both
        // are emitted in this order regardless of write order.
        let header = dest.start_buffer();
        dest.start_buffer();

        if self.ctx.last_template_id() == Some(template_id) {
            pmap.set_next(false)?;
        } else {
            pmap.set_next(true)?;
            primitives::encode_unsigned(dest, self.ctx.working_mut(), u64::from(template_id));
            self.ctx.set_last_template_id(template_id);
        }

        self.encode_segment_body(dest, &mut pmap, template.body(), accessor)?;

        let saved = dest.get_current();
        dest.select_buffer(header)?;
        let identity = pmap_identity("Message");
        dest.start_field(&identity);
        pmap.encode(dest);
        dest.end_field(&identity);
        dest.select_buffer(saved)
    }

    /// Encodes a group body as a nested segment.
    ///
    /// A body that claims no presence map bits is written straight into the
    /// current buffer. Otherwise the current buffer will hold the group's
    /// presence map: the body goes into a fresh buffer, the map is written
    /// back once the body is done, and encoding continues in the buffer the
    /// body ended in.
    ///
    /// # Errors
    /// Propagates field-level errors from the body.
    pub fn encode_group(
        &mut self,
        dest: &mut DataDestination,
        group: &SegmentBody,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        let bits = group.pmap_bit_count();
        let mut pmap = PresenceMap::new(bits);

        let pmap_buffer = dest.get_current();
        if bits > 0 {
            dest.start_buffer();
        }

        self.encode_segment_body(dest, &mut pmap, group, accessor)?;

        let body_buffer = dest.get_current();
        if bits > 0 {
            dest.select_buffer(pmap_buffer)?;
            let identity = pmap_identity("Group");
            dest.start_field(&identity);
            pmap.encode(dest);
            dest.end_field(&identity);
            dest.select_buffer(body_buffer)?;
        }
        Ok(())
    }

    fn encode_segment_body(
        &mut self,
        dest: &mut DataDestination,
        pmap: &mut PresenceMap,
        segment: &SegmentBody,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        for instruction in segment.iter() {
            dest.start_field(instruction.identity());
            self.encode_instruction(dest, pmap, instruction, accessor)?;
            dest.end_field(instruction.identity());
        }
        Ok(())
    }

    fn encode_instruction(
        &mut self,
        dest: &mut DataDestination,
        pmap: &mut PresenceMap,
        instruction: &FieldInstruction,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        match instruction {
            FieldInstruction::UInt32(s) => {
                operators::encode_integer(s, dest, pmap, &mut self.ctx, accessor)
            }
            FieldInstruction::UInt64(s) => {
                operators::encode_integer(s, dest, pmap, &mut self.ctx, accessor)
            }
            FieldInstruction::Int32(s) => {
                operators::encode_integer(s, dest, pmap, &mut self.ctx, accessor)
            }
            FieldInstruction::Int64(s) => {
                operators::encode_integer(s, dest, pmap, &mut self.ctx, accessor)
            }
            FieldInstruction::Decimal(s) => {
                let value = accessor.get_decimal(s.identity());
                operators::encode_decimal_value(s, value, dest, pmap, &mut self.ctx)
            }
            FieldInstruction::Ascii(s) => {
                let field = VectorField::from_text(s, VectorMode::AsciiStopBit);
                let value = accessor.get_string(s.identity()).map(str::as_bytes);
                operators::encode_vector_value(&field, value, dest, pmap, &mut self.ctx)
            }
            FieldInstruction::Unicode(s) => {
                let field = VectorField::from_text(s, VectorMode::LengthPrefixed);
                let value = accessor.get_string(s.identity()).map(str::as_bytes);
                operators::encode_vector_value(&field, value, dest, pmap, &mut self.ctx)
            }
            FieldInstruction::ByteVector(s) => {
                let field = VectorField::from_bytes(s);
                let value = accessor.get_byte_vector(s.identity());
                operators::encode_vector_value(&field, value, dest, pmap, &mut self.ctx)
            }
            FieldInstruction::Group(group) => {
                self.encode_group_field(dest, pmap, group, accessor)
            }
            FieldInstruction::Sequence(sequence) => {
                self.encode_sequence_field(dest, pmap, sequence, accessor)
            }
        }
    }

    fn encode_group_field(
        &mut self,
        dest: &mut DataDestination,
        pmap: &mut PresenceMap,
        group: &GroupInstruction,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        let nested = accessor.get_group(group.identity());
        if group.presence().is_optional() {
            pmap.set_next(nested.is_some())?;
        }
        match nested {
            Some(nested) => {
                self.encode_group(dest, group.body(), nested)?;
                accessor.end_group(group.identity());
                Ok(())
            }
            None if group.presence().is_optional() => Ok(()),
            None => Err(FastError::FieldRequiredButAbsent {
                name: group.identity().name().to_string(),
            }),
        }
    }

    fn encode_sequence_field(
        &mut self,
        dest: &mut DataDestination,
        pmap: &mut PresenceMap,
        sequence: &SequenceInstruction,
        accessor: &dyn MessageAccessor,
    ) -> Result<()> {
        let identity = sequence.identity();
        let length = accessor.get_sequence_length(identity);
        let length_value = match length {
            None => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| FastError::ValueOutOfRange {
                name: identity.name().to_string(),
                detail: "sequence length exceeds 32 bits".to_string(),
            })?),
        };
        operators::encode_integer_value(sequence.length(), length_value, dest, pmap, &mut self.ctx)?;

        if let Some(count) = length {
            for index in 0..count {
                let entry = accessor.get_sequence_entry(identity, index).ok_or_else(|| {
                    FastError::usage(format!(
                        "sequence {} reported {count} entries but entry {index} is missing",
                        identity.name()
                    ))
                })?;
                self.encode_group(dest, sequence.body(), entry)?;
                accessor.end_sequence_entry(identity, index);
            }
            accessor.end_sequence(identity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{FieldValue, Message, MessageFeed};
    use fastcast_templates::{
        Operator, Presence, ScalarInstruction, TemplateBuilder, TemplateRegistryBuilder,
    };

    fn id(name: &str) -> FieldIdentity {
        FieldIdentity::new(name)
    }

    fn price_copy_registry() -> Arc<TemplateRegistry> {
        let template = TemplateBuilder::new(42, "Quote")
            .field(FieldInstruction::UInt32(ScalarInstruction::new(
                id("price"),
                Presence::Mandatory,
                Operator::Copy,
            )))
            .build()
            .unwrap();
        Arc::new(
            TemplateRegistryBuilder::new()
                .template(template)
                .build()
                .unwrap(),
        )
    }

    fn quote(price: u32) -> Message {
        Message::new(42).with_field(id("price"), FieldValue::UInt(u64::from(price)))
    }

    #[test]
    fn test_copy_field_message_then_full_elision() {
        let mut encoder = Encoder::new(price_copy_registry());
        let mut dest = DataDestination::new();

        let mut feed = MessageFeed::new(vec![quote(1000), quote(1000)]);
        encoder.encode_messages(&mut dest, &mut feed).unwrap();

        let messages = dest.take_messages();
        assert_eq!(messages.len(), 2);
        // first message: pmap(template id bit + copy bit), id 42, price 1000
        assert_eq!(messages[0].to_vec(), vec![0xe0, 0xaa, 0x07, 0xe8]);
        // second message: everything elided
        assert_eq!(messages[1].to_vec(), vec![0x80]);
    }

    #[test]
    fn test_unknown_template_aborts_before_end_message() {
        let mut encoder = Encoder::new(price_copy_registry());
        let mut dest = DataDestination::new();

        let err = encoder.encode_message(&mut dest, 99, &quote(1));
        assert_eq!(err, Err(FastError::UnknownTemplate { id: 99 }));
        // start_message was called but never completed
        assert_eq!(dest.message_count(), 0);
    }

    #[test]
    fn test_last_template_id_tracks_emitted_ids() {
        let registry = {
            let a = TemplateBuilder::new(1, "A").build().unwrap();
            let b = TemplateBuilder::new(2, "B").build().unwrap();
            Arc::new(
                TemplateRegistryBuilder::new()
                    .template(a)
                    .template(b)
                    .build()
                    .unwrap(),
            )
        };
        let mut encoder = Encoder::new(registry);
        let mut dest = DataDestination::new();

        let mut feed = MessageFeed::new(vec![Message::new(1), Message::new(2), Message::new(1)]);
        encoder.encode_messages(&mut dest, &mut feed).unwrap();

        let messages = dest.take_messages();
        assert_eq!(messages.len(), 3);
        // each message switches template, so each carries its id
        assert_eq!(messages[0].to_vec(), vec![0xc0, 0x81]);
        assert_eq!(messages[1].to_vec(), vec![0xc0, 0x82]);
        assert_eq!(messages[2].to_vec(), vec![0xc0, 0x81]);
        assert_eq!(encoder.context().last_template_id(), Some(1));
    }

    #[test]
    fn test_reset_template_reencodes_identically() {
        let registry = {
            let template = TemplateBuilder::new(5, "Snapshot")
                .reset(true)
                .field(FieldInstruction::UInt32(ScalarInstruction::new(
                    id("price"),
                    Presence::Mandatory,
                    Operator::Copy,
                )))
                .build()
                .unwrap();
            Arc::new(
                TemplateRegistryBuilder::new()
                    .template(template)
                    .build()
                    .unwrap(),
            )
        };
        let mut encoder = Encoder::new(registry);

        let mut dest = DataDestination::new();
        let message = Message::new(5).with_field(id("price"), FieldValue::UInt(7));
        encoder.encode_message(&mut dest, 5, &message).unwrap();
        encoder.encode_message(&mut dest, 5, &message).unwrap();

        let messages = dest.take_messages();
        assert_eq!(messages[0], messages[1]);
    }

    #[test]
    fn test_group_pmap_precedes_group_body() {
        let registry = {
            let body = SegmentBody::from_instructions(vec![FieldInstruction::Ascii(
                ScalarInstruction::new(id("sym"), Presence::Mandatory, Operator::Default)
                    .with_initial("IBM".to_string()),
            )]);
            let template = TemplateBuilder::new(3, "Instrument")
                .field(FieldInstruction::Group(GroupInstruction::new(
                    id("inst"),
                    Presence::Mandatory,
                    body,
                )))
                .build()
                .unwrap();
            Arc::new(
                TemplateRegistryBuilder::new()
                    .template(template)
                    .build()
                    .unwrap(),
            )
        };
        let mut encoder = Encoder::new(registry);

        // default value: group pmap bit 0, no symbol bytes
        let mut dest = DataDestination::new();
        let group = Message::nested().with_field(id("sym"), FieldValue::String("IBM".to_string()));
        let message = Message::new(3).with_field(id("inst"), FieldValue::Group(group));
        encoder.encode_message(&mut dest, 3, &message).unwrap();
        let wire = dest.pop_message().unwrap();
        assert_eq!(wire.to_vec(), vec![0xc0, 0x83, 0x80]);

        // different symbol: group pmap bit 1, then the symbol bytes
        let mut dest = DataDestination::new();
        let group = Message::nested().with_field(id("sym"), FieldValue::String("MSFT".to_string()));
        let message = Message::new(3).with_field(id("inst"), FieldValue::Group(group));
        encoder.encode_message(&mut dest, 3, &message).unwrap();
        let wire = dest.pop_message().unwrap();
        assert_eq!(
            wire.to_vec(),
            vec![0x80, 0xc0, 0x4d, 0x53, 0x46, 0xd4]
        );
    }

    #[test]
    fn test_sequence_entries_carry_their_own_pmaps() {
        let registry = {
            let body = SegmentBody::from_instructions(vec![FieldInstruction::UInt32(
                ScalarInstruction::new(id("px"), Presence::Mandatory, Operator::Copy),
            )]);
            let length = ScalarInstruction::new(id("count"), Presence::Mandatory, Operator::None);
            let template = TemplateBuilder::new(9, "Levels")
                .field(FieldInstruction::Sequence(SequenceInstruction::new(
                    id("levels"),
                    Presence::Mandatory,
                    length,
                    body,
                )))
                .build()
                .unwrap();
            Arc::new(
                TemplateRegistryBuilder::new()
                    .template(template)
                    .build()
                    .unwrap(),
            )
        };
        let mut encoder = Encoder::new(registry);
        let mut dest = DataDestination::new();

        let entries = vec![
            Message::nested().with_field(id("px"), FieldValue::UInt(10)),
            Message::nested().with_field(id("px"), FieldValue::UInt(10)),
            Message::nested().with_field(id("px"), FieldValue::UInt(11)),
        ];
        let message = Message::new(9).with_field(id("levels"), FieldValue::Sequence(entries));
        encoder.encode_message(&mut dest, 9, &message).unwrap();

        let wire = dest.pop_message().unwrap();
        assert_eq!(
            wire.to_vec(),
            vec![
                0xc0, 0x89, // message pmap, template id 9
                0x83, // length 3
                0xc0, 0x8a, // entry 1: pmap + value 10
                0x80, // entry 2: value copied
                0xc0, 0x8b, // entry 3: pmap + value 11
            ]
        );
    }

    #[test]
    fn test_constant_field_emits_nothing() {
        let registry = {
            let template = TemplateBuilder::new(7, "Versioned")
                .field(FieldInstruction::UInt32(
                    ScalarInstruction::new(id("ver"), Presence::Mandatory, Operator::Constant)
                        .with_initial(5),
                ))
                .build()
                .unwrap();
            Arc::new(
                TemplateRegistryBuilder::new()
                    .template(template)
                    .build()
                    .unwrap(),
            )
        };
        let mut encoder = Encoder::new(registry);
        let mut dest = DataDestination::new();

        let message = Message::new(7).with_field(id("ver"), FieldValue::UInt(5));
        encoder.encode_message(&mut dest, 7, &message).unwrap();
        let wire = dest.pop_message().unwrap();
        assert_eq!(wire.to_vec(), vec![0xc0, 0x87]);

        let bad = Message::new(7).with_field(id("ver"), FieldValue::UInt(6));
        let err = encoder.encode_message(&mut dest, 7, &bad);
        assert!(matches!(
            err,
            Err(FastError::TemplateInvariantViolated { .. })
        ));
        assert_eq!(dest.message_count(), 0);
    }
}
