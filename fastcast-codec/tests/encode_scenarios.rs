/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Wire-level encoding scenarios.
//!
//! Each test pins the exact byte stream for a small template so that any
//! change to presence map construction, template id elision, or operator
//! byte emission shows up as a concrete diff.

use fastcast_codec::{DataDestination, Decoder, Encoder, FieldValue, Message, MessageFeed};
use fastcast_core::{FastError, FieldIdentity};
use fastcast_templates::{
    FieldInstruction, GroupInstruction, Operator, Presence, ScalarInstruction, SegmentBody,
    SequenceInstruction, TemplateBuilder, TemplateRegistry, TemplateRegistryBuilder,
};
use std::sync::Arc;

fn id(name: &str) -> FieldIdentity {
    FieldIdentity::new(name)
}

fn registry_of(templates: Vec<fastcast_templates::Template>) -> Arc<TemplateRegistry> {
    let mut builder = TemplateRegistryBuilder::new();
    for template in templates {
        builder = builder.template(template);
    }
    Arc::new(builder.build().unwrap())
}

#[test]
fn copy_operator_elides_repeated_message() {
    let registry = registry_of(vec![TemplateBuilder::new(42, "Quote")
        .field(FieldInstruction::UInt32(ScalarInstruction::new(
            id("price"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .build()
        .unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let quote = |price: u64| Message::new(42).with_field(id("price"), FieldValue::UInt(price));
    let mut feed = MessageFeed::new(vec![quote(1000), quote(1000)]);
    encoder.encode_messages(&mut dest, &mut feed).unwrap();

    let messages = dest.take_messages();
    // first message: pmap (template id new + copy value present), id 42,
    // price 1000 as a two-byte stop-bit integer
    assert_eq!(messages[0].to_vec(), vec![0xe0, 0xaa, 0x07, 0xe8]);
    // second message: template id copied, price copied, pmap alone
    assert_eq!(messages[1].to_vec(), vec![0x80]);
}

#[test]
fn constant_value_never_reaches_the_wire() {
    let registry = registry_of(vec![TemplateBuilder::new(7, "Versioned")
        .field(FieldInstruction::UInt32(
            ScalarInstruction::new(id("ver"), Presence::Mandatory, Operator::Constant)
                .with_initial(5),
        ))
        .build()
        .unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let message = Message::new(7).with_field(id("ver"), FieldValue::UInt(5));
    encoder.encode_message(&mut dest, 7, &message).unwrap();
    // pmap with only the template id bit, then the id; no field bytes
    assert_eq!(dest.pop_message().unwrap().to_vec(), vec![0xc0, 0x87]);

    let mismatch = Message::new(7).with_field(id("ver"), FieldValue::UInt(6));
    let err = encoder.encode_message(&mut dest, 7, &mismatch);
    assert!(matches!(
        err,
        Err(FastError::TemplateInvariantViolated { .. })
    ));
}

fn instrument_registry() -> Arc<TemplateRegistry> {
    let body = SegmentBody::from_instructions(vec![FieldInstruction::Ascii(
        ScalarInstruction::new(id("sym"), Presence::Mandatory, Operator::Default)
            .with_initial("IBM".to_string()),
    )]);
    registry_of(vec![TemplateBuilder::new(3, "Instrument")
        .field(FieldInstruction::Group(GroupInstruction::new(
            id("inst"),
            Presence::Mandatory,
            body,
        )))
        .build()
        .unwrap()])
}

#[test]
fn group_with_default_symbol_absent() {
    let mut encoder = Encoder::new(instrument_registry());
    let mut dest = DataDestination::new();

    // symbol absent: the default stands in, group pmap bit is clear
    let message = Message::new(3).with_field(id("inst"), FieldValue::Group(Message::nested()));
    encoder.encode_message(&mut dest, 3, &message).unwrap();
    assert_eq!(
        dest.pop_message().unwrap().to_vec(),
        vec![0xc0, 0x83, 0x80]
    );
}

#[test]
fn group_with_default_symbol_overridden() {
    let mut encoder = Encoder::new(instrument_registry());
    let mut dest = DataDestination::new();

    let group = Message::nested().with_field(id("sym"), FieldValue::String("MSFT".to_string()));
    let message = Message::new(3).with_field(id("inst"), FieldValue::Group(group));
    encoder.encode_message(&mut dest, 3, &message).unwrap();
    // group pmap bit set, then the symbol characters with a stop bit
    assert_eq!(
        dest.pop_message().unwrap().to_vec(),
        vec![0xc0, 0x83, 0xc0, 0x4d, 0x53, 0x46, 0xd4]
    );
}

#[test]
fn sequence_entries_share_one_dictionary() {
    let body = SegmentBody::from_instructions(vec![FieldInstruction::UInt32(
        ScalarInstruction::new(id("px"), Presence::Mandatory, Operator::Copy),
    )]);
    let length = ScalarInstruction::new(id("count"), Presence::Mandatory, Operator::None);
    let registry = registry_of(vec![TemplateBuilder::new(9, "Levels")
        .field(FieldInstruction::Sequence(SequenceInstruction::new(
            id("levels"),
            Presence::Mandatory,
            length,
            body,
        )))
        .build()
        .unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let entries: Vec<Message> = [10u64, 10, 11]
        .iter()
        .map(|px| Message::nested().with_field(id("px"), FieldValue::UInt(*px)))
        .collect();
    let message = Message::new(9).with_field(id("levels"), FieldValue::Sequence(entries));
    encoder.encode_message(&mut dest, 9, &message).unwrap();

    assert_eq!(
        dest.pop_message().unwrap().to_vec(),
        vec![
            0xc0, 0x89, // message pmap, template id
            0x83, // three entries
            0xc0, 0x8a, // entry 1: new value 10
            0x80, // entry 2: copied
            0xc0, 0x8b, // entry 3: new value 11
        ]
    );
}

#[test]
fn template_id_tracks_the_last_emitted_id() {
    let registry = registry_of(vec![
        TemplateBuilder::new(1, "A").build().unwrap(),
        TemplateBuilder::new(2, "B").build().unwrap(),
    ]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let mut feed = MessageFeed::new(vec![Message::new(1), Message::new(2), Message::new(1)]);
    encoder.encode_messages(&mut dest, &mut feed).unwrap();

    let messages = dest.take_messages();
    // the third message's id differs from the last emitted (2), so its
    // template id bit is set again
    assert_eq!(messages[2].to_vec(), vec![0xc0, 0x81]);
    assert_eq!(encoder.context().last_template_id(), Some(1));
}

#[test]
fn unknown_template_leaves_no_observable_message() {
    let registry = registry_of(vec![TemplateBuilder::new(1, "A").build().unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let err = encoder.encode_message(&mut dest, 77, &Message::new(77));
    assert_eq!(err, Err(FastError::UnknownTemplate { id: 77 }));
    assert_eq!(dest.message_count(), 0);
    assert!(dest.pop_message().is_none());
}

#[test]
fn reset_template_reencodes_byte_identically() {
    let registry = registry_of(vec![TemplateBuilder::new(5, "Snapshot")
        .reset(true)
        .field(FieldInstruction::UInt32(ScalarInstruction::new(
            id("price"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .field(FieldInstruction::Ascii(ScalarInstruction::new(
            id("sym"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .build()
        .unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    let message = Message::new(5)
        .with_field(id("price"), FieldValue::UInt(900))
        .with_field(id("sym"), FieldValue::String("GEH6".to_string()));
    encoder.encode_message(&mut dest, 5, &message).unwrap();
    encoder.encode_message(&mut dest, 5, &message).unwrap();
    encoder.encode_message(&mut dest, 5, &message).unwrap();

    let messages = dest.take_messages();
    assert_eq!(messages[0], messages[1]);
    assert_eq!(messages[1], messages[2]);
}

#[test]
fn failed_message_can_be_recovered_with_reset() {
    let registry = registry_of(vec![TemplateBuilder::new(4, "Order")
        .field(FieldInstruction::UInt32(ScalarInstruction::new(
            id("qty"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .build()
        .unwrap()]);
    let mut encoder = Encoder::new(registry);
    let mut dest = DataDestination::new();

    // mandatory field absent: the message fails mid-encode
    let bad = Message::new(4);
    assert!(encoder.encode_message(&mut dest, 4, &bad).is_err());

    // session-level recovery: fresh destination, reset context
    let mut dest = DataDestination::new();
    encoder.reset(true);
    let good = Message::new(4).with_field(id("qty"), FieldValue::UInt(1));
    encoder.encode_message(&mut dest, 4, &good).unwrap();
    assert_eq!(dest.pop_message().unwrap().to_vec(), vec![0xe0, 0x84, 0x81]);
}

#[test]
fn mixed_template_stream_roundtrips() {
    let order_book = {
        let body = SegmentBody::from_instructions(vec![
            FieldInstruction::UInt32(ScalarInstruction::new(
                id("level"),
                Presence::Mandatory,
                Operator::Increment,
            )),
            FieldInstruction::Decimal(ScalarInstruction::new(
                id("px"),
                Presence::Mandatory,
                Operator::Delta,
            )),
        ]);
        let length = ScalarInstruction::new(id("count"), Presence::Mandatory, Operator::None);
        TemplateBuilder::new(20, "Book")
            .field(FieldInstruction::Ascii(ScalarInstruction::new(
                id("sym"),
                Presence::Mandatory,
                Operator::Copy,
            )))
            .field(FieldInstruction::Sequence(SequenceInstruction::new(
                id("levels"),
                Presence::Mandatory,
                length,
                body,
            )))
            .build()
            .unwrap()
    };
    let trade = TemplateBuilder::new(21, "Trade")
        .field(FieldInstruction::Ascii(ScalarInstruction::new(
            id("sym"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .field(FieldInstruction::Int64(ScalarInstruction::new(
            id("qty"),
            Presence::Optional,
            Operator::None,
        )))
        .build()
        .unwrap();
    let registry = registry_of(vec![order_book, trade]);

    let book = Message::new(20)
        .with_field(id("sym"), FieldValue::String("GEH6".to_string()))
        .with_field(
            id("levels"),
            FieldValue::Sequence(vec![
                Message::nested()
                    .with_field(id("level"), FieldValue::UInt(1))
                    .with_field(id("px"), FieldValue::Decimal(fastcast_core::Decimal::new(9415, -2))),
                Message::nested()
                    .with_field(id("level"), FieldValue::UInt(2))
                    .with_field(id("px"), FieldValue::Decimal(fastcast_core::Decimal::new(9417, -2))),
            ]),
        );
    let trade_msg = Message::new(21)
        .with_field(id("sym"), FieldValue::String("GEH6".to_string()))
        .with_field(id("qty"), FieldValue::Int(-250));
    let trade_absent = Message::new(21).with_field(id("sym"), FieldValue::String("GEH6".to_string()));

    let originals = vec![book, trade_msg, trade_absent];
    let mut encoder = Encoder::new(Arc::clone(&registry));
    let mut dest = DataDestination::new();
    let mut feed = MessageFeed::new(originals.clone());
    encoder.encode_messages(&mut dest, &mut feed).unwrap();

    let mut wire = Vec::new();
    for message in dest.take_messages() {
        wire.extend_from_slice(&message);
    }

    let mut decoder = Decoder::new(registry);
    let decoded = decoder.decode_messages(&wire).unwrap();
    assert_eq!(decoded, originals);
}
