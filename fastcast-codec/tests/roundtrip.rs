/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! Property-based round-trip tests.
//!
//! Uses proptest to push randomly generated message streams through the
//! encoder and decoder and verify that every value survives, across all
//! operator kinds, optional fields, and nested sequences.

use bytes::Bytes;
use fastcast_codec::{DataDestination, Decoder, Encoder, FieldValue, Message, MessageFeed};
use fastcast_core::{Decimal, FieldIdentity};
use fastcast_templates::{
    FieldInstruction, Operator, Presence, ScalarInstruction, SegmentBody, SequenceInstruction,
    TemplateBuilder, TemplateRegistry, TemplateRegistryBuilder,
};
use proptest::prelude::*;
use std::sync::Arc;

fn id(name: &str) -> FieldIdentity {
    FieldIdentity::new(name)
}

fn rich_registry() -> Arc<TemplateRegistry> {
    let entry_body = SegmentBody::from_instructions(vec![
        FieldInstruction::UInt32(ScalarInstruction::new(
            id("px"),
            Presence::Mandatory,
            Operator::Copy,
        )),
        FieldInstruction::Ascii(ScalarInstruction::new(
            id("tag"),
            Presence::Mandatory,
            Operator::Delta,
        )),
    ]);
    let length = ScalarInstruction::new(id("count"), Presence::Mandatory, Operator::None);

    let template = TemplateBuilder::new(100, "PropQuote")
        .field(FieldInstruction::UInt32(ScalarInstruction::new(
            id("a"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .field(FieldInstruction::UInt64(ScalarInstruction::new(
            id("b"),
            Presence::Mandatory,
            Operator::Delta,
        )))
        .field(FieldInstruction::Int32(
            ScalarInstruction::new(id("c"), Presence::Optional, Operator::Default).with_initial(7),
        ))
        .field(FieldInstruction::Int64(ScalarInstruction::new(
            id("d"),
            Presence::Optional,
            Operator::None,
        )))
        .field(FieldInstruction::Decimal(ScalarInstruction::new(
            id("e"),
            Presence::Mandatory,
            Operator::Delta,
        )))
        .field(FieldInstruction::Ascii(ScalarInstruction::new(
            id("f"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .field(FieldInstruction::Unicode(ScalarInstruction::new(
            id("g"),
            Presence::Optional,
            Operator::None,
        )))
        .field(FieldInstruction::ByteVector(ScalarInstruction::new(
            id("h"),
            Presence::Optional,
            Operator::Copy,
        )))
        .field(FieldInstruction::Sequence(SequenceInstruction::new(
            id("seq"),
            Presence::Mandatory,
            length,
            entry_body,
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

#[derive(Debug, Clone)]
struct QuoteData {
    a: u32,
    b: u64,
    c: Option<i32>,
    d: Option<i64>,
    e: Decimal,
    f: String,
    g: Option<String>,
    h: Option<Vec<u8>>,
    seq: Vec<(u32, String)>,
}

impl QuoteData {
    fn into_message(self) -> Message {
        let mut message = Message::new(100)
            .with_field(id("a"), FieldValue::UInt(u64::from(self.a)))
            .with_field(id("b"), FieldValue::UInt(self.b));
        if let Some(c) = self.c {
            message.add_field(id("c"), FieldValue::Int(i64::from(c)));
        }
        if let Some(d) = self.d {
            message.add_field(id("d"), FieldValue::Int(d));
        }
        message.add_field(id("e"), FieldValue::Decimal(self.e));
        message.add_field(id("f"), FieldValue::String(self.f));
        if let Some(g) = self.g {
            message.add_field(id("g"), FieldValue::String(g));
        }
        if let Some(h) = self.h {
            message.add_field(id("h"), FieldValue::Bytes(Bytes::from(h)));
        }
        let entries = self
            .seq
            .into_iter()
            .map(|(px, tag)| {
                Message::nested()
                    .with_field(id("px"), FieldValue::UInt(u64::from(px)))
                    .with_field(id("tag"), FieldValue::String(tag))
            })
            .collect();
        message.add_field(id("seq"), FieldValue::Sequence(entries));
        message
    }
}

fn quote_strategy() -> impl Strategy<Value = QuoteData> {
    (
        any::<u32>(),
        0..=u64::from(u32::MAX),
        proptest::option::of(any::<i32>()),
        proptest::option::of(i64::MIN..i64::MAX),
        (-1_000_000_000i64..1_000_000_000, -10i32..10),
        "[A-Z]{1,6}",
        proptest::option::of("\\PC{0,8}"),
        proptest::option::of(proptest::collection::vec(any::<u8>(), 0..16)),
        proptest::collection::vec((any::<u32>(), "[A-Z0-9]{0,5}"), 0..4),
    )
        .prop_map(|(a, b, c, d, (mantissa, exponent), f, g, h, seq)| QuoteData {
            a,
            b,
            c,
            d,
            e: Decimal::new(mantissa, exponent),
            f,
            g,
            h,
            seq,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn stream_roundtrip(quotes in proptest::collection::vec(quote_strategy(), 1..5)) {
        let registry = rich_registry();
        let originals: Vec<Message> = quotes.into_iter().map(QuoteData::into_message).collect();

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
        prop_assert_eq!(decoded, originals);
    }

    #[test]
    fn output_is_independent_of_buffer_preallocation(
        quotes in proptest::collection::vec(quote_strategy(), 1..3)
    ) {
        let registry = rich_registry();
        let originals: Vec<Message> = quotes.into_iter().map(QuoteData::into_message).collect();

        let mut small = DataDestination::with_buffer_capacity(1);
        let mut large = DataDestination::with_buffer_capacity(4096);

        let mut encoder = Encoder::new(Arc::clone(&registry));
        let mut feed = MessageFeed::new(originals.clone());
        encoder.encode_messages(&mut small, &mut feed).unwrap();

        let mut encoder = Encoder::new(registry);
        let mut feed = MessageFeed::new(originals);
        encoder.encode_messages(&mut large, &mut feed).unwrap();

        prop_assert_eq!(small.take_messages(), large.take_messages());
    }
}
