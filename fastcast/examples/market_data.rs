//! Market data encoding example.
//!
//! Builds a small template registry, encodes a burst of quote messages, and
//! decodes them back, printing the wire size of each message to show how the
//! transfer operators squeeze repeated values out of the stream.
//!
//! Run with: `cargo run --example market_data`

use fastcast::prelude::*;
use std::sync::Arc;

/// Initializes logging for examples.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

fn quote_template() -> Template {
    let level_body = SegmentBody::from_instructions(vec![
        FieldInstruction::UInt32(ScalarInstruction::new(
            FieldIdentity::new("level"),
            Presence::Mandatory,
            Operator::Increment,
        )),
        FieldInstruction::Decimal(ScalarInstruction::new(
            FieldIdentity::new("price"),
            Presence::Mandatory,
            Operator::Delta,
        )),
        FieldInstruction::UInt32(ScalarInstruction::new(
            FieldIdentity::new("size"),
            Presence::Mandatory,
            Operator::Copy,
        )),
    ]);
    let length = ScalarInstruction::new(
        FieldIdentity::new("levelCount"),
        Presence::Mandatory,
        Operator::None,
    );

    TemplateBuilder::new(1, "DepthQuote")
        .field(FieldInstruction::Ascii(ScalarInstruction::new(
            FieldIdentity::new("symbol"),
            Presence::Mandatory,
            Operator::Copy,
        )))
        .field(FieldInstruction::UInt64(ScalarInstruction::new(
            FieldIdentity::new("seqNum"),
            Presence::Mandatory,
            Operator::Increment,
        )))
        .field(FieldInstruction::Sequence(SequenceInstruction::new(
            FieldIdentity::new("levels"),
            Presence::Mandatory,
            length,
            level_body,
        )))
        .build()
        .expect("valid template")
}

fn depth_quote(seq: u64, symbol: &str, levels: &[(i64, u64)]) -> Message {
    let entries = levels
        .iter()
        .enumerate()
        .map(|(index, (price, size))| {
            Message::nested()
                .with_field(
                    FieldIdentity::new("level"),
                    FieldValue::UInt(index as u64 + 1),
                )
                .with_field(
                    FieldIdentity::new("price"),
                    FieldValue::Decimal(Decimal::new(*price, -2)),
                )
                .with_field(FieldIdentity::new("size"), FieldValue::UInt(*size))
        })
        .collect();

    Message::new(1)
        .with_field(
            FieldIdentity::new("symbol"),
            FieldValue::String(symbol.to_string()),
        )
        .with_field(FieldIdentity::new("seqNum"), FieldValue::UInt(seq))
        .with_field(FieldIdentity::new("levels"), FieldValue::Sequence(entries))
}

fn main() -> Result<()> {
    init_logging();

    let registry = Arc::new(
        TemplateRegistryBuilder::new()
            .template(quote_template())
            .build()?,
    );

    let quotes = vec![
        depth_quote(1, "GEH6", &[(9415, 250), (9414, 500)]),
        depth_quote(2, "GEH6", &[(9415, 250), (9414, 500)]),
        depth_quote(3, "GEH6", &[(9416, 250), (9414, 750)]),
    ];

    let mut encoder = Encoder::new(Arc::clone(&registry));
    let mut dest = DataDestination::new();
    let mut feed = MessageFeed::new(quotes.clone());
    encoder.encode_messages(&mut dest, &mut feed)?;

    let wire_messages = dest.take_messages();
    let mut stream = Vec::new();
    for (index, wire) in wire_messages.iter().enumerate() {
        println!("message {}: {} bytes on the wire", index + 1, wire.len());
        stream.extend_from_slice(wire);
    }
    println!("stream total: {} bytes", stream.len());

    let mut decoder = Decoder::new(registry);
    let decoded = decoder.decode_messages(&stream)?;
    assert_eq!(decoded, quotes);

    for message in &decoded {
        let symbol = message
            .get_string(&FieldIdentity::new("symbol"))
            .unwrap_or("?");
        let seq = message
            .get_unsigned_integer(&FieldIdentity::new("seqNum"))
            .unwrap_or(0);
        println!("decoded {symbol} #{seq} with {} fields", message.len());
    }

    Ok(())
}
