/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! # FastCast
//!
//! A FAST (FIX Adapted for STreaming) codec for Rust.
//!
//! FAST is the template-driven binary encoding used by high-volume market
//! data feeds. Values that repeat or follow a predictable pattern never
//! reach the wire: transfer operators elide them against dictionary state,
//! and a presence map tells the decoder which fields are actually present.
//!
//! ## Features
//!
//! - **Stop-bit primitives**: variable-length integers, strings, and byte
//!   vectors
//! - **Transfer operators**: constant, default, copy, increment, delta, tail
//! - **Template registry**: immutable, shared between encoder and decoder
//! - **Back-patched presence maps**: field bytes are written before the
//!   presence map is known, without copying
//!
//! ## Quick Start
//!
//! ```rust
//! use fastcast::prelude::*;
//! use std::sync::Arc;
//!
//! let template = TemplateBuilder::new(42, "Quote")
//!     .field(FieldInstruction::UInt32(ScalarInstruction::new(
//!         FieldIdentity::new("price"),
//!         Presence::Mandatory,
//!         Operator::Copy,
//!     )))
//!     .build()
//!     .unwrap();
//! let registry = Arc::new(
//!     TemplateRegistryBuilder::new().template(template).build().unwrap(),
//! );
//!
//! let mut encoder = Encoder::new(Arc::clone(&registry));
//! let mut dest = DataDestination::new();
//! let message = Message::new(42)
//!     .with_field(FieldIdentity::new("price"), FieldValue::UInt(1000));
//! encoder.encode_message(&mut dest, 42, &message).unwrap();
//!
//! let wire = dest.pop_message().unwrap();
//! let mut decoder = Decoder::new(registry);
//! let mut offset = 0;
//! let decoded = decoder.decode_message(&wire, &mut offset).unwrap();
//! assert_eq!(decoded, message);
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: fundamental types and the error hierarchy
//! - [`templates`]: operators, field instructions, and the template registry
//! - [`codec`]: presence maps, data destinations, encoder, and decoder

pub mod core {
    //! Fundamental types and the error hierarchy.
    pub use fastcast_core::*;
}

pub mod templates {
    //! Operators, field instructions, and the template registry.
    pub use fastcast_templates::*;
}

pub mod codec {
    //! Presence maps, data destinations, encoder, and decoder.
    pub use fastcast_codec::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fastcast_core::{Decimal, FastError, FieldIdentity, Result, TemplateId};

    // Template model
    pub use fastcast_templates::{
        DictionaryScope, FieldInstruction, GroupInstruction, Operator, Presence,
        ScalarInstruction, SegmentBody, SequenceInstruction, Template, TemplateBuilder,
        TemplateRegistry, TemplateRegistryBuilder,
    };

    // Codec
    pub use fastcast_codec::{
        BufferHandle, Context, DataDestination, Decoder, DictionaryValue, Encoder, FieldValue,
        Message, MessageAccessor, MessageFeed, PresenceMap,
    };
}
