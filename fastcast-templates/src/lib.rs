/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 9/2/26
******************************************************************************/

//! # FastCast Templates
//!
//! The immutable template model for the FastCast FAST codec.
//!
//! Templates describe message structure: an ordered list of field
//! instructions, each pairing a primitive type with a transfer operator that
//! decides when values can be elided from the wire. Templates are collected
//! into a [`TemplateRegistry`] shared between encoder and decoder.
//!
//! The FAST template XML format is not parsed here; registries are assembled
//! programmatically through [`TemplateBuilder`] and [`TemplateRegistryBuilder`].

pub mod instruction;
pub mod operator;
pub mod registry;
pub mod template;

pub use instruction::{
    FieldInstruction, GroupInstruction, Presence, ScalarInstruction, SequenceInstruction,
};
pub use operator::{DictionaryScope, Operator};
pub use registry::{TemplateRegistry, TemplateRegistryBuilder};
pub use template::{SegmentBody, Template, TemplateBuilder};
