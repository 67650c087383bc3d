//! # Dynamic Codec
//!
//! This module converts between [`Value`](crate::value::Value) trees and wire primitives,
//! guided only by the loaded [`Schema`](crate::schema::Schema).
//!
//! ## How it works
//!
//! 1. **Resolver**: maps a declared type to the wire-type tag it travels as. Enums travel as
//!    `I32`; unknown names resolve to `STOP`, which every value-bearing path rejects.
//! 2. **Encoder (Value -> wire)**: walks a method's argument list in declared order, checking
//!    required/optional rules and value shapes as it writes. Optional absent fields are omitted
//!    entirely; there is no null marker on the wire.
//! 3. **Decoder (wire -> Value)**: reads the reply struct of a method, decoding the result with
//!    the declared return type and declared exceptions with their own types.
//!
//! Errors from both directions carry the path of the failing location, e.g. `points[1].x`.
mod decoder;
mod encoder;
mod resolver;

pub use decoder::{DecodeError, decode_method_result, decode_result};
pub use encoder::{EncodeError, encode_arguments, encode_method_arguments};
pub use resolver::{resolve, wire_type_of};

use std::fmt;

/// Location of the value currently being encoded or decoded.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldPath(Vec<Segment>);

#[derive(Debug, Clone)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

impl FieldPath {
    pub(crate) fn push_field(&mut self, name: &str) {
        self.0.push(Segment::Field(name.to_string()));
    }

    pub(crate) fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub(crate) fn push_key(&mut self, key: &str) {
        self.0.push(Segment::Key(key.to_string()));
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}
