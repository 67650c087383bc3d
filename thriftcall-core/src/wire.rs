//! # Wire Primitives
//!
//! This module defines the primitive write/read API the dynamic codec is built on: wire-type
//! tags, message and container headers, and the [`ProtocolWriter`] / [`ProtocolReader`] traits.
//!
//! The codec never touches bytes directly. [`binary`] provides the Thrift binary protocol
//! implementation of both traits over in-memory buffers.
pub mod binary;

use std::fmt;

/// Errors raised by the wire primitives themselves.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unexpected end of input: needed {needed} more bytes")]
    UnexpectedEof { needed: usize },
    #[error("Invalid wire type tag {0}")]
    InvalidWireType(u8),
    #[error("Invalid message type {0}")]
    InvalidMessageType(u8),
    #[error("Bad protocol version word {0:#010x}")]
    BadVersion(u32),
    #[error("Negative container or string size {0}")]
    NegativeSize(i32),
    #[error("Size {0} does not fit the wire's 32-bit length field")]
    SizeTooLarge(usize),
    #[error("String is not valid UTF-8")]
    InvalidUtf8,
    #[error("Nesting depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),
}

/// The fixed set of on-the-wire type tags.
///
/// `Stop` terminates a struct's field list and doubles as the resolver's
/// "unknown type" sentinel; it never describes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Stop = 0,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl WireType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            WireType::Struct | WireType::Map | WireType::Set | WireType::List
        )
    }
}

impl TryFrom<u8> for WireType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Stop),
            2 => Ok(WireType::Bool),
            3 => Ok(WireType::Byte),
            4 => Ok(WireType::Double),
            6 => Ok(WireType::I16),
            8 => Ok(WireType::I32),
            10 => Ok(WireType::I64),
            11 => Ok(WireType::String),
            12 => Ok(WireType::Struct),
            13 => Ok(WireType::Map),
            14 => Ok(WireType::Set),
            15 => Ok(WireType::List),
            other => Err(ProtocolError::InvalidWireType(other)),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WireType::Stop => "STOP",
            WireType::Bool => "BOOL",
            WireType::Byte => "BYTE",
            WireType::Double => "DOUBLE",
            WireType::I16 => "I16",
            WireType::I32 => "I32",
            WireType::I64 => "I64",
            WireType::String => "STRING",
            WireType::Struct => "STRUCT",
            WireType::Map => "MAP",
            WireType::Set => "SET",
            WireType::List => "LIST",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::InvalidMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub message_type: MessageType,
    pub seq_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub wire_type: WireType,
    /// Zero when `wire_type` is [`WireType::Stop`].
    pub id: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    pub key_type: WireType,
    pub value_type: WireType,
    pub size: usize,
}

/// Header shared by lists and sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeader {
    pub element_type: WireType,
    pub size: usize,
}

/// The write half of the wire primitive API.
///
/// Begin/end pairs must be balanced by the caller; implementations are free to
/// write nothing for markers their encoding does not need.
pub trait ProtocolWriter {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), ProtocolError>;
    fn write_message_end(&mut self) -> Result<(), ProtocolError>;
    fn write_struct_begin(&mut self, name: &str) -> Result<(), ProtocolError>;
    fn write_struct_end(&mut self) -> Result<(), ProtocolError>;
    fn write_field_begin(
        &mut self,
        name: &str,
        wire_type: WireType,
        id: i16,
    ) -> Result<(), ProtocolError>;
    fn write_field_end(&mut self) -> Result<(), ProtocolError>;
    fn write_field_stop(&mut self) -> Result<(), ProtocolError>;
    fn write_map_begin(&mut self, header: &MapHeader) -> Result<(), ProtocolError>;
    fn write_map_end(&mut self) -> Result<(), ProtocolError>;
    fn write_list_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError>;
    fn write_list_end(&mut self) -> Result<(), ProtocolError>;
    fn write_set_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError>;
    fn write_set_end(&mut self) -> Result<(), ProtocolError>;
    fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError>;
    fn write_byte(&mut self, value: i8) -> Result<(), ProtocolError>;
    fn write_i16(&mut self, value: i16) -> Result<(), ProtocolError>;
    fn write_i32(&mut self, value: i32) -> Result<(), ProtocolError>;
    fn write_i64(&mut self, value: i64) -> Result<(), ProtocolError>;
    fn write_double(&mut self, value: f64) -> Result<(), ProtocolError>;
    fn write_string(&mut self, value: &str) -> Result<(), ProtocolError>;
}

/// Maximum struct and container nesting a reader will follow.
pub const MAX_NESTING_DEPTH: usize = 64;

/// The read half of the wire primitive API.
pub trait ProtocolReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError>;
    fn read_message_end(&mut self) -> Result<(), ProtocolError>;
    fn read_struct_begin(&mut self) -> Result<(), ProtocolError>;
    fn read_struct_end(&mut self) -> Result<(), ProtocolError>;
    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError>;
    fn read_field_end(&mut self) -> Result<(), ProtocolError>;
    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError>;
    fn read_map_end(&mut self) -> Result<(), ProtocolError>;
    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError>;
    fn read_list_end(&mut self) -> Result<(), ProtocolError>;
    fn read_set_begin(&mut self) -> Result<ListHeader, ProtocolError>;
    fn read_set_end(&mut self) -> Result<(), ProtocolError>;
    fn read_bool(&mut self) -> Result<bool, ProtocolError>;
    fn read_byte(&mut self) -> Result<i8, ProtocolError>;
    fn read_i16(&mut self) -> Result<i16, ProtocolError>;
    fn read_i32(&mut self) -> Result<i32, ProtocolError>;
    fn read_i64(&mut self) -> Result<i64, ProtocolError>;
    fn read_double(&mut self) -> Result<f64, ProtocolError>;
    fn read_string(&mut self) -> Result<String, ProtocolError>;

    /// Consumes and discards one value of `wire_type`, recursing into containers.
    fn skip(&mut self, wire_type: WireType) -> Result<(), ProtocolError> {
        skip_value(self, wire_type, MAX_NESTING_DEPTH)
    }
}

fn skip_value<R: ProtocolReader + ?Sized>(
    reader: &mut R,
    wire_type: WireType,
    depth: usize,
) -> Result<(), ProtocolError> {
    if depth == 0 {
        return Err(ProtocolError::DepthLimitExceeded(MAX_NESTING_DEPTH));
    }

    match wire_type {
        WireType::Stop => Ok(()),
        WireType::Bool => reader.read_bool().map(drop),
        WireType::Byte => reader.read_byte().map(drop),
        WireType::I16 => reader.read_i16().map(drop),
        WireType::I32 => reader.read_i32().map(drop),
        WireType::I64 => reader.read_i64().map(drop),
        WireType::Double => reader.read_double().map(drop),
        WireType::String => reader.read_string().map(drop),
        WireType::Struct => {
            reader.read_struct_begin()?;
            loop {
                let field = reader.read_field_begin()?;
                if field.wire_type == WireType::Stop {
                    break;
                }
                skip_value(reader, field.wire_type, depth - 1)?;
                reader.read_field_end()?;
            }
            reader.read_struct_end()
        }
        WireType::Map => {
            let header = reader.read_map_begin()?;
            if header.size > 0 {
                valued(header.key_type)?;
                valued(header.value_type)?;
            }
            for _ in 0..header.size {
                skip_value(reader, header.key_type, depth - 1)?;
                skip_value(reader, header.value_type, depth - 1)?;
            }
            reader.read_map_end()
        }
        WireType::Set => {
            let header = reader.read_set_begin()?;
            if header.size > 0 {
                valued(header.element_type)?;
            }
            for _ in 0..header.size {
                skip_value(reader, header.element_type, depth - 1)?;
            }
            reader.read_set_end()
        }
        WireType::List => {
            let header = reader.read_list_begin()?;
            if header.size > 0 {
                valued(header.element_type)?;
            }
            for _ in 0..header.size {
                skip_value(reader, header.element_type, depth - 1)?;
            }
            reader.read_list_end()
        }
    }
}

// `Stop` carries no bytes, so a non-empty container of it would spin without consuming input.
fn valued(wire_type: WireType) -> Result<(), ProtocolError> {
    match wire_type {
        WireType::Stop => Err(ProtocolError::InvalidWireType(WireType::Stop.as_u8())),
        _ => Ok(()),
    }
}
