//! # Binary Protocol
//!
//! The Thrift binary protocol: big-endian fixed-width integers, `i32`-length-prefixed strings,
//! one-byte type tags. Struct names, field names and end markers are not transmitted.
//!
//! [`BinaryWriter`] appends to a `BytesMut`; [`BinaryReader`] consumes a `Bytes` frame and
//! reports truncation as [`ProtocolError::UnexpectedEof`] instead of panicking.
use super::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, ProtocolError, ProtocolReader,
    ProtocolWriter, WireType,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;
const TYPE_MASK: u32 = 0x0000_00ff;

/// Writes binary protocol primitives into an in-memory buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
    /// Write message headers with the version word.
    strict: bool,
}

impl BinaryWriter {
    pub fn new(strict: bool) -> Self {
        Self {
            buf: BytesMut::new(),
            strict,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    fn put_size(&mut self, size: usize) -> Result<(), ProtocolError> {
        let size = i32::try_from(size).map_err(|_| ProtocolError::SizeTooLarge(size))?;
        self.buf.put_i32(size);
        Ok(())
    }
}

impl ProtocolWriter for BinaryWriter {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), ProtocolError> {
        if self.strict {
            self.buf
                .put_u32(VERSION_1 | u32::from(header.message_type as u8));
            self.write_string(&header.name)?;
        } else {
            self.write_string(&header.name)?;
            self.buf.put_u8(header.message_type as u8);
        }
        self.buf.put_i32(header.seq_id);
        Ok(())
    }

    fn write_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_begin(
        &mut self,
        _name: &str,
        wire_type: WireType,
        id: i16,
    ) -> Result<(), ProtocolError> {
        self.buf.put_u8(wire_type.as_u8());
        self.buf.put_i16(id);
        Ok(())
    }

    fn write_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<(), ProtocolError> {
        self.buf.put_u8(WireType::Stop.as_u8());
        Ok(())
    }

    fn write_map_begin(&mut self, header: &MapHeader) -> Result<(), ProtocolError> {
        self.buf.put_u8(header.key_type.as_u8());
        self.buf.put_u8(header.value_type.as_u8());
        self.put_size(header.size)
    }

    fn write_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_list_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.buf.put_u8(header.element_type.as_u8());
        self.put_size(header.size)
    }

    fn write_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_set_begin(&mut self, header: &ListHeader) -> Result<(), ProtocolError> {
        self.write_list_begin(header)
    }

    fn write_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<(), ProtocolError> {
        self.buf.put_u8(u8::from(value));
        Ok(())
    }

    fn write_byte(&mut self, value: i8) -> Result<(), ProtocolError> {
        self.buf.put_i8(value);
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), ProtocolError> {
        self.buf.put_i16(value);
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.buf.put_i32(value);
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> Result<(), ProtocolError> {
        self.buf.put_i64(value);
        Ok(())
    }

    fn write_double(&mut self, value: f64) -> Result<(), ProtocolError> {
        self.buf.put_f64(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<(), ProtocolError> {
        self.put_size(value.len())?;
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }
}

/// Reads binary protocol primitives out of one received frame.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(ProtocolError::UnexpectedEof {
                needed: needed - remaining,
            });
        }
        Ok(())
    }

    fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn get_wire_type(&mut self) -> Result<WireType, ProtocolError> {
        WireType::try_from(self.get_u8()?)
    }

    fn get_size(&mut self) -> Result<usize, ProtocolError> {
        let size = self.read_i32()?;
        usize::try_from(size).map_err(|_| ProtocolError::NegativeSize(size))
    }

    // Every value takes at least one byte on the wire, so a container cannot announce more
    // elements than there are bytes left. `Stop` takes none and is refused outright.
    fn check_container(
        &self,
        element_types: &[WireType],
        size: usize,
    ) -> Result<(), ProtocolError> {
        if size == 0 {
            return Ok(());
        }
        if element_types.contains(&WireType::Stop) {
            return Err(ProtocolError::InvalidWireType(WireType::Stop.as_u8()));
        }
        self.ensure(size.saturating_mul(element_types.len()))
    }

    fn get_utf8(&mut self, len: usize) -> Result<String, ProtocolError> {
        self.ensure(len)?;
        let bytes = self.buf.split_to(len);
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

impl ProtocolReader for BinaryReader {
    /// Accepts both strict (versioned) and old-style headers.
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError> {
        let first = self.read_i32()?;

        if first < 0 {
            let word = first as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(ProtocolError::BadVersion(word));
            }
            let message_type = MessageType::try_from((word & TYPE_MASK) as u8)?;
            let name = self.read_string()?;
            let seq_id = self.read_i32()?;
            Ok(MessageHeader {
                name,
                message_type,
                seq_id,
            })
        } else {
            let name = self.get_utf8(first as usize)?;
            let message_type = MessageType::try_from(self.get_u8()?)?;
            let seq_id = self.read_i32()?;
            Ok(MessageHeader {
                name,
                message_type,
                seq_id,
            })
        }
    }

    fn read_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError> {
        let wire_type = self.get_wire_type()?;
        if wire_type == WireType::Stop {
            return Ok(FieldHeader { wire_type, id: 0 });
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { wire_type, id })
    }

    fn read_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError> {
        let key_type = self.get_wire_type()?;
        let value_type = self.get_wire_type()?;
        let size = self.get_size()?;
        self.check_container(&[key_type, value_type], size)?;
        Ok(MapHeader {
            key_type,
            value_type,
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        let element_type = self.get_wire_type()?;
        let size = self.get_size()?;
        self.check_container(&[element_type], size)?;
        Ok(ListHeader { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        self.read_list_begin()
    }

    fn read_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.get_u8()? != 0)
    }

    fn read_byte(&mut self) -> Result<i8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.get_size()?;
        self.get_utf8(len)
    }
}
