use crate::wire::{ProtocolError, ProtocolReader, ProtocolWriter, WireType};

/// Well-known application exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationExceptionKind {
    Unknown,
    UnknownMethod,
    InvalidMessageType,
    WrongMethodName,
    BadSequenceId,
    MissingResult,
    InternalError,
    ProtocolError,
    InvalidTransform,
    InvalidProtocol,
    UnsupportedClientType,
    /// A code outside the well-known range, kept as received.
    Other(i32),
}

impl ApplicationExceptionKind {
    pub fn code(self) -> i32 {
        match self {
            ApplicationExceptionKind::Unknown => 0,
            ApplicationExceptionKind::UnknownMethod => 1,
            ApplicationExceptionKind::InvalidMessageType => 2,
            ApplicationExceptionKind::WrongMethodName => 3,
            ApplicationExceptionKind::BadSequenceId => 4,
            ApplicationExceptionKind::MissingResult => 5,
            ApplicationExceptionKind::InternalError => 6,
            ApplicationExceptionKind::ProtocolError => 7,
            ApplicationExceptionKind::InvalidTransform => 8,
            ApplicationExceptionKind::InvalidProtocol => 9,
            ApplicationExceptionKind::UnsupportedClientType => 10,
            ApplicationExceptionKind::Other(code) => code,
        }
    }
}

impl From<i32> for ApplicationExceptionKind {
    fn from(code: i32) -> Self {
        match code {
            0 => ApplicationExceptionKind::Unknown,
            1 => ApplicationExceptionKind::UnknownMethod,
            2 => ApplicationExceptionKind::InvalidMessageType,
            3 => ApplicationExceptionKind::WrongMethodName,
            4 => ApplicationExceptionKind::BadSequenceId,
            5 => ApplicationExceptionKind::MissingResult,
            6 => ApplicationExceptionKind::InternalError,
            7 => ApplicationExceptionKind::ProtocolError,
            8 => ApplicationExceptionKind::InvalidTransform,
            9 => ApplicationExceptionKind::InvalidProtocol,
            10 => ApplicationExceptionKind::UnsupportedClientType,
            other => ApplicationExceptionKind::Other(other),
        }
    }
}

/// A structured failure reported by the peer in an `EXCEPTION` reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Remote application exception {kind:?} (code {}): '{message}'", .kind.code())]
pub struct ApplicationException {
    pub kind: ApplicationExceptionKind,
    pub message: String,
}

const MESSAGE_FIELD_ID: i16 = 1;
const TYPE_FIELD_ID: i16 = 2;

impl ApplicationException {
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Reads the exception struct: field 1 is the message, field 2 the code.
    /// Unknown fields are skipped; missing ones default to an empty message and `Unknown`.
    pub fn read<R: ProtocolReader + ?Sized>(input: &mut R) -> Result<Self, ProtocolError> {
        let mut exception = Self::new(ApplicationExceptionKind::Unknown, "");

        input.read_struct_begin()?;
        loop {
            let field = input.read_field_begin()?;
            match (field.wire_type, field.id) {
                (WireType::Stop, _) => break,
                (WireType::String, MESSAGE_FIELD_ID) => exception.message = input.read_string()?,
                (WireType::I32, TYPE_FIELD_ID) => exception.kind = input.read_i32()?.into(),
                (other, _) => input.skip(other)?,
            }
            input.read_field_end()?;
        }
        input.read_struct_end()?;

        Ok(exception)
    }

    pub fn write<W: ProtocolWriter + ?Sized>(&self, out: &mut W) -> Result<(), ProtocolError> {
        out.write_struct_begin("TApplicationException")?;
        out.write_field_begin("message", WireType::String, MESSAGE_FIELD_ID)?;
        out.write_string(&self.message)?;
        out.write_field_end()?;
        out.write_field_begin("type", WireType::I32, TYPE_FIELD_ID)?;
        out.write_i32(self.code())?;
        out.write_field_end()?;
        out.write_field_stop()?;
        out.write_struct_end()
    }
}
