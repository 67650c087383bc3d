//! # Dynamic Client
//!
//! This module implements the RPC session: one [`DynamicClient`] owns a [`Transport`], the
//! loaded [`Schema`] and the call sequence counter.
//!
//! Each [`DynamicClient::invoke`] runs the whole exchange:
//!
//! 1. Looks up the method; unknown names fail before anything is sent.
//! 2. Bumps the sequence id and encodes `(method, CALL, seq_id)` plus the arguments into memory.
//! 3. Sends the message and waits for the reply frame.
//! 4. Surfaces an `EXCEPTION` reply as [`CallError::RemoteApplicationException`], rejects a
//!    reply whose sequence id does not match, and otherwise decodes the result.
//!
//! `invoke` takes `&mut self`, so one session never has two calls in flight. Share a session
//! behind a `tokio::sync::Mutex`, or open one session per concurrent caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use thriftcall_core::{DynamicClient, Schema, Value};
//! use std::collections::BTreeMap;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::from_path("calculator.json")?;
//! let mut client = DynamicClient::connect("127.0.0.1:9090", schema).await?;
//!
//! let args = BTreeMap::from([
//!     ("a".to_string(), Value::I32(1)),
//!     ("b".to_string(), Value::I32(2)),
//! ]);
//! let results = client.invoke("Calculator", "add", &args).await?;
//! println!("{:?}", results["add_result"]);
//! # Ok(())
//! # }
//! ```
mod exception;

pub use exception::{ApplicationException, ApplicationExceptionKind};

use crate::codec::{DecodeError, EncodeError, decode_method_result, encode_method_arguments};
use crate::schema::{Schema, SchemaMismatch};
use crate::transport::{FramedTransport, Transport};
use crate::value::Value;
use crate::wire::binary::{BinaryReader, BinaryWriter};
use crate::wire::{MessageHeader, MessageType, ProtocolError, ProtocolReader, ProtocolWriter};
use std::collections::BTreeMap;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Errors that can occur when connecting to a Thrift server.
#[derive(Debug, thiserror::Error)]
#[error("Failed to connect to '{addr}': '{source}'")]
pub struct ClientConnectError {
    addr: String,
    source: std::io::Error,
}

/// Errors that can occur during a dynamic call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("Failed to encode arguments: '{0}'")]
    Encode(#[from] EncodeError),

    #[error("Failed to decode result: '{0}'")]
    Decode(#[from] DecodeError),

    #[error("Malformed reply: '{0}'")]
    Protocol(#[from] ProtocolError),

    #[error("{method} failed: out of sequence response (expected {expected}, got {actual})")]
    SequenceMismatch {
        method: String,
        expected: i32,
        actual: i32,
    },

    #[error(transparent)]
    RemoteApplicationException(#[from] ApplicationException),

    #[error("Unexpected message type {0:?} in reply")]
    UnexpectedMessageType(MessageType),

    #[error("Transport error: '{0}'")]
    Transport(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Write versioned (strict) message headers. Replies are accepted in either style.
    pub strict_write: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { strict_write: true }
    }
}

/// A schema-driven Thrift client session.
#[derive(Debug)]
pub struct DynamicClient<T = FramedTransport<TcpStream>> {
    transport: T,
    schema: Schema,
    seq_id: i32,
    config: ClientConfig,
}

impl DynamicClient<FramedTransport<TcpStream>> {
    /// Connects to `addr` over TCP with a framed transport.
    pub async fn connect(
        addr: impl ToSocketAddrs + std::fmt::Display,
        schema: Schema,
    ) -> Result<Self, ClientConnectError> {
        let transport = FramedTransport::connect(&addr)
            .await
            .map_err(|source| ClientConnectError {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self::new(transport, schema))
    }
}

impl<T> DynamicClient<T> {
    pub fn new(transport: T, schema: Schema) -> Self {
        Self::with_config(transport, schema, ClientConfig::default())
    }

    pub fn with_config(transport: T, schema: Schema, config: ClientConfig) -> Self {
        Self {
            transport,
            schema,
            seq_id: 0,
            config,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Sequence id of the most recent call, zero before the first one.
    pub fn seq_id(&self) -> i32 {
        self.seq_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> DynamicClient<T> {
    /// Invokes `service.method` with arguments keyed by argument name.
    ///
    /// # Returns
    ///
    /// * `Ok(results)` - The decoded reply, keyed `"<method>_result"` for the return value or by
    ///   exception name for a declared exception. Empty for `void` and `oneway` methods.
    /// * `Err(CallError)` - Schema, encode, transport, correlation, remote or decode failure.
    pub async fn invoke(
        &mut self,
        service: &str,
        method: &str,
        args: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, CallError> {
        let method_def = self.schema.method(service, method)?;

        self.seq_id = self.seq_id.wrapping_add(1);
        let seq_id = self.seq_id;

        let message_type = if method_def.oneway {
            MessageType::Oneway
        } else {
            MessageType::Call
        };

        let mut writer = BinaryWriter::new(self.config.strict_write);
        writer.write_message_begin(&MessageHeader {
            name: method.to_string(),
            message_type,
            seq_id,
        })?;
        encode_method_arguments(&self.schema, method_def, args, &mut writer)?;
        writer.write_message_end()?;

        tracing::debug!(service, method, seq_id, bytes = writer.len(), "sending call");
        self.transport.send(writer.into_bytes()).await?;

        if method_def.oneway {
            return Ok(BTreeMap::new());
        }

        let frame = self.transport.recv().await?;
        tracing::trace!(service, method, seq_id, bytes = frame.len(), "received reply");

        let mut reader = BinaryReader::new(frame);
        let header = reader.read_message_begin()?;

        match header.message_type {
            MessageType::Reply => {}
            MessageType::Exception => {
                let exception = ApplicationException::read(&mut reader)?;
                reader.read_message_end()?;
                tracing::warn!(
                    service,
                    method,
                    seq_id,
                    code = exception.code(),
                    message = %exception.message,
                    "remote application exception"
                );
                return Err(exception.into());
            }
            other => return Err(CallError::UnexpectedMessageType(other)),
        }

        if header.seq_id != seq_id {
            tracing::warn!(
                service,
                method,
                expected = seq_id,
                actual = header.seq_id,
                "out of sequence response"
            );
            return Err(CallError::SequenceMismatch {
                method: method.to_string(),
                expected: seq_id,
                actual: header.seq_id,
            });
        }

        let results = decode_method_result(&self.schema, method_def, &mut reader)?;
        reader.read_message_end()?;

        Ok(results)
    }
}
