//! # Thriftcall Core
//!
//! `thriftcall-core` is the foundational library powering the Thriftcall CLI. It provides a dynamic
//! Thrift client capable of invoking methods on any Thrift server without generated code:
//! the caller supplies a loaded [`schema::Schema`] and generic [`value::Value`] arguments,
//! and gets generic values back.
//!
//! ## Key Components
//!
//! * **[`DynamicClient`]:** The main entry point. It owns the call sequence counter, frames
//!   calls and correlates replies.
//! * **[`Schema`]:** The read-only description of services, methods, structs and enums,
//!   loaded once from a JSON document.
//! * **[`Value`]:** The generic payload used for arguments and results.
//!
//! ## Dynamic codec
//!
//! The [`codec`] module walks a schema and a value tree in lock-step, emitting or consuming
//! wire primitives through the [`wire::ProtocolWriter`] and [`wire::ProtocolReader`] traits.
//!
//! * **Encoder**: checks `Value` trees against the declared arguments before anything is written.
//! * **Decoder**: reads the reply struct back into `Value`s, keyed by result or exception name.
//!
//! ## Transports
//!
//! The session talks to a [`transport::Transport`], which moves whole frames. A
//! [`transport::FramedTransport`] over any tokio byte stream is provided.
pub mod client;
pub mod codec;
pub mod schema;
pub mod transport;
pub mod value;
pub mod wire;

pub use client::{CallError, ClientConfig, DynamicClient};
pub use schema::Schema;
pub use value::Value;
