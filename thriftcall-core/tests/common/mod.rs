#![allow(dead_code)]

use bytes::Bytes;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use thriftcall_core::Value;
use thriftcall_core::client::{ApplicationException, ApplicationExceptionKind};
use thriftcall_core::transport::{FramedTransport, Transport};
use thriftcall_core::wire::binary::{BinaryReader, BinaryWriter};
use thriftcall_core::wire::{
    FieldHeader, ListHeader, MessageHeader, MessageType, ProtocolReader, ProtocolWriter, WireType,
};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::sync::mpsc;

pub const CALCULATOR_SCHEMA: &str = r#"{
  "services": {
    "Calculator": {
      "methods": {
        "add": {
          "arguments": [
            { "id": 1, "name": "a", "type": "i32" },
            { "id": 2, "name": "b", "type": "i32" }
          ],
          "returnType": "i64"
        },
        "echo": {
          "arguments": [
            { "id": 1, "name": "message", "type": "string" },
            { "id": 2, "name": "suffix", "type": "string", "optional": true }
          ],
          "returnType": "string"
        },
        "divide": {
          "arguments": [
            { "id": 1, "name": "a", "type": "double" },
            { "id": 2, "name": "b", "type": "double" }
          ],
          "returnType": "double",
          "exceptions": [{ "id": 1, "name": "divByZero", "type": "DivideByZero" }]
        },
        "centroid": {
          "arguments": [{ "id": 1, "name": "points", "type": "list<Point>" }],
          "returnType": "Point"
        },
        "paint": {
          "arguments": [
            { "id": 1, "name": "color", "type": "Color" },
            { "id": 2, "name": "tags", "type": "map<string, i32>" }
          ],
          "returnType": "list<Color>"
        },
        "notify": {
          "arguments": [{ "id": 1, "name": "message", "type": "string" }],
          "oneway": true
        },
        "crash": {},
        "reset": {}
      }
    }
  },
  "structs": {
    "Point": {
      "fields": [
        { "id": 1, "name": "x", "type": "i32" },
        { "id": 2, "name": "y", "type": "i32" }
      ]
    },
    "DivideByZero": {
      "fields": [{ "id": 1, "name": "message", "type": "string" }]
    }
  },
  "enums": {
    "Color": { "values": { "RED": 1, "GREEN": 2, "BLUE": 3 } }
  }
}"#;

pub fn args(json: serde_json::Value) -> BTreeMap<String, Value> {
    match Value::from(json) {
        Value::Map(map) => map,
        other => panic!("expected a JSON object, got {other:?}"),
    }
}

/// Builds a `REPLY` message whose result struct is written by `write_fields`.
pub fn reply(name: &str, seq_id: i32, write_fields: impl FnOnce(&mut BinaryWriter)) -> Bytes {
    let mut writer = BinaryWriter::new(true);
    writer
        .write_message_begin(&MessageHeader {
            name: name.to_string(),
            message_type: MessageType::Reply,
            seq_id,
        })
        .unwrap();
    writer.write_struct_begin("result").unwrap();
    write_fields(&mut writer);
    writer.write_field_stop().unwrap();
    writer.write_struct_end().unwrap();
    writer.write_message_end().unwrap();
    writer.into_bytes()
}

/// A reply carrying a single `i64` success value.
pub fn i64_reply(name: &str, seq_id: i32, value: i64) -> Bytes {
    reply(name, seq_id, |w| {
        w.write_field_begin("success", WireType::I64, 0).unwrap();
        w.write_i64(value).unwrap();
    })
}

pub fn exception_reply(name: &str, seq_id: i32, exception: &ApplicationException) -> Bytes {
    let mut writer = BinaryWriter::new(true);
    writer
        .write_message_begin(&MessageHeader {
            name: name.to_string(),
            message_type: MessageType::Exception,
            seq_id,
        })
        .unwrap();
    exception.write(&mut writer).unwrap();
    writer.write_message_end().unwrap();
    writer.into_bytes()
}

/// Records every sent frame and answers with pre-built replies, in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub sent: Vec<Bytes>,
    pub replies: VecDeque<Bytes>,
}

impl ScriptedTransport {
    pub fn with_replies(replies: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            sent: Vec::new(),
            replies: replies.into_iter().collect(),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, frame: Bytes) -> io::Result<()> {
        self.sent.push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> io::Result<Bytes> {
        self.replies
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted reply left"))
    }
}

/// Reads every field of a struct, handing each non-stop header to `on_field`.
fn read_fields(
    reader: &mut BinaryReader,
    mut on_field: impl FnMut(&mut BinaryReader, FieldHeader),
) {
    reader.read_struct_begin().unwrap();
    loop {
        let field = reader.read_field_begin().unwrap();
        if field.wire_type == WireType::Stop {
            break;
        }
        on_field(reader, field);
        reader.read_field_end().unwrap();
    }
    reader.read_struct_end().unwrap();
}

fn read_point(reader: &mut BinaryReader) -> (i32, i32) {
    let (mut x, mut y) = (0, 0);
    read_fields(reader, |r, field| match field.id {
        1 => x = r.read_i32().unwrap(),
        2 => y = r.read_i32().unwrap(),
        _ => r.skip(field.wire_type).unwrap(),
    });
    (x, y)
}

/// Starts an in-process calculator server and returns the client side of the connection,
/// plus a receiver for the messages sent to the oneway `notify` method.
pub fn spawn_calculator() -> (FramedTransport<DuplexStream>, mpsc::UnboundedReceiver<String>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let notifications = serve_calculator(server);
    (FramedTransport::new(client), notifications)
}

/// Serves calculator calls on `stream` until the peer hangs up.
pub fn serve_calculator<S>(stream: S) -> mpsc::UnboundedReceiver<String>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut transport = FramedTransport::new(stream);
        while let Ok(frame) = transport.recv().await {
            let mut reader = BinaryReader::new(frame);
            let header = reader.read_message_begin().unwrap();
            let name = header.name.clone();
            let seq_id = header.seq_id;

            let response = match name.as_str() {
                "add" => {
                    let (mut a, mut b) = (0i64, 0i64);
                    read_fields(&mut reader, |r, field| match field.id {
                        1 => a = i64::from(r.read_i32().unwrap()),
                        2 => b = i64::from(r.read_i32().unwrap()),
                        _ => r.skip(field.wire_type).unwrap(),
                    });
                    Some(i64_reply(&name, seq_id, a + b))
                }
                "echo" => {
                    let mut message = String::new();
                    read_fields(&mut reader, |r, field| match field.id {
                        1 => message = r.read_string().unwrap(),
                        2 => {
                            let suffix = r.read_string().unwrap();
                            message.push_str(&suffix);
                        }
                        _ => r.skip(field.wire_type).unwrap(),
                    });
                    Some(reply(&name, seq_id, |w| {
                        w.write_field_begin("success", WireType::String, 0).unwrap();
                        w.write_string(&message).unwrap();
                    }))
                }
                "divide" => {
                    let (mut a, mut b) = (0.0, 0.0);
                    read_fields(&mut reader, |r, field| match field.id {
                        1 => a = r.read_double().unwrap(),
                        2 => b = r.read_double().unwrap(),
                        _ => r.skip(field.wire_type).unwrap(),
                    });
                    Some(reply(&name, seq_id, |w| {
                        if b == 0.0 {
                            w.write_field_begin("divByZero", WireType::Struct, 1).unwrap();
                            w.write_field_begin("message", WireType::String, 1).unwrap();
                            w.write_string("division by zero").unwrap();
                            w.write_field_stop().unwrap();
                        } else {
                            w.write_field_begin("success", WireType::Double, 0).unwrap();
                            w.write_double(a / b).unwrap();
                        }
                    }))
                }
                "centroid" => {
                    let mut points = Vec::new();
                    read_fields(&mut reader, |r, field| {
                        let list = r.read_list_begin().unwrap();
                        assert_eq!(field.id, 1);
                        assert_eq!(list.element_type, WireType::Struct);
                        for _ in 0..list.size {
                            points.push(read_point(r));
                        }
                        r.read_list_end().unwrap();
                    });
                    let n = points.len().max(1) as i32;
                    let x = points.iter().map(|p| p.0).sum::<i32>() / n;
                    let y = points.iter().map(|p| p.1).sum::<i32>() / n;
                    Some(reply(&name, seq_id, |w| {
                        w.write_field_begin("success", WireType::Struct, 0).unwrap();
                        w.write_field_begin("x", WireType::I32, 1).unwrap();
                        w.write_i32(x).unwrap();
                        w.write_field_begin("y", WireType::I32, 2).unwrap();
                        w.write_i32(y).unwrap();
                        w.write_field_stop().unwrap();
                    }))
                }
                "paint" => {
                    let mut colors = Vec::new();
                    read_fields(&mut reader, |r, field| match field.id {
                        1 => colors.push(r.read_i32().unwrap()),
                        2 => {
                            let map = r.read_map_begin().unwrap();
                            for _ in 0..map.size {
                                r.read_string().unwrap();
                                colors.push(r.read_i32().unwrap());
                            }
                            r.read_map_end().unwrap();
                        }
                        _ => r.skip(field.wire_type).unwrap(),
                    });
                    Some(reply(&name, seq_id, |w| {
                        w.write_field_begin("success", WireType::List, 0).unwrap();
                        w.write_list_begin(&ListHeader {
                            element_type: WireType::I32,
                            size: colors.len(),
                        })
                        .unwrap();
                        for color in &colors {
                            w.write_i32(*color).unwrap();
                        }
                    }))
                }
                "notify" => {
                    assert_eq!(header.message_type, MessageType::Oneway);
                    let mut message = String::new();
                    read_fields(&mut reader, |r, field| match field.id {
                        1 => message = r.read_string().unwrap(),
                        _ => r.skip(field.wire_type).unwrap(),
                    });
                    let _ = notify_tx.send(message);
                    None
                }
                "crash" => Some(exception_reply(
                    &name,
                    seq_id,
                    &ApplicationException::new(
                        ApplicationExceptionKind::InternalError,
                        "calculator crashed",
                    ),
                )),
                "reset" => Some(reply(&name, seq_id, |_| {})),
                _ => Some(exception_reply(
                    &name,
                    seq_id,
                    &ApplicationException::new(
                        ApplicationExceptionKind::UnknownMethod,
                        format!("Invalid method name: '{name}'"),
                    ),
                )),
            };

            if let Some(response) = response {
                if transport.send(response).await.is_err() {
                    break;
                }
            }
        }
    });

    notify_rx
}
