use super::{FieldPath, resolver::wire_type_of};
use crate::schema::{Method, Schema, SchemaMismatch, StructDef, TypeRef};
use crate::value::Value;
use crate::wire::{MAX_NESTING_DEPTH, ProtocolError, ProtocolReader, WireType};
use std::collections::BTreeMap;

// Containers announce their size before any element is read.
// Cap pre-allocation so a corrupt size cannot reserve huge buffers.
const PREALLOCATE_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("Expected {expected} at '{path}' but the reply carries {actual}")]
    UnexpectedWireType {
        path: String,
        expected: WireType,
        actual: WireType,
    },

    #[error("Map '{path}' is declared with key type '{key_type}', only string keys are supported")]
    UnsupportedMapKey { path: String, key_type: TypeRef },

    #[error("'{path}' has unknown type '{ty}'")]
    UnknownType { path: String, ty: TypeRef },

    #[error("Wire read failed: '{0}'")]
    Protocol(#[from] ProtocolError),
}

/// Decodes the reply struct of `service.method` from `input`.
///
/// The success value is stored under `"<method>_result"`; a declared exception is stored
/// under its field name.
pub fn decode_result<R: ProtocolReader + ?Sized>(
    schema: &Schema,
    service: &str,
    method: &str,
    input: &mut R,
) -> Result<BTreeMap<String, Value>, DecodeError> {
    let method = schema.method(service, method)?;
    decode_method_result(schema, method, input)
}

/// Same as [`decode_result`] for an already resolved method.
pub fn decode_method_result<R: ProtocolReader + ?Sized>(
    schema: &Schema,
    method: &Method,
    input: &mut R,
) -> Result<BTreeMap<String, Value>, DecodeError> {
    let result_key = format!("{}_result", method.name);
    let mut decoder = Decoder {
        schema,
        input,
        path: FieldPath::default(),
        depth: 0,
    };
    let mut results = BTreeMap::new();

    decoder.input.read_struct_begin()?;
    loop {
        let field = decoder.input.read_field_begin()?;
        if field.wire_type == WireType::Stop {
            break;
        }

        let exception = match field.id {
            0 => None,
            id => method.exceptions.iter().find(|e| e.id == id),
        };

        match exception {
            Some(exception) => {
                let value = decoder.read_field(&exception.name, &exception.ty, field.wire_type)?;
                results.insert(exception.name.clone(), value);
            }
            None if method.return_type == TypeRef::Void => {
                decoder.input.skip(field.wire_type)?;
            }
            None => {
                let value = decoder.read_field(&result_key, &method.return_type, field.wire_type)?;
                results.insert(result_key.clone(), value);
            }
        }
        decoder.input.read_field_end()?;
    }
    decoder.input.read_struct_end()?;

    Ok(results)
}

struct Decoder<'a, R: ?Sized> {
    schema: &'a Schema,
    input: &'a mut R,
    path: FieldPath,
    depth: usize,
}

impl<'a, R: ProtocolReader + ?Sized> Decoder<'a, R> {
    fn read_field(
        &mut self,
        name: &str,
        ty: &TypeRef,
        actual: WireType,
    ) -> Result<Value, DecodeError> {
        self.path.push_field(name);
        let result = self.read_value(ty, actual);
        self.path.pop();
        result
    }

    fn read_value(&mut self, ty: &TypeRef, actual: WireType) -> Result<Value, DecodeError> {
        let expected = self.wire_type(ty)?;
        self.check(expected, actual)?;

        if !expected.is_container() {
            return self.read_scalar(ty, expected);
        }

        // Recursive schemas would otherwise let the reply choose the stack depth.
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ProtocolError::DepthLimitExceeded(MAX_NESTING_DEPTH).into());
        }
        self.depth += 1;

        let schema = self.schema;
        let result = match ty {
            TypeRef::Map(key_ty, value_ty) => self.read_map(key_ty, value_ty),
            TypeRef::List(element_ty) => self.read_sequence(element_ty, WireType::List),
            TypeRef::Set(element_ty) => self.read_sequence(element_ty, WireType::Set),
            TypeRef::Named(name) => match schema.struct_def(name) {
                Some(def) => self.read_struct(def),
                None => self.read_scalar(ty, expected),
            },
            TypeRef::Base(_) | TypeRef::Void => self.read_scalar(ty, expected),
        };

        self.depth -= 1;
        result
    }

    fn read_struct(&mut self, def: &StructDef) -> Result<Value, DecodeError> {
        let mut fields = BTreeMap::new();

        self.input.read_struct_begin()?;
        loop {
            let header = self.input.read_field_begin()?;
            if header.wire_type == WireType::Stop {
                break;
            }
            match def.field_by_id(header.id) {
                Some(field) => {
                    let value = self.read_field(&field.name, &field.ty, header.wire_type)?;
                    fields.insert(field.name.clone(), value);
                }
                None => self.input.skip(header.wire_type)?,
            }
            self.input.read_field_end()?;
        }
        self.input.read_struct_end()?;

        Ok(Value::Map(fields))
    }

    fn read_map(&mut self, key_ty: &TypeRef, value_ty: &TypeRef) -> Result<Value, DecodeError> {
        if wire_type_of(self.schema, key_ty) != WireType::String {
            return Err(DecodeError::UnsupportedMapKey {
                path: self.path.to_string(),
                key_type: key_ty.clone(),
            });
        }

        let header = self.input.read_map_begin()?;
        if header.size > 0 {
            self.check(WireType::String, header.key_type)?;
        }

        let mut entries = BTreeMap::new();
        for _ in 0..header.size {
            let key = self.input.read_string()?;
            self.path.push_key(&key);
            let value = self.read_value(value_ty, header.value_type);
            self.path.pop();
            entries.insert(key, value?);
        }
        self.input.read_map_end()?;

        Ok(Value::Map(entries))
    }

    fn read_sequence(
        &mut self,
        element_ty: &TypeRef,
        kind: WireType,
    ) -> Result<Value, DecodeError> {
        let header = if kind == WireType::Set {
            self.input.read_set_begin()?
        } else {
            self.input.read_list_begin()?
        };

        let mut items = Vec::with_capacity(header.size.min(PREALLOCATE_LIMIT));
        for index in 0..header.size {
            self.path.push_index(index);
            let item = self.read_value(element_ty, header.element_type);
            self.path.pop();
            items.push(item?);
        }

        if kind == WireType::Set {
            self.input.read_set_end()?;
        } else {
            self.input.read_list_end()?;
        }
        Ok(Value::List(items))
    }

    fn read_scalar(&mut self, ty: &TypeRef, wire_type: WireType) -> Result<Value, DecodeError> {
        let value = match wire_type {
            WireType::Bool => Value::Bool(self.input.read_bool()?),
            WireType::Byte => Value::Byte(self.input.read_byte()?),
            WireType::I16 => Value::I16(self.input.read_i16()?),
            WireType::I32 => Value::I32(self.input.read_i32()?),
            WireType::I64 => Value::I64(self.input.read_i64()?),
            WireType::Double => Value::Double(self.input.read_double()?),
            WireType::String => Value::String(self.input.read_string()?),
            _ => {
                return Err(DecodeError::UnknownType {
                    path: self.path.to_string(),
                    ty: ty.clone(),
                });
            }
        };
        Ok(value)
    }

    fn wire_type(&self, ty: &TypeRef) -> Result<WireType, DecodeError> {
        match wire_type_of(self.schema, ty) {
            WireType::Stop => Err(DecodeError::UnknownType {
                path: self.path.to_string(),
                ty: ty.clone(),
            }),
            wire_type => Ok(wire_type),
        }
    }

    fn check(&self, expected: WireType, actual: WireType) -> Result<(), DecodeError> {
        if expected != actual {
            return Err(DecodeError::UnexpectedWireType {
                path: self.path.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
