use super::{FieldPath, resolver::wire_type_of};
use crate::schema::{EnumDef, FieldDef, Method, Schema, SchemaMismatch, StructDef, TypeRef};
use crate::value::Value;
use crate::wire::{ListHeader, MapHeader, ProtocolError, ProtocolWriter, WireType};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    #[error("Required field '{path}' (id {id}) has no value")]
    MissingRequiredField { path: String, id: i16 },

    #[error("Field '{path}' expects {expected} but got {found}")]
    TypeMismatch {
        path: String,
        expected: WireType,
        found: String,
    },

    #[error("Map '{path}' is declared with key type '{key_type}', only string keys are supported")]
    UnsupportedMapKey { path: String, key_type: TypeRef },

    #[error(
        "Map '{path}' is declared with value type '{value_type}', only scalar values are supported"
    )]
    UnsupportedMapValue { path: String, value_type: TypeRef },

    #[error("Field '{path}' has unknown type '{ty}'")]
    UnknownType { path: String, ty: TypeRef },

    #[error("'{label}' is not a value of enum '{enum_name}' at '{path}'")]
    UnknownEnumLabel {
        path: String,
        enum_name: String,
        label: String,
    },

    #[error("Wire write failed: '{0}'")]
    Protocol(#[from] ProtocolError),
}

/// Encodes the arguments struct of `service.method` into `out`.
///
/// Writes `<method>_args` as a struct: every declared argument in order, then field-stop.
pub fn encode_arguments<W: ProtocolWriter + ?Sized>(
    schema: &Schema,
    service: &str,
    method: &str,
    args: &BTreeMap<String, Value>,
    out: &mut W,
) -> Result<(), EncodeError> {
    let method = schema.method(service, method)?;
    encode_method_arguments(schema, method, args, out)
}

/// Same as [`encode_arguments`] for an already resolved method.
///
/// Required top-level arguments are checked before anything is written.
pub fn encode_method_arguments<W: ProtocolWriter + ?Sized>(
    schema: &Schema,
    method: &Method,
    args: &BTreeMap<String, Value>,
    out: &mut W,
) -> Result<(), EncodeError> {
    if let Some(missing) = method
        .arguments
        .iter()
        .find(|f| !f.optional && args.get(&f.name).is_none_or(Value::is_null))
    {
        return Err(EncodeError::MissingRequiredField {
            path: missing.name.clone(),
            id: missing.id,
        });
    }

    let mut encoder = Encoder {
        schema,
        out,
        path: FieldPath::default(),
    };
    encoder.write_struct(&format!("{}_args", method.name), &method.arguments, args)
}

struct Encoder<'a, W: ?Sized> {
    schema: &'a Schema,
    out: &'a mut W,
    path: FieldPath,
}

impl<'a, W: ProtocolWriter + ?Sized> Encoder<'a, W> {
    fn write_struct(
        &mut self,
        name: &str,
        fields: &[FieldDef],
        values: &BTreeMap<String, Value>,
    ) -> Result<(), EncodeError> {
        self.out.write_struct_begin(name)?;
        for field in fields {
            self.path.push_field(&field.name);
            let result = self.write_field(field, values.get(&field.name));
            self.path.pop();
            result?;
        }
        self.out.write_field_stop()?;
        self.out.write_struct_end()?;
        Ok(())
    }

    fn write_field(&mut self, field: &FieldDef, value: Option<&Value>) -> Result<(), EncodeError> {
        let value = match value {
            Some(value) if !value.is_null() => value,
            _ if field.optional => return Ok(()),
            _ => {
                return Err(EncodeError::MissingRequiredField {
                    path: self.path.to_string(),
                    id: field.id,
                });
            }
        };

        let wire_type = self.wire_type(&field.ty)?;
        self.out.write_field_begin(&field.name, wire_type, field.id)?;
        self.write_value(&field.ty, value)?;
        self.out.write_field_end()?;
        Ok(())
    }

    fn write_value(&mut self, ty: &TypeRef, value: &Value) -> Result<(), EncodeError> {
        let schema = self.schema;
        match ty {
            TypeRef::Map(key_ty, value_ty) => self.write_map(key_ty, value_ty, value),
            TypeRef::List(element_ty) => self.write_sequence(element_ty, WireType::List, value),
            TypeRef::Set(element_ty) => self.write_sequence(element_ty, WireType::Set, value),
            TypeRef::Named(name) => match schema.struct_def(name) {
                Some(def) => self.write_struct_value(def, value),
                None => self.write_scalar(ty, value),
            },
            TypeRef::Base(_) | TypeRef::Void => self.write_scalar(ty, value),
        }
    }

    fn write_struct_value(&mut self, def: &StructDef, value: &Value) -> Result<(), EncodeError> {
        let Value::Map(fields) = value else {
            return Err(self.mismatch(WireType::Struct, value.kind()));
        };
        self.write_struct(&def.name, &def.fields, fields)
    }

    fn write_map(
        &mut self,
        key_ty: &TypeRef,
        value_ty: &TypeRef,
        value: &Value,
    ) -> Result<(), EncodeError> {
        if wire_type_of(self.schema, key_ty) != WireType::String {
            return Err(EncodeError::UnsupportedMapKey {
                path: self.path.to_string(),
                key_type: key_ty.clone(),
            });
        }

        let value_wire_type = self.wire_type(value_ty)?;
        if value_wire_type.is_container() {
            return Err(EncodeError::UnsupportedMapValue {
                path: self.path.to_string(),
                value_type: value_ty.clone(),
            });
        }

        let Value::Map(entries) = value else {
            return Err(self.mismatch(WireType::Map, value.kind()));
        };

        self.out.write_map_begin(&MapHeader {
            key_type: WireType::String,
            value_type: value_wire_type,
            size: entries.len(),
        })?;
        for (key, entry) in entries {
            self.path.push_key(key);
            let result = self
                .out
                .write_string(key)
                .map_err(EncodeError::from)
                .and_then(|()| self.write_scalar(value_ty, entry));
            self.path.pop();
            result?;
        }
        self.out.write_map_end()?;
        Ok(())
    }

    fn write_sequence(
        &mut self,
        element_ty: &TypeRef,
        kind: WireType,
        value: &Value,
    ) -> Result<(), EncodeError> {
        let element_type = self.wire_type(element_ty)?;
        let Value::List(items) = value else {
            return Err(self.mismatch(kind, value.kind()));
        };

        let header = ListHeader {
            element_type,
            size: items.len(),
        };
        if kind == WireType::Set {
            self.out.write_set_begin(&header)?;
        } else {
            self.out.write_list_begin(&header)?;
        }

        for (index, item) in items.iter().enumerate() {
            self.path.push_index(index);
            let result = self.write_value(element_ty, item);
            self.path.pop();
            result?;
        }

        if kind == WireType::Set {
            self.out.write_set_end()?;
        } else {
            self.out.write_list_end()?;
        }
        Ok(())
    }

    fn write_scalar(&mut self, ty: &TypeRef, value: &Value) -> Result<(), EncodeError> {
        match self.wire_type(ty)? {
            WireType::Bool => match value {
                Value::Bool(b) => Ok(self.out.write_bool(*b)?),
                other => Err(self.mismatch(WireType::Bool, other.kind())),
            },
            WireType::Byte => {
                let v = self.integer(WireType::Byte, value)?;
                Ok(self.out.write_byte(v)?)
            }
            WireType::I16 => {
                let v = self.integer(WireType::I16, value)?;
                Ok(self.out.write_i16(v)?)
            }
            WireType::I32 => {
                let v = match (self.enum_def(ty), value) {
                    (Some(def), Value::String(label)) => self.enum_value(def, label)?,
                    _ => self.integer(WireType::I32, value)?,
                };
                Ok(self.out.write_i32(v)?)
            }
            WireType::I64 => {
                let v = self.integer(WireType::I64, value)?;
                Ok(self.out.write_i64(v)?)
            }
            WireType::Double => match value {
                Value::Double(d) => Ok(self.out.write_double(*d)?),
                other => match other.as_integer() {
                    Some(i) => Ok(self.out.write_double(i as f64)?),
                    None => Err(self.mismatch(WireType::Double, other.kind())),
                },
            },
            WireType::String => match value {
                Value::String(s) => Ok(self.out.write_string(s)?),
                other => Err(self.mismatch(WireType::String, other.kind())),
            },
            other => Err(self.mismatch(other, value.kind())),
        }
    }

    fn integer<T: TryFrom<i64>>(
        &self,
        expected: WireType,
        value: &Value,
    ) -> Result<T, EncodeError> {
        let wide = value
            .as_integer()
            .ok_or_else(|| self.mismatch(expected, value.kind()))?;
        T::try_from(wide).map_err(|_| {
            self.mismatch(expected, &format!("{} {wide} (out of range)", value.kind()))
        })
    }

    fn enum_def(&self, ty: &TypeRef) -> Option<&'a EnumDef> {
        let schema = self.schema;
        ty.named().and_then(|name| schema.enum_def(name))
    }

    fn enum_value(&self, def: &EnumDef, label: &str) -> Result<i32, EncodeError> {
        def.value_of(label)
            .ok_or_else(|| EncodeError::UnknownEnumLabel {
                path: self.path.to_string(),
                enum_name: def.name.clone(),
                label: label.to_string(),
            })
    }

    fn wire_type(&self, ty: &TypeRef) -> Result<WireType, EncodeError> {
        match wire_type_of(self.schema, ty) {
            WireType::Stop => Err(EncodeError::UnknownType {
                path: self.path.to_string(),
                ty: ty.clone(),
            }),
            wire_type => Ok(wire_type),
        }
    }

    fn mismatch(&self, expected: WireType, found: &str) -> EncodeError {
        EncodeError::TypeMismatch {
            path: self.path.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ProtocolReader;
    use crate::wire::binary::{BinaryReader, BinaryWriter};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "services": {
                "Shapes": {
                    "methods": {
                        "draw": {
                            "arguments": [
                                { "id": 1, "name": "points", "type": "list<Point>" },
                                { "id": 2, "name": "label", "type": "string", "optional": true },
                                { "id": 3, "name": "color", "type": "Color" }
                            ]
                        },
                        "tag": {
                            "arguments": [{ "id": 1, "name": "tags", "type": "map<string, i32>" }]
                        },
                        "index": {
                            "arguments": [{ "id": 1, "name": "byId", "type": "map<i32, string>" }]
                        },
                        "nest": {
                            "arguments": [
                                { "id": 1, "name": "groups", "type": "map<string, list<i32>>" }
                            ]
                        },
                        "unique": {
                            "arguments": [{ "id": 1, "name": "ids", "type": "set<i64>" }]
                        },
                        "ghost": {
                            "arguments": [{ "id": 1, "name": "g", "type": "Ghost" }]
                        },
                        "scalars": {
                            "arguments": [
                                { "id": 1, "name": "flag", "type": "bool" },
                                { "id": 2, "name": "small", "type": "byte" },
                                { "id": 3, "name": "short", "type": "i16" },
                                { "id": 4, "name": "ratio", "type": "double" }
                            ]
                        }
                    }
                }
            },
            "structs": {
                "Point": { "fields": [
                    { "id": 1, "name": "x", "type": "i32" },
                    { "id": 2, "name": "y", "type": "i32" }
                ] }
            },
            "enums": { "Color": { "values": { "RED": 1, "BLUE": 3 } } }
        }))
        .unwrap()
    }

    fn args(json: serde_json::Value) -> BTreeMap<String, Value> {
        match Value::from(json) {
            Value::Map(map) => map,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    fn encode(method: &str, json: serde_json::Value) -> Result<BinaryReader, EncodeError> {
        let mut writer = BinaryWriter::new(true);
        encode_arguments(&schema(), "Shapes", method, &args(json), &mut writer)?;
        Ok(BinaryReader::new(writer.into_bytes()))
    }

    fn expect_field(reader: &mut BinaryReader, wire_type: WireType, id: i16) {
        let header = reader.read_field_begin().unwrap();
        assert_eq!((header.wire_type, header.id), (wire_type, id));
    }

    #[test]
    fn encodes_struct_lists() {
        let mut reader = encode(
            "draw",
            json!({ "points": [{ "x": 1, "y": 2 }, { "x": 3, "y": 4 }], "color": "BLUE" }),
        )
        .unwrap();

        expect_field(&mut reader, WireType::List, 1);
        let list = reader.read_list_begin().unwrap();
        assert_eq!(
            list,
            ListHeader {
                element_type: WireType::Struct,
                size: 2
            }
        );
        for (x, y) in [(1, 2), (3, 4)] {
            expect_field(&mut reader, WireType::I32, 1);
            assert_eq!(reader.read_i32().unwrap(), x);
            expect_field(&mut reader, WireType::I32, 2);
            assert_eq!(reader.read_i32().unwrap(), y);
            expect_field(&mut reader, WireType::Stop, 0);
        }

        expect_field(&mut reader, WireType::I32, 3);
        assert_eq!(reader.read_i32().unwrap(), 3);
        expect_field(&mut reader, WireType::Stop, 0);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn omits_absent_optional_fields() {
        for json in [
            json!({ "points": [], "color": 1 }),
            json!({ "points": [], "color": 1, "label": null }),
        ] {
            let mut reader = encode("draw", json).unwrap();
            let mut seen = Vec::new();
            loop {
                let header = reader.read_field_begin().unwrap();
                if header.wire_type == WireType::Stop {
                    break;
                }
                seen.push(header.id);
                reader.skip(header.wire_type).unwrap();
            }
            assert_eq!(seen, vec![1, 3]);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn missing_required_argument_writes_nothing() {
        let mut writer = BinaryWriter::new(true);
        let err = encode_arguments(
            &schema(),
            "Shapes",
            "draw",
            &args(json!({ "points": [] })),
            &mut writer,
        )
        .unwrap_err();

        assert_eq!(
            err,
            EncodeError::MissingRequiredField {
                path: "color".to_string(),
                id: 3
            }
        );
        assert!(writer.is_empty());
    }

    #[test]
    fn missing_required_nested_field_reports_its_path() {
        let err = encode("draw", json!({ "points": [{ "x": 1 }], "color": 1 })).unwrap_err();
        assert_eq!(
            err,
            EncodeError::MissingRequiredField {
                path: "points[0].y".to_string(),
                id: 2
            }
        );
    }

    #[test]
    fn encodes_string_keyed_maps() {
        let mut reader = encode("tag", json!({ "tags": { "a": 1, "b": 2 } })).unwrap();

        expect_field(&mut reader, WireType::Map, 1);
        assert_eq!(
            reader.read_map_begin().unwrap(),
            MapHeader {
                key_type: WireType::String,
                value_type: WireType::I32,
                size: 2
            }
        );
        assert_eq!(reader.read_string().unwrap(), "a");
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_string().unwrap(), "b");
        assert_eq!(reader.read_i32().unwrap(), 2);
        expect_field(&mut reader, WireType::Stop, 0);
    }

    #[test]
    fn rejects_non_string_map_keys() {
        let err = encode("index", json!({ "byId": { "1": "one" } })).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnsupportedMapKey {
                path: "byId".to_string(),
                key_type: TypeRef::Base(crate::schema::BaseKind::I32)
            }
        );
    }

    #[test]
    fn rejects_container_map_values() {
        let err = encode("nest", json!({ "groups": { "a": [1] } })).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedMapValue { .. }));
    }

    #[test]
    fn encodes_sets_with_set_markers() {
        let mut reader = encode("unique", json!({ "ids": [5, 6, 7] })).unwrap();
        expect_field(&mut reader, WireType::Set, 1);
        let header = reader.read_set_begin().unwrap();
        assert_eq!(header.element_type, WireType::I64);
        assert_eq!(header.size, 3);
        for expected in [5, 6, 7] {
            assert_eq!(reader.read_i64().unwrap(), expected);
        }
    }

    #[test]
    fn reports_type_mismatches_with_location() {
        let err = encode("draw", json!({ "points": [{ "x": "1", "y": 2 }], "color": 1 }))
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::TypeMismatch {
                path: "points[0].x".to_string(),
                expected: WireType::I32,
                found: "string".to_string()
            }
        );

        let err = encode("draw", json!({ "points": {}, "color": 1 })).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { expected: WireType::List, .. }));
    }

    #[test]
    fn checks_integer_ranges() {
        let err = encode(
            "scalars",
            json!({ "flag": true, "small": 300, "short": 1, "ratio": 1.0 }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::TypeMismatch { expected: WireType::Byte, ref path, .. } if path == "small"
        ));
    }

    #[test]
    fn coerces_scalars() {
        let mut reader = encode(
            "scalars",
            json!({ "flag": false, "small": -2, "short": 1000, "ratio": 3 }),
        )
        .unwrap();
        expect_field(&mut reader, WireType::Bool, 1);
        assert!(!reader.read_bool().unwrap());
        expect_field(&mut reader, WireType::Byte, 2);
        assert_eq!(reader.read_byte().unwrap(), -2);
        expect_field(&mut reader, WireType::I16, 3);
        assert_eq!(reader.read_i16().unwrap(), 1000);
        expect_field(&mut reader, WireType::Double, 4);
        assert_eq!(reader.read_double().unwrap(), 3.0);
    }

    #[test]
    fn rejects_unknown_enum_labels_and_types() {
        let err = encode("draw", json!({ "points": [], "color": "GREEN" })).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownEnumLabel { ref label, .. } if label == "GREEN"));

        let err = encode("ghost", json!({ "g": 1 })).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownType { ref path, .. } if path == "g"));
    }

    #[test]
    fn unknown_method_is_a_schema_mismatch() {
        let err = encode("erase", json!({})).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::SchemaMismatch(SchemaMismatch::MethodNotFound { .. })
        ));
    }
}
