use crate::schema::{BaseKind, Schema, TypeRef};
use crate::wire::WireType;

/// Resolves a leaf type name to its wire type.
///
/// Base keywords match case-insensitively. Otherwise the name is looked up as a struct, then as
/// an enum (sent as `I32`). Anything else is [`WireType::Stop`].
pub fn resolve(schema: &Schema, type_name: &str) -> WireType {
    if let Some(kind) = BaseKind::from_keyword(type_name) {
        return kind.wire_type();
    }
    if schema.struct_def(type_name).is_some() {
        return WireType::Struct;
    }
    if schema.enum_def(type_name).is_some() {
        return WireType::I32;
    }
    WireType::Stop
}

/// Wire type of a declared type. Containers are decided by shape; only names go through
/// [`resolve`].
pub fn wire_type_of(schema: &Schema, ty: &TypeRef) -> WireType {
    match ty {
        TypeRef::Void => WireType::Stop,
        TypeRef::Base(kind) => kind.wire_type(),
        TypeRef::Named(name) => resolve(schema, name),
        TypeRef::Map(..) => WireType::Map,
        TypeRef::List(_) => WireType::List,
        TypeRef::Set(_) => WireType::Set,
    }
}
