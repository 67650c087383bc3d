//! # Schema Registry
//!
//! This module holds the structural view of an interface definition: services with their
//! methods, named structs and named enums.
//!
//! Parsing IDL source text is not done here. The registry is loaded from a JSON document that
//! mirrors the parsed tables, for example:
//!
//! ```json
//! {
//!   "services": {
//!     "Geometry": {
//!       "methods": {
//!         "area": {
//!           "arguments": [{ "id": 1, "name": "points", "type": "list<Point>" }],
//!           "returnType": "double"
//!         }
//!       }
//!     }
//!   },
//!   "structs": {
//!     "Point": { "fields": [
//!       { "id": 1, "name": "x", "type": "i32" },
//!       { "id": 2, "name": "y", "type": "i32" }
//!     ] }
//!   },
//!   "enums": { "Color": { "values": { "RED": 1, "GREEN": 2 } } }
//! }
//! ```
//!
//! A [`Schema`] is immutable once loaded; every lookup borrows from it.
mod type_ref;

pub use type_ref::{BaseKind, ParseTypeError, TypeRef};

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Errors that can occur while loading a schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema file '{path}': '{source}'")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid schema document: '{0}'")]
    Json(#[from] serde_json::Error),
    #[error("Invalid type '{expression}' in {location}: {source}")]
    InvalidType {
        location: String,
        expression: String,
        source: ParseTypeError,
    },
    #[error("'void' is only valid as a return type, found in {location}")]
    VoidField { location: String },
    #[error("Duplicate field id {id} in {location}")]
    DuplicateFieldId { location: String, id: i16 },
}

/// A requested service or method that the loaded schema does not declare.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),
    #[error("Method '{method}' not found in service '{service}'")]
    MethodNotFound { service: String, method: String },
}

/// The loaded, read-only interface definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    services: HashMap<String, Service>,
    structs: HashMap<String, StructDef>,
    enums: HashMap<String, EnumDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub name: String,
    pub methods: HashMap<String, Method>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    /// Declared order is wire order.
    pub arguments: Vec<FieldDef>,
    pub return_type: TypeRef,
    /// Declared exceptions (`throws`), carried in the reply struct next to the result.
    pub exceptions: Vec<FieldDef>,
    pub oneway: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub id: i16,
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn field_by_id(&self, id: i16) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub values: BTreeMap<String, i32>,
}

impl EnumDef {
    pub fn value_of(&self, label: &str) -> Option<i32> {
        self.values.get(label).copied()
    }

    pub fn label_of(&self, value: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(label, _)| label.as_str())
    }
}

impl Schema {
    /// Parses a schema document from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Builds a schema from an already parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        let document: SchemaDocument = serde_json::from_value(value)?;
        Self::from_document(document)
    }

    /// Reads and parses a schema document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn service(&self, name: &str) -> Result<&Service, SchemaMismatch> {
        self.services
            .get(name)
            .ok_or_else(|| SchemaMismatch::ServiceNotFound(name.to_string()))
    }

    /// Looks up `method` inside `service`.
    pub fn method(&self, service: &str, method: &str) -> Result<&Method, SchemaMismatch> {
        self.service(service)?
            .methods
            .get(method)
            .ok_or_else(|| SchemaMismatch::MethodNotFound {
                service: service.to_string(),
                method: method.to_string(),
            })
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Service names, sorted.
    pub fn service_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Struct names, sorted.
    pub fn struct_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.structs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Enum names, sorted.
    pub fn enum_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.enums.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn from_document(document: SchemaDocument) -> Result<Self, SchemaError> {
        let mut services = HashMap::with_capacity(document.services.len());
        for (service_name, service_doc) in document.services {
            let mut methods = HashMap::with_capacity(service_doc.methods.len());
            for (method_name, method_doc) in service_doc.methods {
                let location = format!("service '{service_name}' method '{method_name}'");
                let method = method_doc.into_method(method_name.clone(), &location)?;
                methods.insert(method_name, method);
            }
            services.insert(
                service_name.clone(),
                Service {
                    name: service_name,
                    methods,
                },
            );
        }

        let mut structs = HashMap::with_capacity(document.structs.len());
        for (name, struct_doc) in document.structs {
            let location = format!("struct '{name}'");
            let fields = into_fields(struct_doc.fields, &location)?;
            structs.insert(name.clone(), StructDef { name, fields });
        }

        let enums = document
            .enums
            .into_iter()
            .map(|(name, enum_doc)| {
                let def = EnumDef {
                    name: name.clone(),
                    values: enum_doc.values,
                };
                (name, def)
            })
            .collect();

        Ok(Self {
            services,
            structs,
            enums,
        })
    }
}

// Raw serde shapes of the schema document. Type expressions stay as strings here
// so parse failures can be reported with their location.

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    services: HashMap<String, ServiceDocument>,
    #[serde(default)]
    structs: HashMap<String, StructDocument>,
    #[serde(default)]
    enums: HashMap<String, EnumDocument>,
}

#[derive(Deserialize)]
struct ServiceDocument {
    #[serde(default)]
    methods: HashMap<String, MethodDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodDocument {
    #[serde(default)]
    arguments: Vec<FieldDocument>,
    #[serde(default = "void_type")]
    return_type: String,
    #[serde(default)]
    exceptions: Vec<FieldDocument>,
    #[serde(default)]
    oneway: bool,
}

#[derive(Deserialize)]
struct StructDocument {
    #[serde(default)]
    fields: Vec<FieldDocument>,
}

#[derive(Deserialize)]
struct EnumDocument {
    values: BTreeMap<String, i32>,
}

#[derive(Deserialize)]
struct FieldDocument {
    id: i16,
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    optional: bool,
}

fn void_type() -> String {
    "void".to_string()
}

impl MethodDocument {
    fn into_method(self, name: String, location: &str) -> Result<Method, SchemaError> {
        let return_type = parse_type(&self.return_type, &format!("{location} return type"))?;
        let arguments = into_fields(self.arguments, &format!("{location} arguments"))?;
        let exceptions = into_fields(self.exceptions, &format!("{location} exceptions"))?;

        Ok(Method {
            name,
            arguments,
            return_type,
            exceptions,
            oneway: self.oneway,
        })
    }
}

fn into_fields(docs: Vec<FieldDocument>, location: &str) -> Result<Vec<FieldDef>, SchemaError> {
    let mut seen = HashSet::with_capacity(docs.len());
    let mut fields = Vec::with_capacity(docs.len());

    for doc in docs {
        let field_location = format!("{location} field '{}'", doc.name);
        if !seen.insert(doc.id) {
            return Err(SchemaError::DuplicateFieldId {
                location: location.to_string(),
                id: doc.id,
            });
        }

        let ty = parse_type(&doc.ty, &field_location)?;
        if ty == TypeRef::Void {
            return Err(SchemaError::VoidField {
                location: field_location,
            });
        }

        fields.push(FieldDef {
            id: doc.id,
            name: doc.name,
            ty,
            optional: doc.optional,
        });
    }
    Ok(fields)
}

fn parse_type(expression: &str, location: &str) -> Result<TypeRef, SchemaError> {
    expression
        .parse()
        .map_err(|source| SchemaError::InvalidType {
            location: location.to_string(),
            expression: expression.to_string(),
            source,
        })
}
