use colored::*;
use std::fmt::Display;
use thriftcall_core::client::{CallError, ClientConnectError};
use thriftcall_core::schema::{
    EnumDef, FieldDef, Method, SchemaError, SchemaMismatch, Service, StructDef,
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct NameList(pub &'static str, pub Vec<String>);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        match err {
            CallError::RemoteApplicationException(exception) => FormattedString(format!(
                "{} code={} kind={:?} message={:?}",
                "Thrift Failed:".red().bold(),
                exception.code(),
                exception.kind,
                exception.message
            )),
            CallError::SchemaMismatch(err) => err.into(),
            err => FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), err)),
        }
    }
}

impl From<SchemaError> for FormattedString {
    fn from(err: SchemaError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to load schema:".red().bold(),
            err
        ))
    }
}

impl From<SchemaMismatch> for FormattedString {
    fn from(err: SchemaMismatch) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Symbol Lookup Failed:".red().bold(),
            err
        ))
    }
}

impl From<ClientConnectError> for FormattedString {
    fn from(err: ClientConnectError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Connection Error:".red().bold(), err))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<NameList> for FormattedString {
    fn from(NameList(kind, names): NameList) -> Self {
        if names.is_empty() {
            return FormattedString(format!("No {kind} found.").yellow().to_string());
        }

        let mut out = format!("Available {kind}:\n");
        for name in names {
            out.push_str(&format!("  - {}\n", name.green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

fn field_line(field: &FieldDef) -> String {
    let label = if field.optional {
        format!("{} ", "optional".cyan())
    } else {
        "".to_string()
    };

    format!(
        "{}: {}{} {}",
        field.id.to_string().purple(),
        label,
        field.ty.to_string().yellow(),
        field.name
    )
}

impl From<&Service> for FormattedString {
    fn from(service: &Service) -> Self {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {{\n",
            "service".cyan(),
            service.name.green()
        ));

        let mut methods: Vec<&Method> = service.methods.values().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));

        for method in methods {
            out.push_str("  ");
            // Reuse the From<&Method> implementation
            let method_fmt = FormattedString::from(method);
            out.push_str(&method_fmt.0);
            out.push_str("\n\n");
        }
        out.push('}');
        FormattedString(out)
    }
}

impl From<&Method> for FormattedString {
    fn from(method: &Method) -> Self {
        let oneway = if method.oneway {
            format!("{} ", "oneway".cyan())
        } else {
            "".to_string()
        };

        let arguments: Vec<String> = method.arguments.iter().map(field_line).collect();

        let throws = if method.exceptions.is_empty() {
            "".to_string()
        } else {
            let exceptions: Vec<String> = method.exceptions.iter().map(field_line).collect();
            format!(" {} ({})", "throws".cyan(), exceptions.join(", "))
        };

        FormattedString(format!(
            "{}{} {}({}){};",
            oneway,
            method.return_type.to_string().yellow(),
            method.name.green(),
            arguments.join(", "),
            throws
        ))
    }
}

impl From<&StructDef> for FormattedString {
    fn from(def: &StructDef) -> Self {
        let mut out = String::new();
        out.push_str(&format!("{} {} {{\n", "struct".cyan(), def.name.green()));

        for field in &def.fields {
            out.push_str(&format!("  {};\n", field_line(field)));
        }
        out.push('}');
        FormattedString(out)
    }
}

impl From<&EnumDef> for FormattedString {
    fn from(def: &EnumDef) -> Self {
        let mut out = String::new();
        out.push_str(&format!("{} {} {{\n", "enum".cyan(), def.name.green()));

        let mut values: Vec<(&String, &i32)> = def.values.iter().collect();
        values.sort_by_key(|(_, value)| **value);

        for (label, value) in values {
            out.push_str(&format!("  {} = {};\n", label, value.to_string().purple()));
        }
        out.push('}');

        FormattedString(out)
    }
}
