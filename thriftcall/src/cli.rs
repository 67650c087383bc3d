//! # CLI
//!
//! This module defines the command-line interface of `thriftcall` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring endpoints
//! are `Service/method`).
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "thriftcall", version, about = "Dynamic Thrift CLI")]
pub struct Cli {
    /// Path to the JSON schema describing services, structs and enums
    #[arg(long, env = "THRIFTCALL_SCHEMA", global = true)]
    pub schema: Option<PathBuf>,

    /// Log the call lifecycle to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Perform a Thrift call to a server
    ///
    /// This command connects to a Thrift server over framed TCP and executes a method using
    /// JSON arguments keyed by argument name.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// thriftcall --schema calculator.json call 127.0.0.1:9090 Calculator/add \
    ///     --args '{"a": 1, "b": 2}'
    /// ```
    Call {
        /// The server address to connect to (e.g. 127.0.0.1:9090)
        addr: String,

        /// Endpoint (Service/method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// JSON object of arguments keyed by argument name
        #[arg(long, value_parser = parse_args, default_value = "{}")]
        args: serde_json::Map<String, serde_json::Value>,

        /// Largest reply frame accepted, in bytes
        #[arg(long, default_value_t = thriftcall_core::transport::DEFAULT_MAX_FRAME_SIZE)]
        max_frame_size: usize,
    },

    /// List available services or other schema resources
    List {
        #[command(subcommand)]
        sub: ListCommands,
    },

    /// Describe a service, method, struct or enum in detail
    Describe {
        #[command(subcommand)]
        sub: DescribeCommands,
    },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// List all services declared in the schema
    Services,
    /// List all structs declared in the schema
    Structs,
    /// List all enums declared in the schema
    Enums,
}

#[derive(Subcommand)]
pub enum DescribeCommands {
    /// Describe a specific service (list its methods)
    Service {
        /// Service name (e.g. Calculator)
        service: String,
    },
    /// Describe a specific method (Show method definition)
    Method {
        /// Method name (e.g. Calculator/add)
        #[arg(value_parser = parse_endpoint)]
        method: (String, String),
    },
    /// Describe a specific struct (show its fields)
    Struct {
        /// Struct name (e.g. Point)
        name: String,
    },
    /// Describe a specific enum (show its values)
    Enum {
        /// Enum name (e.g. Color)
        name: String,
    },
}

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value
        .split_once('/')
        .ok_or_else(|| format!("Invalid endpoint format: '{value}'. Expected 'Service/method'",))?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_args(value: &str) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    match serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!(
            "Arguments must be a JSON object keyed by argument name, got '{other}'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_splits_on_the_first_slash() {
        assert_eq!(
            parse_endpoint("Calculator/add").unwrap(),
            ("Calculator".to_string(), "add".to_string())
        );
        assert!(parse_endpoint("Calculator").is_err());
        assert!(parse_endpoint("Calculator/ ").is_err());
        assert!(parse_endpoint("/add").is_err());
    }

    #[test]
    fn args_must_be_an_object() {
        let args = parse_args(r#"{"a": 1}"#).unwrap();
        assert_eq!(args["a"], serde_json::json!(1));
        assert!(parse_args("[1, 2]").is_err());
        assert!(parse_args("{not json").is_err());
    }

    #[test]
    fn call_command_parses() {
        let cli = Cli::try_parse_from([
            "thriftcall",
            "--schema",
            "calc.json",
            "call",
            "127.0.0.1:9090",
            "Calculator/add",
            "--args",
            r#"{"a": 1, "b": 2}"#,
        ])
        .unwrap();

        assert_eq!(cli.schema, Some(PathBuf::from("calc.json")));
        match cli.command {
            Commands::Call {
                addr,
                endpoint,
                args,
                max_frame_size,
            } => {
                assert_eq!(addr, "127.0.0.1:9090");
                assert_eq!(endpoint.1, "add");
                assert_eq!(args.len(), 2);
                assert_eq!(
                    max_frame_size,
                    thriftcall_core::transport::DEFAULT_MAX_FRAME_SIZE
                );
            }
            _ => panic!("expected the call command"),
        }
    }
}
