//! # Thriftcall CLI Entry Point
//!
//! The main executable for the Thriftcall tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs logging.
//! 2. **Schema**: Loads the JSON schema that describes the target services.
//! 3. **Execution**: Connects over framed TCP and delegates the call to the `DynamicClient`.
//! 4. **Presentation**: Formats and prints the resulting data or error to standard output/error.

mod cli;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands, DescribeCommands, ListCommands};
use formatter::{FormattedString, GenericError, NameList};
use std::collections::BTreeMap;
use std::path::Path;
use std::process;
use thriftcall_core::{DynamicClient, Schema, Value};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    let schema = load_schema_or_exit(args.schema.as_deref());

    match args.command {
        Commands::Call {
            addr,
            endpoint,
            args,
            max_frame_size,
        } => {
            let (service, method) = endpoint;
            run_call(schema, &addr, &service, &method, args, max_frame_size).await;
        }
        Commands::List { sub } => {
            let list = match sub {
                ListCommands::Services => NameList("services", owned(schema.service_names())),
                ListCommands::Structs => NameList("structs", owned(schema.struct_names())),
                ListCommands::Enums => NameList("enums", owned(schema.enum_names())),
            };
            println!("{}", FormattedString::from(list));
        }
        Commands::Describe { sub } => describe(&schema, sub),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_schema_or_exit(path: Option<&Path>) -> Schema {
    let Some(path) = path else {
        eprintln!(
            "{}",
            FormattedString::from(GenericError(
                "Missing schema",
                "pass --schema <PATH> or set THRIFTCALL_SCHEMA"
            ))
        );
        process::exit(1);
    };

    match Schema::from_path(path) {
        Ok(schema) => {
            tracing::debug!(
                path = %path.display(),
                services = schema.service_names().len(),
                "loaded schema"
            );
            schema
        }
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

fn describe(schema: &Schema, sub: DescribeCommands) {
    let formatted = match sub {
        DescribeCommands::Service { service } => schema
            .service(&service)
            .map(FormattedString::from)
            .map_err(FormattedString::from),
        DescribeCommands::Method { method } => {
            let (service, method_name) = method;
            schema
                .method(&service, &method_name)
                .map(FormattedString::from)
                .map_err(FormattedString::from)
        }
        DescribeCommands::Struct { name } => schema
            .struct_def(&name)
            .map(FormattedString::from)
            .ok_or_else(|| not_found("Struct", &name)),
        DescribeCommands::Enum { name } => schema
            .enum_def(&name)
            .map(FormattedString::from)
            .ok_or_else(|| not_found("Enum", &name)),
    };

    match formatted {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn not_found(kind: &str, name: &str) -> FormattedString {
    GenericError("Symbol Lookup Failed", format!("{kind} '{name}' not found")).into()
}

async fn run_call(
    schema: Schema,
    addr: &str,
    service: &str,
    method: &str,
    args: serde_json::Map<String, serde_json::Value>,
    max_frame_size: usize,
) {
    let args: BTreeMap<String, Value> = args.into_iter().map(|(k, v)| (k, v.into())).collect();

    let mut client = match DynamicClient::connect(addr, schema).await {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    };
    client.transport_mut().set_max_frame_size(max_frame_size);

    match client.invoke(service, method, &args).await {
        Ok(results) => {
            let json = serde_json::Value::from(Value::Map(results));
            println!("{}", FormattedString::from(json));
        }
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}
