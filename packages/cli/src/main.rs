//! `enapi`: command-line client for enapi resources.
//!
//! Reads a schema file (a JSON object mapping route names to resource
//! schemas) and offers, per route, only the commands its schema declares:
//!
//! - **`get`**, **`post`**, **`patch`**, **`delete`**, **`list`**: call one
//!   capability on a running server and print the result as JSON.
//! - **`capabilities`**: print each route's derived capability set.
//! - **`docs`**: print the OpenAPI document for the schema file (offline).
//!
//! JSON bodies may be given inline or read from stdin (`-`).

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use enapi::{coerce_query, Capability, DocInfo, Entity, ResourceSchema};
use enapi_client::{Client, ClientError, RemoteTransport};
use serde_json::Value;

/// enapi: call declared capabilities of enapi resources
#[derive(Parser)]
#[command(name = "enapi", version, about, long_about = None)]
struct Cli {
    /// Schema file: a JSON object of route name → resource schema.
    #[arg(short, long, env = "ENAPI_SCHEMA", value_name = "FILE")]
    schema: PathBuf,

    /// Base URL of the server.
    #[arg(short, long, env = "ENAPI_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one entity.
    Get { route: String, id: u64 },

    /// Create an entity from a JSON body (`-` reads stdin).
    Post { route: String, body: String },

    /// Overwrite fields of an entity from a JSON body (`-` reads stdin).
    Patch { route: String, id: u64, body: String },

    /// Remove an entity.
    Delete { route: String, id: u64 },

    /// List entities, filtered by declared query fields.
    ///
    /// Example: enapi list foo name=d
    List {
        route: String,
        /// Filters as key=value pairs.
        #[arg(value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },

    /// Print the capabilities each route declares.
    Capabilities,

    /// Print the OpenAPI document for the schema file.
    Docs {
        #[arg(long, default_value = "My Api")]
        title: String,

        #[arg(long = "api-version", default_value = "0.0.0")]
        version: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let schemas = read_schemas(&cli.schema);

    match cli.command {
        Command::Capabilities => {
            for (route, schema) in &schemas {
                println!("{route}: {}", enapi::derive_capabilities(schema));
            }
        }

        Command::Docs { title, version } => {
            let info = DocInfo {
                title,
                version,
                server_url: cli.url,
            };
            let doc = enapi::openapi::document(
                schemas.iter().map(|(route, schema)| (route.as_str(), schema)),
                &info,
            );
            print_json(&doc);
        }

        command => {
            let client = Client::new(RemoteTransport::new(cli.url), schemas);
            let result = call(&client, command).await;
            match result {
                Ok(Some(value)) => print_json(&value),
                Ok(None) => {}
                Err(e) => {
                    eprintln!("enapi: {e}");
                    process::exit(1);
                }
            }
        }
    }
}

/// Run one capability command. Undeclared capabilities fail before any
/// request is sent.
async fn call(client: &Client<RemoteTransport>, command: Command) -> Result<Option<Value>, ClientError> {
    let value = match command {
        Command::Get { route, id } => {
            let op = client.get(&route).ok_or_else(|| undeclared(route, Capability::Get))?;
            Value::Object(op.send(id).await?)
        }
        Command::Post { route, body } => {
            let op = client.post(&route).ok_or_else(|| undeclared(route, Capability::Post))?;
            Value::Object(op.send(parse_body(&body)).await?)
        }
        Command::Patch { route, id, body } => {
            let op = client.patch(&route).ok_or_else(|| undeclared(route, Capability::Patch))?;
            Value::Object(op.send(id, parse_body(&body)).await?)
        }
        Command::Delete { route, id } => {
            let op = client.delete(&route).ok_or_else(|| undeclared(route, Capability::Delete))?;
            op.send(id).await?;
            return Ok(None);
        }
        Command::List { route, filters } => {
            let op = client
                .get_collection(&route)
                .ok_or_else(|| undeclared(route.clone(), Capability::GetCollection))?;
            let filter = parse_filters(client, &route, &filters);
            Value::Array(op.send(&filter).await?.into_iter().map(Value::Object).collect())
        }
        Command::Capabilities | Command::Docs { .. } => return Ok(None),
    };
    Ok(Some(value))
}

fn undeclared(route: String, capability: Capability) -> ClientError {
    ClientError::Undeclared { route, capability }
}

/// Read and parse the schema file, exiting on any error.
fn read_schemas(path: &PathBuf) -> BTreeMap<String, ResourceSchema> {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| fatal(&format!("failed to read {}: {}", path.display(), e)));
    let schemas: BTreeMap<String, ResourceSchema> = serde_json::from_str(&json)
        .unwrap_or_else(|e| fatal(&format!("invalid schema file {}: {}", path.display(), e)));
    for route in schemas.keys() {
        if let Err(e) = enapi::validate_route_name(route) {
            fatal(&format!("invalid schema file {}: {}", path.display(), e));
        }
    }
    schemas
}

/// Parse a JSON body given inline, or from stdin when the argument is `"-"`.
fn parse_body(arg: &str) -> Value {
    let text = if arg == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).unwrap_or_else(|e| fatal(&format!("invalid JSON body: {}", e)))
}

/// Turn `key=value` arguments into a filter typed by the route's query
/// fields.
fn parse_filters(client: &Client<RemoteTransport>, route: &str, filters: &[String]) -> Entity {
    let mut raw = BTreeMap::new();
    for pair in filters {
        let (key, value) = pair
            .split_once('=')
            .unwrap_or_else(|| fatal(&format!("invalid filter {pair:?}: expected KEY=VALUE")));
        raw.insert(key.to_string(), value.to_string());
    }
    let fields = client
        .schema(route)
        .and_then(ResourceSchema::collection_query_params)
        .unwrap_or_else(|| fatal(&format!("route {route:?} takes no filters")));
    for key in raw.keys() {
        if !fields.contains_key(key) {
            fatal(&format!("route {route:?} has no query field {key:?}"));
        }
    }
    coerce_query(fields, &raw).unwrap_or_else(|e| fatal(&e.to_string()))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => fatal(&format!("failed to render output: {e}")),
    }
}

/// Print an error message to stderr and exit with code 1.
fn fatal(msg: &str) -> ! {
    eprintln!("enapi: {}", msg);
    process::exit(1);
}
