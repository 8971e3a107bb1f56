//! Importer CLI - issue call, get and instantiate against a remote exporter.
//!
//! Results are printed to stdout as pretty JSON. Logs and remote tracebacks go
//! to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use importer_core::{Importer, ImporterBuilder, Kwargs, Value};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "importer")]
#[command(about = "Call, read or construct symbols on a remote exporter")]
struct Args {
    /// JSON options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Exporter base URL (overrides the options file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Wire codec (json, msgpack, native, ...)
    #[arg(long)]
    codec: Option<String>,

    /// Network timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// PEM private key for mutual TLS
    #[arg(long, requires = "ssl_cert")]
    ssl_key: Option<PathBuf>,

    /// PEM certificate chain for mutual TLS
    #[arg(long, requires = "ssl_key")]
    ssl_cert: Option<PathBuf>,

    /// Do not keep cookies between requests
    #[arg(long)]
    no_session: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call a function or method
    Call {
        module: String,
        method: String,
        /// Positional arguments, parsed as JSON or taken as plain strings
        args: Vec<String>,
        /// Keyword argument
        #[arg(long = "kw", value_name = "KEY=VALUE")]
        kw: Vec<String>,
    },
    /// Read an attribute
    Get { module: String, attr: String },
    /// Construct an object on the exporter and bind it to a variable
    Instantiate {
        variable: String,
        module: String,
        class: String,
        args: Vec<String>,
        #[arg(long = "kw", value_name = "KEY=VALUE")]
        kw: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut importer = builder(&args)?.build()?;
    if !importer.is_remote() {
        bail!("No exporter configured: pass --endpoint or set distant_url in --config");
    }
    let request = Request::try_from(args.command)?;

    match run(&mut importer, request) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            if !err.is_local() && !err.trace().is_empty() {
                eprintln!("Remote traceback:\n{}", err.trace());
            }
            Err(err.into())
        }
    }
}

/// Options file first, then command line overrides.
fn builder(args: &Args) -> Result<ImporterBuilder> {
    let mut builder = match &args.config {
        Some(path) => ImporterBuilder::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ImporterBuilder::new(),
    };
    if let Some(endpoint) = &args.endpoint {
        builder = builder.remote_endpoint(endpoint.clone());
    }
    if let Some(codec) = &args.codec {
        builder = builder.codec(codec.clone());
    }
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(timeout);
    }
    if let (Some(key), Some(cert)) = (&args.ssl_key, &args.ssl_cert) {
        builder = builder.client_identity(key.clone(), cert.clone());
    }
    if args.no_session {
        builder = builder.session(false);
    }
    Ok(builder)
}

/// A command with its arguments parsed into values.
#[derive(Debug, PartialEq)]
enum Request {
    Call {
        module: String,
        method: String,
        args: Vec<Value>,
        kwargs: Kwargs,
    },
    Get {
        module: String,
        attr: String,
    },
    Instantiate {
        variable: String,
        module: String,
        class: String,
        args: Vec<Value>,
        kwargs: Kwargs,
    },
}

impl TryFrom<Command> for Request {
    type Error = anyhow::Error;

    fn try_from(command: Command) -> Result<Self> {
        Ok(match command {
            Command::Call {
                module,
                method,
                args,
                kw,
            } => Request::Call {
                module,
                method,
                args: parse_values(&args),
                kwargs: parse_kwargs(&kw)?,
            },
            Command::Get { module, attr } => Request::Get { module, attr },
            Command::Instantiate {
                variable,
                module,
                class,
                args,
                kw,
            } => Request::Instantiate {
                variable,
                module,
                class,
                args: parse_values(&args),
                kwargs: parse_kwargs(&kw)?,
            },
        })
    }
}

fn run(importer: &mut Importer, request: Request) -> importer_core::Result<Value> {
    debug!("{:?}", request);
    match request {
        Request::Call {
            module,
            method,
            args,
            kwargs,
        } => importer.call(&module, &method, &args, &kwargs),
        Request::Get { module, attr } => importer.get(&module, &attr),
        Request::Instantiate {
            variable,
            module,
            class,
            args,
            kwargs,
        } => importer
            .instantiate(&variable, &module, &class, &args, &kwargs)
            .map(|_| Value::Null),
    }
}

/// JSON when it parses, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_values(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|arg| parse_value(arg)).collect()
}

fn parse_kwargs(raw: &[String]) -> Result<Kwargs> {
    let mut kwargs = Kwargs::new();
    for pair in raw {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                kwargs.insert(key.to_string(), parse_value(value));
            }
            _ => bail!("Invalid keyword argument {:?}, expected KEY=VALUE", pair),
        }
    }
    Ok(kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("[1, \"a\"]"), json!([1, "a"]));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("hello"), json!("hello"));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_parse_kwargs() {
        let kwargs = parse_kwargs(&["host=x".into(), "port=5432".into(), "q=a=b".into()]).unwrap();
        assert_eq!(kwargs["host"], json!("x"));
        assert_eq!(kwargs["port"], json!(5432));
        assert_eq!(kwargs["q"], json!("a=b"));

        assert!(parse_kwargs(&["novalue".into()]).is_err());
        assert!(parse_kwargs(&["=1".into()]).is_err());
    }

    #[test]
    fn test_call_command_line() {
        let args = Args::try_parse_from([
            "importer",
            "--endpoint",
            "http://127.0.0.1:8000/exporter/",
            "--codec",
            "msgpack",
            "call",
            "storage",
            "open",
            "1",
            "two",
            "--kw",
            "host=x",
        ])
        .unwrap();

        match &args.command {
            Command::Call {
                module,
                method,
                args,
                kw,
            } => {
                assert_eq!((module.as_str(), method.as_str()), ("storage", "open"));
                assert_eq!(parse_values(args), vec![json!(1), json!("two")]);
                assert_eq!(kw, &vec!["host=x".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let importer = builder(&args).unwrap().build().unwrap();
        assert!(importer.is_remote());
        assert_eq!(importer.config().codec, "msgpack");
    }

    #[test]
    fn test_request_from_command() {
        let args = Args::try_parse_from([
            "importer", "instantiate", "db", "storage", "Connection", "--kw", "port=5432",
        ])
        .unwrap();

        let mut kwargs = Kwargs::new();
        kwargs.insert("port".into(), json!(5432));
        assert_eq!(
            Request::try_from(args.command).unwrap(),
            Request::Instantiate {
                variable: "db".into(),
                module: "storage".into(),
                class: "Connection".into(),
                args: vec![],
                kwargs,
            }
        );
    }

    #[test]
    fn test_malformed_kw_is_a_usage_error() {
        let args =
            Args::try_parse_from(["importer", "call", "math", "add", "--kw", "novalue"]).unwrap();

        let err = Request::try_from(args.command).unwrap_err();
        assert!(err.to_string().starts_with("Invalid keyword argument \"novalue\""));
        assert!(err.downcast_ref::<importer_core::ImporterError>().is_none());
    }

    #[test]
    fn test_tls_flags_require_each_other() {
        assert!(Args::try_parse_from([
            "importer",
            "--ssl-key",
            "client.key",
            "get",
            "os",
            "sep"
        ])
        .is_err());
    }
}
