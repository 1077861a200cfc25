//! Purpose: `islandora-rest` CLI entry point.
//! Role: Binary crate root; parses args, resolves config, builds the client, runs one command.
//! Invariants: Command results are JSON on stdout (compact when piped, pretty on a terminal).
//! Invariants: Errors are JSON on stderr when piped; process exit code comes from `to_exit_code`.
//! Invariants: Logging goes to stderr only so stdout stays machine-readable.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use islandora_rest::api::{
    Endpoint, Error, ErrorKind, IslandoraClient, ObjectType, Params, UreqTransport, to_exit_code,
};
use islandora_rest::config::{Config, ConfigOverrides};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(exit_code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `islandora-rest --help`."));
            }
        },
    };

    init_tracing(cli.verbose);

    let config = Config::resolve(ConfigOverrides {
        rest_url: cli.rest_url,
        user: cli.user,
        token: cli.token,
        env_file: cli.env_file,
    })?;
    let client = build_client(&config, &cli.transport)?;

    command_dispatch::dispatch_command(cli.command, &client)
        .map_err(add_request_hint)
        .map(|()| 0)
}

#[derive(Parser)]
#[command(
    name = "islandora-rest",
    version,
    about = "Client for the Islandora 7 REST API",
    long_about = None,
    after_help = r#"EXAMPLES
  $ islandora-rest object create --label "Sample Article 01" --namespace samples
  $ islandora-rest content-model add samples:1 islandora:sp_pdf
  $ islandora-rest datastream create samples:1 PDF --file article.pdf --mime-type application/pdf --no-versionable
  $ islandora-rest search '*:*' --all

CONFIGURATION
  --rest-url/--user/--token override ISLANDORA_REST, ISLANDORA_USER, ISLANDORA_TOKEN,
  which override values from a local .env file."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, help = "Islandora REST base URL, without the v1/ segment")]
    rest_url: Option<String>,
    #[arg(long, global = true)]
    user: Option<String>,
    #[arg(long, global = true, help = "Password or token for HTTP basic auth")]
    token: Option<String>,
    #[arg(long, global = true, help = "Env file to read (default: ./.env)")]
    env_file: Option<PathBuf>,
    #[command(flatten)]
    transport: TransportArgs,
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "More logging on stderr (-v info, -vv debug)"
    )]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct TransportArgs {
    #[arg(long, global = true, help = "Per-request timeout in seconds")]
    timeout_secs: Option<u64>,
    #[arg(long, global = true, help = "PEM bundle of CA certificates to trust")]
    tls_ca_file: Option<PathBuf>,
    #[arg(long, global = true, help = "Skip TLS certificate verification (test servers only)")]
    insecure_skip_verify: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Get, create, update or delete objects.
    #[command(subcommand)]
    Object(ObjectCommand),
    /// Query Solr; --all follows cursors through every result.
    Search(SearchArgs),
    /// List, add or remove raw relationship triples.
    #[command(subcommand)]
    Relationship(RelationshipCommand),
    /// Idempotent content-model assignment.
    #[command(subcommand)]
    ContentModel(ContentModelCommand),
    /// Idempotent collection membership.
    #[command(subcommand)]
    Collection(CollectionCommand),
    #[command(subcommand)]
    Datastream(DatastreamCommand),
    /// KU local endpoints (v1ku).
    #[command(subcommand)]
    Ku(KuCommand),
}

#[derive(Subcommand)]
enum ObjectCommand {
    Get {
        pid: String,
    },
    Create {
        #[arg(long)]
        pid: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    Update {
        pid: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    Delete {
        pid: String,
    },
}

#[derive(Args)]
struct SearchArgs {
    #[arg(default_value = "*:*")]
    query: String,
    #[arg(long, help = "Field list (cursor mode default: PID)")]
    fl: Option<String>,
    #[arg(long)]
    rows: Option<u32>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, help = "Absolute offset; ignored with --all")]
    start: Option<u64>,
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
    #[arg(long, help = "Follow cursors and emit every document as a JSON line")]
    all: bool,
    #[arg(
        long,
        help = "Fetch each document's object profile; one page prints {\"page\", \"objects\"}"
    )]
    objects: bool,
}

#[derive(Subcommand)]
enum RelationshipCommand {
    List {
        pid: String,
        #[arg(long)]
        predicate: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        object: Option<String>,
        #[arg(long)]
        literal: Option<bool>,
    },
    Add {
        pid: String,
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        predicate: String,
        #[arg(long)]
        object: String,
        #[arg(long = "type", value_enum, default_value_t = ObjectTypeArg::Uri)]
        object_type: ObjectTypeArg,
    },
    Remove {
        pid: String,
        #[arg(long)]
        predicate: String,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        object: Option<String>,
        #[arg(long)]
        literal: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ObjectTypeArg {
    Uri,
    String,
    Int,
    Date,
}

impl From<ObjectTypeArg> for ObjectType {
    fn from(value: ObjectTypeArg) -> Self {
        match value {
            ObjectTypeArg::Uri => ObjectType::Uri,
            ObjectTypeArg::String => ObjectType::String,
            ObjectTypeArg::Int => ObjectType::Int,
            ObjectTypeArg::Date => ObjectType::Date,
        }
    }
}

#[derive(Subcommand)]
enum ContentModelCommand {
    Add {
        pid: String,
        model: String,
        #[arg(long, help = "Remove every other content model")]
        exclusive: bool,
    },
}

#[derive(Subcommand)]
enum CollectionCommand {
    Add { pid: String, parent: String },
    Remove { pid: String, parent: String },
}

#[derive(Args)]
struct ContentArgs {
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    #[arg(long, value_name = "TEXT")]
    string: Option<String>,
}

#[derive(Args)]
struct DatastreamMetaArgs {
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    mime_type: Option<String>,
    #[arg(long = "field", value_name = "KEY=VALUE")]
    fields: Vec<String>,
}

#[derive(Subcommand)]
enum DatastreamCommand {
    /// Stream datastream content to stdout or --out.
    Get {
        pid: String,
        dsid: String,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Info {
        pid: String,
        dsid: String,
        #[arg(long)]
        version: Option<String>,
    },
    Create {
        pid: String,
        dsid: String,
        #[command(flatten)]
        content: ContentArgs,
        #[arg(long)]
        no_versionable: bool,
        #[command(flatten)]
        meta: DatastreamMetaArgs,
    },
    Update {
        pid: String,
        dsid: String,
        #[command(flatten)]
        content: ContentArgs,
        #[arg(long)]
        versionable: Option<bool>,
        #[command(flatten)]
        meta: DatastreamMetaArgs,
    },
    Delete {
        pid: String,
        dsid: String,
    },
}

#[derive(Subcommand)]
enum KuCommand {
    Regen {
        pid: String,
        dsid: Option<String>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    Premis {
        pid: String,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Reindex {
        pid: String,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
}

fn build_client(config: &Config, args: &TransportArgs) -> Result<IslandoraClient, Error> {
    let mut transport = UreqTransport::new();
    if let Some(secs) = args.timeout_secs {
        transport = transport.with_timeout(Duration::from_secs(secs));
    }
    if let Some(path) = &args.tls_ca_file {
        transport = transport.with_tls_ca_file(path)?;
    }
    if args.insecure_skip_verify {
        transport = transport.with_tls_skip_verify();
    }
    if let Some(credentials) = config.credentials() {
        transport = transport.with_credentials(credentials);
    }
    let endpoint = Endpoint::new(config.rest_url.clone())?;
    Ok(IslandoraClient::with_transport(endpoint, transport))
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// `KEY=VALUE` flags into passthrough params; later flags win.
fn parse_assignments(values: &[String]) -> Result<Params, Error> {
    let mut params = Params::new();
    for raw in values {
        let Some((key, value)) = raw.split_once('=') else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("expected KEY=VALUE, got `{raw}`"))
                .with_hint("Pass fields like --field label=\"My label\"."));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("empty key in `{raw}`")));
        }
        params.insert(key, value);
    }
    Ok(params)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {}", error_message(err));
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        if let Some(body) = err.body().filter(|body| !body.trim().is_empty()) {
            eprintln!("body: {}", body.trim());
        }
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| err.kind().as_str().to_string())
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(body) = err.body() {
        inner.insert("body".to_string(), json!(body));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = std::error::Error::source(err);
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = std::error::Error::source(cause);
    }
    causes
}

fn add_request_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match (err.kind(), err.status()) {
        (ErrorKind::RequestFailed, Some(401 | 403)) => {
            err.with_hint("Check --user/--token (or ISLANDORA_USER/ISLANDORA_TOKEN).")
        }
        (ErrorKind::RequestFailed, Some(404)) => {
            err.with_hint("The object, datastream or relationship does not exist.")
        }
        (ErrorKind::Io, _) => err.with_hint("Check --rest-url and that the server is reachable."),
        _ => err,
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_assignments};
    use clap::CommandFactory;
    use islandora_rest::api::ErrorKind;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_first_equals() {
        let params =
            parse_assignments(&["label=a=b".to_string(), "state=A".to_string()]).expect("params");
        assert_eq!(params.get("label"), Some("a=b"));
        assert_eq!(params.get("state"), Some("A"));
    }

    #[test]
    fn assignments_reject_missing_equals() {
        let err = parse_assignments(&["label".to_string()]).expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
