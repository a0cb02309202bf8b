use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use configuration::{load_config, Config, StoreBackend};
use database::open_store;
use dispatcher::{Call, DispatchError, Dispatcher};
use engine::LedgerEngine;
use serde_json::Value;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The main entry point for the trade ledger.
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; settings may come from the real environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    let _log_guard = init_tracing(&config)?;

    let store = open_store(&config.store)
        .await
        .context("Failed to open the state store")?;
    let dispatcher = Dispatcher::new(LedgerEngine::new(store, &config));

    match cli.command {
        Commands::Invoke(call) => {
            let result = dispatcher.invoke(&call.function, &call.args).await;
            print_outcome(result, false)
        }
        Commands::Query(args) => {
            let result = dispatcher.query(&args.call.function, &args.call.args).await;
            print_outcome(result, args.table)
        }
        Commands::Batch(args) => handle_batch(&dispatcher, args).await,
        Commands::Seed(args) => {
            let at = args.at.unwrap_or_else(Utc::now);
            let result = dispatcher
                .invoke("setAllInitialTransactions", &[at.to_rfc3339()])
                .await;
            print_outcome(result, false)
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// An order-matching and settlement ledger for financial institutions.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured state-store backend.
    #[arg(long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a state-changing operation, e.g. `invoke clearAndSettleTrades 2017-03-01T16:00:00Z`.
    Invoke(CallArgs),
    /// Run a read-only query, e.g. `query getAllHoldingsForFI FI1`.
    Query(QueryArgs),
    /// Run a JSON file of `{ "function", "args" }` calls in order against one store.
    Batch(BatchArgs),
    /// Credit the configured opening holdings if the ledger is empty.
    Seed(SeedArgs),
}

#[derive(Parser)]
struct CallArgs {
    /// The function name, e.g. "createOrdersByFI".
    function: String,

    /// Positional string arguments, passed through unchanged.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser)]
struct QueryArgs {
    #[command(flatten)]
    call: CallArgs,

    /// Render the result as a table instead of JSON.
    #[arg(long)]
    table: bool,
}

#[derive(Parser)]
struct BatchArgs {
    /// A JSON array of calls.
    file: PathBuf,
}

#[derive(Parser)]
struct SeedArgs {
    /// Timestamp of the opening entries (RFC 3339). Defaults to now.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// results; a daily rolling file is added when `logging.directory` is set.
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .with_context(|| format!("Invalid log level '{}'", config.logging.level))?;
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()?;
            Ok(None)
        }
    }
}

async fn handle_batch(dispatcher: &Dispatcher, args: BatchArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read batch file {}", args.file.display()))?;
    let calls: Vec<Call> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of calls", args.file.display()))?;

    tracing::info!(calls = calls.len(), "Running batch.");
    let results = dispatcher.run_batch(&calls).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Prints a result, or the error payload followed by a failing exit.
fn print_outcome(result: Result<Value, DispatchError>, as_table: bool) -> Result<()> {
    match result {
        Ok(value) if as_table => {
            println!("{}", render_table(&value));
            Ok(())
        }
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_payload())?);
            Err(e.into())
        }
    }
}

fn render_table(value: &Value) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match value {
        Value::Array(rows) => {
            let mut columns: Vec<String> = Vec::new();
            for row in rows {
                if let Value::Object(map) = row {
                    for key in map.keys() {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
            }

            if columns.is_empty() {
                table.set_header(vec!["value"]);
                for row in rows {
                    table.add_row(vec![cell(row)]);
                }
            } else {
                table.set_header(columns.clone());
                for row in rows {
                    let cells: Vec<String> = columns
                        .iter()
                        .map(|column| row.get(column).map(cell).unwrap_or_default())
                        .collect();
                    table.add_row(cells);
                }
            }
        }
        Value::Object(map) => {
            table.set_header(vec!["key", "value"]);
            for (key, value) in map {
                table.add_row(vec![key.clone(), cell(value)]);
            }
        }
        other => {
            table.set_header(vec!["value"]);
            table.add_row(vec![cell(other)]);
        }
    }
    table
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
