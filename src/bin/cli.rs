use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, LevelFilter, Log, Metadata, Record};
use serde_json::json;

use tinyrel::{parse_query, Catalog, ErrorKind, ExecutionConfig, ExecutionEngine, QueryError, TableLoader};

#[derive(Parser)]
#[command(author, version, about = "tinyrel - run a JSON query descriptor against a directory of tables")]
struct Cli {
    /// Directory holding `<name>.table.json` files
    table_dir: PathBuf,

    /// Query descriptor file
    query_file: PathBuf,

    /// Where to write the result (stdout when omitted)
    out_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Keep every where-clause condition above the cross product
    #[arg(long)]
    no_pushdown: bool,

    /// Log planning and loading details to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

/// Minimal stderr logger
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn });
    }
}

fn run(cli: &Cli) -> Result<()> {
    let descriptor = fs::read_to_string(&cli.query_file)
        .map_err(|e| QueryError::StorageError(format!("Cannot read {}: {}", cli.query_file.display(), e)))?;
    let query = parse_query(&descriptor)?;

    let loader = TableLoader::new(&cli.table_dir);
    let mut catalog = Catalog::new();
    catalog.load_for_query(&loader, &query)?;
    debug!("Loaded tables: {:?}", catalog.table_names());

    let config = ExecutionConfig {
        predicate_pushdown: !cli.no_pushdown,
    };
    let engine = ExecutionEngine::with_config(Arc::new(catalog), config);
    let result = engine.execute_query(&query)?;

    let rendered = match cli.format {
        OutputFormat::Json => result.to_json()? + "\n",
        OutputFormat::Table => result.to_string_table(),
    };

    // Only a fully successful query reaches this point
    match &cli.out_file {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Cannot write result to {}", path.display()))?,
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .context("Cannot write result to stdout")?,
    }
    Ok(())
}

fn error_payload(err: &anyhow::Error) -> serde_json::Value {
    let kind = err
        .downcast_ref::<QueryError>()
        .map(QueryError::kind)
        .unwrap_or(ErrorKind::StorageError);
    json!({
        "error": {
            "kind": kind,
            "message": format!("{:#}", err),
        }
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        debug!("Query failed: {:?}", err);
        eprintln!("{}", error_payload(&err));
        process::exit(1);
    }
}
