//! ddbmem Console Binary
//!
//! Reads one JSON request per line on stdin and prints one JSON response per
//! line on stdout. Errors are printed as `{"__type": ..., "message": ...}`.
//!
//! ```text
//! $ echo '{"Operation": "ListTables"}' | ddbmem-console
//! {"TableNames":[]}
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::Parser;
use ddbmem::{Config, Database, DbError, Request};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// ddbmem Console
#[derive(Parser, Debug)]
#[command(name = "ddbmem-console")]
#[command(about = "In-memory DynamoDB-style store driven by JSON lines")]
#[command(version)]
struct Args {
    /// Maximum number of tables
    #[arg(short = 't', long, default_value = "256")]
    max_tables: usize,

    /// Maximum item size in bytes
    #[arg(long, default_value = "65536")]
    max_item_size: usize,

    /// Delay in milliseconds for every table status transition
    #[arg(short, long, default_value = "1000")]
    delay_ms: u64,

    /// Minimum seconds between two throughput decreases
    #[arg(long, default_value = "86400")]
    decrease_interval_secs: u64,

    /// Pretty-print responses
    #[arg(short, long)]
    pretty: bool,
}

fn main() {
    // Logs go to stderr; stdout carries responses only
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ddbmem=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("ddbmem Console v{}", ddbmem::VERSION);

    let config = Config::builder()
        .max_tables(args.max_tables)
        .max_item_size(args.max_item_size)
        .lifecycle_delays(Duration::from_millis(args.delay_ms))
        .min_decrease_interval(Duration::from_secs(args.decrease_interval_secs))
        .build();

    let db = match Database::new(config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to start database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&db, args.pretty) {
        tracing::error!("I/O error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Input closed, exiting");
}

/// Process stdin until EOF
fn run(db: &Database, pretty: bool) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let body = match handle_line(db, line) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(code = e.code(), "request failed: {}", e);
                error_body(&e)
            }
        };

        let rendered = if pretty {
            serde_json::to_string_pretty(&body)
        } else {
            serde_json::to_string(&body)
        };

        match rendered {
            Ok(text) => writeln!(stdout, "{}", text)?,
            Err(e) => writeln!(stdout, "{}", error_body(&DbError::from(e)))?,
        }
        stdout.flush()?;
    }

    Ok(())
}

fn handle_line(db: &Database, line: &str) -> ddbmem::Result<serde_json::Value> {
    let request: Request = serde_json::from_str(line)?;
    let response = db.execute(request)?;
    Ok(serde_json::to_value(response)?)
}

fn error_body(error: &DbError) -> serde_json::Value {
    json!({
        "__type": error.code(),
        "message": error.to_string(),
    })
}
