//! Operator CLI for accrete.
//!
//! Usage:
//!     accrete columns <table>
//!     accrete custom-columns <table>
//!     accrete sync <table> <field=value>...
//!
//! Connects with `--database-url` or `DATABASE_URL`, which may come from a
//! `.env` file. The evolver reads its settings from `ACCRETE_*` variables.

use accrete::{EvolverConfig, Record, SchemaEvolver, SyncReport, Value};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tokio_postgres::{Client, NoTls};

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser, Debug)]
#[command(name = "accrete", version, about = "Inspect and evolve Postgres tables")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the live columns of a table
    Columns { table: String },

    /// List columns outside the standard set
    CustomColumns { table: String },

    /// Add columns for fields the table has not seen yet
    ///
    /// Values are read as null, true/false, integers, floats, YYYY-MM-DD
    /// dates, YYYY-MM-DDTHH:MM:SS timestamps, or else text.
    Sync {
        table: String,

        /// Fields as `name=value`
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accrete=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // A missing .env file is fine; DATABASE_URL may already be set.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    let clean = rt.block_on(run(cli))?;
    if !clean {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns `false` when a sync left some field without a column.
async fn run(cli: Cli) -> Result<bool, BoxError> {
    let config = EvolverConfig::from_env()?;

    tracing::debug!(database = %mask_password(&cli.database_url), "connecting");
    let client = connect(&cli.database_url).await?;
    let evolver = SchemaEvolver::new(&client, config);

    match cli.command {
        Command::Columns { table } => {
            let columns = evolver.inspector().columns_of(&table).await?;
            print_columns(&table, &columns);
        }
        Command::CustomColumns { table } => {
            let columns = evolver.custom_columns(&table).await?;
            print_columns(&table, &columns);
        }
        Command::Sync { table, fields } => {
            let record: Record = fields.into_iter().collect();
            let report = evolver.synchronize(&table, &record).await?;
            print_report(&table, &report);
            return Ok(!report.has_rejections());
        }
    }

    Ok(true)
}

async fn connect(database_url: &str) -> Result<Client, BoxError> {
    let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "connection error");
        }
    });
    Ok(client)
}

/// Split a `name=value` argument; only the first `=` separates.
fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got `{}`", raw))?;
    if name.is_empty() {
        return Err(format!("missing field name in `{}`", raw));
    }
    Ok((name.to_string(), parse_value(value)))
}

/// Read a command-line literal as the most specific value it can be.
fn parse_value(raw: &str) -> Value {
    match raw {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        // "inf" and "NaN" parse as floats but are meant as words here
        if x.is_finite() {
            return Value::Float(x);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Value::Date(date);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Value::DateTime(ts);
    }
    Value::Text(raw.to_string())
}

fn print_columns(table: &str, columns: &[String]) {
    println!("{} ({} columns)", table.bold(), columns.len());
    for column in columns {
        println!("  {}", column);
    }
}

fn print_report(table: &str, report: &SyncReport) {
    if report.is_empty() {
        println!("{}: {}", table.bold(), "up to date".dimmed());
        return;
    }

    println!("{}:", table.bold());
    for (field, outcome) in report.outcomes() {
        if outcome.is_column() {
            println!("  {} {}: {}", "+".green(), field, outcome);
        } else {
            println!("  {} {}: {}", "!".red(), field.yellow(), outcome);
        }
    }
}

/// Mask password in database URL for display
fn mask_password(url: &str) -> String {
    if let Some(start) = url.find("://")
        && let Some(at) = url.rfind('@')
        && at > start + 3
        && let Some(colon) = url[start + 3..at].find(':')
    {
        let user = &url[start + 3..start + 3 + colon];
        return format!("{}{}:***{}", &url[..start + 3], user, &url[at..]);
    }
    url.to_string()
}
