use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::EnvFilter;

use patternq::config::Settings;
use patternq::query::{Query, QueryResult};
use patternq::session::Session;
use patternq::shape::{self, CollisionPolicy, ENTITY_ID_KEY};
use patternq::table::Table;
use patternq::{PatternqError, Result};

#[derive(Parser)]
#[command(name = "patternq", version, about = "Query the commons and shape results into tables")]
struct Cli {
    /// Settings file, overlaid by PATTERNQ_* environment variables
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Shape a saved query result envelope into a table
    Shape {
        envelope: String,
        #[command(flatten)]
        shaping: Shaping,
    },
    /// Run a pull query read from a JSON file
    Query {
        query: String,
        /// Database to query instead of the configured one
        #[arg(long)]
        db: Option<String>,
        /// Positional query argument as JSON, repeatable
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Print the raw result envelope instead of a table
        #[arg(long)]
        raw: bool,
        #[command(flatten)]
        shaping: Shaping,
    },
    /// List the datasets available in the commons
    Datasets,
}

#[derive(clap::Args)]
struct Shaping {
    /// Column of nested documents to expand into joined rows
    #[arg(long)]
    expand: Option<String>,
    /// Identifier the expanded documents are joined on
    #[arg(long, default_value = ENTITY_ID_KEY)]
    id_field: String,
    /// Sequence valued column to explode into one row per element
    #[arg(long)]
    explode: Option<String>,
    /// Keep the later column when two names normalize to the same name
    #[arg(long)]
    last_wins: bool,
}

impl Shaping {
    fn policy(&self) -> CollisionPolicy {
        if self.last_wins { CollisionPolicy::LastWins } else { CollisionPolicy::Reject }
    }
    /// Pull the result into a table, then expand and explode as asked.
    fn apply(&self, result: &QueryResult) -> Result<Table> {
        let mut table = shape::normalize_names_with(&shape::pull_to_table(result)?, self.policy())?;
        if let Some(column) = &self.expand {
            table = shape::expand_nested_with(&table, column, &self.id_field, self.policy())?;
        }
        if let Some(column) = &self.explode {
            table = table.explode(column)?;
        }
        Ok(table)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "patternq failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Shape { envelope, shaping } => {
            let result: QueryResult = serde_json::from_str(&fs::read_to_string(&envelope)?)?;
            print(&shaping.apply(&result)?)
        }
        Command::Query { query, db, args, raw, shaping } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let session = Session::connect(&settings)?;
            let query: Query = serde_json::from_str(&fs::read_to_string(&query)?)?;
            let args = args
                .iter()
                .map(|a| serde_json::from_str(a))
                .collect::<std::result::Result<Vec<Value>, _>>()?;
            let result = session.query_on(db.as_deref(), &query, &args)?;
            if raw {
                return print(&result);
            }
            print(&shaping.apply(&result)?)
        }
        Command::Datasets => {
            let settings = Settings::load(cli.config.as_deref())?;
            print(&Session::connect(&settings)?.list_datasets()?)
        }
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| PatternqError::Decode(e.to_string()))?;
    println!("{text}");
    Ok(())
}
