//! winnow: compile filter trees into SQL from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL for a filter
//! winnow '{"logical_op": "&", "filter_clauses": [...]}' --catalog shop.toml --dry-run
//!
//! # Read the filter from a file and run it
//! winnow @filter.json --catalog shop.toml --database-url postgres://localhost/shop
//!
//! # Check a filter, or describe it
//! winnow validate @filter.json
//! winnow summarize @filter.json
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;
use winnow_sql::prelude::*;

#[derive(Parser)]
#[command(name = "winnow")]
#[command(version)]
#[command(about = "Compile filter trees into parameterized SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    winnow @filter.json --catalog shop.toml --dry-run
    winnow '{\"filter_clauses\": [{\"data_source\": \"Flavor\", \"operator\": \"is\", \"value\": \"Mint\"}]}'
    winnow summarize @filter.json")]
struct Cli {
    /// Filter as inline JSON, or @path to a JSON file
    filter: Option<String>,

    /// Catalog file (defaults to <config dir>/winnow/catalog.toml)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    /// Don't execute, just show the generated SQL
    #[arg(short, long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Database connection URL
    #[arg(long, env = "WINNOW_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a filter against the catalog without compiling it
    Validate {
        /// Filter as inline JSON, or @path
        filter: String,
    },
    /// Describe each clause of a filter in words
    Summarize {
        /// Filter as inline JSON, or @path
        filter: String,
    },
    /// List the operators filters can use
    Operators,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Validate { filter }) => validate(cli, filter),
        Some(Commands::Summarize { filter }) => summarize(cli, filter),
        Some(Commands::Operators) => show_operators(cli),
        None => match &cli.filter {
            Some(filter) => compile_and_run(cli, filter).await,
            None => {
                println!("{}", "winnow: filter trees to parameterized SQL".cyan().bold());
                println!();
                println!("Usage: winnow <FILTER> --catalog <FILE> [OPTIONS]");
                println!();
                println!("Try: winnow --help");
                Ok(())
            }
        },
    }
}

fn load_config(cli: &Cli) -> Result<WinnowConfig> {
    let path = match &cli.catalog {
        Some(path) => path.clone(),
        None => WinnowConfig::default_path().context("no config directory; pass --catalog")?,
    };
    if cli.verbose {
        println!("{} {}", "Catalog:".dimmed(), path.display());
    }
    WinnowConfig::load(&path).with_context(|| format!("loading catalog {}", path.display()))
}

/// Parse a FILTER argument: inline JSON, or `@path` to a file holding it.
fn read_filter(arg: &str) -> Result<Filter> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading filter {}", path))?,
        None => arg.to_string(),
    };
    Filter::from_json(&text).context("filter is not valid JSON")
}

async fn compile_and_run(cli: &Cli, filter: &str) -> Result<()> {
    let filter = read_filter(filter)?;
    let config = load_config(cli)?;
    let database_url = cli.database_url.clone().or_else(|| config.database_url.clone());
    let winnow = config.into_winnow()?;

    let query = winnow.query(&filter)?;
    let sql = query.to_numbered();

    let Some(db_url) = database_url.filter(|_| !cli.dry_run) else {
        print_query(&sql, query.params(), &cli.format);
        if !cli.dry_run {
            println!();
            println!(
                "{}",
                "⚠ No database URL. Use --database-url or set WINNOW_DATABASE_URL".yellow()
            );
        }
        return Ok(());
    };

    if cli.verbose {
        println!("{} {}", "SQL:".dimmed(), sql.white());
        println!("{} {}", "Connecting to:".dimmed(), db_url);
    }

    let db = WinnowDb::connect(&db_url).await?;
    let results = db.fetch_all(&query).await?;
    format_output(&results, &cli.format);
    Ok(())
}

fn print_query(sql: &str, params: &[Param], format: &OutputFormat) {
    match format {
        OutputFormat::Json => {
            let params: Vec<serde_json::Value> = params.iter().map(param_json).collect();
            let out = serde_json::json!({ "sql": sql, "params": params });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        OutputFormat::Table => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", sql.white());

            if !params.is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                for (i, p) in params.iter().enumerate() {
                    println!("  ${} = {}", i + 1, p.to_string().yellow());
                }
            }
        }
    }
}

fn param_json(param: &Param) -> serde_json::Value {
    match param {
        Param::Null | Param::TypedNull(_) => serde_json::Value::Null,
        Param::Bool(b) => (*b).into(),
        Param::Int(n) => (*n).into(),
        Param::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Param::Text(s) => s.clone().into(),
        Param::Timestamp(ts) => ts.to_string().into(),
        Param::Json(v) => v.clone(),
        Param::Array(items) => items.iter().map(param_json).collect(),
    }
}

fn validate(cli: &Cli, filter: &str) -> Result<()> {
    let filter = read_filter(filter)?;
    let winnow = load_config(cli)?.into_winnow()?;

    winnow.validate(&filter)?;
    let clauses = winnow.resolve(&filter)?.clauses().len();
    println!("{} Filter is valid ({} clause(s))", "✓".green(), clauses);
    Ok(())
}

fn summarize(cli: &Cli, filter: &str) -> Result<()> {
    let filter = read_filter(filter)?;
    let winnow = load_config(cli)?.into_winnow()?;

    let summaries = winnow.summaries(&filter)?;
    if summaries.is_empty() {
        println!("{}", "(matches everything)".dimmed());
    }
    for summary in summaries {
        println!("  • {}", summary.white());
    }
    Ok(())
}

fn show_operators(cli: &Cli) -> Result<()> {
    // the catalog is optional here: without one, list the defaults
    let registry = match &cli.catalog {
        Some(_) => load_config(cli)?.operator_registry()?,
        None => OperatorRegistry::default(),
    };

    println!(
        "{:22} {:15} {}",
        "Operator".white().bold(),
        "Value type".white().bold(),
        "Negative".white().bold()
    );
    println!("{}", "─".repeat(50).dimmed());

    for op in registry.iter() {
        let negative = if op.negative { "yes" } else { "" };
        println!(
            "{:22} {:15} {}",
            op.name.cyan(),
            op.value_type.as_str().yellow(),
            negative.dimmed()
        );
    }
    Ok(())
}

fn format_output(results: &[HashMap<String, serde_json::Value>], format: &OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns: BTreeSet<&String> = results.iter().flat_map(|row| row.keys()).collect();

            let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.len())).collect();
            for row in results {
                for (col, val) in row {
                    let len = val_to_string(val).len();
                    if let Some(w) = widths.get_mut(col) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = widths[*c]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = widths[*c])
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}
