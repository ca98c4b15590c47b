//! sql2kql: translate SQL queries into KQL
//!
//! # Usage
//!
//! ```bash
//! # Translate a query
//! sql2kql "SELECT a FROM t WHERE a = 'x'"
//!
//! # Read from a file, renaming a table
//! sql2kql --file query.sql --table log=SecurityLog
//!
//! # Show the parsed AST next to the output
//! sql2kql explain "SELECT count(*) FROM t GROUP BY c"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sql2kql::prelude::*;
use sql2kql::tables;
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql2kql")]
#[command(version)]
#[command(about = "Translate SQL queries into KQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    sql2kql \"SELECT a FROM t WHERE a LIKE 'abc%'\"
    sql2kql --file query.sql --table log=SecurityLog
    echo \"SELECT * FROM t LIMIT 5\" | sql2kql --format json")]
struct Cli {
    /// The SQL query to translate (reads stdin when omitted)
    query: Option<String>,

    /// Read the query from a file
    #[arg(short = 'F', long, conflicts_with = "query")]
    file: Option<PathBuf>,

    /// Table substitution, repeatable
    #[arg(short, long = "table", value_name = "OLD=NEW", value_parser = parse_table_mapping)]
    tables: Vec<(String, String)>,

    /// Naming for computed columns without an alias
    #[arg(long, value_enum)]
    alias_style: Option<AliasStyleArg>,

    /// Maximum query/expression nesting
    #[arg(long)]
    max_depth: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Configuration file (defaults to ./sql2kql.toml)
    #[arg(short, long, env = "SQL2KQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AliasStyleArg {
    Derived,
    Positional,
}

impl From<AliasStyleArg> for AliasStyle {
    fn from(arg: AliasStyleArg) -> Self {
        match arg {
            AliasStyleArg::Derived => AliasStyle::Derived,
            AliasStyleArg::Positional => AliasStyle::Positional,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parsed query, the KQL output and any diagnostics
    Explain {
        /// The SQL query to explain
        query: String,
    },
    /// List the function mappings
    Functions,
    /// List the operator mappings
    Operators,
}

fn parse_table_mapping(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(format!("expected OLD=NEW, got '{}'", value)),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Explain { query }) => {
            options(&cli).and_then(|options| explain_query(query, &options))
        }
        Some(Commands::Functions) => {
            show_functions();
            Ok(())
        }
        Some(Commands::Operators) => {
            show_operators();
            Ok(())
        }
        None => translate(&cli),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sql2kql=debug" } else { "sql2kql=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file values with command-line flags on top.
fn options(cli: &Cli) -> Result<TranslateOptions> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::discover().context("failed to load configuration")?,
    };

    let mut options = config.options();
    options.tables.extend(cli.tables.iter().cloned());
    if let Some(style) = cli.alias_style {
        options.alias_style = style.into();
    }
    if let Some(depth) = cli.max_depth {
        anyhow::ensure!(depth > 0, "--max-depth must be at least 1");
        options.max_depth = depth;
    }
    Ok(options)
}

fn read_query(cli: &Cli) -> Result<String> {
    if let Some(query) = &cli.query {
        return Ok(query.clone());
    }
    if let Some(path) = &cli.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(input)
}

fn translate(cli: &Cli) -> Result<()> {
    let options = options(cli)?;
    let sql = read_query(cli)?;
    if sql.trim().is_empty() {
        anyhow::bail!("no query given; try sql2kql --help");
    }
    if cli.verbose {
        eprintln!("{} {}", "Input:".dimmed(), sql.trim().yellow());
    }

    let translation = translate_sql(&sql, &options).context("translation failed")?;
    match cli.format {
        OutputFormat::Text => {
            println!("{}", translation.text());
            print_diagnostics(&translation.diagnostics);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&translation)?);
        }
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{} {}", "⚠".yellow(), diagnostic.to_string().yellow());
    }
}

fn explain_query(query: &str, options: &TranslateOptions) -> Result<()> {
    println!("{}", "SQL → KQL Explanation".cyan().bold());
    println!();
    println!("{} {}", "Query:".dimmed(), query.yellow());
    println!();

    let normalized = normalize(query, options)?;
    let parsed = parse(&normalized).context("parse failed")?;
    println!("{}", "Parsed Structure:".green().bold());
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    println!();

    let translation = translate_sql(query, options).context("translation failed")?;
    println!("{}", "Generated KQL:".green().bold());
    for line in translation.text().lines() {
        println!("  {}", line.white());
    }

    if !translation.diagnostics.is_empty() {
        println!();
        println!("{}", "Diagnostics:".yellow().bold());
        for diagnostic in &translation.diagnostics {
            println!("  • {}", diagnostic.to_string().yellow());
        }
    }
    Ok(())
}

fn show_functions() {
    println!("{}", "SQL → KQL Function Mappings".cyan().bold());
    println!();
    println!(
        "{:24} {}",
        "SQL".white().bold(),
        "KQL".white().bold()
    );
    println!("{}", "─".repeat(64).dimmed());

    for (name, rule) in tables::FUNCTIONS.iter() {
        let marker = if tables::is_aggregate(name) { " (aggregate)" } else { "" };
        println!(
            "{:24} {}{}",
            name.cyan(),
            rule.describe().white(),
            marker.dimmed()
        );
    }
}

fn show_operators() {
    println!("{}", "SQL → KQL Operator Mappings".cyan().bold());
    println!();
    println!("{:10} {}", "SQL".white().bold(), "KQL".white().bold());
    println!("{}", "─".repeat(32).dimmed());

    for (sql, kql) in tables::OPERATORS.iter() {
        println!("{:10} {}", sql.cyan(), kql.white());
    }

    println!();
    println!("{}", "LIKE patterns:".green().bold());
    for (pattern, kql) in [
        ("'abc%'", "startswith 'abc'"),
        ("'%abc'", "endswith 'abc'"),
        ("'%abc%'", "contains 'abc'"),
        ("other", "matches regex (_ → ., % → .*)"),
    ] {
        println!("  {:10} {}", pattern.cyan(), kql.white());
    }
}
