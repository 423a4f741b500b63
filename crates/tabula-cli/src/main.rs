//! Tabula CLI - formula columns over CSV data

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabula::prelude::*;
use tabula::{FormulaOperand, ImportReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about = "Compute formula columns over CSV data")]
struct Cli {
    /// Log engine activity to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a formula against a set of column names
    Validate {
        /// Formula text, e.g. "Width * 2"
        formula: String,

        /// Comma-separated names of the columns the formula may use
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Print the steps a formula compiles to
    Compile {
        /// Formula text
        formula: String,

        /// Comma-separated names of existing columns; others are created
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Import a CSV file, add formula columns and write the computed table
    Run {
        /// Input CSV file; the first row names the columns
        input: PathBuf,

        /// Formula column as NAME=EXPR (repeatable)
        #[arg(short, long = "formula", value_parser = parse_formula_arg)]
        formulas: Vec<(String, String)>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field delimiter for input and output
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// How far a saved value propagates (one-hop, transitive)
        #[arg(long, default_value = "transitive")]
        policy: CascadePolicy,

        /// Lifetime of cached computed values, in seconds
        #[arg(long, default_value = "3600")]
        cache_ttl: u64,

        /// Maximum number of cached computed values
        #[arg(long, default_value = "10000")]
        cache_capacity: usize,

        /// Reject non-numeric values in number columns instead of blanking them
        #[arg(long)]
        strict_numeric: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Validate { formula, columns } => validate_formula(&formula, &columns),
        Commands::Compile { formula, columns } => compile_formula(&formula, &columns),
        Commands::Run {
            input,
            formulas,
            output,
            delimiter,
            policy,
            cache_ttl,
            cache_capacity,
            strict_numeric,
        } => {
            let options = EngineOptions {
                cache_ttl: Duration::from_secs(cache_ttl),
                cache_capacity,
                cascade_policy: policy,
            };
            run(
                &input,
                &formulas,
                output.as_deref(),
                delimiter,
                options,
                &ImportOptions { strict_numeric },
            )
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn parse_formula_arg(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, expr)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), expr.trim().to_string()))
        }
        _ => Err(format!("expected NAME=EXPR, got '{}'", arg)),
    }
}

/// A scratch table holding the given number columns and a `Result` column
fn scratch(columns: &[String]) -> Result<(Engine, Table, Column)> {
    let engine = Engine::new();
    let table = engine.create_table("scratch");
    for name in columns {
        engine
            .add_column(table.id, name.trim(), DataType::Number)
            .with_context(|| format!("Failed to add column '{}'", name))?;
    }
    let target = engine.add_column(table.id, "Result", DataType::Number)?;
    Ok((engine, table, target))
}

fn validate_formula(formula: &str, columns: &[String]) -> Result<()> {
    let (engine, _, target) = scratch(columns)?;
    let issues = engine.validate_formula(target.id, formula)?;
    if issues.is_empty() {
        println!("ok");
        return Ok(());
    }
    for issue in &issues {
        println!("{}", issue);
    }
    bail!("{} problem(s) found", issues.len())
}

fn compile_formula(formula: &str, columns: &[String]) -> Result<()> {
    let (engine, _, target) = scratch(columns)?;
    let update = engine
        .create_intermediate_columns(target.id, formula)
        .context("Failed to compile formula")?;

    for warning in &update.warnings {
        eprintln!("warning: {}", warning);
    }
    for created in &update.compiled.created_columns {
        eprintln!("created column '{}'", created.name);
    }

    for step in &update.compiled.steps {
        let operation = step.operation.map(|op| op.name()).unwrap_or("-");
        let operand = match step.operand {
            Some(FormulaOperand::Column(id)) => engine.store().column(id)?.name,
            Some(FormulaOperand::Constant(value)) => value.to_string(),
            None => "-".to_string(),
        };
        println!("{}\t{}\t{}", step.order, operation, operand);
    }
    Ok(())
}

fn run(
    input: &Path,
    formulas: &[(String, String)],
    output: Option<&Path>,
    delimiter: char,
    options: EngineOptions,
    import: &ImportOptions,
) -> Result<()> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character");
    }
    let read_options = CsvReadOptions {
        delimiter: delimiter as u8,
        ..Default::default()
    };
    let batch = CsvReader::read_file(input, &read_options)
        .with_context(|| format!("Failed to read '{}'", input.display()))?;

    let engine = Engine::with_options(options);
    let name = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let table = engine.create_table(&name);

    for (index, header) in batch.headers.iter().enumerate() {
        let data_type = infer_type(&batch, index);
        engine
            .add_column(table.id, header, data_type)
            .with_context(|| format!("Failed to add column '{}'", header))?;
    }
    for (column, formula) in formulas {
        let owner = match engine.store().column_by_name(table.id, column) {
            Some(existing) => existing,
            None => engine.add_column(table.id, column, DataType::Number)?,
        };
        engine
            .set_formula(owner.id, formula)
            .with_context(|| format!("Formula for '{}' is invalid", column))?;
        tracing::debug!(%column, %formula, "formula column ready");
    }

    let report = engine
        .import_rows(table.id, &batch, import)
        .context("Failed to import rows")?;
    if report.values_blanked > 0 {
        eprintln!(
            "Warning: {} non-numeric value(s) stored as empty",
            report.values_blanked
        );
    }

    write_table(&engine, &table, &report, output, delimiter as u8)
}

/// Number when every non-empty value parses as one
fn infer_type(batch: &ImportBatch, index: usize) -> DataType {
    let mut values = batch
        .rows
        .iter()
        .filter_map(|row| row.get(index))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .peekable();
    if values.peek().is_none() {
        return DataType::Text;
    }
    if values.all(|value| value.parse::<f64>().is_ok()) {
        DataType::Number
    } else {
        DataType::Text
    }
}

fn write_table(
    engine: &Engine,
    table: &Table,
    report: &ImportReport,
    output: Option<&Path>,
    delimiter: u8,
) -> Result<()> {
    let headers: Vec<String> = engine
        .store()
        .columns(table.id)?
        .into_iter()
        .map(|column| column.name)
        .collect();

    let mut rows = Vec::with_capacity(report.table_apis.len());
    for &table_api in &report.table_apis {
        let mut values = engine.row_values(table_api)?;
        rows.push(
            headers
                .iter()
                .map(|header| values.remove(header).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }

    let write_options = CsvWriteOptions {
        delimiter,
        ..Default::default()
    };
    if let Some(path) = output {
        CsvWriter::write_file(&headers, &rows, path, &write_options)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        eprintln!("Wrote {} rows to '{}'", rows.len(), path.display());
    } else {
        CsvWriter::write(&headers, &rows, io::stdout().lock(), &write_options)
            .context("Failed to write to stdout")?;
    }
    Ok(())
}
