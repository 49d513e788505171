//! Tidyshape CLI - Reshape CSV tables between long and wide layouts
//!
//! # Main Commands
//!
//! ```bash
//! tidyshape longer ranks.csv --cols wk1,wk2 --names-to week --values-to rank
//! tidyshape wider long.csv --names-from week --values-from rank
//! tidyshape run input.csv --recipe recipe.json
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! tidyshape parse input.csv        # Show the parsed table as JSON
//! tidyshape example-recipe         # Print an example recipe
//! ```
//!
//! Set `RUST_LOG=tidyshape=debug` for detailed logs on stderr.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tidyshape::parser::{format_delimiter, infer_cell};
use tidyshape::{
    example_recipe, parse_file_auto, pivot_longer, pivot_wider, reshape_csv, table_to_json,
    to_csv_string, Diagnostic, LongerOptions, NameField, ReadOptions, Recipe, Separator, Table,
    Value, ValuesFn, WiderOptions,
};

#[derive(Parser)]
#[command(name = "tidyshape")]
#[command(about = "Reshape CSV tables between long and wide layouts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Args)]
struct IoArgs {
    /// Input CSV file
    input: PathBuf,

    /// CSV delimiter (auto-detect if not specified)
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pivot columns into name/value rows
    Longer {
        #[command(flatten)]
        io: IoArgs,

        /// Columns to pivot (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        cols: Vec<String>,

        /// Names of the derived fields; `.value` takes the value column name
        /// from the header, an empty entry discards that piece
        #[arg(long, value_delimiter = ',', default_value = "name")]
        names_to: Vec<String>,

        /// Name of the value column
        #[arg(long)]
        values_to: Option<String>,

        /// Literal separator between header pieces
        #[arg(long, conflicts_with = "names_pattern")]
        names_sep: Option<String>,

        /// Regex with one capture group per field
        #[arg(long)]
        names_pattern: Option<String>,

        /// Prefix stripped from headers before splitting
        #[arg(long)]
        names_prefix: Option<String>,

        /// Drop rows whose values are all missing
        #[arg(long)]
        drop_na: bool,
    },

    /// Spread name/value rows into columns
    Wider {
        #[command(flatten)]
        io: IoArgs,

        /// Columns whose values become column names (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        names_from: Vec<String>,

        /// Columns whose values fill the new columns (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        values_from: Vec<String>,

        /// Identifier columns (default: every other column)
        #[arg(long, value_delimiter = ',')]
        id_cols: Option<Vec<String>>,

        /// Separator used to join name pieces
        #[arg(long, default_value = "_")]
        names_sep: String,

        /// Prefix added to generated column names
        #[arg(long)]
        names_prefix: Option<String>,

        /// Sort generated columns instead of using first appearance
        #[arg(long)]
        names_sort: bool,

        /// Value for absent cells
        #[arg(long)]
        values_fill: Option<String>,

        /// Policy for cells receiving several values: list, first, last, count or error
        #[arg(long, default_value = "list")]
        values_fn: ValuesFn,
    },

    /// Run a JSON recipe of reshape steps
    Run {
        #[command(flatten)]
        io: IoArgs,

        /// Recipe JSON file
        #[arg(short, long)]
        recipe: PathBuf,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show example recipe
    ExampleRecipe,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Log filter used when `RUST_LOG` is unset; collision warnings stay visible.
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Longer {
            io,
            cols,
            names_to,
            values_to,
            names_sep,
            names_pattern,
            names_prefix,
            drop_na,
        } => {
            let mut opts = LongerOptions::new(cols)
                .names_to(names_to.iter().map(|n| name_field(n)))
                .values_drop_na(drop_na);
            opts.values_to = values_to;
            opts.names_sep = names_sep.map(Separator::Literal);
            opts.names_pattern = names_pattern;
            opts.names_prefix = names_prefix;
            cmd_longer(&io, &opts)
        }

        Commands::Wider {
            io,
            names_from,
            values_from,
            id_cols,
            names_sep,
            names_prefix,
            names_sort,
            values_fill,
            values_fn,
        } => {
            let mut opts = WiderOptions::new(names_from, values_from)
                .names_sep(names_sep)
                .names_sort(names_sort)
                .values_fn(values_fn);
            opts.id_cols = id_cols;
            opts.names_prefix = names_prefix;
            opts.values_fill = values_fill.as_deref().and_then(fill_value);
            cmd_wider(&io, &opts)
        }

        Commands::Run { io, recipe } => cmd_run(&io, &recipe),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::ExampleRecipe => cmd_example_recipe(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// CLI spelling of a `names_to` entry: empty means skip.
fn name_field(raw: &str) -> NameField {
    if raw.is_empty() {
        NameField::Skip
    } else {
        NameField::from(raw)
    }
}

/// CLI spelling of `values_fill`: an empty or NA token means no fill.
fn fill_value(raw: &str) -> Option<Value> {
    let value = infer_cell(raw, &ReadOptions::default());
    (!value.is_null()).then_some(value)
}

fn read_input(io: &IoArgs) -> Result<(Table, char), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading: {}", io.input.display());

    let options = ReadOptions {
        delimiter: io.delimiter,
        ..ReadOptions::default()
    };
    let parsed = parse_file_auto(&io.input, &options)?;

    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(parsed.delimiter),
        if io.delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Shape: {} rows x {} columns", parsed.table.n_rows(), parsed.table.n_cols());

    Ok((parsed.table, parsed.delimiter))
}

/// Warnings are already logged through `tracing`; only info diagnostics are echoed.
fn report_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for d in diagnostics.into_iter().filter(|d| !d.is_warning()) {
        eprintln!("   ℹ️  {}", d);
    }
}

fn cmd_longer(io: &IoArgs, opts: &LongerOptions) -> CliResult {
    let (table, delimiter) = read_input(io)?;

    eprintln!("   Pivoting: {}", opts.cols.join(", "));
    let reshaped = pivot_longer(&table, opts)?;
    eprintln!(
        "\n⚙️  Longer: {} rows x {} columns",
        reshaped.table.n_rows(),
        reshaped.table.n_cols()
    );
    report_diagnostics(&reshaped.diagnostics);

    write_table(&reshaped.table, io, delimiter)
}

fn cmd_wider(io: &IoArgs, opts: &WiderOptions) -> CliResult {
    let (table, delimiter) = read_input(io)?;

    let reshaped = pivot_wider(&table, opts)?;
    eprintln!(
        "\n⚙️  Wider: {} rows x {} columns",
        reshaped.table.n_rows(),
        reshaped.table.n_cols()
    );
    report_diagnostics(&reshaped.diagnostics);

    write_table(&reshaped.table, io, delimiter)
}

fn cmd_run(io: &IoArgs, recipe_path: &Path) -> CliResult {
    eprintln!("📄 Processing: {}", io.input.display());

    let recipe = Recipe::from_file(recipe_path)?;
    if !recipe.description.is_empty() {
        eprintln!("   Recipe: {}", recipe.description);
    }

    let options = ReadOptions {
        delimiter: io.delimiter,
        ..ReadOptions::default()
    };
    let output = reshape_csv(&io.input, &recipe, &options)?;

    eprintln!("   Encoding: {}", output.csv_info.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(output.csv_info.delimiter));
    eprintln!("   Rows: {}", output.csv_info.row_count);
    eprintln!("   Columns: {}", output.csv_info.headers.join(", "));

    for step in &output.execution.steps {
        eprintln!(
            "\n⚙️  Step {} ({}): {}x{} -> {}x{}",
            step.step, step.kind, step.rows_in, step.cols_in, step.rows_out, step.cols_out
        );
        report_diagnostics(&step.diagnostics);
    }
    eprintln!("\n✨ {}", output.execution.summary());

    write_table(&output.execution.table, io, output.csv_info.delimiter)
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let options = ReadOptions {
        delimiter,
        ..ReadOptions::default()
    };
    let result = parse_file_auto(input, &options)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    for col in result.table.columns() {
        eprintln!("   {} ({}, {} missing)", col.name(), col.kind(), col.null_count());
    }
    eprintln!("✅ Parsed {} rows", result.table.n_rows());

    let json = serde_json::to_string_pretty(&table_to_json(&result.table))?;
    write_output(&json, output)
}

fn cmd_example_recipe() -> CliResult {
    let json = example_recipe().to_json()?;
    println!("{}", json);
    Ok(())
}

fn write_table(table: &Table, io: &IoArgs, delimiter: char) -> CliResult {
    let content = match io.format {
        OutputFormat::Csv => to_csv_string(table, delimiter)?,
        OutputFormat::Json => serde_json::to_string_pretty(&table_to_json(table))?,
    };
    write_output(content.trim_end(), io.output.as_deref())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_shows_warnings() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::WARN));
    }

    #[test]
    fn test_fill_value() {
        assert_eq!(fill_value("0"), Some(Value::Int(0)));
        assert_eq!(fill_value("none"), Some(Value::from("none")));
        assert_eq!(fill_value(""), None);
        assert_eq!(fill_value("NA"), None);
    }

    #[test]
    fn test_cli_parses_wider_fill() {
        let cli = Cli::try_parse_from([
            "tidyshape", "wider", "in.csv", "--names-from", "k", "--values-from", "v",
            "--values-fill", "",
        ])
        .unwrap();
        match cli.command {
            Commands::Wider { values_fill, .. } => {
                assert_eq!(values_fill.as_deref().and_then(fill_value), None)
            }
            _ => panic!("expected wider"),
        }
    }
}
