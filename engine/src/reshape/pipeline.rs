//! High-level pipeline API: CSV in, recipe, reshaped table out.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidyshape::{reshape_csv, Recipe, ReadOptions};
//! use std::path::Path;
//!
//! let recipe = Recipe::from_file("recipe.json")?;
//! let output = reshape_csv(Path::new("ranks.csv"), &recipe, &ReadOptions::default())?;
//! println!("{}", output.execution.summary());
//! ```

use serde::Serialize;
use std::path::Path;

use super::executor::{execute, ExecutionResult};
use super::recipe::Recipe;
use crate::error::PipelineResult;
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult, ReadOptions};

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.table.column_names().into_iter().map(str::to_string).collect(),
            row_count: parsed.table.n_rows(),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Input metadata
    pub csv_info: CsvInfo,
    /// Reshaped table and per-step reports
    pub execution: ExecutionResult,
}

/// Reshape a CSV file with a recipe.
///
/// 1. Parses the CSV with auto-detection
/// 2. Checks the recipe's first step against the headers
/// 3. Executes every step
pub fn reshape_csv(path: &Path, recipe: &Recipe, options: &ReadOptions) -> PipelineResult<PipelineOutput> {
    let _span = tracing::info_span!("reshape_csv", path = %path.display()).entered();
    let parsed = parse_file_auto(path, options)?;
    reshape_parsed(parsed, recipe)
}

/// Reshape CSV bytes with a recipe.
///
/// Same as `reshape_csv` but accepts raw bytes instead of a file path.
pub fn reshape_bytes(bytes: &[u8], recipe: &Recipe, options: &ReadOptions) -> PipelineResult<PipelineOutput> {
    let parsed = parse_bytes_auto(bytes, options)?;
    reshape_parsed(parsed, recipe)
}

fn reshape_parsed(parsed: ParseResult, recipe: &Recipe) -> PipelineResult<PipelineOutput> {
    let csv_info = CsvInfo::from(&parsed);
    recipe.validate_headers(&csv_info.headers)?;

    let execution = execute(&parsed.table, recipe)?;
    tracing::info!("{}", execution.summary());

    Ok(PipelineOutput { csv_info, execution })
}
