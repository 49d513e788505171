//! Error types for the tidyshape reshaping engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ReshapeError`] - Fatal argument/structure errors raised by the reshapers
//! - [`CsvError`] - CSV reading and writing errors
//! - [`RecipeError`] - Recipe (JSON config) errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Collisions during widening are *not* errors: they are reported through
//! [`crate::diagnostics::Diagnostic`] and resolved by the aggregation policy.

use thiserror::Error;

use crate::table::Kind;

// =============================================================================
// Reshape Errors
// =============================================================================

/// Errors raised by `pivot_longer` / `pivot_wider`.
///
/// All variants abort the call: no partial table is returned.
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// A referenced column does not exist in the input table.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// A separator split produced the wrong number of pieces.
    #[error("Header '{header}' splits into {found} piece(s), expected {expected}")]
    ShapeMismatch {
        header: String,
        expected: usize,
        found: usize,
    },

    /// A names pattern did not match a header or has the wrong group count.
    #[error("Pattern mismatch: {0}")]
    PatternMismatch(String),

    /// Mutually exclusive or missing arguments.
    #[error("Conflicting arguments: {0}")]
    ConflictingArguments(String),

    /// A regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The output would contain two columns with the same name.
    #[error("Duplicate column name in output: '{0}'")]
    DuplicateColumn(String),

    /// Cells of incompatible kinds were combined into one column.
    #[error("Cannot combine {left} and {right} values in column '{column}'")]
    IncompatibleTypes {
        column: String,
        left: Kind,
        right: Kind,
    },

    /// A collision occurred while the `error` aggregation policy is active.
    #[error("{key_tuples} row key(s) map to the same cell more than once (first: column '{column}')")]
    DuplicateValues { key_tuples: usize, column: String },

    /// Columns of a table have different lengths.
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    RaggedTable {
        column: String,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing tabular files.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty file.
    #[error("CSV input is empty")]
    EmptyFile,

    /// Writer failure.
    #[error("Failed to write CSV: {0}")]
    Write(String),

    /// Decoded rows did not form a valid table.
    #[error("Invalid table: {0}")]
    Table(#[from] ReshapeError),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Recipe Errors
// =============================================================================

/// Errors while loading a reshape recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// JSON serialization/deserialization error.
    #[error("Recipe JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Recipe IO error.
    #[error("Recipe IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recipe has no steps.
    #[error("Recipe has no steps")]
    Empty,

    /// A step references columns the input does not have.
    #[error("Step {step} references missing column(s): {columns:?}")]
    MissingColumns { step: usize, columns: Vec<String> },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::reshape::pipeline::reshape_csv`]
/// and surfaced by the CLI.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Recipe error.
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    /// Reshape error, with the index of the failing recipe step.
    #[error("Step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: ReshapeError,
    },

    /// Reshape error outside of a recipe.
    #[error("Reshape error: {0}")]
    Reshape(#[from] ReshapeError),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reshape operations.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for recipe operations.
pub type RecipeResult<T> = Result<T, RecipeError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
