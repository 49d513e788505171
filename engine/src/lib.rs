//! # Tidyshape - reshaping tables between long and wide layouts
//!
//! Tidyshape turns wide tables (one column per measurement) into long ones
//! (one row per measurement) and back, with a header splitter for column
//! names that carry several variables at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Reshape   │────▶│  CSV / JSON │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (recipe)   │     │  + warnings │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tidyshape::{pivot_longer, pivot_wider, LongerOptions, Table, Value, WiderOptions};
//!
//! let wide = Table::from_rows(
//!     &["id", "wk1", "wk2"],
//!     vec![
//!         vec![1.into(), 5.into(), Value::Null],
//!         vec![2.into(), 3.into(), 4.into()],
//!     ],
//! )
//! .unwrap();
//!
//! let long = pivot_longer(&wide, &LongerOptions::new(["wk1", "wk2"]).names_to(["week"])).unwrap();
//! assert_eq!(long.table.n_rows(), 4);
//!
//! let back = pivot_wider(&long.table, &WiderOptions::new(["week"], ["value"])).unwrap();
//! assert_eq!(back.table.column_names(), vec!["id", "wk1", "wk2"]);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`table`] - Column-oriented table model
//! - [`diagnostics`] - Non-fatal findings reported by reshapes
//! - [`parser`] - CSV reading and writing with auto-detection
//! - [`reshape`] - Longer/wider reshapers, name splitting, recipes and pipeline

// Core modules
pub mod diagnostics;
pub mod error;
pub mod table;

// I/O
pub mod parser;

// Reshaping
pub mod reshape;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, PipelineError, PipelineResult, RecipeError, RecipeResult, ReshapeError,
    ReshapeResult,
};

// =============================================================================
// Re-exports - Table model
// =============================================================================

pub use table::{Column, Kind, Table, Value};

// =============================================================================
// Re-exports - Diagnostics
// =============================================================================

pub use diagnostics::{Diagnostic, Severity};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, detect_encoding, decode_content, parse_bytes_auto, parse_file_auto,
    parse_str, table_to_json, to_csv_string, write_csv, ParseResult, ReadOptions,
};

// =============================================================================
// Re-exports - Reshapers
// =============================================================================

pub use reshape::{
    pivot_longer, pivot_wider, LongerOptions, NameField, NameSplitter, Reshaped, Separator,
    SplitName, ValuesFn, WiderOptions, VALUE_SENTINEL,
};

// =============================================================================
// Re-exports - Recipes
// =============================================================================

pub use reshape::{example_recipe, execute, ExecutionResult, Recipe, Step, StepReport};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use reshape::{reshape_bytes, reshape_csv, CsvInfo, PipelineOutput};
