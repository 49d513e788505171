//! Reshaping module.
//!
//! This module handles the two dual reshapes and everything around them:
//! - Names: header splitting for `pivot_longer`
//! - Longer: columns → rows
//! - Wider: key/value rows → columns
//! - Recipe: serializable list of reshape steps
//! - Executor: runs a recipe against a table
//! - Pipeline: CSV in, recipe, table out

pub mod executor;
pub mod longer;
pub mod names;
pub mod pipeline;
pub mod recipe;
pub mod wider;

pub use executor::{execute, ExecutionResult, StepReport};
pub use longer::{pivot_longer, LongerOptions};
pub use names::{NameField, NameSplitter, Separator, SplitName, VALUE_SENTINEL};
pub use pipeline::*;
pub use recipe::{example_recipe, Recipe, Step};
pub use wider::{pivot_wider, ValuesFn, WiderOptions};

use crate::diagnostics::Diagnostic;
use crate::table::Table;

/// Output of a single reshape: the new table plus any diagnostics.
#[derive(Debug, Clone)]
pub struct Reshaped {
    pub table: Table,
    pub diagnostics: Vec<Diagnostic>,
}

impl Reshaped {
    pub(crate) fn new(table: Table, diagnostics: Vec<Diagnostic>) -> Self {
        for d in &diagnostics {
            d.emit();
        }
        Self { table, diagnostics }
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Number of key-tuples reported as colliding, if any collided.
    pub fn collisions(&self) -> Option<usize> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::Collision { key_tuples, .. } => Some(*key_tuples),
            _ => None,
        })
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_warning)
    }
}
