//! Non-fatal diagnostics produced while reshaping.
//!
//! Data-shape anomalies found mid-transform (collisions, explicit missing
//! values, dropped rows) never abort a reshape. They are resolved by policy,
//! returned alongside the result table and logged through `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity for display and log routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Several input rows mapped to the same output cell while widening.
    Collision {
        /// Number of distinct key-tuples with at least one collision.
        key_tuples: usize,
        /// Number of output cells that received more than one value.
        cells: usize,
        /// Output columns holding at least one collided cell.
        columns: Vec<String>,
    },

    /// Rows removed by `values_drop_na`.
    DroppedMissing { rows: usize },

    /// Widened cells with no matching input row.
    ExplicitMissing {
        cells: usize,
        /// Whether `values_fill` replaced the missing cells.
        filled: bool,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Collision { .. } => Severity::Warning,
            Diagnostic::DroppedMissing { .. } | Diagnostic::ExplicitMissing { .. } => Severity::Info,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    /// Logs the diagnostic at the level matching its severity.
    pub fn emit(&self) {
        match self.severity() {
            Severity::Warning => tracing::warn!(diagnostic = ?self, "{}", self),
            Severity::Info => tracing::info!(diagnostic = ?self, "{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Collision { key_tuples, cells, columns } => write!(
                f,
                "values are not uniquely identified: {} key tuple(s) collide in {} cell(s) across column(s) {}",
                key_tuples,
                cells,
                columns.join(", ")
            ),
            Diagnostic::DroppedMissing { rows } => {
                write!(f, "dropped {} row(s) with missing values", rows)
            }
            Diagnostic::ExplicitMissing { cells, filled: true } => {
                write!(f, "filled {} absent cell(s) with values_fill", cells)
            }
            Diagnostic::ExplicitMissing { cells, filled: false } => {
                write!(f, "{} absent cell(s) set to missing", cells)
            }
        }
    }
}
