//! Longer-Reshaper: turns selected columns into rows.
//!
//! ```text
//!  id │ wk1 │ wk2            id │ week │ rank
//! ────┼─────┼─────          ────┼──────┼──────
//!  1  │  5  │ NA      →      1  │ wk1  │  5
//!  2  │  3  │  4             1  │ wk2  │  NA
//!                            2  │ wk1  │  3
//!                            2  │ wk2  │  4
//! ```
//!
//! Output rows are ordered by input row first, then by the order of `cols`.
//! With the `.value` sentinel in `names_to`, headers that only differ in
//! their `.value` piece are merged, and each distinct `.value` piece becomes
//! its own value column. Rows sharing identifier values and the remaining
//! pieces collapse into one output row; two non-missing values for the same
//! cell are a [`ReshapeError::DuplicateValues`] error.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::names::{NameField, NameSplitter, Separator};
use super::Reshaped;
use crate::diagnostics::Diagnostic;
use crate::error::{ReshapeError, ReshapeResult};
use crate::table::{Column, Kind, Table, Value};

/// Name of the value column when `values_to` is not given.
pub const DEFAULT_VALUES_TO: &str = "value";

/// Name of the names column when `names_to` is not given.
pub const DEFAULT_NAMES_TO: &str = "name";

/// Arguments of [`pivot_longer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongerOptions {
    /// Columns to pivot, in output order. All other columns are identifiers.
    pub cols: Vec<String>,

    /// Derived fields produced from each header.
    pub names_to: Vec<NameField>,

    /// Name of the value column (default `"value"`). Must be unset with `.value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub names_sep: Option<Separator>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub names_pattern: Option<String>,

    /// Literal prefix removed from headers before splitting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names_prefix: Option<String>,

    /// Drop output rows whose value cells are all missing.
    pub values_drop_na: bool,
}

impl Default for LongerOptions {
    fn default() -> Self {
        Self {
            cols: Vec::new(),
            names_to: vec![NameField::Field(DEFAULT_NAMES_TO.to_string())],
            values_to: None,
            names_sep: None,
            names_pattern: None,
            names_prefix: None,
            values_drop_na: false,
        }
    }
}

impl LongerOptions {
    pub fn new<I, S>(cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cols: cols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn names_to<I, F>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<NameField>,
    {
        self.names_to = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn values_to(mut self, name: impl Into<String>) -> Self {
        self.values_to = Some(name.into());
        self
    }

    pub fn names_sep(mut self, sep: impl Into<Separator>) -> Self {
        self.names_sep = Some(sep.into());
        self
    }

    pub fn names_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.names_pattern = Some(pattern.into());
        self
    }

    pub fn names_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.names_prefix = Some(prefix.into());
        self
    }

    pub fn values_drop_na(mut self, drop: bool) -> Self {
        self.values_drop_na = drop;
        self
    }
}

/// One output row template: derived field pieces plus, for every value
/// column, the pivoted column feeding it (if any).
#[derive(Debug)]
struct Slot {
    pieces: Vec<String>,
    sources: Vec<Option<usize>>,
}

#[derive(Debug)]
struct Layout {
    value_names: Vec<String>,
    value_kinds: Vec<Kind>,
    slots: Vec<Slot>,
}

impl Layout {
    fn build(
        table: &Table,
        pivot: &[usize],
        splitter: &NameSplitter,
        values_to: &str,
    ) -> ReshapeResult<Self> {
        let columns = table.columns();
        let splits = pivot
            .iter()
            .map(|&c| splitter.split(columns[c].name()).map(|s| (c, s)))
            .collect::<ReshapeResult<Vec<_>>>()?;

        let mut value_names: Vec<String> = Vec::new();
        for (_, split) in &splits {
            let name = split.value_name.as_deref().unwrap_or(values_to);
            if !value_names.iter().any(|n| n == name) {
                value_names.push(name.to_string());
            }
        }

        let merge = splitter.has_value_field();
        let mut slots: Vec<Slot> = Vec::new();
        let mut by_pieces: HashMap<Vec<String>, usize> = HashMap::new();

        for (col, split) in splits {
            let pieces: Vec<String> = split.fields.into_iter().map(|(_, p)| p).collect();
            let value_name = split.value_name.as_deref().unwrap_or(values_to);
            let v = value_names.iter().position(|n| n == value_name).unwrap_or(0);

            let existing = if merge { by_pieces.get(&pieces).copied() } else { None };
            let slot = match existing {
                Some(slot) => slot,
                None => {
                    if merge {
                        by_pieces.insert(pieces.clone(), slots.len());
                    }
                    slots.push(Slot {
                        pieces,
                        sources: vec![None; value_names.len()],
                    });
                    slots.len() - 1
                }
            };

            if let Some(prev) = slots[slot].sources[v] {
                return Err(ReshapeError::ConflictingArguments(format!(
                    "columns '{}' and '{}' both map to value column '{}' with the same names",
                    columns[prev].name(),
                    columns[col].name(),
                    value_names[v]
                )));
            }
            slots[slot].sources[v] = Some(col);
        }

        let mut value_kinds = Vec::with_capacity(value_names.len());
        for (v, name) in value_names.iter().enumerate() {
            let mut kind = Kind::Null;
            for src in slots.iter().filter_map(|s| s.sources[v]) {
                let next = columns[src].kind();
                kind = kind.unify(next).ok_or_else(|| ReshapeError::IncompatibleTypes {
                    column: name.clone(),
                    left: kind,
                    right: next,
                })?;
            }
            value_kinds.push(kind);
        }

        Ok(Self {
            value_names,
            value_kinds,
            slots,
        })
    }
}

/// Pivots `opts.cols` into rows.
///
/// # Errors
/// - [`ReshapeError::UnknownColumn`] if a column in `cols` does not exist
/// - [`ReshapeError::ShapeMismatch`] / [`ReshapeError::PatternMismatch`] if a header cannot be split
/// - [`ReshapeError::ConflictingArguments`] for invalid argument combinations
/// - [`ReshapeError::DuplicateColumn`] if an output name repeats an identifier column
/// - [`ReshapeError::IncompatibleTypes`] if pivoted columns cannot share a value column
/// - [`ReshapeError::DuplicateValues`] if `.value` merging puts two values in one cell
///
/// # Example
/// ```
/// use tidyshape::{pivot_longer, LongerOptions, Table, Value};
///
/// let table = Table::from_rows(
///     &["id", "wk1", "wk2"],
///     vec![vec![1.into(), 5.into(), Value::Null], vec![2.into(), 3.into(), 4.into()]],
/// ).unwrap();
///
/// let opts = LongerOptions::new(["wk1", "wk2"])
///     .names_to(["week"])
///     .values_to("rank")
///     .values_drop_na(true);
/// let out = pivot_longer(&table, &opts).unwrap().into_table();
///
/// assert_eq!(out.column_names(), vec!["id", "week", "rank"]);
/// assert_eq!(out.n_rows(), 3);
/// ```
pub fn pivot_longer(table: &Table, opts: &LongerOptions) -> ReshapeResult<Reshaped> {
    if opts.cols.is_empty() {
        return Err(ReshapeError::ConflictingArguments(
            "cols must select at least one column".into(),
        ));
    }
    let pivot = table.resolve(&opts.cols)?;
    let mut seen = HashSet::new();
    if let Some(dup) = opts.cols.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(ReshapeError::ConflictingArguments(format!(
            "column '{}' is selected more than once",
            dup
        )));
    }

    let splitter = NameSplitter::new(
        &opts.names_to,
        opts.names_sep.as_ref(),
        opts.names_pattern.as_deref(),
        opts.names_prefix.as_deref(),
    )?;
    if splitter.has_value_field() && opts.values_to.is_some() {
        return Err(ReshapeError::ConflictingArguments(
            "values_to cannot be combined with '.value' in names_to".into(),
        ));
    }

    let values_to = opts.values_to.as_deref().unwrap_or(DEFAULT_VALUES_TO);
    let layout = Layout::build(table, &pivot, &splitter, values_to)?;

    let ids: Vec<usize> = (0..table.n_cols()).filter(|i| !pivot.contains(i)).collect();
    let field_names = splitter.field_names();

    let mut seen = HashSet::new();
    let out_names = ids
        .iter()
        .map(|&i| table.columns()[i].name())
        .chain(field_names.iter().copied())
        .chain(layout.value_names.iter().map(String::as_str));
    for name in out_names {
        if !seen.insert(name) {
            return Err(ReshapeError::DuplicateColumn(name.to_string()));
        }
    }

    let capacity = table.n_rows() * layout.slots.len();
    let mut id_cells: Vec<Vec<Value>> = vec![Vec::with_capacity(capacity); ids.len()];
    let mut field_cells: Vec<Vec<Value>> = vec![Vec::with_capacity(capacity); field_names.len()];
    let mut value_cells: Vec<Vec<Value>> = vec![Vec::with_capacity(capacity); layout.value_names.len()];
    let mut dropped = 0;

    let cell = |row: usize, col: usize| table.columns()[col].values()[row].clone();

    // Output rows as (source row, slot, values), in first-appearance order.
    // With `.value`, rows sharing identifier values and slot pieces collapse.
    let merge = splitter.has_value_field();
    let mut pending: Vec<(usize, usize, Vec<Value>)> = Vec::with_capacity(capacity);
    let mut index: HashMap<(Vec<Value>, usize), usize> = HashMap::new();
    let mut conflicts: HashSet<usize> = HashSet::new();
    let mut first_conflict: Option<String> = None;

    for row in 0..table.n_rows() {
        for (s, slot) in layout.slots.iter().enumerate() {
            let values: Vec<Value> = slot
                .sources
                .iter()
                .map(|src| src.map(|c| cell(row, c)).unwrap_or(Value::Null))
                .collect();

            if !merge {
                pending.push((row, s, values));
                continue;
            }

            let key = (ids.iter().map(|&c| cell(row, c)).collect::<Vec<_>>(), s);
            match index.get(&key).copied() {
                None => {
                    index.insert(key, pending.len());
                    pending.push((row, s, values));
                }
                Some(at) => {
                    for (v, incoming) in values.into_iter().enumerate() {
                        if incoming.is_null() {
                            continue;
                        }
                        let target = &mut pending[at].2[v];
                        if target.is_null() {
                            *target = incoming;
                        } else {
                            conflicts.insert(at);
                            first_conflict.get_or_insert_with(|| layout.value_names[v].clone());
                        }
                    }
                }
            }
        }
    }

    if let Some(column) = first_conflict {
        return Err(ReshapeError::DuplicateValues {
            key_tuples: conflicts.len(),
            column,
        });
    }

    for (row, s, values) in pending {
        if opts.values_drop_na && values.iter().all(Value::is_null) {
            dropped += 1;
            continue;
        }

        for (cells, &c) in id_cells.iter_mut().zip(&ids) {
            cells.push(cell(row, c));
        }
        for (cells, piece) in field_cells.iter_mut().zip(&layout.slots[s].pieces) {
            cells.push(Value::Str(piece.clone()));
        }
        for (cells, value) in value_cells.iter_mut().zip(values) {
            cells.push(value);
        }
    }

    let mut columns = Vec::with_capacity(ids.len() + field_names.len() + value_cells.len());
    for (&c, cells) in ids.iter().zip(id_cells) {
        let source = &table.columns()[c];
        columns.push(Column::from_parts(source.name().to_string(), source.kind(), cells));
    }
    for (name, cells) in field_names.iter().zip(field_cells) {
        columns.push(Column::from_parts(name.to_string(), Kind::Str, cells));
    }
    for ((name, kind), cells) in layout
        .value_names
        .iter()
        .zip(&layout.value_kinds)
        .zip(value_cells)
    {
        columns.push(Column::from_parts(name.clone(), *kind, cells));
    }

    let out = Table::new(columns)?;
    tracing::debug!(
        rows_in = table.n_rows(),
        rows_out = out.n_rows(),
        pivoted = pivot.len(),
        value_columns = layout.value_names.len(),
        "pivot_longer"
    );

    let mut diagnostics = Vec::new();
    if dropped > 0 {
        diagnostics.push(Diagnostic::DroppedMissing { rows: dropped });
    }
    Ok(Reshaped::new(out, diagnostics))
}
