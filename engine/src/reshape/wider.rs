//! Wider-Reshaper: turns key/value rows into columns.
//!
//! ```text
//!  org │ measure │ rate          org │ x │ y
//! ─────┼─────────┼──────        ─────┼───┼───
//!   A  │    x    │  1      →      A  │ 1 │ 2
//!   A  │    y    │  2             B  │ 3 │ 4
//!   B  │    x    │  3
//!   B  │    y    │  4
//! ```
//!
//! Rows are grouped by the values of `id_cols` (the key-tuple), in order of
//! first appearance. Generated columns come from the values of `names_from`
//! (the name-template), also in order of first appearance unless
//! `names_sort` is set. When several rows land in the same cell the
//! `values_fn` policy resolves them and a [`Diagnostic::Collision`] is
//! reported.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::Reshaped;
use crate::diagnostics::Diagnostic;
use crate::error::{ReshapeError, ReshapeResult};
use crate::table::{Column, Kind, Table, Value};

/// Aggregation policy for cells that receive more than one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuesFn {
    /// Collect colliding values into a list cell.
    #[default]
    List,
    /// Keep the first value in input order.
    First,
    /// Keep the last value in input order.
    Last,
    /// Replace every cell with the number of values it received.
    Count,
    /// Abort with [`ReshapeError::DuplicateValues`].
    Error,
}

impl std::str::FromStr for ValuesFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" => Ok(Self::List),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "count" => Ok(Self::Count),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown values_fn '{}' (expected list, first, last, count or error)",
                other
            )),
        }
    }
}

fn default_names_sep() -> String {
    "_".to_string()
}

/// Arguments of [`pivot_wider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WiderOptions {
    /// Columns identifying output rows. Defaults to every column not in
    /// `names_from` or `values_from`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_cols: Option<Vec<String>>,

    pub names_from: Vec<String>,

    pub values_from: Vec<String>,

    /// Joins name-template components, and the `values_from` name when
    /// there are several value columns.
    #[serde(default = "default_names_sep")]
    pub names_sep: String,

    /// Literal prefix added to every generated column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names_prefix: Option<String>,

    /// Order generated columns by name-template value instead of first appearance.
    #[serde(default)]
    pub names_sort: bool,

    /// Value for cells no input row maps to (default: null).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_fill: Option<Value>,

    #[serde(default)]
    pub values_fn: ValuesFn,
}

impl WiderOptions {
    pub fn new<N, V, S, T>(names_from: N, values_from: V) -> Self
    where
        N: IntoIterator<Item = S>,
        V: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            id_cols: None,
            names_from: names_from.into_iter().map(Into::into).collect(),
            values_from: values_from.into_iter().map(Into::into).collect(),
            names_sep: default_names_sep(),
            names_prefix: None,
            names_sort: false,
            values_fill: None,
            values_fn: ValuesFn::default(),
        }
    }

    pub fn id_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_cols = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    pub fn names_sep(mut self, sep: impl Into<String>) -> Self {
        self.names_sep = sep.into();
        self
    }

    pub fn names_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.names_prefix = Some(prefix.into());
        self
    }

    pub fn names_sort(mut self, sort: bool) -> Self {
        self.names_sort = sort;
        self
    }

    pub fn values_fill(mut self, fill: impl Into<Value>) -> Self {
        self.values_fill = Some(fill.into());
        self
    }

    pub fn values_fn(mut self, policy: ValuesFn) -> Self {
        self.values_fn = policy;
        self
    }
}

/// Assigns dense indices to distinct keys in first-appearance order.
#[derive(Debug, Default)]
struct Interner {
    index: HashMap<Vec<Value>, usize>,
    keys: Vec<Vec<Value>>,
}

impl Interner {
    fn intern(&mut self, key: Vec<Value>) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.keys.len();
        self.index.insert(key.clone(), i);
        self.keys.push(key);
        i
    }
}

fn check_disjoint(a: (&str, &[usize]), b: (&str, &[usize]), table: &Table) -> ReshapeResult<()> {
    if let Some(&shared) = a.1.iter().find(|i| b.1.contains(i)) {
        return Err(ReshapeError::ConflictingArguments(format!(
            "column '{}' appears in both {} and {}",
            table.columns()[shared].name(),
            a.0,
            b.0
        )));
    }
    Ok(())
}

/// Spreads `values_from` across new columns named by `names_from`.
///
/// Columns not listed in `id_cols`, `names_from` or `values_from` are dropped.
///
/// # Errors
/// - [`ReshapeError::UnknownColumn`] if any referenced column does not exist
/// - [`ReshapeError::ConflictingArguments`] if a column list is empty or lists overlap
/// - [`ReshapeError::DuplicateColumn`] if a generated name repeats an id column
/// - [`ReshapeError::DuplicateValues`] on collision with [`ValuesFn::Error`]
/// - [`ReshapeError::IncompatibleTypes`] if `values_fill` does not fit a value column
///
/// # Example
/// ```
/// use tidyshape::{pivot_wider, Table, WiderOptions};
///
/// let table = Table::from_rows(
///     &["org", "measure", "rate"],
///     vec![
///         vec!["A".into(), "x".into(), 1.into()],
///         vec!["A".into(), "y".into(), 2.into()],
///         vec!["B".into(), "x".into(), 3.into()],
///         vec!["B".into(), "y".into(), 4.into()],
///     ],
/// ).unwrap();
///
/// let opts = WiderOptions::new(["measure"], ["rate"]).id_cols(["org"]);
/// let out = pivot_wider(&table, &opts).unwrap().into_table();
///
/// assert_eq!(out.column_names(), vec!["org", "x", "y"]);
/// assert_eq!(out.n_rows(), 2);
/// ```
pub fn pivot_wider(table: &Table, opts: &WiderOptions) -> ReshapeResult<Reshaped> {
    if opts.names_from.is_empty() || opts.values_from.is_empty() {
        return Err(ReshapeError::ConflictingArguments(
            "names_from and values_from must each name at least one column".into(),
        ));
    }

    let names_from = table.resolve(&opts.names_from)?;
    let values_from = table.resolve(&opts.values_from)?;
    check_disjoint(("names_from", names_from.as_slice()), ("values_from", values_from.as_slice()), table)?;

    let id_cols = match &opts.id_cols {
        Some(cols) => {
            let ids = table.resolve(cols)?;
            check_disjoint(("id_cols", ids.as_slice()), ("names_from", names_from.as_slice()), table)?;
            check_disjoint(("id_cols", ids.as_slice()), ("values_from", values_from.as_slice()), table)?;
            ids
        }
        None => (0..table.n_cols())
            .filter(|i| !names_from.contains(i) && !values_from.contains(i))
            .collect(),
    };

    let columns = table.columns();
    let key_of = |row: usize, cols: &[usize]| -> Vec<Value> {
        cols.iter().map(|&c| columns[c].values()[row].clone()).collect()
    };

    // Pass 1: group rows by key-tuple and name-template.
    let mut groups = Interner::default();
    let mut templates = Interner::default();
    let mut cells: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    for row in 0..table.n_rows() {
        let g = groups.intern(key_of(row, &id_cols));
        let t = templates.intern(key_of(row, &names_from));
        cells.entry((g, t)).or_default().push(row);
    }

    // Column order of name-templates.
    let mut order: Vec<usize> = (0..templates.keys.len()).collect();
    if opts.names_sort {
        order.sort_by(|&a, &b| {
            let (ka, kb) = (&templates.keys[a], &templates.keys[b]);
            ka.iter()
                .zip(kb)
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    let rendered: Vec<String> = templates
        .keys
        .iter()
        .map(|key| {
            key.iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(&opts.names_sep)
        })
        .collect();

    // Collisions are per (key-tuple, template); each one affects every values_from column.
    let mut colliding_groups = HashSet::new();
    let mut colliding_templates = HashSet::new();
    let mut colliding_cells = 0;
    for (&(g, t), rows) in &cells {
        if rows.len() > 1 {
            colliding_groups.insert(g);
            colliding_templates.insert(t);
            colliding_cells += 1;
        }
    }

    let prefix = opts.names_prefix.as_deref().unwrap_or("");
    let column_name = |value_col: usize, t: usize| -> String {
        if values_from.len() > 1 {
            format!(
                "{}{}{}{}",
                prefix,
                columns[value_col].name(),
                opts.names_sep,
                rendered[t]
            )
        } else {
            format!("{}{}", prefix, rendered[t])
        }
    };

    if opts.values_fn == ValuesFn::Error && colliding_cells > 0 {
        let first = order
            .iter()
            .find(|t| colliding_templates.contains(*t))
            .map(|&t| column_name(values_from[0], t))
            .unwrap_or_default();
        return Err(ReshapeError::DuplicateValues {
            key_tuples: colliding_groups.len(),
            column: first,
        });
    }

    // Pass 2: materialize.
    let n_groups = groups.keys.len();
    let mut out = Vec::with_capacity(id_cols.len() + values_from.len() * order.len());
    for (pos, &c) in id_cols.iter().enumerate() {
        let source = &columns[c];
        let values = groups.keys.iter().map(|k| k[pos].clone()).collect();
        out.push(Column::from_parts(source.name().to_string(), source.kind(), values));
    }

    let mut missing = 0;
    let mut collided_columns = Vec::new();
    for &vc in &values_from {
        let source = &columns[vc];
        for &t in &order {
            let name = column_name(vc, t);
            let as_list = opts.values_fn == ValuesFn::List && colliding_templates.contains(&t);
            if colliding_templates.contains(&t) {
                collided_columns.push(name.clone());
            }

            let mut values = Vec::with_capacity(n_groups);
            for g in 0..n_groups {
                let rows = cells.get(&(g, t)).map(Vec::as_slice).unwrap_or(&[]);
                let pick = |r: usize| source.values()[r].clone();
                let value = match rows {
                    [] => {
                        missing += 1;
                        let fill = opts.values_fill.clone().unwrap_or(Value::Null);
                        if as_list && !fill.is_null() {
                            Value::List(vec![fill])
                        } else {
                            fill
                        }
                    }
                    _ if opts.values_fn == ValuesFn::Count => Value::Int(rows.len() as i64),
                    _ if as_list => Value::List(rows.iter().map(|&r| pick(r)).collect()),
                    [.., last] if opts.values_fn == ValuesFn::Last => pick(*last),
                    [first, ..] => pick(*first),
                };
                values.push(value);
            }

            let kind = if as_list {
                Kind::List
            } else if opts.values_fn == ValuesFn::Count {
                Kind::Int
            } else {
                source.kind()
            };
            out.push(Column::with_kind(name, kind, values)?);
        }
    }

    let result = Table::new(out)?;
    tracing::debug!(
        rows_in = table.n_rows(),
        rows_out = result.n_rows(),
        key_tuples = n_groups,
        templates = order.len(),
        "pivot_wider"
    );

    let mut diagnostics = Vec::new();
    if colliding_cells > 0 {
        diagnostics.push(Diagnostic::Collision {
            key_tuples: colliding_groups.len(),
            cells: colliding_cells * values_from.len(),
            columns: collided_columns,
        });
    }
    if missing > 0 {
        diagnostics.push(Diagnostic::ExplicitMissing {
            cells: missing,
            filled: opts.values_fill.is_some(),
        });
    }
    Ok(Reshaped::new(result, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::longer::{pivot_longer, LongerOptions};

    fn rates() -> Table {
        Table::from_rows(
            &["org", "measure", "rate"],
            vec![
                vec!["A".into(), "x".into(), 1.into()],
                vec!["A".into(), "y".into(), 2.into()],
                vec!["B".into(), "x".into(), 3.into()],
                vec!["B".into(), "y".into(), 4.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_basic() {
        let opts = WiderOptions::new(["measure"], ["rate"]).id_cols(["org"]);
        let out = pivot_wider(&rates(), &opts).unwrap();

        assert_eq!(out.table.column_names(), vec!["org", "x", "y"]);
        let rows: Vec<Vec<Value>> = out.table.rows().collect();
        assert_eq!(
            rows,
            vec![
                vec!["A".into(), 1.into(), 2.into()],
                vec!["B".into(), 3.into(), 4.into()],
            ]
        );
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.table.column("x").unwrap().kind(), Kind::Int);
    }

    #[test]
    fn test_scenario_collision() {
        let t = Table::from_rows(
            &["org", "measure", "rate"],
            vec![
                vec!["A".into(), "x".into(), 1.into()],
                vec!["A".into(), "x".into(), 5.into()],
                vec!["B".into(), "x".into(), 3.into()],
            ],
        )
        .unwrap();
        let out = pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"])).unwrap();

        assert_eq!(out.collisions(), Some(1));
        assert!(out.has_warnings());
        assert_eq!(
            out.table.get(0, "x"),
            Some(&Value::List(vec![1.into(), 5.into()]))
        );
        // Non-colliding cells of a list column are single-element lists
        assert_eq!(out.table.get(1, "x"), Some(&Value::List(vec![3.into()])));
        assert_eq!(out.table.column("x").unwrap().kind(), Kind::List);
        assert_eq!(
            out.diagnostics[0],
            Diagnostic::Collision {
                key_tuples: 1,
                cells: 1,
                columns: vec!["x".into()]
            }
        );
    }

    #[test]
    fn test_collision_policies() {
        let t = Table::from_rows(
            &["k", "n", "v"],
            vec![
                vec![1.into(), "a".into(), 10.into()],
                vec![1.into(), "a".into(), 20.into()],
            ],
        )
        .unwrap();

        let first = pivot_wider(&t, &WiderOptions::new(["n"], ["v"]).values_fn(ValuesFn::First)).unwrap();
        assert_eq!(first.table.get(0, "a"), Some(&Value::Int(10)));
        assert_eq!(first.collisions(), Some(1));

        let last = pivot_wider(&t, &WiderOptions::new(["n"], ["v"]).values_fn(ValuesFn::Last)).unwrap();
        assert_eq!(last.table.get(0, "a"), Some(&Value::Int(20)));

        let count = pivot_wider(&t, &WiderOptions::new(["n"], ["v"]).values_fn(ValuesFn::Count)).unwrap();
        assert_eq!(count.table.get(0, "a"), Some(&Value::Int(2)));

        let err = pivot_wider(&t, &WiderOptions::new(["n"], ["v"]).values_fn(ValuesFn::Error)).unwrap_err();
        assert!(matches!(err, ReshapeError::DuplicateValues { key_tuples: 1, ref column } if column == "a"));
    }

    #[test]
    fn test_missing_cells_null_or_filled() {
        let t = Table::from_rows(
            &["org", "measure", "rate"],
            vec![
                vec!["A".into(), "x".into(), 1.into()],
                vec!["B".into(), "y".into(), 4.into()],
            ],
        )
        .unwrap();

        let out = pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"])).unwrap();
        assert_eq!(out.table.get(0, "y"), Some(&Value::Null));
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::ExplicitMissing { cells: 2, filled: false }]
        );

        let filled = pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"]).values_fill(0)).unwrap();
        assert_eq!(filled.table.get(0, "y"), Some(&Value::Int(0)));
        assert_eq!(
            filled.diagnostics,
            vec![Diagnostic::ExplicitMissing { cells: 2, filled: true }]
        );

        let bad_fill = WiderOptions::new(["measure"], ["rate"]).values_fill("none");
        assert!(matches!(
            pivot_wider(&t, &bad_fill),
            Err(ReshapeError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn test_default_id_cols_and_dropped_columns() {
        let t = Table::from_rows(
            &["org", "note", "measure", "rate"],
            vec![
                vec!["A".into(), "n1".into(), "x".into(), 1.into()],
                vec!["A".into(), "n2".into(), "y".into(), 2.into()],
            ],
        )
        .unwrap();

        // Default id_cols includes `note`, so each row stays separate
        let all = pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"])).unwrap();
        assert_eq!(all.table.column_names(), vec!["org", "note", "x", "y"]);
        assert_eq!(all.table.n_rows(), 2);

        // Explicit id_cols drops `note`
        let org = pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"]).id_cols(["org"])).unwrap();
        assert_eq!(org.table.column_names(), vec!["org", "x", "y"]);
        assert_eq!(org.table.n_rows(), 1);
    }

    #[test]
    fn test_multiple_values_from() {
        let t = Table::from_rows(
            &["id", "year", "lo", "hi"],
            vec![
                vec![1.into(), 2020.into(), 1.into(), 9.into()],
                vec![1.into(), 2021.into(), 2.into(), 8.into()],
            ],
        )
        .unwrap();
        let out = pivot_wider(&t, &WiderOptions::new(["year"], ["lo", "hi"])).unwrap();
        assert_eq!(
            out.table.column_names(),
            vec!["id", "lo_2020", "lo_2021", "hi_2020", "hi_2021"]
        );
        // Column-count law
        assert_eq!(out.table.n_cols(), 1 + 2 * 2);
    }

    #[test]
    fn test_multiple_names_from_and_prefix() {
        let t = Table::from_rows(
            &["id", "a", "b", "v"],
            vec![
                vec![1.into(), "p".into(), 1.into(), 1.5.into()],
                vec![1.into(), "q".into(), Value::Null, 2.5.into()],
            ],
        )
        .unwrap();
        let opts = WiderOptions::new(["a", "b"], ["v"])
            .names_sep(".")
            .names_prefix("m_");
        let out = pivot_wider(&t, &opts).unwrap();
        assert_eq!(out.table.column_names(), vec!["id", "m_p.1", "m_q.NA"]);
    }

    #[test]
    fn test_names_sort() {
        let t = Table::from_rows(
            &["id", "n", "v"],
            vec![
                vec![1.into(), "b".into(), 1.into()],
                vec![1.into(), "a".into(), 2.into()],
            ],
        )
        .unwrap();
        let unsorted = pivot_wider(&t, &WiderOptions::new(["n"], ["v"])).unwrap();
        assert_eq!(unsorted.table.column_names(), vec!["id", "b", "a"]);

        let sorted = pivot_wider(&t, &WiderOptions::new(["n"], ["v"]).names_sort(true)).unwrap();
        assert_eq!(sorted.table.column_names(), vec!["id", "a", "b"]);
        assert_eq!(sorted.table.get(0, "a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_null_key_tuples_group_together() {
        let t = Table::from_rows(
            &["id", "n", "v"],
            vec![
                vec![Value::Null, "a".into(), 1.into()],
                vec![Value::Null, "b".into(), 2.into()],
            ],
        )
        .unwrap();
        let out = pivot_wider(&t, &WiderOptions::new(["n"], ["v"])).unwrap();
        assert_eq!(out.table.n_rows(), 1);
        assert_eq!(out.collisions(), None);
    }

    #[test]
    fn test_grouping_determinism() {
        let t = rates();
        let shuffled = t.take_rows(&[1, 0, 3, 2]);
        let opts = WiderOptions::new(["measure"], ["rate"]).id_cols(["org"]);
        let a = pivot_wider(&t, &opts).unwrap().into_table();
        let b = pivot_wider(&shuffled, &opts.clone().names_sort(true)).unwrap().into_table();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_and_conflicting_columns() {
        let t = rates();
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(["nope"], ["rate"])),
            Err(ReshapeError::UnknownColumn(c)) if c == "nope"
        ));
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"]).id_cols(["org", "ghost"])),
            Err(ReshapeError::UnknownColumn(_))
        ));
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(["measure"], ["measure"])),
            Err(ReshapeError::ConflictingArguments(_))
        ));
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"]).id_cols(["rate"])),
            Err(ReshapeError::ConflictingArguments(_))
        ));
        let none: Vec<String> = Vec::new();
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(none, ["rate"])),
            Err(ReshapeError::ConflictingArguments(_))
        ));
    }

    #[test]
    fn test_generated_name_clashes_with_id() {
        let t = Table::from_rows(
            &["org", "measure", "rate"],
            vec![vec!["A".into(), "org".into(), 1.into()]],
        )
        .unwrap();
        assert!(matches!(
            pivot_wider(&t, &WiderOptions::new(["measure"], ["rate"])),
            Err(ReshapeError::DuplicateColumn(c)) if c == "org"
        ));
    }

    #[test]
    fn test_round_trip_with_longer() {
        let t = Table::from_rows(
            &["id", "wk1", "wk2"],
            vec![
                vec![1.into(), 5.into(), Value::Null],
                vec![2.into(), 3.into(), 4.into()],
            ],
        )
        .unwrap();
        let long = pivot_longer(&t, &LongerOptions::new(["wk1", "wk2"]).names_to(["n"]).values_to("v"))
            .unwrap()
            .into_table();
        let back = pivot_wider(&long, &WiderOptions::new(["n"], ["v"]).id_cols(["id"]))
            .unwrap()
            .into_table();
        assert_eq!(back, t);
    }
}
