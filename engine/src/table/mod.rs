//! In-memory table model shared by both reshapers.
//!
//! - [`Value`] - A single cell (null, bool, int, float, string, or list)
//! - [`Kind`] - The primitive kind of a column
//! - [`Column`] - A named, homogeneously typed sequence of cells
//! - [`Table`] - An ordered set of uniquely named columns of equal length
//!
//! Tables are immutable once built: reshaping always produces a new table.

mod column;
mod value;

pub use column::Column;
pub use value::{Kind, Value};

use serde::Serialize;
use std::collections::HashSet;

use crate::error::{ReshapeError, ReshapeResult};

/// An ordered sequence of named columns with a common row count.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table from columns.
    ///
    /// Fails if two columns share a name or if column lengths differ.
    pub fn new(columns: Vec<Column>) -> ReshapeResult<Self> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name()) {
                return Err(ReshapeError::DuplicateColumn(col.name().to_string()));
            }
        }

        let rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(ReshapeError::RaggedTable {
                column: bad.name().to_string(),
                expected: rows,
                found: bad.len(),
            });
        }

        Ok(Self { columns, rows })
    }

    /// Builds a table from row tuples, inferring each column's kind.
    ///
    /// # Example
    /// ```
    /// use tidyshape::{Table, Value};
    ///
    /// let table = Table::from_rows(
    ///     &["id", "wk1"],
    ///     vec![vec![1.into(), 5.into()], vec![2.into(), Value::Null]],
    /// ).unwrap();
    ///
    /// assert_eq!(table.n_rows(), 2);
    /// assert_eq!(table.column_names(), vec!["id", "wk1"]);
    /// ```
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Value>>) -> ReshapeResult<Self> {
        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(ReshapeError::RaggedTable {
                    column: format!("<row {}>", i),
                    expected: names.len(),
                    found: row.len(),
                });
            }
            for (slot, value) in cells.iter_mut().zip(row) {
                slot.push(value);
            }
        }

        let columns = names
            .iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name.as_ref(), values))
            .collect::<ReshapeResult<Vec<_>>>()?;

        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Position of `name`, or [`ReshapeError::UnknownColumn`].
    pub fn require(&self, name: &str) -> ReshapeResult<usize> {
        self.column_index(name)
            .ok_or_else(|| ReshapeError::UnknownColumn(name.to_string()))
    }

    /// Positions of every name in `names`, in the order given.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> ReshapeResult<Vec<usize>> {
        names.iter().map(|n| self.require(n.as_ref())).collect()
    }

    /// Cell at (`row`, column `name`).
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Cells of one row, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<&Value>> {
        if row >= self.rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values()[row]).collect())
    }

    /// Iterates rows as owned tuples.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.rows).map(move |r| self.columns.iter().map(|c| c.values()[r].clone()).collect())
    }

    /// New table with the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> ReshapeResult<Table> {
        let columns = self
            .resolve(names)?
            .into_iter()
            .map(|i| self.columns[i].clone())
            .collect();
        Table::new(columns)
    }

    /// New table with the rows at `rows`, in that order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            rows: rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            &["id", "wk1", "wk2"],
            vec![
                vec![1.into(), 5.into(), Value::Null],
                vec![2.into(), 3.into(), 4.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows() {
        let t = sample();
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.n_cols(), 3);
        assert_eq!(t.get(1, "wk2"), Some(&Value::Int(4)));
        assert_eq!(t.column("wk2").unwrap().kind(), Kind::Int);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Table::from_rows(&["a", "a"], vec![vec![1.into(), 2.into()]]).unwrap_err();
        assert!(matches!(err, ReshapeError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn test_ragged_rejected() {
        let a = Column::new("a", vec![Value::from(1)]).unwrap();
        let b = Column::new("b", vec![Value::from(1), Value::from(2)]).unwrap();
        assert!(matches!(
            Table::new(vec![a, b]),
            Err(ReshapeError::RaggedTable { expected: 1, found: 2, .. })
        ));

        let err = Table::from_rows(&["a", "b"], vec![vec![1.into()]]).unwrap_err();
        assert!(matches!(err, ReshapeError::RaggedTable { .. }));
    }

    #[test]
    fn test_require_unknown_column() {
        let t = sample();
        assert_eq!(t.require("wk1").unwrap(), 1);
        assert!(matches!(t.require("wk3"), Err(ReshapeError::UnknownColumn(c)) if c == "wk3"));
        assert!(t.resolve(&["id", "nope"]).is_err());
    }

    #[test]
    fn test_select_and_take_rows() {
        let t = sample();
        let s = t.select(&["wk2", "id"]).unwrap();
        assert_eq!(s.column_names(), vec!["wk2", "id"]);

        let r = t.take_rows(&[1]);
        assert_eq!(r.n_rows(), 1);
        assert_eq!(r.row(0).unwrap(), vec![&Value::Int(2), &Value::Int(3), &Value::Int(4)]);
        assert!(r.row(1).is_none());
    }

    #[test]
    fn test_rows_iterator() {
        let rows: Vec<Vec<Value>> = sample().rows().collect();
        assert_eq!(rows[0], vec![Value::Int(1), Value::Int(5), Value::Null]);
    }
}
