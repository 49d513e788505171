//! Named, homogeneously typed columns.

use serde::Serialize;

use super::value::{Kind, Value};
use crate::error::{ReshapeError, ReshapeResult};

/// A named sequence of cells sharing one primitive kind.
///
/// Null cells are allowed in a column of any kind. A column mixing Int and
/// Float cells is stored as Float.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    name: String,
    kind: Kind,
    values: Vec<Value>,
}

impl Column {
    /// Builds a column, inferring its kind from the cells.
    ///
    /// Fails with [`ReshapeError::IncompatibleTypes`] when two cells have
    /// kinds that cannot share a column.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> ReshapeResult<Self> {
        let name = name.into();
        let kind = infer_kind(&name, &values)?;
        Ok(Self::from_parts(name, kind, values))
    }

    /// Builds a column of a declared kind.
    ///
    /// Every non-null cell must unify with `kind`.
    pub fn with_kind(name: impl Into<String>, kind: Kind, values: Vec<Value>) -> ReshapeResult<Self> {
        let name = name.into();
        let inferred = infer_kind(&name, &values)?;
        let kind = kind.unify(inferred).ok_or_else(|| ReshapeError::IncompatibleTypes {
            column: name.clone(),
            left: kind,
            right: inferred,
        })?;
        Ok(Self::from_parts(name, kind, values))
    }

    /// Assembles a column whose kind is already known to be correct.
    pub(crate) fn from_parts(name: String, kind: Kind, values: Vec<Value>) -> Self {
        let values = if kind == Kind::Float {
            values.into_iter().map(|v| v.widen_to(Kind::Float)).collect()
        } else {
            values
        };
        Self { name, kind, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// New column with the cells at `rows`, in that order.
    pub(crate) fn take(&self, rows: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            kind: self.kind,
            values: rows.iter().map(|&r| self.values[r].clone()).collect(),
        }
    }
}

fn infer_kind(name: &str, values: &[Value]) -> ReshapeResult<Kind> {
    values.iter().try_fold(Kind::Null, |acc, v| {
        acc.unify(v.kind()).ok_or_else(|| ReshapeError::IncompatibleTypes {
            column: name.to_string(),
            left: acc,
            right: v.kind(),
        })
    })
}
