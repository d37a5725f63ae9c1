//! SQL result-set boundary
//!
//! The engine never executes SQL: the `FROM SQL { ... }` body is passed
//! verbatim to whatever relational driver feeds the pipeline. This
//! module is the seam where an already-executed result set becomes
//! engine rows.

use crate::eval::{Row, Value};

/// Adapter from a relational result set to engine rows
#[derive(Debug, Clone)]
pub struct SqlResultReader {
    columns: Vec<String>,
}

impl SqlResultReader {
    /// Create a reader for a result set with the given column names
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Column names, in result-set order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Convert one result row (nullable strings, column order) to a `Row`.
    ///
    /// Extra values beyond the column count are dropped; missing values
    /// leave their columns unbound, which row evaluation treats the
    /// same as an absent variable.
    pub fn row<V>(&self, values: V) -> Row
    where
        V: IntoIterator<Item = Option<String>>,
    {
        let mut row = Row::new();
        for (name, value) in self.columns.iter().zip(values) {
            row.set(name.clone(), Value::from(value));
        }
        row
    }
}
