//! Row and value model
//!
//! A `Row` is everything the engine knows about one source record:
//! scalar variable bindings plus fan-out groups for array-valued JSON
//! fields. Groups nest, forming a scope tree; element rows inherit
//! their ancestors' bindings during evaluation. Rows are materialized
//! once per record, consumed by binding evaluation and generation, and
//! discarded.

use indexmap::IndexMap;

/// A bound value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Missing or null source field
    Null,
    /// Plain string value (becomes a plain literal in object position)
    String(String),
    /// IRI value, produced by `template(...)`
    Iri(String),
    /// Typed literal value, produced by `StrDt` or an `xsd:*` cast
    Typed {
        /// Lexical form
        lexical: String,
        /// Datatype IRI
        datatype: String,
    },
}

impl Value {
    /// Whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The string form used for template interpolation and concat
    pub fn lexical(&self) -> Option<&str> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Iri(iri) => Some(iri),
            Value::Typed { lexical, .. } => Some(lexical),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => Value::String(s),
            None => Value::Null,
        }
    }
}

/// One source record's bindings, with nested fan-out groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Scalar bindings at this scope
    pub vars: IndexMap<String, Value>,
    /// Fan-out groups: scope name → one row per array element
    pub groups: IndexMap<String, Vec<Row>>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable at this scope
    pub fn set(&mut self, var: impl Into<String>, value: Value) {
        self.vars.insert(var.into(), value);
    }

    /// Look up a variable at this scope only (no group descent)
    pub fn get(&self, var: &str) -> Option<&Value> {
        self.vars.get(var)
    }

    /// Add a fan-out group
    pub fn add_group(&mut self, scope: impl Into<String>, rows: Vec<Row>) {
        self.groups.insert(scope.into(), rows);
    }

    /// Whether any scope in this row's tree binds `var`
    pub fn binds_anywhere(&self, var: &str) -> bool {
        self.vars.contains_key(var)
            || self
                .groups
                .values()
                .flatten()
                .any(|row| row.binds_anywhere(var))
    }
}
