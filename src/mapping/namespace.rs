//! Prefix management for mapping files
//!
//! `PREFIX` declarations give compact names to IRI namespaces; every
//! prefixed name in a `TO` or `WHERE` block is expanded against this
//! table at parse time.

use indexmap::IndexMap;
use thiserror::Error;

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid compact IRI
    #[error("Invalid compact IRI: {0}")]
    InvalidCompactIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// Prefix → namespace IRI table
///
/// Insertion order is preserved so re-serialized mapping files keep
/// their declarations in the order the author wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    prefixes: IndexMap<String, String>,
}

impl PrefixMap {
    /// Create an empty prefix map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prefix map seeded with the standard rdf/rdfs/xsd prefixes
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        map.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        map.insert("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        map.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        map
    }

    /// Add a prefix; the empty string is the default prefix (`:name`)
    pub fn insert(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get the namespace IRI for a prefix
    pub fn get(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (`prefix:local`) to a full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        let pos = compact_iri
            .find(':')
            .ok_or_else(|| PrefixError::InvalidCompactIri(compact_iri.to_string()))?;
        let prefix = &compact_iri[..pos];
        let local = &compact_iri[pos + 1..];
        let iri = self.get(prefix)?;
        Ok(format!("{}{}", iri, local))
    }

    /// Iterate declared prefixes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, i)| (p.as_str(), i.as_str()))
    }

    /// Number of declared prefixes
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether the map has no declarations
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
