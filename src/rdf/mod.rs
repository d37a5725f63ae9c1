//! RDF term support for the mapping engine
//!
//! The generator emits ground triples only: IRI subjects/predicates and
//! IRI-or-literal objects. Blank nodes and named graphs are left to the
//! target store.

mod types;

pub use types::{Literal, NamedNode, RdfError, RdfObject, RdfResult, Triple};

/// Well-known vocabulary IRIs used during generation.
pub mod vocab {
    /// `rdf:type`, the expansion of the `a` keyword
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    /// XSD namespace for datatype IRIs
    pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
}
