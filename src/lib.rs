//! rdfmap — declarative source-to-RDF mapping engine
//!
//! Compiles mapping files (`PREFIX` declarations plus
//! `MAPPING ... FROM {SQL|JSON} ... TO ... WHERE ...` blocks) and
//! applies them to source rows to produce RDF triples.
//!
//! # Architecture
//!
//! - [`parser`] — pest grammar and parser for the mapping language
//! - [`mapping`] — rule model, prefix handling, binding DAG resolution,
//!   canonical re-serialization
//! - [`source`] — boundary readers: JSON shape templates with
//!   nested-array fan-out, and the SQL result-set adapter
//! - [`eval`] — per-row binding evaluation (`template`, `StrDt`,
//!   `xsd:*` casts, `concat`) with scope-aware fan-out placement
//! - [`generate`] — triple instantiation with null-object skipping and
//!   per-row deduplication
//! - [`pipeline`] — sequential, rayon-parallel, and async batch drivers
//!   with per-row error reporting
//! - [`rdf`] — thin IRI/literal/triple layer over `oxrdf`
//!
//! # Example
//!
//! ```no_run
//! use rdfmap::{parse_mapping, apply_rule, Row, Value};
//!
//! let rules = parse_mapping(r#"
//! PREFIX : <http://example.org/>
//! MAPPING
//! FROM SQL { SELECT id, name FROM People }
//! TO { ?person :name ?name . }
//! WHERE { BIND(template("http://example.org/person/{id}") AS ?person) }
//! "#)?;
//! let rule = rules.into_iter().next().unwrap().resolve()?;
//!
//! let mut row = Row::new();
//! row.set("id", Value::String("1".into()));
//! row.set("name", Value::String("Ada".into()));
//! for triple in apply_rule(&rule, row)? {
//!     println!("{}", triple);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod eval;
pub mod generate;
pub mod mapping;
pub mod parser;
pub mod pipeline;
pub mod rdf;
pub mod source;

pub use eval::{evaluate_bindings, EvalError, Row, Value};
pub use generate::{apply_rule, generate_triples};
pub use mapping::{
    serialize_mappings, Arg, BindingExpr, CompiledRule, FunctionCall, MappingRule, ObjectPattern,
    PrefixMap, RuleError, SourceSpec, TermPattern, TriplePattern, XsdDatatype,
};
pub use parser::{parse_mapping, ParseError};
pub use pipeline::{
    evaluate_rows, par_evaluate_rows, spawn_evaluator, EngineConfig, EvalReport, EvaluatorHandle,
    RowError,
};
pub use rdf::{Literal, NamedNode, RdfObject, Triple};
pub use source::{ShapeError, ShapeTemplate, SqlResultReader};

/// Crate version, from the build manifest
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
