//! Mapping rule model
//!
//! Parsed representation of mapping files: prefix declarations, rule
//! blocks, triple templates, and binding expressions, plus rule
//! resolution (binding DAG ordering and variable validation) and
//! re-serialization back to mapping text.

mod binding;
mod namespace;
mod rule;
mod serializer;

pub use binding::{template_vars, Arg, BindingExpr, FunctionCall, XsdDatatype};
pub use namespace::{PrefixError, PrefixMap, PrefixResult};
pub use rule::{
    CompiledRule, MappingRule, ObjectPattern, RuleError, RuleResult, SourceSpec, TermPattern,
    TriplePattern,
};
pub use serializer::serialize_mappings;
