//! Triple generation
//!
//! Substitutes an evaluated row into a rule's graph template. Null
//! objects skip their pattern (sparse-column semantics); null subjects
//! or predicates fail the row. Each pattern is emitted once per element
//! of its fan-out scope, ancestors held constant, so nested arrays
//! multiply and siblings never cross-join.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::eval::{evaluate_bindings, EvalError, Row, Value};
use crate::mapping::{CompiledRule, ObjectPattern, TermPattern, TriplePattern};
use crate::rdf::{Literal, NamedNode, RdfObject, Triple};

/// Evaluate bindings and generate all triples for one source row.
pub fn apply_rule(rule: &CompiledRule, mut row: Row) -> Result<Vec<Triple>, EvalError> {
    evaluate_bindings(rule, &mut row)?;
    generate_triples(rule, &row)
}

/// Generate triples from an already-evaluated row.
///
/// Output is deduplicated and ordered by template position, so the same
/// row always yields the same triples in the same order.
pub fn generate_triples(rule: &CompiledRule, row: &Row) -> Result<Vec<Triple>, EvalError> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let empty = IndexMap::new();
    for (pattern, path) in rule.patterns() {
        emit_pattern(pattern, path, row, &empty, &mut |triple| {
            if seen.insert(triple.clone()) {
                out.push(triple);
            }
        })?;
    }
    Ok(out)
}

/// Emit one pattern at its fan-out scope.
fn emit_pattern(
    pattern: &TriplePattern,
    path: &[String],
    row: &Row,
    env: &IndexMap<String, Value>,
    sink: &mut impl FnMut(Triple),
) -> Result<(), EvalError> {
    if let Some((scope, rest)) = path.split_first() {
        let merged: IndexMap<String, Value> = env
            .iter()
            .chain(row.vars.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(elements) = row.groups.get(scope) {
            for element in elements {
                emit_pattern(pattern, rest, element, &merged, sink)?;
            }
        }
        return Ok(());
    }

    let lookup = |v: &str| row.vars.get(v).or_else(|| env.get(v));
    if let Some(triple) = build_triple(pattern, lookup)? {
        sink(triple);
    }
    Ok(())
}

/// Instantiate one pattern against a flat lookup.
///
/// Returns `Ok(None)` when the object is null (pattern skipped).
fn build_triple<'a, F>(pattern: &TriplePattern, lookup: F) -> Result<Option<Triple>, EvalError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    // subject/predicate first: a structural failure is never masked by
    // an optional (null) object
    let subject = required_iri(&pattern.subject, &lookup, "subject")?;
    let predicate = required_iri(&pattern.predicate, &lookup, "predicate")?;

    let object = match &pattern.object {
        ObjectPattern::Iri(iri) => iri_term(iri)?.into(),
        ObjectPattern::Literal { value, datatype } => match datatype {
            Some(dt) => Literal::new_typed_literal(value.clone(), iri_term(dt)?).into(),
            None => Literal::new_simple_literal(value.clone()).into(),
        },
        ObjectPattern::Var(var) => match lookup(var) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Iri(iri)) => iri_term(iri)?.into(),
            Some(Value::String(s)) => Literal::new_simple_literal(s.clone()).into(),
            Some(Value::Typed { lexical, datatype }) => {
                Literal::new_typed_literal(lexical.clone(), iri_term(datatype)?).into()
            }
        },
    };

    Ok(Some(Triple::new(subject, predicate, object)))
}

/// Resolve a subject or predicate position, where null is a hard failure.
fn required_iri<'a, F>(
    term: &TermPattern,
    lookup: &F,
    position: &str,
) -> Result<NamedNode, EvalError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    match term {
        TermPattern::Iri(iri) => iri_term(iri),
        TermPattern::Var(var) => match lookup(var).and_then(Value::lexical) {
            Some(iri) => iri_term(iri),
            None => Err(EvalError::UnboundVariable {
                var: var.clone(),
                context: format!("{} position", position),
            }),
        },
    }
}

fn iri_term(iri: &str) -> Result<NamedNode, EvalError> {
    NamedNode::new(iri).map_err(|e| EvalError::InvalidIri(e.to_string()))
}
