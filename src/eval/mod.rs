//! Row evaluation
//!
//! Evaluates a resolved rule's bindings against one row. Bindings run
//! in dependency order; each one carries the fan-out scope path fixed
//! at rule resolution and is evaluated once per element row of that
//! scope, so derived variables over array elements are themselves
//! array-scoped.

mod functions;
mod row;

pub use functions::{evaluate_call, validate_lexical};
pub use row::{Row, Value};

use indexmap::IndexMap;
use thiserror::Error;

use crate::mapping::{BindingExpr, CompiledRule};

/// Row evaluation errors
///
/// All of these are fatal for the row they occur on and recoverable for
/// the batch: the pipeline records them and moves on to the next row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A structurally required variable was absent or null
    #[error("Unbound variable ?{var} in {context}")]
    UnboundVariable {
        /// The missing variable
        var: String,
        /// Where it was needed
        context: String,
    },

    /// A typed value failed its datatype's lexical grammar
    #[error("Invalid lexical form for xsd:{expected}: \"{value}\"")]
    InvalidLexicalForm {
        /// The offending raw value
        value: String,
        /// The expected datatype's local name
        expected: String,
    },

    /// A template or binding produced a malformed IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// A binding target was already bound by the source row
    #[error("Binding target ?{0} collides with a row-bound variable")]
    VariableCollision(String),
}

/// Evaluate all of a rule's bindings into `row`, in dependency order.
pub fn evaluate_bindings(rule: &CompiledRule, row: &mut Row) -> Result<(), EvalError> {
    let empty = IndexMap::new();
    for (binding, path) in rule.ordered_bindings() {
        apply_binding(binding, path, row, &empty)?;
    }
    Ok(())
}

/// Evaluate one binding at its scope.
///
/// `env` carries ancestor-scope bindings (owned clones: rows are
/// transient and values are small). A non-empty path descends into the
/// named group, evaluating once per element row; a group absent from
/// the data has zero element rows and the binding is a no-op.
fn apply_binding(
    binding: &BindingExpr,
    path: &[String],
    row: &mut Row,
    env: &IndexMap<String, Value>,
) -> Result<(), EvalError> {
    if let Some((scope, rest)) = path.split_first() {
        let merged: IndexMap<String, Value> = env
            .iter()
            .chain(row.vars.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(elements) = row.groups.get_mut(scope) {
            for element in elements {
                apply_binding(binding, rest, element, &merged)?;
            }
        }
        return Ok(());
    }

    // absent inputs are left to the function's own null/absence policy
    // (concat tolerates them, template does not)
    if row.vars.contains_key(&binding.var) || env.contains_key(&binding.var) {
        return Err(EvalError::VariableCollision(binding.var.clone()));
    }
    let value = evaluate_call(&binding.expr, |v| row.vars.get(v).or_else(|| env.get(v)))?;
    row.set(binding.var.clone(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Arg, FunctionCall, MappingRule, PrefixMap, SourceSpec};
    use crate::source::ShapeTemplate;

    fn compile_sql(bindings: Vec<BindingExpr>) -> CompiledRule {
        MappingRule {
            name: None,
            prefixes: PrefixMap::with_defaults(),
            source: SourceSpec::Sql {
                query: "SELECT 1".to_string(),
            },
            graph_template: vec![],
            bindings,
        }
        .resolve()
        .unwrap()
    }

    fn compile_json(template: serde_json::Value, bindings: Vec<BindingExpr>) -> CompiledRule {
        MappingRule {
            name: None,
            prefixes: PrefixMap::with_defaults(),
            source: SourceSpec::Json {
                shape: ShapeTemplate::compile(&template).unwrap(),
            },
            graph_template: vec![],
            bindings,
        }
        .resolve()
        .unwrap()
    }

    #[test]
    fn test_chained_bindings() {
        let rule = compile_sql(vec![
            BindingExpr {
                var: "child".into(),
                expr: FunctionCall::Template {
                    pattern: "{base}/child".into(),
                },
            },
            BindingExpr {
                var: "base".into(),
                expr: FunctionCall::Template {
                    pattern: "http://example.org/{id}".into(),
                },
            },
        ]);

        let mut row = Row::new();
        row.set("id", Value::String("1".into()));
        evaluate_bindings(&rule, &mut row).unwrap();

        assert_eq!(
            row.get("child"),
            Some(&Value::Iri("http://example.org/1/child".into()))
        );
    }

    #[test]
    fn test_array_scoped_binding() {
        let rule = compile_json(
            serde_json::json!({
                "hash": "?hash",
                "txIndexes": ["?txIndex"]
            }),
            vec![BindingExpr {
                var: "tx".into(),
                expr: FunctionCall::Template {
                    pattern: "http://api.stardog.com/tx#{txIndex}".into(),
                },
            }],
        );

        let mut e1 = Row::new();
        e1.set("txIndex", Value::String("5".into()));
        let mut e2 = Row::new();
        e2.set("txIndex", Value::String("6".into()));

        let mut row = Row::new();
        row.set("hash", Value::String("abc".into()));
        row.add_group("txIndexes", vec![e1, e2]);

        evaluate_bindings(&rule, &mut row).unwrap();

        // the derived ?tx lives in the element rows, not the root
        assert_eq!(row.get("tx"), None);
        let group = row.groups.get("txIndexes").unwrap();
        assert_eq!(
            group[0].get("tx"),
            Some(&Value::Iri("http://api.stardog.com/tx#5".into()))
        );
        assert_eq!(
            group[1].get("tx"),
            Some(&Value::Iri("http://api.stardog.com/tx#6".into()))
        );
    }

    #[test]
    fn test_empty_group_is_a_no_op() {
        let rule = compile_json(
            serde_json::json!({
                "hash": "?hash",
                "txIndexes": ["?txIndex"]
            }),
            vec![BindingExpr {
                var: "tx".into(),
                expr: FunctionCall::Template {
                    pattern: "http://api.stardog.com/tx#{txIndex}".into(),
                },
            }],
        );

        let mut row = Row::new();
        row.set("hash", Value::String("abc".into()));
        row.add_group("txIndexes", vec![]);

        evaluate_bindings(&rule, &mut row).unwrap();
        assert_eq!(row.get("tx"), None);
    }

    #[test]
    fn test_binding_mixing_root_and_scope() {
        // ancestor values stay visible inside the scope
        let rule = compile_json(
            serde_json::json!({
                "hash": "?hash",
                "txIndexes": ["?txIndex"]
            }),
            vec![BindingExpr {
                var: "link".into(),
                expr: FunctionCall::Concat {
                    args: vec![
                        Arg::Var("hash".into()),
                        Arg::Str("/".into()),
                        Arg::Var("txIndex".into()),
                    ],
                },
            }],
        );

        let mut element = Row::new();
        element.set("txIndex", Value::String("5".into()));
        let mut row = Row::new();
        row.set("hash", Value::String("abc".into()));
        row.add_group("txIndexes", vec![element]);

        evaluate_bindings(&rule, &mut row).unwrap();
        let group = row.groups.get("txIndexes").unwrap();
        assert_eq!(group[0].get("link"), Some(&Value::String("abc/5".into())));
    }

    #[test]
    fn test_runtime_collision_with_sql_column() {
        // resolve() cannot see SQL columns, so the collision surfaces
        // at row evaluation
        let rule = compile_sql(vec![BindingExpr {
            var: "id".into(),
            expr: FunctionCall::Template {
                pattern: "http://example.org/{name}".into(),
            },
        }]);

        let mut row = Row::new();
        row.set("id", Value::String("1".into()));
        row.set("name", Value::String("x".into()));

        assert!(matches!(
            evaluate_bindings(&rule, &mut row),
            Err(EvalError::VariableCollision(v)) if v == "id"
        ));
    }
}
