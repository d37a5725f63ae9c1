//! Binding function evaluation
//!
//! All functions are pure: given the same variable lookup they always
//! produce the same value. Null-handling differs per function and is
//! load-bearing for compatibility with existing mapping files:
//! `template` treats null as fatal (a null inside an identity IRI would
//! silently mint a malformed identifier), `concat` treats null as the
//! empty string, and `xsd:*` casts propagate null so sparse typed
//! columns still get optional-object semantics.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

use super::row::Value;
use super::EvalError;
use crate::mapping::{template_vars, Arg, FunctionCall, XsdDatatype};

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").unwrap());
static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?INF|NaN|[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?)$").unwrap()
});

/// Check a value against an XSD lexical grammar
pub fn validate_lexical(datatype: XsdDatatype, value: &str) -> bool {
    match datatype {
        XsdDatatype::String => true,
        XsdDatatype::Integer => INTEGER_RE.is_match(value),
        XsdDatatype::Decimal => DECIMAL_RE.is_match(value),
        XsdDatatype::Float | XsdDatatype::Double => FLOAT_RE.is_match(value),
        XsdDatatype::Boolean => matches!(value, "true" | "false" | "1" | "0"),
        XsdDatatype::Date => parse_date(value),
        XsdDatatype::DateTime => parse_date_time(value),
    }
}

fn parse_date(value: &str) -> bool {
    // xsd:date allows an optional timezone suffix (Z or +hh:mm / -hh:mm)
    let stripped = if let Some(s) = value.strip_suffix('Z') {
        s
    } else if value.len() == 16 && matches!(value.as_bytes()[10], b'+' | b'-') {
        &value[..10]
    } else {
        value
    };
    NaiveDate::parse_from_str(stripped, "%Y-%m-%d").is_ok()
}

fn parse_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Evaluate one function call against a variable lookup.
///
/// `lookup` returns `None` for absent variables and `Some(&Value::Null)`
/// for variables bound to null.
pub fn evaluate_call<'a, F>(call: &FunctionCall, lookup: F) -> Result<Value, EvalError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    match call {
        FunctionCall::Template { pattern } => {
            let mut result = pattern.clone();
            for var in template_vars(pattern) {
                let value = lookup(var)
                    .and_then(Value::lexical)
                    .ok_or_else(|| EvalError::UnboundVariable {
                        var: var.to_string(),
                        context: format!("template(\"{}\")", pattern),
                    })?;
                result = result.replace(&format!("{{{}}}", var), value);
            }
            Ok(Value::Iri(result))
        }

        FunctionCall::StrDt { value, datatype } => {
            let lexical = arg_lexical(value, &lookup).ok_or_else(|| EvalError::UnboundVariable {
                var: value.as_var().unwrap_or_default().to_string(),
                context: format!("StrDt(_, <{}>)", datatype),
            })?;
            // validate only datatypes the engine knows; foreign
            // datatype IRIs are the target store's problem
            if let Some(known) = XsdDatatype::from_iri(datatype) {
                if !validate_lexical(known, &lexical) {
                    return Err(EvalError::InvalidLexicalForm {
                        value: lexical,
                        expected: known.local_name().to_string(),
                    });
                }
            }
            Ok(Value::Typed {
                lexical,
                datatype: datatype.clone(),
            })
        }

        FunctionCall::XsdCast { datatype, value } => {
            let lexical = match value {
                Arg::Var(var) => match lookup(var) {
                    None => {
                        return Err(EvalError::UnboundVariable {
                            var: var.clone(),
                            context: format!("xsd:{}(?{})", datatype.local_name(), var),
                        })
                    }
                    Some(Value::Null) => return Ok(Value::Null),
                    Some(v) => v.lexical().unwrap_or_default().to_string(),
                },
                Arg::Str(s) => s.clone(),
                Arg::Iri(iri) => iri.clone(),
            };
            if !validate_lexical(*datatype, &lexical) {
                return Err(EvalError::InvalidLexicalForm {
                    value: lexical,
                    expected: datatype.local_name().to_string(),
                });
            }
            Ok(Value::Typed {
                lexical,
                datatype: datatype.iri(),
            })
        }

        FunctionCall::Concat { args } => {
            let mut result = String::new();
            for arg in args {
                match arg {
                    // null and absent both become the empty string
                    Arg::Var(var) => {
                        if let Some(s) = lookup(var).and_then(Value::lexical) {
                            result.push_str(s);
                        }
                    }
                    Arg::Str(s) => result.push_str(s),
                    Arg::Iri(iri) => result.push_str(iri),
                }
            }
            Ok(Value::String(result))
        }
    }
}

fn arg_lexical<'a, F>(arg: &Arg, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    match arg {
        Arg::Var(var) => lookup(var).and_then(Value::lexical).map(str::to_string),
        Arg::Str(s) => Some(s.clone()),
        Arg::Iri(iri) => Some(iri.clone()),
    }
}
