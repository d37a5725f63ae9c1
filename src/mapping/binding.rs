//! Binding expressions
//!
//! A `WHERE` block is a sequence of `BIND(expr AS ?var)` statements.
//! Bindings may reference the outputs of other bindings, so together
//! they form an expression DAG that is topologically ordered at rule
//! resolution time, not evaluated in textual order.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::serializer::QuotedStr;
use crate::rdf::vocab::XSD_NS;

/// A function argument: a variable reference or a constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arg {
    /// `?name`
    Var(String),
    /// `"literal"`
    Str(String),
    /// `<iri>` or an expanded prefixed name
    Iri(String),
}

impl Arg {
    /// The referenced variable name, if this argument is one
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Arg::Var(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Var(v) => write!(f, "?{}", v),
            Arg::Str(s) => write!(f, "{}", QuotedStr(s)),
            Arg::Iri(iri) => write!(f, "<{}>", iri),
        }
    }
}

/// XSD datatypes with engine-side lexical validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XsdDatatype {
    String,
    Integer,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    DateTime,
}

impl XsdDatatype {
    /// Parse the local name of an `xsd:` datatype
    pub fn from_local(name: &str) -> Option<Self> {
        match name {
            "string" => Some(XsdDatatype::String),
            "integer" => Some(XsdDatatype::Integer),
            "decimal" => Some(XsdDatatype::Decimal),
            "float" => Some(XsdDatatype::Float),
            "double" => Some(XsdDatatype::Double),
            "boolean" => Some(XsdDatatype::Boolean),
            "date" => Some(XsdDatatype::Date),
            "dateTime" => Some(XsdDatatype::DateTime),
            _ => None,
        }
    }

    /// Recognize a full datatype IRI in the XSD namespace
    pub fn from_iri(iri: &str) -> Option<Self> {
        iri.strip_prefix(XSD_NS).and_then(Self::from_local)
    }

    /// The local name within the XSD namespace
    pub fn local_name(&self) -> &'static str {
        match self {
            XsdDatatype::String => "string",
            XsdDatatype::Integer => "integer",
            XsdDatatype::Decimal => "decimal",
            XsdDatatype::Float => "float",
            XsdDatatype::Double => "double",
            XsdDatatype::Boolean => "boolean",
            XsdDatatype::Date => "date",
            XsdDatatype::DateTime => "dateTime",
        }
    }

    /// The full datatype IRI
    pub fn iri(&self) -> String {
        format!("{}{}", XSD_NS, self.local_name())
    }
}

/// A function call on the right-hand side of a `BIND`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionCall {
    /// `template("http://example.org/Album{id}")` — IRI interpolation
    Template {
        /// Pattern with `{var}` placeholders
        pattern: String,
    },

    /// `StrDt(?value, xsd:integer)` — tag a value with a datatype
    StrDt {
        /// The value to tag
        value: Arg,
        /// Expanded datatype IRI
        datatype: String,
    },

    /// `xsd:integer(?value)` and friends — validating cast
    XsdCast {
        /// Target datatype
        datatype: XsdDatatype,
        /// The value to cast
        value: Arg,
    },

    /// `concat(?a, "-", ?b)` — string concatenation
    Concat {
        /// Arguments in order
        args: Vec<Arg>,
    },
}

impl FunctionCall {
    /// Variables this expression reads, in first-occurrence order
    pub fn referenced_vars(&self) -> Vec<&str> {
        match self {
            FunctionCall::Template { pattern } => template_vars(pattern),
            FunctionCall::StrDt { value, .. } | FunctionCall::XsdCast { value, .. } => {
                value.as_var().into_iter().collect()
            }
            FunctionCall::Concat { args } => {
                let mut vars = Vec::new();
                for arg in args {
                    if let Some(v) = arg.as_var() {
                        if !vars.contains(&v) {
                            vars.push(v);
                        }
                    }
                }
                vars
            }
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionCall::Template { pattern } => {
                write!(f, "template({})", QuotedStr(pattern))
            }
            FunctionCall::StrDt { value, datatype } => {
                write!(f, "StrDt({}, <{}>)", value, datatype)
            }
            FunctionCall::XsdCast { datatype, value } => {
                write!(f, "xsd:{}({})", datatype.local_name(), value)
            }
            FunctionCall::Concat { args } => {
                write!(f, "concat(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// `BIND(expr AS ?var)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingExpr {
    /// Target variable name (without the `?`)
    pub var: String,
    /// The expression producing its value
    pub expr: FunctionCall,
}

impl fmt::Display for BindingExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BIND({} AS ?{})", self.expr, self.var)
    }
}

/// Extract `{var}` placeholder names from a template pattern, in order
/// of first occurrence.
pub fn template_vars(pattern: &str) -> Vec<&str> {
    let mut vars = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let var = &after[..close];
                if !var.is_empty() && !vars.contains(&var) {
                    vars.push(var);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    vars
}
