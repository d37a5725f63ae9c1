//! SMS mapping-file parser
//!
//! Parses `PREFIX` declarations and `MAPPING ... FROM {SQL|JSON} { ... }
//! TO { ... } WHERE { ... }` blocks into [`MappingRule`]s. Prefixed
//! names are expanded against the file's prefix declarations here, so
//! the rest of the engine only ever sees full IRIs.

use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::mapping::{
    Arg, BindingExpr, FunctionCall, MappingRule, ObjectPattern, PrefixError, PrefixMap,
    SourceSpec, TermPattern, TriplePattern, XsdDatatype,
};
use crate::rdf::vocab::RDF_TYPE;
use crate::source::{ShapeError, ShapeTemplate};

#[derive(Parser)]
#[grammar = "parser/sms.pest"]
struct SmsParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error (carries line/column of the offending construct)
    #[error("Parse error: {0}")]
    Syntax(#[from] pest::error::Error<Rule>),

    /// Unsupported function name in a BIND
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number or kind of arguments to a known function
    #[error("Invalid arguments to {function}: expected {expected}")]
    InvalidArguments {
        /// Function name as written
        function: String,
        /// What the function takes
        expected: &'static str,
    },

    /// Undeclared prefix in a prefixed name
    #[error(transparent)]
    Prefix(#[from] PrefixError),

    /// FROM JSON body is not valid JSON
    #[error("Invalid JSON source body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// FROM JSON body is valid JSON but not a valid shape template
    #[error("Invalid JSON shape template: {0}")]
    InvalidShape(#[from] ShapeError),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a mapping file into its rules.
pub fn parse_mapping(input: &str) -> ParseResult<Vec<MappingRule>> {
    let mut pairs = SmsParser::parse(Rule::mapping_file, input)?;
    let file = pairs.next().expect("grammar yields one mapping_file");

    let mut prefixes = PrefixMap::with_defaults();
    let mut rules = Vec::new();

    for pair in file.into_inner() {
        match pair.as_rule() {
            Rule::prefix_decl => {
                let mut inner = pair.into_inner();
                let pname = inner.next().expect("pname_ns");
                let iri = inner.next().expect("iriref");
                let prefix = pname.as_str().trim_end_matches(':');
                prefixes.insert(prefix, strip_angle_brackets(iri.as_str()));
            }
            Rule::mapping_block => {
                rules.push(parse_block(pair, &prefixes)?);
            }
            Rule::EOI => break,
            _ => {}
        }
    }

    Ok(rules)
}

fn parse_block(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<MappingRule> {
    let mut name = None;
    let mut source = None;
    let mut graph_template = Vec::new();
    let mut bindings = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::mapping_name => {
                let text = inner.as_str();
                name = Some(strip_angle_brackets(text).to_string());
            }
            Rule::from_clause => {
                source = Some(parse_from(inner)?);
            }
            Rule::to_clause => {
                graph_template = parse_to(inner, prefixes)?;
            }
            Rule::where_clause => {
                bindings = parse_where(inner, prefixes)?;
            }
            _ => {}
        }
    }

    Ok(MappingRule {
        name,
        prefixes: prefixes.clone(),
        // grammar requires a FROM clause, so source is always present
        source: source.expect("from_clause"),
        graph_template,
        bindings,
    })
}

fn parse_from(pair: Pair<'_>) -> ParseResult<SourceSpec> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::sql_source => {
                let body = raw_body(inner);
                return Ok(SourceSpec::Sql {
                    query: body.trim().to_string(),
                });
            }
            Rule::json_source => {
                let body = raw_body(inner);
                let json: serde_json::Value = serde_json::from_str(&body)?;
                let shape = ShapeTemplate::compile(&json)?;
                return Ok(SourceSpec::Json { shape });
            }
            _ => {}
        }
    }
    unreachable!("grammar requires SQL or JSON source")
}

/// Reassemble the raw text inside a `{ ... }` block, nested braces
/// included (the grammar captures the inner braces as separate pairs).
fn raw_body(source: Pair<'_>) -> String {
    source
        .into_inner()
        .find(|p| p.as_rule() == Rule::raw_block)
        .map(|block| {
            block
                .into_inner()
                .filter(|p| p.as_rule() == Rule::raw_content)
                .map(|p| p.as_str().to_string())
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn parse_to(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<Vec<TriplePattern>> {
    let mut patterns = Vec::new();

    for template in pair.into_inner() {
        if template.as_rule() != Rule::triples_template {
            continue;
        }
        for same_subject in template.into_inner() {
            if same_subject.as_rule() != Rule::triples_same_subject {
                continue;
            }
            let mut inner = same_subject.into_inner();
            let subject_pair = inner.next().expect("subject term");
            let subject = parse_term(subject_pair, prefixes)?;
            let po_list = inner.next().expect("predicate_object_list");

            for po in po_list.into_inner() {
                if po.as_rule() != Rule::predicate_object {
                    continue;
                }
                let mut po_inner = po.into_inner();
                let verb = po_inner.next().expect("verb");
                let predicate = parse_verb(verb, prefixes)?;
                let objects = po_inner.next().expect("object_list");

                for object in objects.into_inner() {
                    if object.as_rule() != Rule::object {
                        continue;
                    }
                    patterns.push(TriplePattern {
                        subject: subject.clone(),
                        predicate: predicate.clone(),
                        object: parse_object(object, prefixes)?,
                    });
                }
            }
        }
    }

    Ok(patterns)
}

fn parse_verb(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<TermPattern> {
    let inner = pair.into_inner().next().expect("verb content");
    match inner.as_rule() {
        Rule::a_kw => Ok(TermPattern::Iri(RDF_TYPE.to_string())),
        Rule::term => parse_term(inner, prefixes),
        _ => unreachable!("verb is a_kw or term"),
    }
}

fn parse_term(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<TermPattern> {
    let inner = pair.into_inner().next().expect("term content");
    match inner.as_rule() {
        Rule::variable => Ok(TermPattern::Var(inner.as_str()[1..].to_string())),
        Rule::iriref => Ok(TermPattern::Iri(
            strip_angle_brackets(inner.as_str()).to_string(),
        )),
        Rule::prefixed_name => Ok(TermPattern::Iri(prefixes.expand(inner.as_str())?)),
        _ => unreachable!("term is variable, iriref, or prefixed_name"),
    }
}

fn parse_object(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<ObjectPattern> {
    let inner = pair.into_inner().next().expect("object content");
    match inner.as_rule() {
        Rule::term => Ok(match parse_term(inner, prefixes)? {
            TermPattern::Var(v) => ObjectPattern::Var(v),
            TermPattern::Iri(iri) => ObjectPattern::Iri(iri),
        }),
        Rule::literal => {
            let mut parts = inner.into_inner();
            let value = unescape_string(parts.next().expect("string").as_str());
            let datatype = match parts.next() {
                Some(dt) => Some(match dt.as_rule() {
                    Rule::iriref => strip_angle_brackets(dt.as_str()).to_string(),
                    Rule::prefixed_name => prefixes.expand(dt.as_str())?,
                    _ => unreachable!("datatype is iriref or prefixed_name"),
                }),
                None => None,
            };
            Ok(ObjectPattern::Literal { value, datatype })
        }
        _ => unreachable!("object is literal or term"),
    }
}

fn parse_where(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<Vec<BindingExpr>> {
    let mut bindings = Vec::new();
    for bind in pair.into_inner() {
        if bind.as_rule() != Rule::bind_stmt {
            continue;
        }
        let mut inner = bind.into_inner();
        let call = inner.next().expect("func_call");
        let var = inner.next().expect("target variable");
        bindings.push(BindingExpr {
            var: var.as_str()[1..].to_string(),
            expr: parse_call(call, prefixes)?,
        });
    }
    Ok(bindings)
}

fn parse_call(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<FunctionCall> {
    let mut inner = pair.into_inner();
    let name = inner.next().expect("func_name").as_str().to_string();
    let args: Vec<Arg> = match inner.next() {
        Some(list) => list
            .into_inner()
            .map(|arg| parse_arg(arg, prefixes))
            .collect::<ParseResult<_>>()?,
        None => Vec::new(),
    };

    match name.as_str() {
        "template" => match args.as_slice() {
            [Arg::Str(pattern)] => Ok(FunctionCall::Template {
                pattern: pattern.clone(),
            }),
            _ => Err(ParseError::InvalidArguments {
                function: name,
                expected: "a single string pattern",
            }),
        },
        "StrDt" => match args.as_slice() {
            [value, Arg::Iri(datatype)] => Ok(FunctionCall::StrDt {
                value: value.clone(),
                datatype: datatype.clone(),
            }),
            _ => Err(ParseError::InvalidArguments {
                function: name,
                expected: "a value and a datatype IRI",
            }),
        },
        "concat" => {
            if args.is_empty() {
                return Err(ParseError::InvalidArguments {
                    function: name,
                    expected: "at least one argument",
                });
            }
            Ok(FunctionCall::Concat { args })
        }
        _ => {
            // `xsd:integer(...)` style casts; any other name is an
            // authoring bug and fails the whole file
            if let Some(datatype) = xsd_cast_target(&name, prefixes) {
                match args.as_slice() {
                    [value] => Ok(FunctionCall::XsdCast {
                        datatype,
                        value: value.clone(),
                    }),
                    _ => Err(ParseError::InvalidArguments {
                        function: name,
                        expected: "a single value",
                    }),
                }
            } else {
                Err(ParseError::UnknownFunction(name))
            }
        }
    }
}

fn xsd_cast_target(name: &str, prefixes: &PrefixMap) -> Option<XsdDatatype> {
    let (_, local) = name.split_once(':')?;
    let iri = prefixes.expand(name).ok()?;
    XsdDatatype::from_iri(&iri).or_else(|| {
        // tolerate a missing xsd PREFIX declaration for the common case
        if name.starts_with("xsd:") {
            XsdDatatype::from_local(local)
        } else {
            None
        }
    })
}

fn parse_arg(pair: Pair<'_>, prefixes: &PrefixMap) -> ParseResult<Arg> {
    let inner = pair.into_inner().next().expect("arg content");
    match inner.as_rule() {
        Rule::variable => Ok(Arg::Var(inner.as_str()[1..].to_string())),
        Rule::string => Ok(Arg::Str(unescape_string(inner.as_str()))),
        Rule::iriref => Ok(Arg::Iri(strip_angle_brackets(inner.as_str()).to_string())),
        Rule::prefixed_name => Ok(Arg::Iri(prefixes.expand(inner.as_str())?)),
        _ => unreachable!("arg is variable, string, iriref, or prefixed_name"),
    }
}

fn strip_angle_brackets(text: &str) -> &str {
    text.trim_start_matches('<').trim_end_matches('>')
}

fn unescape_string(quoted: &str) -> String {
    let body = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }
    out
}
