//! Mapping re-serialization
//!
//! Rules serialize back to mapping text that parses to an equivalent
//! rule set. IRIs are emitted in full `<...>` form; prefix declarations
//! are kept for the reader but not used to re-compact terms, which
//! keeps the round trip trivially lossless.

use std::fmt::{self, Write};

use super::rule::{MappingRule, ObjectPattern, SourceSpec, TermPattern, TriplePattern};
use crate::mapping::PrefixMap;

/// A string printed inside double quotes, with `\`, `"`, newline, and
/// tab escaped so the output parses back to the same string.
pub(crate) struct QuotedStr<'a>(pub &'a str);

impl fmt::Display for QuotedStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '"' => f.write_str("\\\"")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                _ => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Var(v) => write!(f, "?{}", v),
            TermPattern::Iri(iri) => write!(f, "<{}>", iri),
        }
    }
}

impl fmt::Display for ObjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPattern::Var(v) => write!(f, "?{}", v),
            ObjectPattern::Iri(iri) => write!(f, "<{}>", iri),
            ObjectPattern::Literal { value, datatype } => {
                write!(f, "{}", QuotedStr(value))?;
                if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_prefixes(f, &self.prefixes)?;
        if !self.prefixes.is_empty() {
            writeln!(f)?;
        }
        write_rule(f, self)
    }
}

fn write_rule(f: &mut impl fmt::Write, rule: &MappingRule) -> fmt::Result {
    write!(f, "MAPPING")?;
    if let Some(name) = &rule.name {
        if name.contains(':') {
            write!(f, " <{}>", name)?;
        } else {
            write!(f, " {}", name)?;
        }
    }
    writeln!(f)?;

    match &rule.source {
        SourceSpec::Sql { query } => {
            writeln!(f, "FROM SQL {{")?;
            writeln!(f, "  {}", query)?;
            writeln!(f, "}}")?;
        }
        SourceSpec::Json { shape } => {
            writeln!(f, "FROM JSON {{")?;
            let body = serde_json::to_string_pretty(&shape.to_json())
                .map_err(|_| fmt::Error)?;
            writeln!(f, "{}", body)?;
            writeln!(f, "}}")?;
        }
    }

    writeln!(f, "TO {{")?;
    for pattern in &rule.graph_template {
        writeln!(f, "  {}", pattern)?;
    }
    writeln!(f, "}}")?;

    writeln!(f, "WHERE {{")?;
    for binding in &rule.bindings {
        writeln!(f, "  {}", binding)?;
    }
    write!(f, "}}")
}

fn write_prefixes(f: &mut impl fmt::Write, prefixes: &PrefixMap) -> fmt::Result {
    for (prefix, iri) in prefixes.iter() {
        writeln!(f, "PREFIX {}: <{}>", prefix, iri)?;
    }
    Ok(())
}

/// Serialize a rule set as one mapping file.
///
/// Rules parsed from a single file share one prefix map; serialization
/// emits the union of the rules' declarations once, at the top.
pub fn serialize_mappings(rules: &[MappingRule]) -> String {
    let mut out = String::new();

    let mut prefixes = PrefixMap::new();
    for rule in rules {
        for (prefix, iri) in rule.prefixes.iter() {
            prefixes.insert(prefix, iri);
        }
    }
    let _ = write_prefixes(&mut out, &prefixes);
    if !prefixes.is_empty() {
        out.push('\n');
    }

    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write_rule(&mut out, rule);
        out.push_str(" ;");
    }
    out.push('\n');
    out
}
