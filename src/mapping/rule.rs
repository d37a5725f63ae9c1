//! Mapping rules
//!
//! A `MappingRule` is one parsed `MAPPING ... FROM ... TO ... WHERE ...`
//! block. Resolution orders the binding DAG topologically and validates
//! variable usage before any row is processed.

use indexmap::IndexMap;
use thiserror::Error;

use super::binding::BindingExpr;
use super::namespace::PrefixMap;
use crate::source::ShapeTemplate;

/// Rule resolution errors
#[derive(Error, Debug)]
pub enum RuleError {
    /// Bindings form a cycle instead of a DAG
    #[error("Cyclic binding dependency involving ?{0}")]
    CyclicBindings(String),

    /// Two bindings target the same variable
    #[error("Duplicate binding target ?{0}")]
    DuplicateBinding(String),

    /// A binding target shadows a source-bound variable
    #[error("Binding target ?{0} collides with a source-bound variable")]
    VariableCollision(String),

    /// A referenced variable is bound by neither the source nor a binding
    #[error("Variable ?{0} is not bound by the source or any binding")]
    UnresolvableVariable(String),

    /// Variables from sibling fan-out scopes cannot be combined
    #[error("?{a} and ?{b} are bound in sibling fan-out scopes and cannot be combined")]
    SiblingScopeJoin {
        /// Variable in the first scope
        a: String,
        /// Variable in the second scope
        b: String,
    },
}

pub type RuleResult<T> = Result<T, RuleError>;

/// Subject or predicate position: a variable or a constant IRI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    /// `?name`
    Var(String),
    /// Expanded IRI
    Iri(String),
}

impl TermPattern {
    /// The variable name, if this is a variable
    pub fn as_var(&self) -> Option<&str> {
        match self {
            TermPattern::Var(v) => Some(v),
            TermPattern::Iri(_) => None,
        }
    }
}

/// Object position: a variable, a constant IRI, or a constant literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPattern {
    /// `?name`
    Var(String),
    /// Expanded IRI
    Iri(String),
    /// `"value"` or `"value"^^<datatype>`
    Literal {
        /// Lexical form
        value: String,
        /// Expanded datatype IRI, if tagged
        datatype: Option<String>,
    },
}

impl ObjectPattern {
    /// The variable name, if this is a variable
    pub fn as_var(&self) -> Option<&str> {
        match self {
            ObjectPattern::Var(v) => Some(v),
            _ => None,
        }
    }
}

/// One triple template in a `TO { ... }` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    /// Subject template
    pub subject: TermPattern,
    /// Predicate template
    pub predicate: TermPattern,
    /// Object template
    pub object: ObjectPattern,
}

impl TriplePattern {
    /// Variables referenced by this pattern, in position order
    pub fn variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        if let Some(v) = self.subject.as_var() {
            vars.push(v);
        }
        if let Some(v) = self.predicate.as_var() {
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        if let Some(v) = self.object.as_var() {
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        vars
    }
}

/// Where a rule's rows come from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// `FROM SQL { ... }` — opaque query text for the relational driver
    Sql {
        /// Raw query text, passed through verbatim
        query: String,
    },
    /// `FROM JSON { ... }` — compiled shape template
    Json {
        /// Compiled shape template
        shape: ShapeTemplate,
    },
}

impl SourceSpec {
    /// Whether this is a SQL source
    pub fn is_sql(&self) -> bool {
        matches!(self, SourceSpec::Sql { .. })
    }

    /// Source-bound variables, when statically known (JSON only: a SQL
    /// source's column set is unknown until the driver runs the query)
    pub fn variables(&self) -> Option<Vec<&str>> {
        match self {
            SourceSpec::Sql { .. } => None,
            SourceSpec::Json { shape } => Some(shape.variables()),
        }
    }
}

/// One parsed mapping block
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    /// Optional rule name (`MAPPING <urn:name>` or `MAPPING name`)
    pub name: Option<String>,
    /// Prefix declarations in scope for this rule
    pub prefixes: PrefixMap,
    /// Row source
    pub source: SourceSpec,
    /// `TO { ... }` triple templates
    pub graph_template: Vec<TriplePattern>,
    /// `WHERE { ... }` bindings, in textual order
    pub bindings: Vec<BindingExpr>,
}

impl MappingRule {
    /// Validate the rule and fix a topological binding order.
    ///
    /// Forward references between bindings are legal in the mapping
    /// text, so ordering happens here rather than at parse time. For
    /// JSON sources every referenced variable is also checked against
    /// the source schema; SQL column sets are unknown until runtime, so
    /// those checks are deferred to row evaluation.
    ///
    /// Resolution also fixes each binding's and pattern's fan-out scope:
    /// the deepest scope path among the variables it reads. Variables
    /// from sibling scopes in one expression are rejected here.
    pub fn resolve(self) -> RuleResult<CompiledRule> {
        let source_vars = self.source.variables();

        // a binding shadowing a source variable is a collision, never a
        // dependency, so this check precedes ordering
        if let Some(vars) = &source_vars {
            for binding in &self.bindings {
                if vars.contains(&binding.var.as_str()) {
                    return Err(RuleError::VariableCollision(binding.var.clone()));
                }
            }
        }

        let order = topo_order(&self.bindings, source_vars.as_deref().unwrap_or(&[]))?;

        if let Some(mut known) = source_vars {
            known.extend(self.bindings.iter().map(|b| b.var.as_str()));

            for binding in &self.bindings {
                for var in binding.expr.referenced_vars() {
                    if !known.contains(&var) {
                        return Err(RuleError::UnresolvableVariable(var.to_string()));
                    }
                }
            }
            for pattern in &self.graph_template {
                for var in pattern.variables() {
                    if !known.contains(&var) {
                        return Err(RuleError::UnresolvableVariable(var.to_string()));
                    }
                }
            }
        }

        // SQL columns are always root-scoped, so only JSON shapes seed
        // non-empty paths
        let mut scope_paths: IndexMap<String, Vec<String>> = IndexMap::new();
        if let SourceSpec::Json { shape } = &self.source {
            for (var, path) in shape.variable_scopes() {
                scope_paths.insert(var, path);
            }
        }

        // a binding's output lives at the deepest scope of its inputs
        let mut binding_paths: Vec<Vec<String>> = vec![Vec::new(); self.bindings.len()];
        for &i in &order {
            let binding = &self.bindings[i];
            let path = join_scope_paths(binding.expr.referenced_vars(), &scope_paths)?;
            binding_paths[i] = path.clone();
            scope_paths.insert(binding.var.clone(), path);
        }

        let pattern_paths = self
            .graph_template
            .iter()
            .map(|p| join_scope_paths(p.variables(), &scope_paths))
            .collect::<RuleResult<Vec<_>>>()?;

        Ok(CompiledRule {
            rule: self,
            order,
            binding_paths,
            pattern_paths,
        })
    }
}

/// A resolved rule, ready for row evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: MappingRule,
    /// Indices into `rule.bindings`, dependency-ordered
    order: Vec<usize>,
    /// Scope path of each binding, aligned with `rule.bindings`
    binding_paths: Vec<Vec<String>>,
    /// Scope path of each pattern, aligned with `rule.graph_template`
    pattern_paths: Vec<Vec<String>>,
}

impl CompiledRule {
    /// The underlying rule
    pub fn rule(&self) -> &MappingRule {
        &self.rule
    }

    /// Rule name for reports, if any
    pub fn name(&self) -> Option<&str> {
        self.rule.name.as_deref()
    }

    /// Bindings in dependency order, each with its fan-out scope path
    pub fn ordered_bindings(&self) -> impl Iterator<Item = (&BindingExpr, &[String])> {
        self.order
            .iter()
            .map(|&i| (&self.rule.bindings[i], self.binding_paths[i].as_slice()))
    }

    /// Triple patterns in template order, each with its fan-out scope path
    pub fn patterns(&self) -> impl Iterator<Item = (&TriplePattern, &[String])> {
        self.rule
            .graph_template
            .iter()
            .zip(self.pattern_paths.iter().map(Vec::as_slice))
    }
}

/// The deepest scope path among `vars`, requiring every path to lie on
/// one root-to-leaf chain. Unknown variables (SQL columns) are
/// root-scoped.
fn join_scope_paths<'a>(
    vars: impl IntoIterator<Item = &'a str>,
    scope_paths: &IndexMap<String, Vec<String>>,
) -> RuleResult<Vec<String>> {
    let mut deepest: &[String] = &[];
    let mut deepest_var: Option<&str> = None;
    for var in vars {
        let path: &[String] = scope_paths.get(var).map(Vec::as_slice).unwrap_or(&[]);
        if path.is_empty() {
            continue;
        }
        let (short, long) = if path.len() < deepest.len() {
            (path, deepest)
        } else {
            (deepest, path)
        };
        if !long.starts_with(short) {
            return Err(RuleError::SiblingScopeJoin {
                a: deepest_var.unwrap_or_default().to_string(),
                b: var.to_string(),
            });
        }
        if path.len() > deepest.len() {
            deepest = path;
        }
        deepest_var.get_or_insert(var);
    }
    Ok(deepest.to_vec())
}

/// Kahn's algorithm over binding dependencies, stable with respect to
/// declaration order so evaluation is deterministic. References to
/// source-bound variables are row inputs, not binding dependencies.
fn topo_order(bindings: &[BindingExpr], source_vars: &[&str]) -> RuleResult<Vec<usize>> {
    let n = bindings.len();
    let index_of = |var: &str| {
        if source_vars.contains(&var) {
            return None;
        }
        bindings.iter().position(|b| b.var == var)
    };

    for (i, binding) in bindings.iter().enumerate() {
        if bindings[..i].iter().any(|b| b.var == binding.var) {
            return Err(RuleError::DuplicateBinding(binding.var.clone()));
        }
    }

    let deps: Vec<Vec<usize>> = bindings
        .iter()
        .map(|b| {
            b.expr
                .referenced_vars()
                .into_iter()
                .filter_map(index_of)
                .collect()
        })
        .collect();

    let mut done = vec![false; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let ready = (0..n)
            .find(|&i| !done[i] && deps[i].iter().all(|&d| done[d] || d == i));
        match ready {
            Some(i) => {
                if deps[i].contains(&i) {
                    // self-reference
                    return Err(RuleError::CyclicBindings(bindings[i].var.clone()));
                }
                done[i] = true;
                order.push(i);
            }
            None => {
                let stuck = (0..n).find(|&i| !done[i]).unwrap_or(0);
                return Err(RuleError::CyclicBindings(bindings[stuck].var.clone()));
            }
        }
    }
    Ok(order)
}
