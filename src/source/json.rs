//! JSON shape templates
//!
//! A `FROM JSON { ... }` body is a JSON document whose scalar string
//! values of the form `"?name"` are variable placeholders and whose
//! single-element arrays mark fan-out: each element of the matching
//! array in a source document yields one element row in that scope.
//!
//! The template is compiled into an arena of index-linked nodes and
//! matched against documents with an explicit work stack, so deeply
//! nested documents cannot overflow the call stack.

use serde_json::Value as Json;
use thiserror::Error;

use crate::eval::{Row, Value};

/// Shape template errors
#[derive(Error, Debug)]
pub enum ShapeError {
    /// An array in the template must contain exactly one element template
    #[error("Fan-out array must have exactly one element template, found {0}")]
    FanOutArity(usize),

    /// Document structure does not match the template
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// What the template called for
        expected: &'static str,
        /// What the document contained
        found: &'static str,
    },

    /// A placeholder matched a non-scalar document value
    #[error("Variable ?{var} matched a non-scalar value ({found})")]
    ExpectedScalar {
        /// Placeholder variable name
        var: String,
        /// JSON kind actually found
        found: &'static str,
    },
}

pub type ShapeResult<T> = Result<T, ShapeError>;

/// Arena node id
type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
enum ShapeNode {
    /// Object with field → child node links
    Object(Vec<(String, NodeId)>),
    /// Fan-out array; `scope` names the group in extracted rows
    Array { scope: String, elem: NodeId },
    /// `"?name"` placeholder
    Var(String),
    /// Literal JSON carried through unmatched (constants in the template)
    Const(Json),
}

/// Compiled JSON shape template
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTemplate {
    nodes: Vec<ShapeNode>,
    root: NodeId,
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl ShapeTemplate {
    /// Compile a template from parsed JSON
    pub fn compile(template: &Json) -> ShapeResult<Self> {
        let mut nodes = vec![ShapeNode::Const(Json::Null)];
        let mut work: Vec<(NodeId, &Json, Option<&str>)> = vec![(0, template, None)];

        while let Some((slot, value, field)) = work.pop() {
            match value {
                Json::String(s) if s.starts_with('?') && s.len() > 1 => {
                    nodes[slot] = ShapeNode::Var(s[1..].to_string());
                }
                Json::Array(items) => {
                    if items.len() != 1 {
                        return Err(ShapeError::FanOutArity(items.len()));
                    }
                    let elem = nodes.len();
                    nodes.push(ShapeNode::Const(Json::Null));
                    let scope = field.unwrap_or("_root").to_string();
                    nodes[slot] = ShapeNode::Array { scope, elem };
                    work.push((elem, &items[0], field));
                }
                Json::Object(map) => {
                    let mut fields = Vec::with_capacity(map.len());
                    for (key, child_value) in map {
                        let child = nodes.len();
                        nodes.push(ShapeNode::Const(Json::Null));
                        fields.push((key.clone(), child));
                        work.push((child, child_value, Some(key)));
                    }
                    nodes[slot] = ShapeNode::Object(fields);
                }
                other => {
                    nodes[slot] = ShapeNode::Const(other.clone());
                }
            }
        }

        Ok(Self { nodes, root: 0 })
    }

    /// All placeholder variable names in the template
    pub fn variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        let mut work = vec![self.root];
        while let Some(id) = work.pop() {
            match &self.nodes[id] {
                ShapeNode::Var(name) => vars.push(name.as_str()),
                ShapeNode::Array { elem, .. } => work.push(*elem),
                ShapeNode::Object(fields) => work.extend(fields.iter().map(|(_, id)| *id)),
                ShapeNode::Const(_) => {}
            }
        }
        vars.sort_unstable();
        vars
    }

    /// Each placeholder with its fan-out scope path from the root.
    ///
    /// A root-level variable has an empty path; a variable inside
    /// nested arrays lists the enclosing scope names outermost first.
    pub fn variable_scopes(&self) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        let mut work: Vec<(NodeId, Vec<String>)> = vec![(self.root, Vec::new())];
        while let Some((id, path)) = work.pop() {
            match &self.nodes[id] {
                ShapeNode::Var(name) => out.push((name.clone(), path)),
                ShapeNode::Array { scope, elem } => {
                    let mut elem_path = path;
                    elem_path.push(scope.clone());
                    work.push((*elem, elem_path));
                }
                ShapeNode::Object(fields) => {
                    for (_, child) in fields {
                        work.push((*child, path.clone()));
                    }
                }
                ShapeNode::Const(_) => {}
            }
        }
        out
    }

    /// Match a document against the template, extracting one `Row`.
    ///
    /// Missing or null fields bind `Value::Null`; a missing array binds
    /// an empty fan-out group; structural mismatches fail.
    pub fn extract(&self, doc: &Json) -> ShapeResult<Row> {
        // Row arena: children always have a larger index than their
        // parent, which makes bottom-up group assembly a reverse scan.
        let mut rows: Vec<Row> = vec![Row::new()];
        let mut pending: Vec<(usize, String, Vec<usize>)> = Vec::new();
        let mut work: Vec<(NodeId, Option<&Json>, usize)> = vec![(self.root, Some(doc), 0)];

        while let Some((node, value, row_idx)) = work.pop() {
            match &self.nodes[node] {
                ShapeNode::Const(_) => {}
                ShapeNode::Var(name) => {
                    let bound = match value {
                        None | Some(Json::Null) => Value::Null,
                        Some(Json::String(s)) => Value::String(s.clone()),
                        Some(Json::Number(n)) => Value::String(n.to_string()),
                        Some(Json::Bool(b)) => Value::String(b.to_string()),
                        Some(other) => {
                            return Err(ShapeError::ExpectedScalar {
                                var: name.clone(),
                                found: json_kind(other),
                            })
                        }
                    };
                    rows[row_idx].set(name.clone(), bound);
                }
                ShapeNode::Object(fields) => match value {
                    Some(Json::Object(map)) => {
                        for (field, child) in fields.iter().rev() {
                            work.push((*child, map.get(field), row_idx));
                        }
                    }
                    None | Some(Json::Null) => {
                        for (_, child) in fields.iter().rev() {
                            work.push((*child, None, row_idx));
                        }
                    }
                    Some(other) => {
                        return Err(ShapeError::ShapeMismatch {
                            expected: "object",
                            found: json_kind(other),
                        })
                    }
                },
                ShapeNode::Array { scope, elem } => {
                    let mut children = Vec::new();
                    match value {
                        Some(Json::Array(items)) => {
                            for item in items.iter().rev() {
                                let idx = rows.len();
                                rows.push(Row::new());
                                children.push(idx);
                                work.push((*elem, Some(item), idx));
                            }
                            children.reverse();
                        }
                        None | Some(Json::Null) => {}
                        Some(other) => {
                            return Err(ShapeError::ShapeMismatch {
                                expected: "array",
                                found: json_kind(other),
                            })
                        }
                    }
                    pending.push((row_idx, scope.clone(), children));
                }
            }
        }

        // Attach groups bottom-up: descending parent index guarantees a
        // child row is fully assembled before it is moved.
        pending.sort_by(|a, b| b.0.cmp(&a.0));
        let mut slots: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
        for (parent, scope, children) in pending {
            let group: Vec<Row> = children
                .into_iter()
                .filter_map(|idx| slots[idx].take())
                .collect();
            if let Some(row) = slots[parent].as_mut() {
                row.add_group(scope, group);
            }
        }
        Ok(slots[0].take().unwrap_or_default())
    }

    /// Reconstruct the template as JSON (for mapping re-serialization)
    pub fn to_json(&self) -> Json {
        self.node_to_json(self.root)
    }

    // Depth here is template depth (authored), not document depth.
    fn node_to_json(&self, id: NodeId) -> Json {
        match &self.nodes[id] {
            ShapeNode::Var(name) => Json::String(format!("?{}", name)),
            ShapeNode::Const(value) => value.clone(),
            ShapeNode::Array { elem, .. } => Json::Array(vec![self.node_to_json(*elem)]),
            ShapeNode::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (field, child) in fields {
                    map.insert(field.clone(), self.node_to_json(*child));
                }
                Json::Object(map)
            }
        }
    }
}
