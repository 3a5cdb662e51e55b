use super::ast::{ExprNode, PropertyKey};
use std::fmt;

/// Call names that read from a runtime data payload, so a property selector
/// applied to them names an attribute of that payload.
const DATA_ACCESS_CALLS: &[&str] = &[
    "triggerBody",
    "triggerOutputs",
    "outputs",
    "body",
    "item",
    "items",
];

/// The closed set of provenance kinds used in exported records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Trigger,
    Variable,
    Static,
    ActionOutput,
    Parameter,
    Unresolved,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Trigger => "trigger",
            SourceKind::Variable => "variable",
            SourceKind::Static => "static",
            SourceKind::ActionOutput => "output",
            SourceKind::Parameter => "parameter",
            SourceKind::Unresolved => "unresolved",
        };
        write!(f, "{}", name)
    }
}

/// Where a value written by an expression ultimately comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// The flow trigger payload, optionally a specific field of it.
    Trigger { field: Option<String> },
    /// A declared flow variable.
    Variable { name: String },
    /// The output of an earlier action, optionally a specific field of it.
    ActionOutput {
        action: String,
        field: Option<String>,
    },
    /// A constant with no runtime data dependency.
    Static,
    /// An environment parameter.
    Parameter { name: String },
    /// Syntactically valid but referencing a construct the model cannot pin
    /// down (loop items, bare identifiers, failed parses).
    Unresolved,
}

impl ValueSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            ValueSource::Trigger { .. } => SourceKind::Trigger,
            ValueSource::Variable { .. } => SourceKind::Variable,
            ValueSource::ActionOutput { .. } => SourceKind::ActionOutput,
            ValueSource::Static => SourceKind::Static,
            ValueSource::Parameter { .. } => SourceKind::Parameter,
            ValueSource::Unresolved => SourceKind::Unresolved,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, ValueSource::Static)
    }

    /// The payload field this source reads, when one was named.
    pub fn field_ref(&self) -> Option<&str> {
        match self {
            ValueSource::Trigger { field } | ValueSource::ActionOutput { field, .. } => {
                field.as_deref()
            }
            _ => None,
        }
    }
}

/// Strips the wire-level `body/` prefix from a payload selector.
pub fn normalize_field_ref(raw: &str) -> &str {
    raw.strip_prefix("body/").unwrap_or(raw)
}

/// Resolves a parsed expression tree to its provenance classification.
///
/// Composed trees follow the first-non-static rule: the leftmost source that
/// is not a plain literal decides the classification, and a tree with no such
/// source is `Static`.
pub fn classify_node(node: &ExprNode) -> ValueSource {
    match node {
        ExprNode::Literal(_) => ValueSource::Static,
        ExprNode::Identifier(_) => ValueSource::Unresolved,
        ExprNode::Concat(parts) => first_non_static(parts).unwrap_or(ValueSource::Static),
        ExprNode::Call { name, args } => classify_call(name, args, None),
        ExprNode::Property { .. } => {
            let (base, keys) = unwrap_accessors(node);
            let field = keys.iter().find_map(|key| match key {
                PropertyKey::Name(name) => Some(normalize_field_ref(name).to_string()),
                PropertyKey::Index(_) => None,
            });
            match base {
                ExprNode::Call { name, args } => classify_call(name, args, field),
                ExprNode::Literal(_) => ValueSource::Static,
                ExprNode::Concat(parts) => {
                    first_non_static(parts).unwrap_or(ValueSource::Static)
                }
                ExprNode::Identifier(_) | ExprNode::Property { .. } => ValueSource::Unresolved,
            }
        }
    }
}

fn classify_call(name: &str, args: &[ExprNode], field: Option<String>) -> ValueSource {
    match name {
        "triggerBody" | "triggerOutputs" => ValueSource::Trigger { field },
        "variables" => match text_argument(args) {
            Some(name) => ValueSource::Variable { name },
            None => ValueSource::Unresolved,
        },
        "outputs" | "body" => match text_argument(args) {
            Some(action) => ValueSource::ActionOutput { action, field },
            None => ValueSource::Unresolved,
        },
        "parameters" => match text_argument(args) {
            Some(name) => ValueSource::Parameter { name },
            None => ValueSource::Unresolved,
        },
        // The per-iteration loop element is not modeled; see the tracker's
        // single-pass loop semantics.
        "item" | "items" => ValueSource::Unresolved,
        _ => first_non_static(args).unwrap_or(ValueSource::Static),
    }
}

/// Leftmost non-static source in evaluation order, descending into nested
/// calls and concatenations.
fn first_non_static(nodes: &[ExprNode]) -> Option<ValueSource> {
    nodes.iter().find_map(|node| {
        let source = classify_node(node);
        (!source.is_static()).then_some(source)
    })
}

fn text_argument(args: &[ExprNode]) -> Option<String> {
    match args.first() {
        Some(ExprNode::Literal(super::ast::LiteralValue::Text(s))) => Some(s.clone()),
        _ => None,
    }
}

/// Peels a chain of property accessors, returning the innermost base and the
/// selector keys in application order.
fn unwrap_accessors(node: &ExprNode) -> (&ExprNode, Vec<&PropertyKey>) {
    let mut keys = Vec::new();
    let mut current = node;
    while let ExprNode::Property { base, key } = current {
        keys.push(key);
        current = base;
    }
    keys.reverse();
    (current, keys)
}

/// Collects every payload field selector referenced anywhere in the tree,
/// normalized and in evaluation order.
pub fn collect_field_refs(node: &ExprNode, out: &mut Vec<String>) {
    match node {
        ExprNode::Property { .. } => {
            let (base, keys) = unwrap_accessors(node);
            if let ExprNode::Call { name, args } = base {
                if DATA_ACCESS_CALLS.contains(&name.as_str()) {
                    for key in keys {
                        if let PropertyKey::Name(field) = key {
                            out.push(normalize_field_ref(field).to_string());
                        }
                    }
                }
                for arg in args {
                    collect_field_refs(arg, out);
                }
            } else {
                collect_field_refs(base, out);
            }
        }
        ExprNode::Call { args, .. } => {
            for arg in args {
                collect_field_refs(arg, out);
            }
        }
        ExprNode::Concat(parts) => {
            for part in parts {
                collect_field_refs(part, out);
            }
        }
        ExprNode::Literal(_) | ExprNode::Identifier(_) => {}
    }
}
