use std::fmt;
use std::hash::{Hash, Hasher};

/// A literal operand appearing inside an expression.
#[derive(Debug, Clone)]
pub enum LiteralValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiteralValue::Text(a), LiteralValue::Text(b)) => a == b,
            // Compare bit patterns so NaN == NaN, making the AST hashable.
            (LiteralValue::Number(a), LiteralValue::Number(b)) => a.to_bits() == b.to_bits(),
            (LiteralValue::Bool(a), LiteralValue::Bool(b)) => a == b,
            (LiteralValue::Null, LiteralValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            LiteralValue::Text(s) => s.hash(state),
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::Bool(b) => b.hash(state),
            LiteralValue::Null => {}
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Text(s) => write!(f, "'{}'", s),
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::Bool(b) => write!(f, "{}", b),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

/// A selector applied by a bracket or dot accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(String),
    Index(i64),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => write!(f, "'{}'", name),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// The Abstract Syntax Tree for a parsed workflow expression.
///
/// Reconstruction via `Display` is semantically equivalent to the raw text,
/// though accessors are normalized to bracket form and the leading `@` marker
/// is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprNode {
    Literal(LiteralValue),
    /// A bare identifier with no call parentheses, e.g. a loop alias.
    Identifier(String),
    Call {
        name: String,
        args: Vec<ExprNode>,
    },
    Property {
        base: Box<ExprNode>,
        key: PropertyKey,
    },
    /// Interpolated string pieces, in evaluation order.
    Concat(Vec<ExprNode>),
}

impl ExprNode {
    /// Convenience constructor for a zero- or more-argument call.
    pub fn call(name: impl Into<String>, args: Vec<ExprNode>) -> Self {
        ExprNode::Call {
            name: name.into(),
            args,
        }
    }

    /// Wraps `self` in one property access.
    pub fn index(self, key: PropertyKey) -> Self {
        ExprNode::Property {
            base: Box::new(self),
            key,
        }
    }

    /// True when the subtree contains no call or identifier node.
    pub fn is_pure_literal(&self) -> bool {
        match self {
            ExprNode::Literal(_) => true,
            ExprNode::Identifier(_) | ExprNode::Call { .. } => false,
            ExprNode::Property { base, .. } => base.is_pure_literal(),
            ExprNode::Concat(parts) => parts.iter().all(ExprNode::is_pure_literal),
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Literal(value) => write!(f, "{}", value),
            ExprNode::Identifier(name) => write!(f, "{}", name),
            ExprNode::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ExprNode::Property { base, key } => write!(f, "{}[{}]", base, key),
            ExprNode::Concat(parts) => {
                write!(f, "concat(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}
