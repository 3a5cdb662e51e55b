use crate::flow::{ActionDefinition, ActionKind};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

mod builder;

/// Which arm of a conditional a scope segment descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchArm {
    Then,
    Else,
}

impl fmt::Display for BranchArm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchArm::Then => write!(f, "then"),
            BranchArm::Else => write!(f, "else"),
        }
    }
}

/// One enclosing construct on the path from the root to an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSegment {
    /// Name of the enclosing container action.
    pub owner: String,
    /// Set when the container is a conditional, so sibling arms never
    /// compare equal.
    pub arm: Option<BranchArm>,
}

impl fmt::Display for ScopeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arm {
            Some(arm) => write!(f, "{}:{}", self.owner, arm),
            None => write!(f, "{}", self.owner),
        }
    }
}

/// The sequence of enclosing construct identifiers for one action, root
/// first. Top-level actions have an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScopePath(Vec<ScopeSegment>);

impl ScopePath {
    pub fn root() -> Self {
        ScopePath(Vec::new())
    }

    /// The path of a child nested under `owner` at this path.
    pub fn child(&self, owner: &str, arm: Option<BranchArm>) -> Self {
        let mut segments = self.0.clone();
        segments.push(ScopeSegment {
            owner: owner.to_string(),
            arm,
        });
        ScopePath(segments)
    }

    pub fn segments(&self) -> &[ScopeSegment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when a binding declared at `self` is visible to an action at
    /// `inner`: every segment of `self` must match the head of `inner`,
    /// conditional arms included.
    pub fn is_visible_from(&self, inner: &ScopePath) -> bool {
        inner.0.len() >= self.0.len() && self.0.iter().zip(&inner.0).all(|(a, b)| a == b)
    }

    /// True when descending from `self` to `inner` enters a conditional arm.
    /// Writes across such a boundary stay local to the arm. Paths that are
    /// not extensions of `self` cross nothing.
    pub fn crosses_conditional_arm(&self, inner: &ScopePath) -> bool {
        inner
            .0
            .get(self.0.len()..)
            .unwrap_or_default()
            .iter()
            .any(|segment| segment.arm.is_some())
    }

    /// The prefix of this path ending at its innermost conditional arm, or
    /// the root path when no arm encloses it. Arm-local writes are pinned
    /// here, so loops and scopes nested inside the arm do not hide them
    /// from later actions in the same arm.
    pub fn enclosing_arm(&self) -> ScopePath {
        let cut = self
            .0
            .iter()
            .rposition(|segment| segment.arm.is_some())
            .map_or(0, |i| i + 1);
        ScopePath(self.0[..cut].to_vec())
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " / ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// One flattened action in the arena.
#[derive(Debug, Clone)]
pub struct ActionNode {
    pub index: usize,
    pub name: String,
    pub kind: ActionKind,
    pub entity: Option<String>,
    pub inputs: IndexMap<String, Value>,
    pub expression: Option<Value>,
    pub foreach: Option<String>,
    pub parent: Option<usize>,
    pub scope: ScopePath,
}

impl ActionNode {
    /// Name, initializer value and declared type of a variable declaration,
    /// when its inputs are well formed.
    pub fn declared_variable(&self) -> Option<(String, Value, Option<String>)> {
        let declaration = match self.inputs.get("variables") {
            Some(Value::Array(entries)) => entries.first()?,
            _ => return None,
        };
        let name = declaration.get("name")?.as_str()?.to_string();
        let value = declaration.get("value").cloned().unwrap_or(Value::Null);
        let value_type = declaration
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some((name, value, value_type))
    }

    /// Target name and assigned value of a variable modification, when its
    /// inputs are well formed.
    pub fn mutated_variable(&self) -> Option<(String, Value)> {
        let name = self.inputs.get("name")?.as_str()?.to_string();
        let value = self.inputs.get("value").cloned().unwrap_or(Value::Null);
        Some((name, value))
    }
}

/// The ordered, flattened action arena for one document.
///
/// Indexes are depth-first document order: a container precedes its children,
/// and the true branch of a conditional precedes the false branch. Loop
/// bodies appear once (single analyzed iteration).
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    nodes: Vec<ActionNode>,
}

impl ActionGraph {
    /// Flattens a nested action tree into the arena.
    pub fn build(actions: IndexMap<String, ActionDefinition>) -> Self {
        ActionGraph {
            nodes: builder::flatten(actions),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<&ActionNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    /// Action names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }
}
