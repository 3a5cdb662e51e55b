use crate::error::TrackError;
use crate::expr::{ExpressionEngine, ValueSource};
use crate::flow::VariableOp;
use crate::graph::{ActionGraph, ActionNode, ScopePath};
use ahash::AHashMap;
use serde_json::Value;
use tracing::{debug, warn};

/// One recorded reclassification of a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEvent {
    pub action_index: usize,
    pub action_name: String,
    pub operation: VariableOp,
    pub source: ValueSource,
}

/// A declared variable and its current best-known provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub name: String,
    pub declared_at: usize,
    /// Declaring action name; `None` for bindings created implicitly by a
    /// modification of a variable that was never declared.
    pub declared_in: Option<String>,
    pub scope: ScopePath,
    pub value_type: Option<String>,
    pub source: ValueSource,
    pub history: Vec<BindingEvent>,
}

/// Replays the ordered action sequence and maintains, for every variable,
/// its current source classification under scope visibility rules.
///
/// Most recent classification wins within a visible scope chain. Writes that
/// enter a conditional arm do not escape it: they create an overlay binding
/// pinned at the arm, visible to the rest of the arm but not to sibling
/// arms or actions after the conditional. Writes inside loop and scope
/// bodies update the outer binding in place, consistent with
/// single-iteration loop analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTracker {
    bindings: Vec<VariableBinding>,
    by_name: AHashMap<String, Vec<usize>>,
}

impl VariableTracker {
    pub fn new() -> Self {
        VariableTracker::default()
    }

    /// Builds tracker state by replaying the whole graph once.
    pub fn replay(graph: &ActionGraph, engine: &ExpressionEngine) -> Self {
        let mut tracker = VariableTracker::new();
        for node in graph.nodes() {
            tracker.observe(node, engine);
        }
        tracker
    }

    /// Feeds one action through the tracker. Non-variable actions are
    /// ignored.
    pub fn observe(&mut self, node: &ActionNode, engine: &ExpressionEngine) {
        if node.kind.is_declaration() {
            match node.declared_variable() {
                Some((name, value, value_type)) => {
                    let source = engine.classify_value(&value).source;
                    debug!(
                        variable = %name,
                        action = %node.name,
                        kind = %source.kind(),
                        "registered variable"
                    );
                    self.push_binding(VariableBinding {
                        name,
                        declared_at: node.index,
                        declared_in: Some(node.name.clone()),
                        scope: node.scope.clone(),
                        value_type,
                        source,
                        history: Vec::new(),
                    });
                }
                None => {
                    warn!(action = %node.name, "variable declaration with malformed inputs");
                }
            }
        } else if let Some(operation) = node.kind.variable_op() {
            match node.mutated_variable() {
                Some((name, value)) => {
                    self.track_modification(&name, operation, &value, node, engine);
                }
                None => {
                    warn!(action = %node.name, "variable modification with malformed inputs");
                }
            }
        }
    }

    fn track_modification(
        &mut self,
        name: &str,
        operation: VariableOp,
        value: &Value,
        node: &ActionNode,
        engine: &ExpressionEngine,
    ) {
        let source = engine.classify_value(value).source;
        let event = BindingEvent {
            action_index: node.index,
            action_name: node.name.clone(),
            operation,
            source: source.clone(),
        };

        match self.lookup_id(name, node.index, &node.scope) {
            Some(id) => {
                let binding = &self.bindings[id];
                if binding.scope.crosses_conditional_arm(&node.scope) {
                    // The write happens inside a conditional arm the binding
                    // does not belong to; pin it at the arm itself, not the
                    // write site, so a loop body inside the arm does not
                    // hide it from the rest of the arm.
                    let overlay = VariableBinding {
                        name: name.to_string(),
                        declared_at: node.index,
                        declared_in: binding.declared_in.clone(),
                        scope: node.scope.enclosing_arm(),
                        value_type: binding.value_type.clone(),
                        source,
                        history: vec![event],
                    };
                    self.push_binding(overlay);
                } else {
                    let binding = &mut self.bindings[id];
                    binding.source = source;
                    binding.history.push(event);
                }
            }
            None => {
                warn!(
                    variable = %name,
                    action = %node.name,
                    "variable modified but never declared"
                );
                self.push_binding(VariableBinding {
                    name: name.to_string(),
                    declared_at: node.index,
                    declared_in: None,
                    scope: node.scope.clone(),
                    value_type: None,
                    source,
                    history: vec![event],
                });
            }
        }
    }

    /// Resolves the binding visible at action `index` within `scope`:
    /// nearest enclosing scope first, then the latest declaration not after
    /// `index` (shadowing).
    pub fn lookup(
        &self,
        name: &str,
        index: usize,
        scope: &ScopePath,
    ) -> Result<&VariableBinding, TrackError> {
        self.lookup_id(name, index, scope)
            .map(|id| &self.bindings[id])
            .ok_or_else(|| TrackError::UndeclaredVariable {
                name: name.to_string(),
                action_index: index,
            })
    }

    fn lookup_id(&self, name: &str, index: usize, scope: &ScopePath) -> Option<usize> {
        let ids = self.by_name.get(name)?;
        ids.iter()
            .copied()
            .filter(|&id| {
                let binding = &self.bindings[id];
                binding.declared_at <= index && binding.scope.is_visible_from(scope)
            })
            .max_by_key(|&id| {
                let binding = &self.bindings[id];
                (binding.scope.depth(), binding.declared_at)
            })
    }

    /// Every binding created during replay, in creation order.
    pub fn bindings(&self) -> &[VariableBinding] {
        &self.bindings
    }

    fn push_binding(&mut self, binding: VariableBinding) {
        let id = self.bindings.len();
        self.by_name
            .entry(binding.name.clone())
            .or_default()
            .push(id);
        self.bindings.push(binding);
    }
}
