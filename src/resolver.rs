use crate::expr::{ExpressionEngine, SourceKind, ValueSource};
use crate::flow::FlowDefinition;
use crate::graph::{ActionGraph, ActionNode};
use crate::tracker::{VariableBinding, VariableTracker};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, warn};

/// One resolved field write of a data-mutating action.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    pub action_index: usize,
    pub action_name: String,
    pub field: String,
    /// Raw expression text as it appeared in the document.
    pub expression: String,
    pub source: ValueSource,
}

/// The complete analysis of one flow document.
#[derive(Debug, Clone, Default)]
pub struct FlowAnalysis {
    /// Humanized trigger category.
    pub trigger_type: String,
    /// Every action name, flattened, in document order.
    pub action_names: Vec<String>,
    /// Field writes in document order.
    pub assignments: Vec<FieldAssignment>,
    /// Written field names, first-write order.
    pub modified_attributes: IndexSet<String>,
    /// Payload fields read by any expression anywhere in the document.
    pub read_attributes: IndexSet<String>,
    /// Field name to provenance kind, unique per field: first-write order,
    /// last writer decides the kind.
    pub source_kinds: IndexMap<String, SourceKind>,
    /// Statically named entities touched by the trigger or a row write.
    pub entities: IndexSet<String>,
    /// True when at least one field assignment was produced.
    pub has_set_value: bool,
    /// Final tracker state, for diagnostics.
    pub variables: Vec<VariableBinding>,
}

/// Resolves field provenance for whole documents: flattens the action tree,
/// replays the variable tracker over it, then classifies every field written
/// by a data-mutating action.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowAnalyzer {
    engine: ExpressionEngine,
}

impl FlowAnalyzer {
    pub fn new() -> Self {
        FlowAnalyzer::default()
    }

    /// Analyzes one ingested definition. Never fails: unparseable
    /// expressions and unresolvable references degrade to `unresolved`.
    pub fn analyze(&self, definition: FlowDefinition) -> FlowAnalysis {
        let FlowDefinition { trigger, actions } = definition;
        let graph = ActionGraph::build(actions);
        let tracker = VariableTracker::replay(&graph, &self.engine);

        let mut analysis = FlowAnalysis {
            trigger_type: trigger.describe(),
            action_names: graph.names().map(str::to_string).collect(),
            ..FlowAnalysis::default()
        };
        if let Some(entity) = trigger.entity {
            analysis.entities.insert(entity);
        }

        for node in graph.nodes() {
            for value in node.inputs.values() {
                self.engine.collect_reads(value, &mut analysis.read_attributes);
            }
            if let Some(expression) = &node.expression {
                self.engine
                    .collect_reads(expression, &mut analysis.read_attributes);
            }
            if let Some(foreach) = &node.foreach {
                analysis
                    .read_attributes
                    .extend(self.engine.classify(foreach).reads);
            }

            if node.kind.is_data_mutating() {
                self.resolve_row_write(node, &tracker, &mut analysis);
            }
        }

        analysis.has_set_value = !analysis.assignments.is_empty();
        analysis.variables = tracker.bindings().to_vec();
        analysis
    }

    fn resolve_row_write(
        &self,
        node: &ActionNode,
        tracker: &VariableTracker,
        analysis: &mut FlowAnalysis,
    ) {
        if let Some(entity) = node.entity.as_deref() {
            if is_dynamic_reference(entity) {
                debug!(action = %node.name, "entity reference is decided at runtime, not recorded");
            } else if !entity.is_empty() {
                analysis.entities.insert(entity.to_string());
            }
        }

        for (raw_field, value) in &node.inputs {
            let field = normalize_written_field(raw_field);
            let classification = self.engine.classify_value(value);
            let source = match classification.source {
                // A variable reference is only as good as a binding visible
                // at this action's position.
                ValueSource::Variable { name } => match tracker.lookup(&name, node.index, &node.scope)
                {
                    Ok(_) => ValueSource::Variable { name },
                    Err(error) => {
                        warn!(%error, action = %node.name, "variable reference did not resolve");
                        ValueSource::Unresolved
                    }
                },
                other => other,
            };

            analysis.modified_attributes.insert(field.clone());
            analysis.source_kinds.insert(field.clone(), source.kind());
            analysis.assignments.push(FieldAssignment {
                action_index: node.index,
                action_name: node.name.clone(),
                field,
                expression: value_text(value),
                source,
            });
        }
    }
}

/// Strips the wire-level `item/` prefix from a written field name.
fn normalize_written_field(raw: &str) -> String {
    raw.strip_prefix("item/").unwrap_or(raw).to_string()
}

fn is_dynamic_reference(entity: &str) -> bool {
    let trimmed = entity.trim();
    (trimmed.starts_with('@') && !trimmed.starts_with("@@")) || trimmed.contains("@{")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
