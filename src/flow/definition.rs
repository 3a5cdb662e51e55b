use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// The closed set of action discriminators the model tracks. Anything else
/// deserializes to `Other` instead of failing the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    RowUpdate,
    RowCreate,
    Condition,
    UntilLoop,
    ForEachLoop,
    Scope,
    InitializeVariable,
    SetVariable,
    IncrementVariable,
    DecrementVariable,
    AppendToStringVariable,
    AppendToArrayVariable,
    #[default]
    #[serde(other)]
    Other,
}

impl ActionKind {
    /// Writes entity rows; the provenance resolver analyzes these.
    pub fn is_data_mutating(&self) -> bool {
        matches!(self, ActionKind::RowUpdate | ActionKind::RowCreate)
    }

    /// Opens a nested scope whose children the graph builder must enumerate.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ActionKind::Condition
                | ActionKind::UntilLoop
                | ActionKind::ForEachLoop
                | ActionKind::Scope
        )
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, ActionKind::InitializeVariable)
    }

    /// The rewrite a modification-type action performs, if it is one.
    pub fn variable_op(&self) -> Option<VariableOp> {
        match self {
            ActionKind::SetVariable => Some(VariableOp::Set),
            ActionKind::IncrementVariable => Some(VariableOp::Increment),
            ActionKind::DecrementVariable => Some(VariableOp::Decrement),
            ActionKind::AppendToStringVariable => Some(VariableOp::AppendToString),
            ActionKind::AppendToArrayVariable => Some(VariableOp::AppendToArray),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            ActionKind::RowUpdate => "row-update",
            ActionKind::RowCreate => "row-create",
            ActionKind::Condition => "condition",
            ActionKind::UntilLoop => "until-loop",
            ActionKind::ForEachLoop => "for-each-loop",
            ActionKind::Scope => "scope",
            ActionKind::InitializeVariable => "initialize-variable",
            ActionKind::SetVariable => "set-variable",
            ActionKind::IncrementVariable => "increment-variable",
            ActionKind::DecrementVariable => "decrement-variable",
            ActionKind::AppendToStringVariable => "append-to-string-variable",
            ActionKind::AppendToArrayVariable => "append-to-array-variable",
            ActionKind::Other => "other",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// How a modification-type action rewrites its target variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableOp {
    Set,
    Increment,
    Decrement,
    AppendToString,
    AppendToArray,
}

impl fmt::Display for VariableOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableOp::Set => "set",
            VariableOp::Increment => "increment",
            VariableOp::Decrement => "decrement",
            VariableOp::AppendToString => "append-to-string",
            VariableOp::AppendToArray => "append-to-array",
        };
        write!(f, "{}", name)
    }
}

/// One step of a flow, with its nested children when it is a container.
#[derive(Debug, Clone, Default)]
pub struct ActionDefinition {
    pub kind: ActionKind,
    /// Entity reference of a data-mutating action; may be raw expression text
    /// when the target is decided at runtime.
    pub entity: Option<String>,
    /// Field name to raw expression value, in document order.
    pub inputs: IndexMap<String, Value>,
    /// Condition expression of a `condition` action.
    pub expression: Option<Value>,
    /// Collection expression a `for-each-loop` iterates.
    pub foreach: Option<String>,
    /// Loop/scope body, or the true branch of a condition.
    pub actions: IndexMap<String, ActionDefinition>,
    /// The false branch of a condition.
    pub else_actions: IndexMap<String, ActionDefinition>,
}

impl ActionDefinition {
    /// A placeholder for an action whose shape the model cannot represent.
    pub fn unknown() -> Self {
        ActionDefinition::default()
    }
}

/// Descriptor of what starts a flow.
#[derive(Debug, Clone, Default)]
pub struct TriggerDefinition {
    /// Raw wire discriminator, e.g. `Request` or `OpenApiConnectionWebhook`.
    pub trigger_type: String,
    /// Activation kind qualifier, e.g. `Button`.
    pub kind: Option<String>,
    /// Webhook operation identifier, when present.
    pub operation: Option<String>,
    /// Entity the trigger listens on, when present.
    pub entity: Option<String>,
}

impl TriggerDefinition {
    /// Humanized trigger category used in exported records.
    pub fn describe(&self) -> String {
        match self.trigger_type.as_str() {
            "Request" => match self.kind.as_deref() {
                Some("Button") => "Manual (Button)".to_string(),
                _ => "Manual".to_string(),
            },
            "OpenApiConnectionWebhook" => {
                // The subscription marker lives in `kind` or in the connector
                // operation id, depending on the export vintage.
                let mut marker = self.kind.clone().unwrap_or_default();
                marker.push_str(self.operation.as_deref().unwrap_or_default());
                if marker.contains("OnNewItems") {
                    "Automated - When a record is created".to_string()
                } else if marker.contains("SubscribeWebhookTrigger") {
                    "Automated - When a record is created or updated".to_string()
                } else {
                    "Automated (Webhook)".to_string()
                }
            }
            "Recurrence" => "Scheduled".to_string(),
            "" => "Unknown".to_string(),
            other => other.to_string(),
        }
    }
}

/// A fully ingested definition document: the trigger descriptor plus the
/// nested action tree, in document order. Immutable once built; each analysis
/// run owns its definition exclusively.
#[derive(Debug, Clone, Default)]
pub struct FlowDefinition {
    pub trigger: TriggerDefinition,
    pub actions: IndexMap<String, ActionDefinition>,
}

impl FlowDefinition {
    /// Counts every action in the nested tree, including all branches.
    pub fn nested_action_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&ActionDefinition> = self.actions.values().collect();
        while let Some(action) = stack.pop() {
            count += 1;
            stack.extend(action.actions.values());
            stack.extend(action.else_actions.values());
        }
        count
    }
}
