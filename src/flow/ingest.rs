use super::definition::{ActionDefinition, ActionKind, FlowDefinition, TriggerDefinition};
use crate::error::IngestError;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::warn;

/// Raw wire shapes. Every field is optional so partially recognizable
/// documents degrade per action instead of failing outright.
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    properties: Option<RawProperties>,
    #[serde(default)]
    trigger: Option<Value>,
    #[serde(default)]
    triggers: Option<IndexMap<String, Value>>,
    #[serde(default)]
    actions: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    #[serde(default)]
    definition: Option<RawDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDefinition {
    #[serde(default)]
    trigger: Option<Value>,
    #[serde(default)]
    triggers: Option<IndexMap<String, Value>>,
    #[serde(default)]
    actions: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrigger {
    #[serde(rename = "type", default)]
    trigger_type: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    operation: Option<String>,
    #[serde(default)]
    entity: Option<String>,
    #[serde(default)]
    inputs: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    #[serde(rename = "type", default)]
    kind: ActionKind,
    #[serde(default)]
    entity: Option<String>,
    #[serde(default)]
    inputs: IndexMap<String, Value>,
    #[serde(default)]
    expression: Option<Value>,
    #[serde(default)]
    foreach: Option<String>,
    #[serde(default)]
    actions: IndexMap<String, Value>,
    #[serde(rename = "else", default)]
    else_branch: Option<RawElse>,
}

#[derive(Debug, Default, Deserialize)]
struct RawElse {
    #[serde(default)]
    actions: IndexMap<String, Value>,
}

/// Ingests a definition document from a byte stream.
///
/// The stream is consumed incrementally, so memory tracks the parsed
/// structure rather than the raw document size. The raw text is never
/// buffered in full.
pub fn ingest_reader<R: Read>(reader: R) -> Result<FlowDefinition, IngestError> {
    let raw: RawDocument = serde_json::from_reader(BufReader::new(reader))
        .map_err(|e| IngestError::MalformedDocument(e.to_string()))?;
    normalize(raw)
}

/// Ingests a definition document already held in memory.
pub fn ingest_str(raw: &str) -> Result<FlowDefinition, IngestError> {
    let raw: RawDocument =
        serde_json::from_str(raw).map_err(|e| IngestError::MalformedDocument(e.to_string()))?;
    normalize(raw)
}

/// Opens and ingests a definition document from disk.
pub fn ingest_file(path: impl AsRef<Path>) -> Result<FlowDefinition, IngestError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| IngestError::MalformedDocument(format!("could not open document: {}", e)))?;
    ingest_reader(file)
}

fn normalize(raw: RawDocument) -> Result<FlowDefinition, IngestError> {
    // Service payloads wrap the definition in a properties envelope.
    let (trigger, triggers, actions) = match raw.properties.and_then(|p| p.definition) {
        Some(definition) => (definition.trigger, definition.triggers, definition.actions),
        None => (raw.trigger, raw.triggers, raw.actions),
    };

    let first_trigger = trigger.or_else(|| {
        triggers.and_then(|entries| entries.into_iter().next().map(|(_, value)| value))
    });
    let actions = actions.unwrap_or_default();

    if first_trigger.is_none() && actions.is_empty() {
        return Err(IngestError::UnsupportedSchema(
            "document declares neither a trigger nor any actions".to_string(),
        ));
    }

    let trigger = match first_trigger {
        Some(value) => convert_trigger(value),
        None => {
            warn!("document has no recognizable trigger section");
            TriggerDefinition::default()
        }
    };

    Ok(FlowDefinition {
        trigger,
        actions: convert_children(actions),
    })
}

fn convert_trigger(value: Value) -> TriggerDefinition {
    let raw: RawTrigger = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(%error, "trigger shape not representable, treating as unknown");
            return TriggerDefinition::default();
        }
    };
    // Connector payloads bury these under the inputs block.
    let operation = raw
        .operation
        .or_else(|| nested_str(&raw.inputs, &["host", "operationId"]));
    let entity = raw.entity.or_else(|| {
        nested_str(&raw.inputs, &["parameters", "subscriptionRequest/entityname"])
    });
    TriggerDefinition {
        trigger_type: raw.trigger_type,
        kind: raw.kind,
        operation,
        entity,
    }
}

fn nested_str(value: &Option<Value>, path: &[&str]) -> Option<String> {
    let mut current = value.as_ref()?;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str().map(str::to_string)
}

fn convert_children(children: IndexMap<String, Value>) -> IndexMap<String, ActionDefinition> {
    children
        .into_iter()
        .map(|(name, value)| {
            let action = convert_action(&name, value);
            (name, action)
        })
        .collect()
}

fn convert_action(name: &str, value: Value) -> ActionDefinition {
    let raw: RawAction = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(action = %name, %error, "action shape not representable, keeping an unknown placeholder");
            return ActionDefinition::unknown();
        }
    };
    ActionDefinition {
        kind: raw.kind,
        entity: raw.entity,
        inputs: raw.inputs,
        expression: raw.expression,
        foreach: raw.foreach,
        actions: convert_children(raw.actions),
        else_actions: raw
            .else_branch
            .map(|branch| convert_children(branch.actions))
            .unwrap_or_default(),
    }
}
