//! Common test utilities for building definition documents.
use serde_json::{Value, json};
use yurai::graph::ActionGraph;
use yurai::prelude::*;

/// Wraps a trigger and an action map in the service export envelope.
#[allow(dead_code)]
pub fn envelope(trigger: Value, actions: Value) -> Value {
    json!({
        "properties": {
            "definition": {
                "triggers": { "When_something_happens": trigger },
                "actions": actions,
            }
        }
    })
}

#[allow(dead_code)]
pub fn button_trigger() -> Value {
    json!({ "type": "Request", "kind": "Button" })
}

#[allow(dead_code)]
pub fn webhook_trigger(entity: &str) -> Value {
    json!({
        "type": "OpenApiConnectionWebhook",
        "kind": "SubscribeWebhookTrigger",
        "inputs": {
            "parameters": { "subscriptionRequest/entityname": entity }
        }
    })
}

#[allow(dead_code)]
pub fn recurrence_trigger() -> Value {
    json!({ "type": "Recurrence" })
}

#[allow(dead_code)]
pub fn initialize_variable(name: &str, value: &str) -> Value {
    json!({
        "type": "initialize-variable",
        "inputs": {
            "variables": [{ "name": name, "type": "string", "value": value }]
        }
    })
}

#[allow(dead_code)]
pub fn set_variable(name: &str, value: &str) -> Value {
    json!({
        "type": "set-variable",
        "inputs": { "name": name, "value": value }
    })
}

#[allow(dead_code)]
pub fn row_update(entity: &str, fields: Value) -> Value {
    json!({
        "type": "row-update",
        "entity": entity,
        "inputs": fields,
    })
}

#[allow(dead_code)]
pub fn row_create(entity: &str, fields: Value) -> Value {
    json!({
        "type": "row-create",
        "entity": entity,
        "inputs": fields,
    })
}

#[allow(dead_code)]
pub fn condition(expression: &str, then_actions: Value, else_actions: Value) -> Value {
    json!({
        "type": "condition",
        "expression": expression,
        "actions": then_actions,
        "else": { "actions": else_actions },
    })
}

#[allow(dead_code)]
pub fn foreach_loop(source: &str, actions: Value) -> Value {
    json!({
        "type": "for-each-loop",
        "foreach": source,
        "actions": actions,
    })
}

#[allow(dead_code)]
pub fn scope(actions: Value) -> Value {
    json!({ "type": "scope", "actions": actions })
}

#[allow(dead_code)]
pub fn until_loop(expression: &str, actions: Value) -> Value {
    json!({
        "type": "until-loop",
        "expression": expression,
        "actions": actions,
    })
}

/// Ingests a built document, panicking on failure.
#[allow(dead_code)]
pub fn ingest(document: &Value) -> FlowDefinition {
    ingest_str(&document.to_string()).expect("Failed to ingest test document")
}

/// Ingests and analyzes a built document.
#[allow(dead_code)]
pub fn analyze(document: &Value) -> FlowAnalysis {
    FlowAnalyzer::new().analyze(ingest(document))
}

/// Ingests a built document and flattens its action tree.
#[allow(dead_code)]
pub fn graph_of(document: &Value) -> ActionGraph {
    ActionGraph::build(ingest(document).actions)
}
