//! End-to-end provenance resolution tests over whole documents.
mod common;
use common::*;
use serde_json::json;
use yurai::prelude::*;

#[test]
fn test_assignment_kinds_follow_expression_sources() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init_email": initialize_variable("varEmail", "@triggerBody()['emailaddress1']"),
            "Update_a_row": row_update("contact", json!({
                "firstname": "@variables('varEmail')",
                "emailaddress1": "static@example.com",
                "lastname": "@outputs('Get_a_row')?['body/lastname']",
            })),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.trigger_type, "Manual (Button)");
    assert_eq!(analysis.action_names, vec!["Init_email", "Update_a_row"]);
    assert!(analysis.has_set_value);
    assert_eq!(analysis.assignments.len(), 3);

    let firstname = &analysis.assignments[0];
    assert_eq!(firstname.action_name, "Update_a_row");
    assert_eq!(firstname.field, "firstname");
    assert_eq!(
        firstname.source,
        ValueSource::Variable {
            name: "varEmail".to_string()
        }
    );

    assert_eq!(analysis.assignments[1].source, ValueSource::Static);
    assert_eq!(
        analysis.assignments[2].source,
        ValueSource::ActionOutput {
            action: "Get_a_row".to_string(),
            field: Some("lastname".to_string()),
        }
    );

    assert_eq!(analysis.source_kinds.get("firstname"), Some(&SourceKind::Variable));
    assert_eq!(analysis.source_kinds.get("emailaddress1"), Some(&SourceKind::Static));
    assert_eq!(analysis.source_kinds.get("lastname"), Some(&SourceKind::ActionOutput));
}

#[test]
fn test_modified_attributes_keep_first_write_order() {
    let document = envelope(
        button_trigger(),
        json!({
            "First": row_update("contact", json!({
                "lastname": "a",
                "firstname": "b",
            })),
            "Second": row_update("contact", json!({
                "firstname": "c",
                "description": "d",
            })),
        }),
    );

    let analysis = analyze(&document);
    let modified: Vec<&str> = analysis.modified_attributes.iter().map(String::as_str).collect();
    assert_eq!(modified, vec!["lastname", "firstname", "description"]);
}

#[test]
fn test_source_kind_reflects_the_last_writer() {
    let document = envelope(
        button_trigger(),
        json!({
            "First": row_update("contact", json!({ "firstname": "constant" })),
            "Init": initialize_variable("v", "@triggerBody()['firstname']"),
            "Second": row_update("contact", json!({ "firstname": "@variables('v')" })),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.source_kinds.get("firstname"), Some(&SourceKind::Variable));
    assert_eq!(analysis.source_kinds.len(), 1);
    // Both writes are still present as assignments.
    assert_eq!(analysis.assignments.len(), 2);
}

#[test]
fn test_item_prefix_is_stripped_from_written_fields() {
    let document = envelope(
        button_trigger(),
        json!({
            "Each": foreach_loop("@outputs('List_rows')?['body/value']", json!({
                "Update": row_update("contact", json!({
                    "item/firstname": "@item()['firstname']",
                })),
            })),
        }),
    );

    let analysis = analyze(&document);
    let modified: Vec<&str> = analysis.modified_attributes.iter().map(String::as_str).collect();
    assert_eq!(modified, vec!["firstname"]);
    // Loop items cannot be pinned to a provenance.
    assert_eq!(analysis.source_kinds.get("firstname"), Some(&SourceKind::Unresolved));
}

#[test]
fn test_entities_aggregate_trigger_and_row_writes() {
    let document = envelope(
        webhook_trigger("contact"),
        json!({
            "Create": row_create("account", json!({ "name": "x" })),
            "Update": row_update("contact", json!({ "firstname": "y" })),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.trigger_type, "Automated - When a record is created or updated");
    let entities: Vec<&str> = analysis.entities.iter().map(String::as_str).collect();
    assert_eq!(entities, vec!["contact", "account"]);
}

#[test]
fn test_runtime_entity_reference_is_not_recorded() {
    let document = envelope(
        button_trigger(),
        json!({
            "Update": row_update("@variables('targetTable')", json!({ "firstname": "x" })),
        }),
    );

    let analysis = analyze(&document);
    assert!(analysis.entities.is_empty());
    // The write itself is still analyzed.
    assert_eq!(analysis.assignments.len(), 1);
}

#[test]
fn test_undeclared_variable_reference_degrades_to_unresolved() {
    let document = envelope(
        button_trigger(),
        json!({
            "Update": row_update("contact", json!({
                "firstname": "@variables('never_declared')",
            })),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.assignments[0].source, ValueSource::Unresolved);
    assert_eq!(analysis.source_kinds.get("firstname"), Some(&SourceKind::Unresolved));
}

#[test]
fn test_reads_aggregate_from_every_expression_position() {
    let document = envelope(
        button_trigger(),
        json!({
            "Check": condition(
                "@equals(triggerBody()['statuscode'], 1)",
                json!({
                    "Each": foreach_loop("@outputs('List_rows')?['body/value']", json!({
                        "Update": row_update("contact", json!({
                            "description": "@item()['notes']",
                        })),
                    })),
                }),
                json!({}),
            ),
        }),
    );

    let analysis = analyze(&document);
    let reads: Vec<&str> = analysis.read_attributes.iter().map(String::as_str).collect();
    assert!(reads.contains(&"statuscode"));
    assert!(reads.contains(&"value"));
    assert!(reads.contains(&"notes"));
}

#[test]
fn test_read_attributes_are_deduplicated() {
    let document = envelope(
        button_trigger(),
        json!({
            "First": row_update("contact", json!({
                "firstname": "@triggerBody()['firstname']",
            })),
            "Second": row_update("account", json!({
                "name": "@triggerBody()['firstname']",
            })),
        }),
    );

    let analysis = analyze(&document);
    let reads: Vec<&str> = analysis.read_attributes.iter().map(String::as_str).collect();
    assert_eq!(reads, vec!["firstname"]);
}

#[test]
fn test_flow_without_row_writes_has_no_set_value() {
    let document = envelope(
        recurrence_trigger(),
        json!({
            "Init": initialize_variable("counter", "0"),
            "Bump": json!({ "type": "increment-variable", "inputs": { "name": "counter", "value": 1 } }),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.trigger_type, "Scheduled");
    assert!(!analysis.has_set_value);
    assert!(analysis.assignments.is_empty());
    assert!(analysis.modified_attributes.is_empty());
    assert_eq!(analysis.action_names.len(), 2);
}

#[test]
fn test_branch_local_declaration_resolves_inside_its_arm() {
    let document = envelope(
        button_trigger(),
        json!({
            "Check": condition(
                "@empty(triggerBody()['firstname'])",
                json!({
                    "Declare": initialize_variable("fallback", "@parameters('default_name')"),
                    "Write": row_update("contact", json!({
                        "firstname": "@variables('fallback')",
                    })),
                }),
                json!({}),
            ),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.source_kinds.get("firstname"), Some(&SourceKind::Variable));
    assert_eq!(analysis.variables.len(), 1);
    assert_eq!(analysis.variables[0].name, "fallback");
}

#[test]
fn test_analysis_surfaces_final_variable_state() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "seed"),
            "Set": set_variable("v", "@triggerBody()['lastname']"),
        }),
    );

    let analysis = analyze(&document);
    assert_eq!(analysis.variables.len(), 1);
    let binding = &analysis.variables[0];
    assert_eq!(binding.name, "v");
    assert_eq!(
        binding.source,
        ValueSource::Trigger {
            field: Some("lastname".to_string())
        }
    );
}
