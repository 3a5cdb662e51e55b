//! Tests for scoped variable tracking during sequence replay.
mod common;
use common::*;
use serde_json::json;
use yurai::graph::ActionGraph;
use yurai::prelude::*;

fn replay(document: &serde_json::Value) -> (ActionGraph, VariableTracker) {
    let graph = graph_of(document);
    let engine = ExpressionEngine::new();
    let tracker = VariableTracker::replay(&graph, &engine);
    (graph, tracker)
}

#[test]
fn test_declaration_registers_binding() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("varEmail", "@triggerBody()['emailaddress1']"),
        }),
    );

    let (_, tracker) = replay(&document);
    assert_eq!(tracker.bindings().len(), 1);

    let binding = &tracker.bindings()[0];
    assert_eq!(binding.name, "varEmail");
    assert_eq!(binding.declared_in.as_deref(), Some("Init"));
    assert_eq!(binding.value_type.as_deref(), Some("string"));
    assert_eq!(
        binding.source,
        ValueSource::Trigger {
            field: Some("emailaddress1".to_string())
        }
    );
}

#[test]
fn test_lookup_sees_outer_binding_from_nested_scope() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "seed"),
            "Outer": scope(json!({
                "Use": row_update("contact", json!({ "firstname": "@variables('v')" })),
            })),
        }),
    );

    let (graph, tracker) = replay(&document);
    let user = graph.node(2).expect("nested action");
    let binding = tracker
        .lookup("v", user.index, &user.scope)
        .expect("binding should be visible");
    assert_eq!(binding.declared_in.as_deref(), Some("Init"));
}

#[test]
fn test_lookup_fails_before_declaration_point() {
    let document = envelope(
        button_trigger(),
        json!({
            "Early": row_update("contact", json!({ "firstname": "@variables('late')" })),
            "Init": initialize_variable("late", "value"),
        }),
    );

    let (graph, tracker) = replay(&document);
    let early = graph.node(0).expect("first action");
    let result = tracker.lookup("late", early.index, &early.scope);
    match result {
        Err(TrackError::UndeclaredVariable { name, action_index }) => {
            assert_eq!(name, "late");
            assert_eq!(action_index, 0);
        }
        Ok(_) => panic!("Expected lookup failure before the declaration"),
    }
}

#[test]
fn test_last_writer_wins_in_straight_line() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "static seed"),
            "Set": set_variable("v", "@outputs('Get_row')?['fullname']"),
        }),
    );

    let (graph, tracker) = replay(&document);
    let tail = graph.node(1).expect("second action");
    let binding = tracker
        .lookup("v", tail.index, &tail.scope)
        .expect("binding visible");
    assert_eq!(
        binding.source,
        ValueSource::ActionOutput {
            action: "Get_row".to_string(),
            field: Some("fullname".to_string()),
        }
    );
    assert_eq!(binding.history.len(), 1);
}

#[test]
fn test_inner_declaration_shadows_outer() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "outer"),
            "Outer": scope(json!({
                "Reinit": initialize_variable("v", "@variables('other')"),
                "Use": row_update("contact", json!({ "firstname": "@variables('v')" })),
            })),
        }),
    );

    let (graph, tracker) = replay(&document);
    let user = graph.node(3).expect("inner consumer");
    let binding = tracker
        .lookup("v", user.index, &user.scope)
        .expect("binding visible");
    // Nearest enclosing declaration wins.
    assert_eq!(binding.declared_in.as_deref(), Some("Reinit"));
}

#[test]
fn test_branch_write_does_not_escape_its_arm() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "initial"),
            "Check": condition(
                "@empty(variables('v'))",
                json!({ "Overwrite": set_variable("v", "@triggerBody()['name']") }),
                json!({ "Else_use": row_update("contact", json!({ "firstname": "@variables('v')" })) }),
            ),
            "After": row_update("contact", json!({ "lastname": "@variables('v')" })),
        }),
    );

    let (graph, tracker) = replay(&document);

    // Inside the arm the overlay classification applies.
    let overwrite = graph.node(2).expect("then-arm write");
    let in_arm = tracker
        .lookup("v", overwrite.index, &overwrite.scope)
        .expect("visible in arm");
    assert_eq!(
        in_arm.source,
        ValueSource::Trigger {
            field: Some("name".to_string())
        }
    );

    // The sibling arm and the action after the conditional still see the
    // declaration-time classification.
    let else_use = graph.node(3).expect("else-arm consumer");
    let sibling = tracker
        .lookup("v", else_use.index, &else_use.scope)
        .expect("visible in sibling arm");
    assert_eq!(sibling.source, ValueSource::Static);

    let after = graph.node(4).expect("action after the conditional");
    let outside = tracker
        .lookup("v", after.index, &after.scope)
        .expect("visible after conditional");
    assert_eq!(outside.source, ValueSource::Static);
}

#[test]
fn test_loop_body_write_updates_outer_binding() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "seed"),
            "Each": foreach_loop("@outputs('List')?['body/value']", json!({
                "Collect": set_variable("v", "@item()['cost']"),
            })),
            "After": row_update("contact", json!({ "description": "@variables('v')" })),
        }),
    );

    let (graph, tracker) = replay(&document);
    let after = graph.node(3).expect("action after the loop");
    let binding = tracker
        .lookup("v", after.index, &after.scope)
        .expect("binding visible");
    // A loop body is not a conditional arm; its write flows through.
    assert_eq!(binding.source, ValueSource::Unresolved);
    assert_eq!(tracker.bindings().len(), 1);
}

#[test]
fn test_loop_write_inside_arm_stays_visible_after_loop() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "initial"),
            "Check": condition(
                "@empty(variables('v'))",
                json!({
                    "Each": foreach_loop("@outputs('List')?['body/value']", json!({
                        "Set": set_variable("v", "@triggerBody()['emailaddress1']"),
                    })),
                    "Update": row_update("contact", json!({ "emailaddress1": "@variables('v')" })),
                }),
                json!({}),
            ),
            "After": row_update("contact", json!({ "lastname": "@variables('v')" })),
        }),
    );

    let (graph, tracker) = replay(&document);
    assert_eq!(tracker.bindings().len(), 2);

    // The overlay is pinned at the arm, not at the loop body, so the
    // same-arm action after the loop resolves the write.
    let update = graph.node(4).expect("same-arm action after the loop");
    let in_arm = tracker
        .lookup("v", update.index, &update.scope)
        .expect("visible in arm");
    assert_eq!(
        in_arm.source,
        ValueSource::Trigger {
            field: Some("emailaddress1".to_string())
        }
    );

    // It still does not leak past the conditional.
    let after = graph.node(5).expect("action after the conditional");
    let outside = tracker
        .lookup("v", after.index, &after.scope)
        .expect("visible after conditional");
    assert_eq!(outside.source, ValueSource::Static);
}

#[test]
fn test_undeclared_modification_creates_implicit_binding() {
    let document = envelope(
        button_trigger(),
        json!({
            "Set": set_variable("ghost", "@triggerBody()['phone']"),
        }),
    );

    let (graph, tracker) = replay(&document);
    assert_eq!(tracker.bindings().len(), 1);

    let binding = &tracker.bindings()[0];
    assert_eq!(binding.name, "ghost");
    assert_eq!(binding.declared_in, None);

    let node = graph.node(0).expect("the modification");
    assert!(tracker.lookup("ghost", node.index, &node.scope).is_ok());
}

#[test]
fn test_replay_is_idempotent() {
    let document = envelope(
        button_trigger(),
        json!({
            "Init": initialize_variable("v", "seed"),
            "Check": condition(
                "@empty(variables('v'))",
                json!({ "Set": set_variable("v", "@triggerBody()['name']") }),
                json!({}),
            ),
        }),
    );

    let graph = graph_of(&document);
    let engine = ExpressionEngine::new();
    let first = VariableTracker::replay(&graph, &engine);
    let second = VariableTracker::replay(&graph, &engine);
    assert_eq!(first, second);
}
