//! Tests for the two-phase expression engine: fast recognizer, grammar
//! parser, and provenance classification.
use yurai::expr::parser::{parse_expression, parse_template};
use yurai::expr::{ExprNode, LiteralValue, MAX_EXPRESSION_DEPTH, PropertyKey, recognize};
use yurai::prelude::*;

fn classify(raw: &str) -> Classification {
    ExpressionEngine::new().classify(raw)
}

#[test]
fn test_variable_reference_classifies_as_variable() {
    let classification = classify("@variables('v1')");
    assert_eq!(
        classification.source,
        ValueSource::Variable {
            name: "v1".to_string()
        }
    );
    assert!(classification.reads.is_empty());
}

#[test]
fn test_plain_text_classifies_as_static() {
    let classification = classify("someone@example.com");
    assert_eq!(classification.source, ValueSource::Static);
}

#[test]
fn test_action_output_field_reference() {
    let classification = classify("@outputs('Get_a_row')?['lastname']");
    assert_eq!(
        classification.source,
        ValueSource::ActionOutput {
            action: "Get_a_row".to_string(),
            field: Some("lastname".to_string()),
        }
    );
    assert_eq!(classification.reads, ["lastname"]);
}

#[test]
fn test_trigger_field_reference_records_read() {
    let classification = classify("@triggerBody()['firstname']");
    assert_eq!(
        classification.source,
        ValueSource::Trigger {
            field: Some("firstname".to_string())
        }
    );
    assert_eq!(classification.reads, ["firstname"]);
}

#[test]
fn test_body_prefix_is_stripped_from_selectors() {
    let classification = classify("@triggerOutputs()?['body/accountid']");
    assert_eq!(
        classification.source,
        ValueSource::Trigger {
            field: Some("accountid".to_string())
        }
    );

    let classification = classify("@outputs('Get_a_row')?['body/lastname']");
    assert_eq!(classification.source.field_ref(), Some("lastname"));
    assert_eq!(classification.reads, ["lastname"]);
}

#[test]
fn test_parameter_reference() {
    let classification = classify("@parameters('admin_email')");
    assert_eq!(
        classification.source,
        ValueSource::Parameter {
            name: "admin_email".to_string()
        }
    );
}

#[test]
fn test_loop_item_is_unresolved_but_read_is_kept() {
    let classification = classify("@item()['cost']");
    assert_eq!(classification.source, ValueSource::Unresolved);
    assert_eq!(classification.reads, ["cost"]);
}

#[test]
fn test_escaped_at_sign_is_static() {
    assert_eq!(classify("@@not_an_expression").source, ValueSource::Static);
    assert_eq!(classify("").source, ValueSource::Static);
}

#[test]
fn test_composed_expression_first_non_static_wins() {
    let classification = classify("@concat(variables('a'), '-suffix')");
    assert_eq!(
        classification.source,
        ValueSource::Variable {
            name: "a".to_string()
        }
    );

    let classification = classify("@concat('prefix-', triggerBody()['email'])");
    assert_eq!(
        classification.source,
        ValueSource::Trigger {
            field: Some("email".to_string())
        }
    );
    assert_eq!(classification.reads, ["email"]);
}

#[test]
fn test_all_static_composition_stays_static() {
    let classification = classify("@concat('a', 'b', 'c')");
    assert_eq!(classification.source, ValueSource::Static);

    let classification = classify("@toUpper('hello')");
    assert_eq!(classification.source, ValueSource::Static);
}

#[test]
fn test_unknown_function_delegates_to_first_non_static_argument() {
    let classification = classify("@coalesce(outputs('Get_a_row')?['fax'], 'none')");
    assert_eq!(
        classification.source,
        ValueSource::ActionOutput {
            action: "Get_a_row".to_string(),
            field: Some("fax".to_string()),
        }
    );
}

#[test]
fn test_interpolation_template_concatenates_parts() {
    let classification = classify("Re: @{variables('subject')}");
    assert_eq!(
        classification.source,
        ValueSource::Variable {
            name: "subject".to_string()
        }
    );

    // First non-static part decides for multi-part templates as well.
    let classification = classify("@{triggerBody()['a']} and @{variables('b')}");
    assert_eq!(
        classification.source,
        ValueSource::Trigger {
            field: Some("a".to_string())
        }
    );
    assert_eq!(classification.reads, ["a"]);
}

#[test]
fn test_recognizer_reports_phase_outcomes() {
    assert!(matches!(
        recognize("@variables('x')"),
        PhaseOutcome::Recognized(_)
    ));
    // Composed text must fall through to the grammar parser.
    assert!(matches!(
        recognize("@concat(variables('x'), 'y')"),
        PhaseOutcome::NeedsFullParse
    ));
}

#[test]
fn test_recognizer_and_parser_agree_on_fast_shapes() {
    let engine = ExpressionEngine::new();
    for raw in [
        "@variables('v1')",
        "@triggerBody()['firstname']",
        "@outputs('Get_a_row')?['body/lastname']",
        "@parameters('admin_email')",
    ] {
        let fast = match recognize(raw) {
            PhaseOutcome::Recognized(classification) => classification,
            other => panic!("Expected fast recognition for {}, got {:?}", raw, other),
        };
        let slow = match engine.full_parse(raw) {
            PhaseOutcome::Recognized(classification) => classification,
            other => panic!("Expected grammar parse for {}, got {:?}", raw, other),
        };
        assert_eq!(fast, slow, "phases disagree on {}", raw);
    }
}

#[test]
fn test_phases_agree_on_pure_literals() {
    let engine = ExpressionEngine::new();
    for raw in ["@true", "@-12.5", "@'plain text'"] {
        // The fast path must fall through rather than misread a literal.
        assert!(matches!(recognize(raw), PhaseOutcome::NeedsFullParse));
        match engine.full_parse(raw) {
            PhaseOutcome::Recognized(classification) => {
                assert_eq!(classification.source, ValueSource::Static, "for {}", raw);
            }
            other => panic!("Expected a grammar parse for {}, got {:?}", raw, other),
        }
    }
}

#[test]
fn test_depth_guard_fails_safe() {
    let depth = MAX_EXPRESSION_DEPTH + 8;
    let raw = format!("@{}1{}", "concat(".repeat(depth), ")".repeat(depth));

    match parse_expression(&raw) {
        Err(ExpressionError::TooComplex { limit }) => {
            assert_eq!(limit, MAX_EXPRESSION_DEPTH);
        }
        other => panic!("Expected TooComplex, got {:?}", other),
    }

    // The engine degrades the same text to unresolved instead of failing.
    assert_eq!(classify(&raw).source, ValueSource::Unresolved);
}

#[test]
fn test_unterminated_string_reports_offset() {
    match parse_expression("@variables('open") {
        Err(ExpressionError::UnterminatedString { offset }) => assert_eq!(offset, 11),
        other => panic!("Expected UnterminatedString, got {:?}", other),
    }
}

#[test]
fn test_trailing_input_is_a_syntax_error() {
    assert!(matches!(
        parse_expression("@variables('a') extra"),
        Err(ExpressionError::Syntax { .. })
    ));
    assert!(matches!(
        parse_expression("@outputs('A'"),
        Err(ExpressionError::Syntax { .. })
    ));
}

#[test]
fn test_parser_builds_accessor_chains() {
    let node = parse_expression("@triggerOutputs()?['body/value'][0].name")
        .expect("Failed to parse accessor chain");

    let expected = ExprNode::call("triggerOutputs", vec![])
        .index(PropertyKey::Name("body/value".to_string()))
        .index(PropertyKey::Index(0))
        .index(PropertyKey::Name("name".to_string()));
    assert_eq!(node, expected);
}

#[test]
fn test_parser_handles_literals_and_keywords() {
    assert_eq!(
        parse_expression("@true").expect("bool literal"),
        ExprNode::Literal(LiteralValue::Bool(true))
    );
    assert_eq!(
        parse_expression("@null").expect("null literal"),
        ExprNode::Literal(LiteralValue::Null)
    );
    assert_eq!(
        parse_expression("@-12.5").expect("number literal"),
        ExprNode::Literal(LiteralValue::Number(-12.5))
    );
}

#[test]
fn test_template_collapses_single_expression() {
    let node = parse_template("@{variables('only')}").expect("Failed to parse template");
    assert_eq!(
        node,
        ExprNode::call(
            "variables",
            vec![ExprNode::Literal(LiteralValue::Text("only".to_string()))]
        )
    );

    let node = parse_template("a@{variables('x')}b").expect("Failed to parse template");
    assert!(matches!(node, ExprNode::Concat(ref parts) if parts.len() == 3));
}

#[test]
fn test_non_string_values_classify_as_static() {
    let engine = ExpressionEngine::new();
    assert_eq!(
        engine.classify_value(&serde_json::json!(42)).source,
        ValueSource::Static
    );
    assert_eq!(
        engine.classify_value(&serde_json::json!(true)).source,
        ValueSource::Static
    );
}
