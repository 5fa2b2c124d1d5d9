use powertools::flow::{ActionKind, ParseOptions, parse_actions, parse_workflow, parse_workflow_str};
use serde_json::json;

use super::sample_clientdata;

#[test]
fn test_parse_clientdata() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();

    assert_eq!(workflow.triggers.len(), 1);
    assert_eq!(workflow.triggers[0].id, "When_an_item_is_created");
    assert_eq!(workflow.connection_references.len(), 2);
    assert_eq!(workflow.actions.roots.len(), 3);

    let loop_node = workflow.actions.find("Apply_to_each").unwrap();
    assert_eq!(loop_node.kind, ActionKind::Loop);
    assert_eq!(loop_node.children.len(), 1);

    let condition = &loop_node.children[0];
    assert_eq!(condition.kind, ActionKind::Condition);
    assert_eq!(condition.children.len(), 2);
    assert_eq!(condition.else_children.len(), 1);
}

#[test]
fn test_flatten_counts_every_depth() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let ids: Vec<&str> = workflow.actions.flatten().iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "Apply_to_each",
            "Is_urgent",
            "Log_urgent",
            "Start_approval",
            "Log_normal",
            "Get_items",
            "Notify_failure"
        ]
    );
}

#[test]
fn test_condition_with_else_flattens_to_four() {
    let raw = json!({
        "Check_amount": {
            "type": "If",
            "actions": {
                "Approve": {"type": "Compose"},
                "Notify": {"type": "Compose", "runAfter": {"Approve": ["Succeeded"]}}
            },
            "else": {"actions": {"Reject": {"type": "Compose"}}}
        }
    });
    let parsed = parse_actions(Some(&raw)).unwrap();
    assert_eq!(parsed.flat().len(), 4);
}

#[test]
fn test_clientdata_as_string() {
    let text = sample_clientdata().to_string();
    let from_str = parse_workflow_str(&text, ParseOptions::default()).unwrap();
    let from_string_value =
        parse_workflow(&serde_json::Value::String(text), ParseOptions::default()).unwrap();
    assert_eq!(from_str, from_string_value);
}

#[test]
fn test_unknown_action_types_pass_through() {
    let raw = json!({"Stop": {"type": "Terminate", "inputs": {"runStatus": "Failed"}}});
    let parsed = parse_actions(Some(&raw)).unwrap();
    let node = parsed.flat()[0];
    assert_eq!(node.kind, ActionKind::Other("Terminate".to_string()));
    assert_eq!(node.action_type, "Terminate");
}

#[test]
fn test_nesting_past_limit_fails() {
    let mut actions = json!({"Leaf": {"type": "Compose"}});
    for level in 0..60 {
        actions = json!({ format!("Scope_{}", level): {"type": "Scope", "actions": actions} });
    }
    let document = json!({"definition": {"actions": actions}});

    let err = parse_workflow(&document, ParseOptions::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("maximum depth of 50"));

    let deep = ParseOptions { max_depth: 100 };
    let workflow = parse_workflow(&document, deep).unwrap();
    assert_eq!(workflow.actions.len(), 61);
}

#[test]
fn test_non_object_document_fails() {
    assert!(parse_workflow(&json!([1, 2, 3]), ParseOptions::default()).is_err());
    assert!(parse_workflow_str("{broken", ParseOptions::default()).is_err());
}
