use powertools::flow::diagram::escape_label;
use powertools::flow::{ParseOptions, generate_diagram, parse_actions, parse_workflow};
use serde_json::json;

use super::sample_clientdata;

#[test]
fn test_sample_flow_diagram() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let diagram = generate_diagram(&workflow.triggers, &workflow.actions).unwrap();
    let text = diagram.to_text();

    assert_eq!(diagram.statements[0], "flowchart TD");
    assert!(text.contains("trigger_When_an_item_is_created((\"When an item is created\")):::trigger"));
    assert!(text.contains("Apply_to_each[/\"Apply to each\"/]:::loop"));
    assert!(text.contains("subgraph Apply_to_each_Body"));
    assert!(text.contains("Apply_to_each_Is_urgent{\"Is urgent\"}:::condition"));
    assert!(text.contains("subgraph Apply_to_each_Is_urgent_Yes"));
    assert!(text.contains("subgraph Apply_to_each_Is_urgent_Else"));

    assert!(text.contains("trigger_When_an_item_is_created --> Get_items"));
    assert!(text.contains("Get_items --> Apply_to_each"));
    assert!(text.contains("Apply_to_each -->|\"Failed, TimedOut\"| Notify_failure"));
    assert!(text.contains("Apply_to_each --> Apply_to_each_Is_urgent"));
    assert!(text.contains("Apply_to_each_Is_urgent -->|\"Yes\"| Apply_to_each_Is_urgent_Start_approval"));
    assert!(text.contains("Apply_to_each_Is_urgent_Start_approval --> Apply_to_each_Is_urgent_Log_urgent"));
    assert!(text.contains("Apply_to_each_Is_urgent -->|\"No\"| Apply_to_each_Is_urgent_else_Log_normal"));
}

#[test]
fn test_edges_follow_all_nodes() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let diagram = generate_diagram(&workflow.triggers, &workflow.actions).unwrap();

    let first_edge = diagram
        .statements
        .iter()
        .position(|s| s.contains("-->"))
        .unwrap();
    assert!(diagram.statements[first_edge..].iter().all(|s| s.contains("-->")));
}

#[test]
fn test_diagram_is_deterministic() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let first = generate_diagram(&workflow.triggers, &workflow.actions).unwrap();
    let second = generate_diagram(&workflow.triggers, &workflow.actions).unwrap();
    assert_eq!(first.to_text(), second.to_text());
}

#[test]
fn test_single_else_subgraph() {
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
    let text = generate_diagram(&[], &parsed.tree).unwrap().to_text();
    assert_eq!(text.matches("_Else").count(), 1);
}

#[test]
fn test_shapes_per_kind() {
    let raw = json!({
        "Run_child": {"type": "Workflow"},
        "Try": {"type": "Scope", "actions": {"Inner": {"type": "Http"}}},
        "Set_total": {"type": "SetVariable"}
    });
    let parsed = parse_actions(Some(&raw)).unwrap();
    let text = generate_diagram(&[], &parsed.tree).unwrap().to_text();

    assert!(text.contains("Run_child([\"Run child\"]):::childflow"));
    assert!(text.contains("Try([\"Try\"]):::scope"));
    assert!(text.contains("Try_Inner[\"Inner\"]:::action"));
    assert!(text.contains("Set_total>\"Set total\"]:::expression"));
}

#[test]
fn test_escape_label() {
    assert_eq!(escape_label("say \"hi\" (now)"), "say #quot;hi#quot; #40;now#41;");
    assert_eq!(escape_label("a < b > {c}"), "a #lt; b #gt; #123;c#125;");
}
