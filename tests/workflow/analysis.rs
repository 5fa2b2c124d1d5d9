use powertools::flow::analyzer::{AnalyzerConfig, IssueKind, Severity};
use powertools::flow::{ActionNode, ParseOptions, analyze, analyze_workflow, parse_actions, parse_workflow};
use serde_json::{Map, Value, json};

use super::sample_clientdata;

fn actions_without_run_after(count: usize) -> Value {
    let mut map = Map::new();
    for i in 0..count {
        map.insert(format!("Step_{:02}", i), json!({"type": "Compose"}));
    }
    Value::Object(map)
}

fn chained_actions(count: usize) -> Value {
    let mut map = Map::new();
    for i in 0..count {
        let mut action = json!({"type": "Compose"});
        if i > 0 {
            action["runAfter"] = json!({ format!("Step_{:02}", i - 1): ["Succeeded"] });
        }
        map.insert(format!("Step_{:02}", i), action);
    }
    Value::Object(map)
}

fn issue_ids(raw: &Value) -> Vec<IssueKind> {
    let parsed = parse_actions(Some(raw)).unwrap();
    analyze(&parsed.flat(), &[], &AnalyzerConfig::default())
        .issues
        .iter()
        .map(|issue| issue.id)
        .collect()
}

#[test]
fn test_empty_analysis_has_only_documentation_recommendation() {
    let analysis = analyze(&[], &[], &AnalyzerConfig::default());
    assert!(analysis.connectors.is_empty());
    assert!(analysis.issues.is_empty());
    assert_eq!(analysis.recommendations.len(), 1);
    assert_eq!(analysis.recommendations[0].title, "Document the Flow");
}

#[test]
fn test_missing_run_after_boundary() {
    assert!(issue_ids(&actions_without_run_after(3)).is_empty());
    assert_eq!(
        issue_ids(&actions_without_run_after(4)),
        vec![IssueKind::MissingErrorHandling]
    );
}

#[test]
fn test_complexity_boundary() {
    assert!(issue_ids(&chained_actions(15)).is_empty());
    assert_eq!(issue_ids(&chained_actions(16)), vec![IssueKind::FlowComplexity]);
}

#[test]
fn test_sample_flow_analysis() {
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let analysis = analyze_workflow(&workflow, &AnalyzerConfig::default());

    let connectors: Vec<(&str, usize, bool)> = analysis
        .connectors
        .iter()
        .map(|c| (c.display_name.as_str(), c.invocation_count, c.is_critical))
        .collect();
    assert_eq!(
        connectors,
        vec![("Approvals", 2, false), ("sharepointonline", 1, true)]
    );

    let issues: Vec<(IssueKind, Severity)> = analysis.issues.iter().map(|i| (i.id, i.severity)).collect();
    assert_eq!(
        issues,
        vec![
            (IssueKind::CriticalConnectors, Severity::Warning),
            (IssueKind::MissingErrorHandling, Severity::Error),
        ]
    );

    let titles: Vec<&str> = analysis.recommendations.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Review Critical Connector Usage", "Add Error Handling", "Document the Flow"]
    );
}

#[test]
fn test_custom_thresholds() {
    let config = AnalyzerConfig {
        critical_connectors: vec!["approvals".to_string()],
        missing_run_after_threshold: 10,
        complexity_threshold: 5,
    };
    let workflow = parse_workflow(&sample_clientdata(), ParseOptions::default()).unwrap();
    let analysis = analyze_workflow(&workflow, &config);

    assert!(analysis.connectors[0].is_critical);
    assert!(!analysis.connectors[1].is_critical);
    let ids: Vec<IssueKind> = analysis.issues.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![IssueKind::CriticalConnectors, IssueKind::FlowComplexity]);
}

#[test]
fn test_analysis_serializes_issue_ids() {
    let nodes: Vec<ActionNode> = (0..4).map(|i| ActionNode::new(format!("A{}", i), "Compose")).collect();
    let refs: Vec<&ActionNode> = nodes.iter().collect();
    let analysis = analyze(&refs, &[], &AnalyzerConfig::default());

    let value = serde_json::to_value(&analysis).unwrap();
    assert_eq!(value["issues"][0]["id"], "missing-error-handling");
    assert_eq!(value["issues"][0]["severity"], "Error");
    assert_eq!(value["connectors"], json!([]));
}
