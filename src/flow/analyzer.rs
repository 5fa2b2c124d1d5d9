//! Connector usage, issue rules and recommendations

use serde::Serialize;

use super::model::{ActionNode, ConnectionReference, Workflow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Case-insensitive substrings that mark a connector as critical
    pub critical_connectors: Vec<String>,
    /// Issue fires when strictly more actions than this lack `runAfter`
    pub missing_run_after_threshold: usize,
    /// Issue fires when the flow has strictly more actions than this
    pub complexity_threshold: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            critical_connectors: ["sql", "sharepoint", "office365", "dynamics", "documentdb"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            missing_run_after_threshold: 3,
            complexity_threshold: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorUsage {
    pub connector_name: String,
    pub display_name: String,
    pub invocation_count: usize,
    pub is_critical: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    CriticalConnectors,
    MissingErrorHandling,
    FlowComplexity,
}

impl IssueKind {
    pub fn id(&self) -> &'static str {
        match self {
            IssueKind::CriticalConnectors => "critical-connectors",
            IssueKind::MissingErrorHandling => "missing-error-handling",
            IssueKind::FlowComplexity => "flow-complexity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: IssueKind,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub connectors: Vec<ConnectorUsage>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
}

pub fn analyze_workflow(workflow: &Workflow, config: &AnalyzerConfig) -> Analysis {
    analyze(&workflow.actions.flatten(), &workflow.connection_references, config)
}

pub fn analyze(actions: &[&ActionNode], references: &[ConnectionReference], config: &AnalyzerConfig) -> Analysis {
    let connectors = count_connectors(actions, references, config);

    let mut issues = Vec::new();

    let critical: Vec<&str> = connectors
        .iter()
        .filter(|usage| usage.is_critical)
        .map(|usage| usage.display_name.as_str())
        .collect();
    if !critical.is_empty() {
        issues.push(Issue {
            id: IssueKind::CriticalConnectors,
            severity: Severity::Warning,
            description: format!("Flow uses critical connectors: {}", critical.join(", ")),
            impact: "Changes to these systems can affect business data and need review".to_string(),
            location: "Connection references".to_string(),
        });
    }

    let without_run_after = actions.iter().filter(|action| !action.has_run_after()).count();
    if without_run_after > config.missing_run_after_threshold {
        issues.push(Issue {
            id: IssueKind::MissingErrorHandling,
            severity: Severity::Error,
            description: format!(
                "{} actions have no runAfter configuration",
                without_run_after
            ),
            impact: "Failures are not handled explicitly and later steps may run on bad state".to_string(),
            location: "Multiple actions".to_string(),
        });
    }

    if actions.len() > config.complexity_threshold {
        issues.push(Issue {
            id: IssueKind::FlowComplexity,
            severity: Severity::Warning,
            description: format!("Flow contains {} actions", actions.len()),
            impact: "Large flows are harder to maintain and troubleshoot".to_string(),
            location: "Entire flow".to_string(),
        });
    }

    let recommendations = recommend(&issues);
    log::debug!(
        "Analysis: {} connectors, {} issues, {} recommendations",
        connectors.len(),
        issues.len(),
        recommendations.len()
    );

    Analysis {
        connectors,
        issues,
        recommendations,
    }
}

fn count_connectors(
    actions: &[&ActionNode],
    references: &[ConnectionReference],
    config: &AnalyzerConfig,
) -> Vec<ConnectorUsage> {
    // One usage per connector, in order of first reference
    let mut usages: Vec<ConnectorUsage> = Vec::new();
    for reference in references {
        if find_usage(&usages, &reference.connector_name).is_some() {
            continue;
        }
        usages.push(ConnectorUsage {
            connector_name: reference.connector_name.clone(),
            display_name: reference.display_name.clone(),
            invocation_count: 0,
            is_critical: is_critical(&reference.connector_name, &config.critical_connectors),
        });
    }

    for action in actions {
        let name = action.connector_name();
        let connector = references.iter().find(|reference| {
            name.eq_ignore_ascii_case(&reference.connector_name) || name.eq_ignore_ascii_case(&reference.key)
        });
        if let Some(idx) = connector.and_then(|reference| find_usage(&usages, &reference.connector_name)) {
            usages[idx].invocation_count += 1;
        }
    }

    usages
}

fn find_usage(usages: &[ConnectorUsage], connector_name: &str) -> Option<usize> {
    usages
        .iter()
        .position(|usage| usage.connector_name.eq_ignore_ascii_case(connector_name))
}

fn is_critical(connector_name: &str, watchlist: &[String]) -> bool {
    let lower = connector_name.to_lowercase();
    watchlist
        .iter()
        .any(|entry| lower.contains(&entry.to_lowercase()))
}

/// Recommendations depend only on which issues fired
fn recommend(issues: &[Issue]) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = issues
        .iter()
        .map(|issue| match issue.id {
            IssueKind::CriticalConnectors => Recommendation {
                title: "Review Critical Connector Usage".to_string(),
                description: "Confirm each call to a critical system is necessary and uses least-privilege connections"
                    .to_string(),
                priority: Priority::High,
            },
            IssueKind::MissingErrorHandling => Recommendation {
                title: "Add Error Handling".to_string(),
                description: "Configure runAfter on key actions and wrap risky steps in scopes with failure branches"
                    .to_string(),
                priority: Priority::High,
            },
            IssueKind::FlowComplexity => Recommendation {
                title: "Break Down Complex Flow".to_string(),
                description: "Move related steps into child flows or scopes".to_string(),
                priority: Priority::Medium,
            },
        })
        .collect();

    recommendations.push(Recommendation {
        title: "Document the Flow".to_string(),
        description: "Add descriptions to actions and keep a summary of the flow's purpose".to_string(),
        priority: Priority::Low,
    });
    recommendations
}
