//! Mermaid flowchart generation
//!
//! Containers (conditions, loops, scopes) become a node followed by a
//! subgraph holding their children. Node ids are prefixed with the owning
//! node's id so the same local name can appear in several scopes. Every node
//! and subgraph id is claimed once; a taken id gets a `_2`, `_3`, ... suffix.
//! All edges are emitted after every node and subgraph.

use std::collections::HashSet;
use std::fmt;

use anyhow::{Result, bail};
use serde::Serialize;

use super::model::{ActionKind, ActionNode, ActionTree, TriggerNode};
use super::parser::DEFAULT_MAX_DEPTH;

const CLASS_DEFINITIONS: &[(&str, &str)] = &[
    ("trigger", "fill:#e3f2fd,stroke:#1565c0,stroke-width:2px"),
    ("condition", "fill:#fff8e1,stroke:#f9a825"),
    ("loop", "fill:#f3e5f5,stroke:#6a1b9a"),
    ("scope", "fill:#eceff1,stroke:#455a64"),
    ("expression", "fill:#e8f5e9,stroke:#2e7d32"),
    ("childflow", "fill:#fce4ec,stroke:#ad1457"),
    ("action", "fill:#ffffff,stroke:#616161"),
];

/// Words Mermaid reads as syntax when used as a bare node id
const RESERVED_IDS: &[&str] = &[
    "end", "graph", "flowchart", "subgraph", "style", "class", "classdef", "linkstyle", "click", "direction",
];

/// Ordered Mermaid statements, one per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramDescription {
    pub statements: Vec<String>,
}

impl DiagramDescription {
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DiagramDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.statements.join("\n"))
    }
}

pub fn generate_diagram(triggers: &[TriggerNode], tree: &ActionTree) -> Result<DiagramDescription> {
    generate_diagram_with_depth(triggers, tree, DEFAULT_MAX_DEPTH)
}

pub fn generate_diagram_with_depth(
    triggers: &[TriggerNode],
    tree: &ActionTree,
    max_depth: usize,
) -> Result<DiagramDescription> {
    let mut generator = DiagramGenerator::new(max_depth);
    generator.generate(triggers, tree)?;
    log::debug!(
        "Generated diagram with {} statements",
        generator.statements.len()
    );
    Ok(DiagramDescription {
        statements: generator.statements,
    })
}

/// Where the entry points of a scope are connected from
enum ScopeEntry<'a> {
    Triggers(&'a [String]),
    Owner { id: String, label: Option<&'static str> },
}

struct DiagramGenerator {
    statements: Vec<String>,
    edges: Vec<String>,
    used_ids: HashSet<String>,
    indent_level: usize,
    max_depth: usize,
}

impl DiagramGenerator {
    fn new(max_depth: usize) -> Self {
        Self {
            statements: Vec::new(),
            edges: Vec::new(),
            used_ids: HashSet::new(),
            indent_level: 0,
            max_depth,
        }
    }

    fn generate(&mut self, triggers: &[TriggerNode], tree: &ActionTree) -> Result<()> {
        self.add_line("flowchart TD");
        self.indent();

        for (class, style) in CLASS_DEFINITIONS {
            self.add_line(&format!("classDef {} {}", class, style));
        }

        let trigger_ids: Vec<String> = triggers
            .iter()
            .map(|trigger| self.claim_id(format!("trigger_{}", sanitize_id(&trigger.id))))
            .collect();
        for (trigger, id) in triggers.iter().zip(&trigger_ids) {
            let label = escape_label(&trigger.id.replace('_', " "));
            self.add_line(&format!("{}((\"{}\")):::trigger", id, label));
        }

        self.render_scope(&tree.roots, "", ScopeEntry::Triggers(&trigger_ids), 1)?;

        let edges = std::mem::take(&mut self.edges);
        for edge in &edges {
            self.add_line(edge);
        }
        self.unindent();
        Ok(())
    }

    fn render_scope(&mut self, nodes: &[ActionNode], prefix: &str, entry: ScopeEntry, depth: usize) -> Result<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        if depth > self.max_depth {
            bail!(
                "Diagram nesting exceeds the maximum depth of {} levels",
                self.max_depth
            );
        }

        // Siblings claim their ids before any nested scope does
        let ids: Vec<String> = nodes
            .iter()
            .map(|node| self.claim_id(node_id(prefix, &node.id)))
            .collect();

        for (node, id) in nodes.iter().zip(&ids) {
            self.render_node(node, id, depth)?;
        }

        for (node, id) in nodes.iter().zip(&ids) {
            if !node.has_run_after() {
                self.connect_from_entry(&entry, id);
                continue;
            }

            let mut used_fallback = false;
            for (predecessor, statuses) in &node.run_after {
                if let Some(idx) = nodes.iter().position(|sibling| sibling.id == *predecessor) {
                    self.add_edge(&ids[idx], id, status_label(statuses));
                } else {
                    log::warn!(
                        "runAfter '{}' of '{}' is outside its scope; connecting from the scope entry",
                        predecessor,
                        node.id
                    );
                    if !used_fallback {
                        self.connect_from_entry(&entry, id);
                        used_fallback = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn render_node(&mut self, node: &ActionNode, id: &str, depth: usize) -> Result<()> {
        let label = escape_label(&node.display_label());

        let statement = match &node.kind {
            ActionKind::Condition => format!("{}{{\"{}\"}}:::condition", id, label),
            ActionKind::Loop => format!("{}[/\"{}\"/]:::loop", id, label),
            ActionKind::Scope => format!("{}([\"{}\"]):::scope", id, label),
            ActionKind::Expression => format!("{}>\"{}\"]:::expression", id, label),
            ActionKind::ChildFlow => format!("{}([\"{}\"]):::childflow", id, label),
            ActionKind::ApiConnection | ActionKind::Http | ActionKind::Other(_) => {
                format!("{}[\"{}\"]:::action", id, label)
            }
        };
        self.add_line(&statement);

        match &node.kind {
            ActionKind::Condition => {
                self.render_subgraph(&format!("{}_Yes", id), "If yes", &node.children, &format!("{}_", id), id, Some("Yes"), depth)?;
                self.render_subgraph(
                    &format!("{}_Else", id),
                    "If no",
                    &node.else_children,
                    &format!("{}_else_", id),
                    id,
                    Some("No"),
                    depth,
                )?;
            }
            ActionKind::Loop | ActionKind::Scope => {
                let title = format!("{} body", node.display_label());
                self.render_subgraph(&format!("{}_Body", id), &title, &node.children, &format!("{}_", id), id, None, depth)?;
            }
            _ => {}
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn render_subgraph(
        &mut self,
        subgraph_id: &str,
        title: &str,
        children: &[ActionNode],
        prefix: &str,
        owner: &str,
        label: Option<&'static str>,
        depth: usize,
    ) -> Result<()> {
        if children.is_empty() {
            return Ok(());
        }

        let subgraph_id = self.claim_id(subgraph_id.to_string());
        self.add_line(&format!("subgraph {} [\"{}\"]", subgraph_id, escape_label(title)));
        self.indent();
        self.add_line("direction TB");
        let entry = ScopeEntry::Owner {
            id: owner.to_string(),
            label,
        };
        self.render_scope(children, prefix, entry, depth + 1)?;
        self.unindent();
        self.add_line("end");
        Ok(())
    }

    fn claim_id(&mut self, base: String) -> String {
        if self.used_ids.insert(base.clone()) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if self.used_ids.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn connect_from_entry(&mut self, entry: &ScopeEntry, to: &str) {
        match entry {
            ScopeEntry::Triggers(ids) => {
                for trigger in ids.iter() {
                    self.add_edge(trigger, to, None);
                }
            }
            ScopeEntry::Owner { id, label } => {
                let id = id.clone();
                self.add_edge(&id, to, label.map(str::to_string));
            }
        }
    }

    fn add_edge(&mut self, from: &str, to: &str, label: Option<String>) {
        let edge = match label {
            Some(label) => format!("{} -->|\"{}\"| {}", from, escape_label(&label), to),
            None => format!("{} --> {}", from, to),
        };
        self.edges.push(edge);
    }

    fn add_line(&mut self, content: &str) {
        self.statements
            .push(format!("{}{}", "    ".repeat(self.indent_level), content));
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn unindent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

/// Label for a runAfter edge; plain success gets none
fn status_label(statuses: &[String]) -> Option<String> {
    match statuses {
        [] => None,
        [only] if only.eq_ignore_ascii_case("Succeeded") => None,
        many => Some(many.join(", ")),
    }
}

fn node_id(prefix: &str, local_id: &str) -> String {
    let id = format!("{}{}", prefix, sanitize_id(local_id));
    if id.is_empty() {
        "action".to_string()
    } else if RESERVED_IDS.iter().any(|word| id.eq_ignore_ascii_case(word)) {
        format!("{}_", id)
    } else {
        id
    }
}

pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Escape characters that are structural inside a quoted Mermaid label
pub fn escape_label(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '#' => escaped.push_str("#35;"),
            '"' => escaped.push_str("#quot;"),
            '[' => escaped.push_str("#91;"),
            ']' => escaped.push_str("#93;"),
            '{' => escaped.push_str("#123;"),
            '}' => escaped.push_str("#125;"),
            '(' => escaped.push_str("#40;"),
            ')' => escaped.push_str("#41;"),
            '<' => escaped.push_str("#lt;"),
            '>' => escaped.push_str("#gt;"),
            '|' => escaped.push_str("#124;"),
            '\n' | '\r' => escaped.push(' '),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> TriggerNode {
        TriggerNode {
            id: "manual".to_string(),
            trigger_type: "Request".to_string(),
            declared_kind: Some("Button".to_string()),
            inputs: None,
        }
    }

    fn after(mut node: ActionNode, predecessor: &str, statuses: &[&str]) -> ActionNode {
        node.run_after.insert(
            predecessor.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
        node
    }

    #[test]
    fn test_simple_chain() {
        let tree = ActionTree::new(vec![
            ActionNode::new("Get_items", "OpenApiConnection"),
            after(ActionNode::new("Compose", "Compose"), "Get_items", &["Succeeded"]),
            after(ActionNode::new("Notify", "OpenApiConnection"), "Get_items", &["Failed", "TimedOut"]),
        ]);
        let text = generate_diagram(&[trigger()], &tree).unwrap().to_text();

        assert!(text.starts_with("flowchart TD"));
        assert!(text.contains("    trigger_manual((\"manual\")):::trigger"));
        assert!(text.contains("    Get_items[\"Get items\"]:::action"));
        assert!(text.contains("    Compose>\"Compose\"]:::expression"));
        assert!(text.contains("    trigger_manual --> Get_items"));
        assert!(text.contains("    Get_items --> Compose"));
        assert!(text.contains("    Get_items -->|\"Failed, TimedOut\"| Notify"));
    }

    #[test]
    fn test_nested_scopes_are_prefixed() {
        let mut condition = ActionNode::new("Check", "If");
        condition.children.push(ActionNode::new("Step", "Compose"));
        condition.else_children.push(ActionNode::new("Step", "Compose"));
        let mut scope = ActionNode::new("Try", "Scope");
        scope.children.push(ActionNode::new("Step", "Compose"));
        let tree = ActionTree::new(vec![condition, scope]);

        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert!(text.contains("subgraph Check_Yes [\"If yes\"]"));
        assert!(text.contains("subgraph Check_Else [\"If no\"]"));
        assert!(text.contains("subgraph Try_Body [\"Try body\"]"));
        assert!(text.contains("Check_Step>"));
        assert!(text.contains("Check_else_Step>"));
        assert!(text.contains("Try_Step>"));
        assert!(text.contains("Check -->|\"Yes\"| Check_Step"));
        assert!(text.contains("Check -->|\"No\"| Check_else_Step"));
        assert!(text.contains("Try --> Try_Step"));
        assert_eq!(text.matches("_Else").count(), 1);
    }

    #[test]
    fn test_cross_scope_run_after_falls_back_to_owner() {
        let mut scope = ActionNode::new("Scope", "Scope");
        scope.children.push(after(ActionNode::new("Inner", "Compose"), "Outside", &["Succeeded"]));
        let tree = ActionTree::new(vec![ActionNode::new("Outside", "Compose"), scope]);

        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert!(text.contains("Scope --> Scope_Inner"));
        assert!(!text.contains("Outside --> Scope_Inner"));
    }

    #[test]
    fn test_labels_are_escaped_and_ids_sanitized() {
        let tree = ActionTree::new(vec![ActionNode::new("Send \"mail\" [v2]", "Http"), ActionNode::new("end", "Http")]);
        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert!(text.contains("Sendmailv2[\"Send #quot;mail#quot; #91;v2#93;\"]:::action"));
        assert!(text.contains("end_[\"end\"]:::action"));
    }

    #[test]
    fn test_prefixed_ids_do_not_collide_with_top_level_names() {
        let mut condition = ActionNode::new("Check", "If");
        condition.children.push(ActionNode::new("Step", "Compose"));
        let tree = ActionTree::new(vec![condition, ActionNode::new("Check_Step", "Http")]);

        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert_eq!(text.matches("Check_Step[").count(), 1);
        assert!(text.contains("Check_Step[\"Check Step\"]:::action"));
        assert!(text.contains("Check_Step_2>\"Step\"]:::expression"));
        assert!(text.contains("Check -->|\"Yes\"| Check_Step_2"));
    }

    #[test]
    fn test_subgraph_ids_do_not_collide_with_actions() {
        let mut condition = ActionNode::new("Check", "If");
        condition.children.push(ActionNode::new("Step", "Compose"));
        let tree = ActionTree::new(vec![condition, ActionNode::new("Check_Yes", "Http")]);

        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert!(text.contains("Check_Yes[\"Check Yes\"]:::action"));
        assert!(text.contains("subgraph Check_Yes_2 [\"If yes\"]"));
        assert!(!text.contains("subgraph Check_Yes ["));
    }

    #[test]
    fn test_reserved_words_and_hash_in_labels() {
        let tree = ActionTree::new(vec![
            ActionNode::new("style", "Http"),
            ActionNode::new("Class", "Http"),
            ActionNode::new("Item #1", "Http"),
        ]);
        let text = generate_diagram(&[], &tree).unwrap().to_text();
        assert!(text.contains("style_[\"style\"]:::action"));
        assert!(text.contains("Class_[\"Class\"]:::action"));
        assert!(text.contains("Item1[\"Item #35;1\"]:::action"));
    }

    #[test]
    fn test_depth_limit() {
        let mut node = ActionNode::new("Leaf", "Compose");
        for level in 0..4 {
            let mut scope = ActionNode::new(format!("Scope_{}", level), "Scope");
            scope.children.push(node);
            node = scope;
        }
        let tree = ActionTree::new(vec![node]);
        assert!(generate_diagram_with_depth(&[], &tree, 5).is_ok());
        assert!(generate_diagram_with_depth(&[], &tree, 4).is_err());
    }
}
