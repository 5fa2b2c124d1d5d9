//! Workflow action tree types

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Broad classification of an action's `type`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Condition,
    Loop,
    Scope,
    ApiConnection,
    Http,
    Expression,
    ChildFlow,
    Other(String),
}

impl ActionKind {
    pub fn from_type(action_type: &str) -> Self {
        match action_type.to_lowercase().as_str() {
            "if" | "condition" => ActionKind::Condition,
            "foreach" | "until" => ActionKind::Loop,
            "scope" => ActionKind::Scope,
            "openapiconnection" | "apiconnection" | "openapiconnectionwebhook" | "apiconnectionwebhook" => {
                ActionKind::ApiConnection
            }
            "http" | "httpwebhook" => ActionKind::Http,
            "compose" | "initializevariable" | "setvariable" | "incrementvariable" | "decrementvariable"
            | "appendtoarrayvariable" | "appendtostringvariable" | "parsejson" | "query" | "select" | "table"
            | "join" | "expression" => ActionKind::Expression,
            "workflow" => ActionKind::ChildFlow,
            _ => ActionKind::Other(action_type.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub id: String,
    pub action_type: String,
    pub kind: ActionKind,
    /// The action's own `kind` field, when present
    pub declared_kind: Option<String>,
    pub description: Option<String>,
    pub inputs: Option<Value>,
    pub outputs: Option<Value>,
    /// Predecessor id -> statuses that let this action run
    pub run_after: BTreeMap<String, Vec<String>>,
    pub expression: Option<Value>,
    /// Nested actions (loop/scope body, or the true branch of a condition)
    pub children: Vec<ActionNode>,
    /// False branch of a condition
    pub else_children: Vec<ActionNode>,
}

impl ActionNode {
    pub fn new(id: impl Into<String>, action_type: impl Into<String>) -> Self {
        let action_type = action_type.into();
        Self {
            id: id.into(),
            kind: ActionKind::from_type(&action_type),
            action_type,
            declared_kind: None,
            description: None,
            inputs: None,
            outputs: None,
            run_after: BTreeMap::new(),
            expression: None,
            children: Vec::new(),
            else_children: Vec::new(),
        }
    }

    pub fn has_run_after(&self) -> bool {
        !self.run_after.is_empty()
    }

    /// Connector this action calls
    ///
    /// Taken from `inputs.host` (connection name, connection reference, or the
    /// last segment of `apiId`); otherwise the part of `type` before any `/`.
    pub fn connector_name(&self) -> String {
        let host = self.inputs.as_ref().and_then(|inputs| inputs.get("host"));
        if let Some(host) = host {
            if let Some(name) = host.get("connectionName").and_then(Value::as_str) {
                return name.to_string();
            }
            if let Some(name) = host
                .get("connection")
                .and_then(|c| c.get("referenceName").or_else(|| c.get("name")))
                .and_then(Value::as_str)
            {
                return name.to_string();
            }
            if let Some(api_id) = host.get("apiId").and_then(Value::as_str) {
                return api_id.rsplit('/').next().unwrap_or(api_id).to_string();
            }
        }
        self.action_type
            .split('/')
            .next()
            .unwrap_or(&self.action_type)
            .to_string()
    }

    pub fn display_label(&self) -> String {
        self.id.replace('_', " ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerNode {
    pub id: String,
    pub trigger_type: String,
    pub declared_kind: Option<String>,
    pub inputs: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReference {
    pub key: String,
    pub connector_name: String,
    pub display_name: String,
}

/// Hierarchical view of a workflow's actions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTree {
    pub roots: Vec<ActionNode>,
}

impl ActionTree {
    pub fn new(roots: Vec<ActionNode>) -> Self {
        Self { roots }
    }

    /// Every action in pre-order: node, its children, then its else branch
    pub fn flatten(&self) -> Vec<&ActionNode> {
        let mut flat = Vec::new();
        for root in &self.roots {
            collect_preorder(root, &mut flat);
        }
        flat
    }

    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&ActionNode> {
        self.flatten().into_iter().find(|node| node.id == id)
    }
}

fn collect_preorder<'a>(node: &'a ActionNode, out: &mut Vec<&'a ActionNode>) {
    out.push(node);
    for child in &node.children {
        collect_preorder(child, out);
    }
    for child in &node.else_children {
        collect_preorder(child, out);
    }
}

/// A parsed workflow definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    pub triggers: Vec<TriggerNode>,
    pub actions: ActionTree,
    pub connection_references: Vec<ConnectionReference>,
}
