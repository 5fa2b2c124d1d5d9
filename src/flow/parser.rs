//! Workflow definition parsing
//!
//! Accepts the `clientdata` of a cloud flow (as a JSON object or the string
//! it is stored as), `{"definition": ...}`, or a bare definition with
//! `triggers` and `actions` maps.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use super::model::{ActionKind, ActionNode, ActionTree, ConnectionReference, TriggerNode, Workflow};

pub const DEFAULT_MAX_DEPTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parsed action map in both hierarchical and flat form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedActions {
    pub tree: ActionTree,
}

impl ParsedActions {
    pub fn flat(&self) -> Vec<&ActionNode> {
        self.tree.flatten()
    }
}

pub fn parse_actions(raw: Option<&Value>) -> Result<ParsedActions> {
    parse_actions_with(raw, ParseOptions::default())
}

/// Build the action tree from a definition's `actions` map
///
/// A missing or non-object map yields an empty tree. Entries that are not
/// objects are skipped. Nesting deeper than `options.max_depth` is an error.
pub fn parse_actions_with(raw: Option<&Value>, options: ParseOptions) -> Result<ParsedActions> {
    let roots = parse_action_map(raw, 1, options)?;
    let parsed = ParsedActions {
        tree: ActionTree::new(roots),
    };
    log::debug!("Parsed {} actions", parsed.tree.len());
    Ok(parsed)
}

fn parse_action_map(raw: Option<&Value>, depth: usize, options: ParseOptions) -> Result<Vec<ActionNode>> {
    let Some(map) = raw.and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    if map.is_empty() {
        return Ok(Vec::new());
    }
    if depth > options.max_depth {
        bail!(
            "Action nesting exceeds the maximum depth of {} levels",
            options.max_depth
        );
    }

    let mut nodes = Vec::with_capacity(map.len());
    for (id, entry) in map {
        let Some(action) = entry.as_object() else {
            log::warn!("Skipping action '{}': definition is not an object", id);
            continue;
        };
        nodes.push(parse_action(id, action, depth, options)?);
    }
    Ok(nodes)
}

fn parse_action(id: &str, action: &Map<String, Value>, depth: usize, options: ParseOptions) -> Result<ActionNode> {
    let action_type = string_field(action, "type").unwrap_or_default();
    let kind = ActionKind::from_type(&action_type);

    let children = parse_action_map(action.get("actions"), depth + 1, options)
        .with_context(|| format!("In action '{}'", id))?;
    let else_children = parse_action_map(
        action.get("else").and_then(|branch| branch.get("actions")),
        depth + 1,
        options,
    )
    .with_context(|| format!("In else branch of '{}'", id))?;

    Ok(ActionNode {
        id: id.to_string(),
        action_type,
        kind,
        declared_kind: string_field(action, "kind"),
        description: string_field(action, "description"),
        inputs: action.get("inputs").cloned(),
        outputs: action.get("outputs").cloned(),
        run_after: parse_run_after(action.get("runAfter")),
        expression: action.get("expression").cloned(),
        children,
        else_children,
    })
}

/// `runAfter` is normally `{pred: [statuses]}`; a plain list of ids means
/// each predecessor must have succeeded
fn parse_run_after(raw: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    match raw {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(predecessor, statuses)| {
                let statuses = statuses
                    .as_array()
                    .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                (predecessor.clone(), statuses)
            })
            .collect(),
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(|predecessor| (predecessor.to_string(), vec!["Succeeded".to_string()]))
            .collect(),
        _ => BTreeMap::new(),
    }
}

pub fn parse_triggers(raw: Option<&Value>) -> Vec<TriggerNode> {
    let Some(map) = raw.and_then(Value::as_object) else {
        return Vec::new();
    };

    map.iter()
        .filter_map(|(id, entry)| {
            let Some(trigger) = entry.as_object() else {
                log::warn!("Skipping trigger '{}': definition is not an object", id);
                return None;
            };
            Some(TriggerNode {
                id: id.clone(),
                trigger_type: string_field(trigger, "type").unwrap_or_default(),
                declared_kind: string_field(trigger, "kind"),
                inputs: trigger.get("inputs").cloned(),
            })
        })
        .collect()
}

pub fn parse_connection_references(raw: Option<&Value>) -> Vec<ConnectionReference> {
    let Some(map) = raw.and_then(Value::as_object) else {
        return Vec::new();
    };

    map.iter()
        .map(|(key, entry)| {
            let api = entry.get("api");
            let connector_name = api
                .and_then(|api| api.get("name"))
                .and_then(Value::as_str)
                .or_else(|| entry.get("connectorName").and_then(Value::as_str))
                .unwrap_or(key)
                .to_string();
            let display_name = entry
                .get("displayName")
                .or_else(|| api.and_then(|api| api.get("displayName")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    connector_name
                        .strip_prefix("shared_")
                        .unwrap_or(&connector_name)
                        .to_string()
                });
            ConnectionReference {
                key: key.clone(),
                connector_name,
                display_name,
            }
        })
        .collect()
}

/// Parse a whole workflow document
pub fn parse_workflow(document: &Value, options: ParseOptions) -> Result<Workflow> {
    let decoded;
    let document = match document {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).context("Workflow clientdata is not valid JSON")?;
            &decoded
        }
        other => other,
    };

    if !document.is_object() {
        bail!("Workflow document must be a JSON object");
    }

    let properties = document.get("properties");
    let definition = properties
        .and_then(|p| p.get("definition"))
        .or_else(|| document.get("definition"))
        .unwrap_or(document);
    let references = properties
        .and_then(|p| p.get("connectionReferences"))
        .or_else(|| document.get("connectionReferences"));

    let workflow = Workflow {
        triggers: parse_triggers(definition.get("triggers")),
        actions: parse_actions_with(definition.get("actions"), options)?.tree,
        connection_references: parse_connection_references(references),
    };
    log::info!(
        "Parsed workflow: {} triggers, {} actions, {} connection references",
        workflow.triggers.len(),
        workflow.actions.len(),
        workflow.connection_references.len()
    );
    Ok(workflow)
}

pub fn parse_workflow_str(json: &str, options: ParseOptions) -> Result<Workflow> {
    let document: Value = serde_json::from_str(json).context("Failed to parse workflow JSON")?;
    parse_workflow(&document, options)
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(depth: usize) -> Value {
        let mut actions = json!({"Leaf": {"type": "Compose"}});
        for level in 0..depth.saturating_sub(1) {
            actions = json!({ format!("Scope_{}", level): {"type": "Scope", "actions": actions} });
        }
        actions
    }

    #[test]
    fn test_missing_actions_is_empty() {
        assert!(parse_actions(None).unwrap().tree.is_empty());
        assert!(parse_actions(Some(&json!("nope"))).unwrap().tree.is_empty());
    }

    #[test]
    fn test_condition_branches() {
        let raw = json!({
            "Check": {
                "type": "If",
                "expression": {"equals": [1, 1]},
                "actions": {"Yes_step": {"type": "Compose"}},
                "else": {"actions": {"No_step": {"type": "Compose"}}}
            },
            "After": {"type": "Compose", "runAfter": {"Check": ["Succeeded", "Failed"]}}
        });
        let parsed = parse_actions(Some(&raw)).unwrap();
        let check = parsed.tree.find("Check").unwrap();
        assert_eq!(check.children[0].id, "Yes_step");
        assert_eq!(check.else_children[0].id, "No_step");
        assert!(check.expression.is_some());
        assert_eq!(parsed.flat().len(), 4);
        assert_eq!(
            parsed.tree.find("After").unwrap().run_after["Check"],
            vec!["Succeeded", "Failed"]
        );
    }

    #[test]
    fn test_non_object_entries_skipped() {
        let raw = json!({"Good": {"type": "Compose"}, "Bad": 42});
        let parsed = parse_actions(Some(&raw)).unwrap();
        assert_eq!(parsed.flat().len(), 1);
    }

    #[test]
    fn test_run_after_list_form() {
        let raw = json!({"B": {"type": "Compose", "runAfter": ["A"]}});
        let parsed = parse_actions(Some(&raw)).unwrap();
        assert_eq!(parsed.tree.roots[0].run_after["A"], vec!["Succeeded"]);
    }

    #[test]
    fn test_depth_limit() {
        let options = ParseOptions { max_depth: 5 };
        assert_eq!(parse_actions_with(Some(&nested(5)), options).unwrap().flat().len(), 5);
        assert!(parse_actions_with(Some(&nested(6)), options).is_err());
    }

    #[test]
    fn test_workflow_envelopes() {
        let definition = json!({
            "triggers": {"manual": {"type": "Request", "kind": "Button"}},
            "actions": {"Compose": {"type": "Compose"}}
        });
        let clientdata = json!({
            "properties": {
                "definition": definition,
                "connectionReferences": {
                    "shared_sql": {"api": {"name": "shared_sql"}}
                }
            }
        });

        let workflow = parse_workflow(&clientdata, ParseOptions::default()).unwrap();
        assert_eq!(workflow.triggers[0].declared_kind.as_deref(), Some("Button"));
        assert_eq!(workflow.connection_references[0].display_name, "sql");

        let as_string = Value::String(clientdata.to_string());
        assert_eq!(parse_workflow(&as_string, ParseOptions::default()).unwrap(), workflow);

        let bare = parse_workflow(&definition, ParseOptions::default()).unwrap();
        assert_eq!(bare.actions, workflow.actions);
        assert!(bare.connection_references.is_empty());

        assert!(parse_workflow(&json!("{not json"), ParseOptions::default()).is_err());
    }
}
