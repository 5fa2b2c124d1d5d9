mod analysis;
mod diagram;
mod parsing;

use serde_json::{Value, json};

/// A cloud flow clientdata document with a condition, a loop and a
/// SharePoint connection
pub fn sample_clientdata() -> Value {
    json!({
        "properties": {
            "connectionReferences": {
                "shared_sharepointonline": {
                    "api": {"name": "shared_sharepointonline"},
                    "connection": {"connectionReferenceLogicalName": "cr_sharepoint"}
                },
                "shared_approvals": {
                    "api": {"name": "shared_approvals", "displayName": "Approvals"}
                }
            },
            "definition": {
                "triggers": {
                    "When_an_item_is_created": {
                        "type": "OpenApiConnectionWebhook",
                        "inputs": {"host": {"connectionName": "shared_sharepointonline"}}
                    }
                },
                "actions": {
                    "Get_items": {
                        "type": "OpenApiConnection",
                        "inputs": {"host": {"connectionName": "shared_sharepointonline", "operationId": "GetItems"}}
                    },
                    "Apply_to_each": {
                        "type": "Foreach",
                        "foreach": "@outputs('Get_items')?['body/value']",
                        "runAfter": {"Get_items": ["Succeeded"]},
                        "actions": {
                            "Is_urgent": {
                                "type": "If",
                                "expression": {"equals": ["@items('Apply_to_each')?['Urgent']", true]},
                                "actions": {
                                    "Start_approval": {
                                        "type": "OpenApiConnection",
                                        "inputs": {"host": {"connectionName": "shared_approvals"}}
                                    },
                                    "Log_urgent": {
                                        "type": "Compose",
                                        "runAfter": {"Start_approval": ["Succeeded"]}
                                    }
                                },
                                "else": {
                                    "actions": {
                                        "Log_normal": {"type": "Compose"}
                                    }
                                }
                            }
                        }
                    },
                    "Notify_failure": {
                        "type": "OpenApiConnection",
                        "inputs": {"host": {"connectionName": "shared_approvals"}},
                        "runAfter": {"Apply_to_each": ["Failed", "TimedOut"]}
                    }
                }
            }
        }
    })
}
