//! Workflow graph analysis: parsing, issue detection and diagrams

pub mod analyzer;
pub mod diagram;
pub mod model;
pub mod parser;

pub use analyzer::{Analysis, AnalyzerConfig, analyze, analyze_workflow};
pub use diagram::{DiagramDescription, generate_diagram};
pub use model::{ActionKind, ActionNode, ActionTree, ConnectionReference, TriggerNode, Workflow};
pub use parser::{ParseOptions, ParsedActions, parse_actions, parse_workflow, parse_workflow_str};
