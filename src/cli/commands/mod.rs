pub mod flow;
pub mod mapping;
pub mod query;

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::Path;

pub use flow::{FlowCommands, handle_flow_command};
pub use mapping::{MappingCommands, handle_mapping_command};
pub use query::{QueryCommands, handle_query_command};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable output (default)
    Text,
    /// Pretty printed JSON
    Json,
}

/// Read command input from an argument or a file, but not both
pub(crate) fn read_input(inline: Option<String>, file: Option<&Path>, what: &str) -> Result<String> {
    match (inline, file) {
        (Some(_), Some(_)) => anyhow::bail!("Cannot specify both a {} and --file", what),
        (Some(text), None) => Ok(text),
        (None, Some(path)) => {
            if !path.exists() {
                anyhow::bail!("{} file does not exist: {}", what, path.display());
            }
            fs::read_to_string(path).with_context(|| format!("Failed to read {} file: {}", what, path.display()))
        }
        (None, None) => anyhow::bail!("Either provide a {} or use --file", what),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to format JSON output")?;
    println!("{}", output);
    Ok(())
}
