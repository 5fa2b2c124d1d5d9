pub mod handler;

use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::OutputFormat;
pub use handler::handle_flow_command;

#[derive(Args)]
pub struct FlowCommands {
    #[command(subcommand)]
    pub command: FlowSubcommands,
}

#[derive(Subcommand)]
pub enum FlowSubcommands {
    /// Report connector usage, issues and recommendations
    Analyze {
        /// Flow clientdata or definition JSON file
        path: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Render the flow as a Mermaid flowchart
    Diagram {
        path: PathBuf,
        /// Write the diagram to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
