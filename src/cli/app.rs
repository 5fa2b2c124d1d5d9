use super::commands::flow::FlowCommands;
use super::commands::mapping::MappingCommands;
use super::commands::query::QueryCommands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "powertools")]
#[command(about = "Query conversion and cloud flow analysis for Dataverse")]
pub struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert between SQL, OData and FetchXML, and inspect query context
    Query(QueryCommands),
    /// Analyze cloud flow definitions and draw them as diagrams
    Flow(FlowCommands),
    /// Manage entity name to collection name mappings
    Mapping(MappingCommands),
}
