pub mod handler;

use clap::{Args, Subcommand};

pub use handler::handle_mapping_command;

#[derive(Args)]
pub struct MappingCommands {
    #[command(subcommand)]
    pub command: MappingSubcommands,
}

#[derive(Subcommand)]
pub enum MappingSubcommands {
    /// List all entity name mappings
    List,
    /// Add or replace an entity name mapping
    Add {
        /// Entity logical name (singular form used in SQL and FetchXML)
        entity_name: String,
        /// Collection name used in Web API paths
        collection_name: String,
    },
    /// Remove an entity name mapping
    Remove {
        /// Entity logical name to remove
        entity_name: String,
    },
}
