//! Entity name mapping commands

use anyhow::Result;
use colored::*;
use std::path::Path;

use powertools::config::Config;

use super::{MappingCommands, MappingSubcommands};

pub async fn handle_mapping_command(args: MappingCommands, mut config: Config, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        MappingSubcommands::List => {
            if config.entity_mappings.is_empty() {
                println!("{}", "No entity mappings configured".dimmed());
                return Ok(());
            }
            let mut mappings: Vec<_> = config.entity_mappings.iter().collect();
            mappings.sort();
            for (entity_name, collection_name) in mappings {
                println!("  {} -> {}", entity_name.bright_cyan(), collection_name.bright_green());
            }
            Ok(())
        }
        MappingSubcommands::Add {
            entity_name,
            collection_name,
        } => {
            config.add_entity_mapping(entity_name.clone(), collection_name.clone());
            save(&config, config_path)?;
            println!(
                "✅ Mapped {} -> {}",
                entity_name.bright_cyan(),
                collection_name.bright_green()
            );
            Ok(())
        }
        MappingSubcommands::Remove { entity_name } => {
            config.remove_entity_mapping(&entity_name)?;
            save(&config, config_path)?;
            println!("🗑️  Removed mapping for {}", entity_name.bright_cyan());
            Ok(())
        }
    }
}

fn save(config: &Config, config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}
