//! Query conversion, context and completion commands

use anyhow::Result;
use colored::*;
use std::sync::Arc;

use powertools::config::Config;
use powertools::metadata::{JsonFileMetadataSource, MetadataCache};
use powertools::query::{CompletionProvider, ContextKind, EntityNames, QueryConverter, parse_query_context};

use super::super::{OutputFormat, print_json, read_input};
use super::{QueryCommands, QuerySubcommands};

pub async fn handle_query_command(args: QueryCommands, config: &Config) -> Result<()> {
    match args.command {
        QuerySubcommands::Convert {
            query,
            file,
            from,
            to,
            format,
        } => {
            let text = read_input(query, file.as_deref(), "query")?;
            let converter = QueryConverter::from_config(config);
            let result = converter.convert(text.trim(), from, to);

            if format == OutputFormat::Json {
                print_json(&result)?;
            } else {
                for warning in &result.warnings {
                    eprintln!("{} {}", "⚠".yellow(), warning.yellow());
                }
                if result.succeeded {
                    println!("{}", result.text);
                }
            }

            if let Some(error) = result.error {
                anyhow::bail!("Conversion from {} to {} failed: {}", from, to, error);
            }
            Ok(())
        }
        QuerySubcommands::Context {
            query,
            cursor,
            dialect,
            format,
        } => {
            let cursor = cursor.unwrap_or_else(|| query.chars().count());
            let context = parse_query_context(&query, cursor, dialect);

            if format == OutputFormat::Json {
                return print_json(&context);
            }

            let kind = match context.kind {
                ContextKind::Entity => "entity".bright_green(),
                ContextKind::Attribute => "attribute".bright_cyan(),
                ContextKind::None => "none".dimmed(),
            };
            println!("Kind:    {}", kind);
            println!(
                "Entity:  {}",
                context.entity_name.as_deref().unwrap_or("-")
            );
            println!("Partial: '{}'", context.partial_token);
            println!("Cursor:  {}", context.cursor_offset);
            Ok(())
        }
        QuerySubcommands::Complete {
            query,
            cursor,
            dialect,
            metadata,
            format,
        } => {
            let cursor = cursor.unwrap_or_else(|| query.chars().count());
            let provider = CompletionProvider::new(
                dialect,
                Arc::new(JsonFileMetadataSource::new(&metadata)),
                Arc::new(MetadataCache::new(config.settings.metadata_cache_ttl_secs)),
                EntityNames::with_mappings(&config.entity_mappings),
                config.settings.max_suggestions,
            );
            let suggestions = provider.provide(&query, cursor).await?;

            if format == OutputFormat::Json {
                return print_json(&suggestions);
            }

            if suggestions.is_empty() {
                println!("{}", "No suggestions".dimmed());
            }
            for suggestion in &suggestions {
                match &suggestion.detail {
                    Some(detail) => println!("{}  {}", suggestion.label.bright_green(), detail.dimmed()),
                    None => println!("{}", suggestion.label.bright_green()),
                }
            }
            Ok(())
        }
    }
}
