//! Flow analysis and diagram commands

use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use powertools::config::Config;
use powertools::flow::analyzer::{Analysis, Priority, Severity};
use powertools::flow::diagram::generate_diagram_with_depth;
use powertools::flow::{ParseOptions, Workflow, analyze_workflow, parse_workflow_str};

use super::super::{OutputFormat, print_json};
use super::{FlowCommands, FlowSubcommands};

pub async fn handle_flow_command(args: FlowCommands, config: &Config) -> Result<()> {
    match args.command {
        FlowSubcommands::Analyze { path, format } => {
            let workflow = load_workflow(&path, config)?;
            let analysis = analyze_workflow(&workflow, &config.analysis.analyzer_config());

            if format == OutputFormat::Json {
                return print_json(&analysis);
            }
            print_analysis(&workflow, &analysis);
            Ok(())
        }
        FlowSubcommands::Diagram { path, output } => {
            let workflow = load_workflow(&path, config)?;
            let diagram = generate_diagram_with_depth(
                &workflow.triggers,
                &workflow.actions,
                config.analysis.max_nesting_depth,
            )?;

            match output {
                Some(output_path) => {
                    fs::write(&output_path, diagram.to_text())
                        .with_context(|| format!("Failed to write diagram to: {}", output_path.display()))?;
                    println!("💾 Diagram saved to: {}", output_path.display().to_string().bright_green());
                }
                None => println!("{}", diagram),
            }
            Ok(())
        }
    }
}

fn load_workflow(path: &Path, config: &Config) -> Result<Workflow> {
    if !path.exists() {
        anyhow::bail!("Flow file does not exist: {}", path.display());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read flow file: {}", path.display()))?;
    let options = ParseOptions {
        max_depth: config.analysis.max_nesting_depth,
    };
    parse_workflow_str(&content, options).with_context(|| format!("Failed to parse flow: {}", path.display()))
}

fn print_analysis(workflow: &Workflow, analysis: &Analysis) {
    println!(
        "📊 {} triggers, {} actions",
        workflow.triggers.len(),
        workflow.actions.len()
    );
    println!();

    println!("{}", "Connectors".bold());
    if analysis.connectors.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for usage in &analysis.connectors {
        let name = if usage.is_critical {
            usage.display_name.bright_red().bold()
        } else {
            usage.display_name.normal()
        };
        println!("  {} ({} calls)", name, usage.invocation_count);
    }
    println!();

    println!("{}", "Issues".bold());
    if analysis.issues.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for issue in &analysis.issues {
        let marker = match issue.severity {
            Severity::Error => "✗".bright_red().bold(),
            Severity::Warning => "⚠".yellow(),
            Severity::Info => "ℹ".bright_blue(),
        };
        println!("  {} {} [{}]", marker, issue.description, issue.location.dimmed());
        println!("    {}", issue.impact.dimmed());
    }
    println!();

    println!("{}", "Recommendations".bold());
    for recommendation in &analysis.recommendations {
        let priority = match recommendation.priority {
            Priority::High => "high".bright_red(),
            Priority::Medium => "medium".yellow(),
            Priority::Low => "low".dimmed(),
        };
        println!("  • {} ({})", recommendation.title.bright_green(), priority);
        println!("    {}", recommendation.description);
    }
}
