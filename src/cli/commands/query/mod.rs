pub mod handler;

use clap::{Args, Subcommand};
use std::path::PathBuf;

use powertools::query::Dialect;

use super::OutputFormat;
pub use handler::handle_query_command;

#[derive(Args)]
pub struct QueryCommands {
    #[command(subcommand)]
    pub command: QuerySubcommands,
}

#[derive(Subcommand)]
pub enum QuerySubcommands {
    /// Convert a query from one dialect to another
    Convert {
        /// Query text to convert
        query: Option<String>,
        /// Read the query from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Source dialect (sql, odata, fetchxml)
        #[arg(long)]
        from: Dialect,
        /// Target dialect (sql, odata, fetchxml)
        #[arg(long)]
        to: Dialect,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show what is being typed at a cursor position
    Context {
        query: String,
        /// Cursor offset in characters (defaults to end of text)
        #[arg(short, long)]
        cursor: Option<usize>,
        #[arg(short, long)]
        dialect: Dialect,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Suggest entity and attribute names at a cursor position
    Complete {
        query: String,
        #[arg(short, long)]
        cursor: Option<usize>,
        #[arg(short, long)]
        dialect: Dialect,
        /// Metadata snapshot exported as JSON
        #[arg(short, long)]
        metadata: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
