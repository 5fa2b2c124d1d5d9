pub mod config;
pub mod flow;
pub mod metadata;
pub mod query;
