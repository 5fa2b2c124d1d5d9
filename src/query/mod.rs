//! Query language bridge between SQL, OData and FetchXML

pub mod completion;
pub mod context;
pub mod converter;
pub mod fetchxml;
pub mod odata;
pub mod pluralization;
pub mod sql;

pub use completion::{CompletionHost, CompletionProvider, Suggestion, SuggestionKind, register_completion_providers};
pub use context::{ContextKind, QueryContext, parse_query_context};
pub use converter::{ConversionResult, Dialect, QueryConverter, VERIFY_WARNING, convert};
pub use pluralization::EntityNames;
