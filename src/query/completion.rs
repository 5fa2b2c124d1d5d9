//! Metadata-backed completion for the three query dialects

use std::sync::Arc;

use anyhow::Result;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Serialize;

use super::context::{ContextKind, QueryContext, parse_query_context};
use super::converter::Dialect;
use super::pluralization::EntityNames;
use crate::metadata::{MetadataCache, MetadataSnapshot, MetadataSource};

pub const DEFAULT_MAX_SUGGESTIONS: usize = 15;

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "INNER JOIN", "LEFT JOIN", "ON", "AND", "OR", "ORDER BY", "ASC", "DESC",
    "LIMIT", "TOP", "IS NULL", "IS NOT NULL", "LIKE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Entity,
    Attribute,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub label: String,
    pub kind: SuggestionKind,
    pub detail: Option<String>,
}

impl Suggestion {
    fn new(label: impl Into<String>, kind: SuggestionKind, detail: Option<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: detail.filter(|d| !d.is_empty()),
        }
    }
}

/// Suggestions for a context against one metadata snapshot
///
/// OData entity suggestions are collection names; SQL and FetchXML use
/// logical names. Attribute suggestions need a resolvable entity.
pub fn suggest(
    snapshot: &MetadataSnapshot,
    context: &QueryContext,
    dialect: Dialect,
    names: &EntityNames,
    limit: usize,
) -> Vec<Suggestion> {
    let candidates: Vec<Suggestion> = match context.kind {
        ContextKind::Entity => snapshot
            .entities
            .iter()
            .map(|entity| {
                let label = match dialect {
                    Dialect::OData => snapshot.get_entity_collection_name(entity, names),
                    _ => entity.logical_name.clone(),
                };
                Suggestion::new(label, SuggestionKind::Entity, Some(entity.display_name.clone()))
            })
            .collect(),
        ContextKind::Attribute => {
            let Some(entity) = context
                .entity_name
                .as_deref()
                .and_then(|name| snapshot.resolve_entity(name, names))
            else {
                log::debug!("No metadata for entity {:?}", context.entity_name);
                return Vec::new();
            };
            entity
                .attributes
                .iter()
                .map(|attribute| {
                    let detail = match (attribute.display_name.is_empty(), attribute.data_type.is_empty()) {
                        (false, false) => format!("{} ({})", attribute.display_name, attribute.data_type),
                        (false, true) => attribute.display_name.clone(),
                        _ => attribute.data_type.clone(),
                    };
                    Suggestion::new(attribute.logical_name.clone(), SuggestionKind::Attribute, Some(detail))
                })
                .collect()
        }
        ContextKind::None if dialect == Dialect::Sql => SQL_KEYWORDS
            .iter()
            .map(|keyword| Suggestion::new(*keyword, SuggestionKind::Keyword, None))
            .collect(),
        ContextKind::None => Vec::new(),
    };

    rank(candidates, &context.partial_token, limit)
}

/// Order by fuzzy score (alphabetically when nothing is typed yet)
fn rank(mut candidates: Vec<Suggestion>, partial: &str, limit: usize) -> Vec<Suggestion> {
    if partial.is_empty() {
        candidates.sort_by(|a, b| a.label.cmp(&b.label));
        candidates.truncate(limit);
        return candidates;
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    let mut scored: Vec<(Suggestion, i64)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(&candidate.label, partial)
                .map(|score| (candidate, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label.cmp(&b.0.label)));
    scored.into_iter().take(limit).map(|(suggestion, _)| suggestion).collect()
}

/// Completion for one dialect, fed by a cached metadata source
pub struct CompletionProvider {
    dialect: Dialect,
    source: Arc<dyn MetadataSource>,
    cache: Arc<MetadataCache>,
    names: EntityNames,
    max_suggestions: usize,
}

impl CompletionProvider {
    pub fn new(
        dialect: Dialect,
        source: Arc<dyn MetadataSource>,
        cache: Arc<MetadataCache>,
        names: EntityNames,
        max_suggestions: usize,
    ) -> Self {
        Self {
            dialect,
            source,
            cache,
            names,
            max_suggestions,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn provide(&self, text: &str, cursor_offset: usize) -> Result<Vec<Suggestion>> {
        let context = parse_query_context(text, cursor_offset, self.dialect);
        if context.kind == ContextKind::None && self.dialect != Dialect::Sql {
            return Ok(Vec::new());
        }

        let snapshot = self.cache.get_or_fetch(self.source.as_ref()).await?;
        let suggestions = suggest(&snapshot, &context, self.dialect, &self.names, self.max_suggestions);
        log::debug!(
            "{} completion at {}: {:?} context, {} suggestions",
            self.dialect,
            context.cursor_offset,
            context.kind,
            suggestions.len()
        );
        Ok(suggestions)
    }
}

/// Editor integration point that accepts per-dialect providers
pub trait CompletionHost {
    fn register_completion_provider(&mut self, provider: Arc<CompletionProvider>);
}

/// Register one provider per dialect, all sharing the same metadata cache
pub fn register_completion_providers(
    host: &mut dyn CompletionHost,
    source: Arc<dyn MetadataSource>,
    cache: Arc<MetadataCache>,
    names: &EntityNames,
    max_suggestions: usize,
) {
    for dialect in Dialect::ALL {
        let provider = CompletionProvider::new(
            dialect,
            source.clone(),
            cache.clone(),
            names.clone(),
            max_suggestions,
        );
        host.register_completion_provider(Arc::new(provider));
    }
    log::info!("Registered completion providers for {} dialects", Dialect::ALL.len());
}
