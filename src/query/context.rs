//! Cursor context detection for completion
//!
//! Each dialect gets a lexical classifier that looks at the text around the
//! cursor and decides whether an entity name, an attribute name, or nothing
//! is being typed. No query is actually parsed, so half-written input works.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::converter::Dialect;

static SQL_DOT_ACCESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_]\w*)\.(\w*)$").expect("dot access pattern"));
static PARTIAL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w-]*$").expect("partial word pattern"));
static SQL_ENTITY_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:FROM|JOIN)\b").expect("entity keyword pattern"));
static SQL_ATTRIBUTE_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:SELECT|WHERE|ORDER\s+BY|GROUP\s+BY|ON|AND|OR)\b").expect("attribute keyword pattern")
});
static SQL_TABLE_POSITION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+\w*$").expect("table position pattern"));
static SQL_FROM_TABLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bFROM\s+(\w+)").expect("from table pattern"));
static SQL_TABLE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+(\w+)(?:\s+(?:AS\s+)?(\w+))?").expect("table alias pattern")
});

static XML_TAG_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<\s*([\w-]+)").expect("tag name pattern"));
static XML_OPEN_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w-]+)\s*=\s*["']([^"']*)$"#).expect("open value pattern"));
static XML_ENTITY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)(entity|link-entity)\b([^>]*)>").expect("entity tag pattern")
});
static XML_NAME_ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bname\s*=\s*["']([^"']*)["']"#).expect("name attribute pattern"));

const ODATA_ATTRIBUTE_OPTIONS: &[&str] = &["$select", "$filter", "$orderby", "$expand"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    Entity,
    Attribute,
    None,
}

/// What is being typed at the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    pub kind: ContextKind,
    /// Entity (or OData collection) the attribute belongs to, when known
    pub entity_name: Option<String>,
    pub partial_token: String,
    /// Cursor offset in characters, clamped to the text length
    pub cursor_offset: usize,
}

impl QueryContext {
    fn none(partial: &str, cursor_offset: usize) -> Self {
        Self {
            kind: ContextKind::None,
            entity_name: None,
            partial_token: partial.to_string(),
            cursor_offset,
        }
    }

    fn entity(partial: &str, cursor_offset: usize) -> Self {
        Self {
            kind: ContextKind::Entity,
            entity_name: None,
            partial_token: partial.to_string(),
            cursor_offset,
        }
    }

    fn attribute(entity: Option<String>, partial: &str, cursor_offset: usize) -> Self {
        Self {
            kind: ContextKind::Attribute,
            entity_name: entity.filter(|name| !name.is_empty()),
            partial_token: partial.to_string(),
            cursor_offset,
        }
    }
}

pub fn parse_query_context(text: &str, cursor_offset: usize, dialect: Dialect) -> QueryContext {
    match dialect {
        Dialect::Sql => parse_sql_context(text, cursor_offset),
        Dialect::OData => parse_odata_context(text, cursor_offset),
        Dialect::FetchXml => parse_fetchxml_context(text, cursor_offset),
    }
}

/// Split at a character offset, clamping past-the-end cursors
fn split_at_cursor(text: &str, cursor_offset: usize) -> (&str, &str, usize) {
    let char_count = text.chars().count();
    let cursor = cursor_offset.min(char_count);
    let byte_index = text
        .char_indices()
        .nth(cursor)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    (&text[..byte_index], &text[byte_index..], cursor)
}

fn partial_word(before: &str) -> &str {
    PARTIAL_WORD.find(before).map(|m| m.as_str()).unwrap_or("")
}

pub fn parse_sql_context(text: &str, cursor_offset: usize) -> QueryContext {
    let (before, after, cursor) = split_at_cursor(text, cursor_offset);

    // Only the statement holding the cursor matters
    let before = before.rsplit(';').next().unwrap_or(before);
    let after = after.split(';').next().unwrap_or(after);
    let statement = format!("{}{}", before, after);

    if let Some(captures) = SQL_DOT_ACCESS.captures(before) {
        let qualifier = &captures[1];
        let entity = resolve_table_alias(&statement, qualifier);
        return QueryContext::attribute(Some(entity), &captures[2], cursor);
    }

    let partial = PARTIAL_WORD
        .find(before)
        .map(|m| m.as_str().trim_end_matches('-'))
        .unwrap_or("");
    let entity_keyword = SQL_ENTITY_KEYWORD.find_iter(before).last();
    let attribute_keyword = SQL_ATTRIBUTE_KEYWORD.find_iter(before).last();

    match (entity_keyword, attribute_keyword) {
        (Some(entity_kw), attribute_kw) if attribute_kw.is_none_or(|kw| kw.start() < entity_kw.start()) => {
            if SQL_TABLE_POSITION.is_match(&before[entity_kw.end()..]) {
                QueryContext::entity(partial, cursor)
            } else {
                QueryContext::none(partial, cursor)
            }
        }
        (_, Some(_)) => {
            let entity = nearest_from_table(&statement, before.len());
            QueryContext::attribute(entity, partial, cursor)
        }
        _ => QueryContext::none(partial, cursor),
    }
}

/// FROM table closest to the cursor, preferring one that precedes it
fn nearest_from_table(statement: &str, cursor_byte: usize) -> Option<String> {
    let tables: Vec<(usize, String)> = SQL_FROM_TABLE
        .captures_iter(statement)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            Some((whole.start(), captures.get(1)?.as_str().to_string()))
        })
        .collect();

    tables
        .iter()
        .filter(|(start, _)| *start < cursor_byte)
        .next_back()
        .or_else(|| tables.iter().find(|(start, _)| *start >= cursor_byte))
        .map(|(_, table)| table.clone())
}

fn resolve_table_alias(statement: &str, qualifier: &str) -> String {
    for captures in SQL_TABLE_ALIAS.captures_iter(statement) {
        let table = &captures[1];
        let matches_alias = captures
            .get(2)
            .is_some_and(|alias| alias.as_str().eq_ignore_ascii_case(qualifier));
        if matches_alias || table.eq_ignore_ascii_case(qualifier) {
            return table.to_string();
        }
    }
    qualifier.to_string()
}

pub fn parse_odata_context(text: &str, cursor_offset: usize) -> QueryContext {
    let (before, after, cursor) = split_at_cursor(text, cursor_offset);

    let Some(query_start) = before.find('?') else {
        // Still in the path: the segment under the cursor names a collection
        let segment_start = before.rfind('/').map(|i| i + 1).unwrap_or(0);
        let partial = &before[segment_start..];
        let rest_of_path = after.split('?').next().unwrap_or("");
        if rest_of_path.contains('/') || partial.contains('(') {
            return QueryContext::none(partial, cursor);
        }
        return QueryContext::entity(partial, cursor);
    };

    let path = &before[..query_start];
    let collection = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| segment.split('(').next().unwrap_or(segment))
        .unwrap_or("");

    let param_start = before[query_start..]
        .rfind('&')
        .map(|i| query_start + i + 1)
        .unwrap_or(query_start + 1);
    let param = &before[param_start..];

    match param.split_once('=') {
        Some((key, value)) => {
            let key = urlencoding::decode(key)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| key.to_string());
            let partial = partial_word(value).trim_start_matches('-');
            if ODATA_ATTRIBUTE_OPTIONS.iter().any(|option| option.eq_ignore_ascii_case(&key)) {
                QueryContext::attribute(Some(collection.to_string()), partial, cursor)
            } else {
                QueryContext::none(partial, cursor)
            }
        }
        None => QueryContext::none(param, cursor),
    }
}

pub fn parse_fetchxml_context(text: &str, cursor_offset: usize) -> QueryContext {
    let (before, _, cursor) = split_at_cursor(text, cursor_offset);

    let Some(tag_start) = before.rfind('<') else {
        return QueryContext::none("", cursor);
    };
    let tag_text = &before[tag_start..];
    if tag_text.contains('>') {
        return QueryContext::none("", cursor);
    }

    let Some(tag_name) = XML_TAG_NAME.captures(tag_text).map(|c| c[1].to_string()) else {
        return QueryContext::none("", cursor);
    };
    let Some(open_value) = XML_OPEN_VALUE.captures(tag_text) else {
        return QueryContext::none("", cursor);
    };
    let attribute_name = &open_value[1];
    let partial = &open_value[2];

    match (tag_name.as_str(), attribute_name) {
        ("entity" | "link-entity", "name") => QueryContext::entity(partial, cursor),
        ("attribute", "name") | ("condition", "attribute") | ("order", "attribute") => {
            QueryContext::attribute(enclosing_entity(&before[..tag_start]), partial, cursor)
        }
        // `to` names a column of the parent, `from` one of the linked entity itself
        ("link-entity", "to") => QueryContext::attribute(enclosing_entity(&before[..tag_start]), partial, cursor),
        ("link-entity", "from") => {
            let linked = XML_NAME_ATTRIBUTE
                .captures(tag_text)
                .map(|captures| captures[1].to_string());
            QueryContext::attribute(linked, partial, cursor)
        }
        _ => QueryContext::none(partial, cursor),
    }
}

/// Innermost `entity`/`link-entity` still open at the end of `markup`
fn enclosing_entity(markup: &str) -> Option<String> {
    let mut stack: Vec<String> = Vec::new();

    for captures in XML_ENTITY_TAG.captures_iter(markup) {
        let closing = !captures[1].is_empty();
        let attributes = &captures[3];
        if closing {
            stack.pop();
        } else if !attributes.trim_end().ends_with('/') {
            let name = XML_NAME_ATTRIBUTE
                .captures(attributes)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            stack.push(name);
        }
    }

    stack.pop()
}
