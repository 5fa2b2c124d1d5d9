//! Entity name pluralization utilities for Dataverse Web API collection names
//!
//! Collection names are guessed from logical names with English suffix rules.
//! The rules are lossy for irregular nouns missing from the exception table;
//! those need an explicit mapping through [`EntityNames::with_mappings`].

use std::collections::HashMap;

/// Built-in (logical name, collection name) pairs, checked before the suffix rules
const IRREGULAR_ENTITY_NAMES: &[(&str, &str)] = &[
    ("account", "accounts"),
    ("contact", "contacts"),
    ("lead", "leads"),
    ("opportunity", "opportunities"),
    ("incident", "incidents"),
    ("systemuser", "systemusers"),
    ("businessunit", "businessunits"),
    ("team", "teams"),
    ("role", "roles"),
    ("activityparty", "activityparties"),
    ("transactioncurrency", "transactioncurrencies"),
    ("territory", "territories"),
    ("person", "people"),
    ("response", "responses"),
    ("expense", "expenses"),
    ("license", "licenses"),
    ("purchase", "purchases"),
    ("phase", "phases"),
    ("database", "databases"),
    ("case", "cases"),
];

/// Entity name heuristics with optional user-supplied overrides
///
/// Overrides are consulted first, then the built-in exception table, then the
/// regular suffix rules. All lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct EntityNames {
    overrides: HashMap<String, String>,
}

impl EntityNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer custom singular -> collection mappings over the built-in table
    pub fn with_mappings(mappings: &HashMap<String, String>) -> Self {
        let overrides = mappings
            .iter()
            .map(|(singular, plural)| (singular.to_lowercase(), plural.clone()))
            .collect();
        Self { overrides }
    }

    pub fn pluralize(&self, entity_name: &str) -> String {
        let lower = entity_name.to_lowercase();
        if let Some(plural) = self.overrides.get(&lower) {
            log::debug!("Found custom mapping: {} -> {}", entity_name, plural);
            return plural.clone();
        }
        pluralize_entity_name(entity_name)
    }

    pub fn singularize(&self, collection_name: &str) -> String {
        if let Some((singular, _)) = self
            .overrides
            .iter()
            .find(|(_, plural)| plural.eq_ignore_ascii_case(collection_name))
        {
            log::debug!("Found custom mapping: {} -> {}", collection_name, singular);
            return singular.clone();
        }
        singularize_collection_name(collection_name)
    }
}

/// Convert entity name to its plural collection form
pub fn pluralize_entity_name(entity_name: &str) -> String {
    if entity_name.is_empty() {
        return String::new();
    }

    if let Some((_, plural)) = IRREGULAR_ENTITY_NAMES
        .iter()
        .find(|(singular, _)| singular.eq_ignore_ascii_case(entity_name))
    {
        return plural.to_string();
    }

    let lower = entity_name.to_lowercase();

    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", entity_name);
    }

    if ends_with_consonant_y(&lower) {
        return format!("{}ies", &entity_name[..entity_name.len() - 1]);
    }

    format!("{}s", entity_name)
}

/// Convert a collection name back to its singular logical name
pub fn singularize_collection_name(collection_name: &str) -> String {
    if collection_name.is_empty() {
        return String::new();
    }

    if let Some((singular, _)) = IRREGULAR_ENTITY_NAMES
        .iter()
        .find(|(_, plural)| plural.eq_ignore_ascii_case(collection_name))
    {
        return singular.to_string();
    }

    let lower = collection_name.to_lowercase();
    let len = collection_name.len();

    if lower.ends_with("ies") && len > 3 {
        return format!("{}y", &collection_name[..len - 3]);
    }

    if lower.ends_with("ses")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
    {
        return collection_name[..len - 2].to_string();
    }

    if lower.ends_with('s') && !lower.ends_with("ss") {
        return collection_name[..len - 1].to_string();
    }

    collection_name.to_string()
}

/// Derive a navigation property name from a lookup column
///
/// `primarycontactid` becomes `primarycontact`; the Web API lookup value form
/// `_primarycontactid_value` is unwrapped first.
pub fn navigation_property_name(lookup_field: &str) -> String {
    let mut name = lookup_field;
    if let Some(inner) = name.strip_prefix('_').and_then(|n| n.strip_suffix("_value")) {
        name = inner;
    }

    let lower = name.to_lowercase();
    if lower.ends_with("id") && name.len() > 2 {
        return name[..name.len() - 2].to_string();
    }
    name.to_string()
}

fn ends_with_consonant_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('y'), Some(prev)) => prev.is_ascii_alphabetic() && !"aeiou".contains(prev),
        _ => false,
    }
}
