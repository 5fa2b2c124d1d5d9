//! Entity metadata consumed by completion

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::query::pluralization::EntityNames;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMetadata {
    pub logical_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub logical_name: String,
    #[serde(default)]
    pub display_name: String,
    /// Web API entity set name, when the source knows it
    #[serde(default, alias = "entitySetName")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadata>,
}

/// Every entity known to a metadata source at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub entities: Vec<EntityMetadata>,
}

impl MetadataSnapshot {
    pub fn new(entities: Vec<EntityMetadata>) -> Self {
        Self { entities }
    }

    /// Accepts either `{"entities": [...]}` or a bare array of entities
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).context("Failed to parse metadata JSON")?;
        let snapshot = if value.is_array() {
            Self::new(serde_json::from_value(value).context("Failed to read entity list")?)
        } else {
            serde_json::from_value(value).context("Failed to read metadata snapshot")?
        };
        log::debug!("Loaded metadata for {} entities", snapshot.entities.len());
        Ok(snapshot)
    }

    pub fn find_entity(&self, logical_name: &str) -> Option<&EntityMetadata> {
        self.entities
            .iter()
            .find(|entity| entity.logical_name.eq_ignore_ascii_case(logical_name))
    }

    /// Look an entity up by its Web API collection name
    pub fn find_by_collection(&self, collection: &str, names: &EntityNames) -> Option<&EntityMetadata> {
        self.entities.iter().find(|entity| {
            self.get_entity_collection_name(entity, names)
                .eq_ignore_ascii_case(collection)
        })
    }

    /// Find an entity by logical name, falling back to collection name
    pub fn resolve_entity(&self, name: &str, names: &EntityNames) -> Option<&EntityMetadata> {
        self.find_entity(name)
            .or_else(|| self.find_by_collection(name, names))
    }

    pub fn get_entity_collection_name(&self, entity: &EntityMetadata, names: &EntityNames) -> String {
        entity
            .collection_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| names.pluralize(&entity.logical_name))
    }
}
