//! Entity metadata sources and caching

pub mod cache;
pub mod models;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

pub use cache::MetadataCache;
pub use models::{AttributeMetadata, EntityMetadata, MetadataSnapshot};

/// Anything that can produce entity metadata (a live environment, a file)
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self) -> Result<MetadataSnapshot>;
}

/// Reads a metadata snapshot exported as JSON
#[derive(Debug, Clone)]
pub struct JsonFileMetadataSource {
    path: PathBuf,
}

impl JsonFileMetadataSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl MetadataSource for JsonFileMetadataSource {
    async fn fetch_metadata(&self) -> Result<MetadataSnapshot> {
        log::debug!("Reading metadata from {:?}", self.path);
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read metadata file: {:?}", self.path))?;
        MetadataSnapshot::from_json(&content)
            .with_context(|| format!("Invalid metadata file: {:?}", self.path))
    }
}

/// Fixed snapshot, mostly useful for tests and embedding
#[async_trait]
impl MetadataSource for MetadataSnapshot {
    async fn fetch_metadata(&self) -> Result<MetadataSnapshot> {
        Ok(self.clone())
    }
}
