use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::flow::analyzer::AnalyzerConfig;
use crate::query::completion::DEFAULT_MAX_SUGGESTIONS;
use crate::query::odata::DEFAULT_API_PATH;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Logical name -> collection name overrides for irregular plurals
    #[serde(default)]
    pub entity_mappings: HashMap<String, String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,
}

fn default_api_path() -> String {
    DEFAULT_API_PATH.to_string()
}

fn default_max_suggestions() -> usize {
    DEFAULT_MAX_SUGGESTIONS
}

fn default_metadata_cache_ttl_secs() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_path: default_api_path(),
            max_suggestions: default_max_suggestions(),
            metadata_cache_ttl_secs: default_metadata_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSettings {
    /// Connector name substrings treated as critical
    #[serde(default = "default_critical_connectors")]
    pub critical_connectors: Vec<String>,
    #[serde(default = "default_missing_run_after_threshold")]
    pub missing_run_after_threshold: usize,
    #[serde(default = "default_complexity_threshold")]
    pub complexity_threshold: usize,
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_critical_connectors() -> Vec<String> {
    AnalyzerConfig::default().critical_connectors
}

fn default_missing_run_after_threshold() -> usize {
    AnalyzerConfig::default().missing_run_after_threshold
}

fn default_complexity_threshold() -> usize {
    AnalyzerConfig::default().complexity_threshold
}

fn default_max_nesting_depth() -> usize {
    crate::flow::parser::DEFAULT_MAX_DEPTH
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            critical_connectors: default_critical_connectors(),
            missing_run_after_threshold: default_missing_run_after_threshold(),
            complexity_threshold: default_complexity_threshold(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl AnalysisSettings {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            critical_connectors: self.critical_connectors.clone(),
            missing_run_after_threshold: self.missing_run_after_threshold,
            complexity_threshold: self.complexity_threshold,
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("powertools")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".powertools")
        };

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        debug!(
            "Loaded config with {} entity mappings",
            config.entity_mappings.len()
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        debug!("Saving config to: {:?}", config_path);

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)
                    .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
                info!("Created config directory: {:?}", config_dir);
            }
        }

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    pub fn add_entity_mapping(&mut self, singular: String, plural: String) {
        info!("Adding entity mapping: {} -> {}", singular, plural);
        self.entity_mappings.insert(singular, plural);
    }

    pub fn remove_entity_mapping(&mut self, singular: &str) -> Result<()> {
        if self.entity_mappings.remove(singular).is_none() {
            anyhow::bail!("Entity mapping '{}' not found", singular);
        }
        info!("Removed entity mapping: {}", singular);
        Ok(())
    }
}
