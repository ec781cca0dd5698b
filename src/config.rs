//! Configuration loader
//!
//! Path resolution order:
//! 1. `DOCFILL_CONFIG` environment variable (explicit override)
//! 2. Relative `config/docfill.yaml` (works when running from the repository root)
//! 3. Built-in defaults
//!
//! `DOCFILL_KEEP_EMPTY_FIELDS` and `DOCFILL_MAX_TEMPLATE_BYTES` override
//! whatever the file says.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use docfill_core::{
    ContainerOptions, SubstitutionOptions, DEFAULT_MAX_TEMPLATE_BYTES, DEFAULT_PRIMARY_PART,
};
use docfill_mapping::DataDictionary;

pub const CONFIG_ENV: &str = "DOCFILL_CONFIG";
pub const KEEP_EMPTY_FIELDS_ENV: &str = "DOCFILL_KEEP_EMPTY_FIELDS";
pub const MAX_TEMPLATE_BYTES_ENV: &str = "DOCFILL_MAX_TEMPLATE_BYTES";
pub const DEFAULT_CONFIG_PATH: &str = "config/docfill.yaml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Archive entry holding the content tree
    pub primary_part: String,
    /// Leave fields without a value untouched instead of blanking them
    pub keep_empty_fields: bool,
    pub max_template_bytes: usize,
    /// YAML dictionary replacing the built-in one
    pub dictionary_path: Option<PathBuf>,
    /// Refuse to generate from a mapping that has validation errors
    pub reject_invalid_mapping: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            primary_part: DEFAULT_PRIMARY_PART.to_string(),
            keep_empty_fields: false,
            max_template_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
            dictionary_path: None,
            reject_invalid_mapping: false,
        }
    }
}

impl EngineConfig {
    pub fn container_options(&self) -> ContainerOptions {
        ContainerOptions {
            primary_part: self.primary_part.clone(),
            max_bytes: self.max_template_bytes,
        }
    }

    pub fn substitution_options(&self) -> SubstitutionOptions {
        SubstitutionOptions {
            keep_empty_fields: self.keep_empty_fields,
        }
    }

    /// The configured dictionary, or the built-in one
    pub fn load_dictionary(&self) -> Result<DataDictionary> {
        let Some(path) = &self.dictionary_path else {
            return Ok(DataDictionary::builtin().clone());
        };

        info!("Loading data dictionary from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        DataDictionary::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply environment overrides; `lookup` is `std::env::var` outside tests
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(KEEP_EMPTY_FIELDS_ENV) {
            self.keep_empty_fields = parse_flag(&value)
                .with_context(|| format!("{KEEP_EMPTY_FIELDS_ENV}={value} is not a boolean"))?;
        }
        if let Some(value) = lookup(MAX_TEMPLATE_BYTES_ENV) {
            self.max_template_bytes = value
                .trim()
                .parse()
                .with_context(|| format!("{MAX_TEMPLATE_BYTES_ENV}={value} is not a byte count"))?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Loader that only uses defaults and environment overrides
    pub fn defaults() -> Self {
        Self { path: None }
    }

    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::new(path);
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::new(DEFAULT_CONFIG_PATH);
        }

        Self::defaults()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load(&self) -> Result<EngineConfig> {
        let mut config = self.load_file()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load the file without environment overrides
    pub fn load_file(&self) -> Result<EngineConfig> {
        let Some(path) = &self.path else {
            return Ok(EngineConfig::default());
        };

        info!("Loading engine configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}
