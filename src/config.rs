//! Persisted application settings.
//!
//! Settings live in a pretty-printed JSON file under the user's config
//! directory. A missing or unreadable file is never fatal: the defaults are
//! used and a warning is logged.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::autosave::AutosaveConfig;
use crate::error::ConfigError;
use crate::models::Product;
use crate::price_import::ImportOptions;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "PURCHASE_MANAGER_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub autosave: AutosaveConfig,
    pub import: ImportOptions,
    pub product_filter: ProductFilter,
}

impl AppConfig {
    /// `$PURCHASE_MANAGER_CONFIG`, or `<config dir>/purchase_manager/config.json`
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("purchase_manager")
            .join("config.json")
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config from {}, using defaults: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Saved product list filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilter {
    /// Case-insensitive match against name or SKU
    pub search: String,
    pub provider_id: Option<String>,
    pub only_for_sale: bool,
    /// Products must carry every one of these tags
    pub tags: BTreeSet<String>,
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.provider_id.is_none()
            && !self.only_for_sale
            && self.tags.is_empty()
    }

    pub fn matches(&self, product: &Product) -> bool {
        let search = self.search.trim().to_lowercase();
        if !search.is_empty()
            && !product.name.to_lowercase().contains(&search)
            && !product.sku.to_lowercase().contains(&search)
        {
            return false;
        }

        if let Some(provider_id) = &self.provider_id {
            if &product.provider_id != provider_id {
                return false;
            }
        }

        if self.only_for_sale && !product.for_sale {
            return false;
        }

        self.tags.is_subset(&product.tags)
    }

    /// Products passing the filter, in catalog order
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
