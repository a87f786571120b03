//! Persistence collaborator used by the importer, order submission and autosave.
//!
//! The business rules only ever issue point writes through [`CatalogStore`];
//! there is no batch or transactional API. [`InMemoryStore`] backs tests and
//! the CLI, where the catalog lives in a JSON snapshot file.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::models::{Catalog, Order};

/// Partial product fields written by a price import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_sale: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn update_product(&self, id: &str, update: ProductUpdate) -> Result<()>;

    async fn update_recipe(&self, id: &str, update: RecipeUpdate) -> Result<()>;

    /// Creates the order when `existing_id` is `None`, otherwise overwrites it.
    /// Returns the id the order is stored under.
    async fn save_order(&self, order: &Order, existing_id: Option<&str>) -> Result<String>;
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn update_product(&self, id: &str, update: ProductUpdate) -> Result<()> {
        (**self).update_product(id, update).await
    }

    async fn update_recipe(&self, id: &str, update: RecipeUpdate) -> Result<()> {
        (**self).update_recipe(id, update).await
    }

    async fn save_order(&self, order: &Order, existing_id: Option<&str>) -> Result<String> {
        (**self).save_order(order, existing_id).await
    }
}

/// In-memory catalog store
///
/// Uses RwLock for thread-safe access; clones share the same catalog.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    catalog: Arc<RwLock<Catalog>>,
}

impl InMemoryStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    /// Loads a catalog snapshot from a JSON file.
    ///
    /// Products and providers that break the model rules are logged but kept,
    /// so an old snapshot can still be opened and fixed.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading catalog snapshot from {path:?}");

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog file {path:?}"))?;
        let catalog: Catalog =
            serde_json::from_str(&content).context("Failed to parse catalog JSON")?;

        info!(
            "Loaded {} products, {} providers, {} recipes, {} orders",
            catalog.products.len(),
            catalog.providers.len(),
            catalog.recipes.len(),
            catalog.orders.len()
        );
        for problem in catalog.validate() {
            warn!("{path:?}: {problem}");
        }
        Ok(Self::new(catalog))
    }

    /// Writes the current catalog back as pretty JSON.
    pub async fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.snapshot()?)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write catalog file {path:?}"))?;
        debug!("Catalog snapshot written to {path:?}");
        Ok(())
    }

    /// Returns a copy of the current catalog.
    pub fn snapshot(&self) -> Result<Catalog> {
        let catalog = self
            .catalog
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(catalog.clone())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn update_product(&self, id: &str, update: ProductUpdate) -> Result<()> {
        let mut catalog = self
            .catalog
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let product = catalog
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow!("Product {id} not found"))?;

        let mut updated = product.clone();
        if let Some(price) = update.price {
            updated.price = price;
        }
        if let Some(sale_price) = update.sale_price {
            updated.sale_price = Some(sale_price);
        }
        if let Some(for_sale) = update.for_sale {
            updated.for_sale = for_sale;
        }
        updated.validate()?;

        *product = updated;
        debug!("Updated product {id}: {update:?}");
        Ok(())
    }

    async fn update_recipe(&self, id: &str, update: RecipeUpdate) -> Result<()> {
        let mut catalog = self
            .catalog
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let recipe = catalog
            .recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("Recipe {id} not found"))?;

        if let Some(sale_price) = update.sale_price {
            recipe.sale_price = Some(sale_price);
        }
        debug!("Updated recipe {id}: {update:?}");
        Ok(())
    }

    async fn save_order(&self, order: &Order, existing_id: Option<&str>) -> Result<String> {
        let mut catalog = self
            .catalog
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = existing_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut stored = order.clone();
        stored.id = Some(id.clone());

        match catalog
            .orders
            .iter_mut()
            .find(|o| o.id.as_deref() == Some(id.as_str()))
        {
            Some(existing) => {
                *existing = stored;
                debug!("Overwrote order {id}");
            }
            None => {
                catalog.orders.push(stored);
                debug!("Created order {id}");
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
