//! Price import module for supplier and sale price lists.
//!
//! Reads a delimited price list, matches every row against the catalog and
//! works out which products (and, for sale prices, recipes) need a new price.
//!
//! # Module Structure
//!
//! - [`field_parsers`] - Pure parsing helpers for lines, headers, codes and prices
//! - [`header`] - Required-column checks and column lookup
//! - [`row_reconciler`] - Per-row matching and price comparison
//!
//! File-level problems (empty file, missing columns) abort the import with an
//! [`ImportError`]. Row-level problems never do: they are collected in the
//! [`ImportResult`] so a partially bad file still updates everything it can.
//!
//! # Example
//!
//! ```no_run
//! use purchase_manager::price_import::{ImportType, PriceImporter};
//! use purchase_manager::storage::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = InMemoryStore::load("catalog.json").await?;
//!     let catalog = store.snapshot()?;
//!     let importer = PriceImporter::default();
//!     let csv = importer.read_file("precios.csv").await?;
//!     let result = importer.import(&store, &catalog, &csv, ImportType::Sale).await?;
//!     println!("{} prices updated", result.updated);
//!     Ok(())
//! }
//! ```

pub mod field_parsers;
pub mod header;
pub mod row_reconciler;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ImportError;
use crate::models::Catalog;
use crate::storage::{CatalogStore, ProductUpdate, RecipeUpdate};

use field_parsers::{detect_delimiter, normalize_lines};
use header::HeaderMap;
use row_reconciler::RowReconciler;

/// Which price list is being imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    /// Supplier price list, updates the purchase price
    Purchase,
    /// Point-of-sale price list, updates the sale price
    Sale,
}

impl ImportType {
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            ImportType::Purchase => &["fecha", "rut", "codigo", "nombre", "precio"],
            ImportType::Sale => &["codigo", "nombre", "contado"],
        }
    }

    /// Column holding the new price
    pub fn price_column(&self) -> &'static str {
        match self {
            ImportType::Purchase => "precio",
            ImportType::Sale => "contado",
        }
    }
}

impl FromStr for ImportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "purchase" | "compra" => Ok(ImportType::Purchase),
            "sale" | "venta" => Ok(ImportType::Sale),
            other => Err(format!("unknown import type '{other}'")),
        }
    }
}

/// Product field a price-list code is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    /// `product.sku == code`
    #[default]
    Sku,
    /// `product.supplier_code == code`
    SupplierCode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    #[serde(default)]
    pub match_strategy: MatchStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedProduct {
    pub product_id: String,
    pub name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub csv_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedRecipe {
    pub recipe_id: String,
    pub name: String,
    pub old_price: f64,
    pub new_price: f64,
    pub csv_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotFoundReason {
    /// No product carries the code (for the provider, on purchase imports)
    Product,
    /// No provider has the row's RUT
    Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundProduct {
    pub row: usize,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rut: Option<String>,
    pub csv_name: String,
    pub reason: NotFoundReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDetails {
    pub updated_products: Vec<UpdatedProduct>,
    pub updated_recipes: Vec<UpdatedRecipe>,
    pub not_found_products: Vec<NotFoundProduct>,
    pub invalid_rows: Vec<InvalidRow>,
}

/// Summary handed back to the caller after an import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    /// Products and recipes whose price changed
    pub updated: usize,
    /// One message per not-found or invalid row, in file order
    pub errors: Vec<String>,
    pub details: ImportDetails,
}

/// A write decided by the reconciler, in file order
#[derive(Debug, Clone, PartialEq)]
pub enum PriceUpdate {
    Product { id: String, update: ProductUpdate },
    Recipe { id: String, update: RecipeUpdate },
}

/// Outcome of [`reconcile`]: the summary plus the writes to perform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceImport {
    pub result: ImportResult,
    pub updates: Vec<PriceUpdate>,
}

/// Reconciles a price list against the catalog without writing anything.
///
/// # Arguments
/// * `csv_text` - Raw file content (`,` or `;` delimited, optional BOM)
/// * `catalog` - Current products, providers and recipes
/// * `import_type` - Selects the required columns and the price to update
/// * `options` - Product matching rule
///
/// # Returns
/// The import summary and the ordered writes, or an error when the file as a
/// whole cannot be used.
pub fn reconcile(
    csv_text: &str,
    catalog: &Catalog,
    import_type: ImportType,
    options: &ImportOptions,
) -> Result<PriceImport, ImportError> {
    info!("Starting {import_type:?} price import");
    let lines = normalize_lines(csv_text);

    if lines.len() < 2 {
        warn!("Import file is empty ({} non-blank lines)", lines.len());
        return Err(ImportError::EmptyFile);
    }

    let delimiter = detect_delimiter(lines[0]);
    let header = HeaderMap::parse(lines[0], delimiter, import_type)?;

    let data_lines = &lines[1..];
    info!(
        "Processing {} data lines (excluding header)",
        data_lines.len()
    );

    let mut reconciler = RowReconciler::new(catalog, import_type, options, &header);
    for (index, line) in data_lines.iter().enumerate() {
        let row = index + 2;
        let fields = field_parsers::split_line(line, delimiter).map_err(|e| {
            ImportError::UnparseableLine {
                line: row,
                reason: e.to_string(),
            }
        })?;
        reconciler.process_row(row, &fields);
    }

    let import = reconciler.finish();
    info!(
        "Import finished: {} updated, {} not found, {} invalid",
        import.result.updated,
        import.result.details.not_found_products.len(),
        import.result.details.invalid_rows.len()
    );
    Ok(import)
}

/// Runs imports end to end: reconcile, then write every change.
#[derive(Debug, Clone, Default)]
pub struct PriceImporter {
    options: ImportOptions,
}

impl PriceImporter {
    pub fn new(options: ImportOptions) -> Self {
        debug!("Creating price importer with {options:?}");
        Self { options }
    }

    /// Reads an import file from disk.
    pub async fn read_file<P: AsRef<Path>>(&self, file_path: P) -> Result<String> {
        let path = file_path.as_ref();
        info!("Loading price list from file: {path:?}");

        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read price list file")?;

        debug!("Price list size: {} bytes", content.len());
        Ok(content)
    }

    /// Reconciles `csv_text` and applies the resulting writes one at a time.
    ///
    /// Writes are awaited sequentially in file order. The first rejected
    /// write stops the import; earlier writes stay applied.
    pub async fn import(
        &self,
        store: &dyn CatalogStore,
        catalog: &Catalog,
        csv_text: &str,
        import_type: ImportType,
    ) -> Result<ImportResult> {
        let PriceImport { result, updates } =
            reconcile(csv_text, catalog, import_type, &self.options)?;

        for update in updates {
            match update {
                PriceUpdate::Product { id, update } => store
                    .update_product(&id, update)
                    .await
                    .with_context(|| format!("Failed to update product {id}"))?,
                PriceUpdate::Recipe { id, update } => store
                    .update_recipe(&id, update)
                    .await
                    .with_context(|| format!("Failed to update recipe {id}"))?,
            }
        }

        Ok(result)
    }

    /// Computes the import summary without writing anything.
    pub fn preview(
        &self,
        catalog: &Catalog,
        csv_text: &str,
        import_type: ImportType,
    ) -> Result<ImportResult, ImportError> {
        reconcile(csv_text, catalog, import_type, &self.options).map(|import| import.result)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
