//! Per-row matching and price comparison.
//!
//! Each data row ends in exactly one of three outcomes: invalid (structurally
//! unusable), not found (no matching product or provider) or matched. A
//! matched row only produces writes for records whose price actually moved
//! by more than the money tolerance, so re-importing the same file is a no-op.

use log::{debug, info, warn};
use std::collections::HashMap;

use crate::models::{clean_rut, Catalog, Product};
use crate::money::within_tolerance;
use crate::storage::{ProductUpdate, RecipeUpdate};

use super::field_parsers::{clean_code, parse_locale_price};
use super::header::HeaderMap;
use super::{
    ImportOptions, ImportResult, ImportType, InvalidRow, MatchStrategy, NotFoundProduct,
    NotFoundReason, PriceImport, PriceUpdate, UpdatedProduct, UpdatedRecipe,
};

pub struct RowReconciler<'a> {
    catalog: &'a Catalog,
    import_type: ImportType,
    match_strategy: MatchStrategy,
    header: &'a HeaderMap,
    /// Prices written by earlier rows, so a repeated code compares against them
    product_prices: HashMap<&'a str, f64>,
    recipe_prices: HashMap<&'a str, f64>,
    result: ImportResult,
    updates: Vec<PriceUpdate>,
}

impl<'a> RowReconciler<'a> {
    pub fn new(
        catalog: &'a Catalog,
        import_type: ImportType,
        options: &ImportOptions,
        header: &'a HeaderMap,
    ) -> Self {
        Self {
            catalog,
            import_type,
            match_strategy: options.match_strategy,
            header,
            product_prices: HashMap::new(),
            recipe_prices: HashMap::new(),
            result: ImportResult::default(),
            updates: Vec::new(),
        }
    }

    /// Processes one data row; `row` is the 1-based line number shown to users.
    pub fn process_row(&mut self, row: usize, fields: &[String]) {
        debug!("Processing row {row}: {fields:?}");
        let catalog: &'a Catalog = self.catalog;

        if fields.len() < self.header.column_count() {
            self.invalid(
                row,
                format!(
                    "incorrect column count: expected {}, got {}",
                    self.header.column_count(),
                    fields.len()
                ),
            );
            return;
        }

        let code = clean_code(self.header.field(fields, "codigo"));
        let csv_name = self.header.field(fields, "nombre").to_string();
        let rut = match self.import_type {
            ImportType::Purchase => Some(self.header.field(fields, "rut").to_string()),
            ImportType::Sale => None,
        };

        if code.is_empty() {
            self.invalid(row, "missing product code".to_string());
            return;
        }

        let mut matches = self.matching_products(&code);
        if matches.is_empty() {
            self.not_found(row, code, rut, csv_name, NotFoundReason::Product);
            return;
        }

        if let Some(raw_rut) = rut.as_deref() {
            let cleaned = clean_rut(raw_rut);
            let Some(provider) = catalog.provider_by_rut(&cleaned) else {
                self.not_found(row, code, rut, csv_name, NotFoundReason::Provider);
                return;
            };
            matches.retain(|p| p.provider_id == provider.id);
            if matches.is_empty() {
                debug!(
                    "Row {row}: code {code} exists but not for provider {}",
                    provider.id
                );
                self.not_found(row, code, rut, csv_name, NotFoundReason::Product);
                return;
            }
        }

        let raw_price = self.header.field(fields, self.import_type.price_column());
        let new_price = match parse_locale_price(raw_price) {
            Ok(price) => price,
            Err(e) => {
                self.invalid(row, format!("invalid price: {e}"));
                return;
            }
        };

        for product in matches {
            self.update_product(product, new_price, &csv_name);
        }

        if self.import_type == ImportType::Sale {
            self.update_recipes(&code, new_price, &csv_name);
        }
    }

    pub fn finish(self) -> PriceImport {
        PriceImport {
            result: self.result,
            updates: self.updates,
        }
    }

    fn matching_products(&self, code: &str) -> Vec<&'a Product> {
        let catalog: &'a Catalog = self.catalog;
        let strategy = self.match_strategy;
        catalog
            .products
            .iter()
            .filter(|p| match strategy {
                MatchStrategy::Sku => p.sku.trim() == code,
                MatchStrategy::SupplierCode => {
                    p.supplier_code.as_deref().map(str::trim) == Some(code)
                }
            })
            .collect()
    }

    fn update_product(&mut self, product: &'a Product, new_price: f64, csv_name: &str) {
        let old_price = self
            .product_prices
            .get(product.id.as_str())
            .copied()
            .unwrap_or(match self.import_type {
                ImportType::Purchase => product.price,
                ImportType::Sale => product.sale_price.unwrap_or(0.0),
            });

        if within_tolerance(old_price, new_price) {
            debug!(
                "Product {} unchanged ({old_price} ~ {new_price})",
                product.id
            );
            return;
        }

        let update = match self.import_type {
            ImportType::Purchase => ProductUpdate {
                price: Some(new_price),
                ..Default::default()
            },
            ImportType::Sale => ProductUpdate {
                sale_price: Some(new_price),
                for_sale: Some(true),
                ..Default::default()
            },
        };

        info!(
            "Product {} ({}) price {old_price} -> {new_price}",
            product.id, product.name
        );
        self.product_prices.insert(product.id.as_str(), new_price);
        self.updates.push(PriceUpdate::Product {
            id: product.id.clone(),
            update,
        });
        self.result.updated += 1;
        self.result.details.updated_products.push(UpdatedProduct {
            product_id: product.id.clone(),
            name: product.name.clone(),
            old_price,
            new_price,
            csv_name: csv_name.to_string(),
        });
    }

    fn update_recipes(&mut self, code: &str, new_price: f64, csv_name: &str) {
        let catalog: &'a Catalog = self.catalog;
        for recipe in catalog
            .recipes
            .iter()
            .filter(|r| r.sku.as_deref().map(str::trim) == Some(code))
        {
            let old_price = self
                .recipe_prices
                .get(recipe.id.as_str())
                .copied()
                .unwrap_or(recipe.sale_price.unwrap_or(0.0));

            if within_tolerance(old_price, new_price) {
                continue;
            }

            info!(
                "Recipe {} ({}) sale price {old_price} -> {new_price}",
                recipe.id, recipe.name
            );
            self.recipe_prices.insert(recipe.id.as_str(), new_price);
            self.updates.push(PriceUpdate::Recipe {
                id: recipe.id.clone(),
                update: RecipeUpdate {
                    sale_price: Some(new_price),
                },
            });
            self.result.updated += 1;
            self.result.details.updated_recipes.push(UpdatedRecipe {
                recipe_id: recipe.id.clone(),
                name: recipe.name.clone(),
                old_price,
                new_price,
                csv_name: csv_name.to_string(),
            });
        }
    }

    fn not_found(
        &mut self,
        row: usize,
        code: String,
        rut: Option<String>,
        csv_name: String,
        reason: NotFoundReason,
    ) {
        let message = match reason {
            NotFoundReason::Product => format!("Row {row}: product {code} ({csv_name}) not found"),
            NotFoundReason::Provider => format!(
                "Row {row}: no provider with RUT {} for product {code}",
                rut.as_deref().unwrap_or("")
            ),
        };
        warn!("{message}");
        self.result.errors.push(message);
        self.result.details.not_found_products.push(NotFoundProduct {
            row,
            code,
            rut,
            csv_name,
            reason,
        });
    }

    fn invalid(&mut self, row: usize, reason: String) {
        let message = format!("Row {row}: {reason}");
        warn!("{message}");
        self.result.errors.push(message);
        self.result
            .details
            .invalid_rows
            .push(InvalidRow { row, reason });
    }
}

#[cfg(test)]
#[path = "row_reconciler_tests.rs"]
mod tests;
