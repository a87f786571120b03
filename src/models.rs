use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::OrderError;
use crate::money::{in_range, MAX_PRICE};

/// Length of a valid Uruguayan RUT once non-digits are removed
pub const RUT_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub supplier_code: Option<String>,
    #[serde(default)]
    pub purchase_packaging: String,
    /// Purchase unit price
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub for_sale: bool,
    pub provider_id: String,
    /// Sector / shelf position, used to sort order lines
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub min_package_stock: u32,
    #[serde(default)]
    pub desired_stock: u32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Product {
    pub fn validate(&self) -> Result<(), OrderError> {
        let invalid = |reason: &str| OrderError::InvalidProduct {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !in_range(self.price, MAX_PRICE) {
            return Err(invalid("price must be a non-negative number within range"));
        }
        if let Some(sale_price) = self.sale_price {
            if !in_range(sale_price, MAX_PRICE) {
                return Err(invalid("sale price must be a non-negative number within range"));
            }
        }
        if self.min_package_stock > self.desired_stock {
            return Err(invalid("minimum stock exceeds desired stock"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub commercial_name: String,
    #[serde(default)]
    pub rut: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub delivery_days: BTreeSet<WeekDay>,
    #[serde(default)]
    pub order_days: BTreeSet<WeekDay>,
}

impl Provider {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.commercial_name.trim().is_empty() {
            return Err(OrderError::InvalidProvider {
                id: self.id.clone(),
                reason: "commercial name is empty".to_string(),
            });
        }
        if let Some(rut) = &self.rut {
            let cleaned = clean_rut(rut);
            if !cleaned.is_empty() && cleaned.len() != RUT_LENGTH {
                return Err(OrderError::InvalidProvider {
                    id: self.id.clone(),
                    reason: format!("RUT must have {RUT_LENGTH} digits, got {}", cleaned.len()),
                });
            }
        }
        Ok(())
    }

    /// Digits-only RUT, `None` when the provider has no usable tax id
    pub fn cleaned_rut(&self) -> Option<String> {
        self.rut
            .as_deref()
            .map(clean_rut)
            .filter(|rut| !rut.is_empty())
    }
}

/// Keeps only the digits of a RUT ("21.234.567-0012" -> "212345670012").
pub fn clean_rut(rut: &str) -> String {
    rut.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIngredient {
    pub product_id: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub for_sale: bool,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub fixed_cost_percentage: f64,
    #[serde(default)]
    pub profit_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: f64,
    /// Product price at the time the order was built
    pub price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub provider_id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total: f64,
}

impl Order {
    /// Marks the order as sent or printed.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Pending, OrderStatus::Completed)
    }

    /// Puts a completed order back into editing.
    pub fn reopen(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Completed, OrderStatus::Pending)
    }

    fn transition(&mut self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if self.status != from {
            log::warn!(
                "Rejected order transition {} -> {} for order {:?}",
                self.status,
                to,
                self.id
            );
            return Err(OrderError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        log::info!("Order {:?} moved from {} to {}", self.id, from, to);
        self.status = to;
        Ok(())
    }
}

/// Snapshot of everything the business rules read.
///
/// Passed explicitly to the importer and the order calculator instead of
/// being fetched from a shared cache by each caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Catalog {
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Finds a provider by tax id, ignoring formatting characters on both sides.
    pub fn provider_by_rut(&self, rut: &str) -> Option<&Provider> {
        let wanted = clean_rut(rut);
        if wanted.is_empty() {
            return None;
        }
        self.providers
            .iter()
            .find(|p| p.cleaned_rut().as_deref() == Some(wanted.as_str()))
    }

    /// Validates every product and provider, returning one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .products
            .iter()
            .filter_map(|p| p.validate().err())
            .chain(self.providers.iter().filter_map(|p| p.validate().err()))
            .map(|e| e.to_string())
            .collect();

        for product in &self.products {
            if self.provider(&product.provider_id).is_none() {
                errors.push(format!(
                    "Product {} references unknown provider {}",
                    product.id, product.provider_id
                ));
            }
        }

        if !errors.is_empty() {
            log::warn!("Catalog validation found {} problems", errors.len());
        }
        errors
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
