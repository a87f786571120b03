//! Purchase order building and validation.
//!
//! # Module Structure
//!
//! - [`validator`] - Checks an order against the live catalog before it is saved
//!
//! Building an order is all-or-nothing: a selection that references a product
//! which no longer exists fails the whole build. Validation likewise reports
//! only the first problem it finds.

pub mod validator;

use anyhow::Context;
use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::OrderError;
use crate::models::{Order, OrderItem, OrderStatus, Product};
use crate::money::{
    in_range, line_subtotal, round2, sum_rounded, MAX_PRICE, MAX_QUANTITY,
};
use crate::storage::CatalogStore;

pub use validator::validate_order;

/// Selected product ids and quantities, in the order the user picked them
pub type Selection = IndexMap<String, f64>;

/// Builds an unsaved, pending order from a product selection.
///
/// # Arguments
/// * `provider_id` - Provider the order is addressed to
/// * `selection` - Product id to quantity
/// * `products` - Current catalog products
///
/// # Returns
/// The order with one line per selected product, sorted by the products'
/// `order` field, or an error if the input is unusable. Quantities must be
/// positive and at most [`MAX_QUANTITY`]; prices at most [`MAX_PRICE`].
pub fn create_order(
    provider_id: &str,
    selection: &Selection,
    products: &[Product],
) -> Result<Order, OrderError> {
    if provider_id.trim().is_empty() {
        warn!("Cannot build order without a provider");
        return Err(OrderError::MissingProvider);
    }
    if products.is_empty() {
        warn!("Cannot build order against an empty catalog");
        return Err(OrderError::EmptyCatalog);
    }

    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut lines: Vec<(i64, OrderItem)> = Vec::with_capacity(selection.len());
    for (product_id, quantity) in selection {
        let product = by_id
            .get(product_id.as_str())
            .ok_or_else(|| OrderError::ProductNotFound(product_id.clone()))?;

        if !in_range(*quantity, MAX_QUANTITY) || *quantity == 0.0 {
            warn!("Rejected quantity {quantity} for product {product_id}");
            return Err(OrderError::InvalidQuantity {
                product_id: product_id.clone(),
                quantity: *quantity,
            });
        }
        if !in_range(product.price, MAX_PRICE) {
            return Err(OrderError::InvalidProduct {
                id: product.id.clone(),
                reason: format!("price {} is outside 0 to {MAX_PRICE}", product.price),
            });
        }

        let price = round2(product.price);
        let subtotal = line_subtotal(price, *quantity).ok_or_else(|| {
            OrderError::AmountOutOfRange(format!("subtotal of product {product_id}"))
        })?;
        debug!("Line {product_id}: {quantity} x {price:.2} = {subtotal:.2}");

        lines.push((
            product.order,
            OrderItem {
                product_id: product_id.clone(),
                quantity: *quantity,
                price,
                subtotal,
            },
        ));
    }

    // stable: equal `order` keeps selection order
    lines.sort_by_key(|(order, _)| *order);
    let items: Vec<OrderItem> = lines.into_iter().map(|(_, item)| item).collect();
    let total = sum_rounded(items.iter().map(|item| item.subtotal))
        .ok_or_else(|| OrderError::AmountOutOfRange("order total".to_string()))?;

    info!(
        "Built order for provider {provider_id}: {} lines, total {total:.2}",
        items.len()
    );

    Ok(Order {
        id: None,
        provider_id: provider_id.to_string(),
        date: Utc::now(),
        status: OrderStatus::Pending,
        items,
        total,
    })
}

/// Validates an order and hands it to the store.
///
/// Returns the stored order id. A validation failure is returned as
/// [`OrderError::Validation`] without touching the store.
pub async fn submit_order(
    store: &dyn CatalogStore,
    order: &Order,
    products: &[Product],
) -> anyhow::Result<String> {
    if let Some(message) = validate_order(order, products) {
        warn!("Order for provider {} rejected: {message}", order.provider_id);
        return Err(OrderError::Validation(message).into());
    }

    let id = store
        .save_order(order, order.id.as_deref())
        .await
        .context("Failed to save order")?;
    info!("Order {id} saved with total {:.2}", order.total);
    Ok(id)
}

/// Totals shown next to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub lines: usize,
    pub units: f64,
    pub total: f64,
}

impl OrderSummary {
    pub fn of(order: &Order) -> Self {
        Self {
            lines: order.items.len(),
            units: round2(order.items.iter().map(|item| item.quantity).sum()),
            total: order.total,
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
