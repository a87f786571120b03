//! Order validation logic.
//!
//! Checks an order against the live product catalog right before it is
//! persisted. Unlike the price import, which collects every problem, this
//! stops at the first failure: an order is accepted or rejected as a whole.

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use crate::models::{Order, Product};
use crate::money::{
    in_range, line_subtotal, sum_rounded, within_tolerance, MAX_PRICE, MAX_QUANTITY,
};

/// Validates an order.
///
/// # Arguments
/// * `order` - The order about to be saved
/// * `products` - Current catalog products
///
/// # Returns
/// `None` when the order is valid, otherwise a message describing the first
/// problem found.
pub fn validate_order(order: &Order, products: &[Product]) -> Option<String> {
    debug!(
        "Validating order for provider {} with {} items",
        order.provider_id,
        order.items.len()
    );

    match first_violation(order, products) {
        Some(message) => {
            warn!("Order validation failed: {message}");
            Some(message)
        }
        None => {
            info!("Order for provider {} passed validation", order.provider_id);
            None
        }
    }
}

fn first_violation(order: &Order, products: &[Product]) -> Option<String> {
    if order.provider_id.trim().is_empty() {
        return Some("The order has no provider".to_string());
    }

    if order.items.is_empty() {
        return Some("The order has no items".to_string());
    }

    let mut seen = HashSet::new();
    for item in &order.items {
        if !seen.insert(item.product_id.as_str()) {
            return Some(format!("Product {} appears more than once", item.product_id));
        }
    }

    if let Some(item) = order.items.iter().find(|item| item.quantity.is_nan() || item.quantity <= 0.0) {
        return Some(format!(
            "Quantity for product {} must be greater than zero, got {}",
            item.product_id, item.quantity
        ));
    }

    if let Some(item) = order.items.iter().find(|item| !in_range(item.quantity, MAX_QUANTITY)) {
        return Some(format!(
            "Quantity for product {} exceeds {MAX_QUANTITY}, got {}",
            item.product_id, item.quantity
        ));
    }

    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut expected_lines = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let Some(product) = by_id.get(item.product_id.as_str()) else {
            return Some(format!("Product {} no longer exists", item.product_id));
        };

        if !in_range(item.price, MAX_PRICE) {
            return Some(format!(
                "Price of {} is out of range, got {}",
                product.name, item.price
            ));
        }

        if !within_tolerance(item.price, product.price) {
            return Some(format!(
                "Price of {} changed: order has {:.2}, catalog has {:.2}",
                product.name, item.price, product.price
            ));
        }

        let Some(expected) = line_subtotal(item.price, item.quantity) else {
            return Some(format!("Subtotal of {} is out of range", product.name));
        };
        if !within_tolerance(item.subtotal, expected) {
            return Some(format!(
                "Subtotal of {} is {:.2}, expected {:.2}",
                product.name, item.subtotal, expected
            ));
        }
        expected_lines.push(expected);
    }

    let Some(expected_total) = sum_rounded(expected_lines) else {
        return Some("Order total is out of range".to_string());
    };
    if !within_tolerance(order.total, expected_total) {
        return Some(format!(
            "Order total is {:.2}, expected {:.2}",
            order.total, expected_total
        ));
    }

    None
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
