//! Unit tests for order validation.

use super::*;
use crate::money::MAX_QUANTITY;
use crate::models::{OrderItem, OrderStatus};
use crate::test_support::product;
use chrono::Utc;

fn products() -> Vec<Product> {
    vec![
        product("p1", "A", 10.0, "prov-1"),
        product("p2", "B", 2.5, "prov-1"),
    ]
}

fn item(product_id: &str, quantity: f64, price: f64) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        quantity,
        price,
        subtotal: line_subtotal(price, quantity).unwrap_or(f64::NAN),
    }
}

fn valid_order() -> Order {
    Order {
        id: None,
        provider_id: "prov-1".to_string(),
        date: Utc::now(),
        status: OrderStatus::Pending,
        items: vec![item("p1", 2.0, 10.0), item("p2", 4.0, 2.5)],
        total: 30.0,
    }
}

#[test]
fn accepts_consistent_order() {
    assert_eq!(validate_order(&valid_order(), &products()), None);
}

#[test]
fn rejects_missing_provider() {
    let mut order = valid_order();
    order.provider_id = "  ".to_string();
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("no provider"));
}

#[test]
fn rejects_empty_items() {
    let mut order = valid_order();
    order.items.clear();
    order.total = 0.0;
    assert!(validate_order(&order, &products()).unwrap().contains("no items"));
}

#[test]
fn rejects_duplicate_products() {
    let mut order = valid_order();
    order.items.push(item("p1", 1.0, 10.0));
    order.total = 40.0;
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("more than once"));
}

#[test]
fn rejects_zero_and_negative_quantities() {
    for quantity in [0.0, -1.0, f64::NAN] {
        let mut order = valid_order();
        order.items[0] = item("p1", quantity, 10.0);
        let message = validate_order(&order, &products()).unwrap();
        assert!(message.contains("greater than zero"), "{message}");
    }
}

#[test]
fn rejects_unknown_product() {
    let mut order = valid_order();
    order.items[1] = item("ghost", 4.0, 2.5);
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("ghost no longer exists"));
}

#[test]
fn rejects_stale_price() {
    let mut catalog = products();
    catalog[0].price = 11.0;
    assert!(validate_order(&valid_order(), &catalog)
        .unwrap()
        .contains("Price of p1-product-name changed"));
}

#[test]
fn tolerates_one_cent_price_drift() {
    let mut catalog = products();
    catalog[0].price = 10.01;
    assert_eq!(validate_order(&valid_order(), &catalog), None);
}

#[test]
fn rejects_wrong_subtotal() {
    let mut order = valid_order();
    order.items[0].subtotal = 25.0;
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("Subtotal"));
}

#[test]
fn rejects_wrong_total() {
    let mut order = valid_order();
    order.total = 31.0;
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("Order total is 31.00, expected 30.00"));
}

#[test]
fn reports_first_problem_only() {
    let mut order = valid_order();
    order.items.push(item("p1", 0.0, 99.0));
    order.total = 0.0;

    // duplicate is checked before quantity, price and total
    let message = validate_order(&order, &products()).unwrap();
    assert!(message.contains("more than once"));
}

#[test]
fn rejects_infinite_and_oversized_quantities() {
    for quantity in [f64::INFINITY, MAX_QUANTITY + 1.0] {
        let mut order = valid_order();
        order.items[0] = item("p1", quantity, 10.0);
        let message = validate_order(&order, &products()).unwrap();
        assert!(message.contains("exceeds"), "{message}");
    }
}

#[test]
fn rejects_non_finite_price() {
    let mut order = valid_order();
    order.items[0].price = f64::NAN;
    let message = validate_order(&order, &products()).unwrap();
    assert!(message.contains("Price of p1-product-name is out of range"), "{message}");
}

#[test]
fn rejects_non_finite_subtotal_and_total() {
    let mut order = valid_order();
    order.items[1].subtotal = f64::INFINITY;
    assert!(validate_order(&order, &products())
        .unwrap()
        .contains("Subtotal of p2-product-name"));

    let mut order = valid_order();
    order.total = f64::NAN;
    assert!(validate_order(&order, &products())
        .unwrap()
        .starts_with("Order total is NaN"));
}

#[test]
fn overflowing_order_is_rejected_without_panicking() {
    let mut catalog = products();
    catalog[0].price = 1e10;
    let mut order = valid_order();
    order.items[0] = OrderItem {
        product_id: "p1".to_string(),
        quantity: 1e20,
        price: 1e10,
        subtotal: 1e30,
    };
    order.total = 1e30;

    let message = validate_order(&order, &catalog).unwrap();
    assert!(message.contains("exceeds"), "{message}");
}
