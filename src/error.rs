//! Error types for purchase_manager

use thiserror::Error;

/// File-level failures of a price import.
///
/// Row-level problems never surface here; they are collected in the
/// [`ImportResult`](crate::price_import::ImportResult) instead.
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    /// Header plus at least one data row is required
    #[error("The file is empty or has no data rows")]
    EmptyFile,
    /// One or more required columns are missing from the header row
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
    /// The tokenizer could not read a line
    #[error("Line {line} could not be parsed: {reason}")]
    UnparseableLine { line: usize, reason: String },
}

/// Failures while building, validating or transitioning an order.
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("A provider must be selected")]
    MissingProvider,
    #[error("The product catalog is empty")]
    EmptyCatalog,
    #[error("Product {0} no longer exists")]
    ProductNotFound(String),
    #[error("Invalid product {id}: {reason}")]
    InvalidProduct { id: String, reason: String },
    #[error("Quantity for product {product_id} must be a positive number within range, got {quantity}")]
    InvalidQuantity { product_id: String, quantity: f64 },
    /// An amount does not fit the decimal range used for money
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
    #[error("Invalid provider {id}: {reason}")]
    InvalidProvider { id: String, reason: String },
    #[error("Order cannot go from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Order rejected: {0}")]
    Validation(String),
}

/// Configuration persistence failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
