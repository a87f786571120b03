//! Purchase Manager
//!
//! This library provides the business rules behind supplier management:
//! importing purchase and sale prices from CSV exports, building and
//! validating purchase orders, costing recipes, and autosaving orders while
//! they are edited.

pub mod autosave;
pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod order_calculator;
pub mod price_import;
pub mod recipe_costing;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use autosave::{
    AutosaveConfig, AutosaveCoordinator, AutosaveEvent, AutosaveSession, EditorState, RetryPolicy,
};
pub use config::{AppConfig, ProductFilter};
pub use error::{ConfigError, ImportError, OrderError};
pub use models::*;
pub use order_calculator::{create_order, submit_order, validate_order, OrderSummary, Selection};
pub use price_import::{reconcile, ImportOptions, ImportResult, ImportType, PriceImporter};
pub use recipe_costing::{cost_recipe, RecipeCost};
pub use storage::{CatalogStore, InMemoryStore};
