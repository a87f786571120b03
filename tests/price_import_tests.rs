//! Integration tests for price imports.
//!
//! These tests load the catalog snapshot and price lists from
//! `tests/fixtures`, run the full import against an in-memory store and check
//! what ends up persisted.

use purchase_manager::price_import::{MatchStrategy, NotFoundReason};
use purchase_manager::{
    ImportError, ImportOptions, ImportType, InMemoryStore, PriceImporter,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

async fn load_store() -> InMemoryStore {
    InMemoryStore::load(fixtures_path().join("catalog.json"))
        .await
        .unwrap()
}

async fn read_fixture(name: &str) -> String {
    PriceImporter::default()
        .read_file(fixtures_path().join(name))
        .await
        .unwrap()
}

// ==================== Purchase Price Lists ====================

mod purchase_import {
    use super::*;

    #[tokio::test]
    async fn updates_matching_products_per_provider() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("purchase_prices.csv").await;

        let result = PriceImporter::default()
            .import(&store, &catalog, &csv, ImportType::Purchase)
            .await
            .unwrap();

        assert_eq!(result.updated, 2);
        let updated: Vec<(&str, f64, f64)> = result
            .details
            .updated_products
            .iter()
            .map(|u| (u.product_id.as_str(), u.old_price, u.new_price))
            .collect();
        assert_eq!(
            updated,
            vec![("p-flour", 1.2, 1.35), ("p-butter", 8.5, 8.75)]
        );

        let after = store.snapshot().unwrap();
        assert_eq!(after.product("p-flour").unwrap().price, 1.35);
        assert_eq!(after.product("p-sugar").unwrap().price, 0.95);
        assert_eq!(after.product("p-butter").unwrap().price, 8.75);
        assert_eq!(after.product("p-milk").unwrap().price, 1.1);
    }

    #[tokio::test]
    async fn reports_every_bad_row_with_its_line_number() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("purchase_prices.csv").await;

        let result = PriceImporter::default()
            .preview(&catalog, &csv, ImportType::Purchase)
            .unwrap();

        let not_found: Vec<(usize, &str, NotFoundReason)> = result
            .details
            .not_found_products
            .iter()
            .map(|n| (n.row, n.code.as_str(), n.reason))
            .collect();
        assert_eq!(
            not_found,
            vec![
                (4, "MAN-10", NotFoundReason::Product),
                (5, "LEC-11", NotFoundReason::Provider),
            ]
        );

        let invalid: Vec<usize> = result.details.invalid_rows.iter().map(|r| r.row).collect();
        assert_eq!(invalid, vec![7, 8]);
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors[0].starts_with("Row 4:"));
    }

    #[tokio::test]
    async fn preview_leaves_catalog_untouched() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("purchase_prices.csv").await;

        let result = PriceImporter::default()
            .preview(&catalog, &csv, ImportType::Purchase)
            .unwrap();

        assert_eq!(result.updated, 2);
        assert_eq!(store.snapshot().unwrap(), catalog);
    }

    #[tokio::test]
    async fn second_run_changes_nothing() {
        let store = load_store().await;
        let csv = read_fixture("purchase_prices.csv").await;
        let importer = PriceImporter::default();

        let first = importer
            .import(&store, &store.snapshot().unwrap(), &csv, ImportType::Purchase)
            .await
            .unwrap();
        let second = importer
            .import(&store, &store.snapshot().unwrap(), &csv, ImportType::Purchase)
            .await
            .unwrap();

        assert_eq!(first.updated, 2);
        assert_eq!(second.updated, 0);
        assert_eq!(second.errors, first.errors);
    }

    #[tokio::test]
    async fn supplier_code_strategy_ignores_sku() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = "fecha;rut;codigo;nombre;precio\n\
                   2024-05-02;210987650019;L-550;Manteca;9,10\n\
                   2024-05-02;210987650019;MAN-10;Manteca;9,20\n";

        let importer = PriceImporter::new(ImportOptions {
            match_strategy: MatchStrategy::SupplierCode,
        });
        let result = importer
            .import(&store, &catalog, csv, ImportType::Purchase)
            .await
            .unwrap();

        assert_eq!(result.updated, 1);
        assert_eq!(result.details.not_found_products[0].code, "MAN-10");
        assert_eq!(store.snapshot().unwrap().product("p-butter").unwrap().price, 9.1);
    }
}

// ==================== Sale Price Lists ====================

mod sale_import {
    use super::*;

    #[tokio::test]
    async fn updates_sale_prices_and_linked_recipes() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("sale_prices.csv").await;

        let result = PriceImporter::default()
            .import(&store, &catalog, &csv, ImportType::Sale)
            .await
            .unwrap();

        assert_eq!(result.updated, 3);
        assert_eq!(result.details.updated_recipes.len(), 1);
        assert_eq!(result.details.updated_recipes[0].recipe_id, "r-alfajor");

        let after = store.snapshot().unwrap();
        let flour = after.product("p-flour").unwrap();
        assert_eq!(flour.sale_price, Some(2.1));
        assert!(flour.for_sale);
        // purchase price is not touched by a sale import
        assert_eq!(flour.price, 1.2);
        assert_eq!(after.product("p-alfajor").unwrap().sale_price, Some(1.25));
        assert_eq!(after.product("p-milk").unwrap().sale_price, Some(1.5));

        let alfajor = after.recipes.iter().find(|r| r.id == "r-alfajor").unwrap();
        assert_eq!(alfajor.sale_price, Some(1.25));
    }

    #[tokio::test]
    async fn recipe_only_codes_are_not_found() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("sale_prices.csv").await;

        let result = PriceImporter::default()
            .preview(&catalog, &csv, ImportType::Sale)
            .unwrap();

        assert_eq!(result.details.not_found_products.len(), 1);
        let missing = &result.details.not_found_products[0];
        assert_eq!(missing.code, "TORTA-1");
        assert_eq!(missing.row, 5);
        assert_eq!(missing.rut, None);

        let cake = catalog.recipes.iter().find(|r| r.id == "r-cake").unwrap();
        assert_eq!(cake.sale_price, Some(12.0));
    }
}

// ==================== File Level Errors ====================

mod file_errors {
    use super::*;

    #[tokio::test]
    async fn missing_columns_abort_before_any_write() {
        let store = load_store().await;
        let catalog = store.snapshot().unwrap();
        let csv = read_fixture("missing_columns.csv").await;

        let err = PriceImporter::default()
            .import(&store, &catalog, &csv, ImportType::Sale)
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<ImportError>(),
            Some(&ImportError::MissingHeaders(vec!["contado".to_string()]))
        );
        assert_eq!(store.snapshot().unwrap(), catalog);
    }

    #[tokio::test]
    async fn unreadable_file_reports_context() {
        let err = PriceImporter::default()
            .read_file(fixtures_path().join("does_not_exist.csv"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to read price list file"));
    }
}

// ==================== Snapshot Persistence ====================

#[tokio::test]
async fn imported_prices_survive_persist_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");

    let store = load_store().await;
    let csv = read_fixture("purchase_prices.csv").await;
    PriceImporter::default()
        .import(&store, &store.snapshot().unwrap(), &csv, ImportType::Purchase)
        .await
        .unwrap();
    store.persist(&path).await.unwrap();

    let reloaded = InMemoryStore::load(&path).await.unwrap().snapshot().unwrap();
    assert_eq!(reloaded, store.snapshot().unwrap());
    assert_eq!(reloaded.product("p-flour").unwrap().price, 1.35);
}
