//! Builders shared by the unit tests.

use crate::models::{Catalog, Product, Provider, Recipe};

pub fn product(id: &str, sku: &str, price: f64, provider_id: &str) -> Product {
    Product {
        id: id.to_string(),
        name: format!("{id}-product-name"),
        sku: sku.to_string(),
        supplier_code: None,
        purchase_packaging: "box".to_string(),
        price,
        sale_price: None,
        for_sale: false,
        provider_id: provider_id.to_string(),
        order: 0,
        min_package_stock: 1,
        desired_stock: 4,
        tags: Default::default(),
    }
}

pub fn provider(id: &str, rut: Option<&str>) -> Provider {
    Provider {
        id: id.to_string(),
        commercial_name: format!("{id} S.A."),
        rut: rut.map(str::to_string),
        phone: None,
        delivery_days: Default::default(),
        order_days: Default::default(),
    }
}

pub fn recipe(id: &str, sku: Option<&str>, sale_price: Option<f64>) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: format!("{id}-recipe-name"),
        sku: sku.map(str::to_string),
        sale_price,
        for_sale: true,
        ingredients: Vec::new(),
        fixed_cost_percentage: 0.0,
        profit_percentage: 0.0,
    }
}

pub fn catalog(products: Vec<Product>, providers: Vec<Provider>, recipes: Vec<Recipe>) -> Catalog {
    Catalog {
        products,
        providers,
        recipes,
        orders: Vec::new(),
    }
}
