//! Recipe cost and suggested sale price.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::OrderError;
use crate::models::{Product, Recipe};
use crate::money::{line_subtotal, percentage_of, sum_rounded, with_markup};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeCost {
    /// Sum of ingredient costs at current product prices
    pub material_cost: f64,
    /// Overhead: `fixed_cost_percentage` of the material cost
    pub fixed_cost: f64,
    /// Material plus overhead, raised by `profit_percentage`
    pub suggested_price: f64,
}

impl RecipeCost {
    /// Material plus overhead, `None` if the sum overflows
    pub fn total_cost(&self) -> Option<f64> {
        sum_rounded([self.material_cost, self.fixed_cost])
    }
}

/// Costs a recipe from the current product prices.
///
/// Fails with [`OrderError::ProductNotFound`] when an ingredient references
/// a product that is not in `products`, and with
/// [`OrderError::AmountOutOfRange`] when a cost cannot be represented.
pub fn cost_recipe(recipe: &Recipe, products: &[Product]) -> Result<RecipeCost, OrderError> {
    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let out_of_range = || OrderError::AmountOutOfRange(format!("cost of recipe {}", recipe.id));

    let lines = recipe
        .ingredients
        .iter()
        .map(|ingredient| {
            let product = by_id
                .get(ingredient.product_id.as_str())
                .ok_or_else(|| OrderError::ProductNotFound(ingredient.product_id.clone()))?;
            line_subtotal(product.price, ingredient.quantity).ok_or_else(out_of_range)
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let material_cost = sum_rounded(lines).ok_or_else(out_of_range)?;
    let fixed_cost =
        percentage_of(material_cost, recipe.fixed_cost_percentage).ok_or_else(out_of_range)?;
    let suggested_price = sum_rounded([material_cost, fixed_cost])
        .and_then(|total| with_markup(total, recipe.profit_percentage))
        .ok_or_else(out_of_range)?;

    debug!(
        "Recipe {}: material {material_cost:.2}, fixed {fixed_cost:.2}, suggested {suggested_price:.2}",
        recipe.id
    );

    Ok(RecipeCost {
        material_cost,
        fixed_cost,
        suggested_price,
    })
}
