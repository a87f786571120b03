//! Purchase Manager CLI
//!
//! Imports supplier and sale price lists into a catalog snapshot, builds and
//! validates purchase orders, costs recipes and lists products.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use purchase_manager::config::{AppConfig, ProductFilter};
use purchase_manager::order_calculator::{create_order, submit_order, OrderSummary, Selection};
use purchase_manager::price_import::{ImportType, MatchStrategy, PriceImporter};
use purchase_manager::recipe_costing::cost_recipe;
use purchase_manager::storage::InMemoryStore;
use purchase_manager::{validate_order, Order};

/// Supplier price imports and purchase orders
#[derive(Parser, Debug)]
#[command(name = "purchase_manager")]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (default: $PURCHASE_MANAGER_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Update product and recipe prices from a CSV price list
    ImportPrices {
        /// Catalog snapshot (JSON)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Price list file
        #[arg(short, long)]
        file: PathBuf,
        /// purchase (compra) or sale (venta)
        #[arg(short = 't', long = "type")]
        import_type: ImportType,
        /// Override the configured product matching rule
        #[arg(long)]
        match_by: Option<MatchBy>,
        /// Report what would change without writing the catalog
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Build a purchase order from product quantities
    CreateOrder {
        #[arg(short, long)]
        catalog: PathBuf,
        #[arg(short, long)]
        provider: String,
        /// Product and quantity as PRODUCT_ID=QTY, repeatable
        #[arg(short, long = "item", value_parser = parse_item, required = true)]
        items: Vec<(String, f64)>,
        /// Validate and store the order in the catalog
        #[arg(long, default_value_t = false)]
        save: bool,
    },
    /// Check an order file against the current catalog
    ValidateOrder {
        #[arg(short, long)]
        catalog: PathBuf,
        /// Order (JSON)
        #[arg(short, long)]
        order: PathBuf,
    },
    /// Show the cost and suggested price of a recipe
    CostRecipe {
        #[arg(short, long)]
        catalog: PathBuf,
        #[arg(short, long)]
        recipe: String,
    },
    /// List products, narrowed by the saved filter and any options given
    ListProducts {
        #[arg(short, long)]
        catalog: PathBuf,
        /// Text to look for in the name or SKU
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        provider: Option<String>,
        /// Only products marked for sale
        #[arg(long, default_value_t = false)]
        for_sale: bool,
        /// Required tag, repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Ignore the filter saved in the settings
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings
    Show,
    /// Print the settings file location
    Path,
    /// Write the effective settings to the settings file
    Init,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MatchBy {
    Sku,
    SupplierCode,
}

impl From<MatchBy> for MatchStrategy {
    fn from(value: MatchBy) -> Self {
        match value {
            MatchBy::Sku => MatchStrategy::Sku,
            MatchBy::SupplierCode => MatchStrategy::SupplierCode,
        }
    }
}

fn parse_item(raw: &str) -> Result<(String, f64), String> {
    let (id, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PRODUCT_ID=QTY, got '{raw}'"))?;
    let quantity: f64 = quantity
        .trim()
        .parse()
        .map_err(|e| format!("invalid quantity in '{raw}': {e}"))?;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(format!("quantity in '{raw}' must be a positive number"));
    }
    Ok((id.trim().to_string(), quantity))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    log::debug!("Config path: {}", config_path.display());
    let config = AppConfig::load(&config_path);

    if let Err(e) = run(args.command, config, &config_path).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: AppConfig, config_path: &Path) -> Result<()> {
    match command {
        Command::ImportPrices {
            catalog,
            file,
            import_type,
            match_by,
            dry_run,
        } => {
            let mut options = config.import.clone();
            if let Some(match_by) = match_by {
                options.match_strategy = match_by.into();
            }
            import_prices(&catalog, &file, import_type, PriceImporter::new(options), dry_run).await
        }
        Command::CreateOrder {
            catalog,
            provider,
            items,
            save,
        } => {
            let selection: Selection = items.into_iter().collect();
            build_order(&catalog, &provider, &selection, save).await
        }
        Command::ValidateOrder { catalog, order } => check_order(&catalog, &order).await,
        Command::CostRecipe { catalog, recipe } => show_recipe_cost(&catalog, &recipe).await,
        Command::ListProducts {
            catalog,
            search,
            provider,
            for_sale,
            tags,
            all,
        } => {
            let mut filter = if all {
                ProductFilter::default()
            } else {
                config.product_filter.clone()
            };
            if let Some(search) = search {
                filter.search = search;
            }
            if provider.is_some() {
                filter.provider_id = provider;
            }
            filter.only_for_sale |= for_sale;
            filter.tags.extend(tags);
            list_products(&catalog, &filter).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => print_json(&config),
            ConfigAction::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigAction::Init => {
                config
                    .save(config_path)
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
                log::info!("Settings written to {}", config_path.display());
                Ok(())
            }
        },
    }
}

async fn import_prices(
    catalog_path: &Path,
    file: &Path,
    import_type: ImportType,
    importer: PriceImporter,
    dry_run: bool,
) -> Result<()> {
    let store = InMemoryStore::load(catalog_path).await?;
    let catalog = store.snapshot()?;
    let csv = importer.read_file(file).await?;

    let result = if dry_run {
        log::info!("Dry run, catalog will not be modified");
        importer.preview(&catalog, &csv, import_type)?
    } else {
        let result = importer.import(&store, &catalog, &csv, import_type).await?;
        store.persist(catalog_path).await?;
        result
    };

    for error in &result.errors {
        log::warn!("{error}");
    }
    log::info!("{} prices updated", result.updated);
    print_json(&result)
}

async fn build_order(
    catalog_path: &Path,
    provider_id: &str,
    selection: &Selection,
    save: bool,
) -> Result<()> {
    let store = InMemoryStore::load(catalog_path).await?;
    let catalog = store.snapshot()?;

    if catalog.provider(provider_id).is_none() {
        log::warn!("Provider {provider_id} is not in the catalog");
    }

    let mut order = create_order(provider_id, selection, &catalog.products)?;
    let summary = OrderSummary::of(&order);
    log::info!(
        "{} lines, {} units, total {:.2}",
        summary.lines,
        summary.units,
        summary.total
    );

    if save {
        let id = submit_order(&store, &order, &catalog.products).await?;
        store.persist(catalog_path).await?;
        order.id = Some(id);
    }

    print_json(&order)
}

async fn check_order(catalog_path: &Path, order_path: &Path) -> Result<()> {
    let store = InMemoryStore::load(catalog_path).await?;
    let catalog = store.snapshot()?;

    let content = tokio::fs::read_to_string(order_path)
        .await
        .with_context(|| format!("Failed to read order file {order_path:?}"))?;
    let order: Order = serde_json::from_str(&content).context("Failed to parse order JSON")?;

    match validate_order(&order, &catalog.products) {
        None => {
            println!("Order is valid");
            Ok(())
        }
        Some(message) => Err(anyhow!("Order is invalid: {message}")),
    }
}

async fn show_recipe_cost(catalog_path: &Path, recipe_id: &str) -> Result<()> {
    let store = InMemoryStore::load(catalog_path).await?;
    let catalog = store.snapshot()?;

    let recipe = catalog
        .recipes
        .iter()
        .find(|r| r.id == recipe_id)
        .ok_or_else(|| anyhow!("Recipe {recipe_id} not found"))?;

    let cost = cost_recipe(recipe, &catalog.products)?;
    if let Some(sale_price) = recipe.sale_price {
        log::info!(
            "{}: sells at {sale_price:.2}, suggested {:.2}",
            recipe.name,
            cost.suggested_price
        );
    }
    print_json(&cost)
}

async fn list_products(catalog_path: &Path, filter: &ProductFilter) -> Result<()> {
    let store = InMemoryStore::load(catalog_path).await?;
    let catalog = store.snapshot()?;

    if !filter.is_empty() {
        log::debug!("Filtering products with {filter:?}");
    }
    let products = filter.apply(&catalog.products);
    log::info!("{} of {} products", products.len(), catalog.products.len());
    print_json(&products)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
