use std::path::PathBuf;

use albion_craft_calculator::{
    app::{CraftingSession, SessionMaterial},
    config::Config,
    domain::{
        catalog::{category_names, subcategory_names},
        annotate_prices, items_by_category, price_label, resolve_prices_by_item, search_catalog,
        search_items, City, ItemId, PriceSide, Server,
    },
    infra::{albion::AlbionDataClient, cache::ItemCatalogCache},
    report::render_breakdown,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Crafting profit calculator for Albion Online")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "ALBION_CRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Market server (West, East, Europe); overrides config
    #[arg(long, global = true)]
    server: Option<Server>,

    /// Market city; overrides config
    #[arg(long, global = true)]
    city: Option<City>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate the profit of one crafting attempt
    ///
    /// The base recipe is taken from the first that applies:
    /// --request FILE; the config [defaults] when --material or --sale-price
    /// is given; otherwise the built-in T4 Bag example with its own fees,
    /// return bonus and tax. The config [defaults] never touch a request file
    /// or the example. Individual flags such as --tax-rate override the base
    /// recipe in every case.
    Calc(CalcArgs),
    /// Look up resolved market prices for items
    Price {
        /// Item ids, e.g. T4_LEATHER
        #[arg(required = true)]
        item_ids: Vec<String>,
    },
    /// Search items by name or id
    Search {
        query: String,
        /// Search the full community item dump instead of the built-in list
        #[arg(long)]
        remote: bool,
        #[command(flatten)]
        pricing: HitPricing,
    },
    /// List item categories, subcategories or their items
    Categories {
        category: Option<String>,
        subcategory: Option<String>,
        #[command(flatten)]
        pricing: HitPricing,
    },
}

#[derive(Args, Debug)]
struct HitPricing {
    /// Show the resolved market price next to each listed item
    #[arg(long)]
    prices: bool,

    /// Price items as materials (lowest buy order) instead of products (cheapest sell offer)
    #[arg(long, requires = "prices")]
    material: bool,
}

impl HitPricing {
    fn side(&self) -> Option<PriceSide> {
        match (self.prices, self.material) {
            (false, _) => None,
            (true, true) => Some(PriceSide::Buy),
            (true, false) => Some(PriceSide::Sell),
        }
    }
}

#[derive(Args, Debug)]
struct CalcArgs {
    /// TOML file describing the recipe
    #[arg(long)]
    request: Option<PathBuf>,

    /// Material as name:quantity:unit_price[:item_id]; repeatable
    #[arg(long = "material", value_parser = parse_material)]
    materials: Vec<SessionMaterial>,

    /// Market id of the crafted item, used with --fetch-prices
    #[arg(long)]
    item_id: Option<String>,

    /// Display name of the crafted item
    #[arg(long)]
    item_name: Option<String>,

    #[arg(long)]
    crafting_fee: Option<f64>,

    #[arg(long)]
    setup_fee: Option<f64>,

    /// Return bonus in percent
    #[arg(long)]
    return_bonus: Option<f64>,

    #[arg(long)]
    sale_price: Option<f64>,

    /// Market tax in percent
    #[arg(long)]
    tax_rate: Option<f64>,

    /// Refresh sale and material prices from the market before calculating
    #[arg(long)]
    fetch_prices: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_material(raw: &str) -> Result<SessionMaterial, String> {
    let parts: Vec<&str> = raw.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!(
            "expected name:quantity:unit_price[:item_id], got '{raw}'"
        ));
    }

    let quantity = parts[1]
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid quantity '{}': {err}", parts[1]))?;
    let unit_price = parts[2]
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid unit price '{}': {err}", parts[2]))?;

    let material = SessionMaterial::new(parts[0].trim(), quantity, unit_price);
    Ok(match parts.get(3).map(|id| id.trim()).filter(|id| !id.is_empty()) {
        Some(item_id) => material.with_item_id(item_id),
        None => material,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(server) = cli.server {
        config.market.server = server;
    }
    if let Some(city) = cli.city {
        config.market.city = city;
    }
    debug!(?config, "effective configuration");

    match cli.command {
        Command::Calc(args) => run_calc(&config, args).await,
        Command::Price { item_ids } => run_price(&config, &item_ids).await,
        Command::Search {
            query,
            remote,
            pricing,
        } => run_search(&config, &query, remote, &pricing).await,
        Command::Categories {
            category,
            subcategory,
            pricing,
        } => {
            run_categories(
                &config,
                category.as_deref(),
                subcategory.as_deref(),
                &pricing,
            )
            .await
        }
    }
}

fn market_client(config: &Config) -> Result<AlbionDataClient> {
    let client = AlbionDataClient::with_timeout(config.market.timeout())
        .context("build market client")?;
    Ok(match &config.market.base_url {
        Some(base) => client
            .with_base_url(base)
            .with_context(|| format!("invalid market base URL {base}"))?,
        None => client,
    })
}

async fn run_calc(config: &Config, args: CalcArgs) -> Result<()> {
    let (fetch_prices, json) = (args.fetch_prices, args.json);
    let mut session = build_session(config, args)?;

    if fetch_prices {
        let client = market_client(config)?;
        session
            .refresh_prices(
                &client,
                config.market.server,
                config.market.city,
                &config.market.qualities,
            )
            .await;
    }

    let result = session.calculate();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("serialize result")?
        );
    } else {
        print!("{}", render_breakdown(&result, &session.item_name));
    }
    Ok(())
}

/// Base recipe (request file, config defaults or the built-in example) with
/// the individual flags applied on top.
fn build_session(config: &Config, args: CalcArgs) -> Result<CraftingSession> {
    let mut session = match &args.request {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read request {}", path.display()))?;
            toml::from_str::<CraftingSession>(&raw)
                .with_context(|| format!("parse request {}", path.display()))?
        }
        None if args.materials.is_empty() && args.sale_price.is_none() => {
            CraftingSession::starter()
        }
        None => CraftingSession {
            fees: config.defaults.fees(),
            return_bonus_percent: config.defaults.return_bonus_percent,
            tax_rate_percent: config.defaults.tax_rate_percent,
            ..CraftingSession::default()
        },
    };

    if !args.materials.is_empty() {
        session.materials = args.materials;
    }
    if let Some(item_id) = args.item_id {
        session.item_id = Some(item_id);
    }
    if let Some(item_name) = args.item_name {
        session.item_name = item_name;
    }
    if let Some(fee) = args.crafting_fee {
        session.fees.crafting_fee = fee;
    }
    if let Some(fee) = args.setup_fee {
        session.fees.setup_fee = fee;
    }
    if let Some(bonus) = args.return_bonus {
        session.return_bonus_percent = bonus;
    }
    if let Some(price) = args.sale_price {
        session.sale_price = price;
    }
    if let Some(rate) = args.tax_rate {
        session.tax_rate_percent = rate;
    }
    Ok(session)
}

async fn run_price(config: &Config, item_ids: &[String]) -> Result<()> {
    let client = market_client(config)?;
    let quotes = client
        .fetch_market_data(
            item_ids,
            config.market.server,
            &[config.market.city],
            &config.market.qualities,
        )
        .await
        .context("fetch market data")?;

    let sell = resolve_prices_by_item(&quotes, PriceSide::Sell);
    let buy = resolve_prices_by_item(&quotes, PriceSide::Buy);

    println!(
        "{:<24}{:>12}{:>12}   ({}, {})",
        "item", "sell", "buy", config.market.city, config.market.server
    );
    for item_id in item_ids {
        let show = |price: Option<&f64>| price_label(price.copied().unwrap_or(0.0));
        println!(
            "{:<24}{:>12}{:>12}",
            item_id,
            show(sell.get(item_id)),
            show(buy.get(item_id))
        );
    }
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    remote: bool,
    pricing: &HitPricing,
) -> Result<()> {
    if remote {
        let client = market_client(config)?;
        let cache = ItemCatalogCache::new();
        let items = client.fetch_item_catalog(&cache).await;
        if items.is_empty() {
            bail!("item catalog unavailable");
        }
        let hits: Vec<(&str, &str)> = search_catalog(&items, query)
            .into_iter()
            .map(|item| {
                (
                    item.unique_name.as_str(),
                    item.english_name().unwrap_or_default(),
                )
            })
            .collect();
        print_hits(config, &hits, pricing).await
    } else {
        let hits: Vec<(&str, &str)> = search_items(query)
            .into_iter()
            .map(|item| (item.id.as_str(), item.name.as_str()))
            .collect();
        print_hits(config, &hits, pricing).await
    }
}

async fn run_categories(
    config: &Config,
    category: Option<&str>,
    subcategory: Option<&str>,
    pricing: &HitPricing,
) -> Result<()> {
    match (category, subcategory) {
        (None, _) => {
            for name in category_names() {
                println!("{name}");
            }
        }
        (Some(category), None) => {
            for name in subcategory_names(category)? {
                println!("{name}");
            }
        }
        (Some(category), Some(subcategory)) => {
            let hits: Vec<(&str, &str)> = items_by_category(category, Some(subcategory))?
                .into_iter()
                .map(|item| (item.id.as_str(), item.name.as_str()))
                .collect();
            print_hits(config, &hits, pricing).await?;
        }
    }
    Ok(())
}

/// Prints `(id, name)` hits, annotated with one market price each when asked.
/// A market failure leaves every price as `-`.
async fn print_hits(config: &Config, hits: &[(&str, &str)], pricing: &HitPricing) -> Result<()> {
    let Some(side) = pricing.side() else {
        for (id, name) in hits {
            println!("{id:<32}{name}");
        }
        return Ok(());
    };

    let ids: Vec<ItemId> = hits.iter().map(|(id, _)| id.to_string()).collect();
    let quotes = market_client(config)?
        .fetch_market_data_or_empty(
            &ids,
            config.market.server,
            &[config.market.city],
            &config.market.qualities,
        )
        .await;

    let priced = annotate_prices(hits.iter().map(|&(id, _)| id), &quotes, side);
    for ((id, name), (_, price)) in hits.iter().zip(priced) {
        println!("{id:<32}{name:<40}{:>10}", price_label(price));
    }
    Ok(())
}
