//! Pure crafting-profit logic: price resolution, profit breakdown and the item catalog.

pub mod catalog;
pub mod entities;
pub mod evaluation;
pub mod pricing;

pub use catalog::{
    common_items, item_by_id, items_by_category, search_catalog, search_items, AlbionItem,
    CatalogError, CatalogItem,
};
pub use entities::{
    City, FeeSet, ItemId, MarketQuote, Material, PriceSide, ProfitRequest, ProfitResult,
    ProfitSign, Server, DEFAULT_QUALITY,
};
pub use evaluation::{calculate, profit_sign};
pub use pricing::{
    annotate_prices, format_price, price_label, quotes_for_item, resolve_price,
    resolve_prices_by_item,
};
