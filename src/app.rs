//! Crafting session state: the recipe being evaluated plus the glue that
//! feeds fetched market prices into it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    domain::{
        calculate, quotes_for_item, resolve_price, City, FeeSet, ItemId, MarketQuote, Material,
        PriceSide, ProfitRequest, ProfitResult, Server, DEFAULT_QUALITY,
    },
    infra::albion::AlbionDataClient,
};

/// Quality tier used for price lookups unless configured otherwise.
pub const DEFAULT_QUALITIES: [u8; 1] = [DEFAULT_QUALITY];

/// A material line that can optionally be priced from the market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionMaterial {
    #[serde(flatten)]
    pub material: Material,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
}

impl SessionMaterial {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            material: Material::new(name, quantity, unit_price),
            item_id: None,
        }
    }

    pub fn with_item_id(mut self, item_id: impl Into<ItemId>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CraftingSession {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub materials: Vec<SessionMaterial>,
    #[serde(default)]
    pub fees: FeeSet,
    #[serde(default)]
    pub return_bonus_percent: f64,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub tax_rate_percent: f64,
}

impl CraftingSession {
    /// The T4 bag recipe the calculator opens with.
    pub fn starter() -> Self {
        Self {
            item_id: Some("T4_BAG".to_string()),
            item_name: "T4 Bag".to_string(),
            materials: vec![
                SessionMaterial::new("T4 Leather", 16, 1000.0).with_item_id("T4_LEATHER"),
                SessionMaterial::new("T4 Cloth", 8, 1200.0).with_item_id("T4_CLOTH"),
            ],
            fees: FeeSet {
                crafting_fee: 2000.0,
                setup_fee: 0.0,
            },
            return_bonus_percent: 48.0,
            sale_price: 20000.0,
            tax_rate_percent: 6.5,
        }
    }

    pub fn add_material(&mut self, material: SessionMaterial) {
        self.materials.push(material);
    }

    /// Removes the material at `index`. The last remaining line is kept so a
    /// recipe always has something to edit; returns `None` in that case or
    /// when `index` is out of range.
    pub fn remove_material(&mut self, index: usize) -> Option<SessionMaterial> {
        if self.materials.len() <= 1 || index >= self.materials.len() {
            return None;
        }
        Some(self.materials.remove(index))
    }

    /// Market item ids of materials that can be priced, in recipe order.
    pub fn material_item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = Vec::new();
        for id in self.materials.iter().filter_map(|m| m.item_id.as_ref()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Updates the sale price from the crafted item's sell quotes. A resolved
    /// price of 0 means no data and leaves the current price alone.
    pub fn apply_sale_quotes(&mut self, quotes: &[MarketQuote]) -> bool {
        let Some(item_id) = self.item_id.as_deref() else {
            return false;
        };

        let price = resolve_price(&quotes_for_item(quotes, item_id), PriceSide::Sell);
        if price > 0.0 {
            debug!("[session] Sale price for {item_id}: {} -> {price}", self.sale_price);
            self.sale_price = price;
            true
        } else {
            false
        }
    }

    /// Reprices every material that has an item id from its buy quotes.
    /// Manually entered prices survive when the market has no data.
    /// Returns how many materials changed.
    pub fn apply_material_quotes(&mut self, quotes: &[MarketQuote]) -> usize {
        let mut updated = 0;
        for entry in &mut self.materials {
            let Some(item_id) = entry.item_id.as_deref() else {
                continue;
            };
            let price = resolve_price(&quotes_for_item(quotes, item_id), PriceSide::Buy);
            if price > 0.0 {
                entry.material.unit_price = price;
                updated += 1;
            }
        }
        updated
    }

    pub fn request(&self) -> ProfitRequest {
        ProfitRequest {
            materials: self.materials.iter().map(|m| m.material.clone()).collect(),
            fees: self.fees,
            return_bonus_percent: self.return_bonus_percent,
            sale_price: self.sale_price,
            tax_rate_percent: self.tax_rate_percent,
        }
    }

    pub fn calculate(&self) -> ProfitResult {
        calculate(&self.request())
    }

    /// Fetches the crafted item's sell quotes and all material buy quotes for
    /// one city and applies them. Failed requests count as "no data".
    pub async fn refresh_prices(
        &mut self,
        client: &AlbionDataClient,
        server: Server,
        city: City,
        qualities: &[u8],
    ) -> PriceRefresh {
        let cities = [city];

        let sale_price_updated = match self.item_id.clone() {
            Some(item_id) => {
                let quotes = client
                    .fetch_market_data_or_empty(&[item_id], server, &cities, qualities)
                    .await;
                self.apply_sale_quotes(&quotes)
            }
            None => false,
        };

        let material_ids = self.material_item_ids();
        let materials_updated = if material_ids.is_empty() {
            0
        } else {
            let quotes = client
                .fetch_market_data_or_empty(&material_ids, server, &cities, qualities)
                .await;
            self.apply_material_quotes(&quotes)
        };

        let refresh = PriceRefresh {
            sale_price_updated,
            materials_updated,
        };
        info!(
            "[session] Refreshed prices in {city} ({server}): sale price updated: {}, {} material(s) repriced",
            refresh.sale_price_updated, refresh.materials_updated
        );
        refresh
    }
}

/// Outcome of [`CraftingSession::refresh_prices`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceRefresh {
    pub sale_price_updated: bool,
    pub materials_updated: usize,
}
