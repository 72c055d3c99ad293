//! Thin asynchronous client for the Albion Online Data project.
//!
//! - Market price rows per item, city and quality from the regional stats API.
//! - The community item dump, kept in a caller-owned [`ItemCatalogCache`].
//!
//! There is no retry policy. Callers that only need best-effort data use the
//! `*_or_empty` variants, which log the failure and hand back nothing.

use std::time::{Duration, SystemTime};

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use tracing::{debug, info, warn};

use super::cache::ItemCatalogCache;
use crate::domain::{
    entities::{default_quality, price_or_zero, quality_or_default, string_or_empty},
    AlbionItem, City, ItemId, MarketQuote, Server,
};

pub const ITEMS_DUMP_URL: &str =
    "https://raw.githubusercontent.com/broderickhyman/ao-bin-dumps/master/formatted/items.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("albion-craft-calculator/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum AlbionClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

#[derive(Clone)]
pub struct AlbionDataClient {
    http: Client,
    /// Replaces every server's base URL when set (mirrors, tests).
    base_override: Option<Url>,
    items_url: Url,
}

impl AlbionDataClient {
    pub fn new() -> Result<Self, AlbionClientError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AlbionClientError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_override: None,
            items_url: Url::parse(ITEMS_DUMP_URL)?,
        })
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self, AlbionClientError> {
        self.base_override = Some(Url::parse(&with_trailing_slash(base))?);
        Ok(self)
    }

    pub fn with_items_url(mut self, url: &str) -> Result<Self, AlbionClientError> {
        self.items_url = Url::parse(url)?;
        Ok(self)
    }

    fn base_url(&self, server: Server) -> Result<Url, url::ParseError> {
        match &self.base_override {
            Some(url) => Ok(url.clone()),
            None => Url::parse(server.base_url()),
        }
    }

    /// Price rows for `item_ids` restricted to `cities` and `qualities`.
    /// An empty id list yields an empty result without a request.
    pub async fn fetch_market_data(
        &self,
        item_ids: &[ItemId],
        server: Server,
        cities: &[City],
        qualities: &[u8],
    ) -> Result<Vec<MarketQuote>, AlbionClientError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = prices_url(&self.base_url(server)?, item_ids, cities, qualities)?;
        debug!("[market] Requesting prices from {url}");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AlbionClientError::Api(format!(
                "API request failed: {}",
                status.as_u16()
            )));
        }

        let rows: Vec<MarketPriceDto> = response.json().await?;
        let quotes: Vec<MarketQuote> = rows.into_iter().map(MarketQuote::from).collect();
        info!(
            "[market] {} rows for {} item(s) on {server}",
            quotes.len(),
            item_ids.len()
        );
        Ok(quotes)
    }

    /// Same as [`Self::fetch_market_data`] but any failure becomes an empty list.
    pub async fn fetch_market_data_or_empty(
        &self,
        item_ids: &[ItemId],
        server: Server,
        cities: &[City],
        qualities: &[u8],
    ) -> Vec<MarketQuote> {
        match self
            .fetch_market_data(item_ids, server, cities, qualities)
            .await
        {
            Ok(quotes) => quotes,
            Err(error) => {
                warn!("[market] Price request for {item_ids:?} failed: {error}");
                Vec::new()
            }
        }
    }

    /// Item dump entries that carry an English name. Served from `cache` when
    /// present; a failed download returns an empty list and is not cached.
    pub async fn fetch_item_catalog(&self, cache: &ItemCatalogCache) -> Vec<AlbionItem> {
        if let Some(items) = cache.get().await {
            debug!("[items] Serving {} cached items", items.len());
            return items;
        }

        match self.download_items().await {
            Ok(items) => {
                info!("[items] Loaded {} named items", items.len());
                cache.store(items.clone()).await;
                items
            }
            Err(error) => {
                warn!("[items] Failed to fetch item catalog: {error}");
                Vec::new()
            }
        }
    }

    async fn download_items(&self) -> Result<Vec<AlbionItem>, AlbionClientError> {
        let response = self
            .http
            .get(self.items_url.clone())
            .send()
            .await?
            .error_for_status()?;
        let items: Vec<AlbionItem> = response.json().await?;
        Ok(items
            .into_iter()
            .filter(|item| item.english_name().is_some())
            .collect())
    }
}

/// `{base}prices/{ids}?locations={cities}&qualities={qualities}`
pub fn prices_url(
    base: &Url,
    item_ids: &[ItemId],
    cities: &[City],
    qualities: &[u8],
) -> Result<Url, url::ParseError> {
    let mut url = base.join(&format!("prices/{}", item_ids.join(",")))?;

    let locations = cities
        .iter()
        .map(City::name)
        .collect::<Vec<_>>()
        .join(",");
    let qualities = qualities
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",");

    url.query_pairs_mut()
        .append_pair("locations", &locations)
        .append_pair("qualities", &qualities);
    Ok(url)
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

/// Upstream row. Each field tolerates `null` and odd types on its own so a
/// single bad value never rejects the whole response.
#[derive(Debug, Deserialize)]
struct MarketPriceDto {
    #[serde(default, deserialize_with = "string_or_empty")]
    item_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    city: String,
    #[serde(default = "default_quality", deserialize_with = "quality_or_default")]
    quality: u8,
    #[serde(default, deserialize_with = "price_or_zero")]
    sell_price_min: f64,
    #[serde(default)]
    sell_price_min_date: Option<Value>,
    #[serde(default, deserialize_with = "price_or_zero")]
    sell_price_max: f64,
    #[serde(default)]
    sell_price_max_date: Option<Value>,
    #[serde(default, deserialize_with = "price_or_zero")]
    buy_price_min: f64,
    #[serde(default)]
    buy_price_min_date: Option<Value>,
    #[serde(default, deserialize_with = "price_or_zero")]
    buy_price_max: f64,
    #[serde(default)]
    buy_price_max_date: Option<Value>,
}

impl From<MarketPriceDto> for MarketQuote {
    fn from(dto: MarketPriceDto) -> Self {
        let updated_at = [
            &dto.sell_price_min_date,
            &dto.sell_price_max_date,
            &dto.buy_price_min_date,
            &dto.buy_price_max_date,
        ]
        .into_iter()
        .filter_map(|raw| parse_timestamp(raw.as_ref().and_then(Value::as_str)))
        .max();

        Self {
            item_id: dto.item_id,
            city: dto.city,
            quality: dto.quality,
            sell_price_min: dto.sell_price_min,
            sell_price_max: dto.sell_price_max,
            buy_price_min: dto.buy_price_min,
            buy_price_max: dto.buy_price_max,
            updated_at,
        }
    }
}

/// The API reports naive UTC timestamps and uses `0001-01-01T00:00:00` for
/// "never observed"; anything at or before the epoch is treated as absent.
fn parse_timestamp(raw: Option<&str>) -> Option<SystemTime> {
    let value = raw?.trim();
    let parsed = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .or_else(|_| OffsetDateTime::parse(value, &Rfc3339))
    .ok()?;

    if parsed.unix_timestamp() <= 0 {
        return None;
    }
    Some(SystemTime::from(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_prices_url_with_encoded_locations() {
        let base = Url::parse(Server::West.base_url()).unwrap();
        let url = prices_url(
            &base,
            &["T4_LEATHER".to_string(), "T4_CLOTH".to_string()],
            &[City::Caerleon, City::FortSterling],
            &[1, 2],
        )
        .unwrap();

        assert_eq!(url.path(), "/api/v2/stats/prices/T4_LEATHER,T4_CLOTH");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("locations".to_string(), "Caerleon,Fort Sterling".to_string()),
                ("qualities".to_string(), "1,2".to_string()),
            ]
        );
    }

    #[test]
    fn converts_upstream_row_and_keeps_latest_date() {
        let rows: Vec<MarketPriceDto> = serde_json::from_str(
            r#"[{
                "item_id": "T4_BAG",
                "city": "Martlock",
                "quality": 2,
                "sell_price_min": 4100,
                "sell_price_min_date": "2024-05-01T10:00:00",
                "sell_price_max": 5000,
                "sell_price_max_date": "2024-05-01T12:30:00",
                "buy_price_min": 0,
                "buy_price_min_date": "0001-01-01T00:00:00",
                "buy_price_max": null,
                "buy_price_max_date": null
            }]"#,
        )
        .unwrap();

        let quote = MarketQuote::from(rows.into_iter().next().unwrap());
        assert_eq!(quote.item_id, "T4_BAG");
        assert_eq!(quote.quality, 2);
        assert_eq!(quote.sell_price_min, 4100.0);
        assert_eq!(quote.buy_price_max, 0.0);

        let expected = SystemTime::UNIX_EPOCH + Duration::from_secs(1_714_566_600);
        assert_eq!(quote.updated_at, Some(expected));
    }

    #[test]
    fn mixed_batch_with_null_fields_still_converts() {
        let rows: Vec<MarketPriceDto> = serde_json::from_str(
            r#"[
                {"item_id":"T4_BAG","city":"Caerleon","quality":null,"sell_price_min":4100,"sell_price_min_date":7},
                {"item_id":"T4_BAG","city":null,"quality":2,"sell_price_min":3900,"sell_price_min_date":null},
                {"item_id":"T4_BAG","city":"Martlock","sell_price_min":0}
            ]"#,
        )
        .unwrap();

        let quotes: Vec<MarketQuote> = rows.into_iter().map(MarketQuote::from).collect();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].quality, 1);
        assert_eq!(quotes[0].updated_at, None);
        assert_eq!(quotes[1].city, "");
        assert_eq!(quotes[2].quality, 1);
        assert_eq!(
            crate::domain::resolve_price(&quotes, crate::domain::PriceSide::Sell),
            3900.0
        );
    }

    #[test]
    fn placeholder_dates_are_absent() {
        assert_eq!(parse_timestamp(Some("0001-01-01T00:00:00")), None);
        assert_eq!(parse_timestamp(Some("yesterday")), None);
        assert_eq!(parse_timestamp(None), None);
        assert!(parse_timestamp(Some("2024-05-01T10:00:00Z")).is_some());
    }

    #[tokio::test]
    async fn empty_item_list_skips_the_request() {
        let client = AlbionDataClient::new()
            .unwrap()
            .with_base_url("http://127.0.0.1:9/api")
            .unwrap();
        let quotes = client
            .fetch_market_data(&[], Server::West, &[City::Caerleon], &[1])
            .await
            .unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn unreachable_market_yields_empty_quotes() {
        let client = AlbionDataClient::with_timeout(Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9/api")
            .unwrap();
        let quotes = client
            .fetch_market_data_or_empty(
                &["T4_BAG".to_string()],
                Server::West,
                &[City::Caerleon],
                &[1],
            )
            .await;
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn catalog_is_served_from_cache_and_failures_are_not_cached() {
        let client = AlbionDataClient::with_timeout(Duration::from_secs(2))
            .unwrap()
            .with_items_url("http://127.0.0.1:9/items.json")
            .unwrap();

        let cache = ItemCatalogCache::new();
        assert!(client.fetch_item_catalog(&cache).await.is_empty());
        assert!(!cache.is_populated().await);

        let seeded: Vec<AlbionItem> =
            serde_json::from_str(r#"[{"UniqueName":"T4_BAG","LocalizedNames":{"EN-US":"Adept's Bag"},"Index":"1"}]"#)
                .unwrap();
        cache.store(seeded.clone()).await;
        assert_eq!(client.fetch_item_catalog(&cache).await, seeded);
    }
}
