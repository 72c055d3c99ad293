use std::{fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};

/// Identifier for items as used by the Albion Online Data API (e.g. `T4_LEATHER`).
pub type ItemId = String;

/// Quality tier assumed when a quote does not report a usable one ("Normal").
pub const DEFAULT_QUALITY: u8 = 1;

/// One material line of a crafting recipe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
}

impl Material {
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// Quantity times unit price.
    pub fn cost(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// One observed market row for an item at a city and quality tier.
///
/// Field names match the upstream API so a raw response row deserializes
/// directly. A price of 0 means "no data", never "free".
///
/// Every field is lenient: a `null` or malformed value only blanks that
/// field, so one bad row never fails a whole response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub item_id: ItemId,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub city: String,
    #[serde(default = "default_quality", deserialize_with = "quality_or_default")]
    pub quality: u8,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub sell_price_min: f64,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub sell_price_max: f64,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub buy_price_min: f64,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub buy_price_max: f64,
    /// Most recent of the per-price observation dates, when any was reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<SystemTime>,
}

impl Default for MarketQuote {
    fn default() -> Self {
        Self {
            item_id: ItemId::new(),
            city: String::new(),
            quality: DEFAULT_QUALITY,
            sell_price_min: 0.0,
            sell_price_max: 0.0,
            buy_price_min: 0.0,
            buy_price_max: 0.0,
            updated_at: None,
        }
    }
}

/// Which side of the order book a price is resolved for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSide {
    Buy,
    Sell,
}

impl fmt::Display for PriceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSide::Buy => f.write_str("buy"),
            PriceSide::Sell => f.write_str("sell"),
        }
    }
}

impl FromStr for PriceSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(PriceSide::Buy),
            "sell" => Ok(PriceSide::Sell),
            other => Err(format!("unknown price side '{other}' (expected buy or sell)")),
        }
    }
}

/// Flat surcharges for using a crafting station.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSet {
    #[serde(default)]
    pub crafting_fee: f64,
    #[serde(default)]
    pub setup_fee: f64,
}

impl FeeSet {
    pub fn total(&self) -> f64 {
        self.crafting_fee + self.setup_fee
    }
}

/// Everything needed to evaluate one crafting attempt.
///
/// Percentages are expected in `[0, 100]` but are not clamped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitRequest {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub fees: FeeSet,
    #[serde(default)]
    pub return_bonus_percent: f64,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub tax_rate_percent: f64,
}

/// Sign of the net profit. Break-even is kept apart from a genuine loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitSign {
    Profit,
    BreakEven,
    Loss,
}

impl ProfitSign {
    pub fn label(&self) -> &'static str {
        match self {
            ProfitSign::Profit => "PROFIT",
            ProfitSign::BreakEven => "BREAK-EVEN",
            ProfitSign::Loss => "LOSS",
        }
    }
}

/// Derived cost/revenue breakdown. Only produced by [`crate::domain::calculate`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ProfitResult {
    pub materials: Vec<Material>,
    pub fees: FeeSet,
    pub return_bonus_percent: f64,
    pub sale_price: f64,
    pub tax_rate_percent: f64,
    pub total_material_cost: f64,
    pub net_material_cost: f64,
    pub total_cost: f64,
    pub tax_amount: f64,
    pub net_sale_price: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
    pub sign: ProfitSign,
}

impl ProfitResult {
    /// Strictly positive net profit.
    pub fn is_profitable(&self) -> bool {
        self.net_profit > 0.0
    }
}

/// Regional game servers, each with its own market-data endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Server {
    #[default]
    West,
    East,
    Europe,
}

impl Server {
    pub const ALL: [Server; 3] = [Server::West, Server::East, Server::Europe];

    pub fn name(&self) -> &'static str {
        match self {
            Server::West => "West",
            Server::East => "East",
            Server::Europe => "Europe",
        }
    }

    /// Base URL of the stats API, with trailing slash so relative joins work.
    pub fn base_url(&self) -> &'static str {
        match self {
            Server::West => "https://west.albion-online-data.com/api/v2/stats/",
            Server::East => "https://east.albion-online-data.com/api/v2/stats/",
            Server::Europe => "https://europe.albion-online-data.com/api/v2/stats/",
        }
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Server {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Server::ALL
            .into_iter()
            .find(|server| server.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown server '{s}' (expected West, East or Europe)"))
    }
}

/// Market locations that report prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[default]
    Caerleon,
    Bridgewatch,
    #[serde(rename = "Fort Sterling", alias = "FortSterling")]
    FortSterling,
    Lymhurst,
    Martlock,
    Thetford,
    Brecilien,
    #[serde(rename = "Black Market", alias = "BlackMarket")]
    BlackMarket,
}

impl City {
    pub const ALL: [City; 8] = [
        City::Caerleon,
        City::Bridgewatch,
        City::FortSterling,
        City::Lymhurst,
        City::Martlock,
        City::Thetford,
        City::Brecilien,
        City::BlackMarket,
    ];

    /// Display name, also the value the API expects in `locations`.
    pub fn name(&self) -> &'static str {
        match self {
            City::Caerleon => "Caerleon",
            City::Bridgewatch => "Bridgewatch",
            City::FortSterling => "Fort Sterling",
            City::Lymhurst => "Lymhurst",
            City::Martlock => "Martlock",
            City::Thetford => "Thetford",
            City::Brecilien => "Brecilien",
            City::BlackMarket => "Black Market",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for City {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = squash(s);
        City::ALL
            .into_iter()
            .find(|city| squash(city.name()) == wanted)
            .ok_or_else(|| format!("unknown city '{s}'"))
    }
}

/// Lenient price field: numbers pass through, numeric strings are parsed,
/// `null` and anything unparseable become 0.
pub(crate) fn price_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct PriceOrZero;

    impl<'de> serde::de::Visitor<'de> for PriceOrZero {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a price as number, string or null")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<f64>().unwrap_or(0.0))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(0.0)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(PriceOrZero)
}

pub(crate) fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

/// Lenient text field: `null` becomes the empty string.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lenient quality field: integers in `0..=255` and numeric strings pass,
/// `null` and anything else fall back to [`DEFAULT_QUALITY`].
pub(crate) fn quality_or_default<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct QualityOrDefault;

    impl<'de> serde::de::Visitor<'de> for QualityOrDefault {
        type Value = u8;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a quality tier as number, string or null")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u8::try_from(value).unwrap_or(DEFAULT_QUALITY))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u8::try_from(value).unwrap_or(DEFAULT_QUALITY))
        }

        fn visit_f64<E>(self, _value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(DEFAULT_QUALITY)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<u8>().unwrap_or(DEFAULT_QUALITY))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(DEFAULT_QUALITY)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(DEFAULT_QUALITY)
        }
    }

    deserializer.deserialize_any(QualityOrDefault)
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_parses_loosely() {
        assert_eq!("fort sterling".parse::<City>(), Ok(City::FortSterling));
        assert_eq!("FortSterling".parse::<City>(), Ok(City::FortSterling));
        assert_eq!("black-market".parse::<City>(), Ok(City::BlackMarket));
        assert!("Atlantis".parse::<City>().is_err());
    }

    #[test]
    fn server_parses_case_insensitively() {
        assert_eq!("europe".parse::<Server>(), Ok(Server::Europe));
        assert!(Server::West.base_url().ends_with('/'));
        assert!("Asia".parse::<Server>().is_err());
    }

    #[test]
    fn quote_accepts_upstream_row_with_missing_fields() {
        let quote: MarketQuote = serde_json::from_str(
            r#"{"item_id":"T4_BAG","city":"Caerleon","quality":1,"sell_price_min":4200,
                "sell_price_min_date":"2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(quote.sell_price_min, 4200.0);
        assert_eq!(quote.buy_price_max, 0.0);
        assert_eq!(quote.updated_at, None);
    }

    #[test]
    fn quote_treats_null_and_text_prices_leniently() {
        let quote: MarketQuote = serde_json::from_str(
            r#"{"item_id":"T4_BAG","sell_price_min":null,"buy_price_max":"1500","buy_price_min":"n/a"}"#,
        )
        .unwrap();
        assert_eq!(quote.sell_price_min, 0.0);
        assert_eq!(quote.buy_price_max, 1500.0);
        assert_eq!(quote.buy_price_min, 0.0);
    }

    #[test]
    fn one_null_field_does_not_sink_the_batch() {
        let quotes: Vec<MarketQuote> = serde_json::from_str(
            r#"[
                {"item_id":"T4_BAG","city":"Caerleon","quality":null,"sell_price_min":4100},
                {"item_id":"T4_BAG","city":null,"quality":2,"sell_price_min":3900},
                {"item_id":null,"city":"Martlock","quality":"3","sell_price_min":"n/a"},
                {"item_id":"T4_BAG","city":"Lymhurst","quality":700,"buy_price_max":2500}
            ]"#,
        )
        .unwrap();

        assert_eq!(quotes.len(), 4);
        assert_eq!(quotes[0].quality, DEFAULT_QUALITY);
        assert_eq!(quotes[1].city, "");
        assert_eq!(quotes[2].item_id, "");
        assert_eq!(quotes[2].quality, 3);
        assert_eq!(quotes[3].quality, DEFAULT_QUALITY);

        let bag = crate::domain::quotes_for_item(&quotes, "T4_BAG");
        assert_eq!(crate::domain::resolve_price(&bag, PriceSide::Sell), 3900.0);
    }

    #[test]
    fn missing_quality_defaults_to_normal() {
        let quote: MarketQuote = serde_json::from_str(r#"{"item_id":"T4_BAG"}"#).unwrap();
        assert_eq!(quote.quality, DEFAULT_QUALITY);
        assert_eq!(MarketQuote::default().quality, DEFAULT_QUALITY);
    }
}
