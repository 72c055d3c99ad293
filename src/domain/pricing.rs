//! Reduction of noisy multi-city market rows to one usable price.

use std::collections::BTreeMap;

use super::entities::{ItemId, MarketQuote, PriceSide};

/// Picks one representative price for `side` from quotes that the caller has
/// already narrowed to one item and the cities of interest.
///
/// - `Sell`: cheapest `sell_price_min` among quotes that report one.
/// - `Buy`: cheapest `buy_price_max` among quotes that report one. The lowest
///   standing buy order is used so material costs are not over-estimated.
///
/// Zero, negative and non-finite prices count as missing. Returns 0 when no
/// quote carries usable data, including for an empty slice.
pub fn resolve_price(quotes: &[MarketQuote], side: PriceSide) -> f64 {
    quotes
        .iter()
        .map(|quote| match side {
            PriceSide::Sell => quote.sell_price_min,
            PriceSide::Buy => quote.buy_price_max,
        })
        .filter(|price| price.is_finite() && *price > 0.0)
        .fold(None, |best: Option<f64>, price| {
            Some(best.map_or(price, |current| current.min(price)))
        })
        .unwrap_or(0.0)
}

/// Groups a multi-item response by `item_id` and resolves each group.
/// Items without usable data are kept with a price of 0.
pub fn resolve_prices_by_item(quotes: &[MarketQuote], side: PriceSide) -> BTreeMap<ItemId, f64> {
    let mut grouped: BTreeMap<ItemId, Vec<MarketQuote>> = BTreeMap::new();
    for quote in quotes {
        grouped
            .entry(quote.item_id.clone())
            .or_default()
            .push(quote.clone());
    }

    grouped
        .into_iter()
        .map(|(item_id, rows)| {
            let price = resolve_price(&rows, side);
            (item_id, price)
        })
        .collect()
}

/// Pairs each id with its resolved price, keeping the caller's order.
/// Ids without usable quotes get 0.
pub fn annotate_prices<'a, I>(
    item_ids: I,
    quotes: &[MarketQuote],
    side: PriceSide,
) -> Vec<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let resolved = resolve_prices_by_item(quotes, side);
    item_ids
        .into_iter()
        .map(|item_id| (item_id, resolved.get(item_id).copied().unwrap_or(0.0)))
        .collect()
}

/// [`format_price`] for display next to an item, `-` when there is no price.
pub fn price_label(price: f64) -> String {
    if price.is_finite() && price > 0.0 {
        format_price(price)
    } else {
        "-".to_string()
    }
}

/// Quotes belonging to `item_id`.
pub fn quotes_for_item(quotes: &[MarketQuote], item_id: &str) -> Vec<MarketQuote> {
    quotes
        .iter()
        .filter(|quote| quote.item_id == item_id)
        .cloned()
        .collect()
}

/// Compact silver notation: `1.5K`, `2.3M`, or the plain value below 1000.
///
/// One decimal, rounded half away from zero.
pub fn format_price(price: f64) -> String {
    if price >= 1_000_000.0 {
        format!("{:.1}M", round_tenths(price, 1_000_000.0))
    } else if price >= 1_000.0 {
        format!("{:.1}K", round_tenths(price, 1_000.0))
    } else {
        format!("{price}")
    }
}

fn round_tenths(value: f64, unit: f64) -> f64 {
    (value / (unit / 10.0)).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(item: &str, city: &str, sell_min: f64, buy_max: f64) -> MarketQuote {
        MarketQuote {
            item_id: item.to_string(),
            city: city.to_string(),
            quality: 1,
            sell_price_min: sell_min,
            sell_price_max: sell_min * 1.5,
            buy_price_min: buy_max * 0.5,
            buy_price_max: buy_max,
            updated_at: None,
        }
    }

    #[test]
    fn empty_quotes_resolve_to_zero() {
        assert_eq!(resolve_price(&[], PriceSide::Sell), 0.0);
        assert_eq!(resolve_price(&[], PriceSide::Buy), 0.0);
    }

    #[test]
    fn sell_side_takes_cheapest_offer_and_skips_missing() {
        let quotes = vec![
            quote("T4_BAG", "Caerleon", 0.0, 900.0),
            quote("T4_BAG", "Martlock", 5200.0, 0.0),
            quote("T4_BAG", "Lymhurst", 4800.0, 0.0),
        ];
        assert_eq!(resolve_price(&quotes, PriceSide::Sell), 4800.0);
    }

    #[test]
    fn buy_side_takes_lowest_standing_order() {
        let quotes = vec![
            quote("T4_LEATHER", "Caerleon", 0.0, 950.0),
            quote("T4_LEATHER", "Martlock", 0.0, 0.0),
            quote("T4_LEATHER", "Thetford", 0.0, 870.0),
        ];
        assert_eq!(resolve_price(&quotes, PriceSide::Buy), 870.0);
    }

    #[test]
    fn all_zero_prices_resolve_to_zero() {
        let quotes = vec![quote("T4_BAG", "Caerleon", 0.0, 0.0); 3];
        assert_eq!(resolve_price(&quotes, PriceSide::Sell), 0.0);
        assert_eq!(resolve_price(&quotes, PriceSide::Buy), 0.0);
    }

    #[test]
    fn garbage_prices_never_leak_out() {
        let quotes = vec![
            quote("T4_BAG", "Caerleon", -50.0, f64::NAN),
            quote("T4_BAG", "Martlock", f64::NAN, -10.0),
        ];
        assert_eq!(resolve_price(&quotes, PriceSide::Sell), 0.0);
        assert_eq!(resolve_price(&quotes, PriceSide::Buy), 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut quotes = vec![
            quote("T4_BAG", "A", 300.0, 10.0),
            quote("T4_BAG", "B", 100.0, 30.0),
            quote("T4_BAG", "C", 200.0, 20.0),
        ];
        let forward = resolve_price(&quotes, PriceSide::Sell);
        quotes.reverse();
        assert_eq!(resolve_price(&quotes, PriceSide::Sell), forward);
        assert_eq!(resolve_price(&quotes, PriceSide::Buy), 10.0);
    }

    #[test]
    fn resolves_per_item_and_keeps_items_without_data() {
        let quotes = vec![
            quote("T4_LEATHER", "Caerleon", 0.0, 1000.0),
            quote("T4_CLOTH", "Caerleon", 0.0, 0.0),
            quote("T4_LEATHER", "Martlock", 0.0, 980.0),
        ];
        let prices = resolve_prices_by_item(&quotes, PriceSide::Buy);
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["T4_LEATHER"], 980.0);
        assert_eq!(prices["T4_CLOTH"], 0.0);
    }

    #[test]
    fn formats_compact_prices() {
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(1000.0), "1.0K");
        assert_eq!(format_price(1500.0), "1.5K");
        assert_eq!(format_price(1250.0), "1.3K");
        assert_eq!(format_price(1150.0), "1.2K");
        assert_eq!(format_price(999_999.0), "1000.0K");
        assert_eq!(format_price(1_000_000.0), "1.0M");
        assert_eq!(format_price(2_340_000.0), "2.3M");
    }

    #[test]
    fn annotates_hits_in_order_with_missing_as_zero() {
        let quotes = vec![
            quote("T4_BAG", "Caerleon", 4800.0, 3100.0),
            quote("T4_LEATHER", "Caerleon", 0.0, 950.0),
            quote("T4_BAG", "Martlock", 4500.0, 0.0),
        ];
        let hits = ["T4_LEATHER", "T5_BAG", "T4_BAG"];

        let sell = annotate_prices(hits, &quotes, PriceSide::Sell);
        assert_eq!(sell, vec![("T4_LEATHER", 0.0), ("T5_BAG", 0.0), ("T4_BAG", 4500.0)]);

        let buy = annotate_prices(hits, &quotes, PriceSide::Buy);
        assert_eq!(buy[0], ("T4_LEATHER", 950.0));
        assert_eq!(buy[2], ("T4_BAG", 3100.0));

        let labels: Vec<String> = sell.iter().map(|&(_, price)| price_label(price)).collect();
        assert_eq!(labels, vec!["-", "-", "4.5K"]);
        assert_eq!(price_label(f64::NAN), "-");
        assert_eq!(price_label(950.0), "950");
    }
}
