//! Decoding of raw market-channel frames into per-leg quote updates.
//!
//! A frame is either one JSON object or an array of them. Each object is
//! decoded once into a [`FeedEvent`] by its `event_type` tag, then
//! [`PriceFeedAdapter::normalize`] turns it into [`LegUpdate`]s for the two
//! configured tokens.
//!
//! # Message Format
//!
//! ## Book
//! ```json
//! {
//!   "event_type": "book",
//!   "asset_id": "...",
//!   "buys": [{"price": ".48", "size": "30"}],
//!   "sells": [{"price": ".52", "size": "25"}]
//! }
//! ```
//! `bids` / `asks` are accepted in place of `buys` / `sells`.
//!
//! ## Price Change
//! ```json
//! {
//!   "event_type": "price_change",
//!   "asset_id": "...",
//!   "price_changes": [
//!     {"asset_id": "...", "best_bid": "0.47", "best_ask": "0.49"}
//!   ]
//! }
//! ```

use super::types::{Leg, LegUpdate, Quote};
use algo_trade_core::HedgeConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use tracing::{debug, warn};

// ============================================================================
// Feed Message Types (Serde)
// ============================================================================

/// One decoded market-channel message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FeedEvent {
    Book(BookMessage),
    PriceChange(PriceChangeMessage),
    /// `last_trade_price`, `tick_size_change` and anything newer.
    #[serde(other)]
    Unsupported,
}

/// Order book snapshot; levels arrive best-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookMessage {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, alias = "bids", deserialize_with = "nullable_vec")]
    pub buys: Vec<PriceLevel>,
    #[serde(default, alias = "asks", deserialize_with = "nullable_vec")]
    pub sells: Vec<PriceLevel>,
}

impl BookMessage {
    #[must_use]
    pub fn quote(&self) -> Quote {
        Quote::new(
            self.buys.first().and_then(|level| level.price),
            self.sells.first().and_then(|level| level.price),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PriceLevel {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub size: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PriceChangeMessage {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub price_changes: Vec<PriceChangeEntry>,
}

/// Partial update; absent or null fields mean "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PriceChangeEntry {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub best_bid: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub best_ask: Option<Decimal>,
}

impl PriceChangeMessage {
    /// Merges entries per asset in first-seen order. Entries without their own
    /// `asset_id` belong to the message-level asset.
    #[must_use]
    pub fn quotes_by_asset(&self) -> Vec<(&str, Quote)> {
        let mut merged: Vec<(&str, Quote)> = Vec::new();
        for entry in &self.price_changes {
            let Some(asset_id) = entry.asset_id.as_deref().or(self.asset_id.as_deref()) else {
                continue;
            };
            let update = Quote::new(entry.best_bid, entry.best_ask);
            match merged.iter_mut().find(|(id, _)| *id == asset_id) {
                Some((_, quote)) => quote.merge(&update),
                None => merged.push((asset_id, update)),
            }
        }
        merged
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Text(String),
    Number(serde_json::Number),
}

/// Accepts `"0.48"`, `".48"`, `0.48` or `null`. Unparsable text is treated as absent.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDecimal>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawDecimal::Text(text) => parse_decimal(&text),
        RawDecimal::Number(number) => parse_decimal(&number.to_string()),
    }))
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a decimal string, handling the ".XX" format used by Polymarket.
fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let normalized = if s.starts_with('.') {
        format!("0{s}")
    } else {
        s.to_string()
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

// ============================================================================
// Adapter
// ============================================================================

/// Static asset id → leg lookup for one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegMapper {
    yes_token_id: String,
    no_token_id: String,
}

impl LegMapper {
    #[must_use]
    pub fn new(yes_token_id: impl Into<String>, no_token_id: impl Into<String>) -> Self {
        Self {
            yes_token_id: yes_token_id.into(),
            no_token_id: no_token_id.into(),
        }
    }

    /// YES token → DOWN, NO token → UP, anything else → `None`.
    #[must_use]
    pub fn leg_for(&self, asset_id: &str) -> Option<Leg> {
        if asset_id == self.yes_token_id {
            Some(Leg::Down)
        } else if asset_id == self.no_token_id {
            Some(Leg::Up)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceFeedAdapter {
    mapper: LegMapper,
}

impl PriceFeedAdapter {
    #[must_use]
    pub fn new(yes_token_id: impl Into<String>, no_token_id: impl Into<String>) -> Self {
        Self {
            mapper: LegMapper::new(yes_token_id, no_token_id),
        }
    }

    #[must_use]
    pub fn from_config(config: &HedgeConfig) -> Self {
        Self::new(config.yes_token_id.clone(), config.no_token_id.clone())
    }

    #[must_use]
    pub fn leg_for(&self, asset_id: &str) -> Option<Leg> {
        self.mapper.leg_for(asset_id)
    }

    /// Decodes a text frame into events, in frame order.
    ///
    /// Items without an `event_type` and items whose body does not match their
    /// type are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only when the frame is not valid JSON.
    pub fn decode_frame(text: &str) -> Result<Vec<FeedEvent>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let items = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        let events = items
            .into_iter()
            .filter_map(|item| {
                let tagged = item
                    .get("event_type")
                    .is_some_and(|tag| tag.as_str().is_some_and(|tag| !tag.is_empty()));
                if !tagged {
                    debug!("Skipping feed item without event_type");
                    return None;
                }
                match FeedEvent::deserialize(item) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed feed item");
                        None
                    }
                }
            })
            .collect();

        Ok(events)
    }

    /// Per-leg updates carried by one event. Unknown assets and empty quotes are dropped.
    #[must_use]
    pub fn normalize(&self, event: &FeedEvent) -> Vec<LegUpdate> {
        let quotes: Vec<(&str, Quote)> = match event {
            FeedEvent::Book(book) => book
                .asset_id
                .as_deref()
                .map(|asset_id| vec![(asset_id, book.quote())])
                .unwrap_or_default(),
            FeedEvent::PriceChange(change) => change.quotes_by_asset(),
            FeedEvent::Unsupported => Vec::new(),
        };

        quotes
            .into_iter()
            .filter(|(_, quote)| !quote.is_empty())
            .filter_map(|(asset_id, quote)| match self.leg_for(asset_id) {
                Some(leg) => Some(LegUpdate::new(leg, quote)),
                None => {
                    debug!(asset_id = %asset_id, "Ignoring update for unknown asset");
                    None
                }
            })
            .collect()
    }

    /// Decodes and normalizes a whole frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame is not valid JSON.
    pub fn process_frame(&self, text: &str) -> Result<Vec<LegUpdate>, serde_json::Error> {
        Ok(Self::decode_frame(text)?
            .iter()
            .flat_map(|event| self.normalize(event))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const YES: &str = "yes-token";
    const NO: &str = "no-token";

    fn adapter() -> PriceFeedAdapter {
        PriceFeedAdapter::new(YES, NO)
    }

    // =========================================================================
    // Decoding Tests
    // =========================================================================

    #[test]
    fn test_parse_decimal_polymarket_format() {
        assert_eq!(parse_decimal(".48"), Some(dec!(0.48)));
        assert_eq!(parse_decimal("0.52"), Some(dec!(0.52)));
        assert_eq!(parse_decimal("1e-2"), Some(dec!(0.01)));
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_decode_single_and_batch_frames() {
        let single = r#"{"event_type": "book", "asset_id": "yes-token", "buys": [], "sells": []}"#;
        assert_eq!(PriceFeedAdapter::decode_frame(single).unwrap().len(), 1);

        let batch = r#"[
            {"event_type": "book", "asset_id": "yes-token"},
            {"event_type": "price_change", "price_changes": []}
        ]"#;
        let events = PriceFeedAdapter::decode_frame(batch).unwrap();
        assert!(matches!(events[0], FeedEvent::Book(_)));
        assert!(matches!(events[1], FeedEvent::PriceChange(_)));
    }

    #[test]
    fn test_decode_skips_untagged_and_unsupported() {
        let frame = r#"[
            {"asset_id": "yes-token"},
            {"event_type": "", "asset_id": "yes-token"},
            {"event_type": "last_trade_price", "asset_id": "yes-token", "price": "0.5"},
            "pong",
            {"event_type": "book", "asset_id": "no-token"}
        ]"#;
        let events = PriceFeedAdapter::decode_frame(frame).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], FeedEvent::Unsupported);
        assert!(matches!(events[1], FeedEvent::Book(_)));
    }

    #[test]
    fn test_decode_invalid_json_is_error() {
        assert!(PriceFeedAdapter::decode_frame("not json").is_err());
    }

    #[test]
    fn test_decode_skips_malformed_item_keeps_rest() {
        let frame = r#"[
            {"event_type": "book", "asset_id": 42, "buys": "nope"},
            {"event_type": "book", "asset_id": "yes-token"}
        ]"#;
        let events = PriceFeedAdapter::decode_frame(frame).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_price_level_accepts_numbers_and_strings() {
        let frame = r#"{"event_type": "book", "asset_id": "yes-token",
            "bids": [{"price": 0.41, "size": 10}], "asks": [{"price": ".43", "size": "5"}]}"#;
        let events = PriceFeedAdapter::decode_frame(frame).unwrap();
        let FeedEvent::Book(book) = &events[0] else {
            panic!("expected book, got {:?}", events[0]);
        };
        assert_eq!(book.quote(), Quote::new(Some(dec!(0.41)), Some(dec!(0.43))));
        assert_eq!(book.sells[0].size, Some(dec!(5)));
    }

    // =========================================================================
    // Normalization Tests
    // =========================================================================

    #[test]
    fn test_book_uses_first_level_per_side() {
        let frame = r#"{"event_type": "book", "asset_id": "no-token",
            "buys": [{"price": ".48", "size": "30"}, {"price": ".47", "size": "10"}],
            "sells": [{"price": ".52", "size": "25"}]}"#;
        let updates = adapter().process_frame(frame).unwrap();
        assert_eq!(
            updates,
            vec![LegUpdate::new(
                Leg::Up,
                Quote::new(Some(dec!(0.48)), Some(dec!(0.52)))
            )]
        );
    }

    #[test]
    fn test_book_with_one_empty_side() {
        let frame = r#"{"event_type": "book", "asset_id": "yes-token",
            "buys": [], "sells": [{"price": "0.44", "size": "25"}]}"#;
        let updates = adapter().process_frame(frame).unwrap();
        assert_eq!(updates[0].leg, Leg::Down);
        assert_eq!(updates[0].quote, Quote::new(None, Some(dec!(0.44))));
    }

    #[test]
    fn test_empty_book_produces_no_update() {
        let frame = r#"{"event_type": "book", "asset_id": "yes-token", "buys": null, "sells": []}"#;
        assert!(adapter().process_frame(frame).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_asset_is_dropped() {
        let frame = r#"{"event_type": "book", "asset_id": "other-token",
            "buys": [{"price": "0.10", "size": "1"}]}"#;
        assert!(adapter().process_frame(frame).unwrap().is_empty());
    }

    #[test]
    fn test_price_change_later_entries_overwrite() {
        let frame = r#"{"event_type": "price_change", "asset_id": "no-token", "price_changes": [
            {"best_bid": "0.40", "best_ask": "0.45"},
            {"best_bid": "0.42", "best_ask": null},
            {"best_ask": 0.46}
        ]}"#;
        let updates = adapter().process_frame(frame).unwrap();
        assert_eq!(
            updates,
            vec![LegUpdate::new(
                Leg::Up,
                Quote::new(Some(dec!(0.42)), Some(dec!(0.46)))
            )]
        );
    }

    #[test]
    fn test_price_change_groups_entries_per_asset() {
        let frame = r#"{"event_type": "price_change", "price_changes": [
            {"asset_id": "yes-token", "best_bid": "0.50", "best_ask": "0.52"},
            {"asset_id": "no-token", "best_bid": "0.47", "best_ask": "0.49"},
            {"asset_id": "yes-token", "best_ask": "0.51"}
        ]}"#;
        let updates = adapter().process_frame(frame).unwrap();
        assert_eq!(
            updates,
            vec![
                LegUpdate::new(Leg::Down, Quote::new(Some(dec!(0.50)), Some(dec!(0.51)))),
                LegUpdate::new(Leg::Up, Quote::new(Some(dec!(0.47)), Some(dec!(0.49)))),
            ]
        );
    }

    #[test]
    fn test_price_change_without_any_asset_is_dropped() {
        let frame = r#"{"event_type": "price_change", "price_changes": [{"best_bid": "0.40"}]}"#;
        assert!(adapter().process_frame(frame).unwrap().is_empty());
    }

    #[test]
    fn test_leg_mapping() {
        let adapter = PriceFeedAdapter::from_config(&HedgeConfig::for_tokens(YES, NO));
        assert_eq!(adapter.leg_for(YES), Some(Leg::Down));
        assert_eq!(adapter.leg_for(NO), Some(Leg::Up));
        assert_eq!(adapter.leg_for(""), None);
    }
}
