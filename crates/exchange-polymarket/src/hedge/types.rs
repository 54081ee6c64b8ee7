//! Shared vocabulary for the hedging session: ledger outcomes, feed legs and quotes.

use algo_trade_core::HedgeConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the position ledger a fill is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

/// Market leg as seen on the price feed.
///
/// The YES token trades as the DOWN leg and the NO token as the UP leg, so a
/// signal on one leg is booked against the outcome returned by [`Leg::outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Leg {
    Up,
    Down,
}

impl Leg {
    #[must_use]
    pub fn outcome(self) -> Outcome {
        match self {
            Self::Up => Outcome::No,
            Self::Down => Outcome::Yes,
        }
    }

    /// Token bought when this leg's threshold rule fires.
    #[must_use]
    pub fn token_id(self, config: &HedgeConfig) -> &str {
        match self.outcome() {
            Outcome::Yes => &config.yes_token_id,
            Outcome::No => &config.no_token_id,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Best bid / best ask pair. `None` means the field was not present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
}

impl Quote {
    #[must_use]
    pub fn new(best_bid: Option<Decimal>, best_ask: Option<Decimal>) -> Self {
        Self { best_bid, best_ask }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best_bid.is_none() && self.best_ask.is_none()
    }

    /// Overwrites the fields present in `update`, keeping the rest.
    pub fn merge(&mut self, update: &Quote) {
        if let Some(bid) = update.best_bid {
            self.best_bid = Some(bid);
        }
        if let Some(ask) = update.best_ask {
            self.best_ask = Some(ask);
        }
    }
}

/// A normalized quote change for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegUpdate {
    pub leg: Leg,
    pub quote: Quote,
}

impl LegUpdate {
    #[must_use]
    pub fn new(leg: Leg, quote: Quote) -> Self {
        Self { leg, quote }
    }
}

/// Last-known quotes for both legs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriceSnapshot {
    pub up: Quote,
    pub down: Quote,
}

impl PriceSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn quote(&self, leg: Leg) -> &Quote {
        match leg {
            Leg::Up => &self.up,
            Leg::Down => &self.down,
        }
    }

    pub fn apply(&mut self, update: &LegUpdate) {
        let quote = match update.leg {
            Leg::Up => &mut self.up,
            Leg::Down => &mut self.down,
        };
        quote.merge(&update.quote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_leg_maps_to_opposite_named_outcome() {
        assert_eq!(Leg::Up.outcome(), Outcome::No);
        assert_eq!(Leg::Down.outcome(), Outcome::Yes);
    }

    #[test]
    fn test_leg_token_id() {
        let config = HedgeConfig::for_tokens("yes-token", "no-token");
        assert_eq!(Leg::Up.token_id(&config), "no-token");
        assert_eq!(Leg::Down.token_id(&config), "yes-token");
    }

    #[test]
    fn test_display() {
        assert_eq!(Leg::Up.to_string(), "UP");
        assert_eq!(Outcome::No.to_string(), "NO");
    }

    #[test]
    fn test_snapshot_preserves_absent_fields() {
        let mut snapshot = PriceSnapshot::new();
        snapshot.apply(&LegUpdate::new(
            Leg::Up,
            Quote::new(Some(dec!(0.40)), Some(dec!(0.42))),
        ));
        snapshot.apply(&LegUpdate::new(Leg::Up, Quote::new(None, Some(dec!(0.43)))));

        assert_eq!(snapshot.up.best_bid, Some(dec!(0.40)));
        assert_eq!(snapshot.up.best_ask, Some(dec!(0.43)));
        assert!(snapshot.quote(Leg::Down).is_empty());
    }
}
