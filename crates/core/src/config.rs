use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default Polymarket CLOB websocket host (the market channel path is appended by the feed).
pub const DEFAULT_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Settings for one hedged trading session on a binary UP/DOWN market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    /// Market condition id, used for logging only.
    pub market_id: String,
    /// Outcome token booked on the YES side of the ledger (the DOWN leg of the feed).
    pub yes_token_id: String,
    /// Outcome token booked on the NO side of the ledger (the UP leg of the feed).
    pub no_token_id: String,
    pub ws_url: String,
    /// Highest candidate pair cost (avg YES + avg NO) that still approves a buy.
    pub target_pair_cost: Decimal,
    /// Highest tolerated |qty_yes - qty_no| / max(qty_yes, qty_no).
    pub balance_slack: Decimal,
    /// Shares per buy attempt.
    pub order_size: Decimal,
    /// The DOWN leg buys when its best ask is below this.
    pub yes_buy_threshold: Decimal,
    /// The UP leg buys when its best bid is below this.
    pub no_buy_threshold: Decimal,
    /// Minimum spacing between two executed trades.
    pub cooldown_seconds: u64,
    pub dry_run: bool,
    /// Virtual quote balance for dry-run fills.
    pub sim_balance: Decimal,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            market_id: String::new(),
            yes_token_id: String::new(),
            no_token_id: String::new(),
            ws_url: DEFAULT_WS_URL.to_string(),
            target_pair_cost: dec!(0.99),
            balance_slack: dec!(0.15),
            order_size: dec!(50),
            yes_buy_threshold: dec!(0.45),
            no_buy_threshold: dec!(0.45),
            cooldown_seconds: 5,
            dry_run: true,
            sim_balance: dec!(1000),
            end_time: None,
        }
    }
}

impl HedgeConfig {
    /// Creates a config for the given token pair with default risk settings.
    #[must_use]
    pub fn for_tokens(yes_token_id: impl Into<String>, no_token_id: impl Into<String>) -> Self {
        Self {
            yes_token_id: yes_token_id.into(),
            no_token_id: no_token_id.into(),
            ..Self::default()
        }
    }

    /// Checks that a session can be started with these settings.
    ///
    /// # Errors
    ///
    /// Returns the first missing or out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.yes_token_id.trim().is_empty() {
            return Err(ConfigError::Missing("yes_token_id"));
        }
        if self.no_token_id.trim().is_empty() {
            return Err(ConfigError::Missing("no_token_id"));
        }
        if self.yes_token_id == self.no_token_id {
            return Err(ConfigError::invalid(
                "no_token_id",
                "must differ from yes_token_id",
            ));
        }
        if self.order_size <= Decimal::ZERO {
            return Err(ConfigError::invalid("order_size", "must be positive"));
        }
        if self.balance_slack < Decimal::ZERO {
            return Err(ConfigError::invalid("balance_slack", "must not be negative"));
        }
        for (field, value) in [
            ("target_pair_cost", self.target_pair_cost),
            ("yes_buy_threshold", self.yes_buy_threshold),
            ("no_buy_threshold", self.no_buy_threshold),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::invalid(field, format!("{value} is outside (0, 1]")));
            }
        }
        if self.dry_run && self.sim_balance < Decimal::ZERO {
            return Err(ConfigError::invalid("sim_balance", "must not be negative"));
        }
        Ok(())
    }

    /// The two subscribed asset ids, YES first.
    #[must_use]
    pub fn token_ids(&self) -> Vec<String> {
        vec![self.yes_token_id.clone(), self.no_token_id.clone()]
    }
}
