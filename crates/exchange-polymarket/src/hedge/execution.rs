//! Order placement contract and the dry-run wallet.
//!
//! Live signing and submission live outside this crate; callers hand the
//! session an [`OrderExecutor`] implementation. Dry-run sessions never call an
//! executor and settle fills against a [`PaperWallet`] instead.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A limit order for one outcome token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub side: Side,
    pub token_id: String,
    pub price: Decimal,
    pub size: Decimal,
}

impl OrderRequest {
    #[must_use]
    pub fn buy(token_id: impl Into<String>, price: Decimal, size: Decimal) -> Self {
        Self {
            side: Side::Buy,
            token_id: token_id.into(),
            price,
            size,
        }
    }

    /// Quote currency committed by the order.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// # Errors
    ///
    /// Returns `ExecutionError::InvalidOrder` for an empty token, or a
    /// non-positive price or size.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.token_id.is_empty() {
            return Err(ExecutionError::InvalidOrder("empty token id".to_string()));
        }
        if self.price <= Decimal::ZERO {
            return Err(ExecutionError::InvalidOrder(format!(
                "price must be positive, got {}",
                self.price
            )));
        }
        if self.size <= Decimal::ZERO {
            return Err(ExecutionError::InvalidOrder(format!(
                "size must be positive, got {}",
                self.size
            )));
        }
        Ok(())
    }
}

/// Acknowledgement of a filled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
}

impl OrderAck {
    #[must_use]
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
        }
    }

    /// Acknowledgement for a fill that never left the process.
    #[must_use]
    pub fn simulated() -> Self {
        Self::new(format!("paper-{}", uuid::Uuid::new_v4()))
    }

    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.order_id.starts_with("paper-")
    }
}

/// Errors from placing an order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Order was rejected by the exchange.
    #[error("Order rejected: {reason}")]
    Rejected {
        /// Rejection reason from exchange.
        reason: String,
    },

    /// API communication error.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// The executor task ended without a result.
    #[error("Execution aborted: {0}")]
    Aborted(String),
}

/// Places orders on the exchange.
///
/// A successful return means the order filled completely at the requested
/// price; anything else is an error and books nothing.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// # Errors
    ///
    /// Any rejection, transport or signing failure.
    async fn place(&self, order: OrderRequest) -> Result<OrderAck, ExecutionError>;
}

/// Virtual quote balance for dry-run sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaperWallet {
    balance: Decimal,
}

impl PaperWallet {
    #[must_use]
    pub fn new(balance: Decimal) -> Self {
        Self { balance }
    }

    #[must_use]
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    #[must_use]
    pub fn can_afford(&self, cost: Decimal) -> bool {
        cost <= self.balance
    }

    /// Deducts `cost`; returns false and leaves the balance untouched if it is too large.
    pub fn debit(&mut self, cost: Decimal) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.balance -= cost;
        true
    }
}
