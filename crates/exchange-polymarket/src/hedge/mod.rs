//! Hedged pair-cost trading on binary UP/DOWN markets.
//!
//! Buys each outcome token while the combined average entry cost of both
//! sides stays below a target, so the position pays out more than it cost
//! whichever side resolves true.
//!
//! # Components
//!
//! - [`PositionLedger`]: filled quantity and cost per outcome
//! - [`DecisionEngine`]: pair-cost and imbalance admission rules, profit lock
//! - [`PriceFeedAdapter`]: raw frames to per-leg quote updates
//! - [`SessionController`]: the trading loop for one market window

pub mod decision;
pub mod execution;
pub mod feed_adapter;
pub mod ledger;
pub mod session;
pub mod types;

pub use decision::{Decision, DecisionEngine};
pub use execution::{ExecutionError, OrderAck, OrderExecutor, OrderRequest, PaperWallet, Side};
pub use feed_adapter::{
    BookMessage, FeedEvent, LegMapper, PriceChangeEntry, PriceChangeMessage, PriceFeedAdapter,
    PriceLevel,
};
pub use ledger::{PairCost, PositionLedger};
pub use session::{
    run_session, SessionController, SessionError, SessionReport, SessionState, SessionStats,
    StopHandle, TerminationReason,
};
pub use types::{Leg, LegUpdate, Outcome, PriceSnapshot, Quote};
