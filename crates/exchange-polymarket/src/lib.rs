//! Polymarket CLOB integration for the pair-cost hedging agent.
//!
//! This crate provides:
//! - A WebSocket client for the CLOB market channel ([`websocket`])
//! - The hedging session: ledger, decision rules, feed decoding and the
//!   trading loop ([`hedge`])
//!
//! # Example
//!
//! ```no_run
//! use algo_trade_core::HedgeConfig;
//! use algo_trade_polymarket::hedge::SessionController;
//! use algo_trade_polymarket::websocket::{PolymarketWebSocket, WebSocketConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HedgeConfig::for_tokens("yes-token-123", "no-token-456");
//!     let feed = PolymarketWebSocket::new(WebSocketConfig::from_base_url(&config.ws_url));
//!
//!     let report = SessionController::new(config, Arc::new(feed)).run().await?;
//!     println!("Session ended: {}", report.reason);
//!
//!     Ok(())
//! }
//! ```

pub mod hedge;
pub mod websocket;

// Re-export main types
pub use hedge::{
    run_session, DecisionEngine, OrderExecutor, PositionLedger, PriceFeedAdapter,
    SessionController, SessionReport, TerminationReason,
};
pub use websocket::{FeedError, FeedSubscription, MarketFeed, PolymarketWebSocket, WebSocketConfig};
