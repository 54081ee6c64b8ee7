//! One hedging session for one market.
//!
//! The controller subscribes to both outcome tokens, turns every frame into
//! per-leg updates, applies the leg threshold rules and the
//! [`DecisionEngine`], executes approved buys and stops on the first of:
//! locked profit, window expiry, cancellation, stream end or stream error.
//! The window is checked on every frame and also while the feed is silent.
//!
//! ```text
//! frame ─► PriceFeedAdapter ─► LegUpdate ─► threshold rule ─► evaluate
//!                                                              │
//!            lock_condition ◄─ update_after_fill ◄─ execute ◄─ cooldown
//! ```
//!
//! Executors run on their own task, but the session awaits each result before
//! reading the next frame, so the ledger has a single writer.

use super::decision::{Decision, DecisionEngine};
use super::execution::{ExecutionError, OrderAck, OrderExecutor, OrderRequest, PaperWallet};
use super::feed_adapter::PriceFeedAdapter;
use super::ledger::PositionLedger;
use super::types::{Leg, LegUpdate, PriceSnapshot};
use crate::websocket::{FeedSubscription, MarketFeed};
use algo_trade_core::{ConfigError, HedgeConfig};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Errors that prevent a session from starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Live trading was requested without an order executor.
    #[error("Live trading requires an order executor")]
    MissingExecutor,
}

/// Lifecycle of a session. Every state after `Streaming` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Connecting,
    Streaming,
    Locked,
    WindowExpired,
    Cancelled,
    StreamError,
    StreamEnded,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Connecting | Self::Streaming)
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    LockedProfit,
    WindowExpired,
    Cancelled,
    StreamEnded,
    StreamError(String),
}

impl TerminationReason {
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self {
            Self::LockedProfit => SessionState::Locked,
            Self::WindowExpired => SessionState::WindowExpired,
            Self::Cancelled => SessionState::Cancelled,
            Self::StreamEnded => SessionState::StreamEnded,
            Self::StreamError(_) => SessionState::StreamError,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockedProfit => write!(f, "locked profit"),
            Self::WindowExpired => write!(f, "window expired"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::StreamError(reason) => write!(f, "stream error: {reason}"),
        }
    }
}

/// Session counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Decoded feed messages, including unsupported types.
    pub events_processed: u64,
    /// Per-leg updates after normalization.
    pub updates_processed: u64,
    pub trades_executed: u64,
    pub failed_executions: u64,
    pub rejected_pair_cost: u64,
    pub rejected_imbalance: u64,
    pub cooldown_skips: u64,
    pub balance_skips: u64,
    pub malformed_frames: u64,
}

/// Final state of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub market_id: String,
    pub reason: TerminationReason,
    pub final_state: SessionState,
    pub ledger: PositionLedger,
    pub snapshot: PriceSnapshot,
    pub stats: SessionStats,
    /// Remaining virtual balance, dry-run only.
    pub sim_balance: Option<Decimal>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl SessionReport {
    #[must_use]
    pub fn invested(&self) -> Decimal {
        self.ledger.total_cost()
    }

    #[must_use]
    pub fn expected_payout(&self) -> Decimal {
        self.ledger.guaranteed_payout()
    }

    #[must_use]
    pub fn locked_profit(&self) -> Decimal {
        self.ledger.locked_profit()
    }
}

/// Requests cancellation of a running session.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Stops the session before it reads the next frame.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

pub struct SessionController {
    config: HedgeConfig,
    feed: Arc<dyn MarketFeed>,
    executor: Option<Arc<dyn OrderExecutor>>,
    end_time: Option<DateTime<Utc>>,
    engine: DecisionEngine,
    adapter: PriceFeedAdapter,
    ledger: PositionLedger,
    snapshot: PriceSnapshot,
    wallet: Option<PaperWallet>,
    last_trade_at: Option<Instant>,
    stats: SessionStats,
    state: SessionState,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl SessionController {
    /// Creates a session reading from `feed`. The window end defaults to `config.end_time`.
    #[must_use]
    pub fn new(config: HedgeConfig, feed: Arc<dyn MarketFeed>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            engine: DecisionEngine::from_config(&config),
            adapter: PriceFeedAdapter::from_config(&config),
            wallet: config.dry_run.then(|| PaperWallet::new(config.sim_balance)),
            end_time: config.end_time,
            config,
            feed,
            executor: None,
            ledger: PositionLedger::new(),
            snapshot: PriceSnapshot::new(),
            last_trade_at: None,
            stats: SessionStats::default(),
            state: SessionState::Connecting,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Sets the executor used when `dry_run` is off.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn OrderExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Overrides the window end; `None` keeps the configured one.
    #[must_use]
    pub fn with_end_time(mut self, end_time: Option<DateTime<Utc>>) -> Self {
        if end_time.is_some() {
            self.end_time = end_time;
        }
        self
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns an error, without connecting, when the configuration is invalid
    /// or live trading has no executor. Feed failures are not errors; they end
    /// the session with [`TerminationReason::StreamError`].
    pub async fn run(mut self) -> Result<SessionReport, SessionError> {
        self.config.validate()?;
        if !self.config.dry_run && self.executor.is_none() {
            return Err(SessionError::MissingExecutor);
        }

        let started_at = Utc::now();
        info!(
            market_id = %self.config.market_id,
            yes_token = %self.config.yes_token_id,
            no_token = %self.config.no_token_id,
            dry_run = self.config.dry_run,
            end_time = ?self.end_time,
            "Starting hedge session"
        );

        self.state = SessionState::Connecting;
        let subscribed = self.feed.subscribe(self.config.token_ids()).await;
        let reason = match subscribed {
            Ok(mut subscription) => {
                self.state = SessionState::Streaming;
                let reason = self.stream(&mut subscription).await;
                subscription.close();
                reason
            }
            Err(e) => {
                warn!(error = %e, "Feed subscription failed");
                TerminationReason::StreamError(e.to_string())
            }
        };
        self.state = reason.state();

        info!(
            reason = %reason,
            trades = self.stats.trades_executed,
            pair_cost = ?self.ledger.pair_cost().total,
            locked_profit = %self.ledger.locked_profit(),
            "Hedge session finished"
        );

        Ok(SessionReport {
            market_id: self.config.market_id.clone(),
            reason,
            final_state: self.state,
            ledger: self.ledger,
            snapshot: self.snapshot,
            stats: self.stats.clone(),
            sim_balance: self.wallet.map(|wallet| wallet.balance()),
            started_at,
            ended_at: Utc::now(),
        })
    }

    async fn stream(&mut self, subscription: &mut FeedSubscription) -> TerminationReason {
        let mut stop_rx = self.stop_rx.clone();
        let deadline = self.window_deadline();

        loop {
            if *stop_rx.borrow() {
                info!("Session cancelled");
                return TerminationReason::Cancelled;
            }

            let frame = tokio::select! {
                biased;

                Ok(_) = stop_rx.wait_for(|stopped| *stopped) => {
                    info!("Session cancelled");
                    return TerminationReason::Cancelled;
                }

                () = sleep_until_deadline(deadline) => {
                    info!(end_time = ?self.end_time, "Market window ended while waiting for frames");
                    return TerminationReason::WindowExpired;
                }

                frame = subscription.next_frame() => frame,
            };

            if self.window_expired() {
                info!(end_time = ?self.end_time, "Market window ended");
                return TerminationReason::WindowExpired;
            }

            let text = match frame {
                Some(Ok(text)) => text,
                Some(Err(e)) => {
                    warn!(error = %e, "Feed stream failed");
                    return TerminationReason::StreamError(e.to_string());
                }
                None => {
                    info!("Feed stream ended");
                    return TerminationReason::StreamEnded;
                }
            };

            let events = match PriceFeedAdapter::decode_frame(&text) {
                Ok(events) => events,
                Err(e) => {
                    self.stats.malformed_frames += 1;
                    warn!(error = %e, "Skipping malformed frame");
                    continue;
                }
            };

            for event in &events {
                self.stats.events_processed += 1;
                for update in self.adapter.normalize(event) {
                    if let Some(reason) = self.process_update(update).await {
                        return reason;
                    }
                }
            }
        }
    }

    fn window_expired(&self) -> bool {
        self.end_time.is_some_and(|end| Utc::now() >= end)
    }

    /// Monotonic instant matching `end_time`; already elapsed when the window is over.
    fn window_deadline(&self) -> Option<Instant> {
        self.end_time.map(|end| {
            let remaining = (end - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            Instant::now() + remaining
        })
    }

    async fn process_update(&mut self, update: LegUpdate) -> Option<TerminationReason> {
        if self.window_expired() {
            info!(end_time = ?self.end_time, "Market window ended");
            return Some(TerminationReason::WindowExpired);
        }

        self.stats.updates_processed += 1;
        self.snapshot.apply(&update);
        debug!(
            leg = %update.leg,
            best_bid = ?update.quote.best_bid,
            best_ask = ?update.quote.best_ask,
            up_bid = ?self.snapshot.up.best_bid,
            down_ask = ?self.snapshot.down.best_ask,
            "Price update"
        );

        if let Some(price) = self.trigger_price(&update) {
            self.try_buy(update.leg, price).await;
        }

        if DecisionEngine::lock_condition(&self.ledger) {
            info!(
                pair_cost = ?self.ledger.pair_cost().total,
                locked_profit = %self.ledger.locked_profit(),
                "Locked profit, exiting window"
            );
            return Some(TerminationReason::LockedProfit);
        }

        None
    }

    /// UP buys at its bid below `no_buy_threshold`; DOWN buys at its ask below `yes_buy_threshold`.
    fn trigger_price(&self, update: &LegUpdate) -> Option<Decimal> {
        match update.leg {
            Leg::Up => update
                .quote
                .best_bid
                .filter(|bid| *bid < self.config.no_buy_threshold),
            Leg::Down => update
                .quote
                .best_ask
                .filter(|ask| *ask < self.config.yes_buy_threshold),
        }
    }

    async fn try_buy(&mut self, leg: Leg, price: Decimal) {
        let outcome = leg.outcome();
        let size = self.config.order_size;

        let decision = self.engine.evaluate(outcome, price, size, &self.ledger);
        match decision {
            Decision::PairCostTooHigh { .. } => self.stats.rejected_pair_cost += 1,
            Decision::Imbalanced { .. } => self.stats.rejected_imbalance += 1,
            Decision::Approved | Decision::SeedFirstLeg => {}
        }
        if !decision.is_approved() {
            debug!(leg = %leg, price = %price, decision = ?decision, "Signal rejected");
            return;
        }

        let now = Instant::now();
        let cooldown = Duration::from_secs(self.config.cooldown_seconds);
        if self
            .last_trade_at
            .is_some_and(|last| now.duration_since(last) < cooldown)
        {
            self.stats.cooldown_skips += 1;
            return;
        }

        let cost = price * size;
        if let Some(wallet) = &self.wallet {
            if !wallet.can_afford(cost) {
                self.stats.balance_skips += 1;
                debug!(cost = %cost, balance = %wallet.balance(), "Insufficient simulated balance");
                return;
            }
        }

        let order = OrderRequest::buy(leg.token_id(&self.config), price, size);
        match self.execute(order).await {
            Ok(ack) => {
                self.ledger.update_after_fill(outcome, price, size);
                if let Some(wallet) = self.wallet.as_mut() {
                    if !wallet.debit(cost) {
                        warn!(cost = %cost, balance = %wallet.balance(), "Simulated fill exceeds balance");
                    }
                }
                self.last_trade_at = Some(now);
                self.stats.trades_executed += 1;
                info!(
                    leg = %leg,
                    outcome = %outcome,
                    price = %price,
                    size = %size,
                    order_id = %ack.order_id,
                    dry_run = self.config.dry_run,
                    up_qty = %self.ledger.qty_no(),
                    up_cost = %self.ledger.cost_no(),
                    down_qty = %self.ledger.qty_yes(),
                    down_cost = %self.ledger.cost_yes(),
                    balance = ?self.wallet.map(|wallet| wallet.balance()),
                    "BUY filled"
                );
            }
            Err(e) => {
                self.stats.failed_executions += 1;
                debug!(leg = %leg, price = %price, error = %e, "BUY failed");
            }
        }
    }

    async fn execute(&self, order: OrderRequest) -> Result<OrderAck, ExecutionError> {
        order.validate()?;
        if self.config.dry_run {
            return Ok(OrderAck::simulated());
        }

        let Some(executor) = self.executor.clone() else {
            return Err(ExecutionError::Aborted("no order executor".to_string()));
        };

        tokio::spawn(async move { executor.place(order).await })
            .await
            .map_err(|e| ExecutionError::Aborted(e.to_string()))?
    }
}

/// Resolves at `deadline`, or never without one.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs one session and returns why it stopped.
///
/// # Errors
///
/// See [`SessionController::run`].
pub async fn run_session(
    config: HedgeConfig,
    feed: Arc<dyn MarketFeed>,
    executor: Option<Arc<dyn OrderExecutor>>,
    end_time: Option<DateTime<Utc>>,
) -> Result<TerminationReason, SessionError> {
    let mut controller = SessionController::new(config, feed).with_end_time(end_time);
    if let Some(executor) = executor {
        controller = controller.with_executor(executor);
    }
    Ok(controller.run().await?.reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::FeedError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Feed whose subscriptions always fail.
    #[derive(Default)]
    struct UnreachableFeed {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl MarketFeed for UnreachableFeed {
        async fn subscribe(&self, _asset_ids: Vec<String>) -> Result<FeedSubscription, FeedError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(FeedError::ConnectionFailed("host unreachable".to_string()))
        }
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(TerminationReason::LockedProfit.to_string(), "locked profit");
        assert_eq!(TerminationReason::WindowExpired.to_string(), "window expired");
        assert_eq!(TerminationReason::Cancelled.to_string(), "cancelled");
        assert_eq!(TerminationReason::StreamEnded.to_string(), "stream ended");
        assert_eq!(
            TerminationReason::StreamError("boom".to_string()).to_string(),
            "stream error: boom"
        );
    }

    #[test]
    fn test_reason_states_are_terminal() {
        for reason in [
            TerminationReason::LockedProfit,
            TerminationReason::WindowExpired,
            TerminationReason::Cancelled,
            TerminationReason::StreamEnded,
            TerminationReason::StreamError(String::new()),
        ] {
            assert!(reason.state().is_terminal());
        }
        assert!(!SessionState::Streaming.is_terminal());
    }

    #[test]
    fn test_stop_handle() {
        let feed = Arc::new(UnreachableFeed::default());
        let controller = SessionController::new(HedgeConfig::for_tokens("y", "n"), feed);
        let handle = controller.stop_handle();
        assert!(!handle.is_stopped());
        handle.clone().stop();
        assert!(handle.is_stopped());
        assert_eq!(controller.state(), SessionState::Connecting);
    }

    #[test]
    fn test_window_deadline() {
        let feed = Arc::new(UnreachableFeed::default());
        let controller = SessionController::new(HedgeConfig::for_tokens("y", "n"), feed);
        assert!(controller.window_deadline().is_none());
        assert!(!controller.window_expired());

        let past = controller.with_end_time(Some(Utc::now() - chrono::Duration::minutes(5)));
        assert!(past.window_expired());
        assert!(past.window_deadline().is_some_and(|deadline| deadline <= Instant::now()));

        let future = past.with_end_time(Some(Utc::now() + chrono::Duration::minutes(5)));
        assert!(!future.window_expired());
        assert!(future
            .window_deadline()
            .is_some_and(|deadline| deadline > Instant::now() + Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_invalid_config_never_connects() {
        let feed = Arc::new(UnreachableFeed::default());
        let result = run_session(HedgeConfig::default(), feed.clone(), None, None).await;

        assert_eq!(
            result,
            Err(SessionError::Config(ConfigError::Missing("yes_token_id")))
        );
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_live_mode_requires_executor() {
        let feed = Arc::new(UnreachableFeed::default());
        let config = HedgeConfig {
            dry_run: false,
            ..HedgeConfig::for_tokens("y", "n")
        };
        let result = run_session(config, feed.clone(), None, None).await;

        assert_eq!(result, Err(SessionError::MissingExecutor));
        assert_eq!(feed.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscription_failure_is_stream_error() {
        let feed = Arc::new(UnreachableFeed::default());
        let report = SessionController::new(HedgeConfig::for_tokens("y", "n"), feed)
            .run()
            .await
            .unwrap();

        assert_eq!(
            report.reason,
            TerminationReason::StreamError("Connection failed: host unreachable".to_string())
        );
        assert_eq!(report.final_state, SessionState::StreamError);
        assert!(report.ledger.is_empty());
        assert_eq!(report.sim_balance, Some(rust_decimal_macros::dec!(1000)));
    }
}
