//! CLI command for a hedged pair-cost trading session.
//!
//! Subscribes to both outcome tokens of one binary UP/DOWN market and buys
//! each side while the combined average entry cost stays below the target.
//! Runs until profit is locked, the window ends, the feed stops or Ctrl+C.
//!
//! Settings come from `config/Hedge.toml`, then `HEDGE_*` environment
//! variables, then the flags below.

use algo_trade_core::{ConfigLoader, HedgeConfig};
use algo_trade_polymarket::hedge::{SessionController, SessionReport};
use algo_trade_polymarket::websocket::{PolymarketWebSocket, WebSocketConfig};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments for the hedge command.
#[derive(Args, Debug, Default)]
pub struct HedgeArgs {
    /// Settings file (optional; missing files are skipped).
    #[arg(short, long, default_value = "config/Hedge.toml")]
    pub config: PathBuf,

    /// Market condition id, for logging.
    #[arg(long, env = "HEDGE_MARKET_ID")]
    pub market_id: Option<String>,

    /// Token booked as YES (trades as the DOWN leg).
    #[arg(long, env = "HEDGE_YES_TOKEN_ID")]
    pub yes_token_id: Option<String>,

    /// Token booked as NO (trades as the UP leg).
    #[arg(long, env = "HEDGE_NO_TOKEN_ID")]
    pub no_token_id: Option<String>,

    /// WebSocket host; `/ws/market` is appended.
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Maximum combined average cost of both sides (e.g., 0.99).
    #[arg(long)]
    pub target_pair_cost: Option<Decimal>,

    /// Maximum share imbalance ratio between the sides (e.g., 0.15).
    #[arg(long)]
    pub balance_slack: Option<Decimal>,

    /// Shares per order.
    #[arg(long)]
    pub order_size: Option<Decimal>,

    /// Buy YES when the DOWN ask is below this.
    #[arg(long)]
    pub yes_buy_threshold: Option<Decimal>,

    /// Buy NO when the UP bid is below this.
    #[arg(long)]
    pub no_buy_threshold: Option<Decimal>,

    /// Minimum seconds between trades.
    #[arg(long)]
    pub cooldown_seconds: Option<u64>,

    /// Starting virtual balance for simulated fills.
    #[arg(long)]
    pub sim_balance: Option<Decimal>,

    /// Window end in RFC 3339 (e.g., "2026-01-01T12:15:00Z").
    #[arg(long)]
    pub end_time: Option<DateTime<Utc>>,

    /// Request live order placement.
    #[arg(long)]
    pub live: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl HedgeArgs {
    /// Applies flag values on top of the loaded settings.
    pub fn apply_overrides(&self, config: &mut HedgeConfig) {
        if let Some(market_id) = &self.market_id {
            config.market_id = market_id.clone();
        }
        if let Some(yes_token_id) = &self.yes_token_id {
            config.yes_token_id = yes_token_id.clone();
        }
        if let Some(no_token_id) = &self.no_token_id {
            config.no_token_id = no_token_id.clone();
        }
        if let Some(ws_url) = &self.ws_url {
            config.ws_url = ws_url.clone();
        }
        if let Some(value) = self.target_pair_cost {
            config.target_pair_cost = value;
        }
        if let Some(value) = self.balance_slack {
            config.balance_slack = value;
        }
        if let Some(value) = self.order_size {
            config.order_size = value;
        }
        if let Some(value) = self.yes_buy_threshold {
            config.yes_buy_threshold = value;
        }
        if let Some(value) = self.no_buy_threshold {
            config.no_buy_threshold = value;
        }
        if let Some(value) = self.cooldown_seconds {
            config.cooldown_seconds = value;
        }
        if let Some(value) = self.sim_balance {
            config.sim_balance = value;
        }
        if self.end_time.is_some() {
            config.end_time = self.end_time;
        }
        if self.live {
            config.dry_run = false;
        }
    }
}

/// Runs one hedge session and prints its summary.
pub async fn run(args: HedgeArgs) -> Result<()> {
    let mut config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    args.apply_overrides(&mut config);

    if !config.dry_run {
        bail!("Live trading needs an order signer, which this binary does not include; run with dry_run = true");
    }
    config.validate().context("Invalid hedge configuration")?;

    info!("=== Hedged Pair-Cost Session (DRY RUN) ===");
    info!(
        "Market: {} | YES(DOWN): {} | NO(UP): {}",
        config.market_id, config.yes_token_id, config.no_token_id
    );
    info!(
        "Target pair cost: {} | Slack: {} | Size: {} | Cooldown: {}s | Sim balance: {}",
        config.target_pair_cost,
        config.balance_slack,
        config.order_size,
        config.cooldown_seconds,
        config.sim_balance
    );

    let feed = PolymarketWebSocket::new(WebSocketConfig::from_base_url(&config.ws_url));
    let controller = SessionController::new(config, Arc::new(feed));

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping session...");
            stop.stop();
        }
    });

    let report = controller.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &SessionReport) {
    let ledger = &report.ledger;
    let pair_cost = ledger
        .pair_cost()
        .total
        .map_or_else(|| "n/a".to_string(), |cost| format!("{:.4}", cost));

    println!();
    println!("=== Session Summary ===");
    println!("Market: {}", report.market_id);
    println!("Ended: {}", report.reason);
    println!(
        "Duration: {}s",
        (report.ended_at - report.started_at).num_seconds()
    );
    println!(
        "Trades: {} executed, {} failed",
        report.stats.trades_executed, report.stats.failed_executions
    );
    println!(
        "UP qty={:.2} cost={:.2} | DOWN qty={:.2} cost={:.2}",
        ledger.qty_no(),
        ledger.cost_no(),
        ledger.qty_yes(),
        ledger.cost_yes()
    );
    println!("Pair cost: {pair_cost}");
    println!("Invested: {:.2}", report.invested());
    println!("Expected payout: {:.2}", report.expected_payout());
    println!("Locked profit: {:.2}", report.locked_profit());
    if let Some(balance) = report.sim_balance {
        println!("Sim balance: {balance:.2}");
    }
    println!(
        "Skipped: {} pair cost, {} imbalance, {} cooldown, {} balance",
        report.stats.rejected_pair_cost,
        report.stats.rejected_imbalance,
        report.stats.cooldown_skips,
        report.stats.balance_skips
    );
}
