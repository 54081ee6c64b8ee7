//! WebSocket client for the Polymarket CLOB market channel.
//!
//! The client only transports frames: it connects, subscribes to a set of
//! asset ids and forwards every text frame unparsed. Decoding happens in
//! [`crate::hedge::PriceFeedAdapter`]. There is no reconnection; a dropped
//! connection ends the subscription and the caller decides what to do.
//!
//! # Architecture
//!
//! ```text
//! PolymarketWebSocket::subscribe()
//!        │
//!        ├─► Connects and sends the subscription message
//!        ├─► Spawns the frame pump task
//!        │   └─► Forwards text frames, answers pings
//!        │
//!        └─► Returns FeedSubscription (frames + shutdown)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use algo_trade_polymarket::websocket::{MarketFeed, PolymarketWebSocket, WebSocketConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let feed = PolymarketWebSocket::new(WebSocketConfig::default());
//!     let mut subscription = feed
//!         .subscribe(vec!["yes-token-123".to_string(), "no-token-456".to_string()])
//!         .await?;
//!
//!     while let Some(frame) = subscription.next_frame().await {
//!         println!("{}", frame?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Subscription
//! ```json
//! {
//!   "assets_ids": ["token_id_1", "token_id_2"],
//!   "type": "market"
//! }
//! ```

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Default WebSocket URL for Polymarket CLOB market channel.
pub const WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

/// Path of the market channel below the websocket host.
pub const MARKET_CHANNEL_PATH: &str = "/ws/market";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors that can occur on a market feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Failed to establish WebSocket connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding error.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The feed stopped delivering frames.
    #[error("Feed closed: {0}")]
    Closed(String),
}

/// Configuration for the WebSocket client.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Full market channel URL.
    pub url: String,
    /// Ping interval to keep connection alive.
    pub ping_interval: Duration,
    /// Frames buffered between the socket and the consumer.
    pub channel_buffer_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: WS_URL.to_string(),
            ping_interval: Duration::from_secs(30),
            channel_buffer_size: 1000,
        }
    }
}

impl WebSocketConfig {
    /// Builds a config from a websocket host, appending the market channel path
    /// when it is not already there.
    #[must_use]
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = if base.ends_with(MARKET_CHANNEL_PATH) {
            base.to_string()
        } else {
            format!("{base}{MARKET_CHANNEL_PATH}")
        };
        Self {
            url,
            ..Self::default()
        }
    }
}

/// A source of raw market frames.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Opens a subscription for the given asset ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    async fn subscribe(&self, asset_ids: Vec<String>) -> Result<FeedSubscription, FeedError>;
}

/// Live subscription handle.
///
/// Yields raw text frames until the feed ends (`None`) or fails (`Some(Err)`).
/// Closing or dropping the handle releases the underlying connection.
#[derive(Debug)]
pub struct FeedSubscription {
    frames: mpsc::Receiver<Result<String, FeedError>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FeedSubscription {
    /// Wraps a frame channel. `shutdown_tx` is signalled on close.
    #[must_use]
    pub fn new(
        frames: mpsc::Receiver<Result<String, FeedError>>,
        shutdown_tx: Option<oneshot::Sender<()>>,
    ) -> Self {
        Self {
            frames,
            shutdown_tx,
        }
    }

    pub async fn next_frame(&mut self) -> Option<Result<String, FeedError>> {
        self.frames.recv().await
    }

    /// Stops the producer and refuses further frames. Idempotent.
    pub fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.frames.close();
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Market channel client.
#[derive(Debug, Clone, Default)]
pub struct PolymarketWebSocket {
    config: WebSocketConfig,
}

impl PolymarketWebSocket {
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

#[async_trait]
impl MarketFeed for PolymarketWebSocket {
    async fn subscribe(&self, asset_ids: Vec<String>) -> Result<FeedSubscription, FeedError> {
        info!(url = %self.config.url, assets = asset_ids.len(), "Connecting to Polymarket WebSocket");

        let (ws_stream, _response) = connect_async(&self.config.url)
            .await
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        let (mut write, read) = ws_stream.split();

        let sub_msg = SubscriptionMessage {
            assets_ids: &asset_ids,
            msg_type: "market",
        };
        let sub_json = serde_json::to_string(&sub_msg)?;
        debug!(message = %sub_json, "Sending subscription message");
        write.send(Message::Text(sub_json)).await?;

        info!("WebSocket subscribed");

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_buffer_size);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(pump_frames(
            write,
            read,
            frame_tx,
            shutdown_rx,
            self.config.ping_interval,
        ));

        Ok(FeedSubscription::new(frame_rx, Some(shutdown_tx)))
    }
}

// ============================================================================
// WebSocket Message Types (Serde)
// ============================================================================

/// Subscription message sent to the WebSocket server.
#[derive(Debug, Serialize)]
struct SubscriptionMessage<'a> {
    assets_ids: &'a [String],
    #[serde(rename = "type")]
    msg_type: &'static str,
}

// ============================================================================
// Frame Pump
// ============================================================================

/// Forwards frames until shutdown, close, transport error or a dropped consumer.
async fn pump_frames(
    mut write: SplitSink<WsStream, Message>,
    mut read: SplitStream<WsStream>,
    frame_tx: mpsc::Sender<Result<String, FeedError>>,
    mut shutdown_rx: oneshot::Receiver<()>,
    ping_interval: Duration,
) {
    let mut ping_interval = tokio::time::interval(ping_interval);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Subscription closed, closing WebSocket");
                let _ = write.close().await;
                return;
            }

            _ = ping_interval.tick() => {
                debug!("Sending ping");
                if let Err(e) = write.send(Message::Ping(vec![])).await {
                    warn!(error = %e, "Failed to send ping");
                    let _ = frame_tx.send(Err(FeedError::WebSocket(e))).await;
                    return;
                }
            }

            msg = read.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => text,
                        Err(_) => {
                            debug!("Dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Received ping, sending pong");
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            let _ = frame_tx.send(Err(FeedError::WebSocket(e))).await;
                            return;
                        }
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("Received pong");
                        continue;
                    }
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Ok(Message::Close(frame))) => {
                        info!(frame = ?frame, "Received close frame");
                        return;
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        let _ = frame_tx.send(Err(FeedError::WebSocket(e))).await;
                        return;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        return;
                    }
                };

                if frame_tx.send(Ok(text)).await.is_err() {
                    debug!("Frame consumer gone, stopping pump");
                    let _ = write.close().await;
                    return;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
