//! Pending transaction watcher
//!
//! Subscribes to the node's filtered pending-transaction stream over
//! WebSocket (alchemy_pendingTransactions with a toAddress router filter),
//! decodes swap calldata, and forwards only swaps whose token pair matches
//! a tracked pool to the pricing engine's refresh hook.
//!
//! Connection drops reconnect with a capped retry count; the watcher is an
//! optimization, so running without it degrades quote freshness but nothing
//! else.
//!
//! Author: AI-Generated
//! Created: 2026-02-27

use super::decoder::{decode_calldata, selector_hex};
use crate::pricing::PricingEngine;
use alloy::primitives::{Address, U256};
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const MAX_RECONNECTS: u32 = 50;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct PendingSwapWatcher {
    ws_url: String,
    /// Router addresses the subscription filters on
    routers: Vec<Address>,
    pricing: Arc<PricingEngine>,
}

impl PendingSwapWatcher {
    pub fn new(ws_url: String, routers: Vec<Address>, pricing: Arc<PricingEngine>) -> Self {
        Self {
            ws_url,
            routers,
            pricing,
        }
    }

    /// Run until the reconnect budget is exhausted. Intended for
    /// tokio::spawn from main.
    pub async fn run(self) -> anyhow::Result<()> {
        if self.routers.is_empty() {
            warn!("no router addresses configured - mempool watcher has nothing to watch");
            return Ok(());
        }
        let mut reconnects = 0u32;
        loop {
            match self.run_inner().await {
                Ok(()) => {
                    info!("mempool watcher stream ended cleanly");
                    return Ok(());
                }
                Err(e) => {
                    reconnects += 1;
                    if reconnects > MAX_RECONNECTS {
                        return Err(e.context(format!(
                            "mempool watcher: {} reconnects exhausted",
                            MAX_RECONNECTS
                        )));
                    }
                    warn!(
                        "mempool watcher error (reconnect {}/{}): {} - retrying in {:?}",
                        reconnects, MAX_RECONNECTS, e, RECONNECT_DELAY
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    /// One WebSocket session
    async fn run_inner(&self) -> anyhow::Result<()> {
        let (ws, _) = connect_async(&self.ws_url)
            .await
            .context("pending-tx websocket connect")?;
        let (mut write, mut read) = ws.split();

        let router_hex: Vec<String> =
            self.routers.iter().map(|a| format!("{:?}", a)).collect();
        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": [
                "alchemy_pendingTransactions",
                { "toAddress": router_hex, "hashesOnly": false }
            ],
        });
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .context("subscribe send")?;
        info!(
            "mempool watcher subscribed: {} routers on {}",
            self.routers.len(),
            self.ws_url
        );

        while let Some(message) = read.next().await {
            match message.context("websocket read")? {
                Message::Text(text) => self.handle_notification(&text).await,
                Message::Ping(data) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Message::Close(_) => anyhow::bail!("websocket closed by peer"),
                _ => {}
            }
        }
        anyhow::bail!("websocket stream ended")
    }

    async fn handle_notification(&self, text: &str) {
        let Some((input, value)) = Self::parse_notification(text) else {
            return;
        };
        let Some(swap) = decode_calldata(&input, value) else {
            debug!("undecodable pending tx, selector {}", selector_hex(&input));
            return;
        };
        debug!(
            "pending {}: {} -> {} ({})",
            swap.function_name, swap.token_in, swap.token_out, swap.amount_in
        );
        self.pricing
            .note_pending_swap(swap.token_in, swap.token_out)
            .await;
    }

    /// Extract (calldata, tx value) from a subscription notification
    fn parse_notification(text: &str) -> Option<(Vec<u8>, U256)> {
        let body: Value = serde_json::from_str(text).ok()?;
        if body.get("method")?.as_str()? != "eth_subscription" {
            return None;
        }
        let tx = body.get("params")?.get("result")?;
        let input = tx.get("input")?.as_str()?;
        let input = alloy::hex::decode(input.trim_start_matches("0x")).ok()?;
        let value = tx
            .get("value")
            .and_then(Value::as_str)
            .and_then(|s| U256::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .unwrap_or(U256::ZERO);
        Some((input, value))
    }
}
