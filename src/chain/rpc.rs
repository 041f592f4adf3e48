//! JSON-RPC chain client
//!
//! Plain eth_* calls over HTTP with bounded exponential backoff. Nonce,
//! funding, and replacement errors surface immediately so the caller can
//! react; everything else (transport hiccups, rate limits) retries with
//! jittered delays. Jitter uses the timestamp-nanos trick so no RNG
//! dependency is needed.
//!
//! Author: AI-Generated
//! Created: 2026-02-15
//! Modified: 2026-03-18 - fee history percentiles for priority tiers

use super::{ChainClient, ChainError, GasPrice, Receipt, TxRequest};
use crate::types::TokenAmount;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY_MS: u64 = 200;

pub struct RpcChainClient {
    client: reqwest::Client,
    url: String,
    max_attempts: u32,
    base_delay: Duration,
}

impl RpcChainClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }

    pub fn with_retries(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    /// Classify a node error message into the taxonomy. The immediate kinds
    /// must not be retried: the outcome will not change.
    fn classify(message: &str) -> ChainError {
        let lower = message.to_lowercase();
        if lower.contains("insufficient funds") {
            ChainError::InsufficientFunds
        } else if lower.contains("nonce too low") {
            ChainError::NonceTooLow
        } else if lower.contains("replacement transaction underpriced")
            || lower.contains("replacement underpriced")
        {
            ChainError::ReplacementUnderpriced
        } else if lower.contains("execution reverted") || lower.contains("revert") {
            ChainError::Rpc(message.to_string())
        } else {
            // Unrecognized node errors are treated as transient
            ChainError::Transport(message.to_string())
        }
    }

    fn is_retryable(err: &ChainError) -> bool {
        matches!(err, ChainError::Transport(_))
    }

    async fn request_once(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        if let Some(err) = body.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc error");
            return Err(Self::classify(message));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| ChainError::Parse("missing result".into()))
    }

    /// Send with bounded exponential backoff plus jitter
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let mut last = String::new();
        for attempt in 0..self.max_attempts {
            match self.request_once(method, params.clone()).await {
                Ok(v) => return Ok(v),
                Err(e) if Self::is_retryable(&e) => {
                    last = e.to_string();
                    let backoff = self.base_delay * 2u32.pow(attempt);
                    // Timestamp-derived jitter, up to 25% of the backoff
                    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
                    let jitter_ms = nanos % (backoff.as_millis().max(4) as u64 / 4);
                    let delay = backoff + Duration::from_millis(jitter_ms);
                    warn!(
                        "{} failed (attempt {}/{}): {} - retrying in {:?}",
                        method,
                        attempt + 1,
                        self.max_attempts,
                        last,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(ChainError::RetriesExhausted {
            attempts: self.max_attempts,
            last,
        })
    }

    fn parse_u256(value: &Value) -> Result<U256, ChainError> {
        let s = value
            .as_str()
            .ok_or_else(|| ChainError::Parse(format!("expected hex string, got {}", value)))?;
        U256::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|e| ChainError::Parse(e.to_string()))
    }

    fn parse_u64(value: &Value) -> Result<u64, ChainError> {
        Ok(Self::parse_u256(value)?.try_into().unwrap_or(u64::MAX))
    }

    fn tx_to_json(tx: &TxRequest) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(from) = tx.from {
            obj.insert("from".into(), json!(format!("{:?}", from)));
        }
        if let Some(to) = tx.to {
            obj.insert("to".into(), json!(format!("{:?}", to)));
        }
        if !tx.data.is_empty() {
            obj.insert(
                "data".into(),
                json!(format!("0x{}", alloy::hex::encode(&tx.data))),
            );
        }
        if !tx.value.is_zero() {
            obj.insert("value".into(), json!(format!("{:#x}", tx.value)));
        }
        Value::Object(obj)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: Address) -> Result<TokenAmount, ChainError> {
        let result = self
            .request("eth_getBalance", json!([format!("{:?}", address), "latest"]))
            .await?;
        Ok(TokenAmount::new(Self::parse_u256(&result)?, 18))
    }

    async fn get_nonce(&self, address: Address, block: &str) -> Result<u64, ChainError> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{:?}", address), block]),
            )
            .await?;
        Self::parse_u64(&result)
    }

    async fn get_gas_price(&self) -> Result<GasPrice, ChainError> {
        let result = self
            .request("eth_feeHistory", json!(["0x5", "latest", [10, 50, 90]]))
            .await?;
        let base_fees = result
            .get("baseFeePerGas")
            .and_then(Value::as_array)
            .ok_or_else(|| ChainError::Parse("feeHistory missing baseFeePerGas".into()))?;
        let base_fee = base_fees
            .last()
            .map(Self::parse_u256)
            .transpose()?
            .unwrap_or(U256::ZERO);

        // Average each percentile column over the sampled blocks
        let mut tiers = [U256::ZERO; 3];
        let mut blocks = 0u64;
        if let Some(rewards) = result.get("reward").and_then(Value::as_array) {
            for block in rewards {
                if let Some(row) = block.as_array() {
                    for (i, cell) in row.iter().take(3).enumerate() {
                        tiers[i] += Self::parse_u256(cell)?;
                    }
                    blocks += 1;
                }
            }
        }
        if blocks > 0 {
            for tier in tiers.iter_mut() {
                *tier /= U256::from(blocks);
            }
        }

        Ok(GasPrice {
            base_fee,
            priority_low: tiers[0],
            priority_medium: tiers[1],
            priority_high: tiers[2],
        })
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ChainError> {
        let result = self
            .request("eth_estimateGas", json!([Self::tx_to_json(tx)]))
            .await?;
        Self::parse_u64(&result)
    }

    async fn send_transaction(&self, signed_hex: &str) -> Result<String, ChainError> {
        let result = self
            .request("eth_sendRawTransaction", json!([signed_hex]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::Parse("non-string tx hash".into()))
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Receipt, ChainError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let result = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !result.is_null() {
                let status = result
                    .get("status")
                    .map(Self::parse_u64)
                    .transpose()?
                    .unwrap_or(0);
                let block_number = result
                    .get("blockNumber")
                    .map(Self::parse_u64)
                    .transpose()?
                    .unwrap_or(0);
                let gas_used = result
                    .get("gasUsed")
                    .map(Self::parse_u64)
                    .transpose()?
                    .unwrap_or(0);
                debug!("receipt for {}: status={}, block={}", tx_hash, status, block_number);
                return Ok(Receipt {
                    transaction_hash: tx_hash.to_string(),
                    block_number,
                    success: status == 1,
                    gas_used,
                });
            }
            if tokio::time::Instant::now() + poll > deadline {
                return Err(ChainError::Timeout(format!(
                    "no receipt for {} within {:?}",
                    tx_hash, timeout
                )));
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn call(&self, tx: &TxRequest, block: &str) -> Result<Vec<u8>, ChainError> {
        let result = self
            .request("eth_call", json!([Self::tx_to_json(tx), block]))
            .await?;
        let s = result
            .as_str()
            .ok_or_else(|| ChainError::Parse("non-string call result".into()))?;
        alloy::hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| ChainError::Parse(e.to_string()))
    }
}
