//! Blockchain RPC interface
//!
//! The engine consumes the chain through the `ChainClient` trait. The
//! JSON-RPC implementation lives in `rpc`; `fetcher` reads V2 pool metadata
//! through `call` with hand-rolled selectors.
//!
//! Author: AI-Generated
//! Created: 2026-02-15

pub mod fetcher;
pub mod rpc;

pub use fetcher::PoolFetcher;
pub use rpc::RpcChainClient;

use crate::types::TokenAmount;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Sender cannot cover value + gas; never retried
    #[error("insufficient funds for transaction")]
    InsufficientFunds,
    /// Stale nonce; never retried
    #[error("nonce too low")]
    NonceTooLow,
    /// Fee bump below replacement floor; never retried
    #[error("replacement transaction underpriced")]
    ReplacementUnderpriced,
    /// Execution revert or other node-side rejection; never retried
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("unexpected payload: {0}")]
    Parse(String),
}

/// EIP-1559 style gas price snapshot
#[derive(Debug, Clone, Copy)]
pub struct GasPrice {
    pub base_fee: U256,
    pub priority_low: U256,
    pub priority_medium: U256,
    pub priority_high: U256,
}

impl GasPrice {
    /// base + medium priority, in gwei (rounded down)
    pub fn effective_gwei(&self) -> u64 {
        let wei = self.base_fee + self.priority_medium;
        (wei / U256::from(1_000_000_000u64)).try_into().unwrap_or(u64::MAX)
    }
}

/// Minimal call/transaction request
#[derive(Debug, Clone, Default)]
pub struct TxRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub data: Vec<u8>,
    pub value: U256,
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub success: bool,
    pub gas_used: u64,
}

/// The contract the core consumes. Implementations retry transient faults
/// with exponential backoff; the four immediate error kinds surface as-is.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native balance in wei (18 decimals)
    async fn get_balance(&self, address: Address) -> Result<TokenAmount, ChainError>;

    async fn get_nonce(&self, address: Address, block: &str) -> Result<u64, ChainError>;

    async fn get_gas_price(&self) -> Result<GasPrice, ChainError>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ChainError>;

    /// Broadcast a signed raw transaction, returning its hash
    async fn send_transaction(&self, signed_hex: &str) -> Result<String, ChainError>;

    async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Receipt, ChainError>;

    async fn call(&self, tx: &TxRequest, block: &str) -> Result<Vec<u8>, ChainError>;
}
