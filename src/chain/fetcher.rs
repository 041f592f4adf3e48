//! V2 pool metadata reader
//!
//! Reads token0/token1/decimals/symbol/getReserves through `eth_call` with
//! hand-rolled selectors and word-wise decoding — no ABI machinery needed
//! for five fixed-shape views.
//!
//! Selectors:
//!   0x0dfe1681 — token0()
//!   0xd21220a7 — token1()
//!   0x0902f1ac — getReserves()
//!   0x313ce567 — decimals()
//!   0x95d89b41 — symbol()
//!
//! Author: AI-Generated
//! Created: 2026-02-16

use super::{ChainClient, ChainError, TxRequest};
use crate::amm::Pair;
use crate::pricing::PoolSource;
use crate::types::Token;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const SEL_TOKEN0: [u8; 4] = [0x0d, 0xfe, 0x16, 0x81];
const SEL_TOKEN1: [u8; 4] = [0xd2, 0x12, 0x20, 0xa7];
const SEL_GET_RESERVES: [u8; 4] = [0x09, 0x02, 0xf1, 0xac];
const SEL_DECIMALS: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const SEL_SYMBOL: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

pub struct PoolFetcher {
    chain: Arc<dyn ChainClient>,
    /// Swap fee assumed for fetched pools (V2 pairs do not expose it)
    fee_bps: u32,
}

impl PoolFetcher {
    pub fn new(chain: Arc<dyn ChainClient>, fee_bps: u32) -> Self {
        Self { chain, fee_bps }
    }

    async fn view(&self, contract: Address, selector: [u8; 4]) -> Result<Vec<u8>, ChainError> {
        let tx = TxRequest {
            from: None,
            to: Some(contract),
            data: selector.to_vec(),
            value: U256::ZERO,
        };
        self.chain.call(&tx, "latest").await
    }

    fn word(data: &[u8], index: usize) -> Result<&[u8], ChainError> {
        let start = index * 32;
        data.get(start..start + 32)
            .ok_or_else(|| ChainError::Parse(format!("return data too short for word {}", index)))
    }

    fn decode_address(data: &[u8]) -> Result<Address, ChainError> {
        let word = Self::word(data, 0)?;
        Ok(Address::from_slice(&word[12..]))
    }

    fn decode_u256(data: &[u8], index: usize) -> Result<U256, ChainError> {
        Ok(U256::from_be_slice(Self::word(data, index)?))
    }

    fn decode_u8(data: &[u8]) -> Result<u8, ChainError> {
        let v: u64 = Self::decode_u256(data, 0)?
            .try_into()
            .map_err(|_| ChainError::Parse("decimals out of range".into()))?;
        u8::try_from(v).map_err(|_| ChainError::Parse("decimals out of range".into()))
    }

    /// ABI string decode with a fallback for non-conforming tokens
    fn decode_symbol(data: &[u8], address: Address) -> String {
        let fallback = || format!("{}", address)[..10].to_string();
        let Ok(offset) = Self::decode_u256(data, 0) else {
            return fallback();
        };
        let Ok(offset) = usize::try_from(offset) else {
            return fallback();
        };
        let Some(len_word) = data.get(offset..offset + 32) else {
            return fallback();
        };
        let len = U256::from_be_slice(len_word);
        let Ok(len) = usize::try_from(len) else {
            return fallback();
        };
        match data.get(offset + 32..offset + 32 + len) {
            Some(bytes) => String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string(),
            None => fallback(),
        }
    }

    async fn fetch_token(&self, address: Address) -> Result<Token, ChainError> {
        let decimals = Self::decode_u8(&self.view(address, SEL_DECIMALS).await?)?;
        let symbol_data = self.view(address, SEL_SYMBOL).await?;
        let symbol = Self::decode_symbol(&symbol_data, address);
        Ok(Token::new(symbol, address, decimals))
    }
}

#[async_trait]
impl PoolSource for PoolFetcher {
    async fn fetch_pair(&self, address: Address) -> anyhow::Result<Pair> {
        let token0_addr = Self::decode_address(&self.view(address, SEL_TOKEN0).await?)?;
        let token1_addr = Self::decode_address(&self.view(address, SEL_TOKEN1).await?)?;

        let token0 = self.fetch_token(token0_addr).await?;
        let token1 = self.fetch_token(token1_addr).await?;

        let reserves = self.view(address, SEL_GET_RESERVES).await?;
        let reserve0 = Self::decode_u256(&reserves, 0)?;
        let reserve1 = Self::decode_u256(&reserves, 1)?;

        debug!(
            "pool {}: {}/{} reserves ({}, {})",
            address, token0.symbol, token1.symbol, reserve0, reserve1
        );

        Ok(Pair::new(
            address, token0, token1, reserve0, reserve1, self.fee_bps,
        )?)
    }
}
