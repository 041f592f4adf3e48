//! Fork simulator client
//!
//! Executes candidate routes against an anvil-style forked chain before any
//! real money moves. `ensure_sender_ready` uses the fork's cheatcodes to
//! fund the simulation sender from configured funder addresses (whale
//! accounts per token, JSON from the environment) and approve the router;
//! `simulate_route` then eth_calls the V2 router swap and reads the actual
//! amounts array back.
//!
//! Author: AI-Generated
//! Created: 2026-02-18
//! Modified: 2026-04-02 - gas estimate folded into the simulation result
//!
//! Selectors:
//!   0xa9059cbb — transfer(address,uint256)
//!   0x095ea7b3 — approve(address,uint256)
//!   0x38ed1739 — swapExactTokensForTokens(uint256,uint256,address[],address,uint256)

use crate::amm::Route;
use crate::chain::rpc::RpcChainClient;
use alloy::primitives::{Address, U256};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

const SEL_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const SEL_APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
const SEL_SWAP_EXACT_TOKENS: [u8; 4] = [0x38, 0xed, 0x17, 0x39];

/// Native balance given to the simulation sender for gas
const SENDER_GAS_FUND_WEI: u128 = 10_000_000_000_000_000_000; // 10 ether

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub success: bool,
    pub amount_out: U256,
    pub gas_used: u64,
    pub error: Option<String>,
}

#[async_trait]
pub trait ForkSimulator: Send + Sync {
    /// Fund and approve `sender` so the route can actually execute
    async fn ensure_sender_ready(
        &self,
        route: &Route,
        amount_in: U256,
        sender: Address,
    ) -> anyhow::Result<()>;

    /// Execute the route on the fork and report what came out
    async fn simulate_route(
        &self,
        route: &Route,
        amount_in: U256,
        sender: Address,
    ) -> anyhow::Result<SimulationResult>;
}

pub struct ForkRpcSimulator {
    rpc: RpcChainClient,
    router: Address,
    /// token address -> whale account holding enough of it on the fork
    funders: HashMap<Address, Address>,
}

impl ForkRpcSimulator {
    pub fn new(fork_url: &str, router: Address, funders: HashMap<Address, Address>) -> Self {
        Self {
            rpc: RpcChainClient::new(fork_url),
            router,
            funders,
        }
    }

    fn encode_word(value: U256) -> [u8; 32] {
        value.to_be_bytes::<32>()
    }

    fn encode_address_word(address: Address) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        word
    }

    fn encode_transfer(to: Address, amount: U256) -> Vec<u8> {
        let mut data = SEL_TRANSFER.to_vec();
        data.extend_from_slice(&Self::encode_address_word(to));
        data.extend_from_slice(&Self::encode_word(amount));
        data
    }

    fn encode_approve(spender: Address, amount: U256) -> Vec<u8> {
        let mut data = SEL_APPROVE.to_vec();
        data.extend_from_slice(&Self::encode_address_word(spender));
        data.extend_from_slice(&Self::encode_word(amount));
        data
    }

    /// swapExactTokensForTokens(amountIn, 0, path, to, deadline)
    fn encode_swap(amount_in: U256, path: &[Address], to: Address, deadline: u64) -> Vec<u8> {
        let mut data = SEL_SWAP_EXACT_TOKENS.to_vec();
        data.extend_from_slice(&Self::encode_word(amount_in));
        data.extend_from_slice(&Self::encode_word(U256::ZERO)); // amountOutMin
        data.extend_from_slice(&Self::encode_word(U256::from(0xa0u64))); // path offset
        data.extend_from_slice(&Self::encode_address_word(to));
        data.extend_from_slice(&Self::encode_word(U256::from(deadline)));
        data.extend_from_slice(&Self::encode_word(U256::from(path.len())));
        for hop in path {
            data.extend_from_slice(&Self::encode_address_word(*hop));
        }
        data
    }

    /// Decode the trailing element of the returned uint[] amounts
    fn decode_last_amount(data: &[u8]) -> anyhow::Result<U256> {
        if data.len() < 96 {
            anyhow::bail!("swap returned {} bytes, expected amounts array", data.len());
        }
        let len = U256::from_be_slice(&data[32..64]);
        let len: usize = len.try_into().context("amounts length")?;
        let start = 64 + (len.saturating_sub(1)) * 32;
        let word = data
            .get(start..start + 32)
            .context("amounts array truncated")?;
        Ok(U256::from_be_slice(word))
    }

    async fn send_as(&self, from: Address, to: Address, data: Vec<u8>) -> anyhow::Result<()> {
        self.rpc
            .request(
                "anvil_impersonateAccount",
                json!([format!("{:?}", from)]),
            )
            .await?;
        let tx = json!({
            "from": format!("{:?}", from),
            "to": format!("{:?}", to),
            "data": format!("0x{}", alloy::hex::encode(&data)),
        });
        self.rpc.request("eth_sendTransaction", json!([tx])).await?;
        self.rpc
            .request(
                "anvil_stopImpersonatingAccount",
                json!([format!("{:?}", from)]),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ForkSimulator for ForkRpcSimulator {
    async fn ensure_sender_ready(
        &self,
        route: &Route,
        amount_in: U256,
        sender: Address,
    ) -> anyhow::Result<()> {
        let token_in = route.token_in();

        // Gas money for the sender
        self.rpc
            .request(
                "anvil_setBalance",
                json!([
                    format!("{:?}", sender),
                    format!("{:#x}", U256::from(SENDER_GAS_FUND_WEI))
                ]),
            )
            .await?;

        // Seed the input token from its configured funder
        let funder = self
            .funders
            .get(&token_in.address)
            .with_context(|| format!("no funder configured for {}", token_in.symbol))?;
        self.send_as(
            *funder,
            token_in.address,
            Self::encode_transfer(sender, amount_in),
        )
        .await
        .with_context(|| format!("funding {} from {:?}", token_in.symbol, funder))?;

        // Approve the router for the full input
        self.send_as(
            sender,
            token_in.address,
            Self::encode_approve(self.router, U256::MAX),
        )
        .await
        .context("router approval")?;

        debug!(
            "simulation sender {:?} ready: {} {} approved",
            sender, amount_in, token_in.symbol
        );
        Ok(())
    }

    async fn simulate_route(
        &self,
        route: &Route,
        amount_in: U256,
        sender: Address,
    ) -> anyhow::Result<SimulationResult> {
        let path: Vec<Address> = route.path().iter().map(|t| t.address).collect();
        let deadline = (Utc::now().timestamp() as u64) + 300;
        let data = Self::encode_swap(amount_in, &path, sender, deadline);

        let tx = json!({
            "from": format!("{:?}", sender),
            "to": format!("{:?}", self.router),
            "data": format!("0x{}", alloy::hex::encode(&data)),
        });

        let gas_used = match self.rpc.request("eth_estimateGas", json!([tx])).await {
            Ok(v) => v
                .as_str()
                .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
                .unwrap_or(0),
            Err(e) => {
                // Estimation failure is a revert: surface as a failed sim
                return Ok(SimulationResult {
                    success: false,
                    amount_out: U256::ZERO,
                    gas_used: 0,
                    error: Some(e.to_string()),
                });
            }
        };

        match self.rpc.request("eth_call", json!([tx, "latest"])).await {
            Ok(result) => {
                let raw = result.as_str().unwrap_or("0x");
                let bytes = alloy::hex::decode(raw.trim_start_matches("0x"))
                    .context("swap return data")?;
                let amount_out = Self::decode_last_amount(&bytes)?;
                Ok(SimulationResult {
                    success: true,
                    amount_out,
                    gas_used,
                    error: None,
                })
            }
            Err(e) => Ok(SimulationResult {
                success: false,
                amount_out: U256::ZERO,
                gas_used,
                error: Some(e.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_transfer_layout() {
        let data = ForkRpcSimulator::encode_transfer(Address::repeat_byte(0x11), U256::from(5u8));
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &SEL_TRANSFER);
        assert_eq!(data[35], 0x11); // first byte of the address payload
        assert_eq!(data[67], 5);
    }

    #[test]
    fn test_encode_swap_layout() {
        let path = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let data =
            ForkRpcSimulator::encode_swap(U256::from(100u8), &path, Address::repeat_byte(9), 42);
        // head: 5 words, tail: len + 2 addresses
        assert_eq!(data.len(), 4 + 5 * 32 + 32 + 2 * 32);
        // path offset points past the 5-word head
        assert_eq!(data[4 + 2 * 32 + 31], 0xa0);
        // array length 2
        assert_eq!(data[4 + 5 * 32 + 31], 2);
    }

    #[test]
    fn test_decode_last_amount() {
        // offset | len=2 | [100, 250]
        let mut data = vec![0u8; 32 * 4];
        data[31] = 0x20;
        data[63] = 2;
        data[95] = 100;
        data[127] = 250;
        assert_eq!(
            ForkRpcSimulator::decode_last_amount(&data).unwrap(),
            U256::from(250u8)
        );
    }

    #[test]
    fn test_decode_rejects_short_data() {
        assert!(ForkRpcSimulator::decode_last_amount(&[0u8; 32]).is_err());
    }
}
