//! Pending-swap calldata decoder
//!
//! Word-wise decoding of the six router swap variants we care about; no ABI
//! machinery, just selectors and 32-byte offsets. Unknown selectors return
//! None and are dropped upstream.
//!
//! Supported selectors:
//!   V2 router:
//!     0x38ed1739 — swapExactTokensForTokens(uint256,uint256,address[],address,uint256)
//!     0x8803dbee — swapTokensForExactTokens(uint256,uint256,address[],address,uint256)
//!     0x7ff36ab5 — swapExactETHForTokens(uint256,address[],address,uint256)
//!     0x18cbafe5 — swapExactTokensForETH(uint256,uint256,address[],address,uint256)
//!   V3 router:
//!     0x414bf389 — exactInputSingle((address,address,uint24,address,uint256,uint256,uint256,uint160))
//!     0xc04b8d59 — exactInput((bytes,address,uint256,uint256,uint256))
//!
//! Author: AI-Generated
//! Created: 2026-02-26
//! Modified: 2026-03-30 - tx value threaded in for ETH-input swaps

use alloy::primitives::{Address, U256};
use tracing::trace;

// ── V2 router selectors ─────────────────────────────────────────────
const SWAP_EXACT_TOKENS_FOR_TOKENS: [u8; 4] = [0x38, 0xed, 0x17, 0x39];
const SWAP_TOKENS_FOR_EXACT_TOKENS: [u8; 4] = [0x88, 0x03, 0xdb, 0xee];
const SWAP_EXACT_ETH_FOR_TOKENS: [u8; 4] = [0x7f, 0xf3, 0x6a, 0xb5];
const SWAP_EXACT_TOKENS_FOR_ETH: [u8; 4] = [0x18, 0xcb, 0xaf, 0xe5];

// ── V3 router selectors ─────────────────────────────────────────────
const EXACT_INPUT_SINGLE: [u8; 4] = [0x41, 0x4b, 0xf3, 0x89];
const EXACT_INPUT: [u8; 4] = [0xc0, 0x4b, 0x8d, 0x59];

/// A decoded pending swap, reduced to what the refresh hook needs
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSwap {
    pub function_name: &'static str,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
}

/// Hex selector for logging
pub fn selector_hex(input: &[u8]) -> String {
    if input.len() < 4 {
        return "0x????".to_string();
    }
    format!("0x{}", alloy::hex::encode(&input[..4]))
}

/// Decode swap calldata. `tx_value` supplies the input amount for
/// ETH-input variants where it is not in the calldata.
pub fn decode_calldata(input: &[u8], tx_value: U256) -> Option<ParsedSwap> {
    if input.len() < 4 {
        return None;
    }
    let selector: [u8; 4] = input[..4].try_into().ok()?;
    let data = &input[4..];

    match selector {
        SWAP_EXACT_TOKENS_FOR_TOKENS => {
            decode_v2_path_swap(data, 2, word_u256(data, 0)?, "swapExactTokensForTokens")
        }
        SWAP_TOKENS_FOR_EXACT_TOKENS => {
            // amountInMax is the committed input
            decode_v2_path_swap(data, 2, word_u256(data, 1)?, "swapTokensForExactTokens")
        }
        SWAP_EXACT_ETH_FOR_TOKENS => {
            decode_v2_path_swap(data, 1, tx_value, "swapExactETHForTokens")
        }
        SWAP_EXACT_TOKENS_FOR_ETH => {
            decode_v2_path_swap(data, 2, word_u256(data, 0)?, "swapExactTokensForETH")
        }
        EXACT_INPUT_SINGLE => decode_v3_exact_input_single(data),
        EXACT_INPUT => decode_v3_exact_input(data),
        _ => {
            trace!("unknown selector {}", selector_hex(input));
            None
        }
    }
}

fn word(data: &[u8], index: usize) -> Option<&[u8]> {
    data.get(index * 32..index * 32 + 32)
}

fn word_u256(data: &[u8], index: usize) -> Option<U256> {
    word(data, index).map(U256::from_be_slice)
}

fn word_address(data: &[u8], index: usize) -> Option<Address> {
    word(data, index).map(|w| Address::from_slice(&w[12..]))
}

/// Shared decoder for the V2 variants: the path array sits behind an offset
/// word at `path_word`; token_in/token_out are its endpoints.
fn decode_v2_path_swap(
    data: &[u8],
    path_word: usize,
    amount_in: U256,
    function_name: &'static str,
) -> Option<ParsedSwap> {
    let offset: usize = word_u256(data, path_word)?.try_into().ok()?;
    let len: usize = U256::from_be_slice(data.get(offset..offset + 32)?)
        .try_into()
        .ok()?;
    if len < 2 {
        return None;
    }
    let tail = &data[offset + 32..];
    let token_in = word_address(tail, 0)?;
    let token_out = word_address(tail, len - 1)?;
    Some(ParsedSwap {
        function_name,
        token_in,
        token_out,
        amount_in,
    })
}

/// exactInputSingle: a static 8-word params struct
fn decode_v3_exact_input_single(data: &[u8]) -> Option<ParsedSwap> {
    Some(ParsedSwap {
        function_name: "exactInputSingle",
        token_in: word_address(data, 0)?,
        token_out: word_address(data, 1)?,
        amount_in: word_u256(data, 5)?,
    })
}

/// exactInput: tuple with a dynamic bytes path, packed as
/// token(20) | fee(3) | token(20) [| fee(3) | token(20) ...]
fn decode_v3_exact_input(data: &[u8]) -> Option<ParsedSwap> {
    let tuple_offset: usize = word_u256(data, 0)?.try_into().ok()?;
    let tuple = data.get(tuple_offset..)?;
    let path_offset: usize = word_u256(tuple, 0)?.try_into().ok()?;
    let amount_in = word_u256(tuple, 3)?;

    let path_len: usize = U256::from_be_slice(tuple.get(path_offset..path_offset + 32)?)
        .try_into()
        .ok()?;
    let path = tuple.get(path_offset + 32..path_offset + 32 + path_len)?;
    if path.len() < 43 {
        return None;
    }
    let token_in = Address::from_slice(&path[..20]);
    let token_out = Address::from_slice(&path[path.len() - 20..]);
    Some(ParsedSwap {
        function_name: "exactInput",
        token_in,
        token_out,
        amount_in,
    })
}
