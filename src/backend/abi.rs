//! Minimal ERC-20 ABI encoding and decoding for raw `eth_call` / log payloads

use ethers::types::U256;

use crate::constants::erc20::{BALANCE_OF_SELECTOR, SYMBOL_SELECTOR};

/// Calldata for `symbol()`
pub fn encode_symbol() -> String {
    SYMBOL_SELECTOR.to_string()
}

/// Calldata for `balanceOf(wallet)`; `wallet` must be a normalized address
pub fn encode_balance_of(wallet: &str) -> String {
    format!("{}{}", BALANCE_OF_SELECTOR, pad_address(wallet))
}

/// Left-pad an address to a 32-byte word (no `0x`)
fn pad_address(address: &str) -> String {
    let bare = address.trim_start_matches("0x").to_ascii_lowercase();
    format!("{:0>64}", bare)
}

/// Log topic for an indexed address parameter
pub fn address_topic(address: &str) -> String {
    format!("0x{}", pad_address(address))
}

/// Hex digits after an optional `0x`; `None` if any other character appears
fn hex_body(value: &str) -> Option<&str> {
    let bare = value.trim_start_matches("0x");
    bare.bytes().all(|b| b.is_ascii_hexdigit()).then_some(bare)
}

/// Recover the address from an indexed topic (last 20 bytes)
pub fn address_from_topic(topic: &str) -> Option<String> {
    let bare = hex_body(topic)?;
    let tail = bare.get(bare.len().checked_sub(40)?..)?;
    Some(format!("0x{}", tail.to_ascii_lowercase()))
}

/// Parse a `0x` quantity (block number, timestamp)
pub fn parse_hex_u64(value: &str) -> Option<u64> {
    let bare = hex_body(value)?;
    if bare.is_empty() {
        return Some(0);
    }
    u64::from_str_radix(bare, 16).ok()
}

/// Parse a 32-byte word (or shorter quantity) as an unsigned integer.
///
/// Longer payloads are read from their first word.
pub fn parse_hex_u256(value: &str) -> Option<U256> {
    let bare = hex_body(value)?;
    if bare.is_empty() {
        return Some(U256::zero());
    }
    let word = bare.get(..64).unwrap_or(bare);
    U256::from_str_radix(word, 16).ok()
}

/// Decode the return data of `symbol()`.
///
/// Handles the dynamic `string` encoding and the legacy `bytes32` encoding
/// used by tokens such as MKR. Returns `None` for empty or non-UTF-8 output.
pub fn decode_symbol(data: &[u8]) -> Option<String> {
    if data.len() >= 64 {
        let offset = U256::from_big_endian(&data[..32]);
        if offset == U256::from(32u64) {
            let len = U256::from_big_endian(&data[32..64]);
            if len <= U256::from(data.len() - 64) {
                let len = len.as_usize();
                let raw = &data[64..64 + len];
                return clean_symbol(raw);
            }
        }
    }

    if data.len() >= 32 {
        let end = data[..32].iter().position(|b| *b == 0).unwrap_or(32);
        return clean_symbol(&data[..end]);
    }

    None
}

/// Decode `symbol()` return data given as a hex string
pub fn decode_symbol_hex(value: &str) -> Option<String> {
    let bytes = hex::decode(value.trim_start_matches("0x")).ok()?;
    decode_symbol(&bytes)
}

fn clean_symbol(raw: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(raw).ok()?;
    let trimmed = text.trim_matches(char::from(0)).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
