/// ERC-20 ABI constants (shared by every backend variant)
pub mod erc20 {
    /// keccak256("Transfer(address,address,uint256)")
    pub const TRANSFER_TOPIC: &str =
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
    /// Selector of `symbol()`
    pub const SYMBOL_SELECTOR: &str = "0x95d89b41";
    /// Selector of `balanceOf(address)`
    pub const BALANCE_OF_SELECTOR: &str = "0x70a08231";
}

/// The zero address; transfers from it are mints, transfers to it are burns
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Explorer transaction URL prefix used in alert messages
pub const EXPLORER_TX_URL: &str = "https://etherscan.io/tx/";
