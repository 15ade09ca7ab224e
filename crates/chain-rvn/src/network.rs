use serde::{Deserialize, Serialize};

/// Minimum relay fee rate on mainnet, in RVN per kB.
pub const MAINNET_MIN_FEE_RATE: f64 = 0.015;

/// Minimum relay fee rate on testnet, in RVN per kB.
pub const TESTNET_MIN_FEE_RATE: f64 = 0.00001;

/// Supported Ravencoin networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RvnNetwork {
    Mainnet,
    Testnet,
}

/// Chain parameters consumed by the address codec and the construction
/// engine. A plain value: callers hold their own copy and nothing here is
/// registered globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub name: String,
    /// Version byte of P2PKH addresses.
    pub pub_key_hash_addr_id: u8,
    /// Version byte of P2SH addresses (recognised only to be rejected).
    pub script_hash_addr_id: u8,
    /// Human-readable part of bech32 witness addresses.
    pub bech32_hrp: String,
    pub currency_symbol: String,
    pub currency_decimals: u32,
    /// Minimum relay fee rate in coins per kB.
    pub min_fee_rate: f64,
}

impl RvnNetwork {
    /// Build the parameter set for this network.
    pub fn params(self) -> NetworkParams {
        match self {
            RvnNetwork::Mainnet => NetworkParams {
                name: "mainnet".into(),
                pub_key_hash_addr_id: 0x00,
                script_hash_addr_id: 0x05,
                bech32_hrp: "bc".into(),
                currency_symbol: "RVN".into(),
                currency_decimals: 8,
                min_fee_rate: MAINNET_MIN_FEE_RATE,
            },
            RvnNetwork::Testnet => NetworkParams {
                name: "testnet".into(),
                pub_key_hash_addr_id: 0x6f,
                script_hash_addr_id: 0xc4,
                bech32_hrp: "tb".into(),
                currency_symbol: "RVN".into(),
                currency_decimals: 8,
                min_fee_rate: TESTNET_MIN_FEE_RATE,
            },
        }
    }
}

impl std::fmt::Display for RvnNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RvnNetwork::Mainnet => write!(f, "mainnet"),
            RvnNetwork::Testnet => write!(f, "testnet"),
        }
    }
}
