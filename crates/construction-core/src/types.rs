use serde::{Deserialize, Serialize};

use chain_rvn::hash::parse_txid;
use chain_rvn::network::NetworkParams;
use chain_rvn::script::ScriptKind;

use crate::error::ConstructionError;

/// Direction of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Consumes a coin (negative amount).
    Input,
    /// Creates an output (positive amount).
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: u64,
    /// Position of the input or output inside the transaction, set by Parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
}

impl AccountIdentifier {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
}

impl Currency {
    pub fn for_network(params: &NetworkParams) -> Self {
        Self {
            symbol: params.currency_symbol.clone(),
            decimals: params.currency_decimals,
        }
    }
}

/// A signed integer amount of the smallest currency unit, as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
}

impl Amount {
    pub fn new(value: i64, currency: Currency) -> Self {
        Self {
            value: value.to_string(),
            currency,
        }
    }

    /// Parse `value` as a signed integer.
    pub fn parse_value(&self) -> Result<i64, ConstructionError> {
        self.value.parse::<i64>().map_err(|e| {
            ConstructionError::InvalidInput(format!("amount {:?} is not an integer: {e}", self.value))
        })
    }
}

/// Coin reference in `<txid>:<vout>` form, txid in display order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinIdentifier {
    pub identifier: String,
}

impl CoinIdentifier {
    pub fn from_outpoint(txid_hex: &str, vout: u32) -> Self {
        Self {
            identifier: format!("{txid_hex}:{vout}"),
        }
    }

    /// Split into internal-order txid bytes and output index.
    pub fn outpoint(&self) -> Result<([u8; 32], u32), ConstructionError> {
        let (txid, vout) = self.identifier.split_once(':').ok_or_else(|| {
            ConstructionError::InvalidInput(format!(
                "coin identifier {:?} is not <txid>:<vout>",
                self.identifier
            ))
        })?;
        let vout = vout.parse::<u32>().map_err(|e| {
            ConstructionError::InvalidInput(format!("coin output index {vout:?}: {e}"))
        })?;
        Ok((parse_txid(txid)?, vout))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinAction {
    #[serde(rename = "coin_created")]
    CoinCreated,
    #[serde(rename = "coin_spent")]
    CoinSpent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

/// One balance-changing intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
}

/// An unspent output selected for spending, with its (negative) amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub coin_identifier: CoinIdentifier,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    Secp256k1,
    Secp256r1,
    Edwards25519,
    Tweedle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: CurveType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Ecdsa,
    EcdsaRecovery,
    Ed25519,
    #[serde(rename = "schnorr_1")]
    Schnorr1,
}

/// Digest one input's owner must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    pub account_identifier: AccountIdentifier,
    pub hex_bytes: String,
    pub signature_type: SignatureType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: SignatureType,
    /// 64-byte compact `r || s`.
    pub hex_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

/// State handed from Preprocess to Metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionOptions {
    pub coins: Vec<Coin>,
    pub estimated_size: u64,
    pub output_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_multiplier: Option<f64>,
}

/// Locking script as reported by the node's `decodescript` / indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asm: String,
    pub hex: String,
    #[serde(rename = "reqSigs", default)]
    pub required_sigs: u32,
    #[serde(rename = "type")]
    pub script_type: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// A coin whose locking script has been resolved and classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCoin {
    pub coin: Coin,
    pub kind: ScriptKind,
    pub script_pub_key: ScriptPubKey,
}

/// Recent block the transaction is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReference {
    pub height: i64,
    pub hash: String,
}

/// State handed from Metadata to Payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionMetadata {
    pub coins: Vec<ResolvedCoin>,
    pub replay_protection: BlockReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub metadata: ConstructionMetadata,
    pub suggested_fee: Vec<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadsResponse {
    /// Hex-encoded unsigned construction envelope.
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResponse {
    pub operations: Vec<Operation>,
    pub account_identifier_signers: Vec<AccountIdentifier>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_rvn::network::RvnNetwork;

    #[test]
    fn operation_type_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&OperationType::Input).unwrap(),
            "\"INPUT\""
        );
        assert_eq!(
            serde_json::from_str::<OperationType>("\"OUTPUT\"").unwrap(),
            OperationType::Output
        );
    }

    #[test]
    fn operation_json_shape() {
        let json = r#"{
            "operation_identifier": {"index": 0},
            "type": "INPUT",
            "account": {"address": "my2Gr56HqNx2Z7QGtpw474g28ZS8rxB7Hj"},
            "amount": {"value": "-10", "currency": {"symbol": "RVN", "decimals": 8}},
            "coin_change": {
                "coin_identifier": {"identifier": "aa:0"},
                "coin_action": "coin_spent"
            }
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.op_type, OperationType::Input);
        assert_eq!(op.operation_identifier.network_index, None);
        assert_eq!(op.amount.unwrap().parse_value().unwrap(), -10);
        assert_eq!(op.coin_change.unwrap().coin_action, CoinAction::CoinSpent);
    }

    #[test]
    fn coin_identifier_outpoint() {
        let coin = CoinIdentifier {
            identifier: "b14157a5c50503c8cd202a173613dd27e0027343c3d50cf85852dd020bf59c7f:1"
                .into(),
        };
        let (txid, vout) = coin.outpoint().unwrap();
        assert_eq!(vout, 1);
        // Internal order is the display order reversed.
        assert_eq!(txid[0], 0x7f);
        assert_eq!(txid[31], 0xb1);
    }

    #[test]
    fn coin_identifier_rejects_missing_vout() {
        let coin = CoinIdentifier {
            identifier: "b14157a5c50503c8cd202a173613dd27e0027343c3d50cf85852dd020bf59c7f".into(),
        };
        assert!(matches!(
            coin.outpoint(),
            Err(ConstructionError::InvalidInput(_))
        ));
    }

    #[test]
    fn amount_rejects_decimal_string() {
        let amount = Amount {
            value: "1.5".into(),
            currency: Currency::for_network(&RvnNetwork::Mainnet.params()),
        };
        assert!(amount.parse_value().is_err());
    }

    #[test]
    fn script_pub_key_uses_node_field_names() {
        let json = r#"{
            "hex": "0014c005b00ad075d30b89a7b65b7dad8899ba6a9c55",
            "reqSigs": 1,
            "type": "witness_v0_keyhash",
            "addresses": ["tb1qcqzmqzkswhfshzd8kedhmtvgnxax48z4fklhvm"]
        }"#;
        let spk: ScriptPubKey = serde_json::from_str(json).unwrap();
        assert_eq!(spk.required_sigs, 1);
        assert_eq!(spk.script_type, "witness_v0_keyhash");
        assert!(spk.asm.is_empty());
    }

    #[test]
    fn currency_follows_network() {
        let currency = Currency::for_network(&RvnNetwork::Testnet.params());
        assert_eq!(currency.symbol, "RVN");
        assert_eq!(currency.decimals, 8);
    }
}
