use chain_rvn::error::RvnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid curve type: {0}")]
    InvalidCurveType(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Missing coin reference on operation {0}")]
    MissingCoinReference(u64),

    #[error("Unsupported script type: {0}")]
    UnsupportedScriptType(String),

    #[error("External collaborator unavailable: {0}")]
    ExternalUnavailable(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Endpoint unavailable in offline mode: {0}")]
    UnavailableOffline(&'static str),

    #[error("Signature count mismatch: {0}")]
    SignatureCountMismatch(String),

    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConstructionError {
    /// Stable numeric code reported to API callers.
    pub fn code(&self) -> u32 {
        match self {
            ConstructionError::InvalidInput(_) => 1,
            ConstructionError::InvalidCurveType(_) => 2,
            ConstructionError::InvalidPublicKey(_) => 3,
            ConstructionError::MissingCoinReference(_) => 4,
            ConstructionError::UnsupportedScriptType(_) => 5,
            ConstructionError::ExternalUnavailable(_) => 6,
            ConstructionError::TransactionRejected(_) => 7,
            ConstructionError::UnavailableOffline(_) => 8,
            ConstructionError::SignatureCountMismatch(_) => 9,
            ConstructionError::SignatureInvalid(_) => 10,
            ConstructionError::EncodingError(_) => 11,
            ConstructionError::Config(_) => 12,
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    pub fn retriable(&self) -> bool {
        matches!(self, ConstructionError::ExternalUnavailable(_))
    }
}

impl From<RvnError> for ConstructionError {
    fn from(e: RvnError) -> Self {
        match e {
            RvnError::InvalidPublicKey(msg) => ConstructionError::InvalidPublicKey(msg),
            RvnError::InvalidAddress(msg) => {
                ConstructionError::InvalidInput(format!("invalid address: {msg}"))
            }
            RvnError::UnsupportedScriptType(msg) => ConstructionError::UnsupportedScriptType(msg),
            RvnError::InvalidTxid(msg) => {
                ConstructionError::InvalidInput(format!("invalid txid: {msg}"))
            }
            RvnError::Decode(msg) => ConstructionError::EncodingError(msg),
            RvnError::Sighash(msg) => ConstructionError::InvalidInput(format!("sighash: {msg}")),
            RvnError::InvalidUnlockData(msg) => ConstructionError::SignatureInvalid(msg),
        }
    }
}

impl From<serde_json::Error> for ConstructionError {
    fn from(e: serde_json::Error) -> Self {
        ConstructionError::EncodingError(format!("JSON: {e}"))
    }
}

impl From<hex::FromHexError> for ConstructionError {
    fn from(e: hex::FromHexError) -> Self {
        ConstructionError::EncodingError(format!("hex: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_coin_reference() {
        let err = ConstructionError::MissingCoinReference(3);
        assert_eq!(err.to_string(), "Missing coin reference on operation 3");
    }

    #[test]
    fn display_unavailable_offline() {
        let err = ConstructionError::UnavailableOffline("metadata");
        assert_eq!(
            err.to_string(),
            "Endpoint unavailable in offline mode: metadata"
        );
    }

    #[test]
    fn only_external_failures_are_retriable() {
        assert!(ConstructionError::ExternalUnavailable("timeout".into()).retriable());
        assert!(!ConstructionError::TransactionRejected("dust".into()).retriable());
        assert!(!ConstructionError::InvalidInput("x".into()).retriable());
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            ConstructionError::InvalidInput(String::new()),
            ConstructionError::InvalidCurveType(String::new()),
            ConstructionError::InvalidPublicKey(String::new()),
            ConstructionError::MissingCoinReference(0),
            ConstructionError::UnsupportedScriptType(String::new()),
            ConstructionError::ExternalUnavailable(String::new()),
            ConstructionError::TransactionRejected(String::new()),
            ConstructionError::UnavailableOffline("submit"),
            ConstructionError::SignatureCountMismatch(String::new()),
            ConstructionError::SignatureInvalid(String::new()),
            ConstructionError::EncodingError(String::new()),
            ConstructionError::Config(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn rvn_decode_maps_to_encoding_error() {
        let err: ConstructionError = RvnError::Decode("truncated".into()).into();
        assert!(matches!(err, ConstructionError::EncodingError(_)));
    }

    #[test]
    fn rvn_unsupported_script_is_preserved() {
        let err: ConstructionError = RvnError::UnsupportedScriptType("multisig".into()).into();
        assert_eq!(err.to_string(), "Unsupported script type: multisig");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(ConstructionError::Config("bad toml".into()));
        assert!(err.to_string().contains("bad toml"));
    }
}
