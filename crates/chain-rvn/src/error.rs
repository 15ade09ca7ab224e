use thiserror::Error;

/// Ravencoin chain operation errors.
#[derive(Debug, Error)]
pub enum RvnError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unsupported script type: {0}")]
    UnsupportedScriptType(String),

    #[error("invalid txid: {0}")]
    InvalidTxid(String),

    #[error("transaction decode error: {0}")]
    Decode(String),

    #[error("sighash error: {0}")]
    Sighash(String),

    #[error("invalid unlock data: {0}")]
    InvalidUnlockData(String),
}
