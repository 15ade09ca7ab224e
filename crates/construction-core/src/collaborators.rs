//! Capabilities the engine consumes from the outside world: the UTXO
//! indexer and the node RPC client. Implementations live outside this crate.

use thiserror::Error;

use crate::error::ConstructionError;
use crate::types::{Coin, ScriptPubKey};

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum ExternalError {
    /// The call could not be completed (transport, unknown coin, node down).
    #[error("{0}")]
    Unavailable(String),

    /// The node refused the request on its merits.
    #[error("{0}")]
    Rejected(String),
}

impl From<ExternalError> for ConstructionError {
    fn from(e: ExternalError) -> Self {
        match e {
            ExternalError::Unavailable(msg) => ConstructionError::ExternalUnavailable(msg),
            ExternalError::Rejected(msg) => ConstructionError::TransactionRejected(msg),
        }
    }
}

/// Historical UTXO lookups.
pub trait Indexer {
    /// Locking script of each coin, in the order given. Fails if any coin
    /// is unknown.
    fn get_script_pub_keys(
        &self,
        coins: &[Coin],
    ) -> impl std::future::Future<Output = Result<Vec<ScriptPubKey>, ExternalError>> + Send;
}

/// Node RPC calls used during construction.
pub trait Client {
    /// Fee rate in coins per kB for confirmation within `conf_target` blocks.
    fn suggested_fee_rate(
        &self,
        conf_target: i64,
    ) -> impl std::future::Future<Output = Result<f64, ExternalError>> + Send;

    /// Height of the current chain tip.
    fn get_best_block(&self)
        -> impl std::future::Future<Output = Result<i64, ExternalError>> + Send;

    /// Hash of the block at `height`, display hex.
    fn get_hash_from_index(
        &self,
        height: i64,
    ) -> impl std::future::Future<Output = Result<String, ExternalError>> + Send;

    /// Broadcast a signed transaction and return the txid the node reports.
    fn send_raw_transaction(
        &self,
        tx_hex: &str,
    ) -> impl std::future::Future<Output = Result<String, ExternalError>> + Send;
}
