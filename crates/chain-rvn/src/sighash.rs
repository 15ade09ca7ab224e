use bitcoin::hashes::Hash;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Amount, Script};

use crate::error::RvnError;
use crate::script::{self, ScriptKind};
use crate::transaction::Transaction;

/// SIGHASH_ALL: the signature commits to every input and output.
pub const SIGHASH_ALL: EcdsaSighashType = EcdsaSighashType::All;

/// Digest to sign for `input_index`, which spends a coin locked by
/// `script_pubkey` and worth `amount` satoshis.
///
/// P2PKH inputs use the legacy algorithm (the amount is not committed to);
/// P2WPKH inputs use the BIP143 witness v0 algorithm.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &[u8],
    amount: u64,
) -> Result<[u8; 32], RvnError> {
    let (kind, _) = script::classify(script_pubkey)?;
    match kind {
        ScriptKind::PayToPubkeyHash => legacy_sighash(tx, input_index, script_pubkey),
        ScriptKind::PayToWitnessPubkeyHash => {
            witness_v0_sighash(tx, input_index, script_pubkey, amount)
        }
    }
}

/// Legacy SIGHASH_ALL digest. Every other input's scriptSig is blanked and
/// `script_code` stands in for the signed input's.
pub fn legacy_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
) -> Result<[u8; 32], RvnError> {
    check_index(tx, input_index)?;
    let cache = SighashCache::new(tx);
    let digest = cache
        .legacy_signature_hash(
            input_index,
            Script::from_bytes(script_code),
            SIGHASH_ALL.to_u32(),
        )
        .map_err(|e| RvnError::Sighash(format!("legacy sighash failed: {e}")))?;
    Ok(digest.to_byte_array())
}

/// BIP143 witness v0 SIGHASH_ALL digest for an input spending the P2WPKH
/// `script_pubkey`.
pub fn witness_v0_sighash(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &[u8],
    amount: u64,
) -> Result<[u8; 32], RvnError> {
    check_index(tx, input_index)?;
    let mut cache = SighashCache::new(tx);
    let digest = cache
        .p2wpkh_signature_hash(
            input_index,
            Script::from_bytes(script_pubkey),
            Amount::from_sat(amount),
            SIGHASH_ALL,
        )
        .map_err(|e| RvnError::Sighash(format!("witness sighash failed: {e}")))?;
    Ok(digest.to_byte_array())
}

fn check_index(tx: &Transaction, input_index: usize) -> Result<(), RvnError> {
    if input_index >= tx.input.len() {
        return Err(RvnError::Sighash(format!(
            "input index {input_index} out of bounds for {} inputs",
            tx.input.len()
        )));
    }
    Ok(())
}
