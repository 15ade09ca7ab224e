use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Txid, Witness};

pub use bitcoin::{Transaction, TxIn, TxOut};

use crate::error::RvnError;
use crate::script::{self, ScriptKind, UnlockData};

/// Transaction version produced by the construction engine.
pub const TX_VERSION: Version = Version::ONE;

/// An input spending `prev_txid:prev_vout` with no unlock data yet.
/// `prev_txid` is in internal byte order.
pub fn unsigned_input(prev_txid: [u8; 32], prev_vout: u32) -> TxIn {
    TxIn {
        previous_output: OutPoint::new(Txid::from_byte_array(prev_txid), prev_vout),
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::default(),
    }
}

pub fn output(value: u64, script_pubkey: Vec<u8>) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey: ScriptBuf::from_bytes(script_pubkey),
    }
}

/// Version 1, zero-locktime transaction over `inputs` and `outputs`.
pub fn build_unsigned(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: TX_VERSION,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    }
}

/// Whether any input carries witness data.
pub fn has_witness(tx: &Transaction) -> bool {
    tx.input.iter().any(|input| !input.witness.is_empty())
}

/// Whether `input` has neither a scriptSig nor a witness.
pub fn is_unsigned(input: &TxIn) -> bool {
    input.script_sig.is_empty() && input.witness.is_empty()
}

/// Serialize the transaction.
///
/// The witness segment is written only when `include_witness` is set and at
/// least one input has a witness.
pub fn serialize(tx: &Transaction, include_witness: bool) -> Vec<u8> {
    if include_witness || !has_witness(tx) {
        return encode::serialize(tx);
    }
    let mut stripped = tx.clone();
    for input in &mut stripped.input {
        input.witness = Witness::default();
    }
    encode::serialize(&stripped)
}

/// Parse a serialized transaction, with or without a witness segment.
/// Trailing bytes are rejected.
pub fn deserialize(bytes: &[u8]) -> Result<Transaction, RvnError> {
    encode::deserialize(bytes).map_err(|e| RvnError::Decode(e.to_string()))
}

/// Transaction id in internal byte order.
pub fn txid(tx: &Transaction) -> [u8; 32] {
    tx.compute_txid().to_byte_array()
}

/// Transaction id in display (reversed) hex. Witness data does not affect it.
pub fn txid_hex(tx: &Transaction) -> String {
    tx.compute_txid().to_string()
}

/// Witness-inclusive transaction id in display hex. Equal to the txid
/// when no input carries a witness.
pub fn wtxid_hex(tx: &Transaction) -> String {
    tx.compute_wtxid().to_string()
}

/// Place a signature and public key on `input` in the form `kind` spends
/// with: a scriptSig for P2PKH, a witness stack for P2WPKH.
pub fn attach_unlock(input: &mut TxIn, kind: ScriptKind, signature: &[u8], public_key: &[u8]) {
    match kind {
        ScriptKind::PayToPubkeyHash => {
            input.script_sig = ScriptBuf::from_bytes(script::build_script_sig(signature, public_key));
        }
        ScriptKind::PayToWitnessPubkeyHash => {
            input.witness = Witness::from_slice(&script::build_witness(signature, public_key));
        }
    }
}

/// Signature and key carried by `input`, with the template they unlock.
/// `None` when the input is unsigned.
pub fn unlock_data(input: &TxIn) -> Result<Option<(ScriptKind, UnlockData)>, RvnError> {
    if !input.witness.is_empty() {
        let stack = input.witness.to_vec();
        return Ok(Some((
            ScriptKind::PayToWitnessPubkeyHash,
            script::parse_witness(&stack)?,
        )));
    }
    if !input.script_sig.is_empty() {
        return Ok(Some((
            ScriptKind::PayToPubkeyHash,
            script::parse_script_sig(input.script_sig.as_bytes())?,
        )));
    }
    Ok(None)
}
