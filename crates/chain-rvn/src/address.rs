use bech32::{hrp::Hrp, segwit};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::RvnError;
use crate::hash::hash160;
use crate::network::NetworkParams;
use crate::script::{self, ScriptKind};

/// Base58Check P2PKH payload without its checksum: version (1) + pubkey hash (20).
const BASE58_PAYLOAD_LEN: usize = 21;

/// Parse a secp256k1 public key (compressed or uncompressed) and return the
/// Hash160 of its compressed encoding.
pub fn pubkey_hash(pubkey_bytes: &[u8]) -> Result<[u8; 20], RvnError> {
    let public_key = k256::PublicKey::from_sec1_bytes(pubkey_bytes).map_err(|e| {
        RvnError::InvalidPublicKey(format!("failed to parse secp256k1 public key: {e}"))
    })?;
    let compressed = public_key.to_encoded_point(true);
    Ok(hash160(compressed.as_bytes()))
}

/// Address of a public key exactly as it was pushed in a scriptSig or
/// witness. An uncompressed key yields a different address than its
/// compressed form.
pub fn pushed_key_address(
    pushed_key: &[u8],
    kind: ScriptKind,
    params: &NetworkParams,
) -> Result<String, RvnError> {
    k256::PublicKey::from_sec1_bytes(pushed_key).map_err(|e| {
        RvnError::InvalidPublicKey(format!("failed to parse secp256k1 public key: {e}"))
    })?;
    encode_address(kind, &hash160(pushed_key), params)
}

/// Derive an address of the given template from a secp256k1 public key.
///
/// Steps:
/// 1. Parse and compress the key
/// 2. Hash160 it -> 20-byte pubkey hash
/// 3. Encode as Base58Check (P2PKH) or bech32 v0 (P2WPKH) with the
///    network's version byte / human-readable part
pub fn pubkey_to_address(
    pubkey_bytes: &[u8],
    kind: ScriptKind,
    params: &NetworkParams,
) -> Result<String, RvnError> {
    let hash = pubkey_hash(pubkey_bytes)?;
    encode_address(kind, &hash, params)
}

/// Encode a pubkey hash as an address of the given template.
pub fn encode_address(
    kind: ScriptKind,
    pubkey_hash: &[u8; 20],
    params: &NetworkParams,
) -> Result<String, RvnError> {
    match kind {
        ScriptKind::PayToPubkeyHash => {
            let mut payload = Vec::with_capacity(BASE58_PAYLOAD_LEN);
            payload.push(params.pub_key_hash_addr_id);
            payload.extend_from_slice(pubkey_hash);
            Ok(bs58::encode(&payload).with_check().into_string())
        }
        ScriptKind::PayToWitnessPubkeyHash => {
            let hrp = Hrp::parse(&params.bech32_hrp).map_err(|e| {
                RvnError::InvalidAddress(format!("invalid bech32 prefix {}: {e}", params.bech32_hrp))
            })?;
            segwit::encode(hrp, segwit::VERSION_0, pubkey_hash)
                .map_err(|e| RvnError::InvalidAddress(format!("bech32 encoding failed: {e}")))
        }
    }
}

/// Decode an address into its template and pubkey hash.
///
/// Addresses for other networks fail with `InvalidAddress`; well-formed
/// addresses of templates the engine cannot sign for (P2SH, P2WSH, future
/// witness versions) fail with `UnsupportedScriptType`.
pub fn decode_address(
    address: &str,
    params: &NetworkParams,
) -> Result<(ScriptKind, [u8; 20]), RvnError> {
    let segwit_prefix = format!("{}1", params.bech32_hrp);
    if address.to_lowercase().starts_with(&segwit_prefix) {
        return decode_segwit_address(address, params);
    }

    let decoded = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| RvnError::InvalidAddress(format!("invalid base58check: {e}")))?;

    if decoded.len() != BASE58_PAYLOAD_LEN {
        return Err(RvnError::InvalidAddress(format!(
            "expected {BASE58_PAYLOAD_LEN} payload bytes, got {}",
            decoded.len()
        )));
    }

    let version = decoded[0];
    if version == params.script_hash_addr_id {
        return Err(RvnError::UnsupportedScriptType(format!(
            "scripthash address {address}"
        )));
    }
    if version != params.pub_key_hash_addr_id {
        return Err(RvnError::InvalidAddress(format!(
            "version byte 0x{version:02x} is not valid on {}",
            params.name
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&decoded[1..21]);
    Ok((ScriptKind::PayToPubkeyHash, hash))
}

fn decode_segwit_address(
    address: &str,
    params: &NetworkParams,
) -> Result<(ScriptKind, [u8; 20]), RvnError> {
    let (hrp, version, program) = segwit::decode(address)
        .map_err(|e| RvnError::InvalidAddress(format!("invalid bech32 address: {e}")))?;

    if hrp.to_lowercase() != params.bech32_hrp.to_lowercase() {
        return Err(RvnError::InvalidAddress(format!(
            "prefix {} is not valid on {}",
            hrp.to_lowercase(),
            params.name
        )));
    }
    if version != segwit::VERSION_0 || program.len() != 20 {
        return Err(RvnError::UnsupportedScriptType(format!(
            "witness program of {} bytes in {address}",
            program.len()
        )));
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&program);
    Ok((ScriptKind::PayToWitnessPubkeyHash, hash))
}

/// Locking script paying to `address`, with its template.
pub fn address_to_script(
    address: &str,
    params: &NetworkParams,
) -> Result<(ScriptKind, Vec<u8>), RvnError> {
    let (kind, hash) = decode_address(address, params)?;
    Ok((kind, script::script_for(kind, &hash)))
}

/// Address a supported locking script pays to.
pub fn script_to_address(script: &[u8], params: &NetworkParams) -> Result<String, RvnError> {
    let (kind, hash) = script::classify(script)?;
    encode_address(kind, &hash, params)
}
