use serde::{Deserialize, Serialize};

use crate::address;
use crate::error::RvnError;
use crate::network::NetworkParams;

pub const OP_0: u8 = 0x00;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

const P2PKH_SCRIPT_LEN: usize = 25;
const P2WPKH_SCRIPT_LEN: usize = 22;

/// The locking-script templates the engine can build and sign for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    PayToPubkeyHash,
    PayToWitnessPubkeyHash,
}

impl ScriptKind {
    /// Script type name as reported by the node's `decodescript` RPC.
    pub fn node_type(self) -> &'static str {
        match self {
            ScriptKind::PayToPubkeyHash => "pubkeyhash",
            ScriptKind::PayToWitnessPubkeyHash => "witness_v0_keyhash",
        }
    }

    pub fn is_witness(self) -> bool {
        matches!(self, ScriptKind::PayToWitnessPubkeyHash)
    }
}

/// A locking script classified into one of the supported templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedScript {
    pub kind: ScriptKind,
    pub required_sigs: u32,
    pub addresses: Vec<String>,
}

/// Signature and public key recovered from a scriptSig or witness stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockData {
    /// DER signature with the trailing sighash type byte.
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Build a P2PKH scriptPubKey: OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG
pub fn p2pkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(OP_DATA_20);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Build a P2WPKH scriptPubKey: OP_0 <20-byte hash>
pub fn p2wpkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2WPKH_SCRIPT_LEN);
    script.push(OP_0);
    script.push(OP_DATA_20);
    script.extend_from_slice(pubkey_hash);
    script
}

/// Locking script for `kind` paying to `pubkey_hash`.
pub fn script_for(kind: ScriptKind, pubkey_hash: &[u8; 20]) -> Vec<u8> {
    match kind {
        ScriptKind::PayToPubkeyHash => p2pkh_script(pubkey_hash),
        ScriptKind::PayToWitnessPubkeyHash => p2wpkh_script(pubkey_hash),
    }
}

/// Split a locking script into its template and key hash.
pub fn classify(script: &[u8]) -> Result<(ScriptKind, [u8; 20]), RvnError> {
    let mut hash = [0u8; 20];
    if script.len() == P2PKH_SCRIPT_LEN
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == OP_DATA_20
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
    {
        hash.copy_from_slice(&script[3..23]);
        return Ok((ScriptKind::PayToPubkeyHash, hash));
    }
    if script.len() == P2WPKH_SCRIPT_LEN && script[0] == OP_0 && script[1] == OP_DATA_20 {
        hash.copy_from_slice(&script[2..22]);
        return Ok((ScriptKind::PayToWitnessPubkeyHash, hash));
    }
    Err(RvnError::UnsupportedScriptType(
        describe_unsupported(script).into(),
    ))
}

/// Classify a hex locking script and decode the address it pays to.
pub fn decode_script(script_hex: &str, params: &NetworkParams) -> Result<DecodedScript, RvnError> {
    let script = hex::decode(script_hex)
        .map_err(|e| RvnError::Decode(format!("invalid script hex: {e}")))?;
    let (kind, hash) = classify(&script)?;
    let address = address::encode_address(kind, &hash, params)?;
    Ok(DecodedScript {
        kind,
        required_sigs: 1,
        addresses: vec![address],
    })
}

fn describe_unsupported(script: &[u8]) -> &'static str {
    match script {
        [] => "empty script",
        [OP_HASH160, OP_DATA_20, .., OP_EQUAL] if script.len() == 23 => "scripthash",
        [OP_0, 0x20, ..] if script.len() == 34 => "witness_v0_scripthash",
        [.., OP_CHECKMULTISIG] => "multisig",
        [33, .., OP_CHECKSIG] if script.len() == 35 => "pubkey",
        [65, .., OP_CHECKSIG] if script.len() == 67 => "pubkey",
        _ => "nonstandard",
    }
}

/// Append a minimal data push of `data` to `script`.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// P2PKH scriptSig: <sig+hashtype> <pubkey>
pub fn build_script_sig(signature: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(signature.len() + public_key.len() + 2);
    push_data(&mut script, signature);
    push_data(&mut script, public_key);
    script
}

/// P2WPKH witness stack: [sig+hashtype, pubkey]
pub fn build_witness(signature: &[u8], public_key: &[u8]) -> Vec<Vec<u8>> {
    vec![signature.to_vec(), public_key.to_vec()]
}

/// Read every data push of a push-only script.
pub fn parse_pushes(script: &[u8]) -> Result<Vec<Vec<u8>>, RvnError> {
    let mut pushes = Vec::new();
    let mut pos = 0;
    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;
        let len = match opcode {
            OP_0..=0x4b => opcode as usize,
            OP_PUSHDATA1 => {
                let n = *script
                    .get(pos)
                    .ok_or_else(|| truncated_push(opcode))?;
                pos += 1;
                n as usize
            }
            OP_PUSHDATA2 => {
                let bytes = script
                    .get(pos..pos + 2)
                    .ok_or_else(|| truncated_push(opcode))?;
                pos += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            OP_PUSHDATA4 => {
                let bytes = script
                    .get(pos..pos + 4)
                    .ok_or_else(|| truncated_push(opcode))?;
                pos += 4;
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
            }
            other => {
                return Err(RvnError::InvalidUnlockData(format!(
                    "non-push opcode 0x{other:02x}"
                )))
            }
        };
        let data = script
            .get(pos..pos + len)
            .ok_or_else(|| truncated_push(opcode))?;
        pushes.push(data.to_vec());
        pos += len;
    }
    Ok(pushes)
}

fn truncated_push(opcode: u8) -> RvnError {
    RvnError::InvalidUnlockData(format!("truncated push after opcode 0x{opcode:02x}"))
}

/// Recover signature and public key from a P2PKH scriptSig.
pub fn parse_script_sig(script_sig: &[u8]) -> Result<UnlockData, RvnError> {
    let pushes = parse_pushes(script_sig)?;
    unlock_from_items(&pushes, "scriptSig")
}

/// Recover signature and public key from a P2WPKH witness stack.
pub fn parse_witness(witness: &[Vec<u8>]) -> Result<UnlockData, RvnError> {
    unlock_from_items(witness, "witness")
}

fn unlock_from_items(items: &[Vec<u8>], source: &str) -> Result<UnlockData, RvnError> {
    match items {
        [signature, public_key] => {
            if signature.is_empty() {
                return Err(RvnError::InvalidUnlockData(format!(
                    "{source} carries an empty signature"
                )));
            }
            if public_key.len() != 33 && public_key.len() != 65 {
                return Err(RvnError::InvalidUnlockData(format!(
                    "{source} public key has length {}",
                    public_key.len()
                )));
            }
            Ok(UnlockData {
                signature: signature.clone(),
                public_key: public_key.clone(),
            })
        }
        _ => Err(RvnError::InvalidUnlockData(format!(
            "{source} must hold exactly 2 items, found {}",
            items.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RvnNetwork;

    #[test]
    fn p2pkh_script_format() {
        let hash = [0x42; 20];
        let script = p2pkh_script(&hash);
        assert_eq!(script.len(), 25);
        assert_eq!(script[0], 0x76); // OP_DUP
        assert_eq!(script[1], 0xA9); // OP_HASH160
        assert_eq!(script[2], 0x14); // Push 20
        assert_eq!(&script[3..23], &hash);
        assert_eq!(script[23], 0x88); // OP_EQUALVERIFY
        assert_eq!(script[24], 0xAC); // OP_CHECKSIG
    }

    #[test]
    fn p2wpkh_script_format() {
        let hash = [0x42; 20];
        let script = p2wpkh_script(&hash);
        assert_eq!(script.len(), 22);
        assert_eq!(&script[..2], &[0x00, 0x14]);
        assert_eq!(&script[2..], &hash);
    }

    #[test]
    fn classify_recovers_kind_and_hash() {
        let hash = [0x07; 20];
        assert_eq!(
            classify(&p2pkh_script(&hash)).unwrap(),
            (ScriptKind::PayToPubkeyHash, hash)
        );
        assert_eq!(
            classify(&p2wpkh_script(&hash)).unwrap(),
            (ScriptKind::PayToWitnessPubkeyHash, hash)
        );
    }

    #[test]
    fn decode_witness_script_testnet() {
        let params = RvnNetwork::Testnet.params();
        let decoded =
            decode_script("0014c005b00ad075d30b89a7b65b7dad8899ba6a9c55", &params).unwrap();
        assert_eq!(decoded.kind, ScriptKind::PayToWitnessPubkeyHash);
        assert_eq!(decoded.required_sigs, 1);
        assert_eq!(
            decoded.addresses,
            vec!["tb1qcqzmqzkswhfshzd8kedhmtvgnxax48z4fklhvm".to_string()]
        );
    }

    #[test]
    fn decode_p2pkh_script_testnet() {
        let params = RvnNetwork::Testnet.params();
        let decoded = decode_script(
            "76a914c005b00ad075d30b89a7b65b7dad8899ba6a9c5588ac",
            &params,
        )
        .unwrap();
        assert_eq!(decoded.kind, ScriptKind::PayToPubkeyHash);
        assert_eq!(
            decoded.addresses,
            vec!["my2Gr56HqNx2Z7QGtpw474g28ZS8rxB7Hj".to_string()]
        );
    }

    #[test]
    fn decode_rejects_multisig() {
        let params = RvnNetwork::Mainnet.params();
        // OP_1 <33-byte key> OP_1 OP_CHECKMULTISIG
        let script = format!("5121{}51ae", "02".repeat(33));
        match decode_script(&script, &params) {
            Err(RvnError::UnsupportedScriptType(name)) => assert_eq!(name, "multisig"),
            other => panic!("expected UnsupportedScriptType, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_scripthash() {
        let params = RvnNetwork::Mainnet.params();
        let script = format!("a914{}87", "11".repeat(20));
        match decode_script(&script, &params) {
            Err(RvnError::UnsupportedScriptType(name)) => assert_eq!(name, "scripthash"),
            other => panic!("expected UnsupportedScriptType, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_bare_pubkey() {
        let params = RvnNetwork::Mainnet.params();
        let script = format!("21{}ac", "02".repeat(33));
        assert!(matches!(
            decode_script(&script, &params),
            Err(RvnError::UnsupportedScriptType(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_hex() {
        let params = RvnNetwork::Mainnet.params();
        assert!(matches!(
            decode_script("zz", &params),
            Err(RvnError::Decode(_))
        ));
    }

    #[test]
    fn script_sig_roundtrip() {
        let sig = vec![0x30; 71];
        let pubkey = vec![0x02; 33];
        let script_sig = build_script_sig(&sig, &pubkey);
        assert_eq!(script_sig[0], 71);
        assert_eq!(script_sig[72], 33);

        let unlock = parse_script_sig(&script_sig).unwrap();
        assert_eq!(unlock.signature, sig);
        assert_eq!(unlock.public_key, pubkey);
    }

    #[test]
    fn push_data_uses_pushdata1_for_long_items() {
        let mut script = Vec::new();
        push_data(&mut script, &[0xaa; 80]);
        assert_eq!(&script[..2], &[OP_PUSHDATA1, 80]);
        assert_eq!(parse_pushes(&script).unwrap(), vec![vec![0xaa; 80]]);
    }

    #[test]
    fn parse_pushes_rejects_opcodes() {
        assert!(parse_pushes(&[OP_DUP]).is_err());
    }

    #[test]
    fn parse_pushes_rejects_truncated_data() {
        assert!(parse_pushes(&[0x05, 0x01, 0x02]).is_err());
    }

    #[test]
    fn witness_requires_two_items() {
        assert!(parse_witness(&[vec![0x30; 71]]).is_err());
        let unlock = parse_witness(&build_witness(&[0x30; 71], &[0x03; 33])).unwrap();
        assert_eq!(unlock.public_key, vec![0x03; 33]);
    }

    #[test]
    fn unlock_rejects_odd_pubkey_length() {
        assert!(parse_witness(&[vec![0x30; 71], vec![0x02; 20]]).is_err());
    }

    #[test]
    fn node_type_names() {
        assert_eq!(ScriptKind::PayToPubkeyHash.node_type(), "pubkeyhash");
        assert_eq!(
            ScriptKind::PayToWitnessPubkeyHash.node_type(),
            "witness_v0_keyhash"
        );
    }
}
