use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::RvnError;

/// Compute Hash160 (RIPEMD-160(SHA-256(data))), the key hash behind both
/// supported script templates.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Parse a hex txid string (big-endian display) to internal byte order (little-endian).
pub fn parse_txid(txid_hex: &str) -> Result<[u8; 32], RvnError> {
    let bytes =
        hex::decode(txid_hex).map_err(|e| RvnError::InvalidTxid(format!("invalid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(RvnError::InvalidTxid(format!(
            "txid must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut result = [0u8; 32];
    for (i, &b) in bytes.iter().rev().enumerate() {
        result[i] = b;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_known_pubkey() {
        let pubkey =
            hex::decode("0325c9a4252789b31dbb3454ec647e9516e7c596bcde2bd5da71a60fab8644e438")
                .unwrap();
        assert_eq!(
            hex::encode(hash160(&pubkey)),
            "c005b00ad075d30b89a7b65b7dad8899ba6a9c55"
        );
    }

    #[test]
    fn parse_txid_reverses_bytes() {
        let hex = "0100000000000000000000000000000000000000000000000000000000000002";
        let result = parse_txid(hex).unwrap();
        assert_eq!(result[0], 0x02);
        assert_eq!(result[31], 0x01);
    }

    #[test]
    fn parse_txid_matches_bitcoin_display_order() {
        let hex = "b14157a5c50503c8cd202a173613dd27e0027343c3d50cf85852dd020bf59c7f";
        let txid: bitcoin::Txid = hex.parse().unwrap();
        assert_eq!(parse_txid(hex).unwrap(), bitcoin::hashes::Hash::to_byte_array(txid));
    }

    #[test]
    fn parse_txid_invalid_hex() {
        assert!(parse_txid("not_hex").is_err());
    }

    #[test]
    fn parse_txid_wrong_length() {
        assert!(parse_txid("0102").is_err());
    }
}
