//! Ravencoin chain support for the construction engine.
//!
//! Provides P2PKH and P2WPKH address handling, the UTXO transaction wire
//! codec, legacy and BIP143-style signature hashing, and transaction size and
//! fee estimation.

pub mod address;
pub mod error;
pub mod fee;
pub mod hash;
pub mod network;
pub mod script;
pub mod sighash;
pub mod transaction;
