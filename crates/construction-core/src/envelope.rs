//! Construction envelopes: the raw transaction plus the per-input context
//! (spent amounts, locking scripts, owners) that later phases need without
//! querying the chain again. On the wire an envelope is hex-encoded JSON.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;
use crate::types::{BlockReference, ScriptPubKey};

/// Caller-assigned operation indices, one per input and one per output in
/// transaction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIndices {
    pub inputs: Vec<u64>,
    pub outputs: Vec<u64>,
}

impl OperationIndices {
    /// Index of the operation behind input `position`. Envelopes without
    /// recorded indices number inputs from zero.
    pub fn input(indices: Option<&Self>, position: usize) -> u64 {
        indices
            .map(|recorded| recorded.inputs[position])
            .unwrap_or(position as u64)
    }

    /// Index of the operation behind output `position`. Without recorded
    /// indices outputs follow the inputs.
    pub fn output(indices: Option<&Self>, input_count: usize, position: usize) -> u64 {
        indices
            .map(|recorded| recorded.outputs[position])
            .unwrap_or((input_count + position) as u64)
    }

    fn validate(&self, input_count: usize, output_count: usize) -> Result<(), ConstructionError> {
        check_len("operation_indices.inputs", self.inputs.len(), input_count)?;
        if self.outputs.len() != output_count {
            return Err(ConstructionError::EncodingError(format!(
                "envelope operation_indices.outputs has {} entries for {output_count} outputs",
                self.outputs.len()
            )));
        }
        let mut seen = HashSet::new();
        for index in self.inputs.iter().chain(&self.outputs) {
            if !seen.insert(*index) {
                return Err(ConstructionError::EncodingError(format!(
                    "envelope repeats operation index {index}"
                )));
            }
        }
        Ok(())
    }
}

/// Output of Payloads, input of Combine and unsigned Parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEnvelope {
    /// Hex of the unsigned wire transaction.
    pub transaction: String,
    pub scripts: Vec<ScriptPubKey>,
    /// Spent amounts as negative decimal strings, one per input.
    pub input_amounts: Vec<String>,
    pub input_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_protection: Option<BlockReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_indices: Option<OperationIndices>,
}

/// Output of Combine, input of signed Parse, Hash and Submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Hex of the signed wire transaction, witness segment included.
    pub transaction: String,
    pub input_amounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_protection: Option<BlockReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_indices: Option<OperationIndices>,
}

/// Checks that per-input and per-output side lists line up with the
/// transaction.
pub trait Envelope {
    fn validate(&self, input_count: usize, output_count: usize) -> Result<(), ConstructionError>;
}

impl Envelope for UnsignedEnvelope {
    fn validate(&self, input_count: usize, output_count: usize) -> Result<(), ConstructionError> {
        check_len("input_amounts", self.input_amounts.len(), input_count)?;
        check_len("scripts", self.scripts.len(), input_count)?;
        check_len("input_addresses", self.input_addresses.len(), input_count)?;
        match &self.operation_indices {
            Some(indices) => indices.validate(input_count, output_count),
            None => Ok(()),
        }
    }
}

impl Envelope for SignedEnvelope {
    fn validate(&self, input_count: usize, output_count: usize) -> Result<(), ConstructionError> {
        check_len("input_amounts", self.input_amounts.len(), input_count)?;
        match &self.operation_indices {
            Some(indices) => indices.validate(input_count, output_count),
            None => Ok(()),
        }
    }
}

fn check_len(field: &str, actual: usize, expected: usize) -> Result<(), ConstructionError> {
    if actual != expected {
        return Err(ConstructionError::EncodingError(format!(
            "envelope {field} has {actual} entries for {expected} inputs"
        )));
    }
    Ok(())
}

/// Encode an envelope as hex of its JSON form.
pub fn serialize_envelope<T: Serialize>(envelope: &T) -> Result<String, ConstructionError> {
    Ok(hex::encode(serde_json::to_vec(envelope)?))
}

/// Decode a hex-encoded JSON envelope.
pub fn deserialize_envelope<T: DeserializeOwned>(raw: &str) -> Result<T, ConstructionError> {
    let bytes = hex::decode(raw.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}
