/// Satoshis in one RVN.
pub const SATOSHIS_PER_COIN: f64 = 100_000_000.0;

/// Fee rates from the node are quoted per kB.
pub const BYTES_PER_KB: f64 = 1_000.0;

/// Fixed transaction overhead (in bytes): version(4) + input count(1) +
/// output count(1) + locktime(4).
const TX_OVERHEAD_BYTES: u64 = 10;

/// Segwit marker and flag bytes, present once any input carries a witness.
const WITNESS_FLAG_BYTES: u64 = 2;

/// Estimated size of a P2PKH input (in bytes).
/// Breakdown: outpoint(36) + script length(1) + scriptSig(~107) + sequence(4).
pub const LEGACY_INPUT_BYTES: u64 = 148;

/// Estimated virtual size of a P2WPKH input (in vbytes).
/// Breakdown: 41 bytes non-witness + ~107 witness bytes / 4 = ~68 vbytes.
pub const WITNESS_INPUT_VBYTES: u64 = 68;

/// Estimated size of an output (in bytes): value(8) + script length(1) + script(22).
pub const OUTPUT_BYTES: u64 = 31;

/// Estimate the serialized size of a transaction from its shape.
pub fn estimate_size(num_legacy_inputs: usize, num_witness_inputs: usize, num_outputs: usize) -> u64 {
    let witness_overhead = if num_witness_inputs > 0 {
        WITNESS_FLAG_BYTES
    } else {
        0
    };
    TX_OVERHEAD_BYTES
        + witness_overhead
        + (num_legacy_inputs as u64 * LEGACY_INPUT_BYTES)
        + (num_witness_inputs as u64 * WITNESS_INPUT_VBYTES)
        + (num_outputs as u64 * OUTPUT_BYTES)
}

/// Compute the fee in satoshis for a transaction of `size` bytes.
///
/// Rates are in coins per kB. The result is
/// `max(min_fee_rate * size, fee_rate * size * multiplier)`, so neither a low
/// multiplier nor a low (or negative) node estimate can push the fee below
/// the minimum relay rate.
pub fn compute_fee(fee_rate: f64, min_fee_rate: f64, size: u64, multiplier: f64) -> u64 {
    let floor = satoshis_per_byte(min_fee_rate) * size as f64;
    let scaled = satoshis_per_byte(fee_rate * multiplier) * size as f64;
    floor.max(scaled) as u64
}

fn satoshis_per_byte(rate_per_kb: f64) -> f64 {
    rate_per_kb * SATOSHIS_PER_COIN / BYTES_PER_KB
}
