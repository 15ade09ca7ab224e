use std::collections::HashSet;
use std::time::Duration;

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use tracing::{debug, info, warn};

use chain_rvn::address::{
    self, address_to_script, decode_address, pubkey_hash, pushed_key_address, script_to_address,
};
use chain_rvn::fee::{compute_fee, estimate_size};
use chain_rvn::network::NetworkParams;
use chain_rvn::script;
use chain_rvn::sighash::{signature_hash, SIGHASH_ALL};
use chain_rvn::transaction::{self, Transaction};

use crate::collaborators::{Client, Indexer};
use crate::config::{ConstructionConfig, Mode};
use crate::envelope::{
    deserialize_envelope, serialize_envelope, Envelope, OperationIndices, SignedEnvelope,
    UnsignedEnvelope,
};
use crate::error::ConstructionError;
use crate::types::{
    AccountIdentifier, Amount, BlockReference, Coin, CoinAction, CoinChange, CoinIdentifier,
    ConstructionMetadata, ConstructionOptions, Currency, CurveType, MetadataResponse, Operation,
    OperationIdentifier, OperationType, ParseResponse, PayloadsResponse, PublicKey,
    ResolvedCoin, ScriptPubKey, Signature, SignatureType, SigningPayload,
    TransactionIdentifier,
};

/// Compact ECDSA signature length: r (32) + s (32).
const COMPACT_SIGNATURE_LEN: usize = 64;

/// The eight-phase transaction construction pipeline.
///
/// Every phase takes its inputs explicitly and returns fresh values; the
/// engine holds only immutable configuration and its collaborators, so one
/// instance can serve concurrent requests.
pub struct ConstructionEngine<I, C> {
    config: ConstructionConfig,
    params: NetworkParams,
    currency: Currency,
    indexer: I,
    client: C,
}

/// A validated INPUT operation.
#[derive(Debug, Clone)]
struct SpendIntent {
    index: u64,
    coin: CoinIdentifier,
    prev_txid: [u8; 32],
    prev_vout: u32,
    address: String,
    value: u64,
}

/// A validated OUTPUT operation.
#[derive(Debug, Clone)]
struct PayIntent {
    index: u64,
    address: String,
    value: u64,
}

#[derive(Debug)]
struct Intent {
    spends: Vec<SpendIntent>,
    pays: Vec<PayIntent>,
}

impl<I: Indexer, C: Client> ConstructionEngine<I, C> {
    pub fn new(config: ConstructionConfig, indexer: I, client: C) -> Self {
        let params = config.network.params();
        Self::with_params(config, params, indexer, client)
    }

    /// Build an engine over explicit chain parameters instead of the ones
    /// named by `config.network`.
    pub fn with_params(
        config: ConstructionConfig,
        params: NetworkParams,
        indexer: I,
        client: C,
    ) -> Self {
        let currency = Currency::for_network(&params);
        Self {
            config,
            params,
            currency,
            indexer,
            client,
        }
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn indexer(&self) -> &I {
        &self.indexer
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Timeout for collaborator calls when the caller has none of its own.
    pub fn default_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    // ─── Derive ──────────────────────────────────────────────────────

    /// Address of `public_key` under the configured default template.
    pub fn derive(&self, public_key: &PublicKey) -> Result<AccountIdentifier, ConstructionError> {
        let bytes = parse_public_key(public_key)?;
        let address =
            address::pubkey_to_address(&bytes, self.config.default_address_kind, &self.params)?;
        debug!(%address, "derived address");
        Ok(AccountIdentifier::new(address))
    }

    // ─── Preprocess ──────────────────────────────────────────────────

    /// Collect the coins to spend and estimate the transaction size.
    ///
    /// Inputs whose account is a witness address are sized as witness
    /// inputs; everything else is assumed legacy until Metadata resolves
    /// the real scripts.
    pub fn preprocess(
        &self,
        operations: &[Operation],
        fee_multiplier: Option<f64>,
    ) -> Result<ConstructionOptions, ConstructionError> {
        if let Some(multiplier) = fee_multiplier {
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(ConstructionError::InvalidInput(format!(
                    "fee multiplier must be a non-negative number, got {multiplier}"
                )));
            }
        }

        let intent = self.parse_intent(operations)?;

        let mut witness_inputs = 0;
        for spend in &intent.spends {
            let (kind, _) = decode_address(&spend.address, &self.params)?;
            if kind.is_witness() {
                witness_inputs += 1;
            }
        }
        let legacy_inputs = intent.spends.len() - witness_inputs;
        let estimated_size = estimate_size(legacy_inputs, witness_inputs, intent.pays.len());

        let coins = intent
            .spends
            .iter()
            .map(|spend| Coin {
                coin_identifier: spend.coin.clone(),
                amount: self.spent_amount(spend.value),
            })
            .collect();

        debug!(
            inputs = intent.spends.len(),
            outputs = intent.pays.len(),
            estimated_size,
            "preprocessed operations"
        );

        Ok(ConstructionOptions {
            coins,
            estimated_size,
            output_count: intent.pays.len(),
            fee_multiplier,
        })
    }

    // ─── Metadata ────────────────────────────────────────────────────

    /// Resolve coin scripts, pin a replay-protection block and suggest a fee.
    ///
    /// All collaborator calls share the single `timeout`; if any of them
    /// fails or the bound elapses nothing is returned.
    #[tracing::instrument(skip_all, fields(coins = options.coins.len()))]
    pub async fn metadata(
        &self,
        options: &ConstructionOptions,
        timeout: Duration,
    ) -> Result<MetadataResponse, ConstructionError> {
        if self.config.mode == Mode::Offline {
            return Err(ConstructionError::UnavailableOffline("metadata"));
        }
        self.validate_options(options)?;

        let (scripts, replay_protection, fee_rate) =
            tokio::time::timeout(timeout, self.fetch_chain_state(options))
                .await
                .map_err(|_| {
                    warn!(?timeout, "metadata collaborators timed out");
                    ConstructionError::ExternalUnavailable(format!(
                        "metadata timed out after {timeout:?}"
                    ))
                })??;

        if scripts.len() != options.coins.len() {
            return Err(ConstructionError::ExternalUnavailable(format!(
                "indexer returned {} scripts for {} coins",
                scripts.len(),
                options.coins.len()
            )));
        }

        let mut coins = Vec::with_capacity(scripts.len());
        let mut witness_inputs = 0;
        for (coin, mut script_pub_key) in options.coins.iter().zip(scripts) {
            let decoded = script::decode_script(&script_pub_key.hex, &self.params)?;
            let kind = decoded.kind;
            if script_pub_key.script_type.is_empty() {
                script_pub_key.script_type = kind.node_type().to_string();
            }
            if script_pub_key.required_sigs == 0 {
                script_pub_key.required_sigs = decoded.required_sigs;
            }
            if script_pub_key.addresses.is_empty() {
                script_pub_key.addresses = decoded.addresses;
            }
            if kind.is_witness() {
                witness_inputs += 1;
            }
            coins.push(ResolvedCoin {
                coin: coin.clone(),
                kind,
                script_pub_key,
            });
        }

        let size = estimate_size(
            coins.len() - witness_inputs,
            witness_inputs,
            options.output_count,
        );
        let multiplier = options.fee_multiplier.unwrap_or(1.0);
        let fee = compute_fee(fee_rate, self.params.min_fee_rate, size, multiplier);

        info!(
            size,
            fee,
            fee_rate,
            height = replay_protection.height,
            "computed suggested fee"
        );

        Ok(MetadataResponse {
            metadata: ConstructionMetadata {
                coins,
                replay_protection,
            },
            suggested_fee: vec![Amount {
                value: fee.to_string(),
                currency: self.currency.clone(),
            }],
        })
    }

    async fn fetch_chain_state(
        &self,
        options: &ConstructionOptions,
    ) -> Result<(Vec<ScriptPubKey>, BlockReference, f64), ConstructionError> {
        let scripts = self.indexer.get_script_pub_keys(&options.coins).await?;

        let tip = self.client.get_best_block().await?;
        let height = tip.saturating_sub(self.config.replay_protection_depth).max(0);
        let hash = self.client.get_hash_from_index(height).await?;

        let fee_rate = self
            .client
            .suggested_fee_rate(self.config.confirmation_target)
            .await?;

        debug!(tip, height, fee_rate, "fetched chain state");
        Ok((scripts, BlockReference { height, hash }, fee_rate))
    }

    fn validate_options(&self, options: &ConstructionOptions) -> Result<(), ConstructionError> {
        if options.coins.is_empty() {
            return Err(ConstructionError::InvalidInput("options carry no coins".into()));
        }
        if options.output_count == 0 {
            return Err(ConstructionError::InvalidInput("options carry no outputs".into()));
        }
        for coin in &options.coins {
            coin.coin_identifier.outpoint()?;
            self.check_currency(&coin.amount)?;
        }
        if let Some(multiplier) = options.fee_multiplier {
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(ConstructionError::InvalidInput(format!(
                    "fee multiplier must be a non-negative number, got {multiplier}"
                )));
            }
        }
        Ok(())
    }

    // ─── Payloads ────────────────────────────────────────────────────

    /// Build the unsigned transaction and one signing payload per input.
    pub fn payloads(
        &self,
        operations: &[Operation],
        metadata: &ConstructionMetadata,
    ) -> Result<PayloadsResponse, ConstructionError> {
        let intent = self.parse_intent(operations)?;
        if metadata.coins.len() != intent.spends.len() {
            return Err(ConstructionError::InvalidInput(format!(
                "metadata resolves {} coins for {} inputs",
                metadata.coins.len(),
                intent.spends.len()
            )));
        }

        let mut locking_scripts = Vec::with_capacity(intent.spends.len());
        for (spend, resolved) in intent.spends.iter().zip(&metadata.coins) {
            locking_scripts.push(self.check_resolved_coin(spend, resolved)?);
        }

        let mut outputs = Vec::with_capacity(intent.pays.len());
        for pay in &intent.pays {
            let (_, script_pubkey) = address_to_script(&pay.address, &self.params)?;
            outputs.push(transaction::output(pay.value, script_pubkey));
        }

        let inputs = intent
            .spends
            .iter()
            .map(|spend| transaction::unsigned_input(spend.prev_txid, spend.prev_vout))
            .collect();
        let tx = transaction::build_unsigned(inputs, outputs);

        let mut payloads = Vec::with_capacity(intent.spends.len());
        for (index, (spend, script)) in intent.spends.iter().zip(&locking_scripts).enumerate() {
            let digest = signature_hash(&tx, index, script, spend.value)?;
            payloads.push(SigningPayload {
                account_identifier: AccountIdentifier::new(spend.address.clone()),
                hex_bytes: hex::encode(digest),
                signature_type: SignatureType::Ecdsa,
            });
        }

        let envelope = UnsignedEnvelope {
            transaction: hex::encode(transaction::serialize(&tx, false)),
            scripts: metadata
                .coins
                .iter()
                .map(|resolved| resolved.script_pub_key.clone())
                .collect(),
            input_amounts: intent
                .spends
                .iter()
                .map(|spend| negate(spend.value))
                .collect(),
            input_addresses: intent
                .spends
                .iter()
                .map(|spend| spend.address.clone())
                .collect(),
            replay_protection: Some(metadata.replay_protection.clone()),
            operation_indices: Some(OperationIndices {
                inputs: intent.spends.iter().map(|spend| spend.index).collect(),
                outputs: intent.pays.iter().map(|pay| pay.index).collect(),
            }),
        };

        debug!(
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            "built unsigned transaction"
        );

        Ok(PayloadsResponse {
            unsigned_transaction: serialize_envelope(&envelope)?,
            payloads,
        })
    }

    /// Check that a resolved coin belongs to the spend it is paired with and
    /// return its locking script.
    fn check_resolved_coin(
        &self,
        spend: &SpendIntent,
        resolved: &ResolvedCoin,
    ) -> Result<Vec<u8>, ConstructionError> {
        if resolved.coin.coin_identifier != spend.coin {
            return Err(ConstructionError::InvalidInput(format!(
                "metadata coin {} does not match operation coin {}",
                resolved.coin.coin_identifier.identifier, spend.coin.identifier
            )));
        }

        let script_bytes = hex::decode(&resolved.script_pub_key.hex)?;
        let (kind, hash) = script::classify(&script_bytes)?;
        if kind != resolved.kind {
            return Err(ConstructionError::InvalidInput(format!(
                "coin {} is labelled {:?} but its script is {:?}",
                spend.coin.identifier, resolved.kind, kind
            )));
        }

        let owner = decode_address(&spend.address, &self.params)?;
        if owner != (kind, hash) {
            return Err(ConstructionError::InvalidInput(format!(
                "account {} does not own coin {}",
                spend.address, spend.coin.identifier
            )));
        }
        Ok(script_bytes)
    }

    // ─── Parse ───────────────────────────────────────────────────────

    /// Recover the operations (and, for signed transactions, the signers)
    /// from an envelope produced by Payloads or Combine.
    ///
    /// Operations keep the indices the caller gave them and are returned in
    /// index order.
    pub fn parse(&self, transaction: &str, signed: bool) -> Result<ParseResponse, ConstructionError> {
        let (tx, input_amounts, input_addresses, indices) = if signed {
            let envelope: SignedEnvelope = deserialize_envelope(transaction)?;
            let tx = decode_transaction(&envelope.transaction)?;
            envelope.validate(tx.input.len(), tx.output.len())?;
            let addresses = self.signer_addresses(&tx)?;
            (tx, envelope.input_amounts, addresses, envelope.operation_indices)
        } else {
            let envelope: UnsignedEnvelope = deserialize_envelope(transaction)?;
            let tx = decode_transaction(&envelope.transaction)?;
            envelope.validate(tx.input.len(), tx.output.len())?;
            ensure_unsigned(&tx)?;
            (
                tx,
                envelope.input_amounts,
                envelope.input_addresses,
                envelope.operation_indices,
            )
        };

        let input_count = tx.input.len();
        let mut operations = Vec::with_capacity(input_count + tx.output.len());

        for (position, (input, address)) in tx.input.iter().zip(&input_addresses).enumerate() {
            let value = parse_spent_amount(&input_amounts[position], position)?;
            operations.push(Operation {
                operation_identifier: OperationIdentifier {
                    index: OperationIndices::input(indices.as_ref(), position),
                    network_index: Some(position as u64),
                },
                op_type: OperationType::Input,
                account: Some(AccountIdentifier::new(address.clone())),
                amount: Some(Amount::new(value, self.currency.clone())),
                coin_change: Some(CoinChange {
                    coin_identifier: CoinIdentifier::from_outpoint(
                        &input.previous_output.txid.to_string(),
                        input.previous_output.vout,
                    ),
                    coin_action: CoinAction::CoinSpent,
                }),
            });
        }

        for (position, output) in tx.output.iter().enumerate() {
            let sats = output.value.to_sat();
            let value = i64::try_from(sats).map_err(|_| {
                ConstructionError::EncodingError(format!("output {position} value {sats} overflows"))
            })?;
            operations.push(Operation {
                operation_identifier: OperationIdentifier {
                    index: OperationIndices::output(indices.as_ref(), input_count, position),
                    network_index: Some(position as u64),
                },
                op_type: OperationType::Output,
                account: Some(AccountIdentifier::new(script_to_address(
                    output.script_pubkey.as_bytes(),
                    &self.params,
                )?)),
                amount: Some(Amount::new(value, self.currency.clone())),
                coin_change: None,
            });
        }
        operations.sort_by_key(|op| op.operation_identifier.index);

        let account_identifier_signers = if signed {
            let mut seen = HashSet::new();
            input_addresses
                .into_iter()
                .filter(|address| seen.insert(address.clone()))
                .map(AccountIdentifier::new)
                .collect()
        } else {
            Vec::new()
        };

        Ok(ParseResponse {
            operations,
            account_identifier_signers,
        })
    }

    /// Address of the key that unlocks each input.
    fn signer_addresses(&self, tx: &Transaction) -> Result<Vec<String>, ConstructionError> {
        tx.input
            .iter()
            .enumerate()
            .map(|(index, input)| -> Result<String, ConstructionError> {
                let (kind, unlock) = transaction::unlock_data(input)?.ok_or_else(|| {
                    ConstructionError::SignatureInvalid(format!(
                        "input {index} carries no unlock data"
                    ))
                })?;
                Ok(pushed_key_address(&unlock.public_key, kind, &self.params)?)
            })
            .collect()
    }

    // ─── Combine ─────────────────────────────────────────────────────

    /// Attach verified signatures to an unsigned envelope.
    ///
    /// Signatures must answer the payloads in input order. Each is checked
    /// against the recomputed digest and the spent script's key hash before
    /// it is placed in a scriptSig or witness stack.
    pub fn combine(
        &self,
        unsigned_transaction: &str,
        signatures: &[Signature],
    ) -> Result<String, ConstructionError> {
        let envelope: UnsignedEnvelope = deserialize_envelope(unsigned_transaction)?;
        let mut tx = decode_transaction(&envelope.transaction)?;
        envelope.validate(tx.input.len(), tx.output.len())?;
        ensure_unsigned(&tx)?;

        if signatures.len() != tx.input.len() {
            return Err(ConstructionError::SignatureCountMismatch(format!(
                "{} signatures for {} inputs",
                signatures.len(),
                tx.input.len()
            )));
        }

        let mut unlocks = Vec::with_capacity(signatures.len());
        for (index, signature) in signatures.iter().enumerate() {
            let script_bytes = hex::decode(&envelope.scripts[index].hex)?;
            let (kind, hash) = script::classify(&script_bytes)?;
            let amount = parse_spent_amount(&envelope.input_amounts[index], index)?;
            let digest = signature_hash(&tx, index, &script_bytes, amount.unsigned_abs())?;

            if !signature
                .signing_payload
                .hex_bytes
                .eq_ignore_ascii_case(&hex::encode(digest))
            {
                return Err(ConstructionError::SignatureCountMismatch(format!(
                    "signature {index} answers a different payload"
                )));
            }

            let (sig_bytes, public_key) = verify_signature(signature, &digest, &hash, index)?;
            unlocks.push((kind, sig_bytes, public_key));
        }

        for (input, (kind, sig_bytes, public_key)) in tx.input.iter_mut().zip(unlocks) {
            transaction::attach_unlock(input, kind, &sig_bytes, &public_key);
        }

        info!(
            inputs = tx.input.len(),
            segwit = transaction::has_witness(&tx),
            "combined signatures"
        );

        serialize_envelope(&SignedEnvelope {
            transaction: hex::encode(transaction::serialize(&tx, true)),
            input_amounts: envelope.input_amounts,
            replay_protection: envelope.replay_protection,
            operation_indices: envelope.operation_indices,
        })
    }

    // ─── Hash ────────────────────────────────────────────────────────

    /// Witness-agnostic identifier of a signed transaction.
    pub fn hash(&self, signed_transaction: &str) -> Result<TransactionIdentifier, ConstructionError> {
        let envelope: SignedEnvelope = deserialize_envelope(signed_transaction)?;
        let tx = decode_transaction(&envelope.transaction)?;
        Ok(TransactionIdentifier {
            hash: transaction::txid_hex(&tx),
        })
    }

    // ─── Submit ──────────────────────────────────────────────────────

    /// Broadcast the signed transaction and return the node's txid.
    #[tracing::instrument(skip_all)]
    pub async fn submit(
        &self,
        signed_transaction: &str,
        timeout: Duration,
    ) -> Result<TransactionIdentifier, ConstructionError> {
        if self.config.mode == Mode::Offline {
            return Err(ConstructionError::UnavailableOffline("submit"));
        }

        let envelope: SignedEnvelope = deserialize_envelope(signed_transaction)?;
        decode_transaction(&envelope.transaction)?;

        let hash = tokio::time::timeout(
            timeout,
            self.client.send_raw_transaction(&envelope.transaction),
        )
        .await
        .map_err(|_| {
            ConstructionError::ExternalUnavailable(format!(
                "broadcast timed out after {timeout:?}"
            ))
        })?
        .map_err(|e| {
            warn!(error = %e, "broadcast failed");
            ConstructionError::from(e)
        })?;

        info!(%hash, "transaction submitted");
        Ok(TransactionIdentifier { hash })
    }

    // ─── Shared helpers ──────────────────────────────────────────────

    /// Validate an operation list and split it into spends and payments,
    /// each ordered by operation index.
    fn parse_intent(&self, operations: &[Operation]) -> Result<Intent, ConstructionError> {
        if operations.is_empty() {
            return Err(ConstructionError::InvalidInput("no operations".into()));
        }

        let mut ordered: Vec<&Operation> = operations.iter().collect();
        ordered.sort_by_key(|op| op.operation_identifier.index);
        for pair in ordered.windows(2) {
            if pair[0].operation_identifier.index == pair[1].operation_identifier.index {
                return Err(ConstructionError::InvalidInput(format!(
                    "duplicate operation index {}",
                    pair[0].operation_identifier.index
                )));
            }
        }

        let mut spends = Vec::new();
        let mut pays = Vec::new();
        let mut seen_coins = HashSet::new();

        for op in ordered {
            let index = op.operation_identifier.index;
            let address = op
                .account
                .as_ref()
                .map(|account| account.address.clone())
                .ok_or_else(|| {
                    ConstructionError::InvalidInput(format!("operation {index} has no account"))
                })?;
            let amount = op.amount.as_ref().ok_or_else(|| {
                ConstructionError::InvalidInput(format!("operation {index} has no amount"))
            })?;
            self.check_currency(amount)?;
            let value = amount.parse_value()?;

            match op.op_type {
                OperationType::Input => {
                    let change = op
                        .coin_change
                        .as_ref()
                        .ok_or(ConstructionError::MissingCoinReference(index))?;
                    if change.coin_action != CoinAction::CoinSpent {
                        return Err(ConstructionError::InvalidInput(format!(
                            "input operation {index} must spend its coin"
                        )));
                    }
                    if value >= 0 {
                        return Err(ConstructionError::InvalidInput(format!(
                            "input operation {index} amount must be negative, got {value}"
                        )));
                    }
                    if !seen_coins.insert(change.coin_identifier.identifier.clone()) {
                        return Err(ConstructionError::InvalidInput(format!(
                            "coin {} is spent twice",
                            change.coin_identifier.identifier
                        )));
                    }
                    let (prev_txid, prev_vout) = change.coin_identifier.outpoint()?;
                    spends.push(SpendIntent {
                        index,
                        coin: change.coin_identifier.clone(),
                        prev_txid,
                        prev_vout,
                        address,
                        value: value.unsigned_abs(),
                    });
                }
                OperationType::Output => {
                    if value <= 0 {
                        return Err(ConstructionError::InvalidInput(format!(
                            "output operation {index} amount must be positive, got {value}"
                        )));
                    }
                    pays.push(PayIntent {
                        index,
                        address,
                        value: value.unsigned_abs(),
                    });
                }
            }
        }

        if spends.is_empty() {
            return Err(ConstructionError::InvalidInput("no input operations".into()));
        }
        if pays.is_empty() {
            return Err(ConstructionError::InvalidInput("no output operations".into()));
        }

        let total_in: u128 = spends.iter().map(|s| s.value as u128).sum();
        let total_out: u128 = pays.iter().map(|p| p.value as u128).sum();
        if total_out > total_in {
            return Err(ConstructionError::InvalidInput(format!(
                "outputs total {total_out} exceeds inputs total {total_in}"
            )));
        }

        Ok(Intent { spends, pays })
    }

    fn check_currency(&self, amount: &Amount) -> Result<(), ConstructionError> {
        if amount.currency != self.currency {
            return Err(ConstructionError::InvalidInput(format!(
                "currency {}/{} is not {}/{}",
                amount.currency.symbol,
                amount.currency.decimals,
                self.currency.symbol,
                self.currency.decimals
            )));
        }
        Ok(())
    }

    fn spent_amount(&self, value: u64) -> Amount {
        Amount {
            value: negate(value),
            currency: self.currency.clone(),
        }
    }
}

fn negate(value: u64) -> String {
    format!("-{value}")
}

/// Hex public key bytes, rejecting curves other than secp256k1.
fn parse_public_key(public_key: &PublicKey) -> Result<Vec<u8>, ConstructionError> {
    if public_key.curve_type != CurveType::Secp256k1 {
        return Err(ConstructionError::InvalidCurveType(format!(
            "{:?} is not supported",
            public_key.curve_type
        )));
    }
    hex::decode(&public_key.hex_bytes)
        .map_err(|e| ConstructionError::InvalidPublicKey(format!("invalid hex: {e}")))
}

/// Check one compact signature and return (DER signature + sighash type,
/// compressed public key).
fn verify_signature(
    signature: &Signature,
    digest: &[u8; 32],
    expected_hash: &[u8; 20],
    index: usize,
) -> Result<(Vec<u8>, Vec<u8>), ConstructionError> {
    if signature.signature_type != SignatureType::Ecdsa {
        return Err(ConstructionError::SignatureInvalid(format!(
            "signature {index} has type {:?}, expected ecdsa",
            signature.signature_type
        )));
    }

    let pk_bytes = parse_public_key(&signature.public_key)?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&pk_bytes).map_err(|e| {
        ConstructionError::InvalidPublicKey(format!("signature {index} public key: {e}"))
    })?;
    if pubkey_hash(&pk_bytes)? != *expected_hash {
        return Err(ConstructionError::SignatureInvalid(format!(
            "signature {index} public key does not own the spent coin"
        )));
    }

    let raw = hex::decode(&signature.hex_bytes).map_err(|e| {
        ConstructionError::SignatureInvalid(format!("signature {index} is not hex: {e}"))
    })?;
    if raw.len() != COMPACT_SIGNATURE_LEN {
        return Err(ConstructionError::SignatureInvalid(format!(
            "signature {index} is {} bytes, expected {COMPACT_SIGNATURE_LEN}",
            raw.len()
        )));
    }
    let sig = EcdsaSignature::from_slice(&raw).map_err(|e| {
        ConstructionError::SignatureInvalid(format!("signature {index}: {e}"))
    })?;
    let sig = sig.normalize_s().unwrap_or(sig);

    verifying_key.verify_prehash(digest, &sig).map_err(|_| {
        ConstructionError::SignatureInvalid(format!(
            "signature {index} does not verify against its payload"
        ))
    })?;

    let mut sig_with_hashtype = sig.to_der().as_bytes().to_vec();
    sig_with_hashtype.push(SIGHASH_ALL.to_u32() as u8);

    Ok((sig_with_hashtype, verifying_key.to_sec1_bytes().to_vec()))
}

fn decode_transaction(tx_hex: &str) -> Result<Transaction, ConstructionError> {
    let bytes = hex::decode(tx_hex)?;
    Ok(transaction::deserialize(&bytes)?)
}

fn ensure_unsigned(tx: &Transaction) -> Result<(), ConstructionError> {
    for (index, input) in tx.input.iter().enumerate() {
        if !transaction::is_unsigned(input) {
            return Err(ConstructionError::EncodingError(format!(
                "unsigned transaction carries unlock data on input {index}"
            )));
        }
    }
    Ok(())
}

/// Parse an envelope input amount, which must be negative.
fn parse_spent_amount(value: &str, index: usize) -> Result<i64, ConstructionError> {
    let amount = value.parse::<i64>().map_err(|e| {
        ConstructionError::EncodingError(format!("input {index} amount {value:?}: {e}"))
    })?;
    if amount >= 0 {
        return Err(ConstructionError::EncodingError(format!(
            "input {index} amount {amount} must be negative"
        )));
    }
    Ok(amount)
}
