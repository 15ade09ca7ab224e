//! Parse(Payloads(operations)) reproduces the operations for generated
//! operation sets, whatever indices the caller assigns.

use proptest::prelude::*;

use chain_rvn::address::{address_to_script, pubkey_to_address};
use chain_rvn::network::RvnNetwork;
use chain_rvn::script::ScriptKind;
use construction_core::collaborators::{Client, ExternalError, Indexer};
use construction_core::types::*;
use construction_core::{ConstructionConfig, ConstructionEngine};

const OWNER_KEY: &str = "0325c9a4252789b31dbb3454ec647e9516e7c596bcde2bd5da71a60fab8644e438";

struct Unreachable;

impl Indexer for Unreachable {
    async fn get_script_pub_keys(&self, _coins: &[Coin]) -> Result<Vec<ScriptPubKey>, ExternalError> {
        Err(ExternalError::Unavailable("not used".into()))
    }
}

impl Client for Unreachable {
    async fn suggested_fee_rate(&self, _conf_target: i64) -> Result<f64, ExternalError> {
        Err(ExternalError::Unavailable("not used".into()))
    }
    async fn get_best_block(&self) -> Result<i64, ExternalError> {
        Err(ExternalError::Unavailable("not used".into()))
    }
    async fn get_hash_from_index(&self, _height: i64) -> Result<String, ExternalError> {
        Err(ExternalError::Unavailable("not used".into()))
    }
    async fn send_raw_transaction(&self, _tx_hex: &str) -> Result<String, ExternalError> {
        Err(ExternalError::Unavailable("not used".into()))
    }
}

/// Distinct operation indices split into (inputs, outputs), shuffled so the
/// two kinds interleave.
fn arb_layout() -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
    (1usize..4, 1usize..4).prop_flat_map(|(inputs, outputs)| {
        prop::collection::btree_set(0u64..500, inputs + outputs)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(move |indices| {
                let (spent, paid) = indices.split_at(inputs);
                (spent.to_vec(), paid.to_vec())
            })
    })
}

fn operation(
    index: u64,
    op_type: OperationType,
    address: &str,
    value: i64,
    currency: &Currency,
    coin: Option<CoinIdentifier>,
) -> Operation {
    Operation {
        operation_identifier: OperationIdentifier {
            index,
            network_index: None,
        },
        op_type,
        account: Some(AccountIdentifier::new(address)),
        amount: Some(Amount::new(value, currency.clone())),
        coin_change: coin.map(|coin_identifier| CoinChange {
            coin_identifier,
            coin_action: CoinAction::CoinSpent,
        }),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parse_reproduces_generated_operations(
        (input_indices, output_indices) in arb_layout(),
        spent in prop::collection::vec(30_000i64..1_000_000, 3),
        paid in prop::collection::vec(1i64..10_000, 3),
        witness_owner in any::<bool>(),
        witness_outputs in prop::collection::vec(any::<bool>(), 3),
    ) {
        let engine = ConstructionEngine::new(
            ConstructionConfig::default(),
            Unreachable,
            Unreachable,
        );
        let params = RvnNetwork::Mainnet.params();
        let currency = engine.currency().clone();
        let key = hex::decode(OWNER_KEY).unwrap();
        let owner_kind = if witness_owner {
            ScriptKind::PayToWitnessPubkeyHash
        } else {
            ScriptKind::PayToPubkeyHash
        };
        let owner = pubkey_to_address(&key, owner_kind, &params).unwrap();
        let legacy = pubkey_to_address(&key, ScriptKind::PayToPubkeyHash, &params).unwrap();
        let witness = pubkey_to_address(&key, ScriptKind::PayToWitnessPubkeyHash, &params).unwrap();
        let (_, owner_script) = address_to_script(&owner, &params).unwrap();

        let mut operations = Vec::new();
        let mut resolved = Vec::new();
        for (position, index) in input_indices.iter().enumerate() {
            let coin_identifier = CoinIdentifier::from_outpoint(
                &format!("{:064x}", index + 1),
                position as u32,
            );
            operations.push(operation(
                *index,
                OperationType::Input,
                &owner,
                -spent[position],
                &currency,
                Some(coin_identifier.clone()),
            ));
            resolved.push(ResolvedCoin {
                coin: Coin {
                    coin_identifier,
                    amount: Amount::new(-spent[position], currency.clone()),
                },
                kind: owner_kind,
                script_pub_key: ScriptPubKey {
                    asm: String::new(),
                    hex: hex::encode(&owner_script),
                    required_sigs: 1,
                    script_type: owner_kind.node_type().into(),
                    addresses: vec![owner.clone()],
                },
            });
        }
        for (position, index) in output_indices.iter().enumerate() {
            let address = if witness_outputs[position] { &witness } else { &legacy };
            operations.push(operation(
                *index,
                OperationType::Output,
                address,
                paid[position],
                &currency,
                None,
            ));
        }

        // Resolved coins follow the inputs in index order.
        let mut by_index: Vec<(u64, ResolvedCoin)> =
            input_indices.iter().copied().zip(resolved).collect();
        by_index.sort_by_key(|(index, _)| *index);
        let metadata = ConstructionMetadata {
            coins: by_index.into_iter().map(|(_, coin)| coin).collect(),
            replay_protection: BlockReference {
                height: 0,
                hash: "00".repeat(32),
            },
        };

        let payloads = engine.payloads(&operations, &metadata).unwrap();
        prop_assert_eq!(payloads.payloads.len(), input_indices.len());
        let parsed = engine.parse(&payloads.unsigned_transaction, false).unwrap();

        let mut expected = operations.clone();
        expected.sort_by_key(|op| op.operation_identifier.index);
        let mut inputs_seen = 0;
        let mut outputs_seen = 0;
        for op in &mut expected {
            let seen = match op.op_type {
                OperationType::Input => &mut inputs_seen,
                OperationType::Output => &mut outputs_seen,
            };
            op.operation_identifier.network_index = Some(*seen);
            *seen += 1;
        }
        prop_assert_eq!(parsed.operations, expected);
        prop_assert!(parsed.account_identifier_signers.is_empty());
    }
}
