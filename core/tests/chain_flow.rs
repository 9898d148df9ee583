// Copyright 2024. The MWEB Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Connect/disconnect cycles against a real backing store.

use std::{collections::BTreeMap, sync::Arc};

use mweb_core::{
    chain_storage::{ChainStorageError, CoinsView, MemoryStore, TABLE_LEAF, TABLE_NODE, TABLE_UTXO},
    consensus::Hashed,
    node::{initialize_node, Node, NodeConfig},
    test_helpers::{build_next_block, create_test_output, test_params, MemoryBlockStore, TxBuilder},
    transactions::transaction_components::{OutputFeatures, PegInCoin},
    transactions::{aggregation::aggregate, Transaction},
};

fn new_node(store: Arc<MemoryStore>, datadir: &std::path::Path) -> Node {
    initialize_node(NodeConfig::new(datadir), test_params(), store).unwrap()
}

/// The keys that make up the coins state. The info record and header history are monotone
/// bookkeeping and excluded deliberately.
fn state_snapshot(store: &MemoryStore) -> BTreeMap<(u8, Vec<u8>), Vec<u8>> {
    store
        .snapshot()
        .into_iter()
        .filter(|((table, _), _)| [TABLE_LEAF, TABLE_NODE, TABLE_UTXO].contains(table))
        .collect()
}

fn pegin_tx(amount: u64) -> Transaction {
    TxBuilder::new()
        .add_pegin_output(amount)
        .add_pegin_kernel(amount)
        .build()
        .unwrap()
}

#[test]
fn connect_disconnect_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(store.clone(), dir.path());
    let genesis_snapshot = state_snapshot(&store);

    let b1 = build_next_block(&*node.view(), vec![pegin_tx(5_000_000)]).unwrap();
    let undo1 = node.connect_block(&b1).unwrap();
    let snapshot_after_b1 = state_snapshot(&store);
    let header_after_b1 = node.best_header().unwrap();
    assert_eq!(header_after_b1.height, 1);

    let b2 = build_next_block(&*node.view(), vec![pegin_tx(3_000_000)]).unwrap();
    let undo2 = node.connect_block(&b2).unwrap();
    assert_eq!(node.best_header().unwrap().height, 2);
    assert_ne!(state_snapshot(&store), snapshot_after_b1);

    node.disconnect_block(&undo2).unwrap();
    assert_eq!(state_snapshot(&store), snapshot_after_b1);
    assert_eq!(node.best_header().unwrap(), header_after_b1);

    node.disconnect_block(&undo1).unwrap();
    assert_eq!(state_snapshot(&store), genesis_snapshot);
    assert!(node.best_header().is_none());
}

#[test]
fn spending_a_connected_output() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(store.clone(), dir.path());

    let coin = create_test_output(5_000_000, OutputFeatures::PEGGED_IN);
    let tx1 = TxBuilder::new()
        .add_test_output(coin.clone())
        .add_pegin_kernel(5_000_000)
        .build()
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();
    assert!(node.view().utxo(coin.output.commitment()).unwrap().is_some());

    let tx2 = TxBuilder::new()
        .add_spend(&coin)
        .add_output(4_500_000)
        .add_plain_kernel(500_000)
        .build()
        .unwrap();
    node.validate_transaction(&tx2).unwrap();

    let b2 = build_next_block(&*node.view(), vec![tx2]).unwrap();
    node.connect_block(&b2).unwrap();

    // the leaf and its index entry remain, but its leafset bit is cleared
    let entry = node.view().utxo(coin.output.commitment()).unwrap().unwrap();
    assert!(!node.view().leafset().contains(entry.leaf_index));
    assert!(node.view().output_at(entry.leaf_index).unwrap().is_some());

    // unspent count = output leaves - spent
    let view = node.view();
    assert_eq!(
        view.leafset().len(),
        view.mmr_leaf_count(mweb_core::chain_storage::Tree::Output).unwrap() - 1
    );
}

#[test]
fn double_spend_is_rejected_without_mutation() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(store.clone(), dir.path());

    let coin = create_test_output(5_000_000, OutputFeatures::PEGGED_IN);
    let tx1 = TxBuilder::new()
        .add_test_output(coin.clone())
        .add_pegin_kernel(5_000_000)
        .build()
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();

    let spend1 = TxBuilder::new()
        .add_spend(&coin)
        .add_output(4_900_000)
        .add_plain_kernel(100_000)
        .build()
        .unwrap();
    let b2 = build_next_block(&*node.view(), vec![spend1]).unwrap();
    node.connect_block(&b2).unwrap();
    let snapshot = store.snapshot();

    // a second spend of the same commitment must fail at the leafset
    let spend2 = TxBuilder::new()
        .add_spend(&coin)
        .add_output(4_000_000)
        .add_plain_kernel(1_000_000)
        .build()
        .unwrap();
    let b3 = build_next_block(&*node.view(), vec![spend2]);
    // block assembly itself hits the cleared leafset bit
    match b3 {
        Err(ChainStorageError::DoubleSpend { .. }) => {},
        Ok(b3) => match node.connect_block(&b3) {
            Err(ChainStorageError::DoubleSpend { .. }) => {},
            other => panic!("expected DoubleSpend, got {:?}", other.map(|_| ())),
        },
        Err(other) => panic!("expected DoubleSpend, got {:?}", other),
    }
    assert_eq!(store.snapshot(), snapshot);
}

#[test]
fn unknown_input_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(store, dir.path());

    let never_connected = create_test_output(1_000, OutputFeatures::empty());
    let tx = TxBuilder::new()
        .add_spend(&never_connected)
        .add_output(900)
        .add_plain_kernel(100)
        .build()
        .unwrap();
    assert!(matches!(
        build_next_block(&*node.view(), vec![tx]),
        Err(ChainStorageError::UnknownOutput { .. })
    ));
}

#[test]
fn aggregated_block_validates_and_connects() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(store, dir.path());

    // seed funds for the standard and peg-out transactions
    let fund_a = create_test_output(11_000_000, OutputFeatures::PEGGED_IN);
    let fund_b = create_test_output(5_234_567, OutputFeatures::PEGGED_IN);
    let b1 = build_next_block(
        &*node.view(),
        vec![
            TxBuilder::new()
                .add_test_output(fund_a.clone())
                .add_pegin_kernel(11_000_000)
                .build()
                .unwrap(),
            TxBuilder::new()
                .add_test_output(fund_b.clone())
                .add_pegin_kernel(5_234_567)
                .build()
                .unwrap(),
        ],
    )
    .unwrap();
    node.connect_block(&b1).unwrap();

    let standard = TxBuilder::new()
        .add_spend(&fund_a)
        .add_output(4_000_000)
        .add_output(6_500_000)
        .add_plain_kernel(500_000)
        .build()
        .unwrap();
    let pegin = pegin_tx(8_000_000);
    let pegout = TxBuilder::new()
        .add_spend(&fund_b)
        .add_output(234_567)
        .add_pegout_kernel(4_500_000, 500_000)
        .build()
        .unwrap();

    let aggregated = aggregate(vec![standard, pegin.clone(), pegout.clone()]).unwrap();
    let b2 = build_next_block(&*node.view(), vec![aggregated]).unwrap();

    let pegins: Vec<PegInCoin> = b2
        .body()
        .pegin_kernels()
        .map(|k| PegInCoin::new(k.pegin.unwrap(), k.hash()))
        .collect();
    assert_eq!(pegins.len(), 1);
    let pegouts = b2.body().pegout_coins();
    assert_eq!(pegouts.len(), 1);

    node.validate_block(&b2, &b2.block_hash(), &pegins, &pegouts).unwrap();
    node.connect_block(&b2).unwrap();
    assert_eq!(node.best_header().unwrap().height, 2);
}

#[test]
fn state_survives_reopen() {
    let store = Arc::new(MemoryStore::new());
    let dir = tempfile::tempdir().unwrap();
    let header = {
        let node = new_node(store.clone(), dir.path());
        let b1 = build_next_block(&*node.view(), vec![pegin_tx(2_000_000)]).unwrap();
        node.connect_block(&b1).unwrap();
        node.best_header().unwrap()
    };

    let reopened = new_node(store, dir.path());
    assert_eq!(reopened.best_header().unwrap(), header);
    assert_eq!(reopened.view().leafset().len(), 1);
}

#[test]
fn apply_state_replays_to_the_trusted_tip() {
    // build a two-block chain on the source node
    let source_store = Arc::new(MemoryStore::new());
    let source_dir = tempfile::tempdir().unwrap();
    let source = new_node(source_store, source_dir.path());

    let coin = create_test_output(5_000_000, OutputFeatures::PEGGED_IN);
    let tx1 = TxBuilder::new()
        .add_test_output(coin.clone())
        .add_pegin_kernel(5_000_000)
        .build()
        .unwrap();
    let b1 = build_next_block(&*source.view(), vec![tx1]).unwrap();
    source.connect_block(&b1).unwrap();
    let change = create_test_output(4_000_000, OutputFeatures::empty());
    let tx2 = TxBuilder::new()
        .add_spend(&coin)
        .add_test_output(change.clone())
        .add_plain_kernel(1_000_000)
        .build()
        .unwrap();
    let b2 = build_next_block(&*source.view(), vec![tx2]).unwrap();
    source.connect_block(&b2).unwrap();

    let kernels: Vec<_> = b1
        .body()
        .kernels()
        .iter()
        .chain(b2.body().kernels())
        .cloned()
        .collect();
    let utxos = vec![*change.output.commitment()];
    let block_store = MemoryBlockStore::new(vec![b1.clone(), b2.clone()]);

    // replay onto a fresh node
    let target_store = Arc::new(MemoryStore::new());
    let target_dir = tempfile::tempdir().unwrap();
    let target = new_node(target_store, target_dir.path());
    target
        .apply_state(&block_store, &b1.block_hash(), &b2.block_hash(), &utxos, &kernels)
        .unwrap();

    assert_eq!(target.best_header(), source.best_header());

    // a wrong trusted set must be refused
    let bad_store = Arc::new(MemoryStore::new());
    let bad_dir = tempfile::tempdir().unwrap();
    let bad = new_node(bad_store, bad_dir.path());
    let wrong_utxos = vec![*coin.output.commitment()];
    assert!(matches!(
        bad.apply_state(&block_store, &b1.block_hash(), &b2.block_hash(), &wrong_utxos, &kernels),
        Err(ChainStorageError::StateMismatch(_))
    ));
}
