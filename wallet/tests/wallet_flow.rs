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

//! End-to-end wallet flows against a real node: peg-in, spend, peg-out, scan-from-seed.

use std::sync::Arc;

use mweb_core::{
    blocks::Block,
    chain_storage::MemoryStore,
    consensus::Hashed,
    node::{initialize_node, Node, NodeConfig},
    test_helpers::{build_next_block, test_params, TEST_ADDRESS},
    transactions::transaction_components::{Bech32Address, PegInCoin},
};
use mweb_wallet::{Chain, MemoryWalletStore, Wallet, WalletError, WalletStore, CHANGE_INDEX, PEGIN_INDEX};

fn new_node(dir: &std::path::Path) -> Node {
    initialize_node(NodeConfig::new(dir), test_params(), Arc::new(MemoryStore::new())).unwrap()
}

fn new_wallet(seed: &[u8]) -> Wallet<MemoryWalletStore> {
    Wallet::open(MemoryWalletStore::new(seed.to_vec()), test_params()).unwrap()
}

struct MemoryChain(Vec<Block>);

impl Chain for MemoryChain {
    fn tip_height(&self) -> Result<u64, WalletError> {
        Ok(self.0.len() as u64)
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, WalletError> {
        Ok(self.0.get(height as usize - 1).cloned())
    }
}

fn pegins_of(block: &Block) -> Vec<PegInCoin> {
    block
        .body()
        .pegin_kernels()
        .map(|k| PegInCoin::new(k.pegin.unwrap(), k.hash()))
        .collect()
}

#[test]
fn pegin_then_spend() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let alice = new_wallet(b"alice seed");
    let bob = new_wallet(b"bob seed");

    // peg-in 8_000_000 to Alice's own peg-in address
    let tx1 = alice
        .create_pegin_tx(8_000_000, &alice.address(PEGIN_INDEX).unwrap())
        .unwrap();
    node.validate_transaction(&tx1).unwrap();
    // the coin was rewound and persisted at build time, proving seed-recoverability
    assert_eq!(alice.store().coins().unwrap().len(), 1);

    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.validate_block(&b1, &b1.block_hash(), &pegins_of(&b1), &[]).unwrap();
    node.connect_block(&b1).unwrap();
    alice.block_connected(&b1, &b1.block_hash()).unwrap();

    // pegged-in value matures at pegin_maturity (20)
    let at_tip = alice.balance(1).unwrap();
    assert_eq!(at_tip.immature, 8_000_000);
    assert_eq!(at_tip.confirmed, 0);
    let matured = alice.balance(20).unwrap();
    assert_eq!(matured.confirmed, 8_000_000);
    assert_eq!(matured.immature, 0);

    // spend 7_000_000 to Bob; fee = fee_base * weight(1 in, 2 out, 1 kernel) = 1_000 * 39
    let tx2 = alice.send(7_000_000, 1_000, &bob.address(0).unwrap(), 20).unwrap();
    let fee = tx2.total_fee();
    assert_eq!(fee, 39_000);
    node.validate_transaction(&tx2).unwrap();

    let b2 = build_next_block(&*node.view(), vec![tx2]).unwrap();
    node.validate_block(&b2, &b2.block_hash(), &[], &[]).unwrap();
    node.connect_block(&b2).unwrap();
    alice.block_connected(&b2, &b2.block_hash()).unwrap();
    bob.block_connected(&b2, &b2.block_hash()).unwrap();

    // destination holds the sent amount, origin only the change
    let bob_balance = bob.balance(2).unwrap();
    assert_eq!(bob_balance.confirmed, 7_000_000);
    let alice_balance = alice.balance(2).unwrap();
    assert_eq!(alice_balance.confirmed, 8_000_000 - 7_000_000 - fee);
    assert_eq!(alice_balance.immature, 0);
    assert_eq!(alice_balance.unconfirmed, 0);
}

#[test]
fn pegout_returns_change_to_change_index() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let wallet = new_wallet(b"pegout seed");

    let tx1 = wallet
        .create_pegin_tx(6_000_000, &wallet.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();
    wallet.block_connected(&b1, &b1.block_hash()).unwrap();

    let address = Bech32Address::parse(TEST_ADDRESS).unwrap();
    let tx2 = wallet.create_pegout_tx(4_500_000, 1_000, address.clone(), 20).unwrap();
    let kernel = &tx2.body().kernels()[0];
    assert_eq!(kernel.pegout.as_ref().unwrap().amount, 4_500_000);
    // fee = fee_base * weight(1 in, 1 out, 1 kernel)
    assert_eq!(tx2.total_fee(), 1_000 * 21);
    node.validate_transaction(&tx2).unwrap();

    let b2 = build_next_block(&*node.view(), vec![tx2]).unwrap();
    node.validate_block(&b2, &b2.block_hash(), &[], &b2.body().pegout_coins())
        .unwrap();
    node.connect_block(&b2).unwrap();
    wallet.block_connected(&b2, &b2.block_hash()).unwrap();

    let change = wallet
        .store()
        .coins()
        .unwrap()
        .into_iter()
        .find(|c| c.is_unspent())
        .unwrap();
    assert_eq!(change.address_index, CHANGE_INDEX);
    assert_eq!(change.amount, 6_000_000 - 4_500_000 - 21_000);
}

#[test]
fn insufficient_funds_is_reported() {
    let wallet = new_wallet(b"poor seed");
    let err = wallet.send(1_000_000, 1, &wallet.address(0).unwrap(), 10);
    assert!(matches!(err, Err(WalletError::InsufficientFunds { .. })));
}

#[test]
fn scan_from_seed_recovers_coins_and_spends() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let wallet = new_wallet(b"restore seed");

    let tx1 = wallet
        .create_pegin_tx(5_000_000, &wallet.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();
    wallet.block_connected(&b1, &b1.block_hash()).unwrap();

    let other = new_wallet(b"someone else");
    let tx2 = wallet.send(2_000_000, 100, &other.address(0).unwrap(), 20).unwrap();
    let fee = tx2.total_fee();
    let b2 = build_next_block(&*node.view(), vec![tx2]).unwrap();
    node.connect_block(&b2).unwrap();
    wallet.block_connected(&b2, &b2.block_hash()).unwrap();

    // restore the same seed into an empty store and scan the chain
    let restored = new_wallet(b"restore seed");
    let chain = MemoryChain(vec![b1, b2]);
    let recovered = restored.scan_for_outputs(&chain).unwrap();
    assert_eq!(recovered, 2); // the peg-in coin and the change coin

    assert_eq!(restored.balance(20).unwrap(), wallet.balance(20).unwrap());
    assert_eq!(
        restored.balance(2).unwrap().confirmed,
        5_000_000 - 2_000_000 - fee
    );
}

#[test]
fn mempool_coins_are_unconfirmed() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let wallet = new_wallet(b"mempool seed");

    let tx1 = wallet
        .create_pegin_tx(1_500_000, &wallet.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();
    wallet.block_connected(&b1, &b1.block_hash()).unwrap();

    // a self-send sitting in the mempool
    let tx2 = wallet.send(1_000_000, 10, &wallet.address(2).unwrap(), 20).unwrap();
    wallet.transaction_added_to_mempool(&tx2).unwrap();

    let balance = wallet.balance(20).unwrap();
    assert_eq!(balance.unconfirmed, 1_000_000 + (1_500_000 - 1_000_000 - tx2.total_fee()));
    assert_eq!(balance.confirmed, 0);
}

#[test]
fn disconnect_returns_coins_to_unconfirmed() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let wallet = new_wallet(b"reorg seed");

    let tx1 = wallet
        .create_pegin_tx(2_000_000, &wallet.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    let undo = node.connect_block(&b1).unwrap();
    wallet.block_connected(&b1, &b1.block_hash()).unwrap();
    assert_eq!(wallet.balance(20).unwrap().confirmed, 2_000_000);

    node.disconnect_block(&undo).unwrap();
    wallet.block_disconnected(&b1, &b1.block_hash()).unwrap();
    let balance = wallet.balance(20).unwrap();
    assert_eq!(balance.confirmed, 0);
    assert_eq!(balance.unconfirmed, 2_000_000);
}

#[test]
fn disconnect_undoes_spends() {
    let dir = tempfile::tempdir().unwrap();
    let node = new_node(dir.path());
    let wallet = new_wallet(b"spend reorg seed");
    let other = new_wallet(b"someone else");

    let tx1 = wallet
        .create_pegin_tx(3_000_000, &wallet.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let b1 = build_next_block(&*node.view(), vec![tx1]).unwrap();
    node.connect_block(&b1).unwrap();
    wallet.block_connected(&b1, &b1.block_hash()).unwrap();

    let tx2 = wallet.send(1_000_000, 10, &other.address(0).unwrap(), 20).unwrap();
    let fee = tx2.total_fee();
    let b2 = build_next_block(&*node.view(), vec![tx2]).unwrap();
    let undo2 = node.connect_block(&b2).unwrap();
    wallet.block_connected(&b2, &b2.block_hash()).unwrap();
    assert_eq!(
        wallet.balance(20).unwrap().confirmed,
        3_000_000 - 1_000_000 - fee
    );

    // the reorg disconnects the block that spent the peg-in coin
    node.disconnect_block(&undo2).unwrap();
    wallet.block_disconnected(&b2, &b2.block_hash()).unwrap();

    // the spent coin is spendable again; the change coin dropped back to unconfirmed
    let balance = wallet.balance(20).unwrap();
    assert_eq!(balance.confirmed, 3_000_000);
    assert_eq!(balance.unconfirmed, 3_000_000 - 1_000_000 - fee);

    // and it can fund a fresh transaction without a rescan
    let tx3 = wallet.send(500_000, 10, &other.address(0).unwrap(), 20).unwrap();
    node.validate_transaction(&tx3).unwrap();
}

#[test]
fn foreign_outputs_are_not_ours() {
    let alice = new_wallet(b"alice seed");
    let bob = new_wallet(b"bob seed");
    let tx = alice
        .create_pegin_tx(1_000_000, &alice.address(PEGIN_INDEX).unwrap())
        .unwrap();
    let output = &tx.body().outputs()[0];
    assert!(matches!(bob.rewind_output(output), Err(WalletError::NotOurOutput)));
}

#[test]
fn rewind_recovers_exact_opening() {
    let alice = new_wallet(b"opening seed");
    let bob = new_wallet(b"bob seed");
    // Bob sends to one of Alice's published addresses
    let sender_key = mweb_core::crypto::parse_secret_key(
        mweb_core::types::BlindingFactor::random().as_bytes(),
    )
    .unwrap();
    let (output, blind) = mweb_wallet::create_output(
        &sender_key,
        &alice.address(5).unwrap(),
        123_456,
        mweb_core::transactions::transaction_components::OutputFeatures::empty(),
    )
    .unwrap();
    drop(bob);

    let coin = alice.rewind_output(&output).unwrap();
    assert_eq!(coin.amount, 123_456);
    assert_eq!(coin.blind, blind);
    assert_eq!(coin.address_index, 5);
    // the recovered one-time key really does control the output
    assert_eq!(
        mweb_core::crypto::public_key(&coin.spend_key).unwrap(),
        *output.receiver_pubkey()
    );
}
