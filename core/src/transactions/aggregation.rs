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

//! Merging N transactions into one indistinguishable aggregate.

use std::collections::HashSet;

use log::*;

use super::{transaction_components::TransactionError, Transaction, TxBody};
use crate::crypto;

pub const LOG_TARGET: &str = "mweb::tx::aggregation";

/// Sums the offsets and concatenates-then-sorts the four body lists.
///
/// Cut-through (dropping an input together with the identical-commitment output it spends) is
/// applied only when the aggregate carries no owner signatures: removing either half of a pair
/// would otherwise unbalance the owner-sum equation, which is exactly the rule consensus applies.
/// `aggregate([tx])` returns `tx` unchanged apart from sorting.
pub fn aggregate(transactions: Vec<Transaction>) -> Result<Transaction, TransactionError> {
    let kernel_offsets: Vec<_> = transactions.iter().map(|tx| tx.kernel_offset).collect();
    let owner_offsets: Vec<_> = transactions.iter().map(|tx| tx.owner_offset).collect();
    let kernel_offset = crypto::add_blinding_factors(&kernel_offsets, &[])?;
    let owner_offset = crypto::add_blinding_factors(&owner_offsets, &[])?;

    let mut inputs = vec![];
    let mut outputs = vec![];
    let mut kernels = vec![];
    let mut owner_signatures = vec![];
    for tx in transactions {
        let (mut tx_inputs, mut tx_outputs, mut tx_kernels, mut tx_owner_sigs) = tx.into_body().dissolve();
        inputs.append(&mut tx_inputs);
        outputs.append(&mut tx_outputs);
        kernels.append(&mut tx_kernels);
        owner_signatures.append(&mut tx_owner_sigs);
    }

    if owner_signatures.is_empty() {
        let matched: HashSet<[u8; 33]> = inputs
            .iter()
            .map(|i| i.commitment.0)
            .filter(|c| outputs.iter().any(|o| o.commitment().0 == *c))
            .collect();
        if !matched.is_empty() {
            debug!(target: LOG_TARGET, "Cutting through {} matched pairs", matched.len());
            inputs.retain(|i| !matched.contains(&i.commitment.0));
            outputs.retain(|o| !matched.contains(&o.commitment().0));
        }
    }

    Ok(Transaction::new(
        kernel_offset,
        owner_offset,
        TxBody::new(inputs, outputs, kernels, owner_signatures),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        consensus::ConsensusEncoding,
        test_helpers::{create_test_output, TxBuilder},
        transactions::transaction_components::{Input, Kernel, OutputFeatures},
        types::BlindingFactor,
    };

    #[test]
    fn aggregating_a_single_tx_is_identity() {
        let tx = TxBuilder::new()
            .add_input(5_000_000)
            .add_output(4_500_000)
            .add_plain_kernel(500_000)
            .build()
            .unwrap();
        let aggregated = aggregate(vec![tx.clone()]).unwrap();
        assert_eq!(aggregated.to_wire_bytes(), tx.to_wire_bytes());
    }

    #[test]
    fn aggregation_is_associative_modulo_sort() {
        let tx1 = TxBuilder::new()
            .add_input(5_000_000)
            .add_output(4_500_000)
            .add_plain_kernel(500_000)
            .build()
            .unwrap();
        let tx2 = TxBuilder::new()
            .add_output(8_000_000)
            .add_pegin_kernel(8_000_000)
            .build()
            .unwrap();
        let tx3 = TxBuilder::new()
            .add_input(6_000_000)
            .add_output(1_000_000)
            .add_pegout_kernel(4_500_000, 500_000)
            .build()
            .unwrap();

        let all_at_once = aggregate(vec![tx1.clone(), tx2.clone(), tx3.clone()]).unwrap();
        let nested = aggregate(vec![aggregate(vec![tx1, tx2]).unwrap(), aggregate(vec![tx3]).unwrap()]).unwrap();
        assert_eq!(all_at_once.to_wire_bytes(), nested.to_wire_bytes());
    }

    #[test]
    fn cut_through_removes_exact_matches() {
        // hand-built, owner-signature-free bodies; aggregation never verifies balance
        let minted = create_test_output(1_000, OutputFeatures::empty());
        let spend_output = create_test_output(900, OutputFeatures::empty());

        let mint = Transaction::new(
            BlindingFactor::random(),
            BlindingFactor::default(),
            TxBody::new(
                vec![],
                vec![minted.output.clone()],
                vec![Kernel::create(&BlindingFactor::random(), 0, Some(1_000), None, None, vec![]).unwrap()],
                vec![],
            ),
        );
        let spend = Transaction::new(
            BlindingFactor::random(),
            BlindingFactor::default(),
            TxBody::new(
                vec![Input::new(minted.output.features(), *minted.output.commitment())],
                vec![spend_output.output.clone()],
                vec![Kernel::create(&BlindingFactor::random(), 100, None, None, None, vec![]).unwrap()],
                vec![],
            ),
        );

        let aggregated = aggregate(vec![mint, spend]).unwrap();

        // the matched input/output pair is gone; everything else survives
        assert!(aggregated.body().inputs().is_empty());
        assert_eq!(aggregated.body().outputs().len(), 1);
        assert_eq!(
            aggregated.body().outputs()[0].commitment(),
            spend_output.output.commitment()
        );
        assert_eq!(aggregated.body().kernels().len(), 2);
    }

    #[test]
    fn cut_through_is_skipped_when_ownership_is_signed() {
        // the same matched pair, but the transactions carry owner signatures; dropping either
        // half would unbalance the owner sums, so both must survive aggregation
        let minted = create_test_output(1_000, OutputFeatures::PEGGED_IN);
        let mint = TxBuilder::new()
            .add_test_output(minted.clone())
            .add_pegin_kernel(1_000)
            .build()
            .unwrap();
        let spend = TxBuilder::new()
            .add_spend(&minted)
            .add_output(900)
            .add_plain_kernel(100)
            .build()
            .unwrap();

        let aggregated = aggregate(vec![mint, spend]).unwrap();
        assert_eq!(aggregated.body().inputs().len(), 1);
        assert_eq!(aggregated.body().inputs()[0].commitment, *minted.output.commitment());
        assert_eq!(aggregated.body().outputs().len(), 2);
        assert_eq!(aggregated.body().owner_signatures().len(), 2);
    }

    #[test]
    fn offsets_are_summed() {
        let tx1 = TxBuilder::new().add_output(100).add_pegin_kernel(100).build().unwrap();
        let tx2 = TxBuilder::new().add_output(200).add_pegin_kernel(200).build().unwrap();
        let expected =
            crypto::add_blinding_factors(&[tx1.kernel_offset, tx2.kernel_offset], &[]).unwrap();
        let aggregated = aggregate(vec![tx1, tx2]).unwrap();
        assert_eq!(aggregated.kernel_offset, expected);
    }
}
