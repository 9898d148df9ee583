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

//! Context-free validation: everything checkable without touching the coins view.

use std::collections::HashSet;

use log::*;

use super::{error::ValidationError, sums::validate_kernel_sums};
use crate::{
    blocks::Block,
    consensus::{ChainParams, Hashed},
    crypto::{self, SignedMessage},
    transactions::{
        transaction_components::{PegInCoin, PegOutCoin},
        Transaction,
        TxBody,
    },
    types::Hash,
};

pub const LOG_TARGET: &str = "mweb::validation::block";

pub struct BlockValidator<'a> {
    params: &'a ChainParams,
}

impl<'a> BlockValidator<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Context-free block validation, plus the checks that bind the extension block to its host
    /// block: the committed MWEB hash, and set-equality of peg-in/peg-out kernels against the
    /// coins the host block claims.
    pub fn validate(
        &self,
        block: &Block,
        mweb_hash: &Hash,
        pegins: &[PegInCoin],
        pegouts: &[PegOutCoin],
    ) -> Result<(), ValidationError> {
        trace!(target: LOG_TARGET, "Validating block {}", block);
        if block.block_hash() != *mweb_hash {
            return Err(ValidationError::HashMismatch);
        }
        self.validate_body(block.body())?;
        self.validate_pegins(block.body(), pegins)?;
        self.validate_pegouts(block.body(), pegouts)?;
        trace!(target: LOG_TARGET, "Block {} validated", block);
        Ok(())
    }

    /// Context-free transaction validation plus the transaction-level balance law. Owner sums
    /// need the spent outputs' keys and are checked by the layer that can resolve inputs.
    pub fn validate_tx(&self, tx: &Transaction) -> Result<(), ValidationError> {
        self.validate_body(tx.body())?;
        validate_kernel_sums(tx.body(), &tx.kernel_offset)
    }

    pub fn validate_body(&self, body: &TxBody) -> Result<(), ValidationError> {
        // every body settles through at least one kernel
        if body.kernels().is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        check_sorted_unique(body.inputs().iter().map(Hashed::hash), ValidationError::UnsortedOrDuplicateInput)?;
        check_sorted_unique(
            body.outputs().iter().map(|o| o.output_hash()),
            ValidationError::UnsortedOrDuplicateOutput,
        )?;
        check_sorted_unique(body.kernels().iter().map(Hashed::hash), ValidationError::UnsortedOrDuplicateKernel)?;
        check_sorted_unique(
            body.owner_signatures().iter().map(Hashed::hash),
            ValidationError::UnsortedOrDuplicateOwnerSignature,
        )?;

        // an input may not spend an output created in the same body
        let output_commitments: HashSet<[u8; 33]> = body.outputs().iter().map(|o| o.commitment().0).collect();
        if output_commitments.len() != body.outputs().len() {
            return Err(ValidationError::UnsortedOrDuplicateOutput);
        }
        if body.inputs().iter().any(|i| output_commitments.contains(&i.commitment.0)) {
            return Err(ValidationError::InputSpendsNewOutput);
        }

        for coin in body.pegout_coins() {
            if coin.address.hrp() != self.params.hrp {
                return Err(ValidationError::InvalidAddress {
                    expected: self.params.hrp.clone(),
                    actual: coin.address.hrp().to_string(),
                });
            }
        }

        let weight = body.weight(&self.params.weight);
        if weight > self.params.max_block_weight {
            return Err(ValidationError::BlockTooLarge {
                actual: weight,
                max: self.params.max_block_weight,
            });
        }

        self.verify_signatures(body)?;

        let proof_data: Vec<_> = body.outputs().iter().map(|o| o.proof_data()).collect();
        crypto::verify_range_proofs(&proof_data)?;
        Ok(())
    }

    /// Kernel, owner and output-sender signatures, each set verified signature by signature.
    fn verify_signatures(&self, body: &TxBody) -> Result<(), ValidationError> {
        let mut kernel_sigs = Vec::with_capacity(body.kernels().len());
        for kernel in body.kernels() {
            kernel_sigs.push(SignedMessage {
                public_key: crypto::commitment_to_pubkey(&kernel.excess)?,
                signature: kernel.signature,
                message_hash: kernel.signature_message(),
            });
        }
        crypto::schnorr_verify_all(&kernel_sigs)?;

        crypto::schnorr_verify_all(body.owner_signatures())?;

        let output_sigs: Vec<SignedMessage> = body
            .outputs()
            .iter()
            .map(|o| SignedMessage {
                public_key: *o.sender_pubkey(),
                signature: o.owner_data().signature,
                message_hash: o.owner_data().signed_message_hash(),
            })
            .collect();
        crypto::schnorr_verify_all(&output_sigs)?;
        Ok(())
    }

    fn validate_pegins(&self, body: &TxBody, pegins: &[PegInCoin]) -> Result<(), ValidationError> {
        let mut expected: Vec<(u64, Hash)> = pegins.iter().map(|p| (p.amount, p.kernel_id)).collect();
        let mut actual: Vec<(u64, Hash)> = body
            .pegin_kernels()
            .map(|k| (k.pegin.unwrap_or_default(), k.hash()))
            .collect();
        expected.sort();
        actual.sort();
        if expected != actual {
            warn!(target: LOG_TARGET, "Peg-in mismatch: {} expected, {} in block", expected.len(), actual.len());
            return Err(ValidationError::PegInMismatch);
        }
        Ok(())
    }

    fn validate_pegouts(&self, body: &TxBody, pegouts: &[PegOutCoin]) -> Result<(), ValidationError> {
        let mut expected: Vec<(u64, String)> = pegouts.iter().map(|p| (p.amount, p.address.as_str().to_string())).collect();
        let mut actual: Vec<(u64, String)> = body
            .pegout_coins()
            .iter()
            .map(|p| (p.amount, p.address.as_str().to_string()))
            .collect();
        expected.sort();
        actual.sort();
        if expected != actual {
            warn!(target: LOG_TARGET, "Peg-out mismatch: {} expected, {} in block", expected.len(), actual.len());
            return Err(ValidationError::PegOutMismatch);
        }
        Ok(())
    }
}

fn check_sorted_unique<I: Iterator<Item = Hash>>(hashes: I, err: ValidationError) -> Result<(), ValidationError> {
    let mut previous: Option<Hash> = None;
    for hash in hashes {
        if let Some(prev) = previous {
            if hash <= prev {
                return Err(err);
            }
        }
        previous = Some(hash);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::{test_params, TxBuilder};

    #[test]
    fn valid_tx_passes() {
        let tx = TxBuilder::new()
            .add_input(5_000_000)
            .add_input(6_000_000)
            .add_output(4_000_000)
            .add_output(6_500_000)
            .add_plain_kernel(500_000)
            .build()
            .unwrap();
        let params = test_params();
        BlockValidator::new(&params).validate_tx(&tx).unwrap();
    }

    #[test]
    fn unsorted_inputs_rejected() {
        let tx = TxBuilder::new()
            .add_input(1_000)
            .add_input(2_000)
            .add_output(2_900)
            .add_plain_kernel(100)
            .build()
            .unwrap();
        let params = test_params();

        let (mut inputs, outputs, kernels, owner_sigs) = tx.body().clone().dissolve();
        inputs.reverse();
        let body = TxBody::new_unsorted(inputs, outputs, kernels, owner_sigs);
        assert!(matches!(
            BlockValidator::new(&params).validate_body(&body),
            Err(ValidationError::UnsortedOrDuplicateInput)
        ));
    }

    #[test]
    fn duplicate_kernel_rejected() {
        let tx = TxBuilder::new().add_output(100).add_pegin_kernel(100).build().unwrap();
        let params = test_params();
        let (inputs, outputs, kernels, owner_sigs) = tx.body().clone().dissolve();
        let doubled = vec![kernels[0].clone(), kernels[0].clone()];
        let body = TxBody::new_unsorted(inputs, outputs, doubled, owner_sigs);
        assert!(matches!(
            BlockValidator::new(&params).validate_body(&body),
            Err(ValidationError::UnsortedOrDuplicateKernel)
        ));
    }

    #[test]
    fn oversized_body_rejected() {
        let mut params = test_params();
        params.max_block_weight = 10;
        let tx = TxBuilder::new()
            .add_output(8_000_000)
            .add_pegin_kernel(8_000_000)
            .build()
            .unwrap();
        assert!(matches!(
            BlockValidator::new(&params).validate_tx(&tx),
            Err(ValidationError::BlockTooLarge { .. })
        ));
    }

    #[test]
    fn corrupt_range_proof_rejected() {
        let tx = TxBuilder::new().add_output(100).add_pegin_kernel(100).build().unwrap();
        let params = test_params();
        let (inputs, mut outputs, kernels, owner_sigs) = tx.body().clone().dissolve();
        let mut proof = outputs[0].range_proof().clone();
        proof.proof[100] ^= 1;
        let corrupted = crate::transactions::transaction_components::Output::new(
            *outputs[0].commitment(),
            *outputs[0].owner_data(),
            proof,
        );
        outputs[0] = corrupted;
        let tx = Transaction::new(tx.kernel_offset, tx.owner_offset, TxBody::new(inputs, outputs, kernels, owner_sigs));
        assert!(matches!(
            BlockValidator::new(&params).validate_tx(&tx),
            Err(ValidationError::Crypto(_))
        ));
    }
}
