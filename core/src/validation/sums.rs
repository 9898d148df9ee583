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

//! The two balance laws. For a transaction the offsets are the transaction's own; for a block
//! they are the difference between the header's running totals and the previous header's.

use log::*;

use super::error::ValidationError;
use crate::{
    crypto,
    transactions::TxBody,
    types::{BlindingFactor, Commitment, PublicKey},
};

pub const LOG_TARGET: &str = "mweb::validation::sums";

/// `ΣC(outputs) − ΣC(inputs) − Σpegin·H + (Σpegout + Σfee)·H == offset·G + Σkernel.excess`.
///
/// Fees and peg-outs both leave the extension block on the host side, so they enter the supply
/// term together.
pub fn validate_kernel_sums(body: &TxBody, offset: &BlindingFactor) -> Result<(), ValidationError> {
    if body.kernels().is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let mut lhs_positive: Vec<Commitment> = body.outputs().iter().map(|o| *o.commitment()).collect();
    let mut lhs_negative: Vec<Commitment> = body.inputs().iter().map(|i| i.commitment).collect();

    let supply_delta = body.supply_delta();
    if supply_delta > 0 {
        lhs_negative.push(crypto::commit_transparent(supply_delta as u64)?);
    } else if supply_delta < 0 {
        lhs_positive.push(crypto::commit_transparent((-supply_delta) as u64)?);
    }

    let mut rhs_positive: Vec<Commitment> = body.kernels().iter().map(|k| k.excess).collect();
    if !offset.is_zero() {
        rhs_positive.push(crypto::commit_blinded(0, offset)?);
    }

    let lhs = crypto::add_commitments(&lhs_positive, &lhs_negative)?;
    let rhs = crypto::add_commitments(&rhs_positive, &[])?;
    if lhs != rhs {
        warn!(target: LOG_TARGET, "Kernel sum mismatch (supply delta {})", supply_delta);
        return Err(ValidationError::InvalidKernelSums);
    }
    Ok(())
}

/// `Σ(output.sender_pubkey) == Σ(spent output.receiver_pubkey) + offset·G + Σ(owner_sig.pubkey)`.
///
/// `input_owner_keys` are the receiver keys of the outputs the body spends, supplied by whichever
/// layer can resolve the inputs (the coins view for blocks, the caller for bare transactions).
pub fn validate_owner_sums(
    body: &TxBody,
    offset: &BlindingFactor,
    input_owner_keys: &[PublicKey],
) -> Result<(), ValidationError> {
    let lhs: Vec<PublicKey> = body.outputs().iter().map(|o| *o.sender_pubkey()).collect();

    let mut rhs: Vec<PublicKey> = input_owner_keys.to_vec();
    rhs.extend(body.owner_signatures().iter().map(|s| s.public_key));
    if !offset.is_zero() {
        let offset_key =
            crypto::parse_secret_key(offset.as_bytes()).map_err(ValidationError::Crypto)?;
        rhs.push(crypto::public_key(&offset_key)?);
    }

    match (lhs.is_empty(), rhs.is_empty()) {
        (true, true) => return Ok(()),
        (true, false) | (false, true) => {
            return Err(ValidationError::InvalidOwnerSums);
        },
        _ => {},
    }

    let lhs_sum = crypto::add_public_keys(&lhs)?;
    let rhs_sum = crypto::add_public_keys(&rhs)?;
    if lhs_sum != rhs_sum {
        warn!(target: LOG_TARGET, "Owner sum mismatch");
        return Err(ValidationError::InvalidOwnerSums);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::TxBuilder;

    #[test]
    fn standard_transfer_balances() {
        let builder = TxBuilder::new()
            .add_input(5_000_000)
            .add_input(6_000_000)
            .add_output(4_000_000)
            .add_output(6_500_000)
            .add_plain_kernel(500_000);
        let owner_keys = builder.input_owner_pubkeys();
        let tx = builder.build().unwrap();

        validate_kernel_sums(tx.body(), &tx.kernel_offset).unwrap();
        validate_owner_sums(tx.body(), &tx.owner_offset, &owner_keys).unwrap();
    }

    #[test]
    fn wrong_fee_fails_kernel_sums() {
        // inputs - outputs leave 500_000 for the fee; a kernel claiming 400_000 cannot balance
        let tx = TxBuilder::new()
            .add_input(5_000_000)
            .add_input(6_000_000)
            .add_output(4_000_000)
            .add_output(6_500_000)
            .add_plain_kernel(400_000)
            .build()
            .unwrap();
        assert!(matches!(
            validate_kernel_sums(tx.body(), &tx.kernel_offset),
            Err(ValidationError::InvalidKernelSums)
        ));
    }

    #[test]
    fn pegin_balances_with_supply_term() {
        let tx = TxBuilder::new()
            .add_output(8_000_000)
            .add_pegin_kernel(8_000_000)
            .build()
            .unwrap();
        validate_kernel_sums(tx.body(), &tx.kernel_offset).unwrap();
    }

    #[test]
    fn pegout_balances_with_supply_term() {
        let tx = TxBuilder::new()
            .add_input(1_234_567)
            .add_input(4_000_000)
            .add_output(234_567)
            .add_pegout_kernel(4_500_000, 500_000)
            .build()
            .unwrap();
        validate_kernel_sums(tx.body(), &tx.kernel_offset).unwrap();
    }

    #[test]
    fn wrong_owner_key_fails_owner_sums() {
        let builder = TxBuilder::new().add_input(1_000).add_output(900).add_plain_kernel(100);
        let mut owner_keys = builder.input_owner_pubkeys();
        let tx = builder.build().unwrap();
        validate_owner_sums(tx.body(), &tx.owner_offset, &owner_keys).unwrap();

        owner_keys[0] = crypto::public_key(
            &crypto::parse_secret_key(crate::types::BlindingFactor::random().as_bytes()).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            validate_owner_sums(tx.body(), &tx.owner_offset, &owner_keys),
            Err(ValidationError::InvalidOwnerSums)
        ));
    }
}
