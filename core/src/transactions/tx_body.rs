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

use std::io::{self, Read, Write};

use super::{
    transaction_components::{Input, Kernel, Output, PegOutCoin},
    WeightParams,
};
use crate::{
    consensus::{invalid_data, ConsensusDecoding, ConsensusEncoding, Hashed},
    crypto::SignedMessage,
    types::{Hash, PublicKey, Signature},
};

/// Decode guard; far above anything a weight-valid body could hold.
const MAX_LIST_LEN: u64 = 1 << 20;

/// The component lists of a block or transaction. In Mimblewimble the two share one shape, since
/// aggregation makes a block just a big transaction. All four lists are kept in ascending order of
/// each element's hash.
#[derive(Debug, Clone)]
pub struct TxBody {
    sorted: bool,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    kernels: Vec<Kernel>,
    owner_signatures: Vec<SignedMessage>,
}

// the `sorted` memo is not part of a body's identity
impl PartialEq for TxBody {
    fn eq(&self, other: &Self) -> bool {
        self.inputs == other.inputs &&
            self.outputs == other.outputs &&
            self.kernels == other.kernels &&
            self.owner_signatures == other.owner_signatures
    }
}

impl TxBody {
    pub fn empty() -> TxBody {
        TxBody {
            sorted: true,
            inputs: vec![],
            outputs: vec![],
            kernels: vec![],
            owner_signatures: vec![],
        }
    }

    pub fn new(
        inputs: Vec<Input>,
        outputs: Vec<Output>,
        kernels: Vec<Kernel>,
        owner_signatures: Vec<SignedMessage>,
    ) -> TxBody {
        let mut body = TxBody {
            sorted: false,
            inputs,
            outputs,
            kernels,
            owner_signatures,
        };
        body.sort();
        body
    }

    /// Keeps the given order. Used by wire decoding (order is validated, not trusted) and by
    /// tests that need to present a misordered body.
    pub(crate) fn new_unsorted(
        inputs: Vec<Input>,
        outputs: Vec<Output>,
        kernels: Vec<Kernel>,
        owner_signatures: Vec<SignedMessage>,
    ) -> TxBody {
        TxBody {
            sorted: false,
            inputs,
            outputs,
            kernels,
            owner_signatures,
        }
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    pub fn owner_signatures(&self) -> &[SignedMessage] {
        &self.owner_signatures
    }

    pub fn dissolve(self) -> (Vec<Input>, Vec<Output>, Vec<Kernel>, Vec<SignedMessage>) {
        (self.inputs, self.outputs, self.kernels, self.owner_signatures)
    }

    /// Sorts each list by element hash. Serialization of a body is therefore independent of
    /// insertion order.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        self.inputs.sort_by_key(Hashed::hash);
        self.outputs.sort_by_key(Output::output_hash);
        self.kernels.sort_by_key(Hashed::hash);
        self.owner_signatures.sort_by_key(Hashed::hash);
        self.sorted = true;
    }

    pub fn total_fee(&self) -> u64 {
        self.kernels.iter().map(|k| k.fee).sum()
    }

    pub fn total_pegin(&self) -> u64 {
        self.kernels.iter().filter_map(|k| k.pegin).sum()
    }

    pub fn total_pegout(&self) -> u64 {
        self.kernels.iter().filter_map(|k| k.pegout.as_ref().map(|p| p.amount)).sum()
    }

    /// Net value entering (positive) or leaving (negative) the extension block, fees counted as
    /// leaving.
    pub fn supply_delta(&self) -> i128 {
        i128::from(self.total_pegin()) - i128::from(self.total_pegout()) - i128::from(self.total_fee())
    }

    pub fn pegin_kernels(&self) -> impl Iterator<Item = &Kernel> {
        self.kernels.iter().filter(|k| k.has_pegin())
    }

    pub fn pegout_coins(&self) -> Vec<PegOutCoin> {
        self.kernels.iter().filter_map(|k| k.pegout.clone()).collect()
    }

    pub fn extra_data_bytes(&self) -> usize {
        self.kernels.iter().map(|k| k.extra_data.len()).sum()
    }

    pub fn weight(&self, params: &WeightParams) -> u64 {
        params.calculate(
            self.inputs.len(),
            self.outputs.len(),
            self.kernels.len(),
            self.extra_data_bytes(),
        )
    }
}

impl ConsensusEncoding for TxBody {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        (self.inputs.len() as u64).consensus_encode(writer)?;
        (self.outputs.len() as u64).consensus_encode(writer)?;
        (self.kernels.len() as u64).consensus_encode(writer)?;
        (self.owner_signatures.len() as u64).consensus_encode(writer)?;
        for input in &self.inputs {
            input.consensus_encode(writer)?;
        }
        for output in &self.outputs {
            output.consensus_encode(writer)?;
        }
        for kernel in &self.kernels {
            kernel.consensus_encode(writer)?;
        }
        for signature in &self.owner_signatures {
            signature.consensus_encode(writer)?;
        }
        Ok(())
    }
}

impl ConsensusDecoding for TxBody {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let num_inputs = u64::consensus_decode(reader)?;
        let num_outputs = u64::consensus_decode(reader)?;
        let num_kernels = u64::consensus_decode(reader)?;
        let num_owner_sigs = u64::consensus_decode(reader)?;
        for count in [num_inputs, num_outputs, num_kernels, num_owner_sigs] {
            if count > MAX_LIST_LEN {
                return Err(invalid_data("body list length out of range"));
            }
        }
        let inputs = decode_list(reader, num_inputs)?;
        let outputs = decode_list(reader, num_outputs)?;
        let kernels = decode_list(reader, num_kernels)?;
        let owner_signatures = decode_list(reader, num_owner_sigs)?;
        // wire order is trusted only after the validator checks it
        Ok(TxBody::new_unsorted(inputs, outputs, kernels, owner_signatures))
    }
}

fn decode_list<R: Read, T: ConsensusDecoding>(reader: &mut R, count: u64) -> io::Result<Vec<T>> {
    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        items.push(T::consensus_decode(reader)?);
    }
    Ok(items)
}

impl ConsensusEncoding for SignedMessage {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.message_hash.consensus_encode(writer)?;
        self.public_key.consensus_encode(writer)?;
        self.signature.consensus_encode(writer)
    }
}

impl ConsensusDecoding for SignedMessage {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(SignedMessage {
            message_hash: Hash::consensus_decode(reader)?,
            public_key: PublicKey::consensus_decode(reader)?,
            signature: Signature::consensus_decode(reader)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::BlindingFactor;

    fn kernel(fee: u64) -> Kernel {
        Kernel::create(&BlindingFactor::random(), fee, None, None, None, vec![]).unwrap()
    }

    #[test]
    fn serialization_is_insertion_order_independent() {
        let k1 = kernel(1);
        let k2 = kernel(2);
        let k3 = kernel(3);

        let a = TxBody::new(vec![], vec![], vec![k1.clone(), k2.clone(), k3.clone()], vec![]);
        let b = TxBody::new(vec![], vec![], vec![k3, k1, k2], vec![]);
        assert_eq!(a.to_wire_bytes(), b.to_wire_bytes());
    }

    #[test]
    fn fee_and_peg_totals() {
        let mut pegin = kernel(0);
        pegin.pegin = Some(8_000_000);
        let body = TxBody::new(vec![], vec![], vec![kernel(500_000), pegin], vec![]);
        assert_eq!(body.total_fee(), 500_000);
        assert_eq!(body.total_pegin(), 8_000_000);
        assert_eq!(body.total_pegout(), 0);
        assert_eq!(body.supply_delta(), 8_000_000 - 500_000);
    }

    #[test]
    fn round_trip_preserves_sorted_lists() {
        let body = TxBody::new(vec![], vec![], vec![kernel(5), kernel(6)], vec![]);
        let decoded = TxBody::from_wire_bytes(&body.to_wire_bytes()).unwrap();
        assert_eq!(decoded.kernels().len(), 2);
        assert_eq!(decoded.to_wire_bytes(), body.to_wire_bytes());
    }
}
