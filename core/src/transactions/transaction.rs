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

use std::{
    fmt,
    io::{self, Read, Write},
};

use super::TxBody;
use crate::{
    consensus::{ConsensusDecoding, ConsensusEncoding},
    types::BlindingFactor,
};

/// A confidential transaction: two aggregate offsets plus the sorted component lists.
///
/// The kernel offset keeps the sum of kernel excesses from equalling the sum of commitments
/// directly (which would link inputs to outputs); the owner offset does the same for the
/// ownership keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub kernel_offset: BlindingFactor,
    pub owner_offset: BlindingFactor,
    body: TxBody,
}

impl Transaction {
    pub fn new(kernel_offset: BlindingFactor, owner_offset: BlindingFactor, mut body: TxBody) -> Transaction {
        body.sort();
        Transaction {
            kernel_offset,
            owner_offset,
            body,
        }
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn into_body(self) -> TxBody {
        self.body
    }

    pub fn total_fee(&self) -> u64 {
        self.body.total_fee()
    }
}

impl ConsensusEncoding for Transaction {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.kernel_offset.consensus_encode(writer)?;
        self.owner_offset.consensus_encode(writer)?;
        self.body.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Transaction {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Transaction {
            kernel_offset: BlindingFactor::consensus_decode(reader)?,
            owner_offset: BlindingFactor::consensus_decode(reader)?,
            body: TxBody::consensus_decode(reader)?,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transaction(inputs: {}, outputs: {}, kernels: {}, fee: {})",
            self.body.inputs().len(),
            self.body.outputs().len(),
            self.body.kernels().len(),
            self.total_fee(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::TxBuilder;

    #[test]
    fn transaction_round_trips() {
        let tx = TxBuilder::new()
            .add_input(5_000_000)
            .add_output(4_500_000)
            .add_plain_kernel(500_000)
            .build()
            .unwrap();
        let decoded = Transaction::from_wire_bytes(&tx.to_wire_bytes()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.total_fee(), 500_000);
    }
}
