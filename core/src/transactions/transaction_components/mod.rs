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

use bitflags::bitflags;

use crate::consensus::{ConsensusDecoding, ConsensusEncoding};

mod error;
mod input;
mod kernel;
mod output;
mod peg;

pub use error::TransactionError;
pub use input::Input;
pub use kernel::Kernel;
pub use output::{Output, OwnerData};
pub use peg::{Bech32Address, PegInCoin, PegOutCoin};

bitflags! {
    /// Options for an output's structure or use.
    pub struct OutputFeatures: u8 {
        /// The output mints value pegged in from the host chain.
        const PEGGED_IN = 0x01;
    }
}

impl Default for OutputFeatures {
    fn default() -> Self {
        OutputFeatures::empty()
    }
}

impl ConsensusEncoding for OutputFeatures {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.bits().consensus_encode(writer)
    }
}

impl ConsensusDecoding for OutputFeatures {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bits = u8::consensus_decode(reader)?;
        OutputFeatures::from_bits(bits)
            .ok_or_else(|| crate::consensus::invalid_data("unknown output feature bits"))
    }
}
