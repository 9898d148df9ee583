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

use super::OutputFeatures;
use crate::{
    consensus::{ConsensusDecoding, ConsensusEncoding},
    types::Commitment,
};

/// A reference, by commitment, to an existing unspent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    pub features: OutputFeatures,
    pub commitment: Commitment,
}

impl Input {
    pub fn new(features: OutputFeatures, commitment: Commitment) -> Self {
        Self { features, commitment }
    }
}

impl ConsensusEncoding for Input {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.features.consensus_encode(writer)?;
        self.commitment.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Input {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            features: OutputFeatures::consensus_decode(reader)?,
            commitment: Commitment::consensus_decode(reader)?,
        })
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Input({})", hex::encode(self.commitment.0))
    }
}
