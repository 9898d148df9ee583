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

use crate::{
    consensus::{ConsensusDecoding, ConsensusEncoding, Hashed},
    transactions::TxBody,
    types::{BlindingFactor, Hash},
};

/// Commits to the extension-block state after this block: the four authenticated-structure roots
/// plus the running offset totals. Headers chain by height and linked roots; there is no
/// prev-hash field.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub height: u64,
    pub output_root: Hash,
    pub rangeproof_root: Hash,
    pub kernel_root: Hash,
    pub leafset_root: Hash,
    /// Total kernel offset accumulated over all blocks up to and including this one.
    pub kernel_offset: BlindingFactor,
    /// Total owner offset, accumulated the same way.
    pub owner_offset: BlindingFactor,
}

impl ConsensusEncoding for Header {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.height.consensus_encode(writer)?;
        self.output_root.consensus_encode(writer)?;
        self.rangeproof_root.consensus_encode(writer)?;
        self.kernel_root.consensus_encode(writer)?;
        self.leafset_root.consensus_encode(writer)?;
        self.kernel_offset.consensus_encode(writer)?;
        self.owner_offset.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Header {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Header {
            height: u64::consensus_decode(reader)?,
            output_root: Hash::consensus_decode(reader)?,
            rangeproof_root: Hash::consensus_decode(reader)?,
            kernel_root: Hash::consensus_decode(reader)?,
            leafset_root: Hash::consensus_decode(reader)?,
            kernel_offset: BlindingFactor::consensus_decode(reader)?,
            owner_offset: BlindingFactor::consensus_decode(reader)?,
        })
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header(height: {}, hash: {})", self.height, self.hash())
    }
}

/// An extension block: a header plus the aggregate body the host chain reached consensus on.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    header: Header,
    body: TxBody,
}

impl Block {
    pub fn new(header: Header, mut body: TxBody) -> Block {
        body.sort();
        Block { header, body }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn total_fee(&self) -> u64 {
        self.body.total_fee()
    }

    /// A block is identified by its header hash.
    pub fn block_hash(&self) -> Hash {
        self.header.hash()
    }
}

impl ConsensusEncoding for Block {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.header.consensus_encode(writer)?;
        self.body.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Block {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Block {
            header: Header::consensus_decode(reader)?,
            body: TxBody::consensus_decode(reader)?,
        })
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.block_hash())
    }
}
