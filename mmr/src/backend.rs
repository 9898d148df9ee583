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

use crate::{common::LeafIndex, Hash};

/// Storage contract for an MMR: a table of node hashes keyed by post-order node index, plus an
/// append-only store of raw leaf data keyed by leaf index. Implementations decide how either is
/// actually kept (vectors, a K/V store, an overlay on a parent view).
pub trait Backend {
    type Error: std::error::Error;

    /// Number of nodes (not leaves) stored.
    fn node_count(&self) -> Result<u64, Self::Error>;

    /// Number of leaves stored.
    fn leaf_count(&self) -> Result<u64, Self::Error>;

    /// The hash at the given node index, if present.
    fn get_hash(&self, pos: u64) -> Result<Option<Hash>, Self::Error>;

    /// Append a node hash at the next node index.
    fn push_hash(&mut self, hash: Hash) -> Result<(), Self::Error>;

    /// The raw data of the given leaf, if present.
    fn get_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Append a leaf (its hash and raw data) at the next leaf index.
    fn push_leaf(&mut self, hash: Hash, data: Vec<u8>) -> Result<(), Self::Error>;

    /// Drop all nodes at index >= `node_count` and all leaves at index >= `leaf_count`.
    fn truncate(&mut self, node_count: u64, leaf_count: u64) -> Result<(), Self::Error>;
}

/// A vector-based [`Backend`]. Used for tests and for ephemeral MMRs rebuilt from scratch.
#[derive(Debug, Clone, Default)]
pub struct VecBackend {
    hashes: Vec<Hash>,
    leaves: Vec<(Hash, Vec<u8>)>,
}

impl VecBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for VecBackend {
    type Error = std::convert::Infallible;

    fn node_count(&self) -> Result<u64, Self::Error> {
        Ok(self.hashes.len() as u64)
    }

    fn leaf_count(&self) -> Result<u64, Self::Error> {
        Ok(self.leaves.len() as u64)
    }

    fn get_hash(&self, pos: u64) -> Result<Option<Hash>, Self::Error> {
        Ok(self.hashes.get(pos as usize).copied())
    }

    fn push_hash(&mut self, hash: Hash) -> Result<(), Self::Error> {
        self.hashes.push(hash);
        Ok(())
    }

    fn get_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.leaves.get(index.0 as usize).map(|(_, data)| data.clone()))
    }

    fn push_leaf(&mut self, hash: Hash, data: Vec<u8>) -> Result<(), Self::Error> {
        self.leaves.push((hash, data));
        Ok(())
    }

    fn truncate(&mut self, node_count: u64, leaf_count: u64) -> Result<(), Self::Error> {
        self.hashes.truncate(node_count as usize);
        self.leaves.truncate(leaf_count as usize);
        Ok(())
    }
}
