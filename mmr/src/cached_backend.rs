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

use crate::{backend::Backend, common::LeafIndex, Hash};

/// Read-only access to the committed nodes and leaves of a parent view. Reads below the append
/// frontier are safe while a writer extends the range (leaf stores are append-only).
pub trait NodeSource {
    type Error: std::error::Error;

    fn base_node_count(&self) -> Result<u64, Self::Error>;
    fn base_leaf_count(&self) -> Result<u64, Self::Error>;
    fn base_hash(&self, pos: u64) -> Result<Option<Hash>, Self::Error>;
    fn base_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// A copy-on-write [`Backend`] layered over a [`NodeSource`]: appends and truncations live only in
/// this layer until they are flushed, so a discarded cache never touches its parent.
///
/// Reads at positions below the overlay fall through to the parent; rewinding below the parent's
/// frontier merely lowers the visible counts, leaving the parent untouched.
pub struct CachedBackend<S> {
    source: S,
    /// First node position owned by the overlay. Starts at the parent frontier and only moves
    /// down when a rewind cuts into parent territory.
    overlay_node_start: u64,
    overlay_leaf_start: u64,
    node_count: u64,
    leaf_count: u64,
    nodes: Vec<Hash>,
    leaves: Vec<(Hash, Vec<u8>)>,
}

/// Dirty state drained out of a cache layer at flush time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendDelta {
    pub node_start: u64,
    pub leaf_start: u64,
    pub nodes: Vec<Hash>,
    pub leaves: Vec<(Hash, Vec<u8>)>,
}

impl<S: NodeSource> CachedBackend<S> {
    pub fn new(source: S) -> Result<Self, S::Error> {
        let node_count = source.base_node_count()?;
        let leaf_count = source.base_leaf_count()?;
        Ok(Self {
            source,
            overlay_node_start: node_count,
            overlay_leaf_start: leaf_count,
            node_count,
            leaf_count,
            nodes: Vec::new(),
            leaves: Vec::new(),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The overlay's dirty nodes and leaves plus where they splice into the parent.
    pub fn delta(&self) -> BackendDelta {
        BackendDelta {
            node_start: self.overlay_node_start,
            leaf_start: self.overlay_leaf_start,
            nodes: self.nodes.clone(),
            leaves: self.leaves.clone(),
        }
    }
}

impl<S: NodeSource> Backend for CachedBackend<S> {
    type Error = S::Error;

    fn node_count(&self) -> Result<u64, Self::Error> {
        Ok(self.node_count)
    }

    fn leaf_count(&self) -> Result<u64, Self::Error> {
        Ok(self.leaf_count)
    }

    fn get_hash(&self, pos: u64) -> Result<Option<Hash>, Self::Error> {
        if pos >= self.node_count {
            return Ok(None);
        }
        if pos >= self.overlay_node_start {
            return Ok(self.nodes.get((pos - self.overlay_node_start) as usize).copied());
        }
        self.source.base_hash(pos)
    }

    fn push_hash(&mut self, hash: Hash) -> Result<(), Self::Error> {
        self.nodes.push(hash);
        self.node_count += 1;
        Ok(())
    }

    fn get_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error> {
        if index.0 >= self.leaf_count {
            return Ok(None);
        }
        if index.0 >= self.overlay_leaf_start {
            return Ok(self
                .leaves
                .get((index.0 - self.overlay_leaf_start) as usize)
                .map(|(_, data)| data.clone()));
        }
        self.source.base_leaf(index)
    }

    fn push_leaf(&mut self, hash: Hash, data: Vec<u8>) -> Result<(), Self::Error> {
        self.leaves.push((hash, data));
        self.leaf_count += 1;
        Ok(())
    }

    fn truncate(&mut self, node_count: u64, leaf_count: u64) -> Result<(), Self::Error> {
        if node_count < self.overlay_node_start {
            self.overlay_node_start = node_count;
            self.nodes.clear();
        } else {
            self.nodes.truncate((node_count - self.overlay_node_start) as usize);
        }
        if leaf_count < self.overlay_leaf_start {
            self.overlay_leaf_start = leaf_count;
            self.leaves.clear();
        } else {
            self.leaves.truncate((leaf_count - self.overlay_leaf_start) as usize);
        }
        self.node_count = node_count;
        self.leaf_count = leaf_count;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use blake2::Blake2b;
    use digest::consts::U32;

    use super::*;
    use crate::{backend::VecBackend, MerkleMountainRange};

    impl NodeSource for VecBackend {
        type Error = std::convert::Infallible;

        fn base_node_count(&self) -> Result<u64, Self::Error> {
            self.node_count()
        }

        fn base_leaf_count(&self) -> Result<u64, Self::Error> {
            self.leaf_count()
        }

        fn base_hash(&self, pos: u64) -> Result<Option<Hash>, Self::Error> {
            self.get_hash(pos)
        }

        fn base_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, Self::Error> {
            self.get_leaf(index)
        }
    }

    type BaseMmr = MerkleMountainRange<Blake2b<U32>, VecBackend>;
    type CachedMmr = MerkleMountainRange<Blake2b<U32>, CachedBackend<VecBackend>>;

    fn base_with(leaves: u64) -> VecBackend {
        let mut mmr = BaseMmr::new(VecBackend::new());
        for i in 0..leaves {
            mmr.push(vec![i as u8, 7]).unwrap();
        }
        mmr.into_backend()
    }

    #[test]
    fn cached_view_matches_base_root() {
        let base = base_with(9);
        let base_root = BaseMmr::new(base.clone()).root().unwrap();
        let cached = CachedMmr::new(CachedBackend::new(base).unwrap());
        assert_eq!(cached.root().unwrap(), base_root);
    }

    #[test]
    fn appends_stay_in_overlay() {
        let base = base_with(5);
        let mut cached = CachedMmr::new(CachedBackend::new(base.clone()).unwrap());
        cached.push(vec![42]).unwrap();
        cached.push(vec![43]).unwrap();
        assert_eq!(cached.leaf_count().unwrap(), 7);

        // base unchanged
        assert_eq!(BaseMmr::new(base.clone()).leaf_count().unwrap(), 5);

        // overlay root equals a from-scratch MMR with the same leaves
        let mut scratch = BaseMmr::new(VecBackend::new());
        for i in 0..5u64 {
            scratch.push(vec![i as u8, 7]).unwrap();
        }
        scratch.push(vec![42]).unwrap();
        scratch.push(vec![43]).unwrap();
        assert_eq!(cached.root().unwrap(), scratch.root().unwrap());
    }

    #[test]
    fn rewind_below_parent_frontier() {
        let base = base_with(8);
        let mut cached = CachedMmr::new(CachedBackend::new(base).unwrap());
        cached.rewind(3).unwrap();

        let mut scratch = BaseMmr::new(VecBackend::new());
        for i in 0..3u64 {
            scratch.push(vec![i as u8, 7]).unwrap();
        }
        assert_eq!(cached.root().unwrap(), scratch.root().unwrap());

        // appending after the deep rewind keeps working
        cached.push(vec![99]).unwrap();
        scratch.push(vec![99]).unwrap();
        assert_eq!(cached.root().unwrap(), scratch.root().unwrap());
    }

    #[test]
    fn delta_tracks_only_overlay_writes() {
        let base = base_with(4);
        let mut cached = CachedMmr::new(CachedBackend::new(base).unwrap());
        cached.push(vec![1, 2, 3]).unwrap();
        let delta = cached.backend().delta();
        assert_eq!(delta.leaf_start, 4);
        assert_eq!(delta.leaves.len(), 1);
        assert_eq!(delta.leaves[0].1, vec![1, 2, 3]);
        assert!(!delta.nodes.is_empty());
    }
}
