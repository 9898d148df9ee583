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

use std::marker::PhantomData;

use digest::{consts::U32, Digest};

use crate::{
    backend::Backend,
    common::{find_peaks, node_count, peak_map_height, LeafIndex},
    error::MerkleMountainRangeError,
    Hash,
};

/// An append-only Merkle Mountain Range over a pluggable [`Backend`].
///
/// Hashing scheme:
/// * leaf hash `= D(leaf_index_u64_be ‖ data)`;
/// * parent hash `= D(height_u8 ‖ left ‖ right)`;
/// * root `= D(node_count_u64_be ‖ peak_hashes, highest mountain first)`.
pub struct MerkleMountainRange<D, B> {
    backend: B,
    _digest: PhantomData<D>,
}

impl<D, B> MerkleMountainRange<D, B>
where
    D: Digest<OutputSize = U32>,
    B: Backend,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            _digest: PhantomData,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw backend access for splicing a flushed overlay; bypasses leaf hashing, so callers must
    /// only feed it nodes produced by another MMR of this crate.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn leaf_count(&self) -> Result<u64, MerkleMountainRangeError> {
        self.backend.leaf_count().map_err(backend_err)
    }

    pub fn get_leaf(&self, index: LeafIndex) -> Result<Option<Vec<u8>>, MerkleMountainRangeError> {
        self.backend.get_leaf(index).map_err(backend_err)
    }

    pub fn get_leaf_hash(&self, index: LeafIndex) -> Result<Option<Hash>, MerkleMountainRangeError> {
        self.backend.get_hash(index.node_index().0).map_err(backend_err)
    }

    /// Appends a leaf and every interior node it completes. Returns the new leaf's index.
    pub fn push(&mut self, data: Vec<u8>) -> Result<LeafIndex, MerkleMountainRangeError> {
        let leaf_index = LeafIndex(self.leaf_count()?);
        let mut pos = self.backend.node_count().map_err(backend_err)?;

        let leaf_hash = hash_leaf::<D>(leaf_index, &data);
        self.backend.push_leaf(leaf_hash, data).map_err(backend_err)?;
        self.backend.push_hash(leaf_hash).map_err(backend_err)?;

        // Each bit set in the peak map marks a mountain the new node merges with on its way up.
        let (peak_map, _) = peak_map_height(pos);
        let mut current = leaf_hash;
        let mut peak = 1u64;
        let mut height = 1u8;
        while peak_map & peak != 0 {
            let left_pos = pos + 1 - 2 * peak;
            let left = self
                .backend
                .get_hash(left_pos)
                .map_err(backend_err)?
                .ok_or(MerkleMountainRangeError::HashNotFound(left_pos))?;
            current = hash_parent::<D>(height, &left, &current);
            self.backend.push_hash(current).map_err(backend_err)?;
            pos += 1;
            peak <<= 1;
            height += 1;
        }

        Ok(leaf_index)
    }

    /// Bags the peaks into the committed root.
    pub fn root(&self) -> Result<Hash, MerkleMountainRangeError> {
        let size = self.backend.node_count().map_err(backend_err)?;
        let mut hasher = D::new();
        hasher.update(size.to_be_bytes());
        for peak in find_peaks(size) {
            let hash = self
                .backend
                .get_hash(peak.0)
                .map_err(backend_err)?
                .ok_or(MerkleMountainRangeError::HashNotFound(peak.0))?;
            hasher.update(hash);
        }
        Ok(hasher.finalize().into())
    }

    /// Truncates the range back to `leaf_count` leaves, dropping all later leaves and any
    /// interior node built above them.
    pub fn rewind(&mut self, leaf_count: u64) -> Result<(), MerkleMountainRangeError> {
        let current = self.leaf_count()?;
        if leaf_count > current {
            return Err(MerkleMountainRangeError::InvalidRewind {
                requested: leaf_count,
                current,
            });
        }
        self.backend
            .truncate(node_count(leaf_count), leaf_count)
            .map_err(backend_err)
    }
}

pub(crate) fn hash_leaf<D: Digest<OutputSize = U32>>(index: LeafIndex, data: &[u8]) -> Hash {
    D::new().chain_update(index.0.to_be_bytes()).chain_update(data).finalize().into()
}

pub(crate) fn hash_parent<D: Digest<OutputSize = U32>>(height: u8, left: &Hash, right: &Hash) -> Hash {
    D::new().chain_update([height]).chain_update(left).chain_update(right).finalize().into()
}

fn backend_err<E: std::error::Error>(err: E) -> MerkleMountainRangeError {
    MerkleMountainRangeError::BackendError(err.to_string())
}

#[cfg(test)]
mod test {
    use blake2::Blake2b;
    use digest::consts::U32;

    use super::*;
    use crate::backend::VecBackend;

    type TestMmr = MerkleMountainRange<Blake2b<U32>, VecBackend>;

    fn mmr_with(leaves: u64) -> TestMmr {
        let mut mmr = TestMmr::new(VecBackend::new());
        for i in 0..leaves {
            mmr.push(vec![i as u8; 4]).unwrap();
        }
        mmr
    }

    #[test]
    fn empty_root_is_deterministic() {
        let a = mmr_with(0).root().unwrap();
        let b = mmr_with(0).root().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn root_depends_only_on_leaves() {
        for n in [1u64, 2, 3, 7, 8, 11] {
            assert_eq!(mmr_with(n).root().unwrap(), mmr_with(n).root().unwrap());
            assert_ne!(mmr_with(n).root().unwrap(), mmr_with(n + 1).root().unwrap());
        }
    }

    #[test]
    fn push_returns_dense_indices() {
        let mut mmr = TestMmr::new(VecBackend::new());
        for i in 0..20u64 {
            assert_eq!(mmr.push(vec![1]).unwrap(), LeafIndex(i));
        }
        assert_eq!(mmr.leaf_count().unwrap(), 20);
    }

    #[test]
    fn rewind_restores_previous_root() {
        let mut mmr = mmr_with(7);
        let root_at_7 = mmr.root().unwrap();
        for i in 0..5u8 {
            mmr.push(vec![100 + i]).unwrap();
        }
        assert_ne!(mmr.root().unwrap(), root_at_7);
        mmr.rewind(7).unwrap();
        assert_eq!(mmr.root().unwrap(), root_at_7);
        assert_eq!(mmr.leaf_count().unwrap(), 7);
    }

    #[test]
    fn rewind_to_current_size_is_identity() {
        let mut mmr = mmr_with(6);
        let root = mmr.root().unwrap();
        mmr.rewind(6).unwrap();
        assert_eq!(mmr.root().unwrap(), root);
    }

    #[test]
    fn rewind_past_end_fails() {
        let mut mmr = mmr_with(3);
        assert!(matches!(
            mmr.rewind(4),
            Err(MerkleMountainRangeError::InvalidRewind { .. })
        ));
    }

    #[test]
    fn leaf_data_round_trips() {
        let mut mmr = TestMmr::new(VecBackend::new());
        let idx = mmr.push(b"kernel bytes".to_vec()).unwrap();
        assert_eq!(mmr.get_leaf(idx).unwrap().unwrap(), b"kernel bytes".to_vec());
        assert!(mmr.get_leaf(LeafIndex(1)).unwrap().is_none());
    }
}
