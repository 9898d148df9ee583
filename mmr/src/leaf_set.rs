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

use std::{fs, io::Write, path::Path};

use croaring::Bitmap;
use digest::{consts::U32, Digest};

use crate::{common::LeafIndex, error::MerkleMountainRangeError, Hash};

/// Bitmap of the output leaves that are currently unspent. Indexed by [`LeafIndex`]; its set-bit
/// count equals the UTXO cardinality at the tip it describes.
///
/// The committed root digests the dense bitmap bytes (bit `i` = leaf `i` unspent), so the root is
/// independent of the in-memory representation. Each cache layer carries its own copy-on-write
/// clone of the bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSet {
    bitmap: Bitmap,
}

impl Default for LeafSet {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafSet {
    pub fn new() -> Self {
        Self {
            bitmap: Bitmap::create(),
        }
    }

    /// Reads a persisted bitmap from `<dir>/leafset.<file_index>.bin`. A missing file is an empty
    /// set (fresh chain).
    pub fn open(dir: &Path, file_index: u32) -> Result<Self, MerkleMountainRangeError> {
        let path = Self::file_path(dir, file_index);
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(&path).map_err(|e| MerkleMountainRangeError::CorruptBitmap(e.to_string()))?;
        let mut bitmap = Bitmap::create();
        for (byte_idx, byte) in bytes.iter().enumerate() {
            for bit in 0..8 {
                if byte & (0x80 >> bit) != 0 {
                    bitmap.add((byte_idx * 8 + bit) as u32);
                }
            }
        }
        Ok(Self { bitmap })
    }

    /// Writes the dense bitmap to `<dir>/leafset.<file_index>.bin`. Callers bump the file index on
    /// every flush so a torn write can never corrupt the committed file.
    pub fn flush(&self, dir: &Path, file_index: u32) -> Result<(), MerkleMountainRangeError> {
        fs::create_dir_all(dir).map_err(|e| MerkleMountainRangeError::BackendError(e.to_string()))?;
        let mut file = fs::File::create(Self::file_path(dir, file_index))
            .map_err(|e| MerkleMountainRangeError::BackendError(e.to_string()))?;
        file.write_all(&self.to_bytes())
            .map_err(|e| MerkleMountainRangeError::BackendError(e.to_string()))?;
        file.sync_all().map_err(|e| MerkleMountainRangeError::BackendError(e.to_string()))?;
        Ok(())
    }

    fn file_path(dir: &Path, file_index: u32) -> std::path::PathBuf {
        dir.join(format!("leafset.{}.bin", file_index))
    }

    pub fn add(&mut self, index: LeafIndex) {
        self.bitmap.add(index.0 as u32);
    }

    pub fn remove(&mut self, index: LeafIndex) {
        self.bitmap.remove(index.0 as u32);
    }

    pub fn contains(&self, index: LeafIndex) -> bool {
        self.bitmap.contains(index.0 as u32)
    }

    /// Number of unspent leaves.
    pub fn len(&self) -> u64 {
        self.bitmap.cardinality()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap.cardinality() == 0
    }

    /// Clears every bit at or beyond `leaf_count`, matching an MMR rewound to that many leaves.
    pub fn rewind(&mut self, leaf_count: u64) {
        for idx in self.bitmap.to_vec() {
            if u64::from(idx) >= leaf_count {
                self.bitmap.remove(idx);
            }
        }
    }

    /// Dense big-endian-bit bytes: bit `i` of the stream is leaf `i`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let indices = self.bitmap.to_vec();
        let max = match indices.last() {
            Some(max) => *max,
            None => return vec![],
        };
        let mut bytes = vec![0u8; max as usize / 8 + 1];
        for idx in indices {
            bytes[idx as usize / 8] |= 0x80 >> (idx % 8);
        }
        bytes
    }

    /// 32-byte digest of the dense bitmap, committed to by the block header.
    pub fn root<D: Digest<OutputSize = U32>>(&self) -> Hash {
        D::new().chain_update(self.to_bytes()).finalize().into()
    }
}

#[cfg(test)]
mod test {
    use blake2::Blake2b;
    use digest::consts::U32;

    use super::*;

    type D = Blake2b<U32>;

    #[test]
    fn add_remove_contains() {
        let mut set = LeafSet::new();
        set.add(LeafIndex(0));
        set.add(LeafIndex(5));
        assert!(set.contains(LeafIndex(0)));
        assert!(set.contains(LeafIndex(5)));
        assert!(!set.contains(LeafIndex(1)));
        assert_eq!(set.len(), 2);
        set.remove(LeafIndex(5));
        assert!(!set.contains(LeafIndex(5)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn root_is_representation_independent() {
        let mut a = LeafSet::new();
        a.add(LeafIndex(1));
        a.add(LeafIndex(9));

        let mut b = LeafSet::new();
        b.add(LeafIndex(9));
        b.add(LeafIndex(1));
        b.add(LeafIndex(4));
        b.remove(LeafIndex(4));

        assert_eq!(a.root::<D>(), b.root::<D>());
    }

    #[test]
    fn rewind_clears_later_bits() {
        let mut set = LeafSet::new();
        for i in [0u64, 3, 4, 7, 12] {
            set.add(LeafIndex(i));
        }
        set.rewind(5);
        assert!(set.contains(LeafIndex(0)));
        assert!(set.contains(LeafIndex(3)));
        assert!(set.contains(LeafIndex(4)));
        assert!(!set.contains(LeafIndex(7)));
        assert!(!set.contains(LeafIndex(12)));
    }

    #[test]
    fn bitmap_bytes_layout() {
        let mut set = LeafSet::new();
        set.add(LeafIndex(0));
        set.add(LeafIndex(9));
        assert_eq!(set.to_bytes(), vec![0b1000_0000, 0b0100_0000]);
        assert_eq!(LeafSet::new().to_bytes(), Vec::<u8>::new());
    }

    #[test]
    fn file_round_trip() {
        let dir = std::env::temp_dir().join(format!("mweb_leafset_test_{}", std::process::id()));
        let mut set = LeafSet::new();
        for i in [1u64, 2, 30, 31, 64] {
            set.add(LeafIndex(i));
        }
        set.flush(&dir, 3).unwrap();
        let restored = LeafSet::open(&dir, 3).unwrap();
        assert_eq!(restored, set);
        assert_eq!(restored.root::<D>(), set.root::<D>());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_empty_set() {
        let dir = std::env::temp_dir().join("mweb_leafset_test_missing");
        let set = LeafSet::open(&dir, 7).unwrap();
        assert!(set.is_empty());
    }
}
