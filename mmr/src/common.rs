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

//! Index arithmetic shared by all MMR views.

use std::fmt;

/// Dense, 0-based insertion number of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LeafIndex(pub u64);

/// Sparse post-order position of a node in the flat MMR array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeIndex(pub u64);

impl LeafIndex {
    /// The MMR node index at which this leaf is stored: `2L - popcount(L)`.
    pub fn node_index(self) -> NodeIndex {
        NodeIndex(2 * self.0 - u64::from(self.0.count_ones()))
    }

    pub fn next(self) -> LeafIndex {
        LeafIndex(self.0 + 1)
    }
}

impl NodeIndex {
    /// Height of this node in its mountain. Leaves have height 0.
    pub fn height(self) -> u64 {
        peak_map_height(self.0).1
    }

    pub fn is_leaf(self) -> bool {
        self.height() == 0
    }
}

impl fmt::Display for LeafIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total number of nodes in an MMR containing `leaf_count` leaves.
pub fn node_count(leaf_count: u64) -> u64 {
    if leaf_count == 0 {
        return 0;
    }
    2 * leaf_count - u64::from(leaf_count.count_ones())
}

/// Number of leaves in an MMR of `size` nodes.
pub fn leaf_count(size: u64) -> u64 {
    let (peaks, _) = peak_sizes_height(size);
    peaks.iter().map(|n| (n + 1) / 2).sum()
}

/// Post-order positions of all peaks in an MMR of `size` nodes, highest mountain first.
pub fn find_peaks(size: u64) -> Vec<NodeIndex> {
    if size == 0 {
        return vec![];
    }
    let mut peak_size = u64::MAX >> size.leading_zeros();
    let mut num_left = size;
    let mut sum_prev_peaks = 0;
    let mut peaks = vec![];
    while peak_size != 0 {
        if num_left >= peak_size {
            peaks.push(NodeIndex(sum_prev_peaks + peak_size - 1));
            sum_prev_peaks += peak_size;
            num_left -= peak_size;
        }
        peak_size >>= 1;
    }
    if num_left > 0 {
        // size does not describe a valid post-order traversal
        return vec![];
    }
    peaks
}

/// Returns `(peak_map, height)` for the node at 0-based position `pos`, where `peak_map` encodes
/// which peak heights existed in the MMR immediately before `pos` was appended. The peak map also
/// encodes the path from the root to the node, which drives the parent walk on append.
pub fn peak_map_height(mut pos: u64) -> (u64, u64) {
    if pos == 0 {
        return (0, 0);
    }
    let mut peak_size = u64::MAX >> pos.leading_zeros();
    let mut bitmap = 0;
    while peak_size != 0 {
        bitmap <<= 1;
        if pos >= peak_size {
            pos -= peak_size;
            bitmap |= 1;
        }
        peak_size >>= 1;
    }
    (bitmap, pos)
}

/// Sizes of the complete trees under each peak for an MMR of `size` nodes, plus the height of the
/// next node to be appended.
fn peak_sizes_height(size: u64) -> (Vec<u64>, u64) {
    if size == 0 {
        return (vec![], 0);
    }
    let mut peak_size = u64::MAX >> size.leading_zeros();
    let mut sizes = vec![];
    let mut size_left = size;
    while peak_size != 0 {
        if size_left >= peak_size {
            sizes.push(peak_size);
            size_left -= peak_size;
        }
        peak_size >>= 1;
    }
    (sizes, size_left)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn leaf_to_node_indices() {
        assert_eq!(LeafIndex(0).node_index(), NodeIndex(0));
        assert_eq!(LeafIndex(1).node_index(), NodeIndex(1));
        assert_eq!(LeafIndex(2).node_index(), NodeIndex(3));
        assert_eq!(LeafIndex(3).node_index(), NodeIndex(4));
        assert_eq!(LeafIndex(5).node_index(), NodeIndex(8));
        assert_eq!(LeafIndex(6).node_index(), NodeIndex(10));
        assert_eq!(LeafIndex(7).node_index(), NodeIndex(11));
        assert_eq!(LeafIndex(8).node_index(), NodeIndex(15));
    }

    #[test]
    fn node_counts() {
        assert_eq!(node_count(0), 0);
        assert_eq!(node_count(1), 1);
        assert_eq!(node_count(2), 3);
        assert_eq!(node_count(3), 4);
        assert_eq!(node_count(4), 7);
        assert_eq!(node_count(5), 8);
        assert_eq!(node_count(8), 15);
    }

    #[test]
    fn leaf_counts() {
        assert_eq!(leaf_count(0), 0);
        assert_eq!(leaf_count(1), 1);
        assert_eq!(leaf_count(3), 2);
        assert_eq!(leaf_count(4), 3);
        assert_eq!(leaf_count(8), 5);
        assert_eq!(leaf_count(10), 6);
        assert_eq!(leaf_count(11), 7);
        assert_eq!(leaf_count(15), 8);
    }

    #[test]
    fn peak_vectors() {
        assert_eq!(find_peaks(0), Vec::<NodeIndex>::new());
        assert_eq!(find_peaks(1), vec![NodeIndex(0)]);
        assert_eq!(find_peaks(3), vec![NodeIndex(2)]);
        assert_eq!(find_peaks(4), vec![NodeIndex(2), NodeIndex(3)]);
        assert_eq!(find_peaks(15), vec![NodeIndex(14)]);
        assert_eq!(find_peaks(23), vec![NodeIndex(14), NodeIndex(21), NodeIndex(22)]);
    }

    #[test]
    fn peak_map_heights() {
        assert_eq!(peak_map_height(0), (0, 0));
        assert_eq!(peak_map_height(4), (0b11, 0));
        assert_eq!(peak_map_height(9), (0b101, 1));
        assert_eq!(peak_map_height(10), (0b110, 0));
        assert_eq!(peak_map_height(12), (0b111, 1));
        assert_eq!(peak_map_height(33), (0b10001, 1));
        assert_eq!(peak_map_height(34), (0b10010, 0));
    }

    #[test]
    fn node_heights() {
        for pos in [0, 1, 3, 4, 7, 8, 10, 11] {
            assert!(NodeIndex(pos).is_leaf());
        }
        assert_eq!(NodeIndex(2).height(), 1);
        assert_eq!(NodeIndex(6).height(), 2);
        assert_eq!(NodeIndex(14).height(), 3);
    }
}
