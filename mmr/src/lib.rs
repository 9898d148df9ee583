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

//! # Merkle Mountain Ranges
//!
//! A Merkle mountain range (MMR) is an append-only binary tree in which every parent is the hash of
//! its two children. Because only the largest possible complete binary trees are ever kept, an MMR
//! of arbitrary size is a row of "mountains" whose peaks are bagged together into a single root.
//!
//! The whole structure is stored as a flat, post-order list of nodes:
//!
//! ```plaintext
//!         6
//!       /  \
//!      /    \
//!     2      5
//!    / \    / \
//!   0   1  3   4
//! ```
//!
//! Two index spaces are used throughout and must never be confused:
//!
//! * [`NodeIndex`] — the sparse post-order position of a node in the flat list above;
//! * [`LeafIndex`] — the dense, 0-based insertion number of a leaf.
//!
//! The extension-block engine maintains one MMR per committed data set (kernels, outputs, range
//! proofs) plus a [`LeafSet`] bitmap marking which output leaves are still unspent. Leaves are
//! never removed from an MMR once appended; spending an output merely clears its LeafSet bit.

pub type Hash = [u8; 32];

mod backend;
mod cached_backend;
pub mod common;
mod error;
mod leaf_set;
mod merkle_mountain_range;

pub use backend::{Backend, VecBackend};
pub use cached_backend::{BackendDelta, CachedBackend, NodeSource};
pub use common::{LeafIndex, NodeIndex};
pub use error::MerkleMountainRangeError;
pub use leaf_set::LeafSet;
pub use merkle_mountain_range::MerkleMountainRange;
