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

use mweb_mmr::MerkleMountainRangeError;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ChainStorageError {
    #[error("Access to the backing store failed: {0}")]
    StorageFailure(String),
    #[error("Stored bytes are corrupt: {0}")]
    Serialization(String),
    #[error("Input references an output not in the MMR: {commitment}")]
    UnknownOutput { commitment: String },
    #[error("Input references an output already spent: {commitment}")]
    DoubleSpend { commitment: String },
    #[error("Output commitment already exists unspent: {commitment}")]
    DuplicateCommitment { commitment: String },
    #[error("Computed {tree} root disagrees with the header")]
    RootMismatch { tree: &'static str },
    #[error("Block failed validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("MMR failure: {0}")]
    Mmr(#[from] MerkleMountainRangeError),
    #[error("Invalid database operation: {0}")]
    InvalidOperation(String),
    #[error("Rebuilt state disagrees with the trusted state: {0}")]
    StateMismatch(String),
}
