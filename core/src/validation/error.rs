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

use thiserror::Error;

use crate::{crypto::CryptoError, transactions::transaction_components::TransactionError};

/// A consensus rule failed. Fatal: the block or transaction is rejected without mutating state.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Malformed bytes: {0}")]
    Serialization(String),
    #[error("Crypto failure during validation: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Body carries no kernels")]
    EmptyBody,
    #[error("Duplicate or unsorted input in body")]
    UnsortedOrDuplicateInput,
    #[error("Duplicate or unsorted output in body")]
    UnsortedOrDuplicateOutput,
    #[error("Duplicate or unsorted kernel in body")]
    UnsortedOrDuplicateKernel,
    #[error("Duplicate or unsorted owner signature in body")]
    UnsortedOrDuplicateOwnerSignature,
    #[error("Input commitment also appears as a new output")]
    InputSpendsNewOutput,
    #[error("Block weight {actual} exceeds maximum {max}")]
    BlockTooLarge { actual: u64, max: u64 },
    #[error("Commitments do not sum to the kernel excesses plus offset")]
    InvalidKernelSums,
    #[error("Ownership keys do not sum to the owner signatures plus offset")]
    InvalidOwnerSums,
    #[error("Block hash does not match the hash committed by the host block")]
    HashMismatch,
    #[error("Peg-in kernels do not match the host block's peg-in coins")]
    PegInMismatch,
    #[error("Peg-out kernels do not match the host block's peg-out coins")]
    PegOutMismatch,
    #[error("Peg-out address has HRP '{actual}', expected '{expected}'")]
    InvalidAddress { expected: String, actual: String },
    #[error("Header at height {height} does not extend tip at height {tip}")]
    HeightMismatch { height: u64, tip: u64 },
    #[error("Kernel is locked until height {lock_height}, block is at {height}")]
    KernelLockHeight { lock_height: u64, height: u64 },
}
