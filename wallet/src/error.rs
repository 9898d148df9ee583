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

use mweb_core::{chain_storage::ChainStorageError, crypto::CryptoError, transactions::transaction_components::TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Crypto failure: {0}")]
    Crypto(#[from] CryptoError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Chain access failed: {0}")]
    Chain(#[from] ChainStorageError),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Not enough spendable coins: need {required}, have {available}")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("The output does not belong to this wallet")]
    NotOurOutput,
    #[error("No tracked coin with commitment {0}")]
    UnknownCoin(String),
    #[error("Wallet storage failed: {0}")]
    Storage(String),
    #[error("Master seed is unusable: {0}")]
    InvalidSeed(String),
}
