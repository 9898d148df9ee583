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

use mweb_core::types::{BlindingFactor, Commitment, Hash, SecretKey};

/// A spendable output recovered by rewinding: the full opening of the commitment plus the
/// one-time key able to spend it. Everything here is reproducible from the master seed and the
/// chain, which is what makes restore-from-seed work.
#[derive(Debug, Clone)]
pub struct Coin {
    /// Which of our addresses received it.
    pub address_index: u32,
    pub amount: u64,
    pub blind: BlindingFactor,
    /// One-time secret key for the output's receiver pubkey.
    pub spend_key: SecretKey,
    /// The output's commitment, which identifies it on chain.
    pub commitment: Commitment,
    pub pegged_in: bool,
    /// Height of the block that created it; `None` while only seen in the mempool.
    pub included_height: Option<u64>,
    /// Hash of the transaction or block that spent it, once observed.
    pub spent_by: Option<Hash>,
}

impl Coin {
    pub fn is_unspent(&self) -> bool {
        self.spent_by.is_none()
    }

    /// Depth at the given tip; 1 means included in the tip block itself.
    pub fn depth(&self, tip_height: u64) -> Option<u64> {
        self.included_height
            .and_then(|h| tip_height.checked_sub(h).map(|d| d + 1))
    }
}
