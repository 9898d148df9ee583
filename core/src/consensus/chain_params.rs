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

use serde::{Deserialize, Serialize};

use crate::transactions::WeightParams;

/// Immutable chain parameters, constructed once at node initialization and threaded explicitly
/// through the validator, wallet and builders. There are no compiled-in defaults: every network
/// names its own values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainParams {
    /// Human-readable part of bech32 addresses on this network.
    pub hrp: String,
    /// Confirmations before a pegged-in output may be spent.
    pub pegin_maturity: u32,
    /// Upper bound on a block body's weight.
    pub max_block_weight: u64,
    pub weight: WeightParams,
}

impl ChainParams {
    pub fn new(hrp: impl Into<String>, pegin_maturity: u32, max_block_weight: u64, weight: WeightParams) -> Self {
        Self {
            hrp: hrp.into(),
            pegin_maturity,
            max_block_weight,
            weight,
        }
    }
}
