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

//! Deterministic key derivation from the host-provided master seed. Fixed scan and spend
//! branches, with per-address spend keys `spend_key(i) = spend_secret · H(i)`.

use mweb_core::{
    crypto,
    types::{PublicKey, SecretKey},
};

use crate::{error::WalletError, stealth::StealthAddress};

/// Change returns here.
pub const CHANGE_INDEX: u32 = 0;
/// Peg-in outputs are addressed here.
pub const PEGIN_INDEX: u32 = 1;

const SCAN_BRANCH: &[u8] = b"mweb/keychain/scan";
const SPEND_BRANCH: &[u8] = b"mweb/keychain/spend";
const INDEX_BRANCH: &[u8] = b"mweb/keychain/index";

#[derive(Clone)]
pub struct Keychain {
    scan_secret: SecretKey,
    spend_secret: SecretKey,
}

impl Keychain {
    pub fn from_seed(seed: &[u8]) -> Result<Self, WalletError> {
        Ok(Self {
            scan_secret: derive_branch(SCAN_BRANCH, seed)?,
            spend_secret: derive_branch(SPEND_BRANCH, seed)?,
        })
    }

    pub fn scan_secret(&self) -> &SecretKey {
        &self.scan_secret
    }

    /// `A = scan_secret·G`, shared by every address of this wallet.
    pub fn scan_pubkey(&self) -> Result<PublicKey, WalletError> {
        Ok(crypto::public_key(&self.scan_secret)?)
    }

    /// `spend_key(i) = spend_secret · H(i)`.
    pub fn spend_key(&self, index: u32) -> Result<SecretKey, WalletError> {
        let tweak = crypto::hash_to_scalar(&[INDEX_BRANCH, &index.to_be_bytes()].concat())
            .map_err(|e| WalletError::InvalidSeed(e.to_string()))?;
        Ok(crypto::mul_secret_keys(&self.spend_secret, &tweak)?)
    }

    /// `Addr(i) = (A, B_i) = (scan_secret·G, spend_key(i)·G)`.
    pub fn address(&self, index: u32) -> Result<StealthAddress, WalletError> {
        Ok(StealthAddress::new(
            self.scan_pubkey()?,
            crypto::public_key(&self.spend_key(index)?)?,
        ))
    }
}

fn derive_branch(branch: &[u8], seed: &[u8]) -> Result<SecretKey, WalletError> {
    crypto::hash_to_scalar(&[branch, seed].concat()).map_err(|e| WalletError::InvalidSeed(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = Keychain::from_seed(b"seed bytes").unwrap();
        let b = Keychain::from_seed(b"seed bytes").unwrap();
        assert_eq!(a.scan_secret(), b.scan_secret());
        assert_eq!(a.spend_key(7).unwrap(), b.spend_key(7).unwrap());
        assert_eq!(a.address(0).unwrap(), b.address(0).unwrap());
    }

    #[test]
    fn different_seeds_diverge() {
        let a = Keychain::from_seed(b"seed one").unwrap();
        let b = Keychain::from_seed(b"seed two").unwrap();
        assert_ne!(a.scan_secret(), b.scan_secret());
    }

    #[test]
    fn indices_give_distinct_addresses_with_shared_scan_key() {
        let keychain = Keychain::from_seed(b"seed").unwrap();
        let change = keychain.address(CHANGE_INDEX).unwrap();
        let pegin = keychain.address(PEGIN_INDEX).unwrap();
        assert_eq!(change.scan_pubkey(), pegin.scan_pubkey());
        assert_ne!(change.spend_pubkey(), pegin.spend_pubkey());
    }
}
