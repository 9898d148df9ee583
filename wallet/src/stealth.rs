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

use std::fmt;

use bech32::{FromBase32, ToBase32, Variant};
use mweb_core::{crypto, types::PublicKey};

use crate::error::WalletError;

/// A scan/spend pubkey pair `(A, B)`. The sender uses `A` for the Diffie-Hellman step and `B` to
/// build the one-time output key, so only the holder of the matching secrets can recognize and
/// spend the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealthAddress {
    scan_pubkey: PublicKey,
    spend_pubkey: PublicKey,
}

impl StealthAddress {
    pub fn new(scan_pubkey: PublicKey, spend_pubkey: PublicKey) -> Self {
        Self {
            scan_pubkey,
            spend_pubkey,
        }
    }

    pub fn scan_pubkey(&self) -> &PublicKey {
        &self.scan_pubkey
    }

    pub fn spend_pubkey(&self) -> &PublicKey {
        &self.spend_pubkey
    }

    /// Bech32 string `hrp1...` over the 66 bytes `A ‖ B`.
    pub fn encode(&self, hrp: &str) -> Result<String, WalletError> {
        let mut data = Vec::with_capacity(66);
        data.extend_from_slice(&crypto::serialize_public_key(&self.scan_pubkey));
        data.extend_from_slice(&crypto::serialize_public_key(&self.spend_pubkey));
        bech32::encode(hrp, data.to_base32(), Variant::Bech32).map_err(|e| WalletError::InvalidAddress(e.to_string()))
    }

    pub fn decode(encoded: &str, expected_hrp: &str) -> Result<Self, WalletError> {
        let (hrp, data, variant) = bech32::decode(encoded).map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        if hrp != expected_hrp {
            return Err(WalletError::InvalidAddress(format!(
                "HRP '{}' does not match '{}'",
                hrp, expected_hrp
            )));
        }
        if variant != Variant::Bech32 {
            return Err(WalletError::InvalidAddress("wrong bech32 variant".into()));
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 66 {
            return Err(WalletError::InvalidAddress(format!("payload is {} bytes", bytes.len())));
        }
        Ok(Self {
            scan_pubkey: crypto::parse_public_key(&bytes[..33])
                .map_err(|e| WalletError::InvalidAddress(e.to_string()))?,
            spend_pubkey: crypto::parse_public_key(&bytes[33..])
                .map_err(|e| WalletError::InvalidAddress(e.to_string()))?,
        })
    }
}

impl fmt::Display for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StealthAddress({}, {})",
            hex::encode(crypto::serialize_public_key(&self.scan_pubkey)),
            hex::encode(crypto::serialize_public_key(&self.spend_pubkey)),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keychain::Keychain;

    #[test]
    fn encode_decode_round_trip() {
        let keychain = Keychain::from_seed(b"addr test seed").unwrap();
        let addr = keychain.address(3).unwrap();
        let encoded = addr.encode("bc").unwrap();
        assert!(encoded.starts_with("bc1"));
        let decoded = StealthAddress::decode(&encoded, "bc").unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn wrong_hrp_rejected() {
        let keychain = Keychain::from_seed(b"addr test seed").unwrap();
        let encoded = keychain.address(0).unwrap().encode("bc").unwrap();
        assert!(matches!(
            StealthAddress::decode(&encoded, "tb"),
            Err(WalletError::InvalidAddress(_))
        ));
    }

    #[test]
    fn corrupt_checksum_rejected() {
        let keychain = Keychain::from_seed(b"addr test seed").unwrap();
        let mut encoded = keychain.address(0).unwrap().encode("bc").unwrap();
        encoded.pop();
        encoded.push('q');
        assert!(StealthAddress::decode(&encoded, "bc").is_err());
    }
}
