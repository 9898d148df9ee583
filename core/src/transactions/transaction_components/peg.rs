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

//! Coins crossing between the transparent host chain and the extension block.

use std::{
    fmt,
    io::{self, Read, Write},
};

use super::TransactionError;
use crate::{
    consensus::{invalid_data, read_byte_vec, write_byte_vec, ConsensusDecoding, ConsensusEncoding},
    types::Hash,
};

/// A host-chain address, kept in its encoded form and checksum-validated on construction. The
/// HRP is checked against the chain parameters where the address is actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32Address {
    encoded: String,
    hrp: String,
}

impl Bech32Address {
    pub fn parse(encoded: &str) -> Result<Self, TransactionError> {
        let (hrp, _, _) = bech32::decode(encoded).map_err(|e| TransactionError::InvalidAddress(e.to_string()))?;
        Ok(Self {
            encoded: encoded.to_string(),
            hrp,
        })
    }

    pub fn hrp(&self) -> &str {
        &self.hrp
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Bech32Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl ConsensusEncoding for Bech32Address {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_byte_vec(writer, self.encoded.as_bytes())
    }
}

impl ConsensusDecoding for Bech32Address {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_byte_vec(reader)?;
        let encoded = String::from_utf8(bytes).map_err(|_| invalid_data("address is not utf-8"))?;
        Bech32Address::parse(&encoded).map_err(|_| invalid_data("address failed bech32 decode"))
    }
}

/// Value leaving the extension block for a host-chain address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PegOutCoin {
    pub amount: u64,
    pub address: Bech32Address,
}

impl PegOutCoin {
    pub fn new(amount: u64, address: Bech32Address) -> Self {
        Self { amount, address }
    }
}

impl ConsensusEncoding for PegOutCoin {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.amount.consensus_encode(writer)?;
        self.address.consensus_encode(writer)
    }
}

impl ConsensusDecoding for PegOutCoin {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            amount: u64::consensus_decode(reader)?,
            address: Bech32Address::consensus_decode(reader)?,
        })
    }
}

/// The host-chain side of a peg-in: the amount burned and the extension-block kernel that mints
/// it. The host block carries these; validation matches them against the block's peg-in kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PegInCoin {
    pub amount: u64,
    pub kernel_id: Hash,
}

impl PegInCoin {
    pub fn new(amount: u64, kernel_id: Hash) -> Self {
        Self { amount, kernel_id }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consensus::{ConsensusDecoding, ConsensusEncoding};

    // A checksum-valid bech32 string ("bc1..." test vector from BIP-173).
    const ADDR: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    #[test]
    fn parse_records_hrp() {
        let addr = Bech32Address::parse(ADDR).unwrap();
        assert_eq!(addr.hrp(), "bc");
        assert_eq!(addr.as_str(), ADDR);
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        let mut bad = ADDR.to_string();
        bad.pop();
        bad.push('5');
        assert!(matches!(
            Bech32Address::parse(&bad),
            Err(TransactionError::InvalidAddress(_))
        ));
    }

    #[test]
    fn pegout_round_trip() {
        let coin = PegOutCoin::new(4_500_000, Bech32Address::parse(ADDR).unwrap());
        let bytes = coin.to_wire_bytes();
        assert_eq!(PegOutCoin::from_wire_bytes(&bytes).unwrap(), coin);
    }
}
