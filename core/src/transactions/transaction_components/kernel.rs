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

use std::{
    fmt,
    io::{self, Read, Write},
};

use super::{PegOutCoin, TransactionError};
use crate::{
    consensus::{read_byte_vec, write_byte_vec, ConsensusDecoding, ConsensusEncoding},
    crypto::{self, CryptoError},
    types::{BlindingFactor, Commitment, Hash, Signature},
};

const PEGIN_FEATURE_BIT: u8 = 0x01;
const PEGOUT_FEATURE_BIT: u8 = 0x02;
const HEIGHT_LOCK_FEATURE_BIT: u8 = 0x04;
const EXTRA_DATA_FEATURE_BIT: u8 = 0x08;

/// The public proof of a transaction: fee and peg metadata in cleartext, the excess commitment
/// `blind·G`, and a Schnorr signature over the metadata proving knowledge of the blind.
///
/// The feature byte on the wire is derived from which optional fields are present; it is never
/// stored independently.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    pub fee: u64,
    pub pegin: Option<u64>,
    pub pegout: Option<PegOutCoin>,
    pub lock_height: Option<u64>,
    pub extra_data: Vec<u8>,
    pub excess: Commitment,
    pub signature: Signature,
}

impl Kernel {
    /// Builds and signs a kernel whose excess commits to `blind`.
    pub fn create(
        blind: &BlindingFactor,
        fee: u64,
        pegin: Option<u64>,
        pegout: Option<PegOutCoin>,
        lock_height: Option<u64>,
        extra_data: Vec<u8>,
    ) -> Result<Kernel, TransactionError> {
        if extra_data.len() > u8::MAX as usize {
            return Err(TransactionError::ExtraDataTooLarge);
        }
        let excess = crypto::commit_blinded(0, blind)?;
        let message = Kernel::signature_message_for(fee, pegin, &pegout, lock_height, &extra_data);
        let secret = crypto::parse_secret_key(blind.as_bytes()).map_err(TransactionError::Crypto)?;
        let signature = crypto::schnorr_sign(&secret, &message)?;
        Ok(Kernel {
            fee,
            pegin,
            pegout,
            lock_height,
            extra_data,
            excess,
            signature,
        })
    }

    pub fn features_byte(&self) -> u8 {
        (if self.pegin.is_some() { PEGIN_FEATURE_BIT } else { 0 }) |
            (if self.pegout.is_some() { PEGOUT_FEATURE_BIT } else { 0 }) |
            (if self.lock_height.is_some() { HEIGHT_LOCK_FEATURE_BIT } else { 0 }) |
            (if self.extra_data.is_empty() { 0 } else { EXTRA_DATA_FEATURE_BIT })
    }

    /// The hash the excess key signs: feature byte, fee, and every present optional field in wire
    /// order (peg-in amount, peg-out amount + address, lock height, length-prefixed extra data).
    pub fn signature_message(&self) -> Hash {
        Kernel::signature_message_for(self.fee, self.pegin, &self.pegout, self.lock_height, &self.extra_data)
    }

    fn signature_message_for(
        fee: u64,
        pegin: Option<u64>,
        pegout: &Option<PegOutCoin>,
        lock_height: Option<u64>,
        extra_data: &[u8],
    ) -> Hash {
        let mut bytes = Vec::new();
        encode_metadata(&mut bytes, fee, pegin, pegout, lock_height, extra_data).expect("write to Vec failed");
        crypto::blake2b(&bytes)
    }

    pub fn verify_signature(&self) -> Result<(), CryptoError> {
        let pubkey = crypto::commitment_to_pubkey(&self.excess)?;
        crypto::schnorr_verify(&self.signature, &pubkey, &self.signature_message())
    }

    pub fn has_pegin(&self) -> bool {
        self.pegin.is_some()
    }

    pub fn has_pegout(&self) -> bool {
        self.pegout.is_some()
    }
}

fn encode_metadata<W: Write>(
    writer: &mut W,
    fee: u64,
    pegin: Option<u64>,
    pegout: &Option<PegOutCoin>,
    lock_height: Option<u64>,
    extra_data: &[u8],
) -> io::Result<()> {
    let features = (if pegin.is_some() { PEGIN_FEATURE_BIT } else { 0 }) |
        (if pegout.is_some() { PEGOUT_FEATURE_BIT } else { 0 }) |
        (if lock_height.is_some() { HEIGHT_LOCK_FEATURE_BIT } else { 0 }) |
        (if extra_data.is_empty() { 0 } else { EXTRA_DATA_FEATURE_BIT });
    features.consensus_encode(writer)?;
    fee.consensus_encode(writer)?;
    if let Some(amount) = pegin {
        amount.consensus_encode(writer)?;
    }
    if let Some(pegout) = pegout {
        pegout.consensus_encode(writer)?;
    }
    if let Some(height) = lock_height {
        height.consensus_encode(writer)?;
    }
    if !extra_data.is_empty() {
        write_byte_vec(writer, extra_data)?;
    }
    Ok(())
}

impl ConsensusEncoding for Kernel {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        encode_metadata(
            writer,
            self.fee,
            self.pegin,
            &self.pegout,
            self.lock_height,
            &self.extra_data,
        )?;
        self.excess.consensus_encode(writer)?;
        self.signature.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Kernel {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let features = u8::consensus_decode(reader)?;
        let fee = u64::consensus_decode(reader)?;
        let pegin = if features & PEGIN_FEATURE_BIT != 0 {
            Some(u64::consensus_decode(reader)?)
        } else {
            None
        };
        let pegout = if features & PEGOUT_FEATURE_BIT != 0 {
            Some(PegOutCoin::consensus_decode(reader)?)
        } else {
            None
        };
        let lock_height = if features & HEIGHT_LOCK_FEATURE_BIT != 0 {
            Some(u64::consensus_decode(reader)?)
        } else {
            None
        };
        let extra_data = if features & EXTRA_DATA_FEATURE_BIT != 0 {
            read_byte_vec(reader)?
        } else {
            Vec::new()
        };
        Ok(Kernel {
            fee,
            pegin,
            pegout,
            lock_height,
            extra_data,
            excess: Commitment::consensus_decode(reader)?,
            signature: Signature::consensus_decode(reader)?,
        })
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Kernel(fee: {}, pegin: {:?}, pegout: {:?}, excess: {})",
            self.fee,
            self.pegin,
            self.pegout.as_ref().map(|p| p.amount),
            hex::encode(self.excess.0),
        )
    }
}

#[cfg(test)]
mod test {
    use super::{super::Bech32Address, *};
    use crate::consensus::Hashed;

    #[test]
    fn plain_kernel_signature_verifies() {
        let blind = BlindingFactor::random();
        let kernel = Kernel::create(&blind, 500_000, None, None, None, vec![]).unwrap();
        assert_eq!(kernel.features_byte(), 0);
        kernel.verify_signature().unwrap();
    }

    #[test]
    fn pegin_kernel_has_pegin_bit() {
        let kernel = Kernel::create(&BlindingFactor::random(), 0, Some(8_000_000), None, None, vec![]).unwrap();
        assert_eq!(kernel.features_byte(), PEGIN_FEATURE_BIT);
        kernel.verify_signature().unwrap();
    }

    #[test]
    fn tampered_fee_breaks_signature() {
        let mut kernel = Kernel::create(&BlindingFactor::random(), 500_000, None, None, None, vec![]).unwrap();
        kernel.fee = 400_000;
        assert!(kernel.verify_signature().is_err());
    }

    #[test]
    fn extra_data_is_covered_by_signature() {
        let blind = BlindingFactor::random();
        let mut kernel = Kernel::create(&blind, 1, None, None, None, b"memo".to_vec()).unwrap();
        kernel.verify_signature().unwrap();
        kernel.extra_data = b"altered".to_vec();
        assert!(kernel.verify_signature().is_err());
    }

    #[test]
    fn all_shapes_round_trip() {
        let addr = Bech32Address::parse("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
        let kernels = [
            Kernel::create(&BlindingFactor::random(), 500_000, None, None, None, vec![]).unwrap(),
            Kernel::create(&BlindingFactor::random(), 0, Some(8_000_000), None, None, vec![]).unwrap(),
            Kernel::create(
                &BlindingFactor::random(),
                500_000,
                None,
                Some(PegOutCoin::new(4_500_000, addr)),
                None,
                vec![],
            )
            .unwrap(),
            Kernel::create(&BlindingFactor::random(), 1, None, None, Some(777), b"xx".to_vec()).unwrap(),
        ];
        for kernel in kernels {
            let decoded = Kernel::from_wire_bytes(&kernel.to_wire_bytes()).unwrap();
            assert_eq!(decoded, kernel);
            assert_eq!(decoded.hash(), kernel.hash());
        }
    }
}
