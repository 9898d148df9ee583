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

use super::OutputFeatures;
use crate::{
    consensus::{read_array, ConsensusDecoding, ConsensusEncoding, Hashed},
    crypto::{self, CryptoError},
    types::{Commitment, Hash, PublicKey, RangeProof, Signature},
};

/// Ownership data for an output, committed to by the range proof's extra-data field.
///
/// The sender encrypts the 24-byte payload `value_be8 ‖ nonce16` with the AES-256-CTR keystream of
/// the shared secret (IV = 0); the output's blinding factor is derived from the nonce, so a
/// receiver who recovers the nonce recovers the whole opening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerData {
    pub features: OutputFeatures,
    /// Key the sender signs with; enters the owner-sum equation.
    pub sender_pubkey: PublicKey,
    /// One-time key only the receiver can recognize and spend.
    pub receiver_pubkey: PublicKey,
    /// Ephemeral `R = r·G` for the receiver's Diffie-Hellman step.
    pub key_exchange_pubkey: PublicKey,
    /// First byte of the key-exchange tweak; lets scanners reject foreign outputs cheaply.
    pub view_tag: u8,
    pub masked_value: u64,
    pub masked_nonce: [u8; 16],
    pub signature: Signature,
}

impl OwnerData {
    /// The hash the sender signs: every field in wire order except the signature itself.
    pub fn signed_message_hash(&self) -> Hash {
        let mut bytes = Vec::new();
        self.encode_sans_signature(&mut bytes).expect("write to Vec failed");
        crypto::blake2b(&bytes)
    }

    pub fn verify_signature(&self) -> Result<(), CryptoError> {
        crypto::schnorr_verify(&self.signature, &self.sender_pubkey, &self.signed_message_hash())
    }

    fn encode_sans_signature<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.features.consensus_encode(writer)?;
        self.sender_pubkey.consensus_encode(writer)?;
        self.receiver_pubkey.consensus_encode(writer)?;
        self.key_exchange_pubkey.consensus_encode(writer)?;
        self.view_tag.consensus_encode(writer)?;
        self.masked_value.consensus_encode(writer)?;
        writer.write_all(&self.masked_nonce)
    }
}

impl ConsensusEncoding for OwnerData {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.encode_sans_signature(writer)?;
        self.signature.consensus_encode(writer)
    }
}

impl ConsensusDecoding for OwnerData {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            features: OutputFeatures::consensus_decode(reader)?,
            sender_pubkey: PublicKey::consensus_decode(reader)?,
            receiver_pubkey: PublicKey::consensus_decode(reader)?,
            key_exchange_pubkey: PublicKey::consensus_decode(reader)?,
            view_tag: u8::consensus_decode(reader)?,
            masked_value: u64::consensus_decode(reader)?,
            masked_nonce: read_array(reader)?,
            signature: Signature::consensus_decode(reader)?,
        })
    }
}

/// A new coin: commitment, ownership data and the range proof binding the two.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    commitment: Commitment,
    owner_data: OwnerData,
    proof: RangeProof,
    // memoized at construction; the fields above are never mutated
    hash: Hash,
}

impl Output {
    pub fn new(commitment: Commitment, owner_data: OwnerData, proof: RangeProof) -> Self {
        let mut output = Self {
            commitment,
            owner_data,
            proof,
            hash: Hash::default(),
        };
        output.hash = Hashed::hash(&output);
        output
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn owner_data(&self) -> &OwnerData {
        &self.owner_data
    }

    pub fn range_proof(&self) -> &RangeProof {
        &self.proof
    }

    pub fn features(&self) -> OutputFeatures {
        self.owner_data.features
    }

    pub fn is_pegged_in(&self) -> bool {
        self.features().contains(OutputFeatures::PEGGED_IN)
    }

    pub fn sender_pubkey(&self) -> &PublicKey {
        &self.owner_data.sender_pubkey
    }

    pub fn receiver_pubkey(&self) -> &PublicKey {
        &self.owner_data.receiver_pubkey
    }

    pub fn key_exchange_pubkey(&self) -> &PublicKey {
        &self.owner_data.key_exchange_pubkey
    }

    pub fn view_tag(&self) -> u8 {
        self.owner_data.view_tag
    }

    /// The memoized `Hashed(output)` identifier.
    pub fn output_hash(&self) -> Hash {
        self.hash
    }

    /// `(commitment, proof, extra_data)` triple for batched range-proof verification.
    pub fn proof_data(&self) -> (Commitment, RangeProof, Vec<u8>) {
        (self.commitment, self.proof.clone(), self.owner_data.to_wire_bytes())
    }
}

impl ConsensusEncoding for Output {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.commitment.consensus_encode(writer)?;
        self.owner_data.consensus_encode(writer)?;
        self.proof.consensus_encode(writer)
    }
}

impl ConsensusDecoding for Output {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let commitment = Commitment::consensus_decode(reader)?;
        let owner_data = OwnerData::consensus_decode(reader)?;
        let proof = RangeProof::consensus_decode(reader)?;
        Ok(Output::new(commitment, owner_data, proof))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output({})", hex::encode(self.commitment.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::create_test_output;

    #[test]
    fn output_round_trips_with_hash() {
        let output = create_test_output(1_234_567, OutputFeatures::PEGGED_IN).output;
        let decoded = Output::from_wire_bytes(&output.to_wire_bytes()).unwrap();
        assert_eq!(decoded, output);
        assert_eq!(decoded.output_hash(), output.output_hash());
        assert!(decoded.is_pegged_in());
    }

    #[test]
    fn owner_signature_covers_all_fields() {
        let output = create_test_output(10, OutputFeatures::empty()).output;
        output.owner_data().verify_signature().unwrap();

        let mut tampered = *output.owner_data();
        tampered.masked_value ^= 1;
        assert!(tampered.verify_signature().is_err());
    }

    #[test]
    fn truncated_bytes_rejected() {
        let output = create_test_output(10, OutputFeatures::empty()).output;
        let bytes = output.to_wire_bytes();
        assert!(Output::from_wire_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
