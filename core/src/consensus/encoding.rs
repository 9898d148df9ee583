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

//! Canonical, deterministic wire encoding for every ledger type. No self-describing framing:
//! integers are fixed-width big-endian, curve points compressed, optional fields gated by feature
//! bits, and short byte strings carry a one-byte length. `decode(encode(x)) == x` for every type.

use std::io::{self, Read, Write};

use digest::Digest;

use crate::{
    crypto,
    types::{BlindingFactor, Commitment, Hash, HashDigest, PublicKey, RangeProof, Signature},
};

/// Ability to write the canonical consensus encoding. Implementations must be deterministic and
/// injective per type.
pub trait ConsensusEncoding {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    fn to_wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Vec<u8> writes are infallible
        self.consensus_encode(&mut bytes).expect("write to Vec failed");
        bytes
    }
}

/// Ability to decode from canonical consensus bytes. Trailing garbage is the caller's concern;
/// malformed bytes surface as `InvalidData`.
pub trait ConsensusDecoding: Sized {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self>;

    fn from_wire_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = bytes;
        let decoded = Self::consensus_decode(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(invalid_data("trailing bytes after decode"));
        }
        Ok(decoded)
    }
}

/// The `Hashed(value)` rule: the BLAKE2b digest of a type's canonical encoding.
pub trait Hashed: ConsensusEncoding {
    fn hash(&self) -> Hash {
        let mut writer = HashWriter::default();
        // HashWriter is infallible
        self.consensus_encode(&mut writer).expect("write to hasher failed");
        writer.finalize()
    }
}

impl<T: ConsensusEncoding> Hashed for T {}

/// An `io::Write` that feeds a BLAKE2b digest, so types hash exactly what they serialize.
#[derive(Default)]
pub struct HashWriter {
    digest: HashDigest,
}

impl HashWriter {
    pub fn finalize(self) -> Hash {
        let digest: [u8; 32] = self.digest.finalize().into();
        digest.into()
    }
}

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.digest.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

pub(crate) fn read_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// One-byte-length-prefixed byte string, used for kernel extra data (truncated to 255 bytes by
/// construction).
pub(crate) fn write_byte_vec<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    debug_assert!(bytes.len() <= u8::MAX as usize);
    writer.write_all(&[bytes.len() as u8])?;
    writer.write_all(bytes)
}

pub(crate) fn read_byte_vec<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = u8::consensus_decode(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

impl ConsensusEncoding for u8 {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[*self])
    }
}

impl ConsensusDecoding for u8 {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(read_array::<_, 1>(reader)?[0])
    }
}

impl ConsensusEncoding for u32 {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl ConsensusDecoding for u32 {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(u32::from_be_bytes(read_array(reader)?))
    }
}

impl ConsensusEncoding for u64 {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl ConsensusDecoding for u64 {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(u64::from_be_bytes(read_array(reader)?))
    }
}

impl ConsensusEncoding for Hash {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.as_bytes())
    }
}

impl ConsensusDecoding for Hash {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Hash::from_bytes(read_array(reader)?))
    }
}

impl ConsensusEncoding for BlindingFactor {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.as_bytes())
    }
}

impl ConsensusDecoding for BlindingFactor {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(BlindingFactor::from_bytes(read_array(reader)?))
    }
}

impl ConsensusEncoding for Commitment {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }
}

impl ConsensusDecoding for Commitment {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Commitment(read_array(reader)?))
    }
}

impl ConsensusEncoding for PublicKey {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&crypto::serialize_public_key(self))
    }
}

impl ConsensusDecoding for PublicKey {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_array::<_, 33>(reader)?;
        crypto::parse_public_key(&bytes).map_err(|_| invalid_data("not a valid compressed point"))
    }
}

impl ConsensusEncoding for Signature {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_raw_data())
    }
}

impl ConsensusDecoding for Signature {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_array::<_, 64>(reader)?;
        Signature::from_raw_data(&bytes).map_err(|_| invalid_data("not a valid signature"))
    }
}

impl ConsensusEncoding for RangeProof {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.plen != crypto::PROOF_SIZE {
            return Err(invalid_data("range proof has non-canonical length"));
        }
        writer.write_all(self.bytes())
    }
}

impl ConsensusDecoding for RangeProof {
    fn consensus_decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut proof = [0u8; secp256k1zkp::constants::MAX_PROOF_SIZE];
        reader.read_exact(&mut proof[..crypto::PROOF_SIZE])?;
        Ok(RangeProof {
            proof,
            plen: crypto::PROOF_SIZE,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integers_are_big_endian() {
        assert_eq!(0x0102_0304u32.to_wire_bytes(), vec![1, 2, 3, 4]);
        assert_eq!(1u64.to_wire_bytes(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn integer_round_trip() {
        for value in [0u64, 1, u64::MAX, 8_000_000] {
            assert_eq!(u64::from_wire_bytes(&value.to_wire_bytes()).unwrap(), value);
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = 7u32.to_wire_bytes();
        bytes.push(0);
        assert!(u32::from_wire_bytes(&bytes).is_err());
    }

    #[test]
    fn hash_round_trip() {
        let hash = crypto::blake2b(b"abc");
        assert_eq!(Hash::from_wire_bytes(&hash.to_wire_bytes()).unwrap(), hash);
    }

    #[test]
    fn hashed_matches_digest_of_encoding() {
        let value = 123_456_789u64;
        assert_eq!(value.hash(), crypto::blake2b(&value.to_wire_bytes()));
    }

    #[test]
    fn byte_vec_round_trip() {
        let data = vec![9u8; 40];
        let mut encoded = Vec::new();
        write_byte_vec(&mut encoded, &data).unwrap();
        assert_eq!(encoded.len(), 41);
        assert_eq!(read_byte_vec(&mut &encoded[..]).unwrap(), data);
    }
}
