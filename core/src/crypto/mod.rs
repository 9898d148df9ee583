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

//! Thin, stateless façade over secp256k1-zkp. Every operation returns a recoverable
//! [`CryptoError`]; callers decide whether a failure is consensus-fatal or a benign scan miss.

use std::sync::{Mutex, MutexGuard};

use aes::cipher::{KeyIvInit, StreamCipher};
use digest::Digest;
use once_cell::sync::Lazy;
use secp256k1zkp::{ContextFlag, Secp256k1};

use crate::types::{BlindingFactor, Commitment, Hash, HashDigest, PublicKey, SecretKey, ZERO_KEY};

mod bulletproofs;
mod error;
mod schnorr;

pub use bulletproofs::{generate_range_proof, rewind_range_proof, verify_range_proofs, RewoundProof, PROOF_SIZE};
pub use error::CryptoError;
pub use schnorr::{schnorr_sign, schnorr_verify, schnorr_verify_all, SignedMessage};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

static SECP: Lazy<Mutex<Secp256k1>> = Lazy::new(|| Mutex::new(Secp256k1::with_caps(ContextFlag::Commit)));

/// The shared verification/commitment context. Held briefly; never across a call back into this
/// module.
pub(crate) fn secp() -> MutexGuard<'static, Secp256k1> {
    SECP.lock().expect("secp context mutex poisoned")
}

/// `v·H` with a zero blinding factor.
pub fn commit_transparent(value: u64) -> Result<Commitment, CryptoError> {
    Ok(secp().commit_value(value)?)
}

/// `r·G + v·H`.
pub fn commit_blinded(value: u64, blind: &BlindingFactor) -> Result<Commitment, CryptoError> {
    let key = secret_from_blind(blind)?;
    Ok(secp().commit(value, key)?)
}

/// Homomorphic sum `Σpositive − Σnegative`.
pub fn add_commitments(positive: &[Commitment], negative: &[Commitment]) -> Result<Commitment, CryptoError> {
    Ok(secp().commit_sum(positive.to_vec(), negative.to_vec())?)
}

/// Scalar sum `Σpositive − Σnegative` (mod curve order). Zero factors are skipped; a zero result
/// is returned as the zero blinding factor rather than an error.
pub fn add_blinding_factors(
    positive: &[BlindingFactor],
    negative: &[BlindingFactor],
) -> Result<BlindingFactor, CryptoError> {
    let pos: Vec<SecretKey> = positive
        .iter()
        .filter(|b| !b.is_zero())
        .map(secret_from_blind)
        .collect::<Result<_, _>>()?;
    let neg: Vec<SecretKey> = negative
        .iter()
        .filter(|b| !b.is_zero())
        .map(secret_from_blind)
        .collect::<Result<_, _>>()?;
    if pos.is_empty() && neg.is_empty() {
        return Ok(BlindingFactor::default());
    }
    match secp().blind_sum(pos, neg) {
        Ok(sum) => Ok(sum.into()),
        // the scalars cancelled exactly
        Err(secp256k1zkp::Error::InvalidSecretKey) => Ok(BlindingFactor::default()),
        Err(e) => Err(e.into()),
    }
}

/// Switch-commitment tweak `k' = k + H(k·G + v·H ‖ k·J)`.
pub fn blind_switch(blind: &BlindingFactor, value: u64) -> Result<BlindingFactor, CryptoError> {
    let key = secret_from_blind(blind)?;
    Ok(secp().blind_switch(value, key)?.into())
}

/// Interprets a commitment as a public key (for signature verification against an excess).
pub fn commitment_to_pubkey(commitment: &Commitment) -> Result<PublicKey, CryptoError> {
    Ok(commitment.to_pubkey(&secp())?)
}

pub fn public_key(secret: &SecretKey) -> Result<PublicKey, CryptoError> {
    Ok(PublicKey::from_secret_key(&secp(), secret)?)
}

/// `Σkeys`; fails on an empty set or a point-at-infinity result.
pub fn add_public_keys(keys: &[PublicKey]) -> Result<PublicKey, CryptoError> {
    Ok(PublicKey::from_combination(&secp(), keys.iter().collect())?)
}

/// `k·P` Diffie-Hellman step.
pub fn mul_public_key(point: &PublicKey, scalar: &SecretKey) -> Result<PublicKey, CryptoError> {
    let mut result = *point;
    result.mul_assign(&secp(), scalar)?;
    Ok(result)
}

pub fn serialize_public_key(key: &PublicKey) -> [u8; 33] {
    let vec = key.serialize_vec(&secp(), true);
    let mut bytes = [0u8; 33];
    bytes.copy_from_slice(&vec[..33]);
    bytes
}

pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    Ok(PublicKey::from_slice(&secp(), bytes)?)
}

pub fn parse_secret_key(bytes: &[u8; 32]) -> Result<SecretKey, CryptoError> {
    Ok(SecretKey::from_slice(&secp(), bytes)?)
}

/// `a + b` on the scalar field.
pub fn add_secret_keys(a: &SecretKey, b: &SecretKey) -> Result<SecretKey, CryptoError> {
    let mut sum = a.clone();
    sum.add_assign(&secp(), b)?;
    Ok(sum)
}

/// `a · b` on the scalar field.
pub fn mul_secret_keys(a: &SecretKey, b: &SecretKey) -> Result<SecretKey, CryptoError> {
    let mut product = a.clone();
    product.mul_assign(&secp(), b)?;
    Ok(product)
}

/// AES-256-CTR in place; CTR mode means the same call both encrypts and decrypts.
pub fn aes256_ctr(key: &[u8; 32], iv: &[u8; 16], data: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(data);
}

/// 32-byte BLAKE2b digest.
pub fn blake2b(data: &[u8]) -> Hash {
    let digest: [u8; 32] = HashDigest::new().chain_update(data).finalize().into();
    digest.into()
}

/// Hashes arbitrary bytes onto the scalar field. The digest exceeds the curve order with
/// probability ~2⁻¹²⁸; that case surfaces as an error for the caller to retry or reject.
pub fn hash_to_scalar(data: &[u8]) -> Result<SecretKey, CryptoError> {
    let digest: [u8; 32] = HashDigest::new().chain_update(data).finalize().into();
    parse_secret_key(&digest)
}

fn secret_from_blind(blind: &BlindingFactor) -> Result<SecretKey, CryptoError> {
    if blind.is_zero() {
        return Ok(ZERO_KEY);
    }
    SecretKey::from_slice(&secp(), blind.as_bytes()).map_err(CryptoError::from)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn commitments_are_homomorphic() {
        let r1 = BlindingFactor::random();
        let r2 = BlindingFactor::random();
        let sum_blind = add_blinding_factors(&[r1, r2], &[]).unwrap();

        let c1 = commit_blinded(400, &r1).unwrap();
        let c2 = commit_blinded(600, &r2).unwrap();
        let lhs = add_commitments(&[c1, c2], &[]).unwrap();
        let rhs = commit_blinded(1000, &sum_blind).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn transparent_commitment_is_zero_blind() {
        let zero = BlindingFactor::default();
        assert_eq!(commit_transparent(1234).unwrap(), commit_blinded(1234, &zero).unwrap());
    }

    #[test]
    fn blinding_factors_cancel_to_zero() {
        let r = BlindingFactor::random();
        let sum = add_blinding_factors(&[r], &[r]).unwrap();
        assert!(sum.is_zero());
    }

    #[test]
    fn aes_ctr_round_trips() {
        let key = [7u8; 32];
        let iv = [0u8; 16];
        let mut data = b"pay to the order of".to_vec();
        aes256_ctr(&key, &iv, &mut data);
        assert_ne!(data, b"pay to the order of".to_vec());
        aes256_ctr(&key, &iv, &mut data);
        assert_eq!(data, b"pay to the order of".to_vec());
    }

    #[test]
    fn blind_switch_changes_blind_deterministically() {
        let r = BlindingFactor::random();
        let a = blind_switch(&r, 100).unwrap();
        let b = blind_switch(&r, 100).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, r);
        assert_ne!(blind_switch(&r, 101).unwrap(), a);
    }
}
