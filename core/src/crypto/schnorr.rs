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

//! Single-signer Schnorr signatures (64 bytes: R.x ‖ s) over 32-byte message hashes.

use secp256k1zkp::aggsig;

use super::{error::CryptoError, secp};
use crate::types::{Hash, Message, PublicKey, SecretKey, Signature};

/// A signature bundled with the public key that produced it and the hash it signs. Owner
/// signatures are carried in transaction bodies in exactly this form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedMessage {
    pub public_key: PublicKey,
    pub signature: Signature,
    pub message_hash: Hash,
}

pub fn schnorr_sign(secret: &SecretKey, message: &Hash) -> Result<Signature, CryptoError> {
    let secp = secp();
    let msg = Message::from_slice(message.as_bytes()).map_err(CryptoError::from)?;
    let pubkey = PublicKey::from_secret_key(&secp, secret)?;
    aggsig::sign_single(&secp, &msg, secret, None, None, None, Some(&pubkey), None).map_err(CryptoError::from)
}

pub fn schnorr_verify(signature: &Signature, public_key: &PublicKey, message: &Hash) -> Result<(), CryptoError> {
    let secp = secp();
    let msg = Message::from_slice(message.as_bytes()).map_err(CryptoError::from)?;
    if aggsig::verify_single(&secp, signature, &msg, None, public_key, Some(public_key), None, false) {
        Ok(())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

/// Verifies every entry individually, failing on the first invalid one. An empty set is
/// trivially valid. This is not an aggregate verification; each signature pays its own
/// verification cost.
pub fn schnorr_verify_all(messages: &[SignedMessage]) -> Result<(), CryptoError> {
    for signed in messages {
        schnorr_verify(&signed.signature, &signed.public_key, &signed.message_hash)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{crypto, types::BlindingFactor};

    fn random_key() -> SecretKey {
        crypto::parse_secret_key(BlindingFactor::random().as_bytes()).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let sk = random_key();
        let pk = crypto::public_key(&sk).unwrap();
        let msg = crypto::blake2b(b"kernel message");

        let sig = schnorr_sign(&sk, &msg).unwrap();
        schnorr_verify(&sig, &pk, &msg).unwrap();
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let sk = random_key();
        let pk = crypto::public_key(&sk).unwrap();
        let sig = schnorr_sign(&sk, &crypto::blake2b(b"right")).unwrap();
        assert_eq!(
            schnorr_verify(&sig, &pk, &crypto::blake2b(b"wrong")),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let sk = random_key();
        let other = crypto::public_key(&random_key()).unwrap();
        let msg = crypto::blake2b(b"msg");
        let sig = schnorr_sign(&sk, &msg).unwrap();
        assert_eq!(schnorr_verify(&sig, &other, &msg), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn verify_all_finds_bad_entry() {
        let mut batch = vec![];
        for i in 0..4u8 {
            let sk = random_key();
            let msg = crypto::blake2b(&[i]);
            batch.push(SignedMessage {
                public_key: crypto::public_key(&sk).unwrap(),
                signature: schnorr_sign(&sk, &msg).unwrap(),
                message_hash: msg,
            });
        }
        schnorr_verify_all(&batch).unwrap();

        batch[2].message_hash = crypto::blake2b(b"tampered");
        assert!(schnorr_verify_all(&batch).is_err());
    }
}
