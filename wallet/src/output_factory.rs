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

//! Sender-side output construction. The receiver-side inverse lives in [`crate::Wallet`]; the
//! two share the derivation helpers here so they cannot drift apart.
//!
//! The 16-byte nonce is the root of the opening: the output's blinding factor is derived from it,
//! and the nonce and amount travel to the receiver masked under the AES-256-CTR keystream of the
//! Diffie-Hellman shared secret.

use mweb_core::{
    consensus::ConsensusEncoding,
    crypto::{self, CryptoError},
    transactions::transaction_components::{Output, OutputFeatures, OwnerData},
    types::{BlindingFactor, Hash, ProofMessage, PublicKey, SecretKey},
};
use rand::{rngs::OsRng, RngCore};

use crate::{error::WalletError, stealth::StealthAddress};

const BLIND_TAG: &[u8] = b"mweb/output/blind";
const PROOF_NONCE_TAG: &[u8] = b"mweb/output/proof-nonce";

/// Builds an output to `receiver` and returns it with the (switch-tweaked) blinding factor that
/// enters the balance equations.
pub fn create_output(
    sender_key: &SecretKey,
    receiver: &StealthAddress,
    amount: u64,
    features: OutputFeatures,
) -> Result<(Output, BlindingFactor), WalletError> {
    // one-time key: P = H(r·A)·G + B, with R = r·G published for the receiver
    let r = random_secret()?;
    let key_exchange_pubkey = crypto::public_key(&r)?;
    let shared_tweak = point_digest(&crypto::mul_public_key(receiver.scan_pubkey(), &r)?);
    let view_tag = *shared_tweak.as_bytes().first().expect("digest is 32 bytes");
    let tweak_point = crypto::public_key(&scalar_from_hash(&shared_tweak)?)?;
    let receiver_pubkey = crypto::add_public_keys(&[tweak_point, *receiver.spend_pubkey()])?;

    // shared secret for the masked payload: H(sender_sk·B)
    let shared_secret = point_digest(&crypto::mul_public_key(receiver.spend_pubkey(), sender_key)?);

    let mut nonce = [0u8; 16];
    OsRng.fill_bytes(&mut nonce);
    let blind = derive_blind(&nonce, amount)?;
    let commitment = crypto::commit_blinded(amount, &blind)?;
    let (masked_value, masked_nonce) = mask_payload(&shared_secret, amount, nonce);

    let mut owner_data = OwnerData {
        features,
        sender_pubkey: crypto::public_key(sender_key)?,
        receiver_pubkey,
        key_exchange_pubkey,
        view_tag,
        masked_value,
        masked_nonce,
        signature: crypto::schnorr_sign(sender_key, &Hash::default()).map_err(WalletError::Crypto)?,
    };
    owner_data.signature = crypto::schnorr_sign(sender_key, &owner_data.signed_message_hash())?;

    let proof_nonce = proof_nonce(&shared_secret)?;
    let blind_key = crypto::parse_secret_key(blind.as_bytes())?;
    let proof = crypto::generate_range_proof(
        amount,
        &blind_key,
        &proof_nonce,
        &proof_nonce,
        ProofMessage::empty(),
        &owner_data.to_wire_bytes(),
    )?;

    Ok((Output::new(commitment, owner_data, proof), blind))
}

/// BLAKE2b of a compressed point; the basis for tweaks, view tags and shared secrets.
pub(crate) fn point_digest(point: &PublicKey) -> Hash {
    crypto::blake2b(&crypto::serialize_public_key(point))
}

pub(crate) fn scalar_from_hash(hash: &Hash) -> Result<SecretKey, CryptoError> {
    crypto::parse_secret_key(hash.as_bytes())
}

/// `blind = switch(H(nonce), amount)` — recovering the nonce recovers the blind.
pub(crate) fn derive_blind(nonce: &[u8; 16], amount: u64) -> Result<BlindingFactor, CryptoError> {
    let raw = crypto::hash_to_scalar(&[BLIND_TAG, nonce].concat())?;
    crypto::blind_switch(&BlindingFactor::from(raw), amount)
}

/// Applies the AES-256-CTR keystream (IV = 0) over `value_be8 ‖ nonce16`; its own inverse.
pub(crate) fn mask_payload(shared_secret: &Hash, value: u64, nonce: [u8; 16]) -> (u64, [u8; 16]) {
    let mut buf = [0u8; 24];
    buf[..8].copy_from_slice(&value.to_be_bytes());
    buf[8..].copy_from_slice(&nonce);
    crypto::aes256_ctr(shared_secret.as_bytes(), &[0u8; 16], &mut buf);
    let mut masked_value = [0u8; 8];
    masked_value.copy_from_slice(&buf[..8]);
    let mut masked_nonce = [0u8; 16];
    masked_nonce.copy_from_slice(&buf[8..]);
    (u64::from_be_bytes(masked_value), masked_nonce)
}

pub(crate) fn proof_nonce(shared_secret: &Hash) -> Result<SecretKey, CryptoError> {
    crypto::hash_to_scalar(&[PROOF_NONCE_TAG, shared_secret.as_bytes().as_slice()].concat())
}

pub(crate) fn random_secret() -> Result<SecretKey, CryptoError> {
    crypto::parse_secret_key(BlindingFactor::random().as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keychain::Keychain;

    #[test]
    fn output_commits_to_derived_blind() {
        let keychain = Keychain::from_seed(b"factory seed").unwrap();
        let receiver = keychain.address(0).unwrap();
        let sender = random_secret().unwrap();
        let (output, blind) = create_output(&sender, &receiver, 8_000_000, OutputFeatures::PEGGED_IN).unwrap();

        assert!(output.is_pegged_in());
        assert_eq!(
            *output.commitment(),
            crypto::commit_blinded(8_000_000, &blind).unwrap()
        );
        output.owner_data().verify_signature().unwrap();
        crypto::verify_range_proofs(&[output.proof_data()]).unwrap();
    }

    #[test]
    fn mask_payload_is_involutive() {
        let secret = crypto::blake2b(b"shared");
        let (masked_value, masked_nonce) = mask_payload(&secret, 1234, [9u8; 16]);
        assert_ne!(masked_value, 1234);
        let (value, nonce) = mask_payload(&secret, masked_value, masked_nonce);
        assert_eq!(value, 1234);
        assert_eq!(nonce, [9u8; 16]);
    }
}
