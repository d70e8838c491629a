// Path: crates/crypto/src/ed448.rs

//! Ed448 keys, signatures, and peer identity.
//!
//! Peers identify themselves with long-term Ed448 keys. Announcements carry
//! the raw 57-byte public key and a raw 114-byte signature; both are parsed
//! and verified here. A peer id is derived from the public key so that a
//! record's claimed id can be checked against the key that signed it.

use ed448_goldilocks_plus::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use signature::Verifier;

use crate::error::CryptoError;

/// Length of a raw Ed448 public key.
pub const PUBLIC_KEY_LENGTH: usize = 57;
/// Length of a raw Ed448 signature.
pub const SIGNATURE_LENGTH: usize = 114;

/// Parses a raw 57-byte Ed448 public key.
pub fn parse_public_key(bytes: &[u8]) -> Result<VerifyingKey, CryptoError> {
    if bytes.len() != PUBLIC_KEY_LENGTH {
        return Err(CryptoError::InvalidKey(format!(
            "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    let array: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().expect("length checked above");
    VerifyingKey::from_bytes(&array).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Parses a raw 114-byte Ed448 signature.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, CryptoError> {
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    Signature::try_from(bytes).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
}

/// Verifies `signature` over `message` with the given raw public key.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let key = parse_public_key(public_key)?;
    let signature = parse_signature(signature)?;
    key.verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Derives the canonical peer id for a raw Ed448 public key.
pub fn derive_peer_id(public_key: &[u8]) -> Vec<u8> {
    Sha256::digest(public_key).to_vec()
}

/// Whether `peer_id` is the derived id of `public_key`.
pub fn peer_id_matches(peer_id: &[u8], public_key: &[u8]) -> bool {
    derive_peer_id(public_key) == peer_id
}

/// Signs `message`, returning the raw signature bytes.
pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    use signature::Signer;
    let signature: Signature = key.sign(message);
    signature.to_bytes().to_vec()
}

/// Raw 57-byte public key of a signing key.
pub fn public_key_bytes(key: &SigningKey) -> Vec<u8> {
    key.verifying_key().to_bytes().to_vec()
}
