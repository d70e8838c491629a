// Path: crates/crypto/src/poseidon.rs

//! Poseidon hashing over arbitrary byte strings.
//!
//! The network's message hashes and prover addresses are Poseidon digests
//! over the BN254 scalar field with circom parameters. Inputs of arbitrary
//! length are absorbed as a sponge: the data is split into 31-byte big-endian
//! chunks (each strictly below the field modulus) and folded through the
//! two-input permutation together with the running state.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonBytesHasher};

use crate::error::CryptoError;

/// Width of one absorbed chunk. 31 bytes always fits the BN254 scalar field.
const CHUNK_BYTES: usize = 31;

/// Hashes an arbitrary byte string to a 32-byte Poseidon digest.
pub fn hash_bytes(data: &[u8]) -> Result<[u8; 32], CryptoError> {
    let mut hasher =
        Poseidon::<Fr>::new_circom(2).map_err(|e| CryptoError::Hash(e.to_string()))?;

    let mut state = [0u8; 32];
    if data.is_empty() {
        return hasher
            .hash_bytes_be(&[state.as_slice(), &[]])
            .map_err(|e| CryptoError::Hash(e.to_string()));
    }

    for chunk in data.chunks(CHUNK_BYTES) {
        state = hasher
            .hash_bytes_be(&[state.as_slice(), chunk])
            .map_err(|e| CryptoError::Hash(e.to_string()))?;
    }
    Ok(state)
}

/// Derives the canonical prover address for a public key:
/// `poseidon(public_key)`.
pub fn hash_public_key(public_key: &[u8]) -> Result<[u8; 32], CryptoError> {
    hash_bytes(public_key)
}
