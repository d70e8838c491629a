// Path: crates/crypto/src/error.rs
//! Local error types for the `quil-crypto` crate.

use thiserror::Error;

/// Errors from cryptographic primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A public key was malformed or had the wrong length.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// A signature was malformed or had the wrong length.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// A signature did not verify over the given message.
    #[error("signature verification failed")]
    VerificationFailed,
    /// The Poseidon permutation could not be evaluated.
    #[error("poseidon hash failed: {0}")]
    Hash(String),
}
