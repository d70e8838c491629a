// Path: crates/crypto/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::indexing_slicing
    )
)]

//! # Quil Crypto
//!
//! Cryptographic primitives of the data clock consensus core: the Poseidon
//! hash used for message hashes and prover addresses, and Ed448 key parsing,
//! signature verification, and peer-id derivation for peer announcements.
//! Panics are disallowed in non-test code; every malformed key or signature
//! surfaces as a typed [`CryptoError`].

/// Ed448 keys, signatures, and peer identity.
pub mod ed448;
/// Crypto error type.
pub mod error;
/// Poseidon hashing over arbitrary byte strings.
pub mod poseidon;

pub use error::CryptoError;
