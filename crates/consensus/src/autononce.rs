// Path: crates/consensus/src/autononce.rs
//! Nonce injection for outbound token requests.
//!
//! Token requests are frequently byte-identical (the same transfer retried,
//! the same join announced twice), and the envelope hash is computed over
//! the marshaled payload. A fresh 32-byte random nonce is stamped onto every
//! outbound token request so each envelope hashes uniquely. Other payload
//! types pass through untouched.

use rand::RngCore;

use quil_types::payload::Payload;
use quil_types::wire::TokenRequest;

/// Size of the injected nonce.
pub const NONCE_LENGTH: usize = 32;

/// Stamps a fresh random nonce onto an owned token request.
pub fn with_nonce(mut request: TokenRequest) -> TokenRequest {
    let mut nonce = vec![0u8; NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce);
    request.nonce = nonce;
    request
}

/// Applies nonce injection to a payload about to be published. Only token
/// requests are affected.
pub fn add(payload: Payload) -> Payload {
    match payload {
        Payload::TokenRequest(request) => Payload::TokenRequest(with_nonce(request)),
        other => other,
    }
}
