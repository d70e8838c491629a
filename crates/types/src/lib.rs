// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

//! # Quil Types
//!
//! This crate is the foundational library for the data clock consensus core,
//! containing the wire-level message model, the sealed payload dispatch enum,
//! error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `quil-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. It owns the canonical
//! definition of the two-layer gossip envelope (`TransportEnvelope` wrapping a
//! `SignedMessage` wrapping a type-tagged payload) so that the consensus core
//! and the transport agree on a single bit-exact encoding.

/// Engine configuration and protocol version constants.
pub mod config;
/// A unified set of error types used across the workspace.
pub mod error;
/// Sealed dispatch over the type-tagged payload union.
pub mod payload;
/// Protobuf wire messages for the gossip envelope and payloads.
pub mod wire;
