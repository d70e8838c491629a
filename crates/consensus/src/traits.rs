// Path: crates/consensus/src/traits.rs
//! Collaborator contracts of the consensus core.
//!
//! The core never owns these subsystems; it submits candidates to the
//! time-reel, asks the frame prover to verify, consults the prover trie for
//! committee membership, and hands raw messages to the execution engines.
//! Fork choice, proof checking, and transaction semantics all live behind
//! these seams.

use async_trait::async_trait;
use num_bigint::BigUint;

use quil_types::error::{ExecutionError, ReelError, VerifyError};
use quil_types::wire::{ClockFrame, SignedMessage};

/// The append-only ordered store of accepted clock frames.
///
/// The reel is authoritative for the current head and for cumulative
/// distance, and resolves forks internally; the core only offers candidates.
#[async_trait]
pub trait TimeReel: Send + Sync {
    /// The current head frame.
    ///
    /// The reel is presumed always readable: an error here is fatal to the
    /// node and must never be silently retried.
    async fn head(&self) -> Result<ClockFrame, ReelError>;

    /// Offers a candidate frame. `is_sync` marks frames obtained through
    /// history synchronization rather than live gossip.
    async fn insert(&self, frame: ClockFrame, is_sync: bool);

    /// Cumulative distance of the main branch, for fork-choice gossip.
    async fn total_distance(&self) -> BigUint;
}

/// Cryptographic verification of a clock frame's internal proofs.
pub trait FrameProver: Send + Sync {
    /// Verifies the frame's verifiable-delay output and aggregate proofs.
    fn verify(&self, frame: &ClockFrame) -> Result<(), VerifyError>;
}

/// The current committee of frame producers, keyed by Poseidon-hashed
/// public keys.
pub trait ProverTrie: Send + Sync {
    /// Whether `address` belongs to the committee.
    fn contains(&self, address: &[u8]) -> bool;
}

/// An application execution engine that interprets raw signed messages into
/// application-level messages.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Stable name of the engine, for logging.
    fn name(&self) -> &str;

    /// Interprets `message` in the context of the application at `address`,
    /// returning any application messages it produces.
    async fn process_message(
        &self,
        address: &[u8],
        message: &SignedMessage,
    ) -> Result<Vec<SignedMessage>, ExecutionError>;
}
