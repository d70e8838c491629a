// Path: crates/consensus/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! # Quil Consensus
//!
//! The message-handling and peer-state core of a data clock consensus node.
//!
//! The core coordinates three gossip flows: candidate clock frames
//! (cryptographically verifiable ticks of the logical global clock), peer
//! announcements (signed liveness and fleet-progress beacons), and token
//! ledger requests (state transitions staged by in-trie provers). Each flow
//! has its own bounded queue fed by a transport callback and drained by one
//! long-running worker; individual handlers run on a bounded concurrent pool
//! so that slow verification never head-of-line-blocks a queue.
//!
//! The transport, the time-reel, the frame prover, and the execution engines
//! are external collaborators reached through the narrow traits in
//! [`traits`] and [`quil_networking::traits`].

/// Nonce injection for outbound token requests.
pub mod autononce;
/// Encoding and decoding of the two-layer gossip envelope.
pub mod codec;
/// Collaborator contracts: time-reel, frame prover, prover trie, execution.
pub mod traits;

mod engine;
mod frames;
mod peers;
mod publish;
mod staging;
mod tx;
mod util;

/// In-memory test doubles for the collaborator traits.
pub mod testing;

pub use engine::{DataClockEngine, TopicFilters};
pub use peers::PeerInfo;
pub use tx::TOKEN_ADDRESS;
