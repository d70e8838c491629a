// Path: crates/networking/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Quil Networking
//!
//! The transport-facing seam of the data clock consensus core. The pubsub
//! transport itself (mesh formation, topic routing, peer scoring internals)
//! lives outside this workspace; the consensus core reaches it exclusively
//! through the [`PubSub`] trait defined here, which keeps the core testable
//! against in-memory doubles and the transport swappable.

pub mod traits;

pub use traits::PubSub;
