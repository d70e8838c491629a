// Path: crates/networking/src/traits.rs
//! Trait definitions for the pubsub transport seam.

use async_trait::async_trait;

use quil_types::error::TransportError;

/// The pubsub transport as seen by the consensus core.
///
/// Implementations publish opaque envelopes on bitmask-filtered topics,
/// maintain per-peer application scores, and can resolve a peer id to a
/// reachable multiaddress. All methods must be callable concurrently.
#[async_trait]
pub trait PubSub: Send + Sync {
    /// The transport-level peer id of the local node.
    fn self_peer_id(&self) -> Vec<u8>;

    /// Publishes `data` on the topic identified by `filter`.
    async fn publish(&self, filter: &[u8], data: Vec<u8>) -> Result<(), TransportError>;

    /// Sets the application-layer score of a peer. Scores below the
    /// transport's graylist threshold effectively eject the peer from the
    /// mesh.
    async fn set_peer_score(&self, peer_id: &[u8], score: i32);

    /// Resolves the multiaddress the transport currently has for a peer, if
    /// any.
    async fn multiaddr_of(&self, peer_id: &[u8]) -> Option<String>;
}
