// Path: crates/consensus/src/peers.rs
//! Peer registry: announcement validation, scoring, and the liveness map.
//!
//! Announcements are only accepted about the sender itself, must carry a
//! parseable Ed448 key whose derived peer id matches the record, and must be
//! signed over `BE(max_frame) || version || BE(timestamp)`. Validated records
//! replace an existing entry only when strictly newer, so the stored
//! timestamp is monotone per peer.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use quil_crypto::ed448;
use quil_types::error::EngineError;
use quil_types::wire::{DataPeer, DataPeerListAnnounce};

use crate::engine::DataClockEngine;
use crate::util::now_unix_secs;

/// Application-layer score granted for a valid announcement.
const ANNOUNCE_SCORE: i32 = 10;
/// Application-layer score that ejects a peer running an outdated version.
const OUTDATED_VERSION_SCORE: i32 = -1_000_000;

/// The liveness record kept for each announced peer.
#[derive(Clone, Debug)]
pub struct PeerInfo {
    /// Peer id the record describes.
    pub peer_id: Vec<u8>,
    /// Multiaddress the transport resolves for the peer, if any.
    pub multiaddr: Option<String>,
    /// Highest frame the peer claims to have observed.
    pub max_frame: u64,
    /// Announcement timestamp, unix milliseconds. Monotone per peer.
    pub timestamp: i64,
    /// Announced node version triple.
    pub version: Vec<u8>,
    /// Announcement signature.
    pub signature: Vec<u8>,
    /// Announcing Ed448 public key.
    pub public_key: Vec<u8>,
    /// Cumulative time-reel distance, 256-byte big-endian.
    pub total_distance: Vec<u8>,
    /// Whether the record came directly from the announced peer.
    pub direct: bool,
    /// When this node last accepted a record for the peer, unix seconds.
    pub last_seen: i64,
}

/// Concurrent map of peer id to liveness record, plus the set of peers
/// masked as uncooperative.
pub(crate) struct PeerRegistry {
    peers: RwLock<HashMap<Vec<u8>, PeerInfo>>,
    uncooperative: RwLock<HashSet<Vec<u8>>>,
}

impl PeerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            uncooperative: RwLock::new(HashSet::new()),
        }
    }

    pub(crate) async fn get(&self, peer_id: &[u8]) -> Option<PeerInfo> {
        self.peers.read().await.get(peer_id).cloned()
    }

    pub(crate) async fn count(&self) -> usize {
        self.peers.read().await.len()
    }

    pub(crate) async fn is_uncooperative(&self, peer_id: &[u8]) -> bool {
        self.uncooperative.read().await.contains(peer_id)
    }

    pub(crate) async fn mark_uncooperative(&self, peer_id: Vec<u8>) {
        self.uncooperative.write().await.insert(peer_id);
    }

    /// Inserts `info` unless an existing record is newer or strictly more
    /// informed. The monotonic comparison runs under the write lock, so two
    /// racing announcements cannot clobber a newer record with an older one.
    pub(crate) async fn insert_if_newer(&self, info: PeerInfo) -> bool {
        let mut peers = self.peers.write().await;
        if let Some(existing) = peers.get(&info.peer_id) {
            if !existing.signature.is_empty() && info.signature.is_empty() {
                return false;
            }
            if !existing.public_key.is_empty() && info.public_key.is_empty() {
                return false;
            }
            if !existing.version.is_empty() && info.version.is_empty() {
                return false;
            }
            if existing.timestamp > info.timestamp {
                return false;
            }
        }
        peers.insert(info.peer_id.clone(), info);
        true
    }

    /// Unconditional insert, used for the local node's own entry.
    pub(crate) async fn insert(&self, info: PeerInfo) {
        self.peers.write().await.insert(info.peer_id.clone(), info);
    }
}

impl DataClockEngine {
    /// Handles a peer list announcement from the info topic.
    ///
    /// Each record is validated independently; invalid records are skipped
    /// without failing the announcement. The returned result exists for
    /// symmetry with the other handlers and is currently always `Ok`.
    pub async fn handle_data_peer_list_announce(
        &self,
        peer_id: &[u8],
        _address: &[u8],
        announce: DataPeerListAnnounce,
    ) -> Result<(), EngineError> {
        let self_id = self.pub_sub.self_peer_id();
        for peer in &announce.peer_list {
            if peer.peer_id == self_id {
                continue;
            }
            if peer.peer_id != peer_id {
                // Peers cannot announce on behalf of others.
                continue;
            }
            self.admit_peer_record(peer_id, peer).await;
        }
        Ok(())
    }

    /// Validates and, if admissible, stores one announced peer record.
    async fn admit_peer_record(&self, sender: &[u8], peer: &DataPeer) {
        if peer.public_key.is_empty() || peer.signature.is_empty() || peer.version.is_empty() {
            return;
        }

        if let Err(e) = ed448::parse_public_key(&peer.public_key) {
            warn!(
                target: "consensus",
                public_key = %hex::encode(&peer.public_key),
                error = %e,
                "peer announcement contained invalid pubkey"
            );
            return;
        }

        if !ed448::peer_id_matches(&peer.peer_id, &peer.public_key) {
            warn!(
                target: "consensus",
                peer_id = %hex::encode(&peer.peer_id),
                public_key = %hex::encode(&peer.public_key),
                "peer announcement peer id does not match pubkey"
            );
            return;
        }

        let message = announcement_signing_message(peer.max_frame, &peer.version, peer.timestamp);
        if ed448::verify(&peer.public_key, &message, &peer.signature).is_err() {
            warn!(
                target: "consensus",
                peer_id = %hex::encode(&peer.peer_id),
                public_key = %hex::encode(&peer.public_key),
                "peer provided invalid signature"
            );
            return;
        }

        if peer.version.as_slice() < self.config.min_version.as_slice()
            && peer.timestamp > self.config.min_version_cutoff_ms
        {
            debug!(
                target: "consensus",
                peer_id = %hex::encode(&peer.peer_id),
                "peer provided outdated version, penalizing app score"
            );
            self.pub_sub
                .set_peer_score(&peer.peer_id, OUTDATED_VERSION_SCORE)
                .await;
            return;
        }

        if self.peers.is_uncooperative(&peer.peer_id).await {
            return;
        }

        let multiaddr = self.pub_sub.multiaddr_of(&peer.peer_id).await;

        self.pub_sub
            .set_peer_score(&peer.peer_id, ANNOUNCE_SCORE)
            .await;

        if let Some(existing) = self.peers.get(&peer.peer_id).await {
            if existing.timestamp > peer.timestamp {
                return;
            }
        }

        self.peers
            .insert_if_newer(PeerInfo {
                peer_id: peer.peer_id.clone(),
                multiaddr,
                max_frame: peer.max_frame,
                timestamp: peer.timestamp,
                version: peer.version.clone(),
                signature: peer.signature.clone(),
                public_key: peer.public_key.clone(),
                total_distance: peer.total_distance.clone(),
                direct: peer.peer_id == sender,
                last_seen: now_unix_secs(),
            })
            .await;
    }

    /// Number of peers currently tracked in the registry.
    pub async fn peer_count(&self) -> usize {
        self.peers.count().await
    }

    /// The stored liveness record for a peer, if any.
    pub async fn get_peer_info(&self, peer_id: &[u8]) -> Option<PeerInfo> {
        self.peers.get(peer_id).await
    }

    /// Masks a peer from future admission to the registry. Used by the sync
    /// subsystem when a peer repeatedly fails to serve history.
    pub async fn mark_uncooperative(&self, peer_id: Vec<u8>) {
        self.peers.mark_uncooperative(peer_id).await;
    }
}

/// The canonical signing input of a peer announcement:
/// `BE_u64(max_frame) || version || BE_u64(timestamp)`.
pub(crate) fn announcement_signing_message(
    max_frame: u64,
    version: &[u8],
    timestamp: i64,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(16 + version.len());
    message.extend_from_slice(&max_frame.to_be_bytes());
    message.extend_from_slice(version);
    message.extend_from_slice(&(timestamp as u64).to_be_bytes());
    message
}
