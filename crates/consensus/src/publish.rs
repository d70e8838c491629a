// Path: crates/consensus/src/publish.rs
//! Outbound publishing: envelope wrapping, loopback injection, and the
//! frame-and-self-announce proof path.

use tracing::debug;

use quil_types::error::EngineError;
use quil_types::payload::Payload;
use quil_types::wire::{ClockFrame, DataPeer, DataPeerListAnnounce, TransportEnvelope};

use crate::autononce;
use crate::codec;
use crate::engine::DataClockEngine;
use crate::peers::PeerInfo;
use crate::util::{fill_bytes_be, now_unix_millis, now_unix_secs};

/// Width of the total-distance field on the wire.
const TOTAL_DISTANCE_BYTES: usize = 256;

impl DataClockEngine {
    /// Wraps `payload` in the signed envelope and publishes it on `filter`.
    ///
    /// Token requests receive a fresh nonce before marshaling so repeated
    /// publishes of the same request produce distinct envelope hashes.
    pub async fn publish_message(
        &self,
        filter: &[u8],
        payload: Payload,
    ) -> Result<(), EngineError> {
        let payload = autononce::add(payload);
        let (_, data) = codec::encode_message(&payload, &self.proving_key_address)?;
        self.pub_sub.publish(filter, data).await?;
        Ok(())
    }

    /// Encodes `payload` like [`DataClockEngine::publish_message`] but
    /// enqueues the envelope on the local tx queue instead of the transport.
    /// Used for locally-originated transactions.
    pub fn insert_tx_message(&self, filter: &[u8], payload: &Payload) -> Result<(), EngineError> {
        let (_, data) = codec::encode_message(payload, &self.proving_key_address)?;
        let envelope = TransportEnvelope {
            data,
            bitmask: filter.to_vec(),
            from: self.pub_sub.self_peer_id(),
            seqno: None,
        };
        self.handle_tx_message(envelope);
        Ok(())
    }

    /// Publishes a frame produced by the local prover.
    ///
    /// The local peer entry is refreshed with the frame's progress and the
    /// reel's total distance, a self-announcement goes out on the info
    /// filter (failures logged and swallowed), and the frame goes out on the
    /// frame filter (failures surfaced to the caller).
    pub async fn publish_proof(&self, frame: &ClockFrame) -> Result<(), EngineError> {
        debug!(
            target: "consensus",
            frame_number = frame.frame_number,
            "publishing frame and aggregations"
        );

        let timestamp = now_unix_millis();
        let total_distance =
            fill_bytes_be(&self.time_reel.total_distance().await, TOTAL_DISTANCE_BYTES);
        let self_id = self.pub_sub.self_peer_id();

        self.peers
            .insert(PeerInfo {
                peer_id: self_id.clone(),
                multiaddr: None,
                max_frame: frame.frame_number,
                timestamp,
                version: self.config.version.clone(),
                signature: Vec::new(),
                public_key: Vec::new(),
                total_distance: total_distance.clone(),
                direct: true,
                last_seen: now_unix_secs(),
            })
            .await;

        let announce = DataPeerListAnnounce {
            peer_list: vec![DataPeer {
                peer_id: self_id,
                multiaddr: String::new(),
                max_frame: frame.frame_number,
                timestamp,
                version: self.config.version.clone(),
                signature: Vec::new(),
                public_key: Vec::new(),
                total_distance,
            }],
        };
        let info_filter = self.filters.info.clone();
        if let Err(e) = self
            .publish_message(&info_filter, Payload::PeerListAnnounce(announce))
            .await
        {
            debug!(target: "consensus", error = %e, "error publishing message");
        }

        let frame_filter = self.filters.frame.clone();
        self.publish_message(&frame_filter, Payload::ClockFrame(frame.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TopicFilters;
    use crate::testing::{MockFrameProver, MockPubSub, MockTimeReel, StaticTrie};
    use crate::traits::ProverTrie;
    use num_bigint::BigUint;
    use quil_types::config::EngineConfig;
    use quil_types::wire::{token_request::Request, CoinRef, TokenRequest, TransferCoinRequest};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    const SELF_ID: [u8; 32] = [0xee; 32];

    struct Harness {
        engine: Arc<DataClockEngine>,
        pub_sub: Arc<MockPubSub>,
        time_reel: Arc<MockTimeReel>,
    }

    fn harness() -> Harness {
        let pub_sub = Arc::new(MockPubSub::new(SELF_ID.to_vec()));
        let time_reel = Arc::new(MockTimeReel::with_head(ClockFrame::default()));
        let trie: Arc<dyn ProverTrie> = Arc::new(StaticTrie::default());
        let engine = DataClockEngine::new(
            EngineConfig::default(),
            pub_sub.clone(),
            time_reel.clone(),
            Arc::new(MockFrameProver::accepting()),
            Arc::new(RwLock::new(vec![trie])),
            Vec::new(),
            vec![0xaa; 32],
            TopicFilters {
                frame: vec![0x0f],
                tx: vec![0x02],
                info: vec![0x03],
            },
        );
        Harness {
            engine,
            pub_sub,
            time_reel,
        }
    }

    fn token_request() -> TokenRequest {
        TokenRequest {
            request: Some(Request::Transfer(TransferCoinRequest {
                to_account: vec![1; 32],
                of_coin: Some(CoinRef {
                    address: vec![2; 32],
                }),
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    #[tokio::test]
    async fn publish_message_hands_envelope_to_transport() {
        let h = harness();
        h.engine
            .publish_message(&[0x0f], Payload::ClockFrame(ClockFrame::default()))
            .await
            .unwrap();

        let published = h.pub_sub.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, vec![0x0f]);

        let signed = codec::decode_signed_message(&published[0].1).unwrap();
        assert_eq!(signed.address, vec![0xaa; 32]);
    }

    #[tokio::test]
    async fn repeated_token_publishes_have_distinct_hashes() {
        let h = harness();
        let request = token_request();
        for _ in 0..2 {
            h.engine
                .publish_message(&[0x02], Payload::TokenRequest(request.clone()))
                .await
                .unwrap();
        }

        let published = h.pub_sub.published();
        let first = codec::decode_signed_message(&published[0].1).unwrap();
        let second = codec::decode_signed_message(&published[1].1).unwrap();
        assert_ne!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let h = harness();
        h.pub_sub.fail_publishes();
        let result = h
            .engine
            .publish_message(&[0x0f], Payload::ClockFrame(ClockFrame::default()))
            .await;
        assert!(matches!(result, Err(EngineError::Transport(_))));
    }

    #[tokio::test]
    async fn insert_tx_message_loops_back_without_transport() {
        let h = harness();
        h.engine
            .insert_tx_message(&[0x02], &Payload::TokenRequest(token_request()))
            .unwrap();
        assert!(h.pub_sub.published().is_empty());
    }

    #[tokio::test]
    async fn publish_proof_updates_self_entry_and_publishes_both_topics() {
        let h = harness();
        h.time_reel.set_total_distance(BigUint::from(0x1234u32));

        let frame = ClockFrame {
            frame_number: 77,
            ..Default::default()
        };
        h.engine.publish_proof(&frame).await.unwrap();

        let info = h.engine.get_peer_info(&SELF_ID).await.unwrap();
        assert_eq!(info.max_frame, 77);
        assert_eq!(info.total_distance.len(), 256);
        assert_eq!(&info.total_distance[254..], &[0x12, 0x34]);

        let published = h.pub_sub.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, vec![0x03]); // info first
        assert_eq!(published[1].0, vec![0x0f]); // then the frame
    }

    #[tokio::test]
    async fn publish_proof_survives_info_failure_but_surfaces_frame_failure() {
        let h = harness();
        h.pub_sub.fail_publishes();
        let result = h.engine.publish_proof(&ClockFrame::default()).await;
        assert!(matches!(result, Err(EngineError::Transport(_))));
    }
}
