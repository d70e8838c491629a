// Path: crates/consensus/src/frames.rs
//! Clock frame admission: verification, trie gating, and head advancement.

use prost::Message;
use tracing::debug;

use quil_crypto::poseidon;
use quil_types::error::{CodecError, EngineError, VerifyError};
use quil_types::wire::ClockFrame;

use crate::engine::DataClockEngine;

impl DataClockEngine {
    /// Handles a candidate clock frame received as raw payload bytes.
    ///
    /// Envelopes looped back from this node are acknowledged without side
    /// effects. `is_sync` marks frames obtained through history
    /// synchronization; admission is identical either way.
    pub async fn handle_clock_frame_data(
        &self,
        peer_id: &[u8],
        address: &[u8],
        payload: &[u8],
        is_sync: bool,
    ) -> Result<(), EngineError> {
        if peer_id == self.pub_sub.self_peer_id().as_slice() {
            return Ok(());
        }
        let frame = ClockFrame::decode(payload).map_err(CodecError::Payload)?;
        self.handle_clock_frame(peer_id, address, frame, is_sync).await
    }

    /// Admission pipeline for a decoded candidate frame.
    ///
    /// A frame whose prover is not in the current first trie is skipped
    /// silently (the sender may be on a fork); a frame that fails
    /// verification is an error the demultiplexer drops at debug level. A
    /// surviving frame advances the time-reel only if it is ahead of the
    /// current head.
    pub(crate) async fn handle_clock_frame(
        &self,
        peer_id: &[u8],
        address: &[u8],
        frame: ClockFrame,
        _is_sync: bool,
    ) -> Result<(), EngineError> {
        if peer_id == self.pub_sub.self_peer_id().as_slice() {
            return Ok(());
        }

        let Some(signer_key) = frame.signer_public_key() else {
            return Err(VerifyError("frame carries no signer public key".into()).into());
        };
        let prover_address = poseidon::hash_public_key(signer_key)
            .map_err(|e| VerifyError(e.to_string()))?;

        let in_trie = {
            let tries = self.prover_tries.read().await;
            tries
                .first()
                .map(|trie| trie.contains(&prover_address))
                .unwrap_or(false)
        };
        if !in_trie {
            debug!(
                target: "consensus",
                address = %hex::encode(address),
                filter = %hex::encode(&frame.filter),
                frame_number = frame.frame_number,
                "prover not in trie at frame, address may be in fork"
            );
            return Ok(());
        }

        debug!(
            target: "consensus",
            address = %hex::encode(address),
            filter = %hex::encode(&frame.filter),
            frame_number = frame.frame_number,
            proof_count = frame.aggregate_proofs.len(),
            "got clock frame"
        );

        if let Err(e) = self.frame_prover.verify(&frame) {
            debug!(target: "consensus", error = %e, "could not verify clock frame");
            return Err(e.into());
        }

        debug!(
            target: "consensus",
            address = %hex::encode(address),
            filter = %hex::encode(&frame.filter),
            frame_number = frame.frame_number,
            "clock frame was valid"
        );

        let head = self.time_reel.head().await?;
        if frame.frame_number > head.frame_number {
            self.time_reel.insert(frame, false).await;
        }

        Ok(())
    }
}
