// Path: crates/consensus/src/tx.rs
//! Execution fan-out for the tx topic.
//!
//! Raw signed messages on the tx topic are not interpreted by the core
//! itself: each registered execution engine gets the message and returns the
//! application-level messages it extracts. Token requests among those are
//! staged. The fan-out only runs while the local node is a current prover
//! and is not synchronizing history.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use prost::Message;
use tracing::debug;

use quil_types::payload::Payload;
use quil_types::wire::SignedMessage;

use crate::engine::DataClockEngine;

/// Address of the intrinsic token application, the execution context for all
/// token-topic messages.
pub const TOKEN_ADDRESS: [u8; 32] = [
    0x11, 0x55, 0x5c, 0x26, 0x3b, 0xcd, 0xc3, 0x4e, 0x81, 0x6a, 0x9a, 0x4e, 0x31, 0x43, 0x1d,
    0x9a, 0x87, 0x2d, 0x86, 0x59, 0x52, 0x49, 0x4f, 0x49, 0x31, 0xd4, 0x70, 0xf6, 0xe1, 0x2c,
    0x83, 0xc6,
];

impl DataClockEngine {
    /// Fans a tx-topic message out to every execution engine.
    ///
    /// Gated on the local proving address being in the current first trie
    /// and on the node not syncing; otherwise a no-op. Each engine runs as
    /// its own pooled handler so one slow interpreter cannot stall the
    /// others or the tx queue.
    pub(crate) async fn dispatch_tx_message(self: Arc<Self>, message: &SignedMessage) {
        let is_prover = {
            let tries = self.prover_tries.read().await;
            tries
                .first()
                .map(|trie| trie.contains(&self.proving_key_address))
                .unwrap_or(false)
        };
        if !is_prover || self.syncing.load(Ordering::Relaxed) {
            return;
        }

        for engine in self.execution_engines.clone() {
            let core = self.clone();
            let message = message.clone();
            self.spawn_handler(async move {
                core.process_with_engine(engine, message).await;
            });
        }
    }

    async fn process_with_engine(
        &self,
        engine: Arc<dyn crate::traits::ExecutionEngine>,
        message: SignedMessage,
    ) {
        let app_messages = match engine.process_message(&TOKEN_ADDRESS, &message).await {
            Ok(app_messages) => app_messages,
            Err(e) => {
                debug!(
                    target: "consensus",
                    engine_name = engine.name(),
                    error = %e,
                    "could not process message for engine"
                );
                return;
            }
        };

        for app_message in app_messages {
            let any = match prost_types::Any::decode(app_message.payload.as_slice()) {
                Ok(any) => any,
                Err(e) => {
                    debug!(
                        target: "consensus",
                        engine_name = engine.name(),
                        error = %e,
                        "could not unmarshal app message"
                    );
                    continue;
                }
            };
            debug!(target: "consensus", message_type = %any.type_url, "app message type");

            match Payload::decode(&any.type_url, &any.value) {
                Ok(Payload::TokenRequest(request)) => {
                    if let Err(e) = self.handle_token_request(request).await {
                        debug!(
                            target: "consensus",
                            engine_name = engine.name(),
                            error = %e,
                            "could not stage token request"
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(
                        target: "consensus",
                        engine_name = engine.name(),
                        error = %e,
                        "could not decode app message payload"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TopicFilters;
    use crate::testing::{
        MockExecutionEngine, MockFrameProver, MockPubSub, MockTimeReel, StaticTrie,
    };
    use crate::traits::{ExecutionEngine, ProverTrie};
    use quil_types::config::EngineConfig;
    use quil_types::wire::{
        token_request::Request, ClockFrame, CoinRef, TokenRequest, TransferCoinRequest,
    };
    use std::time::Duration;
    use tokio::sync::RwLock;

    const PROVING_ADDRESS: [u8; 32] = [0xaa; 32];

    fn token_request(address: u8) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Transfer(TransferCoinRequest {
                to_account: vec![1; 32],
                of_coin: Some(CoinRef {
                    address: vec![address; 32],
                }),
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    fn app_message_of(request: &TokenRequest) -> SignedMessage {
        let any = Payload::TokenRequest(request.clone()).to_any().unwrap();
        SignedMessage {
            hash: Vec::new(),
            address: TOKEN_ADDRESS.to_vec(),
            payload: any.encode_to_vec(),
        }
    }

    fn engine_with(
        members: Vec<Vec<u8>>,
        engines: Vec<Arc<dyn ExecutionEngine>>,
    ) -> Arc<DataClockEngine> {
        let trie: Arc<dyn ProverTrie> = Arc::new(StaticTrie::with_members(members));
        DataClockEngine::new(
            EngineConfig::default(),
            Arc::new(MockPubSub::new(vec![0xee; 32])),
            Arc::new(MockTimeReel::with_head(ClockFrame::default())),
            Arc::new(MockFrameProver::accepting()),
            Arc::new(RwLock::new(vec![trie])),
            engines,
            PROVING_ADDRESS.to_vec(),
            TopicFilters {
                frame: vec![1],
                tx: vec![2],
                info: vec![3],
            },
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn engine_outputs_are_staged() {
        let request = token_request(1);
        let exec = Arc::new(MockExecutionEngine::returning(vec![app_message_of(
            &request,
        )]));
        let engine = engine_with(vec![PROVING_ADDRESS.to_vec()], vec![exec.clone()]);

        engine
            .clone()
            .dispatch_tx_message(&SignedMessage::default())
            .await;
        settle().await;

        assert_eq!(exec.processed(), 1);
        let staged = engine.take_staged_transactions().await;
        assert_eq!(staged, vec![request]);
    }

    #[tokio::test]
    async fn non_provers_skip_the_fan_out() {
        let exec = Arc::new(MockExecutionEngine::returning(vec![app_message_of(
            &token_request(1),
        )]));
        let engine = engine_with(vec![vec![0x55; 32]], vec![exec.clone()]);

        engine
            .clone()
            .dispatch_tx_message(&SignedMessage::default())
            .await;
        settle().await;

        assert_eq!(exec.processed(), 0);
        assert_eq!(engine.staged_transaction_count().await, 0);
    }

    #[tokio::test]
    async fn syncing_nodes_skip_the_fan_out() {
        let exec = Arc::new(MockExecutionEngine::returning(vec![app_message_of(
            &token_request(1),
        )]));
        let engine = engine_with(vec![PROVING_ADDRESS.to_vec()], vec![exec.clone()]);
        engine.set_syncing(true);

        engine
            .clone()
            .dispatch_tx_message(&SignedMessage::default())
            .await;
        settle().await;

        assert_eq!(exec.processed(), 0);
    }

    #[tokio::test]
    async fn failing_engine_does_not_poison_the_others() {
        let request = token_request(2);
        let failing = Arc::new(MockExecutionEngine::failing());
        let working = Arc::new(MockExecutionEngine::returning(vec![app_message_of(
            &request,
        )]));
        let engine = engine_with(
            vec![PROVING_ADDRESS.to_vec()],
            vec![failing.clone(), working.clone()],
        );

        engine
            .clone()
            .dispatch_tx_message(&SignedMessage::default())
            .await;
        settle().await;

        assert_eq!(engine.staged_transaction_count().await, 1);
    }

    #[tokio::test]
    async fn malformed_app_messages_are_skipped() {
        let garbage = SignedMessage {
            hash: Vec::new(),
            address: TOKEN_ADDRESS.to_vec(),
            payload: vec![0xff, 0xff, 0xff],
        };
        let exec = Arc::new(MockExecutionEngine::returning(vec![garbage]));
        let engine = engine_with(vec![PROVING_ADDRESS.to_vec()], vec![exec]);

        engine
            .clone()
            .dispatch_tx_message(&SignedMessage::default())
            .await;
        settle().await;

        assert_eq!(engine.staged_transaction_count().await, 0);
    }
}
