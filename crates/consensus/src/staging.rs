// Path: crates/consensus/src/staging.rs
//! Staged token transactions: a deduplicated, insertion-ordered list of
//! pending requests, accumulated only while the local node is an active
//! prover.
//!
//! Two requests collide when they share a variant and touch the same
//! resource: the same coin for transfers and splits, any overlapping coin
//! for merges, any overlapping proof for small mints, and the same signer
//! key for prover lifecycle requests. The first staged request wins; the
//! list is cleared by the frame production path when its contents are
//! committed.

use tokio::sync::Mutex;

use quil_types::error::EngineError;
use quil_types::wire::{token_request::Request, CoinRef, PublicKeySignatureEd448, TokenRequest};

use crate::engine::DataClockEngine;

/// Lazily-initialized staged request list behind a single exclusive lock.
pub(crate) struct StagedTransactions {
    requests: Mutex<Option<Vec<TokenRequest>>>,
}

impl StagedTransactions {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(None),
        }
    }

    /// Appends `request` unless it collides with an already staged one.
    pub(crate) async fn dedup_append(&self, request: TokenRequest) {
        let mut staged = self.requests.lock().await;
        let list = staged.get_or_insert_with(Vec::new);
        let found = list
            .iter()
            .any(|existing| requests_collide(existing, &request));
        if !found {
            list.push(request);
        }
    }

    /// Drains the staged list, leaving it uninitialized.
    pub(crate) async fn take(&self) -> Vec<TokenRequest> {
        self.requests.lock().await.take().unwrap_or_default()
    }

    pub(crate) async fn len(&self) -> usize {
        self.requests
            .lock()
            .await
            .as_ref()
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl DataClockEngine {
    /// Stages a token request if the local node is a current prover.
    ///
    /// Non-provers acknowledge and do nothing; duplicates per the collision
    /// rules are silently absorbed.
    pub async fn handle_token_request(&self, request: TokenRequest) -> Result<(), EngineError> {
        let is_prover = {
            let tries = self.prover_tries.read().await;
            tries
                .first()
                .map(|trie| trie.contains(&self.proving_key_address))
                .unwrap_or(false)
        };
        if !is_prover {
            return Ok(());
        }

        self.staged.dedup_append(request).await;
        Ok(())
    }

    /// Drains the staged token requests for inclusion in a produced frame.
    pub async fn take_staged_transactions(&self) -> Vec<TokenRequest> {
        self.staged.take().await
    }

    /// Number of currently staged token requests.
    pub async fn staged_transaction_count(&self) -> usize {
        self.staged.len().await
    }
}

/// Whether two token requests stage the same transition.
fn requests_collide(existing: &TokenRequest, incoming: &TokenRequest) -> bool {
    match (&existing.request, &incoming.request) {
        (Some(Request::Transfer(t)), Some(Request::Transfer(r))) => {
            same_coin(t.of_coin.as_ref(), r.of_coin.as_ref())
        }
        (Some(Request::Split(t)), Some(Request::Split(r))) => {
            same_coin(t.of_coin.as_ref(), r.of_coin.as_ref())
        }
        (Some(Request::Merge(t)), Some(Request::Merge(r))) => t
            .coins
            .iter()
            .any(|a| r.coins.iter().any(|b| a.address == b.address)),
        (Some(Request::Mint(t)), Some(Request::Mint(r))) => {
            // A mint carrying two or more proofs is a batch settlement and is
            // never considered a duplicate of earlier single-proof mints.
            r.proofs.len() < 2
                && t.proofs
                    .iter()
                    .any(|proof| r.proofs.iter().any(|other| proof == other))
        }
        (Some(Request::Announce(t)), Some(Request::Announce(r))) => {
            t.public_key_signatures_ed448.iter().any(|a| {
                r.public_key_signatures_ed448
                    .iter()
                    .any(|b| same_signer(Some(a), Some(b)))
            })
        }
        (Some(Request::Join(t)), Some(Request::Join(r))) => same_signer(
            t.public_key_signature_ed448.as_ref(),
            r.public_key_signature_ed448.as_ref(),
        ),
        (Some(Request::Leave(t)), Some(Request::Leave(r))) => same_signer(
            t.public_key_signature_ed448.as_ref(),
            r.public_key_signature_ed448.as_ref(),
        ),
        (Some(Request::Pause(t)), Some(Request::Pause(r))) => same_signer(
            t.public_key_signature_ed448.as_ref(),
            r.public_key_signature_ed448.as_ref(),
        ),
        (Some(Request::Resume(t)), Some(Request::Resume(r))) => same_signer(
            t.public_key_signature_ed448.as_ref(),
            r.public_key_signature_ed448.as_ref(),
        ),
        _ => false,
    }
}

fn same_coin(a: Option<&CoinRef>, b: Option<&CoinRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.address == b.address,
        _ => false,
    }
}

fn same_signer(a: Option<&PublicKeySignatureEd448>, b: Option<&PublicKeySignatureEd448>) -> bool {
    match (
        a.and_then(|s| s.public_key.as_ref()),
        b.and_then(|s| s.public_key.as_ref()),
    ) {
        (Some(a), Some(b)) => a.key_value == b.key_value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TopicFilters;
    use crate::testing::{MockFrameProver, MockPubSub, MockTimeReel, StaticTrie};
    use crate::traits::ProverTrie;
    use quil_types::config::EngineConfig;
    use quil_types::wire::{
        AnnounceProverJoin, AnnounceProverRequest, ClockFrame, Ed448PublicKey, MergeCoinRequest,
        MintCoinRequest, SplitCoinRequest, TransferCoinRequest,
    };
    use std::sync::Arc;
    use tokio::sync::RwLock;

    const PROVING_ADDRESS: [u8; 32] = [0xaa; 32];

    fn engine_with_trie(members: Vec<Vec<u8>>) -> Arc<DataClockEngine> {
        let trie: Arc<dyn ProverTrie> = Arc::new(StaticTrie::with_members(members));
        DataClockEngine::new(
            EngineConfig::default(),
            Arc::new(MockPubSub::new(vec![0xee; 32])),
            Arc::new(MockTimeReel::with_head(ClockFrame::default())),
            Arc::new(MockFrameProver::accepting()),
            Arc::new(RwLock::new(vec![trie])),
            Vec::new(),
            PROVING_ADDRESS.to_vec(),
            TopicFilters {
                frame: vec![1],
                tx: vec![2],
                info: vec![3],
            },
        )
    }

    fn prover_engine() -> Arc<DataClockEngine> {
        engine_with_trie(vec![PROVING_ADDRESS.to_vec()])
    }

    fn coin(address: u8) -> CoinRef {
        CoinRef {
            address: vec![address; 32],
        }
    }

    fn signer(key: u8) -> PublicKeySignatureEd448 {
        PublicKeySignatureEd448 {
            public_key: Some(Ed448PublicKey {
                key_value: vec![key; 57],
            }),
            signature: vec![0; 114],
        }
    }

    fn transfer(address: u8) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Transfer(TransferCoinRequest {
                to_account: vec![1; 32],
                of_coin: Some(coin(address)),
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    fn split(address: u8) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Split(SplitCoinRequest {
                of_coin: Some(coin(address)),
                amounts: vec![vec![1], vec![2]],
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    fn merge(addresses: &[u8]) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Merge(MergeCoinRequest {
                coins: addresses.iter().map(|a| coin(*a)).collect(),
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    fn mint(proofs: &[&[u8]]) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Mint(MintCoinRequest {
                proofs: proofs.iter().map(|p| p.to_vec()).collect(),
                signature: None,
            })),
            nonce: Vec::new(),
        }
    }

    fn join(key: u8) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Join(AnnounceProverJoin {
                filter: vec![0xaa; 32],
                frame_number: 1,
                public_key_signature_ed448: Some(signer(key)),
            })),
            nonce: Vec::new(),
        }
    }

    fn announce(keys: &[u8]) -> TokenRequest {
        TokenRequest {
            request: Some(Request::Announce(AnnounceProverRequest {
                public_key_signatures_ed448: keys.iter().map(|k| signer(*k)).collect(),
            })),
            nonce: Vec::new(),
        }
    }

    #[tokio::test]
    async fn non_provers_do_not_stage() {
        let engine = engine_with_trie(vec![vec![0x55; 32]]);
        engine.handle_token_request(transfer(1)).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 0);
    }

    #[tokio::test]
    async fn transfer_same_coin_dedups_first_wins() {
        let engine = prover_engine();
        engine.handle_token_request(transfer(1)).await.unwrap();
        engine.handle_token_request(transfer(1)).await.unwrap();
        engine.handle_token_request(transfer(2)).await.unwrap();

        let staged = engine.take_staged_transactions().await;
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0], transfer(1));
        assert_eq!(staged[1], transfer(2));
    }

    #[tokio::test]
    async fn split_same_coin_dedups() {
        let engine = prover_engine();
        engine.handle_token_request(split(1)).await.unwrap();
        engine.handle_token_request(split(1)).await.unwrap();
        engine.handle_token_request(split(2)).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 2);
    }

    #[tokio::test]
    async fn merge_with_any_shared_coin_dedups() {
        let engine = prover_engine();
        engine.handle_token_request(merge(&[1, 2])).await.unwrap();
        engine.handle_token_request(merge(&[2, 3])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 1);

        engine.handle_token_request(merge(&[4, 5])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 2);
    }

    #[tokio::test]
    async fn mint_under_two_proofs_dedups_but_batches_pass() {
        let engine = prover_engine();
        engine.handle_token_request(mint(&[b"p"])).await.unwrap();
        engine.handle_token_request(mint(&[b"p"])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 1);

        // Two or more proofs: the dedup clause is skipped even on overlap.
        engine.handle_token_request(mint(&[b"p", b"q"])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 2);
    }

    #[tokio::test]
    async fn announce_with_shared_signer_dedups() {
        let engine = prover_engine();
        engine.handle_token_request(announce(&[1, 2])).await.unwrap();
        engine.handle_token_request(announce(&[2, 3])).await.unwrap();
        engine.handle_token_request(announce(&[4])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 2);
    }

    #[tokio::test]
    async fn lifecycle_requests_dedup_by_signer_within_variant() {
        let engine = prover_engine();
        engine.handle_token_request(join(1)).await.unwrap();
        engine.handle_token_request(join(1)).await.unwrap();
        engine.handle_token_request(join(2)).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 2);
    }

    #[tokio::test]
    async fn different_variants_never_collide() {
        let engine = prover_engine();
        engine.handle_token_request(transfer(1)).await.unwrap();
        engine.handle_token_request(split(1)).await.unwrap();
        engine.handle_token_request(merge(&[1])).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 3);
    }

    #[tokio::test]
    async fn take_clears_the_list() {
        let engine = prover_engine();
        engine.handle_token_request(transfer(1)).await.unwrap();
        assert_eq!(engine.take_staged_transactions().await.len(), 1);
        assert_eq!(engine.staged_transaction_count().await, 0);

        // Staging resumes after a drain.
        engine.handle_token_request(transfer(1)).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Two transfers collide exactly when they touch the same coin.
            #[test]
            fn transfer_collision_is_same_coin(
                a in proptest::collection::vec(any::<u8>(), 1..64),
                b in proptest::collection::vec(any::<u8>(), 1..64),
            ) {
                let left = TokenRequest {
                    request: Some(Request::Transfer(TransferCoinRequest {
                        to_account: vec![1; 32],
                        of_coin: Some(CoinRef { address: a.clone() }),
                        signature: None,
                    })),
                    nonce: Vec::new(),
                };
                let right = TokenRequest {
                    request: Some(Request::Transfer(TransferCoinRequest {
                        to_account: vec![2; 32],
                        of_coin: Some(CoinRef { address: b.clone() }),
                        signature: None,
                    })),
                    nonce: Vec::new(),
                };
                prop_assert_eq!(requests_collide(&left, &right), a == b);
            }

            // The collision predicate is symmetric for every variant pair
            // except small-batch mints, whose proof-count clause reads only
            // the incoming side.
            #[test]
            fn merge_collision_is_symmetric(
                a in proptest::collection::vec(any::<u8>(), 1..8),
                b in proptest::collection::vec(any::<u8>(), 1..8),
            ) {
                let left = TokenRequest {
                    request: Some(Request::Merge(MergeCoinRequest {
                        coins: a.iter().map(|x| CoinRef { address: vec![*x] }).collect(),
                        signature: None,
                    })),
                    nonce: Vec::new(),
                };
                let right = TokenRequest {
                    request: Some(Request::Merge(MergeCoinRequest {
                        coins: b.iter().map(|x| CoinRef { address: vec![*x] }).collect(),
                        signature: None,
                    })),
                    nonce: Vec::new(),
                };
                prop_assert_eq!(
                    requests_collide(&left, &right),
                    requests_collide(&right, &left)
                );
            }
        }
    }

    #[tokio::test]
    async fn empty_trie_set_means_not_a_prover() {
        let trie: Vec<Arc<dyn ProverTrie>> = Vec::new();
        let engine = DataClockEngine::new(
            EngineConfig::default(),
            Arc::new(MockPubSub::new(vec![0xee; 32])),
            Arc::new(MockTimeReel::with_head(ClockFrame::default())),
            Arc::new(MockFrameProver::accepting()),
            Arc::new(RwLock::new(trie)),
            Vec::new(),
            PROVING_ADDRESS.to_vec(),
            TopicFilters {
                frame: vec![1],
                tx: vec![2],
                info: vec![3],
            },
        );
        engine.handle_token_request(transfer(1)).await.unwrap();
        assert_eq!(engine.staged_transaction_count().await, 0);
    }
}
