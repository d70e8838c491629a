// Path: crates/consensus/src/testing.rs
//! In-memory test doubles for the collaborator traits.
//!
//! Each mock records the calls made against it so tests can assert on the
//! core's side effects without a transport, a reel, or a real prover.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use num_bigint::BigUint;

use quil_networking::PubSub;
use quil_types::error::{ExecutionError, ReelError, TransportError, VerifyError};
use quil_types::wire::{ClockFrame, SignedMessage};

use crate::traits::{ExecutionEngine, FrameProver, ProverTrie, TimeReel};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A pubsub double that records publishes and score changes.
pub struct MockPubSub {
    peer_id: Vec<u8>,
    published: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    scores: Mutex<Vec<(Vec<u8>, i32)>>,
    multiaddrs: Mutex<HashMap<Vec<u8>, String>>,
    fail_publish: AtomicBool,
}

impl MockPubSub {
    /// A transport whose local node has the given peer id.
    pub fn new(peer_id: Vec<u8>) -> Self {
        Self {
            peer_id,
            published: Mutex::new(Vec::new()),
            scores: Mutex::new(Vec::new()),
            multiaddrs: Mutex::new(HashMap::new()),
            fail_publish: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent publish fail.
    pub fn fail_publishes(&self) {
        self.fail_publish.store(true, Ordering::Relaxed);
    }

    /// Registers a multiaddress for a peer.
    pub fn set_multiaddr(&self, peer_id: Vec<u8>, multiaddr: String) {
        lock(&self.multiaddrs).insert(peer_id, multiaddr);
    }

    /// All `(filter, data)` pairs published so far.
    pub fn published(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        lock(&self.published).clone()
    }

    /// All scores assigned to `peer_id`, in order.
    pub fn scores_for(&self, peer_id: &[u8]) -> Vec<i32> {
        lock(&self.scores)
            .iter()
            .filter(|(id, _)| id == peer_id)
            .map(|(_, score)| *score)
            .collect()
    }
}

#[async_trait]
impl PubSub for MockPubSub {
    fn self_peer_id(&self) -> Vec<u8> {
        self.peer_id.clone()
    }

    async fn publish(&self, filter: &[u8], data: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::Relaxed) {
            return Err(TransportError::Publish("mock transport down".into()));
        }
        lock(&self.published).push((filter.to_vec(), data));
        Ok(())
    }

    async fn set_peer_score(&self, peer_id: &[u8], score: i32) {
        lock(&self.scores).push((peer_id.to_vec(), score));
    }

    async fn multiaddr_of(&self, peer_id: &[u8]) -> Option<String> {
        lock(&self.multiaddrs).get(peer_id).cloned()
    }
}

/// A time-reel double with a settable head and recorded inserts.
pub struct MockTimeReel {
    head: Mutex<Option<ClockFrame>>,
    inserted: Mutex<Vec<(ClockFrame, bool)>>,
    total_distance: Mutex<BigUint>,
    head_calls: AtomicUsize,
}

impl MockTimeReel {
    /// A reel whose head is `head`.
    pub fn with_head(head: ClockFrame) -> Self {
        Self {
            head: Mutex::new(Some(head)),
            inserted: Mutex::new(Vec::new()),
            total_distance: Mutex::new(BigUint::from(0u32)),
            head_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every subsequent `head()` call fail.
    pub fn fail_head(&self) {
        lock(&self.head).take();
    }

    /// Sets the cumulative distance the reel reports.
    pub fn set_total_distance(&self, distance: BigUint) {
        *lock(&self.total_distance) = distance;
    }

    /// All `(frame, is_sync)` pairs offered so far.
    pub fn inserted(&self) -> Vec<(ClockFrame, bool)> {
        lock(&self.inserted).clone()
    }

    /// How many times `head()` was read.
    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TimeReel for MockTimeReel {
    async fn head(&self) -> Result<ClockFrame, ReelError> {
        self.head_calls.fetch_add(1, Ordering::Relaxed);
        lock(&self.head)
            .clone()
            .ok_or_else(|| ReelError("mock reel unavailable".into()))
    }

    async fn insert(&self, frame: ClockFrame, is_sync: bool) {
        lock(&self.inserted).push((frame, is_sync));
    }

    async fn total_distance(&self) -> BigUint {
        lock(&self.total_distance).clone()
    }
}

/// A frame prover that accepts or rejects everything, counting calls.
pub struct MockFrameProver {
    accept: bool,
    verified: AtomicUsize,
}

impl MockFrameProver {
    /// A prover for which every frame verifies.
    pub fn accepting() -> Self {
        Self {
            accept: true,
            verified: AtomicUsize::new(0),
        }
    }

    /// A prover for which no frame verifies.
    pub fn rejecting() -> Self {
        Self {
            accept: false,
            verified: AtomicUsize::new(0),
        }
    }

    /// How many frames were offered for verification.
    pub fn verified(&self) -> usize {
        self.verified.load(Ordering::Relaxed)
    }
}

impl FrameProver for MockFrameProver {
    fn verify(&self, _frame: &ClockFrame) -> Result<(), VerifyError> {
        self.verified.fetch_add(1, Ordering::Relaxed);
        if self.accept {
            Ok(())
        } else {
            Err(VerifyError("mock prover rejects".into()))
        }
    }
}

/// A prover trie over a fixed membership set.
#[derive(Default)]
pub struct StaticTrie {
    members: HashSet<Vec<u8>>,
}

impl StaticTrie {
    /// A trie containing exactly `members`.
    pub fn with_members(members: Vec<Vec<u8>>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }
}

impl ProverTrie for StaticTrie {
    fn contains(&self, address: &[u8]) -> bool {
        self.members.contains(address)
    }
}

/// An execution engine returning a fixed set of app messages.
pub struct MockExecutionEngine {
    output: Result<Vec<SignedMessage>, String>,
    processed: AtomicUsize,
}

impl MockExecutionEngine {
    /// An engine that returns `output` for every message.
    pub fn returning(output: Vec<SignedMessage>) -> Self {
        Self {
            output: Ok(output),
            processed: AtomicUsize::new(0),
        }
    }

    /// An engine that fails every message.
    pub fn failing() -> Self {
        Self {
            output: Err("mock engine failure".into()),
            processed: AtomicUsize::new(0),
        }
    }

    /// How many messages were processed.
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExecutionEngine for MockExecutionEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn process_message(
        &self,
        _address: &[u8],
        _message: &SignedMessage,
    ) -> Result<Vec<SignedMessage>, ExecutionError> {
        self.processed.fetch_add(1, Ordering::Relaxed);
        match &self.output {
            Ok(messages) => Ok(messages.clone()),
            Err(e) => Err(ExecutionError(e.clone())),
        }
    }
}
