// Path: crates/consensus/src/engine.rs
//! The data clock consensus engine: queue ownership, demultiplexer workers,
//! and lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, watch, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, warn};

use quil_networking::PubSub;
use quil_types::config::EngineConfig;
use quil_types::error::EngineError;
use quil_types::payload::Payload;
use quil_types::wire::{SignedMessage, TransportEnvelope};

use crate::codec;
use crate::peers::PeerRegistry;
use crate::staging::StagedTransactions;
use crate::traits::{ExecutionEngine, FrameProver, ProverTrie, TimeReel};

/// The three topic filters the core subscribes and publishes on. Opaque to
/// the core; supplied by the host.
#[derive(Clone, Debug)]
pub struct TopicFilters {
    /// Clock frame gossip.
    pub frame: Vec<u8>,
    /// Token request gossip.
    pub tx: Vec<u8>,
    /// Peer announcement gossip.
    pub info: Vec<u8>,
}

/// Which of the three inbound queues a message belongs to.
#[derive(Clone, Copy, Debug)]
enum Queue {
    Frame,
    Tx,
    Info,
}

impl Queue {
    fn name(self) -> &'static str {
        match self {
            Queue::Frame => "frame",
            Queue::Tx => "tx",
            Queue::Info => "info",
        }
    }
}

type EnvelopeSender = StdMutex<Option<mpsc::Sender<TransportEnvelope>>>;

/// The message-handling and peer-state core of a data clock consensus node.
///
/// Owns the three inbound message queues, the peer registry, and the staged
/// transaction list. All other subsystems are shared collaborators reached
/// through trait objects.
pub struct DataClockEngine {
    pub(crate) config: EngineConfig,
    pub(crate) pub_sub: Arc<dyn PubSub>,
    pub(crate) time_reel: Arc<dyn TimeReel>,
    pub(crate) frame_prover: Arc<dyn FrameProver>,
    pub(crate) prover_tries: Arc<RwLock<Vec<Arc<dyn ProverTrie>>>>,
    pub(crate) execution_engines: Vec<Arc<dyn ExecutionEngine>>,
    pub(crate) proving_key_address: Vec<u8>,
    pub(crate) filters: TopicFilters,

    pub(crate) peers: PeerRegistry,
    pub(crate) staged: StagedTransactions,
    pub(crate) syncing: AtomicBool,

    frame_sender: EnvelopeSender,
    tx_sender: EnvelopeSender,
    info_sender: EnvelopeSender,
    #[allow(clippy::type_complexity)]
    receivers: StdMutex<
        Option<(
            mpsc::Receiver<TransportEnvelope>,
            mpsc::Receiver<TransportEnvelope>,
            mpsc::Receiver<TransportEnvelope>,
        )>,
    >,

    pub(crate) handler_permits: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    fatal: watch::Sender<bool>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl DataClockEngine {
    /// Creates a stopped engine. Call [`DataClockEngine::start`] to spawn the
    /// demultiplexer workers.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        pub_sub: Arc<dyn PubSub>,
        time_reel: Arc<dyn TimeReel>,
        frame_prover: Arc<dyn FrameProver>,
        prover_tries: Arc<RwLock<Vec<Arc<dyn ProverTrie>>>>,
        execution_engines: Vec<Arc<dyn ExecutionEngine>>,
        proving_key_address: Vec<u8>,
        filters: TopicFilters,
    ) -> Arc<Self> {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_capacity);
        let (tx_tx, tx_rx) = mpsc::channel(config.channel_capacity);
        let (info_tx, info_rx) = mpsc::channel(config.channel_capacity);
        let (shutdown, _) = watch::channel(false);
        let (fatal, _) = watch::channel(false);
        let handler_permits = Arc::new(Semaphore::new(config.handler_permits));

        Arc::new(Self {
            config,
            pub_sub,
            time_reel,
            frame_prover,
            prover_tries,
            execution_engines,
            proving_key_address,
            filters,
            peers: PeerRegistry::new(),
            staged: StagedTransactions::new(),
            syncing: AtomicBool::new(false),
            frame_sender: StdMutex::new(Some(frame_tx)),
            tx_sender: StdMutex::new(Some(tx_tx)),
            info_sender: StdMutex::new(Some(info_tx)),
            receivers: StdMutex::new(Some((frame_rx, tx_rx, info_rx))),
            handler_permits,
            shutdown,
            fatal,
            tasks: StdMutex::new(Vec::new()),
        })
    }

    /// Spawns the three demultiplexer workers. Idempotent; a second call is a
    /// no-op.
    pub fn start(self: &Arc<Self>) {
        let receivers = {
            let mut slot = lock(&self.receivers);
            slot.take()
        };
        let Some((frame_rx, tx_rx, info_rx)) = receivers else {
            return;
        };

        let handles = vec![
            tokio::spawn(self.clone().run_frame_message_worker(frame_rx)),
            tokio::spawn(self.clone().run_tx_message_worker(tx_rx)),
            tokio::spawn(self.clone().run_info_message_worker(info_rx)),
        ];
        lock(&self.tasks).extend(handles);
    }

    /// Stops the engine: closes the three channels, signals shutdown, joins
    /// the workers, and waits for in-flight handlers up to the configured
    /// grace period.
    pub async fn stop(&self) {
        lock(&self.frame_sender).take();
        lock(&self.tx_sender).take();
        lock(&self.info_sender).take();
        let _ = self.shutdown.send(true);

        let handles: Vec<JoinHandle<()>> = lock(&self.tasks).drain(..).collect();
        for mut handle in handles {
            if time::timeout(self.config.shutdown_grace, &mut handle)
                .await
                .is_err()
            {
                handle.abort();
            }
        }

        let permits = u32::try_from(self.config.handler_permits).unwrap_or(u32::MAX);
        match time::timeout(
            self.config.shutdown_grace,
            self.handler_permits.acquire_many(permits),
        )
        .await
        {
            Ok(Ok(acquired)) => drop(acquired),
            Ok(Err(_)) => {}
            Err(_) => warn!(target: "consensus", "handler tasks still running at shutdown"),
        }
        self.handler_permits.close();
    }

    /// A receiver that flips to `true` if the engine hits a condition the
    /// node cannot survive (an unreadable time-reel). Hosts must observe it
    /// and terminate the process.
    pub fn fatal_signal(&self) -> watch::Receiver<bool> {
        self.fatal.subscribe()
    }

    /// Marks the node as (not) synchronizing history. Execution fan-out is
    /// suspended while syncing.
    pub fn set_syncing(&self, syncing: bool) {
        self.syncing.store(syncing, Ordering::Relaxed);
    }

    // --- transport callbacks -------------------------------------------------

    /// Enqueues a frame-topic envelope. Never blocks the transport.
    pub fn handle_frame_message(&self, message: TransportEnvelope) {
        self.enqueue(Queue::Frame, &self.frame_sender, message);
    }

    /// Enqueues a tx-topic envelope. Never blocks the transport.
    pub fn handle_tx_message(&self, message: TransportEnvelope) {
        self.enqueue(Queue::Tx, &self.tx_sender, message);
    }

    /// Enqueues an info-topic envelope. Never blocks the transport.
    pub fn handle_info_message(&self, message: TransportEnvelope) {
        self.enqueue(Queue::Info, &self.info_sender, message);
    }

    fn enqueue(&self, queue: Queue, sender: &EnvelopeSender, message: TransportEnvelope) {
        let guard = lock(sender);
        let Some(sender) = guard.as_ref() else {
            debug!(target: "consensus", queue = queue.name(), "engine stopped, dropping message");
            return;
        };
        match sender.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(target: "consensus", queue = queue.name(), "inbound queue full, dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(target: "consensus", queue = queue.name(), "inbound queue closed, dropping message");
            }
        }
    }

    // --- demultiplexer workers ----------------------------------------------

    async fn run_frame_message_worker(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<TransportEnvelope>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        let mut fatal = self.fatal.subscribe();
        loop {
            let message = tokio::select! {
                _ = shutdown.changed() => break,
                _ = fatal.changed() => break,
                message = receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            debug!(target: "consensus", "handling frame message");
            let Some((signed, payload)) = self.decode_inbound(&message) else {
                continue;
            };
            if let Payload::ClockFrame(frame) = payload {
                let engine = self.clone();
                self.spawn_handler(async move {
                    if let Err(e) = engine
                        .handle_clock_frame(&message.from, &signed.address, frame, false)
                        .await
                    {
                        engine.observe_handler_error("clock frame", &e);
                    }
                });
            }
        }
    }

    async fn run_tx_message_worker(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<TransportEnvelope>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        let mut fatal = self.fatal.subscribe();
        loop {
            let message = tokio::select! {
                _ = shutdown.changed() => break,
                _ = fatal.changed() => break,
                message = receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            debug!(target: "consensus", "handling tx message");
            let signed = match codec::decode_signed_message(&message.data) {
                Ok(signed) => signed,
                Err(e) => {
                    debug!(target: "consensus", error = %e, "bad message");
                    continue;
                }
            };

            self.clone().dispatch_tx_message(&signed).await;

            match codec::decode_payload(&signed) {
                Ok((type_url, _)) => {
                    debug!(target: "consensus", message_type = %type_url, "message type");
                }
                Err(e) => {
                    debug!(target: "consensus", error = %e, "error while unmarshaling");
                }
            }
        }
    }

    async fn run_info_message_worker(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<TransportEnvelope>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        let mut fatal = self.fatal.subscribe();
        loop {
            let message = tokio::select! {
                _ = shutdown.changed() => break,
                _ = fatal.changed() => break,
                message = receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            debug!(target: "consensus", "handling info message");
            let Some((signed, payload)) = self.decode_inbound(&message) else {
                continue;
            };
            if let Payload::PeerListAnnounce(announce) = payload {
                let engine = self.clone();
                self.spawn_handler(async move {
                    if let Err(e) = engine
                        .handle_data_peer_list_announce(&message.from, &signed.address, announce)
                        .await
                    {
                        engine.observe_handler_error("peer list announce", &e);
                    }
                });
            }
        }
    }

    /// Decodes an inbound envelope down to its sealed payload. Malformed
    /// messages drop here, at debug level.
    fn decode_inbound(&self, envelope: &TransportEnvelope) -> Option<(SignedMessage, Payload)> {
        let signed = match codec::decode_signed_message(&envelope.data) {
            Ok(signed) => signed,
            Err(e) => {
                debug!(target: "consensus", error = %e, "bad message");
                return None;
            }
        };
        let (type_url, payload) = match codec::decode_payload(&signed) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(target: "consensus", error = %e, "error while unmarshaling");
                return None;
            }
        };
        debug!(target: "consensus", message_type = %type_url, "message type");
        Some((signed, payload))
    }

    /// Runs a handler on the bounded concurrent pool. The queue worker
    /// returns to its channel immediately; the handler waits for a permit if
    /// the pool is saturated.
    pub(crate) fn spawn_handler<F>(&self, handler: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let permits = self.handler_permits.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            handler.await;
        });
    }

    /// Routes a handler failure: fatal conditions raise the fatal signal,
    /// everything else is a dropped message.
    pub(crate) fn observe_handler_error(&self, context: &str, e: &EngineError) {
        if e.is_fatal() {
            error!(target: "consensus", context, error = %e, "fatal engine error");
            let _ = self.fatal.send(true);
        } else {
            debug!(target: "consensus", context, error = %e, "dropping message");
        }
    }
}

/// Locks a std mutex, recovering the inner data if a handler panicked while
/// holding it.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
