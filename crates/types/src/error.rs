// Path: crates/types/src/error.rs

//! Core error types for the data clock consensus core.
//!
//! The inbound pipeline is total: decode and verification failures are logged
//! at debug level and the offending message is dropped, never propagated past
//! the demultiplexer workers. The error enums here exist so that handlers can
//! report *why* a message died to their worker, and so that the few genuinely
//! surfaced conditions (outbound transport failures, a fatal time-reel) carry
//! a typed cause.

use thiserror::Error;

/// Envelope or payload (de)serialization failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The transport envelope's inner data did not decode as a signed
    /// message.
    #[error("signed message decode failed: {0}")]
    Envelope(prost::DecodeError),
    /// The signed message's payload did not decode as an `Any` or as the
    /// message its type URL names.
    #[error("payload decode failed: {0}")]
    Payload(prost::DecodeError),
    /// Hashing the marshaled payload failed.
    #[error("payload hash failed: {0}")]
    Hash(String),
    /// An attempt to encode a payload this node has no schema for.
    #[error("cannot encode unknown payload type {0}")]
    UnknownPayload(String),
}

/// Failure reported by the pubsub transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Publishing to a topic filter failed.
    #[error("publish failed: {0}")]
    Publish(String),
    /// The local enqueue channel for loopback messages is closed or full.
    #[error("local enqueue failed: {0}")]
    Enqueue(String),
}

/// Failure reported by the time-reel.
///
/// The time-reel is presumed always readable; a head failure is fatal to the
/// node.
#[derive(Debug, Error)]
#[error("time reel unavailable: {0}")]
pub struct ReelError(pub String);

/// Failure reported by the frame prover.
#[derive(Debug, Error)]
#[error("frame verification failed: {0}")]
pub struct VerifyError(pub String);

/// Failure reported by an execution engine while interpreting a message.
#[derive(Debug, Error)]
#[error("execution engine error: {0}")]
pub struct ExecutionError(pub String);

/// Top-level error surface of the consensus core's operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A message failed to decode. Dropped at debug level by the inbound
    /// pipeline.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A candidate frame failed cryptographic verification. Dropped at debug
    /// level by the inbound pipeline.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// An outbound transport operation failed. Surfaced to the caller on the
    /// frame publish path only.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The time-reel head could not be read. The process cannot continue.
    #[error("fatal: {0}")]
    Fatal(#[from] ReelError),
}

impl EngineError {
    /// Whether this error must terminate the node.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let fatal = EngineError::Fatal(ReelError("backing store gone".into()));
        assert!(fatal.is_fatal());

        let verify = EngineError::Verify(VerifyError("bad proof".into()));
        assert!(!verify.is_fatal());
    }
}
