// Path: crates/types/src/config.rs

//! Engine configuration and protocol version constants.

use std::time::Duration;

/// Version triple of this node build, byte-comparable against announced peer
/// versions.
pub const VERSION: [u8; 3] = [2, 0, 1];

/// Minimum version a peer may announce without being penalized.
pub const MINIMUM_VERSION: [u8; 3] = [2, 0, 0];

/// Instant (unix milliseconds) after which the minimum-version penalty
/// applies. Announcements timestamped at or before the cutoff are tolerated
/// so that pre-upgrade peers are not scored out of the mesh retroactively.
pub const MINIMUM_VERSION_CUTOFF_MS: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z

/// Runtime configuration of the consensus message core.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Version triple reported in self-announcements.
    pub version: Vec<u8>,
    /// Minimum acceptable announced peer version.
    pub min_version: Vec<u8>,
    /// Cutoff instant for the minimum-version penalty, unix milliseconds.
    pub min_version_cutoff_ms: i64,
    /// Buffered capacity of each of the three inbound message queues.
    pub channel_capacity: usize,
    /// Maximum number of concurrently executing message handlers.
    pub handler_permits: usize,
    /// How long `stop()` waits for in-flight workers before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: VERSION.to_vec(),
            min_version: MINIMUM_VERSION.to_vec(),
            min_version_cutoff_ms: MINIMUM_VERSION_CUTOFF_MS,
            channel_capacity: 256,
            handler_permits: 64,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}
