// Path: crates/types/src/wire.rs

//! Protobuf wire messages for the gossip envelope and its payloads.
//!
//! The encoding is bit-exact with the upstream protobuf schema: an outer
//! [`TransportEnvelope`] as handed over by the pubsub transport, an inner
//! [`SignedMessage`] whose `hash` is the Poseidon hash of `payload`, and a
//! type-tagged `Any` payload. Message and field numbering must not change;
//! every peer on the network depends on it.

/// Fully-qualified protobuf name of a clock frame payload.
pub const CLOCK_FRAME_NAME: &str = "quilibrium.node.clock.pb.ClockFrame";
/// Fully-qualified protobuf name of a peer list announcement payload.
pub const DATA_PEER_LIST_ANNOUNCE_NAME: &str = "quilibrium.node.node.pb.DataPeerListAnnounce";
/// Fully-qualified protobuf name of a token request payload.
pub const TOKEN_REQUEST_NAME: &str = "quilibrium.node.token.pb.TokenRequest";

/// The outer envelope handed to and from the pubsub transport.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransportEnvelope {
    /// Serialized [`SignedMessage`].
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    /// Opaque topic filter the envelope was published under.
    #[prost(bytes = "vec", tag = "2")]
    pub bitmask: Vec<u8>,
    /// Peer id of the sender as reported by the transport.
    #[prost(bytes = "vec", tag = "3")]
    pub from: Vec<u8>,
    /// Transport sequence number, if the transport assigns one.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub seqno: Option<Vec<u8>>,
}

/// The signed inner message carried by every gossip envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedMessage {
    /// Poseidon hash over `payload`.
    #[prost(bytes = "vec", tag = "1")]
    pub hash: Vec<u8>,
    /// Canonical address of the signer's proving identity.
    #[prost(bytes = "vec", tag = "2")]
    pub address: Vec<u8>,
    /// Serialized `Any` holding the type-tagged payload union.
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

/// An Ed448 public key.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ed448PublicKey {
    /// Raw 57-byte compressed key value.
    #[prost(bytes = "vec", tag = "1")]
    pub key_value: Vec<u8>,
}

/// An Ed448 public key together with a signature made by it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicKeySignatureEd448 {
    /// The signer's public key.
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Ed448PublicKey>,
    /// Raw 114-byte signature value.
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// One tick of the global logical clock.
///
/// Only `frame_number`, `filter` and the signer identity participate in the
/// core's admission logic; the remaining fields are opaque to it and are
/// interpreted by the frame prover.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClockFrame {
    /// Topic filter this frame belongs to.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Monotonic frame sequence number.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Prover-reported production timestamp, unix milliseconds.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// Difficulty parameter of the verifiable delay proof.
    #[prost(uint32, tag = "4")]
    pub difficulty: u32,
    /// Selector committing to the parent frame.
    #[prost(bytes = "vec", tag = "5")]
    pub parent_selector: Vec<u8>,
    /// Prover input material.
    #[prost(bytes = "vec", tag = "6")]
    pub input: Vec<u8>,
    /// Prover output material.
    #[prost(bytes = "vec", tag = "7")]
    pub output: Vec<u8>,
    /// Aggregated inclusion proofs for the data committed at this tick.
    #[prost(message, repeated, tag = "8")]
    pub aggregate_proofs: Vec<InclusionAggregateProof>,
    /// Signature of the producing prover over the frame.
    #[prost(message, optional, tag = "9")]
    pub public_key_signature_ed448: Option<PublicKeySignatureEd448>,
}

impl ClockFrame {
    /// Raw public key of the prover that signed this frame, if present.
    pub fn signer_public_key(&self) -> Option<&[u8]> {
        self.public_key_signature_ed448
            .as_ref()
            .and_then(|s| s.public_key.as_ref())
            .map(|k| k.key_value.as_slice())
    }

    /// Identity of a frame for ordering and equality purposes:
    /// frame number, filter, and signer key.
    pub fn identity(&self) -> (u64, &[u8], Option<&[u8]>) {
        (self.frame_number, &self.filter, self.signer_public_key())
    }
}

/// One aggregated inclusion proof inside a clock frame.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InclusionAggregateProof {
    /// Topic filter of the included commitments.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Frame number the proof was aggregated at.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Commitments covered by the proof.
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub inclusion_commitments: Vec<Vec<u8>>,
    /// Opaque aggregated proof bytes.
    #[prost(bytes = "vec", tag = "4")]
    pub proof: Vec<u8>,
}

/// Liveness and progress gossip about the peers of the data clock fleet.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataPeerListAnnounce {
    /// Announced peer records; only records about the sender itself are
    /// admissible.
    #[prost(message, repeated, tag = "1")]
    pub peer_list: Vec<DataPeer>,
}

/// A signed liveness/progress beacon for a single peer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataPeer {
    /// Peer id the record describes.
    #[prost(bytes = "vec", tag = "1")]
    pub peer_id: Vec<u8>,
    /// Reachable multiaddress, if the peer knows one for itself.
    #[prost(string, tag = "2")]
    pub multiaddr: String,
    /// Highest frame number the peer has observed.
    #[prost(uint64, tag = "3")]
    pub max_frame: u64,
    /// Announcement timestamp, unix milliseconds. Strictly increasing per
    /// peer; stale announcements are discarded.
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
    /// Node version triple of the announcing peer.
    #[prost(bytes = "vec", tag = "5")]
    pub version: Vec<u8>,
    /// Ed448 signature over `BE(max_frame) || version || BE(timestamp)`.
    #[prost(bytes = "vec", tag = "6")]
    pub signature: Vec<u8>,
    /// Raw Ed448 public key of the announcing peer.
    #[prost(bytes = "vec", tag = "7")]
    pub public_key: Vec<u8>,
    /// Cumulative time-reel distance, 256-byte big-endian.
    #[prost(bytes = "vec", tag = "8")]
    pub total_distance: Vec<u8>,
}

/// Reference to a coin by its address.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CoinRef {
    /// Address of the coin.
    #[prost(bytes = "vec", tag = "1")]
    pub address: Vec<u8>,
}

/// Transfers a coin to another account.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransferCoinRequest {
    /// Recipient account address.
    #[prost(bytes = "vec", tag = "1")]
    pub to_account: Vec<u8>,
    /// Coin being transferred.
    #[prost(message, optional, tag = "2")]
    pub of_coin: Option<CoinRef>,
    /// Owner's authorization signature.
    #[prost(message, optional, tag = "3")]
    pub signature: Option<PublicKeySignatureEd448>,
}

/// Splits one coin into several smaller ones.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SplitCoinRequest {
    /// Coin being split.
    #[prost(message, optional, tag = "1")]
    pub of_coin: Option<CoinRef>,
    /// Target amounts, big-endian.
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub amounts: Vec<Vec<u8>>,
    /// Owner's authorization signature.
    #[prost(message, optional, tag = "3")]
    pub signature: Option<PublicKeySignatureEd448>,
}

/// Merges several coins into one.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MergeCoinRequest {
    /// Coins being merged.
    #[prost(message, repeated, tag = "1")]
    pub coins: Vec<CoinRef>,
    /// Owner's authorization signature.
    #[prost(message, optional, tag = "2")]
    pub signature: Option<PublicKeySignatureEd448>,
}

/// Mints new coins from prover rewards.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MintCoinRequest {
    /// Proofs of eligible work, one per reward interval.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub proofs: Vec<Vec<u8>>,
    /// Prover's authorization signature.
    #[prost(message, optional, tag = "2")]
    pub signature: Option<PublicKeySignatureEd448>,
}

/// Announces a set of prover keys to the network.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceProverRequest {
    /// One signature per announced prover key.
    #[prost(message, repeated, tag = "1")]
    pub public_key_signatures_ed448: Vec<PublicKeySignatureEd448>,
}

/// Requests to join the prover set for a filter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceProverJoin {
    /// Filter being joined.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Frame number the request was made at.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Signature by the joining prover key.
    #[prost(message, optional, tag = "3")]
    pub public_key_signature_ed448: Option<PublicKeySignatureEd448>,
}

/// Requests to leave the prover set for a filter.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceProverLeave {
    /// Filter being left.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Frame number the request was made at.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Signature by the leaving prover key.
    #[prost(message, optional, tag = "3")]
    pub public_key_signature_ed448: Option<PublicKeySignatureEd448>,
}

/// Requests a temporary pause of proving duties.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceProverPause {
    /// Filter being paused on.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Frame number the request was made at.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Signature by the pausing prover key.
    #[prost(message, optional, tag = "3")]
    pub public_key_signature_ed448: Option<PublicKeySignatureEd448>,
}

/// Requests resumption of proving duties after a pause.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnnounceProverResume {
    /// Filter being resumed on.
    #[prost(bytes = "vec", tag = "1")]
    pub filter: Vec<u8>,
    /// Frame number the request was made at.
    #[prost(uint64, tag = "2")]
    pub frame_number: u64,
    /// Signature by the resuming prover key.
    #[prost(message, optional, tag = "3")]
    pub public_key_signature_ed448: Option<PublicKeySignatureEd448>,
}

/// A token ledger state transition staged by in-trie provers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenRequest {
    /// The requested transition.
    #[prost(
        oneof = "token_request::Request",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9"
    )]
    pub request: Option<token_request::Request>,
    /// Random 32-byte nonce, assigned on publish so that otherwise identical
    /// requests produce distinct envelope hashes.
    #[prost(bytes = "vec", tag = "10")]
    pub nonce: Vec<u8>,
}

/// Nested types of [`TokenRequest`].
pub mod token_request {
    /// The variant union of a token request.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        /// Transfer a coin.
        #[prost(message, tag = "1")]
        Transfer(super::TransferCoinRequest),
        /// Split a coin.
        #[prost(message, tag = "2")]
        Split(super::SplitCoinRequest),
        /// Merge coins.
        #[prost(message, tag = "3")]
        Merge(super::MergeCoinRequest),
        /// Mint coins from proofs.
        #[prost(message, tag = "4")]
        Mint(super::MintCoinRequest),
        /// Announce prover keys.
        #[prost(message, tag = "5")]
        Announce(super::AnnounceProverRequest),
        /// Join the prover set.
        #[prost(message, tag = "6")]
        Join(super::AnnounceProverJoin),
        /// Leave the prover set.
        #[prost(message, tag = "7")]
        Leave(super::AnnounceProverLeave),
        /// Pause proving duties.
        #[prost(message, tag = "8")]
        Pause(super::AnnounceProverPause),
        /// Resume proving duties.
        #[prost(message, tag = "9")]
        Resume(super::AnnounceProverResume),
    }
}
