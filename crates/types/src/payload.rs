// Path: crates/types/src/payload.rs

//! Sealed dispatch over the type-tagged payload union.
//!
//! Inbound messages carry a protobuf `Any` whose `type_url` selects the
//! payload type. The stringly-typed URL is confined to this module: it is
//! parsed exactly once into [`Payload`], which the rest of the core matches
//! exhaustively. Unknown tags decode to [`Payload::Unknown`] and are ignored
//! by every handler, never rejected, so that newer peers can gossip types
//! this node does not yet understand.

use prost::Message;

use crate::error::CodecError;
use crate::wire::{
    ClockFrame, DataPeerListAnnounce, TokenRequest, CLOCK_FRAME_NAME,
    DATA_PEER_LIST_ANNOUNCE_NAME, TOKEN_REQUEST_NAME,
};

/// The system-specific type-URL prefix emitted on the outbound path.
pub const TYPE_URL_PREFIX: &str = "types.quilibrium.com";
/// The serialization library's default prefix, accepted inbound and rewritten
/// outbound.
pub const GOOGLE_TYPE_URL_PREFIX: &str = "type.googleapis.com";

/// A decoded gossip payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A candidate clock frame.
    ClockFrame(ClockFrame),
    /// A peer liveness/progress announcement.
    PeerListAnnounce(DataPeerListAnnounce),
    /// A token ledger state transition.
    TokenRequest(TokenRequest),
    /// A payload this node does not handle; carries the raw type URL.
    Unknown(String),
}

impl Payload {
    /// Decodes an `Any`'s `(type_url, value)` pair into a payload.
    ///
    /// Both the `types.quilibrium.com` and `type.googleapis.com` prefixes are
    /// accepted; any other prefix, or a known prefix with an unhandled
    /// message name, yields [`Payload::Unknown`].
    pub fn decode(type_url: &str, value: &[u8]) -> Result<Self, CodecError> {
        let Some(name) = qualified_name(type_url) else {
            return Ok(Payload::Unknown(type_url.to_string()));
        };
        match name {
            CLOCK_FRAME_NAME => Ok(Payload::ClockFrame(
                ClockFrame::decode(value).map_err(CodecError::Payload)?,
            )),
            DATA_PEER_LIST_ANNOUNCE_NAME => Ok(Payload::PeerListAnnounce(
                DataPeerListAnnounce::decode(value).map_err(CodecError::Payload)?,
            )),
            TOKEN_REQUEST_NAME => Ok(Payload::TokenRequest(
                TokenRequest::decode(value).map_err(CodecError::Payload)?,
            )),
            _ => Ok(Payload::Unknown(type_url.to_string())),
        }
    }

    /// Marshals the payload into a `prost_types::Any` with the outbound
    /// (quilibrium) type-URL prefix.
    ///
    /// The `Any` is first formed with the serialization library's default
    /// prefix and then rewritten by [`rewrite_type_url`], mirroring the
    /// outbound encode sequence of the wire contract.
    pub fn to_any(&self) -> Result<prost_types::Any, CodecError> {
        let (name, value) = match self {
            Payload::ClockFrame(frame) => (CLOCK_FRAME_NAME, frame.encode_to_vec()),
            Payload::PeerListAnnounce(announce) => {
                (DATA_PEER_LIST_ANNOUNCE_NAME, announce.encode_to_vec())
            }
            Payload::TokenRequest(request) => (TOKEN_REQUEST_NAME, request.encode_to_vec()),
            Payload::Unknown(url) => return Err(CodecError::UnknownPayload(url.clone())),
        };
        Ok(prost_types::Any {
            type_url: rewrite_type_url(&format!("{GOOGLE_TYPE_URL_PREFIX}/{name}")),
            value,
        })
    }
}

/// Rewrites the leftmost occurrence of the serialization library's default
/// type-URL prefix to the system-specific one. URLs already carrying the
/// system prefix pass through unchanged.
pub fn rewrite_type_url(type_url: &str) -> String {
    type_url.replacen(GOOGLE_TYPE_URL_PREFIX, TYPE_URL_PREFIX, 1)
}

/// Strips a recognized type-URL prefix, returning the fully-qualified message
/// name, or `None` when the prefix is foreign.
fn qualified_name(type_url: &str) -> Option<&str> {
    type_url
        .strip_prefix(TYPE_URL_PREFIX)
        .or_else(|| type_url.strip_prefix(GOOGLE_TYPE_URL_PREFIX))
        .and_then(|rest| rest.strip_prefix('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Ed448PublicKey;
    use crate::wire::PublicKeySignatureEd448;

    fn sample_frame() -> ClockFrame {
        ClockFrame {
            filter: vec![0xaa; 32],
            frame_number: 9,
            public_key_signature_ed448: Some(PublicKeySignatureEd448 {
                public_key: Some(Ed448PublicKey {
                    key_value: vec![3; 57],
                }),
                signature: vec![4; 114],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn decode_accepts_both_prefixes() {
        let frame = sample_frame();
        let any = Payload::ClockFrame(frame.clone()).to_any().unwrap();
        assert!(any.type_url.starts_with(TYPE_URL_PREFIX));

        let quil = Payload::decode(&any.type_url, &any.value).unwrap();
        assert_eq!(quil, Payload::ClockFrame(frame.clone()));

        let google_url = format!("{GOOGLE_TYPE_URL_PREFIX}/{CLOCK_FRAME_NAME}");
        let google = Payload::decode(&google_url, &any.value).unwrap();
        assert_eq!(google, Payload::ClockFrame(frame));
    }

    #[test]
    fn decode_ignores_foreign_prefix_and_unknown_name() {
        let unknown = Payload::decode("types.example.org/some.Other", &[]).unwrap();
        assert!(matches!(unknown, Payload::Unknown(_)));

        let url = format!("{TYPE_URL_PREFIX}/quilibrium.node.unknown.pb.Future");
        let unknown = Payload::decode(&url, &[]).unwrap();
        assert!(matches!(unknown, Payload::Unknown(_)));
    }

    #[test]
    fn rewrite_replaces_leftmost_occurrence_once() {
        let url = format!("{GOOGLE_TYPE_URL_PREFIX}/{CLOCK_FRAME_NAME}");
        assert_eq!(
            rewrite_type_url(&url),
            format!("{TYPE_URL_PREFIX}/{CLOCK_FRAME_NAME}")
        );
        // Already-rewritten URLs are left alone.
        let rewritten = rewrite_type_url(&rewrite_type_url(&url));
        assert_eq!(rewritten, format!("{TYPE_URL_PREFIX}/{CLOCK_FRAME_NAME}"));
    }

    #[test]
    fn unknown_payload_does_not_encode() {
        let unknown = Payload::Unknown("types.example.org/x.Y".into());
        assert!(unknown.to_any().is_err());
    }
}
