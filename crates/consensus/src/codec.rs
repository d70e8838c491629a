// Path: crates/consensus/src/codec.rs
//! Encoding and decoding of the two-layer gossip envelope.
//!
//! Inbound: a [`TransportEnvelope`]'s data decodes to a [`SignedMessage`],
//! whose payload decodes to a type-tagged `Any`, which the sealed
//! [`Payload`] enum resolves. Outbound: a payload is marshaled into an
//! `Any`, its type-URL prefix rewritten to the system domain, Poseidon-hashed,
//! and wrapped into a signed message ready for the transport.

use prost::Message;

use quil_crypto::poseidon;
use quil_types::error::CodecError;
use quil_types::payload::Payload;
use quil_types::wire::SignedMessage;

/// Decodes the inner signed message of a transport envelope.
pub fn decode_signed_message(data: &[u8]) -> Result<SignedMessage, CodecError> {
    SignedMessage::decode(data).map_err(CodecError::Envelope)
}

/// Decodes a signed message's payload into its raw type URL and the sealed
/// payload it names.
pub fn decode_payload(message: &SignedMessage) -> Result<(String, Payload), CodecError> {
    let any =
        prost_types::Any::decode(message.payload.as_slice()).map_err(CodecError::Payload)?;
    let payload = Payload::decode(&any.type_url, &any.value)?;
    Ok((any.type_url, payload))
}

/// Marshals a payload into signed-message wire bytes.
///
/// Returns the Poseidon hash of the marshaled payload together with the
/// encoded [`SignedMessage`] that carries it.
pub fn encode_message(
    payload: &Payload,
    address: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
    let any = payload.to_any()?;
    let payload_bytes = any.encode_to_vec();
    let hash = poseidon::hash_bytes(&payload_bytes)
        .map_err(|e| CodecError::Hash(e.to_string()))?
        .to_vec();
    let message = SignedMessage {
        hash: hash.clone(),
        address: address.to_vec(),
        payload: payload_bytes,
    };
    Ok((hash, message.encode_to_vec()))
}
