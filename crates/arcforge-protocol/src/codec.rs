//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! Nothing above this layer cares HOW messages are serialized — it just
//! needs something that implements the [`Codec`] trait. This is the
//! "strategy pattern": we define an interface, and swap implementations.
//!
//! Currently we provide [`JsonCodec`] (canonical JSON, matching the wire
//! format documented on [`Envelope`](crate::Envelope)).

use serde::{de::DeserializeOwned, Serialize};

use crate::{Envelope, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → safe to share between threads (required because
///   Tokio may run our code on any thread in its thread pool).
/// - `'static` → the codec doesn't borrow temporary data. It owns
///   everything it needs. This is required for types stored in
///   long-lived async tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a frame as a request [`Envelope`] and runs its field
    /// validators. This is the entry point the dispatcher uses — plain
    /// [`decode`](Self::decode) only checks structural shape.
    fn decode_request(&self, data: &[u8]) -> Result<Envelope, ProtocolError> {
        let envelope: Envelope = self.decode(data)?;
        envelope.validate()?;
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses canonical JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default). Feature
/// flags let users opt out of dependencies they don't need.
///
/// ## Example
///
/// ```rust
/// use arcforge_protocol::{JsonCodec, Codec, Envelope};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::RegisterPlayer { handle: "leela".into() };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
