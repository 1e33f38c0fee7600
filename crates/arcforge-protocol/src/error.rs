//! Error types for the protocol layer.
//!
//! Each crate in Arcforge defines its own error enum. This keeps errors
//! specific and meaningful — when you see a `ProtocolError`, you know
//! the problem is in serialization/deserialization, not in networking
//! or session/game management.

/// Errors that can occur in the protocol layer.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// trait implementation. The `#[error("...")]` attributes define the
/// human-readable message for each variant — what you see when you
/// print the error or it shows up in logs.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The top-level object doesn't carry a recognized `message` kind,
    /// or the request requires a header/context this envelope lacks.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A context was structurally present but failed a field validator
    /// (empty handle, out-of-range player count, unknown enum name, …).
    #[error("invalid request: {0}")]
    Validation(String),
}
