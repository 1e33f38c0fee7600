//! Parses the `Authorization: Player <id>` header (§6.3).
//!
//! Arcforge doesn't implement cryptographic authentication — a
//! player's identity is the opaque, server-minted token it was handed
//! by `PlayerRegistered`. Every request after registration must carry
//! that token back in a header of the form:
//!
//! ```text
//! Authorization: Player 3fa1c2de-...
//! ```
//!
//! Matching is case-insensitive on both the scheme keyword and the
//! header key itself (the header key case-insensitivity is handled by
//! the transport before this function ever sees the value); whitespace
//! around the scheme and the id is tolerated.

use arcforge_protocol::PlayerId;

/// Extracts the player id from a raw `Authorization` header value.
///
/// Returns `None` if the header is missing, empty, or doesn't match the
/// `Player <id>` shape — callers surface that as `MissingAuth` (§7).
/// This never validates that the id refers to a live player; that
/// requires the Entity Store and happens one layer up.
pub fn parse_authorization_header(value: Option<&str>) -> Option<PlayerId> {
    let value = value?.trim();
    let mut parts = value.splitn(2, char::is_whitespace);
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("player") {
        return None;
    }
    let id = parts.next()?.trim();
    if id.is_empty() {
        return None;
    }
    Some(PlayerId::from(id.to_string()))
}
