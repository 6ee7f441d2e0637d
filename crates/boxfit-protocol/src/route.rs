//! Connect-path parsing.
//!
//! A client names its room and itself in the WebSocket upgrade path:
//! `{prefix}/{room_id}/{player_name}`, e.g. `/api/ws/lobby/alice`. Both
//! segments may be percent-encoded.

use crate::{PlayerName, ProtocolError, RoomId};

/// Path prefix the browser client connects under.
pub const DEFAULT_WS_PREFIX: &str = "/api/ws";

/// Longest accepted room id or player name, in characters.
pub const MAX_IDENT_LEN: usize = 64;

/// The room and player named by a connection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub room_id: RoomId,
    pub player_name: PlayerName,
}

impl ConnectTarget {
    /// Parses `{prefix}/{room_id}/{player_name}`.
    ///
    /// A trailing slash and a query string are ignored. Any other shape
    /// of path is rejected.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidPath`] if the prefix does not match,
    /// a segment is missing or extra, or a segment fails
    /// identifier validation.
    pub fn parse(path: &str, prefix: &str) -> Result<Self, ProtocolError> {
        let path = path.split('?').next().unwrap_or_default();
        let prefix = prefix.trim_end_matches('/');

        let rest = path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                ProtocolError::InvalidPath(format!(
                    "expected {prefix}/{{room_id}}/{{player_name}}, got {path}"
                ))
            })?;

        let mut segments = rest.trim_end_matches('/').split('/');
        let (Some(room), Some(player), None) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(ProtocolError::InvalidPath(format!(
                "expected exactly two segments after {prefix}, got {path}"
            )));
        };

        Ok(Self {
            room_id: RoomId::new(identifier("room id", room)?),
            player_name: PlayerName::new(identifier("player name", player)?),
        })
    }
}

/// Decodes and validates one path segment.
fn identifier(what: &str, raw: &str) -> Result<String, ProtocolError> {
    let decoded = percent_decode(raw).ok_or_else(|| {
        ProtocolError::InvalidPath(format!("{what} is not valid percent-encoded UTF-8"))
    })?;

    if decoded.trim().is_empty() {
        return Err(ProtocolError::InvalidPath(format!("{what} is empty")));
    }
    if decoded.chars().count() > MAX_IDENT_LEN {
        return Err(ProtocolError::InvalidPath(format!(
            "{what} is longer than {MAX_IDENT_LEN} characters"
        )));
    }
    if decoded.chars().any(|c| c.is_control() || c == '/') {
        return Err(ProtocolError::InvalidPath(format!(
            "{what} contains a control character or '/'"
        )));
    }
    Ok(decoded)
}

/// `%XX` decoding. Returns `None` on a truncated escape, a non-hex
/// digit, or bytes that are not UTF-8.
fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str) -> Result<ConnectTarget, ProtocolError> {
        ConnectTarget::parse(path, DEFAULT_WS_PREFIX)
    }

    #[test]
    fn test_parse_plain_path() {
        let target = parse("/api/ws/lobby/alice").unwrap();
        assert_eq!(target.room_id.as_str(), "lobby");
        assert_eq!(target.player_name.as_str(), "alice");
    }

    #[test]
    fn test_parse_trailing_slash_and_query_ignored() {
        let target = parse("/api/ws/lobby/alice/?v=2").unwrap();
        assert_eq!(target.player_name.as_str(), "alice");
    }

    #[test]
    fn test_parse_percent_encoded_segments() {
        let target = parse("/api/ws/room%201/Zo%C3%AB").unwrap();
        assert_eq!(target.room_id.as_str(), "room 1");
        assert_eq!(target.player_name.as_str(), "Zoë");
    }

    #[test]
    fn test_parse_custom_prefix_with_trailing_slash() {
        let target = ConnectTarget::parse("/play/r/p", "/play/").unwrap();
        assert_eq!(target.room_id.as_str(), "r");
    }

    #[test]
    fn test_parse_wrong_prefix_fails() {
        assert!(matches!(
            parse("/ws/lobby/alice"),
            Err(ProtocolError::InvalidPath(_))
        ));
        // Prefix must end at a segment boundary.
        assert!(parse("/api/wsx/lobby/alice").is_err());
    }

    #[test]
    fn test_parse_missing_player_fails() {
        assert!(parse("/api/ws/lobby").is_err());
        assert!(parse("/api/ws/lobby/").is_err());
    }

    #[test]
    fn test_parse_extra_segment_fails() {
        assert!(parse("/api/ws/lobby/alice/extra").is_err());
    }

    #[test]
    fn test_parse_empty_segment_fails() {
        assert!(parse("/api/ws//alice").is_err());
        assert!(parse("/api/ws/lobby/%20%20").is_err());
    }

    #[test]
    fn test_parse_encoded_slash_rejected() {
        assert!(parse("/api/ws/lobby/a%2Fb").is_err());
    }

    #[test]
    fn test_parse_bad_escape_fails() {
        assert!(parse("/api/ws/lobby/al%2").is_err());
        assert!(parse("/api/ws/lobby/al%zz").is_err());
        assert!(parse("/api/ws/lobby/%FF").is_err());
    }

    #[test]
    fn test_parse_name_length_limit() {
        let ok = "a".repeat(MAX_IDENT_LEN);
        let too_long = "a".repeat(MAX_IDENT_LEN + 1);
        assert!(parse(&format!("/api/ws/lobby/{ok}")).is_ok());
        assert!(parse(&format!("/api/ws/lobby/{too_long}")).is_err());
    }
}
