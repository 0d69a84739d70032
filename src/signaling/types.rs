use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio_tungstenite::tungstenite::Utf8Bytes;

const CLIENT_ID_PREFIX: &str = "client-";
const CLIENT_ID_SUFFIX_LEN: usize = 9;
const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client identity: unique per connection, either self-generated
/// ("client-" + 9 base-36 chars) or supplied in the connection path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut id = String::with_capacity(CLIENT_ID_PREFIX.len() + CLIENT_ID_SUFFIX_LEN);
        id.push_str(CLIENT_ID_PREFIX);
        for _ in 0..CLIENT_ID_SUFFIX_LEN {
            id.push(BASE36_CHARS[rng.random_range(0..BASE36_CHARS.len())] as char);
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids travel inside URL paths, so only a conservative charset is accepted.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 64
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Serialize for ClientId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ClientId)
    }
}

/// Room name as typed by the user. Surrounding whitespace is not significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RoomName {
    fn from(s: &str) -> Self {
        Self(s.trim().to_owned())
    }
}

impl Serialize for RoomName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RoomName::from(s.as_str()))
    }
}

/// Machine-readable reason carried by the wire `error` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    DuplicateClient,
    RoomNotFound,
    InvalidRoom,
    NotRegistered,
    MalformedMessage,
    Internal,
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
///
/// Cloning is O(1), so one serialized broadcast can be fanned out to a room.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_generate_has_correct_format() {
        let id = ClientId::generate();
        assert!(id.as_str().starts_with("client-"));
        assert_eq!(id.as_str().len(), 16);
        assert!(id.is_valid());
    }

    #[test]
    fn client_id_generate_uses_base36() {
        let id = ClientId::generate();
        for c in id.as_str()["client-".len()..].chars() {
            assert!(c.is_ascii_digit() || c.is_ascii_lowercase(), "Invalid char: {}", c);
        }
    }

    #[test]
    fn client_id_rejects_path_characters() {
        assert!(!ClientId::from("").is_valid());
        assert!(!ClientId::from("a/b").is_valid());
        assert!(!ClientId::from("a b").is_valid());
        assert!(ClientId::from("client-abc_123").is_valid());
    }

    #[test]
    fn client_ids_order_lexicographically() {
        assert!(ClientId::from("A") < ClientId::from("B"));
        assert!(ClientId::from("client-a") < ClientId::from("client-b"));
    }

    #[test]
    fn room_name_trims_whitespace() {
        let room = RoomName::from("  r1 ");
        assert_eq!(room.as_str(), "r1");
        assert!(RoomName::from("   ").is_empty());
    }

    #[test]
    fn client_id_serialization() {
        let id = ClientId::from("client-test12345");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"client-test12345\"");
        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn room_name_deserialization_trims() {
        let room: RoomName = serde_json::from_str("\" lobby \"").unwrap();
        assert_eq!(room.as_str(), "lobby");
    }

    #[test]
    fn error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::DuplicateClient).unwrap();
        assert_eq!(json, "\"duplicate_client\"");
    }
}
