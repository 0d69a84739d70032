use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ClientId, ErrorCode, OutboundMessage, RoomName};

/// Kind of a session description, as in `RTCSdpType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Negotiation payload, serialized like `RTCSessionDescriptionInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Network path candidate, serialized like `RTCIceCandidateInit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Every message exchanged between a client and the relay.
///
/// Directed variants carry `target`; `from` is absent on the way in and is
/// stamped by the relay on the way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalingMessage {
    /// Identify the connection when the id is not part of the URL path
    Hello {
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },

    /// Join (or create) a room
    Join { room: RoomName },

    /// Reply to the joiner: everyone already in the room, in join order
    RoomJoined {
        room: RoomName,
        #[serde(rename = "users")]
        existing_members: Vec<ClientId>,
    },

    /// Broadcast to existing members when somebody joins
    UserJoined {
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },

    Offer {
        #[serde(rename = "offer")]
        sdp: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ClientId>,
        target: ClientId,
    },

    Answer {
        #[serde(rename = "answer")]
        sdp: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ClientId>,
        target: ClientId,
    },

    IceCandidate {
        candidate: IceCandidate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ClientId>,
        target: ClientId,
    },

    /// Broadcast to remaining members when somebody leaves or drops
    UserLeft {
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },

    Leave,

    /// Relay-side rejection; the connection stays open
    Error { code: ErrorCode, message: String },
}

impl SignalingMessage {
    /// Wire tag, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Join { .. } => "join",
            Self::RoomJoined { .. } => "room-joined",
            Self::UserJoined { .. } => "user-joined",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::UserLeft { .. } => "user-left",
            Self::Leave => "leave",
            Self::Error { .. } => "error",
        }
    }

    /// Target of a point-to-point message, `None` for everything else.
    pub fn target(&self) -> Option<&ClientId> {
        match self {
            Self::Offer { target, .. }
            | Self::Answer { target, .. }
            | Self::IceCandidate { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Sender of a point-to-point message, as stamped by the relay.
    pub fn sender(&self) -> Option<&ClientId> {
        match self {
            Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. } => {
                from.as_ref()
            }
            _ => None,
        }
    }

    pub fn is_directed(&self) -> bool {
        self.target().is_some()
    }

    /// Overwrite `from` with the connection's own identity. Client-supplied
    /// values are discarded. Non-directed messages are returned unchanged.
    pub fn stamped(mut self, sender: &ClientId) -> Self {
        match &mut self {
            Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. } => {
                *from = Some(sender.clone());
            }
            _ => {}
        }
        self
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn to_outbound(&self) -> Result<OutboundMessage, serde_json::Error> {
        serde_json::to_string(self).map(OutboundMessage::from)
    }
}

/// A message as it came off the wire: the typed view is used for routing,
/// the original JSON is what a directed message's target receives, so fields
/// the relay does not model still arrive.
#[derive(Debug, Clone)]
pub struct Envelope {
    message: SignalingMessage,
    raw: Option<Value>,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(text)?;
        let message = SignalingMessage::deserialize(&raw)?;
        Ok(Self {
            message,
            raw: Some(raw),
        })
    }

    pub fn message(&self) -> &SignalingMessage {
        &self.message
    }

    /// Encode for delivery with `from` set to `sender`.
    pub fn stamped_outbound(self, sender: &ClientId) -> Result<OutboundMessage, serde_json::Error> {
        match self.raw {
            Some(Value::Object(mut fields)) => {
                fields.insert("from".to_owned(), Value::String(sender.to_string()));
                serde_json::to_string(&fields).map(OutboundMessage::from)
            }
            _ => self.message.stamped(sender).to_outbound(),
        }
    }
}

impl From<SignalingMessage> for Envelope {
    fn from(message: SignalingMessage) -> Self {
        Self { message, raw: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join() {
        let json = r#"{"type": "join", "room": "r1"}"#;
        let msg: SignalingMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            SignalingMessage::Join {
                room: RoomName::from("r1")
            }
        );
    }

    #[test]
    fn parse_leave() {
        let json = r#"{"type": "leave"}"#;
        let msg: SignalingMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, SignalingMessage::Leave));
    }

    #[test]
    fn parse_browser_offer_without_from() {
        let json = r#"{"type":"offer","offer":{"type":"offer","sdp":"v=0"},"target":"client-a"}"#;
        let msg: SignalingMessage = serde_json::from_str(json).unwrap();
        match msg {
            SignalingMessage::Offer { sdp, from, target } => {
                assert_eq!(sdp.kind, SdpKind::Offer);
                assert_eq!(sdp.sdp, "v=0");
                assert!(from.is_none());
                assert_eq!(target.as_str(), "client-a");
            }
            other => panic!("Expected Offer, got {:?}", other),
        }
    }

    #[test]
    fn parse_browser_ice_candidate() {
        let json = r#"{"type":"ice-candidate","target":"b","candidate":{"candidate":"candidate:1 1 udp 1 10.0.0.1 5000 typ host","sdpMid":"0","sdpMLineIndex":0}}"#;
        let msg: SignalingMessage = serde_json::from_str(json).unwrap();
        if let SignalingMessage::IceCandidate { candidate, .. } = msg {
            assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
            assert_eq!(candidate.sdp_m_line_index, Some(0));
        } else {
            panic!("Expected IceCandidate");
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type": "teleport"}"#;
        assert!(serde_json::from_str::<SignalingMessage>(json).is_err());
    }

    #[test]
    fn serialize_room_joined_uses_users_field() {
        let msg = SignalingMessage::RoomJoined {
            room: RoomName::from("r1"),
            existing_members: vec![ClientId::from("A")],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"room-joined","room":"r1","users":["A"]}"#);
    }

    #[test]
    fn serialize_user_left_uses_client_id_field() {
        let msg = SignalingMessage::UserLeft {
            client_id: ClientId::from("A"),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"user-left","clientId":"A"}"#);
    }

    #[test]
    fn stamping_overwrites_forged_sender() {
        let msg = SignalingMessage::Answer {
            sdp: SessionDescription::answer("v=0"),
            from: Some(ClientId::from("forged")),
            target: ClientId::from("B"),
        };
        let stamped = msg.stamped(&ClientId::from("A"));
        assert_eq!(stamped.sender(), Some(&ClientId::from("A")));
        assert_eq!(stamped.target(), Some(&ClientId::from("B")));
    }

    #[test]
    fn stamping_leaves_broadcasts_alone() {
        let msg = SignalingMessage::Leave;
        assert_eq!(msg.clone().stamped(&ClientId::from("A")), msg);
        assert!(!msg.is_directed());
    }

    #[test]
    fn envelope_keeps_unmodelled_fields() {
        let json = r#"{"type":"offer","offer":{"type":"offer","sdp":"v=0","x-ext":1},"target":"B","from":"forged","callId":"c-7"}"#;
        let envelope = Envelope::parse(json).unwrap();
        assert_eq!(envelope.message().target(), Some(&ClientId::from("B")));

        let out = envelope.stamped_outbound(&ClientId::from("A")).unwrap();
        let delivered: Value = serde_json::from_str(out.as_str()).unwrap();
        assert_eq!(delivered["from"], "A");
        assert_eq!(delivered["callId"], "c-7");
        assert_eq!(delivered["offer"]["x-ext"], 1);
    }

    #[test]
    fn envelope_from_typed_message_is_stamped() {
        let msg = SignalingMessage::IceCandidate {
            candidate: IceCandidate::new("candidate:1"),
            from: None,
            target: ClientId::from("B"),
        };
        let out = Envelope::from(msg).stamped_outbound(&ClientId::from("A")).unwrap();
        let delivered: SignalingMessage = serde_json::from_str(out.as_str()).unwrap();
        assert_eq!(delivered.sender(), Some(&ClientId::from("A")));
    }

    #[test]
    fn envelope_rejects_malformed_shape() {
        assert!(Envelope::parse(r#"{"type":"join"}"#).is_err());
        assert!(Envelope::parse("[1, 2]").is_err());
    }

    #[test]
    fn serialize_error() {
        let msg = SignalingMessage::error(ErrorCode::RoomNotFound, "not in a room");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("room_not_found"));
    }
}
