use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::signaling::{ClientId, ErrorCode, OutboundMessage, RoomName};

/// Relay errors. All of them are reported to the offending client and
/// leave its connection open.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("client already connected: {0}")]
    DuplicateClient(ClientId),

    #[error("not in a room: {0}")]
    RoomNotFound(ClientId),

    #[error("invalid room name")]
    InvalidRoom,

    #[error("connection has not identified itself")]
    NotRegistered,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateClient(_) => ErrorCode::DuplicateClient,
            Self::RoomNotFound(_) => ErrorCode::RoomNotFound,
            Self::InvalidRoom => ErrorCode::InvalidRoom,
            Self::NotRegistered => ErrorCode::NotRegistered,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelayStats {
    pub active_connections: usize,
    pub rooms: Vec<RoomStats>,
}

impl RelayStats {
    pub fn room(&self, name: &str) -> Option<&RoomStats> {
        self.rooms.iter().find(|r| r.name.as_str() == name)
    }

    /// Body of the relay's `GET /` status page.
    pub fn status_body(&self) -> serde_json::Value {
        let rooms: serde_json::Map<String, serde_json::Value> = self
            .rooms
            .iter()
            .map(|r| (r.name.to_string(), json!(r.members)))
            .collect();
        json!({
            "message": "Pairlink signaling relay",
            "status": "running",
            "active_connections": self.active_connections,
            "active_rooms": self.rooms.len(),
            "rooms": rooms,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub name: RoomName,
    pub members: Vec<ClientId>,
}

#[derive(Debug)]
pub(crate) struct ClientState {
    /// Channel for outbound messages to this client.
    pub tx: mpsc::UnboundedSender<OutboundMessage>,
    pub room: Option<RoomName>,
}

#[derive(Debug, Default)]
pub(crate) struct Room {
    /// Members in join order.
    pub members: Vec<ClientId>,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub clients: HashMap<ClientId, ClientState>,
    pub rooms: HashMap<RoomName, Room>,
}
