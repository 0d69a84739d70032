//! Contracts the coordinator needs from the outside world: local capture,
//! the peer transport doing the actual ICE/media work, and the signaling link.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::event::{PeerEventSender, SignalingEventSender};
use crate::config::MediaConstraints;
use crate::signaling::{ClientId, IceCandidate, SessionDescription, SignalingMessage};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("media access denied: {0}")]
    AccessDenied(String),

    #[error("no capture device: {0}")]
    DeviceUnavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport operation failed: {0}")]
    Failed(String),

    #[error("transport operation timed out")]
    Timeout,

    #[error("transport closed")]
    Closed,

    #[error("transport operation abandoned by leave")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("failed to connect to relay: {0}")]
    Connect(String),

    #[error("signaling link closed")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One captured local track. Disabling gates it, stopping releases it.
pub trait Track: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
    fn kind(&self) -> TrackKind;
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn stop(&self);
}

/// Tracks handed out by a successful capture.
#[derive(Debug, Clone, Default)]
pub struct MediaHandle {
    tracks: Vec<Arc<dyn Track>>,
}

impl MediaHandle {
    pub fn new(tracks: Vec<Arc<dyn Track>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self, kind: TrackKind) -> Vec<Arc<dyn Track>> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn all_tracks(&self) -> &[Arc<dyn Track>] {
        &self.tracks
    }
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    /// May never complete (an unanswered permission prompt).
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaHandle, MediaError>;
}

/// Remote media delivered by the transport; opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
}

/// Mirrors `RTCPeerConnectionState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Build a transport that reports candidates, remote tracks and
    /// connectivity changes through `events`.
    async fn create(
        &self,
        config: &TransportConfig,
        events: PeerEventSender,
    ) -> Result<Box<dyn PeerTransport>, TransportError>;
}

#[async_trait]
pub trait PeerTransport: Send {
    fn attach_local_track(&mut self, track: Arc<dyn Track>) -> Result<(), TransportError>;
    async fn create_offer(&mut self) -> Result<SessionDescription, TransportError>;
    async fn create_answer(&mut self) -> Result<SessionDescription, TransportError>;
    async fn set_local_description(&mut self, desc: SessionDescription)
    -> Result<(), TransportError>;
    async fn set_remote_description(&mut self, desc: SessionDescription)
    -> Result<(), TransportError>;
    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), TransportError>;
    fn close(&mut self);
}

#[async_trait]
pub trait SignalingConnector: Send + Sync {
    /// Open a connection to the relay identified as `client_id`. Inbound
    /// messages and the eventual close are reported through `events`.
    async fn connect(
        &self,
        client_id: &ClientId,
        events: SignalingEventSender,
    ) -> Result<Box<dyn SignalingLink>, SignalingError>;
}

pub trait SignalingLink: Send {
    fn send(&mut self, msg: &SignalingMessage) -> Result<(), SignalingError>;

    /// Close the connection. No further events are reported afterwards.
    fn close(&mut self);
}
