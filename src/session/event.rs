use tracing::debug;

use super::capability::{
    MediaError, MediaHandle, PeerConnectionState, RemoteStream, SignalingError, SignalingLink,
};
use super::coordinator::{CoordinatorError, SessionState};
use crate::signaling::{IceCandidate, RoomName, SignalingMessage};

/// Everything the coordinator reacts to, delivered serially.
pub(crate) enum Event {
    Command(Command),
    MediaAcquired {
        attempt: u64,
        result: Result<MediaHandle, MediaError>,
    },
    SignalingConnected {
        attempt: u64,
        result: Result<Box<dyn SignalingLink>, SignalingError>,
    },
    Inbound {
        attempt: u64,
        message: SignalingMessage,
    },
    SignalingClosed {
        attempt: u64,
    },
    Peer {
        epoch: u64,
        event: PeerEvent,
    },
}

/// Local actions posted through a `CoordinatorHandle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(RoomName),
    Leave,
    ToggleAudio,
    ToggleVideo,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    LocalIceCandidate(IceCandidate),
    RemoteTrack(RemoteStream),
    ConnectionStateChanged(PeerConnectionState),
}

/// Outward-facing notifications, the hooks a UI would render from.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    StateChanged(SessionState),
    ConnectionState(PeerConnectionState),
    LocalMedia { audio_enabled: bool, video_enabled: bool },
    RemoteStream(Option<RemoteStream>),
    Error(CoordinatorError),
}

/// Given to a peer transport. Tagged with the session epoch so events from a
/// transport that has since been torn down are discarded.
#[derive(Clone)]
pub struct PeerEventSender {
    epoch: u64,
    tx: async_channel::Sender<Event>,
}

impl PeerEventSender {
    pub(crate) fn new(epoch: u64, tx: async_channel::Sender<Event>) -> Self {
        Self { epoch, tx }
    }

    pub fn local_candidate(&self, candidate: IceCandidate) {
        self.emit(PeerEvent::LocalIceCandidate(candidate));
    }

    pub fn remote_track(&self, stream: RemoteStream) {
        self.emit(PeerEvent::RemoteTrack(stream));
    }

    pub fn state_changed(&self, state: PeerConnectionState) {
        self.emit(PeerEvent::ConnectionStateChanged(state));
    }

    fn emit(&self, event: PeerEvent) {
        let event = Event::Peer {
            epoch: self.epoch,
            event,
        };
        if self.tx.try_send(event).is_err() {
            debug!("Coordinator gone, dropping peer event");
        }
    }
}

/// Given to a signaling link. Tagged with the join attempt it belongs to.
#[derive(Clone)]
pub struct SignalingEventSender {
    attempt: u64,
    tx: async_channel::Sender<Event>,
}

impl SignalingEventSender {
    pub(crate) fn new(attempt: u64, tx: async_channel::Sender<Event>) -> Self {
        Self { attempt, tx }
    }

    pub fn inbound(&self, message: SignalingMessage) {
        let event = Event::Inbound {
            attempt: self.attempt,
            message,
        };
        if self.tx.try_send(event).is_err() {
            debug!("Coordinator gone, dropping inbound message");
        }
    }

    pub fn closed(&self) {
        let _ = self.tx.try_send(Event::SignalingClosed {
            attempt: self.attempt,
        });
    }
}
