//! Client-side session coordinator: room lifecycle and the peer connection
//! state machine, driven by a single serial event queue

mod capability;
mod coordinator;
mod event;
mod media;
mod peer;
mod ws;

pub use capability::{
    MediaError, MediaHandle, MediaSource, PeerConnectionState, PeerTransport, RemoteStream,
    SignalingConnector, SignalingError, SignalingLink, Track, TrackKind, TransportConfig,
    TransportError, TransportFactory,
};
pub use coordinator::{Coordinator, CoordinatorError, CoordinatorHandle, SessionState};
pub use event::{Command, Notice, PeerEvent, PeerEventSender, SignalingEventSender};
pub use peer::{Role, SignalingState};
pub use ws::WsConnector;
