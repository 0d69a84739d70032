//! Wire types shared by the relay and the session coordinator

mod messages;
mod types;

pub use messages::{Envelope, IceCandidate, SdpKind, SessionDescription, SignalingMessage};
pub use types::{ClientId, ErrorCode, OutboundMessage, RoomName};
