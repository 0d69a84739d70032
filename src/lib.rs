//! Pairwise call signaling: a room-based WebSocket relay and the client-side
//! session coordinator that drives offer/answer/ICE negotiation through it.

pub mod config;
pub mod relay;
pub mod session;
pub mod signaling;
