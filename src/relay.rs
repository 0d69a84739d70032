//! WebSocket signaling relay: room registry plus point-to-point router

mod actor;
mod server;
mod types;

pub use actor::RelayHandle;
pub use server::{DEFAULT_RELAY_PORT, RelayServer};
pub use types::{RelayError, RelayStats, RoomStats};
