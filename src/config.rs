//! Relay and coordinator settings, with `PAIRLINK_*` environment overrides

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::relay::DEFAULT_RELAY_PORT;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Public STUN servers used when nothing else is configured
pub const DEFAULT_STUN_SERVERS: [&str; 5] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: String,
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_RELAY_PORT),
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
        }
    }
}

impl RelayConfig {
    /// Reads `PAIRLINK_LISTEN_ADDR`, `PAIRLINK_PING_INTERVAL_SECS` and
    /// `PAIRLINK_PONG_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("PAIRLINK_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            ping_interval: env_secs("PAIRLINK_PING_INTERVAL_SECS")
                .unwrap_or(defaults.ping_interval),
            pong_timeout: env_secs("PAIRLINK_PONG_TIMEOUT_SECS").unwrap_or(defaults.pong_timeout),
        }
    }
}

/// Capture hints handed to the media source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: Some(VideoConstraints {
                ideal_width: 1280,
                ideal_height: 720,
            }),
        }
    }
}

/// Settings for one session coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Base WebSocket URL of the relay; the client id is appended as `/ws/{id}`.
    pub relay_url: String,
    /// STUN/TURN urls passed to every peer transport.
    pub ice_servers: Vec<String>,
    pub media: MediaConstraints,
    /// Upper bound for a single transport negotiation step.
    pub negotiation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            relay_url: format!("ws://127.0.0.1:{}", DEFAULT_RELAY_PORT),
            ice_servers: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            media: MediaConstraints::default(),
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Reads `PAIRLINK_RELAY_URL`, `PAIRLINK_ICE_SERVERS` (comma separated)
    /// and `PAIRLINK_NEGOTIATION_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let ice_servers = match env::var("PAIRLINK_ICE_SERVERS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => defaults.ice_servers,
        };

        Self {
            relay_url: env::var("PAIRLINK_RELAY_URL").unwrap_or(defaults.relay_url),
            ice_servers,
            media: defaults.media,
            negotiation_timeout: env_secs("PAIRLINK_NEGOTIATION_TIMEOUT_SECS")
                .unwrap_or(defaults.negotiation_timeout),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    parse_secs(key, &env::var(key).ok()?)
}

/// Whole seconds, strictly positive.
fn parse_secs(key: &str, raw: &str) -> Option<Duration> {
    match parse_or_warn::<u64>(key, raw)? {
        0 => {
            warn!("Ignoring {}=0, using default", key);
            None
        }
        secs => Some(Duration::from_secs(secs)),
    }
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring malformed {}={:?}, using default", key, raw);
            None
        }
    }
}
