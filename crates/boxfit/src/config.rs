//! Server configuration.
//!
//! Defaults suit local play. Each setting can be overridden through an
//! environment variable:
//!
//! - `BOXFIT_BIND`              (default: "127.0.0.1:8080")
//! - `BOXFIT_PATH_PREFIX`       (default: "/api/ws")
//! - `BOXFIT_RETIRE_GRACE_SECS` (default: 30)
//! - `BOXFIT_POINTS_PER_CELL`   (default: 1)
//! - `BOXFIT_PIECE_SEED`        (default: unset, OS entropy)
//! - `BOXFIT_IDLE_TIMEOUT_SECS` (default: unset or 0, no timeout)
//! - `BOXFIT_HANDSHAKE_TIMEOUT_SECS` (default: 10, must be positive)
//! - `BOXFIT_HEARTBEAT_SECS`    (default: 30, 0 disables pings)

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use boxfit_protocol::DEFAULT_WS_PREFIX;
use boxfit_room::RoomConfig;
use serde::{Deserialize, Serialize};

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Path prefix before `/{room_id}/{player_name}`.
    pub path_prefix: String,

    /// Settings for every room.
    pub room: RoomConfig,

    /// Close a connection that sends nothing for this long.
    /// `None` keeps idle connections open.
    pub idle_timeout: Option<Duration>,

    /// How long a peer may take to complete the WebSocket upgrade.
    pub handshake_timeout: Duration,

    /// Ping period. A connection that sends nothing, not even a pong,
    /// for two periods is closed. `None` disables pings.
    pub heartbeat_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            path_prefix: DEFAULT_WS_PREFIX.to_string(),
            room: RoomConfig::default(),
            idle_timeout: None,
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = lookup("BOXFIT_BIND").unwrap_or(defaults.bind_addr);
        let path_prefix =
            lookup("BOXFIT_PATH_PREFIX").unwrap_or(defaults.path_prefix);

        let retire_secs = read_or_default(
            &lookup,
            "BOXFIT_RETIRE_GRACE_SECS",
            defaults.room.retire_grace.as_secs(),
        )?;
        let points_per_cell = read_or_default(
            &lookup,
            "BOXFIT_POINTS_PER_CELL",
            defaults.room.points_per_cell,
        )?;
        let piece_seed = read_optional(&lookup, "BOXFIT_PIECE_SEED")?;
        let idle_secs: Option<u64> =
            read_optional(&lookup, "BOXFIT_IDLE_TIMEOUT_SECS")?;
        let handshake_secs = read_or_default(
            &lookup,
            "BOXFIT_HANDSHAKE_TIMEOUT_SECS",
            defaults.handshake_timeout.as_secs(),
        )?;
        if handshake_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "BOXFIT_HANDSHAKE_TIMEOUT_SECS",
                value: handshake_secs.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        let heartbeat_secs: Option<u64> =
            read_optional(&lookup, "BOXFIT_HEARTBEAT_SECS")?;

        Ok(Self {
            bind_addr,
            path_prefix,
            room: RoomConfig {
                retire_grace: Duration::from_secs(retire_secs),
                points_per_cell,
                piece_seed,
                ..defaults.room
            },
            idle_timeout: idle_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            handshake_timeout: Duration::from_secs(handshake_secs),
            heartbeat_interval: match heartbeat_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.heartbeat_interval,
            },
        })
    }
}

fn read_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(read_optional(lookup, key)?.unwrap_or(default))
}

fn read_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
