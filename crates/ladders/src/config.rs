//! Server configuration.
//!
//! Every knob has a default, so an empty JSON object is a valid config
//! file. The CLI loads a file (if given) and then applies its flags on top.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ladders_game::GeneratorConfig;
use ladders_protocol::WireFormat;
use ladders_tick::{TickConfig, TickPolicy};
use serde::{Deserialize, Serialize};

/// What the table does when a participant's connection dies mid-game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectPolicy {
    /// Mark the seat departed, skip its turns, shrink the restart quorum,
    /// and keep playing.
    #[default]
    DropAndContinue,
    /// Stop the table and return [`LaddersError::SessionEnded`](crate::LaddersError::SessionEnded).
    EndSession,
    /// Keep the seat as if nothing happened. Its turn may never come back.
    Tolerate,
}

impl FromStr for DisconnectPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" | "drop_and_continue" => Ok(Self::DropAndContinue),
            "end" | "end_session" => Ok(Self::EndSession),
            "tolerate" => Ok(Self::Tolerate),
            other => Err(ConfigError::Invalid(format!(
                "unknown disconnect policy {other:?}"
            ))),
        }
    }
}

impl fmt::Display for DisconnectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DropAndContinue => "drop_and_continue",
            Self::EndSession => "end_session",
            Self::Tolerate => "tolerate",
        })
    }
}

/// Errors while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the host needs to know before it starts listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// Poll loop rate in Hz.
    pub tick_rate_hz: u32,

    /// How the poll loop catches up after a late tick.
    pub tick_policy: TickPolicy,

    /// Pause between `START` and the first layout, in milliseconds.
    pub start_delay_ms: u64,

    /// How long a new connection has to send its name, in milliseconds.
    pub name_timeout_ms: u64,

    /// How long a write to one participant may stall before that
    /// participant is treated as disconnected, in milliseconds.
    pub send_timeout_ms: u64,

    /// A start request is held until at least this many participants have
    /// joined.
    pub min_players: usize,

    /// Start on our own once this many participants have joined.
    pub auto_start: Option<usize>,

    pub disconnect_policy: DisconnectPolicy,

    /// Reject a second yes vote from the same participant in one round.
    pub one_vote_per_round: bool,

    pub generator: GeneratorConfig,

    /// Seed for the board generator and the die. Random when absent.
    pub seed: Option<u64>,

    pub wire_format: WireFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7070".to_string(),
            tick_rate_hz: 20,
            tick_policy: TickPolicy::default(),
            start_delay_ms: 1_000,
            name_timeout_ms: 5_000,
            send_timeout_ms: 5_000,
            min_players: 2,
            auto_start: None,
            disconnect_policy: DisconnectPolicy::default(),
            one_vote_per_round: true,
            generator: GeneratorConfig::default(),
            seed: None,
            wire_format: WireFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations the table cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players == 0 {
            return Err(ConfigError::Invalid("min_players must be at least 1".into()));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("send_timeout_ms must be at least 1".into()));
        }
        if self.auto_start == Some(0) {
            return Err(ConfigError::Invalid("auto_start must be at least 1".into()));
        }
        Ok(())
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn name_timeout(&self) -> Duration {
        Duration::from_millis(self.name_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn tick_config(&self) -> TickConfig {
        TickConfig {
            policy: self.tick_policy,
            ..TickConfig::with_rate(self.tick_rate_hz)
        }
    }

    /// Participants needed before the table may start.
    pub(crate) fn start_threshold(&self) -> usize {
        self.min_players.max(1)
    }
}
