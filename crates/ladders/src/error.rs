//! Unified error type for the Ladders host and client.

use ladders_game::GameError;
use ladders_protocol::ProtocolError;
use ladders_session::SessionError;
use ladders_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error wrapping every layer's error type.
#[derive(Debug, thiserror::Error)]
pub enum LaddersError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The table stopped because of a disconnect under
    /// [`DisconnectPolicy::EndSession`](crate::DisconnectPolicy::EndSession).
    #[error("session ended: {0}")]
    SessionEnded(String),
}
