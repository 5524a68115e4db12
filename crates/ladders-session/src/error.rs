//! Error types for the session layer.

use crate::ParticipantId;

/// Errors from the participant registry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// No participant with this id was ever registered.
    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    /// The participant's connection failed or was closed by the peer.
    #[error("connection to participant {0} lost")]
    ConnectionLost(ParticipantId),
}
