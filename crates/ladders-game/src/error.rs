//! Error types for the game layer.

/// Errors returned by [`GameState`](crate::GameState) operations.
///
/// None of these are sent to participants. The table treats them as
/// "command did not apply" and moves on.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    /// A game needs at least one participant.
    #[error("a game needs at least one participant")]
    NoParticipants,

    /// A die value outside 1..=6.
    #[error("invalid die value {0}, expected 1-6")]
    InvalidDie(u8),

    /// Someone already reached the last cell.
    #[error("the game is already finished")]
    Finished,

    /// No seat with this index.
    #[error("no participant at seat {0}")]
    UnknownSeat(usize),
}
