//! Participant bookkeeping for Ladders.
//!
//! Two pieces live here:
//!
//! 1. [`SessionRegistry`]: who joined, in which order, and over which
//!    connection. Join order is turn order.
//! 2. [`RestartBallot`]: the "play again?" vote taken after a win.
//!
//! Both are plain data owned by the host's table task; neither locks.

mod ballot;
mod error;
mod registry;

pub use ballot::{BallotOutcome, RestartBallot};
pub use error::SessionError;
pub use registry::{Participant, ParticipantId, SessionRegistry};
