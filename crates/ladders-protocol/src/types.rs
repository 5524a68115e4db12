//! Core protocol types for the Ladders wire format.
//!
//! Everything in this module travels between the host and the
//! participants: the commands a participant may send, and the three kinds
//! of message the host broadcasts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Board geometry
// ---------------------------------------------------------------------------

/// A board cell, numbered 1..=100.
///
/// A `u8` is plenty: the largest value ever computed is `99 + 6`.
pub type Cell = u8;

/// The cell every piece starts on.
pub const FIRST_CELL: Cell = 1;

/// The winning cell. A piece must land on it exactly.
pub const LAST_CELL: Cell = 100;

// ---------------------------------------------------------------------------
// Command: participant → host
// ---------------------------------------------------------------------------

/// A command line sent by a participant after its name line.
///
/// These are the only two things a presentation layer ever produces:
/// "roll for me" and a restart vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Roll the die and move, if it is the sender's turn.
    Roll,
    /// Vote to play again after a win.
    RestartYes,
    /// Vote against playing again; vetoes the pending restart.
    RestartNo,
}

impl Command {
    /// Parses a command line. Surrounding whitespace is ignored.
    ///
    /// Returns `None` for anything unrecognized; the host drops such lines
    /// without replying. The Portuguese spellings used by older clients
    /// (`ROLAR_DADO`, `REINICIAR_SIM`, `REINICIAR_NAO`) are accepted too.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "ROLL" | "ROLAR_DADO" => Some(Self::Roll),
            "RESTART_YES" | "REINICIAR_SIM" => Some(Self::RestartYes),
            "RESTART_NO" | "REINICIAR_NAO" => Some(Self::RestartNo),
            _ => None,
        }
    }

    /// The canonical wire spelling, without a line terminator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Roll => "ROLL",
            Self::RestartYes => "RESTART_YES",
            Self::RestartNo => "RESTART_NO",
        }
    }

    /// The command as a complete wire line.
    pub fn to_line(self) -> Vec<u8> {
        format!("{}\n", self.as_str()).into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Layout: where the snakes and ladders are
// ---------------------------------------------------------------------------

/// The board layout as it travels on the wire.
///
/// `BTreeMap` rather than `HashMap` so the pairs are always listed in
/// ascending cell order and two encodings of the same layout are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Snake head → tail.
    pub snakes: BTreeMap<Cell, Cell>,
    /// Ladder base → top.
    pub ladders: BTreeMap<Cell, Cell>,
}

// ---------------------------------------------------------------------------
// StateSnapshot: one full picture of the game
// ---------------------------------------------------------------------------

/// A complete, self-consistent game state, broadcast after every change.
///
/// All vectors are index-aligned with `names`: entry `i` belongs to the
/// participant who registered `i`-th.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Participant display names in turn order.
    pub names: Vec<String>,
    /// Index into `names` of whoever moves next.
    pub current_turn: usize,
    /// Cell of each participant's piece.
    pub positions: Vec<Cell>,
    /// Games won by each participant since the host started.
    pub wins: Vec<u32>,
    /// The die value behind this snapshot, or 0 when nobody rolled.
    pub die: u8,
    /// Human-readable account of what happened. May span several lines.
    pub status: String,
    /// `true` once someone reached cell 100.
    pub finished: bool,
}

// ---------------------------------------------------------------------------
// ServerMessage: host → participants
// ---------------------------------------------------------------------------

/// Everything the host broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The game is starting; switch to the board view.
    Start,
    /// A new board layout (at game start and on every restart).
    Layout(Layout),
    /// A full state snapshot.
    State(StateSnapshot),
}
