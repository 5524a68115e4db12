//! Game rules for Ladders: board generation, dice and the turn state
//! machine.
//!
//! Nothing in this crate does I/O. The host's table task owns one
//! [`GameState`], one [`BoardSource`] and one [`Dice`] and drives them in
//! response to participant commands.
//!
//! ```
//! use ladders_game::{Board, GameState};
//!
//! let mut game = GameState::new(vec!["Ann".into(), "Bo".into()], Board::empty()).unwrap();
//! let outcome = game.roll_and_move(4).unwrap();
//! assert_eq!(outcome.to, 5);
//! if !outcome.keeps_turn() {
//!     game.advance_turn();
//! }
//! assert_eq!(game.current_turn(), 1);
//! ```

pub mod board;
pub mod config;
pub mod dice;
pub mod error;
pub mod state;

pub use board::{Board, BoardGenerator, BoardSource, FixedBoard, Link};
pub use config::GeneratorConfig;
pub use dice::{Dice, RandomDice, ScriptedDice};
pub use error::GameError;
pub use state::{DIE_FACES, GameState, MoveKind, MoveOutcome, Piece, PieceId};
