//! The turn state machine.
//!
//! [`GameState`] knows nothing about sockets. The table feeds it die values
//! and decides, from the returned [`MoveOutcome`], whether the turn passes.

use ladders_protocol::{Cell, FIRST_CELL, LAST_CELL, StateSnapshot};

use crate::board::{Board, Link};
use crate::error::GameError;

/// The highest face of the die.
pub const DIE_FACES: u8 = 6;

/// Per-game piece identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(u64);

impl PieceId {
    /// Returns the inner value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

/// One piece on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    /// Seat index of the participant that moves this piece.
    pub owner: usize,
    pub cell: Cell,
}

/// What a single roll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The roll would pass the last cell; the piece stays.
    Overshoot { needed: u8 },
    /// The piece landed exactly on the last cell.
    Won,
    /// The piece landed on a snake head and slid down.
    Snake { head: Cell, tail: Cell },
    /// The piece landed on a ladder base and climbed.
    Ladder { base: Cell, top: Cell },
    /// Nothing special.
    Plain,
}

/// The result of [`GameState::roll_and_move`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Seat that rolled.
    pub seat: usize,
    pub die: u8,
    pub from: Cell,
    pub to: Cell,
    pub kind: MoveKind,
    /// `true` if this move finished the game.
    pub won: bool,
    /// Human-readable account of the move, one event per line.
    pub status: String,
}

impl MoveOutcome {
    /// A six that did not end the game earns another roll.
    pub fn keeps_turn(&self) -> bool {
        self.die == DIE_FACES && !self.won
    }
}

/// Positions, turn order and scores for one table.
#[derive(Debug, Clone)]
pub struct GameState {
    names: Vec<String>,
    pieces: Vec<Piece>,
    wins: Vec<u32>,
    departed: Vec<bool>,
    current_turn: usize,
    finished: bool,
    board: Board,
    next_piece_id: u64,
}

impl GameState {
    /// Seats every name in order, all pieces on the first cell.
    pub fn new(names: Vec<String>, board: Board) -> Result<Self, GameError> {
        if names.is_empty() {
            return Err(GameError::NoParticipants);
        }
        let seats = names.len();
        let mut state = Self {
            names,
            pieces: Vec::with_capacity(seats),
            wins: vec![0; seats],
            departed: vec![false; seats],
            current_turn: 0,
            finished: false,
            board,
            next_piece_id: 1,
        };
        state.place_pieces();
        Ok(state)
    }

    fn place_pieces(&mut self) {
        self.pieces.clear();
        for owner in 0..self.names.len() {
            let id = PieceId(self.next_piece_id);
            self.next_piece_id += 1;
            self.pieces.push(Piece {
                id,
                owner,
                cell: FIRST_CELL,
            });
        }
    }

    /// Rolls `die` for whoever holds the turn.
    ///
    /// Does not touch `current_turn`; see [`MoveOutcome::keeps_turn`] and
    /// [`advance_turn`](Self::advance_turn).
    pub fn roll_and_move(&mut self, die: u8) -> Result<MoveOutcome, GameError> {
        if !(1..=DIE_FACES).contains(&die) {
            return Err(GameError::InvalidDie(die));
        }
        if self.finished {
            return Err(GameError::Finished);
        }

        let seat = self.current_turn;
        let name = &self.names[seat];
        let from = self.pieces[seat].cell;
        let target = u16::from(from) + u16::from(die);
        let mut status = format!("{name} rolled a {die}.");

        let (to, kind) = if target > u16::from(LAST_CELL) {
            let needed = LAST_CELL - from;
            status.push_str(&format!(
                "\n{name} needs exactly {needed} to win! Stays on cell {from}."
            ));
            (from, MoveKind::Overshoot { needed })
        } else {
            let landed = from + die;
            if landed == LAST_CELL {
                (landed, MoveKind::Won)
            } else {
                match self.board.link(landed) {
                    Link::Snake { tail } => {
                        status.push_str(&format!(
                            "\n{name} fell on a SNAKE! Slides down to cell {tail}."
                        ));
                        (tail, MoveKind::Snake { head: landed, tail })
                    }
                    Link::Ladder { top } => {
                        status.push_str(&format!(
                            "\n{name} climbed a ladder! Goes up to cell {top}."
                        ));
                        (top, MoveKind::Ladder { base: landed, top })
                    }
                    Link::Plain => (landed, MoveKind::Plain),
                }
            }
        };

        self.pieces[seat].cell = to;

        // A hand-built board may carry a ladder straight onto the last cell.
        let won = to == LAST_CELL;
        if won {
            self.finished = true;
            self.wins[seat] += 1;
            status.push_str(&format!("\n{name} won the game!"));
        } else if die == DIE_FACES {
            status.push_str(&format!("\n{name} rolled a 6 and plays again!"));
        }

        tracing::debug!(seat, die, from, to, won, "move resolved");

        Ok(MoveOutcome {
            seat,
            die,
            from,
            to,
            kind,
            won,
            status,
        })
    }

    /// Returns `true` if the participant holding the turn is on the last
    /// cell.
    pub fn winner_exists(&self) -> bool {
        self.pieces[self.current_turn].cell == LAST_CELL
    }

    /// Passes the turn to the next seat that has not departed.
    ///
    /// With every seat departed the turn stays where it is.
    pub fn advance_turn(&mut self) {
        let seats = self.names.len();
        for step in 1..=seats {
            let next = (self.current_turn + step) % seats;
            if !self.departed[next] {
                self.current_turn = next;
                return;
            }
        }
    }

    /// Starts a new round on the same seats. Win tallies are kept.
    pub fn reset(&mut self) {
        self.finished = false;
        self.current_turn = self.departed.iter().position(|gone| !gone).unwrap_or(0);
        self.place_pieces();
    }

    /// Swaps in the board for the next round.
    pub fn set_board(&mut self, board: Board) {
        self.board = board;
    }

    /// Marks a seat as gone. Its piece stays on the board but its turns are
    /// skipped from now on. If it held the turn, the turn passes.
    pub fn depart(&mut self, seat: usize) -> Result<(), GameError> {
        let flag = self
            .departed
            .get_mut(seat)
            .ok_or(GameError::UnknownSeat(seat))?;
        *flag = true;
        if self.current_turn == seat && !self.finished {
            self.advance_turn();
        }
        Ok(())
    }

    /// Builds the wire snapshot for the current state.
    pub fn snapshot(&self, die: u8, status: impl Into<String>) -> StateSnapshot {
        StateSnapshot {
            names: self.names.clone(),
            current_turn: self.current_turn,
            positions: self.positions(),
            wins: self.wins.clone(),
            die,
            status: status.into(),
            finished: self.finished,
        }
    }

    /// Status line announcing who opens a round.
    pub fn opening_status(&self, restarted: bool) -> String {
        let name = &self.names[self.current_turn];
        if restarted {
            format!("{name} starts! New game started!")
        } else {
            format!("{name} starts!")
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn positions(&self) -> Vec<Cell> {
        self.pieces.iter().map(|p| p.cell).collect()
    }

    pub fn wins(&self) -> &[u32] {
        &self.wins
    }

    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_departed(&self, seat: usize) -> bool {
        self.departed.get(seat).copied().unwrap_or(true)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Test and replay hook: puts a seat's piece on `cell`.
    pub fn place(&mut self, seat: usize, cell: Cell) -> Result<(), GameError> {
        let piece = self
            .pieces
            .get_mut(seat)
            .ok_or(GameError::UnknownSeat(seat))?;
        piece.cell = cell;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ladders_protocol::Layout;

    use super::*;

    fn ladder_board() -> Board {
        Board::from_layout(Layout {
            snakes: [(40, 12)].into_iter().collect(),
            ladders: [(3, 20)].into_iter().collect(),
        })
    }

    fn ann_and_bo() -> GameState {
        GameState::new(vec!["Ann".into(), "Bo".into()], ladder_board()).unwrap()
    }

    /// Applies the table's turn rule after a roll.
    fn play(game: &mut GameState, die: u8) -> MoveOutcome {
        let outcome = game.roll_and_move(die).unwrap();
        if !outcome.keeps_turn() && !outcome.won {
            game.advance_turn();
        }
        outcome
    }

    #[test]
    fn test_new_requires_participants() {
        let result = GameState::new(Vec::new(), Board::empty());
        assert_eq!(result.unwrap_err(), GameError::NoParticipants);
    }

    #[test]
    fn test_new_game_starts_everyone_on_first_cell() {
        let game = ann_and_bo();
        assert_eq!(game.positions(), vec![1, 1]);
        assert_eq!(game.wins(), &[0, 0]);
        assert_eq!(game.current_turn(), 0);
        assert!(!game.is_finished());
    }

    #[test]
    fn test_piece_ids_are_unique_and_owned_by_seat() {
        let game = ann_and_bo();
        let pieces = game.pieces();
        assert_ne!(pieces[0].id, pieces[1].id);
        assert_eq!(pieces[0].owner, 0);
        assert_eq!(pieces[1].owner, 1);
    }

    #[test]
    fn test_ladder_climb_then_turn_passes() {
        let mut game = ann_and_bo();
        let outcome = play(&mut game, 2);

        assert_eq!(outcome.kind, MoveKind::Ladder { base: 3, top: 20 });
        assert_eq!(game.positions(), vec![20, 1]);
        assert_eq!(game.current_turn(), 1);
        assert_eq!(
            outcome.status,
            "Ann rolled a 2.\nAnn climbed a ladder! Goes up to cell 20."
        );
    }

    #[test]
    fn test_snake_slide() {
        let mut game = ann_and_bo();
        game.place(0, 36).unwrap();
        let outcome = play(&mut game, 4);

        assert_eq!(outcome.kind, MoveKind::Snake { head: 40, tail: 12 });
        assert_eq!(outcome.to, 12);
        assert!(outcome.status.contains("fell on a SNAKE! Slides down to cell 12."));
    }

    #[test]
    fn test_overshoot_stays_and_turn_passes() {
        let mut game = ann_and_bo();
        game.place(0, 97).unwrap();
        let outcome = play(&mut game, 5);

        assert_eq!(outcome.kind, MoveKind::Overshoot { needed: 3 });
        assert_eq!(game.positions()[0], 97);
        assert_eq!(game.current_turn(), 1);
        assert_eq!(
            outcome.status,
            "Ann rolled a 5.\nAnn needs exactly 3 to win! Stays on cell 97."
        );
    }

    #[test]
    fn test_overshoot_with_six_still_plays_again() {
        let mut game = ann_and_bo();
        game.place(0, 98).unwrap();
        let outcome = play(&mut game, 6);

        assert_eq!(outcome.to, 98);
        assert!(outcome.keeps_turn());
        assert_eq!(game.current_turn(), 0);
        assert!(outcome.status.ends_with("Ann rolled a 6 and plays again!"));
    }

    #[test]
    fn test_exact_landing_wins_without_turn_change() {
        let mut game = ann_and_bo();
        game.place(0, 94).unwrap();
        let outcome = play(&mut game, 6);

        assert_eq!(outcome.kind, MoveKind::Won);
        assert!(outcome.won);
        assert!(!outcome.keeps_turn());
        assert!(game.is_finished());
        assert!(game.winner_exists());
        assert_eq!(game.wins(), &[1, 0]);
        assert_eq!(game.current_turn(), 0);
        assert_eq!(outcome.status, "Ann rolled a 6.\nAnn won the game!");
    }

    #[test]
    fn test_last_cell_ignores_links() {
        let board = Board::from_layout(Layout {
            snakes: [(100, 2)].into_iter().collect(),
            ladders: Default::default(),
        });
        let mut game = GameState::new(vec!["Ann".into()], board).unwrap();
        game.place(0, 99).unwrap();
        let outcome = game.roll_and_move(1).unwrap();
        assert_eq!(outcome.to, 100);
        assert!(game.is_finished());
    }

    #[test]
    fn test_ladder_onto_last_cell_counts_as_win() {
        let board = Board::from_layout(Layout {
            snakes: Default::default(),
            ladders: [(90, 100)].into_iter().collect(),
        });
        let mut game = GameState::new(vec!["Ann".into()], board).unwrap();
        game.place(0, 88).unwrap();
        let outcome = game.roll_and_move(2).unwrap();
        assert!(outcome.won);
        assert_eq!(game.wins(), &[1]);
    }

    #[test]
    fn test_six_keeps_turn() {
        let mut game = ann_and_bo();
        play(&mut game, 6);
        assert_eq!(game.current_turn(), 0);
        assert_eq!(game.positions()[0], 7);
    }

    #[test]
    fn test_turn_wraps_around() {
        let mut game = ann_and_bo();
        play(&mut game, 1);
        play(&mut game, 1);
        assert_eq!(game.current_turn(), 0);
    }

    #[test]
    fn test_invalid_die_and_finished_are_errors() {
        let mut game = ann_and_bo();
        assert_eq!(game.roll_and_move(0), Err(GameError::InvalidDie(0)));
        assert_eq!(game.roll_and_move(7), Err(GameError::InvalidDie(7)));

        game.place(0, 99).unwrap();
        game.roll_and_move(1).unwrap();
        assert_eq!(game.roll_and_move(3), Err(GameError::Finished));
    }

    #[test]
    fn test_reset_keeps_tallies() {
        let mut game = ann_and_bo();
        game.place(0, 99).unwrap();
        game.roll_and_move(1).unwrap();
        let old_ids: Vec<_> = game.pieces().iter().map(|p| p.id).collect();

        game.reset();

        assert!(!game.is_finished());
        assert_eq!(game.current_turn(), 0);
        assert_eq!(game.positions(), vec![1, 1]);
        assert_eq!(game.wins(), &[1, 0]);
        assert!(game.pieces().iter().all(|p| !old_ids.contains(&p.id)));
    }

    #[test]
    fn test_departed_seats_are_skipped() {
        let names = vec!["Ann".into(), "Bo".into(), "Cy".into()];
        let mut game = GameState::new(names, Board::empty()).unwrap();
        game.depart(1).unwrap();

        play(&mut game, 1);
        assert_eq!(game.current_turn(), 2);
        play(&mut game, 1);
        assert_eq!(game.current_turn(), 0);
    }

    #[test]
    fn test_departing_turn_holder_passes_turn() {
        let mut game = ann_and_bo();
        game.depart(0).unwrap();
        assert_eq!(game.current_turn(), 1);
        assert!(game.is_departed(0));

        game.reset();
        assert_eq!(game.current_turn(), 1);
        assert_eq!(game.opening_status(true), "Bo starts! New game started!");
    }

    #[test]
    fn test_depart_unknown_seat() {
        let mut game = ann_and_bo();
        assert_eq!(game.depart(5), Err(GameError::UnknownSeat(5)));
    }

    #[test]
    fn test_snapshot_is_index_aligned() {
        let mut game = ann_and_bo();
        let outcome = play(&mut game, 2);
        let snapshot = game.snapshot(outcome.die, outcome.status.clone());

        assert_eq!(snapshot.names, vec!["Ann", "Bo"]);
        assert_eq!(snapshot.current_turn, 1);
        assert_eq!(snapshot.positions, vec![20, 1]);
        assert_eq!(snapshot.wins, vec![0, 0]);
        assert_eq!(snapshot.die, 2);
        assert!(!snapshot.finished);
    }

    #[test]
    fn test_opening_status() {
        let game = ann_and_bo();
        assert_eq!(game.opening_status(false), "Ann starts!");
    }
}
