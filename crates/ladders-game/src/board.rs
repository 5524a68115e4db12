//! Board model and the random layout generator.
//!
//! The board is just two maps, snakes (head → tail) and ladders
//! (base → top). A cell that is in neither map is plain.

use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;

use ladders_protocol::{Cell, Layout};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::GeneratorConfig;

/// Cells a snake head may occupy.
pub const SNAKE_HEADS: RangeInclusive<Cell> = 11..=95;
/// Cells a snake tail may occupy.
pub const SNAKE_TAILS: RangeInclusive<Cell> = 6..=90;
/// Cells a ladder base may occupy.
pub const LADDER_BASES: RangeInclusive<Cell> = 6..=85;
/// Cells a ladder top may occupy.
pub const LADDER_TOPS: RangeInclusive<Cell> = 11..=95;
/// Allowed length of a snake or ladder, before clipping to the board.
pub const SPAN: RangeInclusive<Cell> = 5..=19;

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// What sits on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Nothing; the piece stays.
    Plain,
    /// A snake head; the piece slides down to `tail`.
    Snake { tail: Cell },
    /// A ladder base; the piece climbs to `top`.
    Ladder { top: Cell },
}

/// A snakes-and-ladders board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    snakes: BTreeMap<Cell, Cell>,
    ladders: BTreeMap<Cell, Cell>,
}

impl Board {
    /// A board with no snakes and no ladders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a board from a layout received over the wire.
    ///
    /// The mappings are taken verbatim. Nothing is validated: the host is
    /// authoritative and participants trust what it sends.
    pub fn from_layout(layout: Layout) -> Self {
        Self {
            snakes: layout.snakes,
            ladders: layout.ladders,
        }
    }

    /// The layout to put on the wire.
    pub fn layout(&self) -> Layout {
        Layout {
            snakes: self.snakes.clone(),
            ladders: self.ladders.clone(),
        }
    }

    /// Snake head → tail.
    pub fn snakes(&self) -> &BTreeMap<Cell, Cell> {
        &self.snakes
    }

    /// Ladder base → top.
    pub fn ladders(&self) -> &BTreeMap<Cell, Cell> {
        &self.ladders
    }

    /// What happens to a piece that stops on `cell`.
    ///
    /// Snakes win over ladders if a hand-built layout uses a cell for both.
    pub fn link(&self, cell: Cell) -> Link {
        if let Some(&tail) = self.snakes.get(&cell) {
            Link::Snake { tail }
        } else if let Some(&top) = self.ladders.get(&cell) {
            Link::Ladder { top }
        } else {
            Link::Plain
        }
    }

    /// Where a piece that stops on `cell` ends up.
    pub fn resolve(&self, cell: Cell) -> Cell {
        match self.link(cell) {
            Link::Plain => cell,
            Link::Snake { tail } => tail,
            Link::Ladder { top } => top,
        }
    }
}

/// Returns `true` if a snake from `head` to `tail` is allowed on a
/// generated board.
pub fn is_valid_snake(head: Cell, tail: Cell) -> bool {
    SNAKE_HEADS.contains(&head) && SNAKE_TAILS.contains(&tail) && tail < head
}

/// Returns `true` if a ladder from `base` to `top` is allowed on a
/// generated board.
pub fn is_valid_ladder(base: Cell, top: Cell) -> bool {
    LADDER_BASES.contains(&base) && LADDER_TOPS.contains(&top) && top > base
}

// ---------------------------------------------------------------------------
// BoardSource
// ---------------------------------------------------------------------------

/// Supplies a board for every new game.
///
/// The host asks for one board when the game starts and another on every
/// restart.
pub trait BoardSource: Send + 'static {
    /// Produces the board for the next game.
    fn next_board(&mut self) -> Board;
}

/// Always hands out the same board.
#[derive(Debug, Clone)]
pub struct FixedBoard(pub Board);

impl BoardSource for FixedBoard {
    fn next_board(&mut self) -> Board {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// BoardGenerator
// ---------------------------------------------------------------------------

/// Places snakes and ladders at random without reusing any cell.
pub struct BoardGenerator<R = StdRng> {
    config: GeneratorConfig,
    rng: R,
}

impl BoardGenerator<StdRng> {
    /// A generator seeded from the operating system.
    pub fn from_os_rng(config: GeneratorConfig) -> Self {
        Self::new(config, StdRng::from_os_rng())
    }

    /// A deterministic generator; the same seed always yields the same
    /// sequence of boards.
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BoardGenerator<R> {
    /// A generator drawing from `rng`.
    pub fn new(config: GeneratorConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Generates one board.
    ///
    /// Snakes are placed first, then ladders. A feature that cannot find
    /// free cells within `max_attempts` is skipped, so the board may hold
    /// fewer features than configured.
    pub fn generate(&mut self) -> Board {
        let mut used = HashSet::new();
        let mut board = Board::empty();

        for _ in 0..self.config.snakes {
            match self.place(&mut used, Self::draw_snake) {
                Some((head, tail)) => {
                    board.snakes.insert(head, tail);
                }
                None => tracing::debug!(
                    attempts = self.config.max_attempts,
                    "no room for another snake, skipping it"
                ),
            }
        }

        for _ in 0..self.config.ladders {
            match self.place(&mut used, Self::draw_ladder) {
                Some((base, top)) => {
                    board.ladders.insert(base, top);
                }
                None => tracing::debug!(
                    attempts = self.config.max_attempts,
                    "no room for another ladder, skipping it"
                ),
            }
        }

        tracing::debug!(
            snakes = board.snakes.len(),
            ladders = board.ladders.len(),
            "board generated"
        );
        board
    }

    /// Draws candidates until one avoids every used cell.
    fn place(
        &mut self,
        used: &mut HashSet<Cell>,
        draw: fn(&mut R) -> Option<(Cell, Cell)>,
    ) -> Option<(Cell, Cell)> {
        for _ in 0..self.config.max_attempts {
            let Some((from, to)) = draw(&mut self.rng) else {
                continue;
            };
            if used.contains(&from) || used.contains(&to) {
                continue;
            }
            used.insert(from);
            used.insert(to);
            return Some((from, to));
        }
        None
    }

    fn draw_snake(rng: &mut R) -> Option<(Cell, Cell)> {
        let head = rng.random_range(SNAKE_HEADS);
        // Clip the drop so the tail never goes below the lowest tail cell.
        let longest = (*SPAN.end()).min(head - SNAKE_TAILS.start());
        let tail = head - rng.random_range(*SPAN.start()..=longest);
        is_valid_snake(head, tail).then_some((head, tail))
    }

    fn draw_ladder(rng: &mut R) -> Option<(Cell, Cell)> {
        let base = rng.random_range(LADDER_BASES);
        // Clip the climb so the top never goes past the highest top cell.
        let longest = (*SPAN.end()).min(LADDER_TOPS.end() - base);
        let top = base + rng.random_range(*SPAN.start()..=longest);
        is_valid_ladder(base, top).then_some((base, top))
    }
}

impl<R: Rng + Send + 'static> BoardSource for BoardGenerator<R> {
    fn next_board(&mut self) -> Board {
        self.generate()
    }
}
