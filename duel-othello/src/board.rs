//! Othello board dynamics: legal moves, captures and scoring.
//!
//! Both operations walk the same table of eight unit directions with a single
//! scan routine, so legality and capture can never disagree.

use crate::bitboard::{self, Bitboard};
use crate::game::{Cell, Color, Outcome};
use crate::location::{Location, LocationList};
use crate::{utils, EDGE_LENGTH, NUM_SPACES};
use derive_more::Display;
use itertools::iproduct;
use std::fmt;

/// Unit vectors for the eight scan directions, as (row, column) steps.
pub const DIRECTIONS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A complete board position: one occupancy mask per color.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Board {
    dark: Bitboard,
    light: Bitboard,
}

/// Tile counts per color.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display(fmt = "dark {} - light {}", dark, light)]
pub struct Score {
    pub dark: u8,
    pub light: u8,
}

/// Returned when a placement targets a square that is already taken.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PlacementError {
    #[display(fmt = "square {} is already occupied", _0)]
    Occupied(Location),
}

impl std::error::Error for PlacementError {}

#[derive(Debug, PartialEq)]
pub struct ParseBoardError;

impl fmt::Display for ParseBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid board string")
    }
}

impl std::error::Error for ParseBoardError {}

impl Board {
    /// The canonical opening position.
    pub fn new() -> Self {
        Self {
            dark: bitboard::DARK_START,
            light: bitboard::LIGHT_START,
        }
    }

    /// Build a board from raw occupancy masks.
    /// Returns None if the masks overlap.
    pub fn from_bitboards(dark: Bitboard, light: Bitboard) -> Option<Self> {
        if dark.intersects(light) {
            return None;
        }
        Some(Self { dark, light })
    }

    /// The occupancy mask for one color.
    #[inline]
    pub fn bitboard(self, color: Color) -> Bitboard {
        match color {
            Color::Dark => self.dark,
            Color::Light => self.light,
        }
    }

    /// Get a mask indicating where the occupied spaces are.
    #[inline]
    pub fn occupied_mask(self) -> Bitboard {
        self.dark | self.light
    }

    /// Count the squares nobody has played on yet.
    #[inline]
    pub fn count_empty(self) -> u8 {
        self.occupied_mask().count_empty()
    }

    /// What is on the square at `loc`.
    pub fn cell(self, loc: Location) -> Cell {
        let square = Bitboard::from(loc);
        if self.dark.intersects(square) {
            Cell::Dark
        } else if self.light.intersects(square) {
            Cell::Light
        } else {
            Cell::Empty
        }
    }

    /// Every square where `mover` may legally play. Empty means `mover` must pass.
    pub fn legal_moves(self, mover: Color) -> LocationList {
        let mut moves = Bitboard::default();

        for (row, col) in iproduct!(0..EDGE_LENGTH, 0..EDGE_LENGTH) {
            if let Some(loc) = Location::from_coords(row, col) {
                if !self.flips(loc, mover).is_empty() {
                    moves |= Bitboard::from(loc);
                }
            }
        }

        LocationList::from(moves)
    }

    /// The opponent pieces a placement at `loc` would capture.
    /// Empty for occupied squares and for placements that bracket nothing.
    pub fn flips(self, loc: Location, mover: Color) -> Bitboard {
        if self.occupied_mask().intersects(Bitboard::from(loc)) {
            return Bitboard::default();
        }

        DIRECTIONS
            .iter()
            .fold(Bitboard::default(), |flips, &direction| {
                flips | self.bracketed_run(loc, direction, mover)
            })
    }

    /// Place a `mover` piece at `loc` and flip every bracketed run.
    ///
    /// The target must be empty. Legality is not checked here: a placement that
    /// captures nothing only adds the new piece.
    pub fn apply_move(self, loc: Location, mover: Color) -> Result<Self, PlacementError> {
        if self.cell(loc) != Cell::Empty {
            return Err(PlacementError::Occupied(loc));
        }

        let flips = self.flips(loc, mover);
        let placed = Bitboard::from(loc) | flips;

        Ok(match mover {
            Color::Dark => Self {
                dark: self.dark | placed,
                light: self.light ^ flips,
            },
            Color::Light => Self {
                dark: self.dark ^ flips,
                light: self.light | placed,
            },
        })
    }

    /// Count the tiles of each color.
    pub fn score(self) -> Score {
        Score {
            dark: self.dark.count_occupied(),
            light: self.light.count_occupied(),
        }
    }

    /// Scan outward from `origin` along one direction.
    ///
    /// Returns the maximal run of opponent pieces if it is immediately followed by
    /// a `mover` piece, or nothing if the run is empty or ends at the edge or an
    /// empty square.
    fn bracketed_run(self, origin: Location, direction: (isize, isize), mover: Color) -> Bitboard {
        let own = self.bitboard(mover);
        let opponent = self.bitboard(!mover);

        let mut run = Bitboard::default();
        let mut cursor = origin.offset(direction);

        while let Some(loc) = cursor {
            let square = Bitboard::from(loc);
            if opponent.intersects(square) {
                run |= square;
                cursor = loc.offset(direction);
            } else if own.intersects(square) {
                return run;
            } else {
                break;
            }
        }

        Bitboard::default()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Score {
    /// Tiles held by `color`.
    pub fn of(self, color: Color) -> u8 {
        match color {
            Color::Dark => self.dark,
            Color::Light => self.light,
        }
    }

    /// The result for the player holding `color`.
    pub fn outcome_for(self, color: Color) -> Outcome {
        Outcome::from_counts(self.of(color), self.of(!color))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let board = *self;
        utils::format_grid(
            (0..NUM_SPACES)
                .filter_map(Location::from_index)
                .map(|loc| board.cell(loc).symbol()),
            f,
        )
    }
}

/// Parse a board from 64 square characters in row-major order.
/// `X`/`D` are dark, `O`/`L` are light, `-`/`.` are empty; whitespace is ignored.
impl std::str::FromStr for Board {
    type Err = ParseBoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut dark = Bitboard::default();
        let mut light = Bitboard::default();
        let mut squares = 0;

        for symbol in s.chars().filter(|c| !c.is_whitespace()) {
            let loc = Location::from_index(squares).ok_or(ParseBoardError)?;
            match symbol {
                'X' | 'D' => dark |= Bitboard::from(loc),
                'O' | 'L' => light |= Bitboard::from(loc),
                '-' | '.' => {}
                _ => return Err(ParseBoardError),
            }
            squares += 1;
        }

        if squares != NUM_SPACES {
            return Err(ParseBoardError);
        }

        Ok(Self { dark, light })
    }
}
