//! Code for working with [`Location`]s on the Othello board.

use crate::bitboard::Bitboard;
use crate::{EDGE_LENGTH, NUM_SPACES};
use derive_more::{From, Into};
use std::fmt::{self, Display, Formatter};

/// A location on the Othello board.
///
/// Stored as a one-hot [`Bitboard`]. Coordinates are 0-indexed internally; the
/// text form (`Display` / `FromStr`) is the 1-indexed `row,col` notation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Into)]
pub struct Location(Bitboard);

/// A set of locations on the Othello board, which can be iterated to retrieve them
/// in row-major order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord, From, Into)]
pub struct LocationList(Bitboard);

impl Location {
    /// Convert from a row-major square index, where 0 is the upper-left square.
    /// Returns None for indices off the board.
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= NUM_SPACES {
            return None;
        }
        Some(Self(Bitboard::from(1u64 << (NUM_SPACES - 1 - index))))
    }

    /// Convert into a row-major square index, where 0 is the upper-left square.
    #[inline]
    pub fn to_index(self) -> usize {
        let bitboard: u64 = self.0.into();
        bitboard.leading_zeros() as usize
    }

    /// Convert from 0-indexed row and column coordinates.
    /// Returns None if either coordinate is off the board.
    pub fn from_coords(row: usize, col: usize) -> Option<Self> {
        if row >= EDGE_LENGTH || col >= EDGE_LENGTH {
            return None;
        }
        Self::from_index(row * EDGE_LENGTH + col)
    }

    /// Get the 0-indexed row and column coordinates.
    pub fn to_coords(self) -> (usize, usize) {
        let index = self.to_index();
        (index / EDGE_LENGTH, index % EDGE_LENGTH)
    }

    /// Step one square along a direction, or None if that walks off the board.
    pub fn offset(self, (d_row, d_col): (isize, isize)) -> Option<Self> {
        let (row, col) = self.to_coords();
        let row = row as isize + d_row;
        let col = col as isize + d_col;
        if row < 0 || col < 0 {
            return None;
        }
        Self::from_coords(row as usize, col as usize)
    }
}

/// Formats as 1-indexed `row,col`.
impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (row, col) = self.to_coords();
        write!(f, "{},{}", row + 1, col + 1)
    }
}

#[derive(Debug, PartialEq)]
pub struct ParseLocationError;

impl Display for ParseLocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid location string (expected <row>,<column> between 1 and 8)")
    }
}

impl std::error::Error for ParseLocationError {}

/// Build a [`Location`] from 1-indexed `row,col` notation ("4,3").
impl std::str::FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(',');
        let row: usize = parts
            .next()
            .ok_or(ParseLocationError)?
            .trim()
            .parse()
            .or(Err(ParseLocationError))?;
        let col: usize = parts
            .next()
            .ok_or(ParseLocationError)?
            .trim()
            .parse()
            .or(Err(ParseLocationError))?;

        if parts.next().is_some() || row == 0 || col == 0 {
            return Err(ParseLocationError);
        }

        Self::from_coords(row - 1, col - 1).ok_or(ParseLocationError)
    }
}

impl From<Location> for LocationList {
    fn from(loc: Location) -> Self {
        Self(loc.0)
    }
}

impl LocationList {
    /// Returns whether `loc` is in this list.
    pub fn contains(self, loc: Location) -> bool {
        self.0.intersects(loc.0)
    }

    /// Returns whether the list holds no locations.
    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }
}

impl ExactSizeIterator for LocationList {
    fn len(&self) -> usize {
        self.0.count_occupied() as usize
    }
}

impl Iterator for LocationList {
    type Item = Location;

    fn next(&mut self) -> Option<Location> {
        if self.0.is_empty() {
            return None;
        }

        let bitboard: u64 = self.0.into();
        let next_move = Bitboard::from(1u64 << (63 - bitboard.leading_zeros()));
        self.0 ^= next_move;

        Some(Location(next_move))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl Display for LocationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = self
            .into_iter()
            .map(|mv| mv.to_string())
            .collect::<Vec<String>>()
            .join(" ");

        f.write_fmt(format_args!("[{}]", string))
    }
}
