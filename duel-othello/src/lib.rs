//! `duel-othello` is the rules engine behind a two-player Othello duel.
//!
//! The crate does no I/O. It provides:
//!
//!  - [`bitboard`], the packed occupancy masks the board is built on.
//!  - [`Board`], the game rules: legal move generation, sandwich captures in all
//!    eight directions, and terminal scoring.
//!  - [`Location`] and [`LocationList`], squares and sets of squares in the
//!    1-indexed `row,col` notation players and the wire protocol share.
//!  - [`Color`], [`Cell`] and [`Outcome`], the small vocabulary the session layer
//!    speaks in.

pub mod bitboard;
pub mod test_utils;

mod board;
mod game;
mod location;
mod utils;

pub use board::*;
pub use game::*;
pub use location::*;

/// The number of spaces on one edge of an Othello board.
pub const EDGE_LENGTH: usize = 8;

/// The number of spaces on an Othello board.
pub const NUM_SPACES: usize = 64;
