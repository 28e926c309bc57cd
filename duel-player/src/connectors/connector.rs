use async_trait::async_trait;
use derive_more::Display;
use duel_othello::{Board, Color, Location, LocationList};

/// Why a move source could not produce a move.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum InputError {
    /// The input could not be read as a location. The session asks again.
    #[display(fmt = "cannot read {:?} as <row>,<column>", _0)]
    Invalid(String),
    /// No more input will ever arrive.
    #[display(fmt = "move input closed")]
    Closed,
}

impl std::error::Error for InputError {}

/// A player-facing abstract interface to whoever picks the local moves.
#[async_trait]
pub trait MoveSource: Send {
    /// Pick a move for `color`. The session keeps asking until the answer is in `legal`.
    async fn choose(
        &mut self,
        board: Board,
        color: Color,
        legal: LocationList,
    ) -> Result<Location, InputError>;

    /// The last answer was not usable.
    fn reject(&mut self, _reason: &str, _legal: LocationList) {}

    /// A move was applied to the board, by either side.
    fn observe(&mut self, _board: Board, _mv: Location) {}
}
