//! The small vocabulary shared by the rules engine and the session layer:
//! piece colors, board cells and game outcomes.

use derive_more::Display;

/// One of the two piece colors in a game.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq)]
pub enum Color {
    #[display(fmt = "dark")]
    Dark,
    #[display(fmt = "light")]
    Light,
}

impl Default for Color {
    /// Gets the color that moves first (dark).
    fn default() -> Self {
        Self::Dark
    }
}

impl std::ops::Not for Color {
    type Output = Self;

    /// Gets the other color.
    fn not(self) -> Self {
        match self {
            Color::Dark => Color::Light,
            Color::Light => Color::Dark,
        }
    }
}

/// The contents of a single square.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Dark,
    Light,
}

impl Cell {
    /// The character used for this cell in board renders.
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Dark => 'D',
            Cell::Light => 'L',
        }
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Dark => Cell::Dark,
            Color::Light => Cell::Light,
        }
    }
}

/// How a finished game ended, from one player's point of view.
#[derive(Clone, Copy, Debug, Display, Hash, PartialEq, Eq)]
pub enum Outcome {
    #[display(fmt = "YOU WIN")]
    Win,
    #[display(fmt = "YOU LOSE")]
    Loss,
    #[display(fmt = "DRAW")]
    Draw,
}

impl Outcome {
    /// Decide the outcome by tile count. Ties are draws.
    pub fn from_counts(mine: u8, theirs: u8) -> Self {
        use std::cmp::Ordering;
        match mine.cmp(&theirs) {
            Ordering::Greater => Outcome::Win,
            Ordering::Less => Outcome::Loss,
            Ordering::Equal => Outcome::Draw,
        }
    }

    /// The same result seen from the other side of the table.
    pub fn reversed(self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_swaps_colors() {
        assert_eq!(!Color::Dark, Color::Light);
        assert_eq!(!Color::Light, Color::Dark);
        assert_eq!(Color::default(), Color::Dark);
    }

    #[test]
    fn outcome_from_counts() {
        assert_eq!(Outcome::from_counts(40, 24), Outcome::Win);
        assert_eq!(Outcome::from_counts(10, 54), Outcome::Loss);
        assert_eq!(Outcome::from_counts(32, 32), Outcome::Draw);
    }

    #[test]
    fn reversed_outcomes_are_complementary() {
        for outcome in [Outcome::Win, Outcome::Loss, Outcome::Draw].iter() {
            assert_eq!(outcome.reversed().reversed(), *outcome);
        }
        assert_eq!(Outcome::Draw.reversed(), Outcome::Draw);
        assert_eq!(Outcome::Win.reversed(), Outcome::Loss);
    }

    #[test]
    fn outcomes_display_as_wire_results() {
        assert_eq!(Outcome::Win.to_string(), "YOU WIN");
        assert_eq!(Outcome::Loss.to_string(), "YOU LOSE");
        assert_eq!(Outcome::Draw.to_string(), "DRAW");
    }
}
