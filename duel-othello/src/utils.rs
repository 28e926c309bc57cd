//! Miscellaneous project utilities.

use crate::EDGE_LENGTH;
use std::fmt::{self, Formatter};
use std::iter::Iterator;

/// Format 64 characters into a pretty grid with 1-indexed row and column headers.
/// `piece_iter` must yield exactly 64 items in row-major order.
pub fn format_grid<T: Iterator<Item = char>>(mut piece_iter: T, f: &mut Formatter) -> fmt::Result {
    write!(f, "   1 2 3 4 5 6 7 8")?;

    for row in 0..EDGE_LENGTH {
        write!(f, "\n {} ", row + 1)?;
        for _ in 0..EDGE_LENGTH {
            write!(f, "{} ", piece_iter.next().ok_or(fmt::Error)?)?;
        }
    }

    match piece_iter.next() {
        None => Ok(()),
        _ => Err(fmt::Error),
    }
}
