//! "Perft" performance test: count the number of leaves at a given depth.
//! Useful for checking move generation and captures against known totals.
//! See: http://www.aartbik.com/MISC/reversi.html

use crate::{Board, Color};

/// Count the positions reachable from the opening in exactly `depth` plies.
/// Passes count as plies; a mutual pass ends the line early as a leaf.
pub fn run_perft(depth: u64) -> u64 {
    leaves_below(Board::new(), Color::Dark, depth, false)
}

fn leaves_below(board: Board, mover: Color, depth: u64, passed: bool) -> u64 {
    // Leaf node for this depth
    if depth == 0 {
        return 1;
    }

    let all_moves = board.legal_moves(mover);
    if all_moves.is_empty() {
        // Both players passed: game is over
        if passed {
            return 1;
        }

        return leaves_below(board, !mover, depth - 1, true);
    }

    all_moves
        .map(|mv| match board.apply_move(mv, mover) {
            Ok(next) => leaves_below(next, !mover, depth - 1, false),
            Err(_) => 0,
        })
        .sum()
}
