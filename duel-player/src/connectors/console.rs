//! [`MoveSource`] for a human typing moves at the terminal.

use super::{InputError, MoveSource};
use async_std::io;
use async_trait::async_trait;
use duel_othello::{Board, Color, Location, LocationList};
use std::io::Write;
use tracing::debug;

pub struct ConsoleConnector {
    stdin: io::Stdin,
}

impl ConsoleConnector {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }

    fn prompt<W: Write>(out: &mut W) {
        let written = write!(
            out,
            "Please enter your move (format: <row_number>,<column_number>): "
        )
        .and_then(|_| out.flush());
        if let Err(err) = written {
            debug!(%err, "could not show move prompt");
        }
    }
}

impl Default for ConsoleConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveSource for ConsoleConnector {
    async fn choose(
        &mut self,
        board: Board,
        color: Color,
        legal: LocationList,
    ) -> Result<Location, InputError> {
        println!("\n{}\n", board);
        println!("You are {}. Possible moves: {}", color, legal);
        Self::prompt(&mut std::io::stdout());

        let mut buffer = String::new();
        let read = self
            .stdin
            .read_line(&mut buffer)
            .await
            .map_err(|_| InputError::Closed)?;
        if read == 0 {
            return Err(InputError::Closed);
        }

        let input = buffer.trim();
        input
            .parse()
            .map_err(|_| InputError::Invalid(input.to_string()))
    }

    fn reject(&mut self, reason: &str, legal: LocationList) {
        eprintln!("ERROR: {}, please try again", reason);
        println!("Possible moves: {}", legal);
    }

    fn observe(&mut self, board: Board, mv: Location) {
        println!("\nMoved to {}\n{}\n", mv, board);
    }
}
