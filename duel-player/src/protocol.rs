//! Wire formats.
//!
//! Discovery uses a single broadcast datagram, `NEW GAME:<port>\n`, which must
//! fit in [`DATAGRAM_BUDGET`] bytes. A game is a sequence of newline-delimited
//! ASCII lines, one [`Message`] per line.

use derive_more::Display;
use duel_othello::{Location, Outcome, EDGE_LENGTH};
use std::fmt;
use std::ops::RangeInclusive;

/// Prefix of every discovery announcement.
pub const ANNOUNCE_PREFIX: &str = "NEW GAME:";

/// Size of the datagram receive buffer. Announcements must fit, newline included.
pub const DATAGRAM_BUDGET: usize = 14;

/// Stream ports a host may announce.
pub const GAME_PORTS: RangeInclusive<u16> = 9000..=9100;

/// A host's offer to play, broadcast during discovery.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Announcement {
    pub port: u16,
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AnnouncementError {
    #[display(fmt = "datagram does not start with {:?}", ANNOUNCE_PREFIX)]
    MissingPrefix,
    #[display(fmt = "unparsable game port {:?}", _0)]
    BadPort(String),
    #[display(fmt = "game port {} is outside 9000..=9100", _0)]
    PortOutOfRange(u32),
    #[display(fmt = "announcement for port {} exceeds {} bytes", _0, DATAGRAM_BUDGET)]
    TooLong(u16),
}

impl std::error::Error for AnnouncementError {}

impl Announcement {
    /// An announcement for `port`, which must be a valid game port.
    pub fn new(port: u16) -> Result<Self, AnnouncementError> {
        if !GAME_PORTS.contains(&port) {
            return Err(AnnouncementError::PortOutOfRange(u32::from(port)));
        }
        Ok(Self { port })
    }

    /// The datagram payload, newline included.
    pub fn encode(self) -> Result<Vec<u8>, AnnouncementError> {
        let text = format!("{}{}\n", ANNOUNCE_PREFIX, self.port);
        if text.len() > DATAGRAM_BUDGET {
            return Err(AnnouncementError::TooLong(self.port));
        }
        Ok(text.into_bytes())
    }

    /// Parse a received datagram. Trailing padding and whitespace are ignored.
    pub fn decode(payload: &[u8]) -> Result<Self, AnnouncementError> {
        let text = String::from_utf8_lossy(payload);
        let text = text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
        let port = text
            .strip_prefix(ANNOUNCE_PREFIX)
            .ok_or(AnnouncementError::MissingPrefix)?;

        let parsed: u32 = port
            .parse()
            .map_err(|_| AnnouncementError::BadPort(port.to_string()))?;
        if parsed > u32::from(u16::MAX) || !GAME_PORTS.contains(&(parsed as u16)) {
            return Err(AnnouncementError::PortOutOfRange(parsed));
        }

        Ok(Self {
            port: parsed as u16,
        })
    }
}

/// One line of the game protocol.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Message {
    /// `MOVE:<row>,<col>`, 1-indexed.
    Move(Location),
    /// The sender has no legal move.
    Pass,
    /// The sender saw a protocol violation and is terminating.
    Error,
    /// `YOU WIN` / `YOU LOSE` / `DRAW`: the receiver's outcome.
    Result(Outcome),
}

/// A line from the peer that breaks the protocol.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ProtocolError {
    #[display(fmt = "malformed message {:?}", _0)]
    Malformed(String),
    #[display(fmt = "move {},{} is off the board", row, col)]
    MoveOutOfRange { row: i64, col: i64 },
    #[display(fmt = "move {} targets an occupied square", _0)]
    Occupied(Location),
}

impl std::error::Error for ProtocolError {}

impl Message {
    /// Parse one line, ignoring surrounding whitespace.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        match line {
            "PASS" => return Ok(Message::Pass),
            "ERROR" => return Ok(Message::Error),
            "YOU WIN" => return Ok(Message::Result(Outcome::Win)),
            "YOU LOSE" => return Ok(Message::Result(Outcome::Loss)),
            "DRAW" => return Ok(Message::Result(Outcome::Draw)),
            _ => {}
        }

        let malformed = || ProtocolError::Malformed(line.to_string());
        let coords = line.strip_prefix("MOVE:").ok_or_else(malformed)?;
        let mut parts = coords.split(',');
        let row = parts.next().and_then(decimal).ok_or_else(malformed)?;
        let col = parts.next().and_then(decimal).ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        let on_board = |n: i64| n >= 1 && n <= EDGE_LENGTH as i64;
        if !on_board(row) || !on_board(col) {
            return Err(ProtocolError::MoveOutOfRange { row, col });
        }

        Location::from_coords(row as usize - 1, col as usize - 1)
            .map(Message::Move)
            .ok_or(ProtocolError::MoveOutOfRange { row, col })
    }
}

/// Plain unsigned decimal digits, nothing else.
fn decimal(part: &str) -> Option<i64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Formats as the wire line, without the trailing newline.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Move(loc) => write!(f, "MOVE:{}", loc),
            Message::Pass => f.write_str("PASS"),
            Message::Error => f.write_str("ERROR"),
            Message::Result(outcome) => write!(f, "{}", outcome),
        }
    }
}
