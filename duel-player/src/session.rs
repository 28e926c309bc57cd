//! The turn-based game protocol, from one player's side of the stream.

use crate::connectors::{InputError, MoveSource};
use crate::discovery::Role;
use crate::protocol::{Message, ProtocolError};
use crate::transport::LineChannel;
use async_std::io;
use derive_more::Display;
use duel_othello::{Board, Color, Location, LocationList, Outcome};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SessionState {
    #[display(fmt = "awaiting local move")]
    AwaitingLocalMove,
    #[display(fmt = "awaiting remote move")]
    AwaitingRemoteMove,
    #[display(fmt = "game over ({})", _0)]
    GameOver(Outcome),
}

#[derive(Debug, Display)]
pub enum SessionError {
    #[display(fmt = "connection failed: {}", _0)]
    Transport(io::Error),
    #[display(fmt = "connection lost")]
    Disconnected,
    #[display(fmt = "opponent reported an error")]
    PeerError,
    #[display(fmt = "invalid message from opponent: {}", _0)]
    Protocol(ProtocolError),
    #[display(fmt = "no more local moves can be read")]
    InputClosed,
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(err) => Some(err),
            SessionError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Transport(err)
    }
}

/// One side of a game. Owns the board for the lifetime of the game.
pub struct GameSession<C, S> {
    channel: C,
    source: S,
    board: Board,
    color: Color,
    state: SessionState,
    peer_passed: bool,
}

impl<C: LineChannel, S: MoveSource> GameSession<C, S> {
    /// A session on the opening board, with color and turn order taken from `role`.
    pub fn new(channel: C, role: Role, source: S) -> Self {
        Self::with_board(channel, role.color(), role.moves_first(), Board::new(), source)
    }

    /// A session resuming from an arbitrary position.
    pub fn with_board(channel: C, color: Color, moves_first: bool, board: Board, source: S) -> Self {
        let state = if moves_first {
            SessionState::AwaitingLocalMove
        } else {
            SessionState::AwaitingRemoteMove
        };
        Self {
            channel,
            source,
            board,
            color,
            state,
            peer_passed: false,
        }
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Play until the game ends or fails. The outcome is from the local side's perspective.
    pub async fn run(&mut self) -> Result<Outcome, SessionError> {
        loop {
            self.state = match self.state {
                SessionState::AwaitingLocalMove => self.local_turn().await?,
                SessionState::AwaitingRemoteMove => self.remote_turn().await?,
                SessionState::GameOver(outcome) => {
                    info!(%outcome, score = %self.board.score(), "game over");
                    return Ok(outcome);
                }
            };
        }
    }

    async fn local_turn(&mut self) -> Result<SessionState, SessionError> {
        let legal = self.board.legal_moves(self.color);

        if legal.is_empty() {
            // A pass answered by a pass: the game is over, and this side reports it.
            if self.peer_passed {
                let outcome = self.board.score().outcome_for(self.color);
                self.send(Message::Result(outcome.reversed())).await?;
                return Ok(SessionState::GameOver(outcome));
            }
            info!(color = %self.color, "no legal moves, passing");
            self.send(Message::Pass).await?;
            return Ok(SessionState::AwaitingRemoteMove);
        }

        let mv = self.choose(legal).await?;
        self.peer_passed = false;
        self.send(Message::Move(mv)).await?;
        Ok(SessionState::AwaitingRemoteMove)
    }

    /// Ask the move source until it produces a legal move, then apply it.
    async fn choose(&mut self, legal: LocationList) -> Result<Location, SessionError> {
        loop {
            let chosen = self.source.choose(self.board, self.color, legal).await;
            let reason = match chosen {
                Ok(mv) if legal.contains(mv) => match self.board.apply_move(mv, self.color) {
                    Ok(board) => {
                        self.board = board;
                        self.source.observe(board, mv);
                        debug!(%mv, color = %self.color, "played local move");
                        return Ok(mv);
                    }
                    Err(err) => err.to_string(),
                },
                Ok(mv) => format!("{} is not a legal move", mv),
                Err(InputError::Closed) => {
                    warn!("move input closed, abandoning game");
                    self.notify_error().await;
                    return Err(SessionError::InputClosed);
                }
                Err(err) => err.to_string(),
            };
            debug!(%reason, "rejected local input");
            self.source.reject(&reason, legal);
        }
    }

    async fn remote_turn(&mut self) -> Result<SessionState, SessionError> {
        let line = self
            .channel
            .recv_line()
            .await?
            .ok_or(SessionError::Disconnected)?;

        let message = match Message::parse(&line) {
            Ok(message) => message,
            Err(err) => return Err(self.abort(err).await),
        };
        debug!(%message, "received");

        match message {
            Message::Move(mv) => {
                let board = match self.board.apply_move(mv, !self.color) {
                    Ok(board) => board,
                    Err(_) => return Err(self.abort(ProtocolError::Occupied(mv)).await),
                };
                self.board = board;
                self.peer_passed = false;
                self.source.observe(board, mv);
                Ok(SessionState::AwaitingLocalMove)
            }
            Message::Pass => {
                info!("opponent passed");
                self.peer_passed = true;
                Ok(SessionState::AwaitingLocalMove)
            }
            Message::Result(outcome) => Ok(SessionState::GameOver(outcome)),
            Message::Error => Err(SessionError::PeerError),
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), SessionError> {
        debug!(%message, "sending");
        self.channel.send_line(&message.to_string()).await?;
        Ok(())
    }

    /// Tell the peer we are terminating on its account.
    async fn abort(&mut self, err: ProtocolError) -> SessionError {
        warn!(%err, "opponent broke protocol");
        self.notify_error().await;
        SessionError::Protocol(err)
    }

    async fn notify_error(&mut self) {
        if let Err(err) = self.channel.send_line(&Message::Error.to_string()).await {
            debug!(%err, "could not send ERROR");
        }
    }
}
