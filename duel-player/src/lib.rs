//! Two-player Othello over a LAN.
//!
//! Two instances find each other with [`discovery`], which settles who hosts
//! and hands over a connected stream. A [`session::GameSession`] then plays the
//! game over that stream, taking local moves from a [`connectors::MoveSource`].

pub mod connectors;
pub mod discovery;
pub mod protocol;
pub mod session;
pub mod transport;
