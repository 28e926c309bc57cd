//! Connectors supply the local player's moves: a human at the console or an agent.

mod agents;
mod connector;
mod console;

pub use agents::{FirstLegalConnector, RandomConnector, ScriptedConnector};
pub use connector::{InputError, MoveSource};
pub use console::ConsoleConnector;
