//! Automated [`MoveSource`]s.

use super::{InputError, MoveSource};
use async_trait::async_trait;
use duel_othello::{Board, Color, Location, LocationList};
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Always plays the first legal move in row-major order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstLegalConnector;

#[async_trait]
impl MoveSource for FirstLegalConnector {
    async fn choose(
        &mut self,
        _board: Board,
        _color: Color,
        mut legal: LocationList,
    ) -> Result<Location, InputError> {
        legal.next().ok_or(InputError::Closed)
    }
}

/// Plays a uniformly random legal move.
pub struct RandomConnector<R> {
    rng: R,
}

impl<R: Rng + Send> RandomConnector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl<R: Rng + Send> MoveSource for RandomConnector<R> {
    async fn choose(
        &mut self,
        _board: Board,
        _color: Color,
        legal: LocationList,
    ) -> Result<Location, InputError> {
        legal.choose(&mut self.rng).ok_or(InputError::Closed)
    }
}

/// Replays fixed lines of input, as if typed, and remembers every rejection.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConnector {
    inputs: VecDeque<String>,
    pub rejections: Vec<String>,
    pub observed: Vec<Location>,
}

impl ScriptedConnector {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            rejections: Vec::new(),
            observed: Vec::new(),
        }
    }
}

#[async_trait]
impl MoveSource for ScriptedConnector {
    async fn choose(
        &mut self,
        _board: Board,
        _color: Color,
        _legal: LocationList,
    ) -> Result<Location, InputError> {
        let input = self.inputs.pop_front().ok_or(InputError::Closed)?;
        input
            .parse()
            .map_err(|_| InputError::Invalid(input.clone()))
    }

    fn reject(&mut self, reason: &str, _legal: LocationList) {
        self.rejections.push(reason.to_string());
    }

    fn observe(&mut self, _board: Board, mv: Location) {
        self.observed.push(mv);
    }
}
