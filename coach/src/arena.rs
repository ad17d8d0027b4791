//! Head-to-head evaluation between two action selectors.

use anyhow::{anyhow, Context, Result};
use engine_core::{first_player_point, GameState};
use mcts::ActionSelector;
use serde::Serialize;
use tracing::{debug, info};

/// A candidate replaces the incumbent only when its average score is
/// strictly above this.
pub const PROMOTION_THRESHOLD: f64 = 0.5;

/// Result of an arena match, from the perspective of the first selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaReport {
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Mean score per game: 1 for a win, 0.5 for a draw, 0 for a loss
    pub average: f64,
}

impl ArenaReport {
    fn from_scores(scores: &[f64]) -> Self {
        let games = scores.len() as u32;
        let wins = scores.iter().filter(|&&s| s > 0.5).count() as u32;
        let losses = scores.iter().filter(|&&s| s < 0.5).count() as u32;
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        Self {
            games,
            wins,
            draws: games - wins - losses,
            losses,
            average,
        }
    }
}

pub fn should_promote(report: &ArenaReport) -> bool {
    report.average > PROMOTION_THRESHOLD
}

/// Play one game from `initial` and return the final state.
///
/// `first` moves whenever the position has the first player to move.
pub fn play_game<S, A, B>(initial: S, first: &mut A, second: &mut B) -> Result<S>
where
    S: GameState,
    A: ActionSelector<S> + ?Sized,
    B: ActionSelector<S> + ?Sized,
{
    let mut state = initial;
    while !state.is_terminal() {
        let (name, action) = if state.is_first_player() {
            (first.name().to_string(), first.select(&state)?)
        } else {
            (second.name().to_string(), second.select(&state)?)
        };
        state = state
            .next(action)
            .with_context(|| format!("selector '{}' chose illegal action {}", name, action))?;
    }
    Ok(state)
}

/// Arena match settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub games: u32,
    /// Move temperature for search-backed selectors in the match
    pub temperature: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            games: 10,
            temperature: 1.0,
        }
    }
}

impl ArenaConfig {
    pub fn with_games(mut self, games: u32) -> Self {
        self.games = games;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.games == 0 {
            return Err(anyhow!("arena needs at least one game"));
        }
        if self.temperature.is_nan() || self.temperature < 0.0 {
            return Err(anyhow!(
                "arena temperature must be >= 0, got {}",
                self.temperature
            ));
        }
        Ok(())
    }
}

/// Plays a fixed number of games, alternating seats.
#[derive(Debug, Clone)]
pub struct Arena {
    config: ArenaConfig,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Score `a` against `b`. `a` moves first in even games and second in
    /// odd games.
    pub fn evaluate<S, A, B>(&self, a: &mut A, b: &mut B) -> Result<ArenaReport>
    where
        S: GameState + Default,
        A: ActionSelector<S> + ?Sized,
        B: ActionSelector<S> + ?Sized,
    {
        let mut scores = Vec::with_capacity(self.config.games as usize);

        for game in 0..self.config.games {
            let score = if game % 2 == 0 {
                let ended = play_game(S::default(), a, b)?;
                first_player_point(&ended)
            } else {
                let ended = play_game(S::default(), b, a)?;
                1.0 - first_player_point(&ended)
            };
            debug!(game, score, a = a.name(), b = b.name(), "Arena game finished");
            scores.push(score);
        }

        let report = ArenaReport::from_scores(&scores);
        info!(
            a = a.name(),
            b = b.name(),
            games = report.games,
            wins = report.wins,
            draws = report.draws,
            losses = report.losses,
            average = report.average,
            "Arena complete"
        );
        Ok(report)
    }
}
