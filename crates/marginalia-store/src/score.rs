//! Forgetting-score model.
//!
//! A note's score is a bounded integer that decays by a fixed amount per
//! elapsed whole day and recovers when the note is visited. Recovery shrinks
//! with the number of visits already inside the trailing recovery window, with
//! a floor of [`ScoringParams::min_recovery_points`] per visit.
//!
//! The model is pure: every operation takes a [`ScoreState`] snapshot and an
//! explicit "now" (epoch millis) and returns a new snapshot.
//!
//! ```
//! use marginalia_store::{ScoreModel, score::ONE_DAY_MS};
//!
//! let model = ScoreModel::default();
//! let t0 = 1_700_000_000_000;
//! let state = model.initial_state(t0);
//!
//! assert_eq!(model.score_at(&state, t0 + 5 * ONE_DAY_MS), 95);
//!
//! let visited = model.visit(&state, t0 + 5 * ONE_DAY_MS);
//! assert_eq!(visited.score, 105);
//! ```

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Milliseconds in one day.
pub const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const MAX_SCORE: i32 = 150;
pub const MIN_SCORE: i32 = 0;
pub const INITIAL_SCORE: i32 = 100;
pub const MAX_RECOVERY_POINTS: i32 = 10;
pub const MIN_RECOVERY_POINTS: i32 = 1;
pub const DECAY_PER_DAY: i32 = 1;
pub const RECOVERY_WINDOW_DAYS: i64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Tunable constants of the score model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringParams {
    pub max_score: i32,
    pub min_score: i32,
    pub initial_score: i32,
    pub max_recovery_points: i32,
    pub min_recovery_points: i32,
    pub decay_per_day: i32,
    pub recovery_window_days: i64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            max_score: MAX_SCORE,
            min_score: MIN_SCORE,
            initial_score: INITIAL_SCORE,
            max_recovery_points: MAX_RECOVERY_POINTS,
            min_recovery_points: MIN_RECOVERY_POINTS,
            decay_per_day: DECAY_PER_DAY,
            recovery_window_days: RECOVERY_WINDOW_DAYS,
        }
    }
}

impl ScoringParams {
    /// Check that the parameters describe a usable model.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_score > self.max_score {
            return Err(ValidationError::InvalidScoring(format!(
                "min_score {} exceeds max_score {}",
                self.min_score, self.max_score
            )));
        }
        if !(self.min_score..=self.max_score).contains(&self.initial_score) {
            return Err(ValidationError::InvalidScoring(format!(
                "initial_score {} outside [{}, {}]",
                self.initial_score, self.min_score, self.max_score
            )));
        }
        if self.min_recovery_points < 0 || self.min_recovery_points > self.max_recovery_points {
            return Err(ValidationError::InvalidScoring(format!(
                "recovery points range [{}, {}] is empty or negative",
                self.min_recovery_points, self.max_recovery_points
            )));
        }
        if self.decay_per_day < 0 {
            return Err(ValidationError::InvalidScoring(format!(
                "decay_per_day {} is negative",
                self.decay_per_day
            )));
        }
        if self.recovery_window_days <= 0 {
            return Err(ValidationError::InvalidScoring(format!(
                "recovery_window_days {} must be positive",
                self.recovery_window_days
            )));
        }
        Ok(())
    }

    fn window_ms(&self) -> i64 {
        self.recovery_window_days.saturating_mul(ONE_DAY_MS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Scoring fields of one note, as a value.
///
/// Order of `visit_timestamps` carries no meaning; only membership and age do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: i32,
    /// Epoch millis at which `score` was last recalculated.
    pub last_updated: i64,
    /// Epoch millis of recent visits.
    pub visit_timestamps: Vec<i64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Model
// ─────────────────────────────────────────────────────────────────────────────

/// Pure forgetting-score calculator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreModel {
    params: ScoringParams,
}

impl ScoreModel {
    /// Create a model with the given parameters.
    ///
    /// Callers are expected to have run [`ScoringParams::validate`].
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    /// The parameters this model was built with.
    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    /// State of a freshly created note.
    pub fn initial_state(&self, now: i64) -> ScoreState {
        ScoreState {
            score: self.params.initial_score,
            last_updated: now,
            visit_timestamps: Vec::new(),
        }
    }

    /// Apply decay pending up to `now`.
    ///
    /// Whole elapsed days are charged at `decay_per_day` each and
    /// `last_updated` moves forward by exactly those days, so a partial day
    /// stays pending for the next call. Visit timestamps that have left the
    /// recovery window are dropped. A `now` earlier than `last_updated`
    /// counts as zero elapsed days.
    pub fn advance(&self, state: &ScoreState, now: i64) -> ScoreState {
        let elapsed = now.saturating_sub(state.last_updated);
        let days_passed = if elapsed > 0 { elapsed / ONE_DAY_MS } else { 0 };

        let (score, last_updated) = if days_passed > 0 {
            let decay = days_passed.saturating_mul(i64::from(self.params.decay_per_day));
            let decayed = i64::from(state.score).saturating_sub(decay);
            (
                self.clamp(decayed),
                state.last_updated + days_passed * ONE_DAY_MS,
            )
        } else {
            (self.clamp(i64::from(state.score)), state.last_updated)
        };

        ScoreState {
            score,
            last_updated,
            visit_timestamps: self.purge_expired(&state.visit_timestamps, now),
        }
    }

    /// Current score at `now`, after pending decay.
    pub fn score_at(&self, state: &ScoreState, now: i64) -> i32 {
        self.advance(state, now).score
    }

    /// Points a visit at `now` would add before the `max_score` cap.
    pub fn recovery_points(&self, state: &ScoreState, now: i64) -> i32 {
        let in_window = self.purge_expired(&state.visit_timestamps, now).len();
        self.recovery_for(in_window)
    }

    /// Record a visit at `now`.
    ///
    /// Applies pending decay, adds the recovery points (capped at
    /// `max_score`), records `now` in the window and marks the score as
    /// recalculated at `now`.
    pub fn visit(&self, state: &ScoreState, now: i64) -> ScoreState {
        let mut next = self.advance(state, now);
        let recovery = self.recovery_for(next.visit_timestamps.len());

        next.score = self.clamp(i64::from(next.score) + i64::from(recovery));
        next.visit_timestamps.push(now);
        next.last_updated = now;
        next
    }

    fn recovery_for(&self, visits_in_window: usize) -> i32 {
        let visits = i32::try_from(visits_in_window).unwrap_or(i32::MAX);
        self.params
            .max_recovery_points
            .saturating_sub(visits)
            .max(self.params.min_recovery_points)
    }

    fn purge_expired(&self, timestamps: &[i64], now: i64) -> Vec<i64> {
        let window = self.params.window_ms();
        timestamps
            .iter()
            .copied()
            .filter(|ts| now.saturating_sub(*ts) <= window)
            .collect()
    }

    fn clamp(&self, score: i64) -> i32 {
        let clamped = score.clamp(
            i64::from(self.params.min_score),
            i64::from(self.params.max_score),
        );
        // In range of i32 because both bounds are i32.
        clamped as i32
    }
}
