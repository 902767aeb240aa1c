//! Score and multiplier tracking for one level run.
//!
//! The multiplier grows linearly with the distance travelled since the last
//! counted hit. A hit closes the current segment as a [`ScorePart`] and the
//! next segment starts from the closing multiplier times
//! `multiplier_decrement`. The score is the sum of all closed parts plus the
//! part that would close at the current coordinate.
//!
//! A segment's score is the arithmetic series over its multiplier range:
//!
//! ```text
//! score = (end + start) * (end - start + 1) * 0.5
//! ```
//!
//! An undamaged run climbs from 1 to `multiplier_max`, which scores exactly
//! `score_max`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voider_actors::prelude::{EventBus, EventKind, GameEvent, SubscriptionId};

use crate::config::ScoreConfig;
use crate::EngineError;

// ---------------------------------------------------------------------------
// ScorePart
// ---------------------------------------------------------------------------

/// One closed multiplier segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePart {
    /// Level coordinate at which the segment closed.
    pub coord_end: f32,
    pub multiplier_start: f64,
    pub multiplier_end: f64,
    /// Starting multiplier of the following segment.
    pub multiplier_after: f64,
    pub score: f64,
}

impl ScorePart {
    pub fn new(coord_end: f32, multiplier_start: f64, multiplier_end: f64, decrement: f64) -> Self {
        Self {
            coord_end,
            multiplier_start,
            multiplier_end,
            multiplier_after: multiplier_end * decrement,
            score: segment_score(multiplier_start, multiplier_end),
        }
    }
}

/// Sum of the arithmetic series from `start` to `end`.
pub fn segment_score(start: f64, end: f64) -> f64 {
    (end + start) * (end - start + 1.0) * 0.5
}

// ---------------------------------------------------------------------------
// ScoreState
// ---------------------------------------------------------------------------

/// The serializable part of [`PlayerStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub coord_start: f32,
    pub coord_end: f32,
    pub coord_current: f32,
    pub multiplier: f64,
    pub score: f64,
    pub parts: Vec<ScorePart>,
    pub last_hit_time: Option<f32>,
    pub extra_lives: u32,
    pub new_highscore: bool,
}

// ---------------------------------------------------------------------------
// PlayerStats
// ---------------------------------------------------------------------------

/// Score, multiplier and lives of the player during one run.
///
/// Listens to health changes through its own [`EventBus`] subscription, which
/// [`dispose`](Self::dispose) releases.
#[derive(Debug)]
pub struct PlayerStats {
    state: ScoreState,
    config: ScoreConfig,
    multiplier_per_coord: f64,
    multiplier_normalized: f64,
    subscription: SubscriptionId,
}

impl PlayerStats {
    /// Start tracking a run over `[coord_start, coord_end]`.
    pub fn new(
        coord_start: f32,
        coord_end: f32,
        level_length_seconds: f32,
        config: &ScoreConfig,
        bus: &mut EventBus,
    ) -> Result<Self, EngineError> {
        if !(coord_end > coord_start) {
            return Err(EngineError::InvalidLevelBounds {
                start: coord_start,
                end: coord_end,
            });
        }
        let multiplier_max = config.multiplier_max();
        let subscription = bus.subscribe(&[EventKind::HealthChanged]);
        Ok(Self {
            state: ScoreState {
                coord_start,
                coord_end,
                coord_current: coord_start,
                multiplier: 1.0,
                score: 0.0,
                parts: Vec::new(),
                last_hit_time: None,
                extra_lives: config.starting_lives.saturating_sub(1),
                new_highscore: false,
            },
            config: config.clone(),
            multiplier_per_coord: multiplier_max / f64::from(coord_end - coord_start),
            multiplier_normalized: f64::from(level_length_seconds) / multiplier_max,
            subscription,
        })
    }

    /// Consume pending health changes. Returns the number of counted hits.
    pub fn process_events(&mut self, bus: &mut EventBus) -> usize {
        bus.drain(self.subscription)
            .into_iter()
            .filter(|event| match *event {
                GameEvent::HealthChanged {
                    is_player: true,
                    old_health,
                    new_health,
                    time,
                    ..
                } if new_health < old_health => self.register_hit(time),
                _ => false,
            })
            .count()
    }

    /// Close the current segment unless a hit was counted less than
    /// `multiplier_collision_cooldown` seconds ago.
    pub fn register_hit(&mut self, time: f32) -> bool {
        let cooldown = self.config.multiplier_collision_cooldown;
        if self
            .state
            .last_hit_time
            .is_some_and(|last| time < last + cooldown)
        {
            return false;
        }
        self.state.last_hit_time = Some(time);
        let part = ScorePart::new(
            self.state.coord_current,
            self.segment_start_multiplier(),
            self.state.multiplier,
            self.config.multiplier_decrement,
        );
        debug!(
            coord = part.coord_end,
            multiplier = part.multiplier_end,
            after = part.multiplier_after,
            "score segment closed"
        );
        self.state.parts.push(part);
        true
    }

    /// Recompute the multiplier and score at `coord`.
    pub fn update_score(&mut self, coord: f32) {
        self.state.coord_current = coord.min(self.state.coord_end);
        self.refresh();
    }

    /// Final score. An undamaged run earns `score_max`.
    pub fn calculate_end_score(&mut self) {
        if self.state.parts.is_empty() {
            self.state.score = self.config.score_max;
        } else {
            self.state.coord_current = self.state.coord_end;
            self.refresh();
        }
        info!(score = self.score(), parts = self.state.parts.len(), "run scored");
    }

    fn refresh(&mut self) {
        let travelled = f64::from(self.state.coord_current - self.segment_start_coord());
        self.state.multiplier =
            self.segment_start_multiplier() + travelled * self.multiplier_per_coord;
        let closing = segment_score(self.segment_start_multiplier(), self.state.multiplier);
        let closed: f64 = self.state.parts.iter().map(|p| p.score).sum();
        self.state.score = (closing + closed).min(self.config.score_max);
    }

    fn segment_start_multiplier(&self) -> f64 {
        self.state.parts.last().map_or(1.0, |p| p.multiplier_after)
    }

    fn segment_start_coord(&self) -> f32 {
        self.state
            .parts
            .last()
            .map_or(self.state.coord_start, |p| p.coord_end)
    }

    // -- queries ------------------------------------------------------------

    /// Score rounded half up.
    pub fn score(&self) -> i64 {
        (self.state.score + 0.5) as i64
    }

    pub fn score_exact(&self) -> f64 {
        self.state.score
    }

    /// Score with thousands separators.
    pub fn score_string(&self) -> String {
        format_score(self.score())
    }

    pub fn multiplier(&self) -> f64 {
        self.state.multiplier
    }

    /// Multiplier scaled to the level length in seconds, rounded half up.
    pub fn multiplier_display(&self) -> i64 {
        (self.state.multiplier * self.multiplier_normalized + 0.5) as i64
    }

    pub fn multiplier_per_coord(&self) -> f64 {
        self.multiplier_per_coord
    }

    pub fn score_parts(&self) -> &[ScorePart] {
        &self.state.parts
    }

    pub fn extra_lives(&self) -> u32 {
        self.state.extra_lives
    }

    /// Spend one extra life. Returns `false` when none were left.
    pub fn decrease_extra_lives(&mut self) -> bool {
        match self.state.extra_lives.checked_sub(1) {
            Some(left) => {
                self.state.extra_lives = left;
                true
            }
            None => false,
        }
    }

    pub fn set_new_highscore(&mut self, new_highscore: bool) {
        self.state.new_highscore = new_highscore;
    }

    pub fn is_new_highscore(&self) -> bool {
        self.state.new_highscore
    }

    // -- save / restore -----------------------------------------------------

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    /// Replace the run state. The level bounds must match.
    pub fn restore_state(&mut self, state: ScoreState) -> Result<(), EngineError> {
        if state.coord_start != self.state.coord_start || state.coord_end != self.state.coord_end {
            return Err(EngineError::InvalidLevelBounds {
                start: state.coord_start,
                end: state.coord_end,
            });
        }
        self.state = state;
        Ok(())
    }

    /// Stop listening for health changes.
    pub fn dispose(self, bus: &mut EventBus) {
        bus.unsubscribe(self.subscription);
    }
}

/// `1234567` → `"1,234,567"`.
pub fn format_score(score: i64) -> String {
    let digits = score.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if score < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
