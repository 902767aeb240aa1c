//! Tunable game constants.
//!
//! [`GameConfig`] groups every number the simulation is tuned with. It is
//! loaded from JSON; any missing key falls back to its default, so an empty
//! object `{}` is a valid configuration.
//!
//! ```
//! use voider_engine::config::GameConfig;
//!
//! let config = GameConfig::from_json_str(r#"{ "score": { "starting_lives": 5 } }"#).unwrap();
//! assert_eq!(config.score.starting_lives, 5);
//! assert_eq!(config.bullets.max_bullets, 1000);
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::EngineError;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Bullet pool and culling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletConfig {
    /// Seconds between two out-of-bounds checks of the same bullet.
    pub check_out_of_bounds_time: f32,
    /// Capacity of the bullet pool.
    pub max_bullets: usize,
    /// Bullets are kept while inside the view scaled by this factor.
    pub view_scale: f32,
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            check_out_of_bounds_time: 1.0,
            max_bullets: 1000,
            view_scale: 3.0,
        }
    }
}

/// Score and multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub score_max: f64,
    /// Factor applied to the multiplier on each counted hit.
    pub multiplier_decrement: f64,
    /// Seconds after a counted hit during which further hits are ignored.
    pub multiplier_collision_cooldown: f32,
    /// Lives at the start of a run, including the one being played.
    pub starting_lives: u32,
}

impl ScoreConfig {
    /// Multiplier reached after an undamaged run: the positive root of
    /// `m * (m + 1) / 2 = score_max`.
    pub fn multiplier_max(&self) -> f64 {
        -0.5 + (0.25 + 2.0 * self.score_max).sqrt()
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            score_max: 10_000_000.0,
            multiplier_decrement: 0.8,
            multiplier_collision_cooldown: 1.0,
            starting_lives: 3,
        }
    }
}

/// Player ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub invulnerable_time_on_ship_lost: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            invulnerable_time_on_ship_lost: 3.0,
        }
    }
}

/// Enemy trigger defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Delay between two group members' activations.
    pub spawn_delay_default: f32,
    /// Seconds an AI enemy lives before its default deactivation.
    pub deactivate_time_default: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            spawn_delay_default: 2.0,
            deactivate_time_default: 20.0,
        }
    }
}

/// Weapon randomness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub rng_seed: u64,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self { rng_seed: 0x5EED }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// All simulation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f32,
    pub bullets: BulletConfig,
    pub score: ScoreConfig,
    pub player: PlayerConfig,
    pub enemy: EnemyConfig,
    pub weapon: WeaponConfig,
}

impl Default for GameConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            bullets: BulletConfig::default(),
            score: ScoreConfig::default(),
            player: PlayerConfig::default(),
            enemy: EnemyConfig::default(),
            weapon: WeaponConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: GameConfig = serde_json::from_str(json).context("invalid game config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read game config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fixed_dt > 0.0 && self.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "fixed_dt must be positive and finite, got {}",
                self.fixed_dt
            )));
        }
        if self.bullets.max_bullets == 0 {
            return Err(EngineError::InvalidConfig(
                "bullets.max_bullets must be at least 1".to_owned(),
            ));
        }
        let decrement = self.score.multiplier_decrement;
        if !(decrement > 0.0 && decrement <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "score.multiplier_decrement must be in (0, 1], got {decrement}"
            )));
        }
        if self.score.score_max <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "score.score_max must be positive, got {}",
                self.score.score_max
            )));
        }
        Ok(())
    }
}
