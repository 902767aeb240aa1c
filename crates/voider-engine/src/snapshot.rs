//! Run save and restore with BLAKE3 hashing.
//!
//! [`RunSnapshot`] is an explicit schema: the tick counter, the run outcome,
//! the player stats and one record per actor. It carries a BLAKE3 digest of
//! its canonical JSON form, which restore verifies before touching anything.
//!
//! ```
//! use voider_engine::prelude::*;
//! use glam::Vec2;
//!
//! let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 2.0))).unwrap();
//! sim.spawn_player(ActorDefinition::named("ship").shared(), Vec2::ZERO).unwrap();
//! sim.run_ticks(30).unwrap();
//!
//! let snapshot = sim.capture_snapshot().unwrap();
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! sim.run_ticks(30).unwrap();
//! sim.restore_from_snapshot(&snapshot).unwrap();
//! assert_eq!(sim.tick_count(), 30);
//! assert_eq!(sim.state_hash().unwrap(), snapshot.hash);
//! ```
//!
//! # What Is NOT Serialized
//!
//! - **Definitions** are shared immutable data; actors keep the ones they have.
//! - **Physics internals** (rapier sets). Bodies are recreated or moved from
//!   the restored actor state.
//! - **Triggers, groups and weapons** are level setup and stay as they are.
//! - **The scroll feed** belongs to the level driver.

use std::collections::BTreeSet;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use voider_actors::prelude::{ActorId, ActorState};

use crate::score::ScoreState;
use crate::tick::{Outcome, Simulation};

// ---------------------------------------------------------------------------
// RunSnapshot
// ---------------------------------------------------------------------------

/// Saved state of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: ActorId,
    pub state: ActorState,
}

/// A serializable snapshot of a level run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub tick_counter: u64,
    pub fixed_dt: f32,
    pub outcome: Outcome,
    pub stats: ScoreState,
    /// In ascending id order.
    pub actors: Vec<ActorRecord>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of everything above.
    pub hash: String,
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HashableState<'a> {
    tick_counter: u64,
    fixed_dt: f32,
    outcome: Outcome,
    stats: &'a ScoreState,
    actors: &'a [ActorRecord],
}

fn compute_hash(state: &HashableState<'_>) -> anyhow::Result<String> {
    let json_bytes = serde_json::to_vec(state).context("run state is not JSON-serializable")?;
    Ok(blake3::hash(&json_bytes).to_hex().to_string())
}

impl RunSnapshot {
    fn hashable(&self) -> HashableState<'_> {
        HashableState {
            tick_counter: self.tick_counter,
            fixed_dt: self.fixed_dt,
            outcome: self.outcome,
            stats: &self.stats,
            actors: &self.actors,
        }
    }

    /// Recompute the digest and compare it with the recorded one.
    pub fn verify(&self) -> anyhow::Result<()> {
        let expected = compute_hash(&self.hashable())?;
        if expected != self.hash {
            return Err(anyhow!(
                "snapshot hash mismatch: recorded {} but recomputed {}. \
                 The snapshot may be corrupted or tampered with.",
                self.hash,
                expected
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("failed to serialize run snapshot")
    }

    /// Parse and verify a snapshot.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: RunSnapshot = serde_json::from_str(json).context("invalid run snapshot JSON")?;
        snapshot.verify()?;
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Simulation snapshot/restore methods
// ---------------------------------------------------------------------------

impl Simulation {
    fn actor_records(&self) -> Vec<ActorRecord> {
        self.store()
            .iter()
            .map(|actor| ActorRecord {
                id: actor.id(),
                state: actor.state(),
            })
            .collect()
    }

    /// Capture the run state.
    pub fn capture_snapshot(&self) -> anyhow::Result<RunSnapshot> {
        let mut snapshot = RunSnapshot {
            tick_counter: self.tick_count(),
            fixed_dt: self.config().fixed_dt,
            outcome: self.outcome(),
            stats: self.stats().state().clone(),
            actors: self.actor_records(),
            hash: String::new(),
        };
        snapshot.hash = compute_hash(&snapshot.hashable())?;
        Ok(snapshot)
    }

    /// BLAKE3 digest of the current run state.
    pub fn state_hash(&self) -> anyhow::Result<String> {
        Ok(self.capture_snapshot()?.hash)
    }

    /// Restore a previously captured run state.
    ///
    /// The hash is verified and every recorded actor must still exist before
    /// anything is modified. Actors spawned after the capture leave the run.
    pub fn restore_from_snapshot(&mut self, snapshot: &RunSnapshot) -> anyhow::Result<()> {
        snapshot.verify()?;
        if snapshot.fixed_dt != self.config().fixed_dt {
            return Err(anyhow!(
                "snapshot fixed_dt {} does not match the running {}",
                snapshot.fixed_dt,
                self.config().fixed_dt
            ));
        }
        if let Some(missing) = snapshot.actors.iter().find(|r| !self.store().contains(r.id)) {
            return Err(anyhow!("snapshot references actor {} which no longer exists", missing.id));
        }

        self.stats_mut()
            .restore_state(snapshot.stats.clone())
            .context("failed to restore player stats")?;
        let recorded: BTreeSet<ActorId> = snapshot.actors.iter().map(|r| r.id).collect();
        let newer: Vec<ActorId> = self
            .store()
            .ids()
            .into_iter()
            .filter(|id| !recorded.contains(id))
            .collect();
        for id in newer {
            self.remove_actor(id)
                .with_context(|| format!("failed to drop actor {id} spawned after the snapshot"))?;
        }

        self.set_tick_counter(snapshot.tick_counter);
        self.set_outcome(snapshot.outcome);
        for record in &snapshot.actors {
            self.restore_actor(record.id, &record.state)
                .with_context(|| format!("failed to restore actor {}", record.id))?;
        }
        Ok(())
    }
}
