//! Level progress and level setup.

use std::collections::BTreeMap;

use tracing::debug;
use voider_actors::prelude::{ActorId, ActorStore, GroupId, LevelView, MovementKind};

use crate::config::EnemyConfig;
use crate::group::EnemyGroup;
use crate::trigger::{TriggerAction, TriggerBinding, TriggerRegistry, TriggerSource};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Scroll feed
// ---------------------------------------------------------------------------

/// The driver that scrolls the level.
pub trait ScrollFeed: Send {
    /// Current scroll coordinate.
    fn x_coord(&self) -> f32;
    /// Scroll speed in units per second.
    fn speed(&self) -> f32;
    fn start_coord(&self) -> f32;
    fn end_coord(&self) -> f32;
    fn advance(&mut self, dt: f32);
    fn is_completed(&self) -> bool;

    fn view(&self) -> LevelView {
        LevelView {
            x_coord: self.x_coord(),
            speed: self.speed(),
        }
    }

    /// Seconds an uninterrupted run takes.
    fn length_seconds(&self) -> f32 {
        let speed = self.speed();
        if speed > 0.0 {
            (self.end_coord() - self.start_coord()) / speed
        } else {
            0.0
        }
    }
}

/// Constant-speed scrolling from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearScroll {
    start: f32,
    end: f32,
    speed: f32,
    x: f32,
}

impl LinearScroll {
    pub fn new(start: f32, end: f32, speed: f32) -> Self {
        Self {
            start,
            end,
            speed,
            x: start,
        }
    }

    pub fn set_x_coord(&mut self, x: f32) {
        self.x = x.clamp(self.start, self.end);
    }
}

impl ScrollFeed for LinearScroll {
    fn x_coord(&self) -> f32 {
        self.x
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn start_coord(&self) -> f32 {
        self.start
    }

    fn end_coord(&self) -> f32 {
        self.end
    }

    fn advance(&mut self, dt: f32) {
        self.x = (self.x + self.speed * dt).min(self.end);
    }

    fn is_completed(&self) -> bool {
        self.x >= self.end
    }
}

// ---------------------------------------------------------------------------
// Default triggers
// ---------------------------------------------------------------------------

/// Give every enemy without an activate binding a default one, and every AI
/// enemy without a deactivate binding a default one.
///
/// Followers reuse their leader's authored trigger, delayed by their place in
/// spawn order. Everyone else gets a hidden screen trigger at their default
/// activate position, and AI enemies deactivate a fixed time after they
/// activated. Returns the number of bindings created.
pub fn create_default_triggers(
    store: &ActorStore,
    groups: &BTreeMap<GroupId, EnemyGroup>,
    registry: &mut TriggerRegistry,
    level_speed: f32,
    config: &EnemyConfig,
) -> Result<usize, EngineError> {
    // Snapshot authored leader bindings before adding any defaults.
    let authored: BTreeMap<GroupId, (Option<TriggerBinding>, Option<TriggerBinding>)> = groups
        .iter()
        .map(|(&id, g)| (id, (g.spawn_trigger(registry), g.deactivate_trigger(registry))))
        .collect();

    let mut created = 0;
    for actor in store.iter() {
        let Some(state) = actor.kind().enemy() else {
            continue;
        };
        let id = actor.id();
        let group = state.group.and_then(|g| groups.get(&g));
        let follower = group.and_then(|g| follower_info(g, id));
        let leader_bindings = state.group.and_then(|g| authored.get(&g));

        if !has_binding(registry, id, TriggerAction::Activate) {
            let inherited = follower.zip(leader_bindings.and_then(|(spawn, _)| *spawn));
            match inherited {
                Some(((index, spawn_delay), spawn)) => {
                    let delay = spawn.delay + spawn_delay * (index - 1) as f32;
                    registry.bind(spawn.trigger, id, TriggerAction::Activate, delay)?;
                }
                None => {
                    let x = match group {
                        Some(g) => g.default_activate_position(id, level_speed, store),
                        None => None,
                    }
                    .unwrap_or_else(|| actor.position().x - actor.def().half_width());
                    let trigger = registry.add_trigger(TriggerSource::ScreenAt { x }, true);
                    registry.bind(trigger, id, TriggerAction::Activate, 0.0)?;
                }
            }
            created += 1;
        }

        if state.movement == MovementKind::Ai && !has_binding(registry, id, TriggerAction::Deactivate) {
            let inherited = follower.zip(leader_bindings.and_then(|(_, deactivate)| *deactivate));
            match inherited {
                Some(((index, spawn_delay), deactivate)) => {
                    let delay = deactivate.delay + spawn_delay * (index - 1) as f32;
                    registry.bind(deactivate.trigger, id, TriggerAction::Deactivate, delay)?;
                }
                None => {
                    let trigger = registry.add_trigger(TriggerSource::ActorActivated { actor: id }, true);
                    registry.bind(trigger, id, TriggerAction::Deactivate, config.deactivate_time_default)?;
                }
            }
            created += 1;
        }
    }
    debug!(created, "default triggers created");
    Ok(created)
}

fn has_binding(registry: &TriggerRegistry, actor: ActorId, action: TriggerAction) -> bool {
    registry.bindings_for(actor).any(|b| b.action == action)
}

/// Spawn index and group delay of a non-leader member.
fn follower_info(group: &EnemyGroup, enemy: ActorId) -> Option<(usize, f32)> {
    let index = group.enemy_spawn_index(enemy)?;
    (index > 1).then_some((index, group.spawn_delay()))
}
