//! Enemy groups: one leader plus identical followers that spawn in a row.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use voider_actors::prelude::{ActorId, ActorStore, GroupId, SimContext};

use crate::trigger::{TriggerAction, TriggerBinding, TriggerRegistry};
use crate::EngineError;

/// An ordered group of enemies. Index 0 is the leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyGroup {
    id: GroupId,
    enemies: Vec<ActorId>,
    /// Seconds between two members' activations.
    spawn_delay: f32,
}

impl EnemyGroup {
    pub fn new(id: GroupId, spawn_delay: f32) -> Self {
        Self {
            id,
            enemies: Vec::new(),
            spawn_delay,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn enemies(&self) -> &[ActorId] {
        &self.enemies
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn leader(&self) -> Option<ActorId> {
        self.enemies.first().copied()
    }

    pub fn spawn_delay(&self) -> f32 {
        self.spawn_delay
    }

    pub fn set_spawn_delay(&mut self, delay: f32) {
        self.spawn_delay = delay;
    }

    /// Make `enemy` the leader of this empty group.
    pub fn set_leader(&mut self, enemy: ActorId, store: &mut ActorStore) -> Result<(), EngineError> {
        if !self.enemies.is_empty() {
            warn!(group = self.id.0, "set_leader on a non-empty group");
            return Err(EngineError::GroupNotEmpty { group: self.id });
        }
        let state = store
            .require_mut(enemy)?
            .enemy_mut()
            .ok_or(EngineError::NotAnEnemy { actor: enemy })?;
        state.group = Some(self.id);
        state.is_leader = true;
        self.enemies.push(enemy);
        Ok(())
    }

    /// Grow or shrink the group to `count` members.
    ///
    /// Shrinking detaches members from the end, highest index first; they stay
    /// in the store. Growing spawns inactive, bodiless copies of the leader.
    /// Does nothing when `count` is zero or the group has no leader.
    pub fn set_enemy_count(
        &mut self,
        count: usize,
        store: &mut ActorStore,
        mut added: Option<&mut Vec<ActorId>>,
        mut removed: Option<&mut Vec<ActorId>>,
    ) -> Result<(), EngineError> {
        let Some(leader) = self.leader() else {
            return Ok(());
        };
        if count < 1 {
            return Ok(());
        }

        while self.enemies.len() > count {
            let Some(enemy) = self.enemies.pop() else {
                break;
            };
            if let Some(state) = store.get_mut(enemy).and_then(|a| a.enemy_mut()) {
                state.group = None;
            }
            if let Some(out) = removed.as_deref_mut() {
                out.push(enemy);
            }
        }

        while self.enemies.len() < count {
            let copy = store.spawn_copy(leader)?;
            self.enemies.push(copy);
            if let Some(out) = added.as_deref_mut() {
                out.push(copy);
            }
        }
        debug!(group = self.id.0, count, "enemy count set");
        Ok(())
    }

    /// Detach every member. Returns the followers; the leader is not included.
    pub fn clear(&mut self, store: &mut ActorStore) -> Vec<ActorId> {
        for &enemy in &self.enemies {
            if let Some(state) = store.get_mut(enemy).and_then(|a| a.enemy_mut()) {
                state.group = None;
                state.is_leader = false;
            }
        }
        let mut members = std::mem::take(&mut self.enemies);
        if !members.is_empty() {
            members.remove(0);
        }
        members
    }

    /// Forget a member that left the level. Returns `false` if it was not in
    /// the group.
    pub fn remove_enemy(&mut self, enemy: ActorId) -> bool {
        match self.enemies.iter().position(|&e| e == enemy) {
            Some(index) => {
                self.enemies.remove(index);
                true
            }
            None => false,
        }
    }

    /// 1-based position of `enemy` in spawn order.
    pub fn enemy_spawn_index(&self, enemy: ActorId) -> Option<usize> {
        self.enemies.iter().position(|&e| e == enemy).map(|i| i + 1)
    }

    /// Move every follower onto the leader's position.
    pub fn set_leader_position(&self, position: Vec2, store: &mut ActorStore, ctx: &mut SimContext<'_>) {
        for &follower in self.enemies.iter().skip(1) {
            if let Some(actor) = store.get_mut(follower) {
                actor.set_position(position, ctx);
            }
        }
    }

    /// The leader's authored activate binding.
    pub fn spawn_trigger(&self, registry: &TriggerRegistry) -> Option<TriggerBinding> {
        self.leader_binding(registry, TriggerAction::Activate)
    }

    /// The leader's authored deactivate binding.
    pub fn deactivate_trigger(&self, registry: &TriggerRegistry) -> Option<TriggerBinding> {
        self.leader_binding(registry, TriggerAction::Deactivate)
    }

    fn leader_binding(&self, registry: &TriggerRegistry, action: TriggerAction) -> Option<TriggerBinding> {
        let leader = self.leader()?;
        registry
            .bindings_for(leader)
            .find(|b| b.action == action)
            .filter(|b| {
                registry
                    .trigger(b.trigger)
                    .is_some_and(|t| !t.source.is_actor_activated())
            })
            .copied()
    }

    /// Scroll coordinate at which `enemy` should activate when no trigger was
    /// authored: its left edge, pulled back so members appear one spawn delay
    /// apart.
    pub fn default_activate_position(&self, enemy: ActorId, level_speed: f32, store: &ActorStore) -> Option<f32> {
        let actor = store.get(enemy)?;
        let left = actor.position().x - actor.def().half_width();
        let Some(index) = self.enemy_spawn_index(enemy) else {
            return Some(left);
        };
        let behind = (self.enemies.len() - index) as f32;
        Some(left - behind * level_speed * self.spawn_delay)
    }
}
