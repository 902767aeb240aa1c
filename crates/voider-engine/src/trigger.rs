//! Delay-scheduled activation and deactivation of actors.
//!
//! The [`TriggerRegistry`] owns every trigger and every binding between a
//! trigger and a listener actor. Actors do not keep their own binding lists;
//! both "which actors listen to this trigger" and "which triggers does this
//! actor listen to" are queries over the same binding table, so the two views
//! cannot disagree.
//!
//! A trigger records the game time at which its condition first held. From
//! then on, each binding is dispatched once `delay` seconds have elapsed and is
//! consumed by the dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use voider_actors::prelude::{ActorId, ActorStore, SimContext};

use crate::EngineError;

/// Slack for comparing accumulated delays against tick-quantised game time.
pub const TIME_EPSILON: f32 = 1e-4;

// ---------------------------------------------------------------------------
// Identifiers and sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BindingId(pub u32);

/// Condition that fires a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TriggerSource {
    /// The level's scroll coordinate reached `x`.
    ScreenAt { x: f32 },
    /// `actor` is active.
    ActorActivated { actor: ActorId },
}

impl TriggerSource {
    pub fn is_actor_activated(&self) -> bool {
        matches!(self, TriggerSource::ActorActivated { .. })
    }
}

/// What a binding does to its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerAction {
    Activate,
    Deactivate,
}

/// One registered trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub source: TriggerSource,
    /// Created by default synthesis rather than authored.
    pub hidden: bool,
    pub triggered_at: Option<f32>,
}

/// A listener waiting on a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerBinding {
    pub id: BindingId,
    pub trigger: TriggerId,
    pub listener: ActorId,
    pub action: TriggerAction,
    /// Seconds between the trigger firing and the action.
    pub delay: f32,
}

// ---------------------------------------------------------------------------
// TriggerRegistry
// ---------------------------------------------------------------------------

/// Single owner of triggers and their bindings.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: BTreeMap<TriggerId, Trigger>,
    /// Binding order is dispatch order.
    bindings: Vec<TriggerBinding>,
    next_trigger: u32,
    next_binding: u32,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trigger(&mut self, source: TriggerSource, hidden: bool) -> TriggerId {
        let id = TriggerId(self.next_trigger);
        self.next_trigger += 1;
        self.triggers.insert(
            id,
            Trigger {
                source,
                hidden,
                triggered_at: None,
            },
        );
        id
    }

    /// Remove a trigger together with all of its bindings.
    pub fn remove_trigger(&mut self, trigger: TriggerId) -> Option<Trigger> {
        self.bindings.retain(|b| b.trigger != trigger);
        self.triggers.remove(&trigger)
    }

    pub fn trigger(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.get(&id)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Bind `listener` to `trigger`.
    pub fn bind(
        &mut self,
        trigger: TriggerId,
        listener: ActorId,
        action: TriggerAction,
        delay: f32,
    ) -> Result<BindingId, EngineError> {
        if !self.triggers.contains_key(&trigger) {
            warn!(trigger = trigger.0, %listener, "bind to unknown trigger");
            return Err(EngineError::UnknownTrigger { trigger });
        }
        let id = BindingId(self.next_binding);
        self.next_binding += 1;
        self.bindings.push(TriggerBinding {
            id,
            trigger,
            listener,
            action,
            delay,
        });
        Ok(id)
    }

    pub fn unbind(&mut self, binding: BindingId) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.id != binding);
        before != self.bindings.len()
    }

    /// Drop every binding of an actor that is leaving the level, and every
    /// trigger sourced from it. Returns the number of bindings removed.
    pub fn unbind_actor(&mut self, actor: ActorId) -> usize {
        let sourced: Vec<TriggerId> = self
            .triggers
            .iter()
            .filter(|(_, t)| t.source == TriggerSource::ActorActivated { actor })
            .map(|(&id, _)| id)
            .collect();
        let before = self.bindings.len();
        self.bindings
            .retain(|b| b.listener != actor && !sourced.contains(&b.trigger));
        for id in sourced {
            self.triggers.remove(&id);
        }
        before - self.bindings.len()
    }

    /// Bindings of one actor, in binding order.
    pub fn bindings_for(&self, actor: ActorId) -> impl Iterator<Item = &TriggerBinding> + '_ {
        self.bindings.iter().filter(move |b| b.listener == actor)
    }

    /// Listeners of one trigger, in binding order.
    pub fn listeners(&self, trigger: TriggerId) -> Vec<ActorId> {
        self.bindings
            .iter()
            .filter(|b| b.trigger == trigger)
            .map(|b| b.listener)
            .collect()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Fire triggers whose condition holds and dispatch due bindings.
    ///
    /// Returns the dispatched bindings in dispatch order.
    pub fn update(&mut self, store: &mut ActorStore, ctx: &mut SimContext<'_>) -> Vec<TriggerBinding> {
        let now = ctx.now;
        for (id, trigger) in self.triggers.iter_mut() {
            if trigger.triggered_at.is_some() {
                continue;
            }
            let fired = match trigger.source {
                TriggerSource::ScreenAt { x } => ctx.level.x_coord >= x,
                TriggerSource::ActorActivated { actor } => {
                    store.get(actor).is_some_and(|a| a.is_active())
                }
            };
            if fired {
                trigger.triggered_at = Some(now);
                debug!(trigger = id.0, time = now, "trigger fired");
            }
        }

        let triggers = &self.triggers;
        let mut due = Vec::new();
        self.bindings.retain(|binding| {
            let ready = triggers
                .get(&binding.trigger)
                .and_then(|t| t.triggered_at)
                .is_some_and(|at| now + TIME_EPSILON >= at + binding.delay);
            if ready {
                due.push(*binding);
            }
            !ready
        });

        for binding in &due {
            let Some(actor) = store.get_mut(binding.listener) else {
                continue;
            };
            match binding.action {
                TriggerAction::Activate => {
                    if let Err(err) = actor.activate(ctx) {
                        error!(actor = %binding.listener, %err, "triggered activation failed");
                    }
                }
                TriggerAction::Deactivate => actor.deactivate(ctx),
            }
        }
        due
    }
}
