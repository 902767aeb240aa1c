//! Fixed-timestep driver for one level run.
//!
//! [`Simulation`] owns every piece of a run and advances them in a fixed order.
//! Each [`tick`](Simulation::tick):
//!
//! 1. Applies responses that arrived in the [`ResponseInbox`].
//! 2. Advances the level scroll.
//! 3. Steps physics, resolves the reported contacts and removes collected
//!    pickups.
//! 4. Fires triggers and dispatches due bindings.
//! 5. Updates every non-bullet actor.
//! 6. Updates bullets and culls them against the view.
//! 7. Updates mounted weapons, which may fire.
//! 8. Feeds hits to the player stats.
//! 9. Spends an extra life or ends the run if the ship was lost.
//! 10. Ends the run when the level scrolled to its end.
//! 11. Updates the score if the run is still going.
//!
//! Game time is `tick_count * fixed_dt`, never an accumulated sum, and the
//! only randomness is a seeded PCG owned by the simulation, so the same setup
//! always plays out the same way.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use voider_actors::prelude::{
    ActorId, ActorKind, ActorState, ActorStore, DefinitionRef, EnemyState, EventBus,
    GroupId, PlayerState, SimContext,
};

use crate::bullets::{BulletDestroyer, ViewBox};
use crate::collision::CollisionResolver;
use crate::config::GameConfig;
use crate::group::EnemyGroup;
use crate::inbox::{ExternalResponse, ResponseInbox};
use crate::level::{create_default_triggers, ScrollFeed};
use crate::physics::PhysicsWorld;
use crate::score::{PlayerStats, ScoreState};
use crate::trigger::TriggerRegistry;
use crate::weapon::{Aim, MountedWeapon, Weapon, WeaponDefinition};
use crate::EngineError;

/// World size of the camera view; its right edge follows the scroll coordinate.
const DEFAULT_VIEW_SIZE: Vec2 = Vec2::new(20.0, 12.0);

// ---------------------------------------------------------------------------
// Outcome / TickReport
// ---------------------------------------------------------------------------

/// State of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Running,
    LevelCompleted,
    PlayerDied,
}

impl Outcome {
    pub fn is_finished(&self) -> bool {
        *self != Outcome::Running
    }
}

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub time: f32,
    pub responses: usize,
    pub contacts: usize,
    /// Pickups collected this tick. They are no longer in the store.
    pub pickups_collected: Vec<ActorId>,
    pub triggers_dispatched: usize,
    pub bullets_culled: usize,
    pub shots: Vec<ActorId>,
    /// Weapons that could not fire. The tick itself still completed.
    pub weapon_errors: Vec<EngineError>,
    pub hits_counted: usize,
    pub ship_lost: bool,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// One level run.
pub struct Simulation {
    config: GameConfig,
    physics: PhysicsWorld,
    store: ActorStore,
    events: EventBus,
    triggers: TriggerRegistry,
    groups: BTreeMap<GroupId, EnemyGroup>,
    weapons: Vec<MountedWeapon>,
    bullets: BulletDestroyer,
    resolver: CollisionResolver,
    stats: PlayerStats,
    scroll: Box<dyn ScrollFeed>,
    inbox: Option<ResponseInbox>,
    rng: Pcg32,
    player: Option<ActorId>,
    view_size: Vec2,
    tick_counter: u64,
    outcome: Outcome,
    started: bool,
    next_group: u32,
}

impl Simulation {
    /// Set up a run over the level described by `scroll`.
    pub fn new(config: GameConfig, scroll: Box<dyn ScrollFeed>) -> Result<Self, EngineError> {
        config.validate()?;
        let mut events = EventBus::new();
        let stats = PlayerStats::new(
            scroll.start_coord(),
            scroll.end_coord(),
            scroll.length_seconds(),
            &config.score,
            &mut events,
        )?;
        Ok(Self {
            physics: PhysicsWorld::new(),
            store: ActorStore::new(),
            events,
            triggers: TriggerRegistry::new(),
            groups: BTreeMap::new(),
            weapons: Vec::new(),
            bullets: BulletDestroyer::new(&config.bullets),
            resolver: CollisionResolver::new(),
            stats,
            scroll,
            inbox: None,
            rng: Pcg32::seed_from_u64(config.weapon.rng_seed),
            player: None,
            view_size: DEFAULT_VIEW_SIZE,
            tick_counter: 0,
            outcome: Outcome::Running,
            started: false,
            next_group: 0,
            config,
        })
    }

    // -- level setup --------------------------------------------------------

    /// Spawn and activate the player ship.
    pub fn spawn_player(&mut self, def: DefinitionRef, position: Vec2) -> Result<ActorId, EngineError> {
        if let Some(old) = self.player {
            warn!(%old, "replacing player ship");
        }
        let kind = ActorKind::Player(PlayerState::new(self.config.player.invulnerable_time_on_ship_lost));
        let id = self.store.spawn(def, kind, position);
        self.player = Some(id);
        self.activate_actor(id)?;
        Ok(id)
    }

    /// Spawn an inactive enemy. It activates through its triggers.
    pub fn spawn_enemy(&mut self, def: DefinitionRef, state: EnemyState, position: Vec2) -> ActorId {
        self.store.spawn(def, ActorKind::Enemy(state), position)
    }

    /// Spawn an inactive actor of any kind.
    pub fn spawn_actor(&mut self, def: DefinitionRef, kind: ActorKind, position: Vec2) -> ActorId {
        self.store.spawn(def, kind, position)
    }

    pub fn activate_actor(&mut self, id: ActorId) -> Result<(), EngineError> {
        let now = self.sim_time();
        let level = self.scroll.view();
        let actor = self.store.get_mut(id).ok_or(EngineError::UnknownActor { actor: id })?;
        let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now)
            .with_level(level)
            .with_player(self.player);
        actor.activate(&mut ctx)?;
        Ok(())
    }

    /// Remove an actor from the run together with its bindings, group
    /// membership and weapons.
    pub fn remove_actor(&mut self, id: ActorId) -> Result<(), EngineError> {
        if !self.store.contains(id) {
            return Err(EngineError::UnknownActor { actor: id });
        }
        self.triggers.unbind_actor(id);
        for group in self.groups.values_mut() {
            group.remove_enemy(id);
        }
        self.weapons.retain(|w| w.owner != id);
        if self.player == Some(id) {
            self.player = None;
        }
        let now = self.sim_time();
        let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now);
        self.store.remove(id, &mut ctx);
        Ok(())
    }

    /// Start a group led by `leader`. Uses the configured default spawn delay
    /// when `spawn_delay` is `None`.
    pub fn create_group(&mut self, leader: ActorId, spawn_delay: Option<f32>) -> Result<GroupId, EngineError> {
        let id = GroupId(self.next_group);
        let delay = spawn_delay.unwrap_or(self.config.enemy.spawn_delay_default);
        let mut group = EnemyGroup::new(id, delay);
        group.set_leader(leader, &mut self.store)?;
        self.next_group += 1;
        self.groups.insert(id, group);
        Ok(id)
    }

    /// Resize a group. Dropped followers leave the run. Returns the added
    /// followers.
    pub fn set_group_enemy_count(&mut self, group: GroupId, count: usize) -> Result<Vec<ActorId>, EngineError> {
        let entry = self
            .groups
            .get_mut(&group)
            .ok_or(EngineError::UnknownGroup { group })?;
        let mut added = Vec::new();
        let mut removed = Vec::new();
        entry.set_enemy_count(count, &mut self.store, Some(&mut added), Some(&mut removed))?;
        for id in removed {
            self.remove_actor(id)?;
        }
        Ok(added)
    }

    /// Move a group's followers onto its leader position.
    pub fn set_group_position(&mut self, group: GroupId, position: Vec2) -> Result<(), EngineError> {
        let now = self.sim_time();
        let entry = self.groups.get(&group).ok_or(EngineError::UnknownGroup { group })?;
        let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now);
        entry.set_leader_position(position, &mut self.store, &mut ctx);
        Ok(())
    }

    pub fn group(&self, group: GroupId) -> Option<&EnemyGroup> {
        self.groups.get(&group)
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerRegistry {
        &mut self.triggers
    }

    /// Mount a weapon on `owner`.
    pub fn arm(&mut self, owner: ActorId, def: WeaponDefinition, aim: Aim, offset: Vec2) -> Result<(), EngineError> {
        if !self.store.contains(owner) {
            return Err(EngineError::UnknownActor { actor: owner });
        }
        self.weapons
            .push(MountedWeapon::new(owner, Weapon::new(def), aim).with_offset(offset));
        Ok(())
    }

    /// Hold or release the trigger of every weapon mounted on `owner`.
    pub fn set_firing(&mut self, owner: ActorId, firing: bool) {
        for mounted in self.weapons.iter_mut().filter(|w| w.owner == owner) {
            mounted.firing = firing;
        }
    }

    pub fn attach_inbox(&mut self, inbox: ResponseInbox) {
        self.inbox = Some(inbox);
    }

    pub fn set_view_size(&mut self, size: Vec2) {
        self.view_size = size;
    }

    /// The camera view: its right edge is the scroll coordinate.
    pub fn view_box(&self) -> ViewBox {
        let x = self.scroll.x_coord();
        let half_height = self.view_size.y * 0.5;
        ViewBox::new(
            Vec2::new(x - self.view_size.x, -half_height),
            Vec2::new(x, half_height),
        )
    }

    /// Create default triggers. Called by the first tick if not called before.
    pub fn start_run(&mut self) -> Result<usize, EngineError> {
        if self.started {
            warn!("run already started");
            return Ok(0);
        }
        let created = create_default_triggers(
            &self.store,
            &self.groups,
            &mut self.triggers,
            self.scroll.speed(),
            &self.config.enemy,
        )?;
        self.started = true;
        info!(actors = self.store.len(), triggers = self.triggers.trigger_count(), "run started");
        Ok(created)
    }

    // -- tick ---------------------------------------------------------------

    /// Advance the run by one fixed step. A finished run does not advance.
    pub fn tick(&mut self) -> Result<TickReport, EngineError> {
        if !self.started {
            self.start_run()?;
        }
        let mut report = TickReport {
            tick: self.tick_counter,
            time: self.sim_time(),
            outcome: self.outcome,
            ..TickReport::default()
        };
        if self.outcome.is_finished() {
            return Ok(report);
        }

        let dt = self.config.fixed_dt;
        self.tick_counter += 1;
        let now = self.sim_time();
        report.tick = self.tick_counter;
        report.time = now;

        report.responses = self.apply_responses();

        self.scroll.advance(dt);
        let level = self.scroll.view();
        let view = self.view_box();

        let contacts = self.physics.step(dt);
        report.contacts = contacts.len();
        let collected = {
            let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now)
                .with_level(level)
                .with_player(self.player);
            self.resolver.resolve(&contacts, &mut self.store, &mut ctx)
        };
        for pickup in &collected {
            self.remove_actor(*pickup)?;
        }
        report.pickups_collected = collected;

        {
            let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now)
                .with_level(level)
                .with_player(self.player);
            report.triggers_dispatched = self.triggers.update(&mut self.store, &mut ctx).len();

            for id in self.store.ids() {
                if self.store.get(id).is_some_and(|a| !a.kind().is_bullet()) {
                    self.store.update_actor(id, dt, &mut ctx);
                }
            }

            self.bullets.update(&mut self.store, dt, &mut ctx);
            report.bullets_culled = self.bullets.remove_out_of_bounds(view, &mut self.store, &mut ctx);

            let store = &self.store;
            self.weapons.retain(|w| store.contains(w.owner));
            for mounted in &mut self.weapons {
                match mounted.update(dt, &mut self.store, &mut self.bullets, &mut self.rng, &mut ctx) {
                    Ok(Some(bullet)) => report.shots.push(bullet),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(owner = %mounted.owner, %err, "weapon failed to fire");
                        report.weapon_errors.push(err);
                    }
                }
            }
        }

        report.hits_counted = self.stats.process_events(&mut self.events);
        report.ship_lost = self.check_player_lives(now);
        if !self.outcome.is_finished() && self.scroll.is_completed() {
            self.finish(Outcome::LevelCompleted);
        }
        // A finished run already holds its end score.
        if !self.outcome.is_finished() {
            self.stats.update_score(self.scroll.x_coord());
        }

        report.outcome = self.outcome;
        Ok(report)
    }

    /// Tick until the run finishes or `max_ticks` have run.
    pub fn run_ticks(&mut self, max_ticks: u64) -> Result<Outcome, EngineError> {
        for _ in 0..max_ticks {
            if self.tick()?.outcome.is_finished() {
                break;
            }
        }
        Ok(self.outcome)
    }

    fn apply_responses(&mut self) -> usize {
        let Some(inbox) = &self.inbox else {
            return 0;
        };
        let responses = inbox.drain();
        for response in &responses {
            match response {
                ExternalResponse::HighscoreChecked { new_highscore } => {
                    self.stats.set_new_highscore(*new_highscore);
                    info!(new_highscore, "highscore checked");
                }
                ExternalResponse::SyncFailed { reason } => {
                    warn!(%reason, "score sync failed");
                }
            }
        }
        responses.len()
    }

    /// Returns `true` if a ship was lost this tick.
    fn check_player_lives(&mut self, now: f32) -> bool {
        let Some(player) = self.player else {
            return false;
        };
        let lost = self
            .store
            .get(player)
            .is_some_and(|p| p.health() <= 0.0 && !p.is_invulnerable());
        if !lost {
            return false;
        }

        if self.stats.decrease_extra_lives() {
            let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now)
                .with_player(self.player);
            if let Some(ship) = self.store.get_mut(player) {
                ship.reset_health(&mut ctx);
            }
            info!(lives = self.stats.extra_lives(), "ship lost");
        } else {
            self.finish(Outcome::PlayerDied);
        }
        true
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.stats.calculate_end_score();
        info!(?outcome, score = self.stats.score(), tick = self.tick_counter, "run finished");
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Game time in seconds, computed as `tick_count * fixed_dt`.
    pub fn sim_time(&self) -> f32 {
        (self.tick_counter as f64 * f64::from(self.config.fixed_dt)) as f32
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn player(&self) -> Option<ActorId> {
        self.player
    }

    pub fn store(&self) -> &ActorStore {
        &self.store
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn bullets(&self) -> &BulletDestroyer {
        &self.bullets
    }

    pub fn scroll(&self) -> &dyn ScrollFeed {
        self.scroll.as_ref()
    }

    /// The event bus, for subscribing listeners such as audio or UI.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Tear the run down, releasing the stats' event subscription. Returns
    /// the final score state for the results screen.
    pub fn dispose(self) -> ScoreState {
        let Simulation { stats, mut events, .. } = self;
        let state = stats.state().clone();
        stats.dispose(&mut events);
        state
    }

    // -- snapshot support ---------------------------------------------------

    pub(crate) fn stats_mut(&mut self) -> &mut PlayerStats {
        &mut self.stats
    }

    pub(crate) fn set_tick_counter(&mut self, tick: u64) {
        self.tick_counter = tick;
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = outcome;
    }

    pub(crate) fn restore_actor(&mut self, id: ActorId, state: &ActorState) -> Result<(), EngineError> {
        let now = self.sim_time();
        let actor = self.store.get_mut(id).ok_or(EngineError::UnknownActor { actor: id })?;
        let mut ctx = SimContext::new(Some(&mut self.physics), &mut self.events, now);
        actor.restore_state(state, &mut ctx)?;
        Ok(())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick_counter)
            .field("actors", &self.store.len())
            .field("bullets", &self.bullets.len())
            .field("outcome", &self.outcome)
            .finish()
    }
}

