//! End-to-end level runs.
//!
//! Every test here drives a full [`Simulation`] with a real rapier world:
//! triggers activate enemies, weapons spawn bullets, contacts come out of the
//! physics step and the score reacts to the resulting health changes.

use glam::Vec2;
use voider_engine::prelude::*;
use voider_engine::score::segment_score;
use voider_engine::trigger::TIME_EPSILON;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DT: f32 = 1.0 / 60.0;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * b.abs().max(1.0)
}

fn ship(health: f32) -> DefinitionRef {
    ActorDefinition::named("ship").with_health(health).shared()
}

fn turret() -> DefinitionRef {
    ActorDefinition::named("turret").with_health(50.0).shared()
}

/// An enemy cannon firing 15-damage bullets at the player once every
/// `cooldown` seconds.
fn cannon(cooldown: f32) -> WeaponDefinition {
    let bullet = ActorDefinition::named("pellet")
        .destroyed_on_collide()
        .with_shapes(vec![ShapeTemplate::Circle { radius: 0.1 }])
        .shared();
    WeaponDefinition {
        bullet: Some(bullet),
        bullet_speed: 10.0,
        damage: 15.0,
        cooldown_min: cooldown,
        cooldown_max: cooldown,
        relative_to_level_speed: false,
    }
}

/// A run with the player at (-5, 0) and a turret at (-2, 0) aiming at it.
///
/// The turret's default screen trigger fires on the first tick.
fn turret_run(config: GameConfig, player_health: f32, scroll: LinearScroll, cooldown: f32) -> (Simulation, ActorId, ActorId) {
    let mut sim = Simulation::new(config, Box::new(scroll)).unwrap();
    let player = sim.spawn_player(ship(player_health), Vec2::new(-5.0, 0.0)).unwrap();
    let enemy = sim.spawn_enemy(turret(), EnemyState::default(), Vec2::new(-2.0, 0.0));
    sim.arm(enemy, cannon(cooldown), Aim::AtPlayer, Vec2::ZERO).unwrap();
    (sim, player, enemy)
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[test]
fn enemy_bullet_hits_player_through_physics() {
    let (mut sim, player, enemy) =
        turret_run(GameConfig::default(), 100.0, LinearScroll::new(0.0, 100.0, 1.0), 10.0);

    let first = sim.tick().unwrap();
    assert_eq!(first.shots.len(), 1, "turret fires as soon as it activates");
    assert!(sim.store().get(enemy).unwrap().is_active());

    sim.run_ticks(29).unwrap();

    let ship = sim.store().get(player).unwrap();
    assert_eq!(ship.health(), 85.0);
    assert!(sim.bullets().is_empty(), "the bullet is reclaimed after its hit");
    assert_eq!(sim.stats().score_parts().len(), 1);
    assert_eq!(sim.store().get(enemy).unwrap().health(), 50.0);
}

#[test]
fn player_bullet_hits_enemy_through_physics() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let player = sim.spawn_player(ship(100.0), Vec2::new(-5.0, 0.0)).unwrap();
    let enemy = sim.spawn_enemy(turret(), EnemyState::default(), Vec2::new(-2.0, 0.0));
    sim.arm(player, cannon(10.0), Aim::Direction(Vec2::X), Vec2::new(0.6, 0.0))
        .unwrap();

    let mut contacts = 0;
    for _ in 0..30 {
        contacts += sim.tick().unwrap().contacts;
    }

    assert!(contacts >= 1);
    assert_eq!(sim.store().get(enemy).unwrap().health(), 35.0);
    assert!(sim.bullets().is_empty());
    assert!(sim.stats().score_parts().is_empty(), "enemy damage does not touch the multiplier");
}

#[test]
fn touching_enemy_drains_health_over_time() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let player = sim.spawn_player(ship(100.0), Vec2::new(-5.0, 0.0)).unwrap();
    let spikes = ActorDefinition::named("spikes")
        .with_health(50.0)
        .with_collision_damage(30.0)
        .shared();
    sim.spawn_enemy(spikes, EnemyState::default(), Vec2::new(-5.2, 0.0));

    sim.run_ticks(60).unwrap();

    // 30 damage per second for about one second, minus the ticks before
    // the contact was reported.
    let lost = 100.0 - sim.store().get(player).unwrap().health();
    assert!((lost - 30.0).abs() < 30.0 * DT * 3.0, "lost {lost}");
    assert_eq!(sim.stats().score_parts().len(), 1, "the cooldown swallows later ticks");
    assert_eq!(sim.outcome(), Outcome::Running);
}

#[test]
fn collected_pickup_leaves_the_run() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let player = sim.spawn_player(ship(100.0), Vec2::new(-5.0, 0.0)).unwrap();
    let medkit = ActorDefinition::named("medkit")
        .with_health(0.0)
        .with_collectible(Collectible::Health50)
        .shared();
    let pickup = sim.spawn_actor(medkit, ActorKind::Pickup, Vec2::new(-5.3, 0.0));
    sim.activate_actor(pickup).unwrap();
    let picked = sim.events_mut().subscribe(&[EventKind::CollectiblePicked]);

    let mut collected = Vec::new();
    for _ in 0..5 {
        collected.extend(sim.tick().unwrap().pickups_collected);
    }

    assert_eq!(collected, vec![pickup]);
    assert!(sim.store().get(pickup).is_none());
    assert_eq!(sim.physics().body_count(), 1, "only the ship keeps a body");
    assert_eq!(sim.events_mut().drain(picked).len(), 1);
    let snapshot = sim.capture_snapshot().unwrap();
    assert!(snapshot.actors.iter().all(|record| record.id != pickup));
    assert_eq!(snapshot.actors.len(), 1);
    assert_eq!(sim.store().get(player).unwrap().health(), 100.0);
}

#[test]
fn player_bullets_leaving_the_view_are_culled() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let player = sim.spawn_player(ship(100.0), Vec2::new(-5.0, 0.0)).unwrap();
    let mut blaster = cannon(0.5);
    blaster.damage = 5.0;
    sim.arm(player, blaster, Aim::Direction(Vec2::X), Vec2::new(0.6, 0.0))
        .unwrap();

    let mut shots = 0;
    let mut culled = 0;
    for _ in 0..360 {
        let report = sim.tick().unwrap();
        shots += report.shots.len();
        culled += report.bullets_culled;
    }

    assert!(shots >= 11);
    assert!(culled > 0);
    assert_eq!(sim.bullets().len(), shots - culled);
    assert_eq!(sim.store().get(player).unwrap().health(), 100.0);
}

// ---------------------------------------------------------------------------
// Lives and outcomes
// ---------------------------------------------------------------------------

#[test]
fn lost_ship_spends_an_extra_life() {
    let mut config = GameConfig::default();
    config.score.starting_lives = 2;
    let (mut sim, player, _) = turret_run(config, 10.0, LinearScroll::new(0.0, 100.0, 1.0), 10.0);

    let mut lost_at = None;
    for _ in 0..60 {
        let report = sim.tick().unwrap();
        if report.ship_lost {
            lost_at = Some(report.tick);
        }
    }

    assert!(lost_at.is_some());
    let ship = sim.store().get(player).unwrap();
    assert_eq!(ship.health(), 10.0);
    assert!(ship.is_invulnerable());
    assert_eq!(sim.stats().extra_lives(), 0);
    assert_eq!(sim.outcome(), Outcome::Running);
}

#[test]
fn last_ship_lost_ends_the_run() {
    let mut config = GameConfig::default();
    config.score.starting_lives = 1;
    let (mut sim, _, _) = turret_run(config, 10.0, LinearScroll::new(0.0, 100.0, 1.0), 10.0);

    assert_eq!(sim.run_ticks(120).unwrap(), Outcome::PlayerDied);
    let ticks = sim.tick_count();
    let score = sim.stats().score();
    assert!(score > 0 && score < 10_000_000);

    let report = sim.tick().unwrap();
    assert_eq!(report.outcome, Outcome::PlayerDied);
    assert_eq!(sim.tick_count(), ticks, "a finished run does not advance");
}

#[test]
fn ending_tick_keeps_the_end_score() {
    let mut config = GameConfig::default();
    config.score.starting_lives = 1;
    let (mut sim, _, _) = turret_run(config, 10.0, LinearScroll::new(0.0, 100.0, 1.0), 10.0);

    let mut last = sim.tick().unwrap();
    while !last.outcome.is_finished() {
        last = sim.tick().unwrap();
    }
    assert!(last.ship_lost);

    // Scored up to the level end, not to where the scroll stopped.
    let stats = sim.stats();
    assert_eq!(stats.state().coord_current, 100.0);
    let part = stats.score_parts()[0];
    let k = stats.multiplier_per_coord();
    let open = segment_score(
        part.multiplier_after,
        part.multiplier_after + f64::from(100.0 - part.coord_end) * k,
    );
    assert!(close(stats.score_exact(), part.score + open));
}

#[test]
fn one_hit_run_scores_both_segments() {
    let (mut sim, _, _) = turret_run(GameConfig::default(), 100.0, LinearScroll::new(0.0, 10.0, 5.0), 10.0);

    assert_eq!(sim.run_ticks(600).unwrap(), Outcome::LevelCompleted);

    let stats = sim.stats();
    let parts = stats.score_parts();
    assert_eq!(parts.len(), 1);
    let part = parts[0];
    let end_multiplier =
        part.multiplier_after + f64::from(10.0 - part.coord_end) * stats.multiplier_per_coord();
    let expected = part.score + segment_score(part.multiplier_after, end_multiplier);
    assert!(close(stats.score_exact(), expected), "{} vs {expected}", stats.score_exact());
    assert!(stats.score() < 10_000_000);
}

#[test]
fn undamaged_run_scores_the_maximum() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(-30.0, 30.0, 12.0))).unwrap();
    sim.spawn_player(ship(100.0), Vec2::new(-40.0, 0.0)).unwrap();

    assert_eq!(sim.run_ticks(1000).unwrap(), Outcome::LevelCompleted);
    assert_eq!(sim.stats().score(), 10_000_000);
    assert_eq!(sim.stats().score_string(), "10,000,000");
}

// ---------------------------------------------------------------------------
// Groups and triggers
// ---------------------------------------------------------------------------

#[test]
fn shrinking_a_group_removes_the_newest_followers() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let leader = sim.spawn_enemy(turret(), EnemyState::default(), Vec2::new(40.0, 0.0));
    let group = sim.create_group(leader, None).unwrap();

    let added = sim.set_group_enemy_count(group, 5).unwrap();
    assert_eq!(added.len(), 4);
    assert_eq!(sim.store().len(), 5);

    assert!(sim.set_group_enemy_count(group, 2).unwrap().is_empty());
    assert_eq!(sim.group(group).unwrap().enemies(), &[leader, added[0]]);
    assert_eq!(sim.store().len(), 2);
    for gone in &added[1..] {
        assert!(!sim.store().contains(*gone));
    }
}

#[test]
fn followers_activate_after_the_leader_in_spawn_order() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let leader = sim.spawn_enemy(turret(), EnemyState::default(), Vec2::new(40.0, 0.0));
    let group = sim.create_group(leader, Some(0.5)).unwrap();
    let followers = sim.set_group_enemy_count(group, 4).unwrap();

    let registry = sim.triggers_mut();
    let gate = registry.add_trigger(TriggerSource::ScreenAt { x: 1.0 }, false);
    registry.bind(gate, leader, TriggerAction::Activate, 0.0).unwrap();

    sim.run_ticks(240).unwrap();

    let start = sim.store().get(leader).unwrap().activation_time().unwrap();
    assert!((start - 1.0).abs() < 2.0 * DT);
    for (i, follower) in followers.iter().enumerate() {
        let at = sim.store().get(*follower).unwrap().activation_time().unwrap();
        let expected = 0.5 * (i + 1) as f32;
        assert!(((at - start) - expected).abs() < 2.0 * DT, "follower {i} at {at}");
    }
}

#[test]
fn delayed_leader_trigger_staggers_the_whole_group() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let leader = sim.spawn_enemy(turret(), EnemyState::default(), Vec2::new(40.0, 0.0));
    let group = sim.create_group(leader, Some(0.5)).unwrap();
    let followers = sim.set_group_enemy_count(group, 3).unwrap();

    let registry = sim.triggers_mut();
    let gate = registry.add_trigger(TriggerSource::ScreenAt { x: 0.0 }, false);
    registry.bind(gate, leader, TriggerAction::Activate, 2.0).unwrap();

    sim.run_ticks(200).unwrap();

    let fired = sim.triggers().trigger(gate).unwrap().triggered_at.unwrap();
    let since_gate = |id: ActorId| sim.store().get(id).unwrap().activation_time().unwrap() - fired;
    assert!((since_gate(leader) - 2.0).abs() <= TIME_EPSILON, "leader at {}", since_gate(leader));
    for (follower, expected) in followers.iter().zip([2.5, 3.0]) {
        let at = since_gate(*follower);
        assert!((at - expected).abs() <= TIME_EPSILON, "follower at {at}, expected {expected}");
    }
}

#[test]
fn ai_enemy_deactivates_after_the_default_lifetime() {
    let mut config = GameConfig::default();
    config.enemy.deactivate_time_default = 1.0;
    let mut sim = Simulation::new(config, Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let drone = sim.spawn_enemy(
        turret(),
        EnemyState::with_movement(MovementKind::Ai),
        Vec2::new(-3.0, 0.0),
    );

    sim.run_ticks(30).unwrap();
    assert!(sim.store().get(drone).unwrap().is_active());

    sim.run_ticks(60).unwrap();
    let drone = sim.store().get(drone).unwrap();
    assert!(!drone.is_active());
    assert!(!drone.has_body());
}

#[test]
fn removed_enemy_leaves_no_bindings() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let drone = sim.spawn_enemy(
        turret(),
        EnemyState::with_movement(MovementKind::Ai),
        Vec2::new(30.0, 0.0),
    );
    sim.arm(drone, cannon(1.0), Aim::AtPlayer, Vec2::ZERO).unwrap();
    assert_eq!(sim.start_run().unwrap(), 2);

    sim.remove_actor(drone).unwrap();
    assert_eq!(sim.triggers().binding_count(), 0);
    assert!(sim.tick().unwrap().weapon_errors.is_empty());
    assert!(matches!(
        sim.remove_actor(drone),
        Err(EngineError::UnknownActor { .. })
    ));
}

// ---------------------------------------------------------------------------
// External responses
// ---------------------------------------------------------------------------

#[test]
fn highscore_response_is_applied_on_the_next_tick() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 100.0, 1.0))).unwrap();
    let (sender, inbox) = response_channel();
    sim.attach_inbox(inbox);

    std::thread::spawn(move || {
        sender
            .send(ExternalResponse::HighscoreChecked { new_highscore: true })
            .unwrap();
    })
    .join()
    .unwrap();

    assert!(!sim.stats().is_new_highscore());
    let report = sim.tick().unwrap();
    assert_eq!(report.responses, 1);
    assert!(sim.stats().is_new_highscore());
    assert_eq!(sim.tick().unwrap().responses, 0);
}

#[test]
fn dispose_returns_the_final_score() {
    let mut sim = Simulation::new(GameConfig::default(), Box::new(LinearScroll::new(0.0, 5.0, 5.0))).unwrap();
    sim.spawn_player(ship(100.0), Vec2::new(-5.0, 0.0)).unwrap();
    sim.run_ticks(120).unwrap();

    let state = sim.dispose();
    assert_eq!(state.score, 10_000_000.0);
    assert!(state.parts.is_empty());
    assert_eq!(state.extra_lives, 2);
}
