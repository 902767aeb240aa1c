//! Property tests for scoring and bullet culling.

use glam::Vec2;
use proptest::prelude::*;
use voider_engine::prelude::*;
use voider_engine::score::segment_score;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn stats(start: f32, length: f32, bus: &mut EventBus) -> PlayerStats {
    PlayerStats::new(start, start + length, length, &ScoreConfig::default(), bus).unwrap()
}

/// Sorted hit coordinates as fractions of the level.
fn hit_fractions() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..1.0, 0..6).prop_map(|mut v| {
        v.sort_by(f32::total_cmp);
        v
    })
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn undamaged_run_always_scores_the_maximum(
        start in -500.0f32..500.0,
        length in 1.0f32..1000.0,
        steps in 1usize..50,
    ) {
        let mut bus = EventBus::new();
        let mut stats = stats(start, length, &mut bus);
        for i in 0..=steps {
            stats.update_score(start + length * i as f32 / steps as f32);
        }
        stats.calculate_end_score();
        prop_assert_eq!(stats.score(), 10_000_000);
    }

    #[test]
    fn score_is_closed_parts_plus_open_segment(
        start in -100.0f32..100.0,
        length in 10.0f32..500.0,
        hits in hit_fractions(),
        progress in 0.0f32..1.0,
    ) {
        let mut bus = EventBus::new();
        let mut stats = stats(start, length, &mut bus);
        for (i, fraction) in hits.iter().enumerate() {
            stats.update_score(start + length * fraction);
            // 1.5 s apart, clear of the cooldown.
            prop_assert!(stats.register_hit(i as f32 * 1.5));
        }
        let last_hit = hits.last().copied().unwrap_or(0.0);
        stats.update_score(start + length * last_hit.max(progress));

        let parts = stats.score_parts();
        prop_assert_eq!(parts.len(), hits.len());
        let open_start = parts.last().map_or(1.0, |p| p.multiplier_after);
        let closed: f64 = parts.iter().map(|p| p.score).sum();
        let expected = (closed + segment_score(open_start, stats.multiplier())).min(10_000_000.0);
        prop_assert!((stats.score_exact() - expected).abs() <= 1e-6 * expected.max(1.0));
    }

    #[test]
    fn score_never_decreases_between_hits(
        length in 10.0f32..500.0,
        coords in prop::collection::vec(0.0f32..1.0, 2..20),
    ) {
        let mut bus = EventBus::new();
        let mut stats = stats(0.0, length, &mut bus);
        let mut sorted = coords;
        sorted.sort_by(f32::total_cmp);
        let mut previous = 0.0;
        for fraction in sorted {
            stats.update_score(length * fraction);
            prop_assert!(stats.score_exact() >= previous);
            previous = stats.score_exact();
        }
    }
}

// ---------------------------------------------------------------------------
// Bullet culling
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn culling_keeps_every_bullet_inside_the_enlarged_view(
        points in prop::collection::vec((-0.99f32..0.99, -0.99f32..0.99), 1..40),
        now in 0.0f32..10.0,
    ) {
        let config = BulletConfig::default();
        let view = ViewBox::centered(Vec2::new(50.0, 0.0), Vec2::new(20.0, 12.0));
        let bounds = view.scaled(config.view_scale);
        let half = (bounds.max - bounds.min) * 0.5;
        let center = (bounds.min + bounds.max) * 0.5;

        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config);
        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);

        let def = ActorDefinition::named("pellet").destroyed_on_collide().shared();
        for (x, y) in &points {
            let position = center + Vec2::new(*x, *y) * half;
            let id = store.spawn(def.clone(), ActorKind::Bullet(BulletState::default()), position);
            store.get_mut(id).unwrap().activate(&mut ctx).unwrap();
            destroyer.add(id, 0.0).unwrap();
        }

        ctx.now = now;
        prop_assert_eq!(destroyer.remove_out_of_bounds(view, &mut store, &mut ctx), 0);
        prop_assert_eq!(destroyer.len(), points.len());
    }

    #[test]
    fn culling_reclaims_far_bullets_once_checked(
        distances in prop::collection::vec(1.01f32..5.0, 1..40),
    ) {
        let config = BulletConfig::default();
        let view = ViewBox::centered(Vec2::ZERO, Vec2::new(20.0, 12.0));
        let reach = (view.max.x - view.min.x) * 0.5 * config.view_scale;

        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config);
        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);

        let def = ActorDefinition::named("pellet").destroyed_on_collide().shared();
        for d in &distances {
            let id = store.spawn(def.clone(), ActorKind::Bullet(BulletState::default()), Vec2::new(reach * d, 0.0));
            store.get_mut(id).unwrap().activate(&mut ctx).unwrap();
            destroyer.add(id, 0.0).unwrap();
        }

        ctx.now = config.check_out_of_bounds_time * 0.5;
        prop_assert_eq!(destroyer.remove_out_of_bounds(view, &mut store, &mut ctx), 0);
        ctx.now = config.check_out_of_bounds_time;
        prop_assert_eq!(destroyer.remove_out_of_bounds(view, &mut store, &mut ctx), distances.len());
        drop(ctx);
        prop_assert!(store.is_empty());
        prop_assert_eq!(physics.body_count(), 0);
    }
}
