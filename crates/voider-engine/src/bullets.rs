//! In-flight bullet bookkeeping and amortised out-of-bounds culling.
//!
//! Every live bullet is tracked by a [`TimeBullet`] record in a fixed-capacity
//! slab. Culling does not look at every bullet every frame: a record is only
//! re-checked once `check_interval` seconds have passed since its last check.
//! Bullets that are already inactive (hit something) are reclaimed on their
//! next check regardless of the interval.

use glam::Vec2;
use tracing::trace;
use voider_actors::prelude::{ActorId, ActorStore, SimContext};

use crate::config::BulletConfig;
use crate::EngineError;

// ---------------------------------------------------------------------------
// ViewBox
// ---------------------------------------------------------------------------

/// Axis-aligned world rectangle, usually the camera view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl ViewBox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// A box of the given size around `center`.
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// The same box scaled around its center.
    pub fn scaled(&self, factor: f32) -> Self {
        let center = (self.min + self.max) * 0.5;
        Self::centered(center, (self.max - self.min) * factor)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

// ---------------------------------------------------------------------------
// BulletDestroyer
// ---------------------------------------------------------------------------

/// Pooled record of one live bullet.
#[derive(Debug, Clone, Copy)]
struct TimeBullet {
    bullet: ActorId,
    last_checked: f32,
}

/// Owns all in-flight bullets.
#[derive(Debug)]
pub struct BulletDestroyer {
    slots: Vec<Option<TimeBullet>>,
    free: Vec<usize>,
    /// Slot indices of live bullets, unordered.
    live: Vec<usize>,
    check_interval: f32,
    view_scale: f32,
}

impl BulletDestroyer {
    pub fn new(config: &BulletConfig) -> Self {
        let capacity = config.max_bullets;
        Self {
            slots: vec![None; capacity],
            free: (0..capacity).rev().collect(),
            live: Vec::with_capacity(capacity),
            check_interval: config.check_out_of_bounds_time,
            view_scale: config.view_scale,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn has_capacity(&self) -> bool {
        !self.free.is_empty()
    }

    /// Live bullets, in no particular order.
    pub fn bullets(&self) -> Vec<ActorId> {
        self.live
            .iter()
            .filter_map(|&slot| self.slots[slot].map(|tb| tb.bullet))
            .collect()
    }

    /// Start tracking a bullet, stamped with the current game time.
    pub fn add(&mut self, bullet: ActorId, now: f32) -> Result<(), EngineError> {
        let Some(slot) = self.free.pop() else {
            return Err(EngineError::BulletPoolExhausted {
                capacity: self.capacity(),
            });
        };
        self.slots[slot] = Some(TimeBullet {
            bullet,
            last_checked: now,
        });
        self.live.push(slot);
        Ok(())
    }

    /// Update every live bullet actor.
    pub fn update(&self, store: &mut ActorStore, dt: f32, ctx: &mut SimContext<'_>) {
        for &slot in &self.live {
            if let Some(tb) = self.slots[slot] {
                store.update_actor(tb.bullet, dt, ctx);
            }
        }
    }

    /// Reclaim bullets that are inactive or outside the enlarged view.
    ///
    /// Returns the number of bullets removed.
    pub fn remove_out_of_bounds(
        &mut self,
        view: ViewBox,
        store: &mut ActorStore,
        ctx: &mut SimContext<'_>,
    ) -> usize {
        let bounds = view.scaled(self.view_scale);
        let now = ctx.now;
        let mut removed = 0;
        let mut i = 0;
        while i < self.live.len() {
            let slot = self.live[i];
            let Some(tb) = self.slots[slot].as_mut() else {
                self.live.swap_remove(i);
                continue;
            };
            let actor = store.get(tb.bullet);
            let inactive = actor.map_or(true, |a| !a.is_active());
            if !inactive && tb.last_checked + self.check_interval > now {
                i += 1;
                continue;
            }
            tb.last_checked = now;
            let outside = actor.map_or(true, |a| !bounds.contains(a.position()));
            if inactive || outside {
                let bullet = tb.bullet;
                // The swapped-in entry is examined at the same index next.
                self.live.swap_remove(i);
                self.release(slot);
                store.remove(bullet, ctx);
                trace!(%bullet, inactive, "bullet culled");
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Remove every bullet.
    pub fn clear(&mut self, store: &mut ActorStore, ctx: &mut SimContext<'_>) {
        for slot in std::mem::take(&mut self.live) {
            if let Some(tb) = self.slots[slot] {
                store.remove(tb.bullet, ctx);
            }
            self.release(slot);
        }
    }

    fn release(&mut self, slot: usize) {
        if self.slots[slot].take().is_some() {
            self.free.push(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::PhysicsWorld;
    use voider_actors::prelude::*;

    fn config(max_bullets: usize) -> BulletConfig {
        BulletConfig {
            max_bullets,
            ..BulletConfig::default()
        }
    }

    fn spawn_bullet(store: &mut ActorStore, ctx: &mut SimContext<'_>, x: f32) -> ActorId {
        let def = ActorDefinition::named("bullet").destroyed_on_collide().shared();
        let id = store.spawn(def, ActorKind::Bullet(BulletState::default()), Vec2::new(x, 0.0));
        store.get_mut(id).unwrap().activate(ctx).unwrap();
        id
    }

    fn view() -> ViewBox {
        ViewBox::centered(Vec2::ZERO, Vec2::new(20.0, 10.0))
    }

    #[test]
    fn far_bullet_is_culled_once_its_check_is_due() {
        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config(8));

        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);
        let far = spawn_bullet(&mut store, &mut ctx, 1000.0);
        let near = spawn_bullet(&mut store, &mut ctx, 25.0);
        destroyer.add(far, 0.0).unwrap();
        destroyer.add(near, 0.0).unwrap();

        ctx.now = 0.5;
        assert_eq!(destroyer.remove_out_of_bounds(view(), &mut store, &mut ctx), 0);
        ctx.now = 1.0;
        assert_eq!(destroyer.remove_out_of_bounds(view(), &mut store, &mut ctx), 1);
        drop(ctx);

        // x = 25 is outside the view but inside the 3x box.
        assert_eq!(destroyer.bullets(), vec![near]);
        assert!(store.get(far).is_none());
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn inactive_bullet_is_reclaimed_without_waiting() {
        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config(8));

        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);
        let hit = spawn_bullet(&mut store, &mut ctx, 0.0);
        destroyer.add(hit, 0.0).unwrap();
        store.get_mut(hit).unwrap().destroy_body_safe();
        destroyer.update(&mut store, 1.0 / 60.0, &mut ctx);

        ctx.now = 1.0 / 60.0;
        assert_eq!(destroyer.remove_out_of_bounds(view(), &mut store, &mut ctx), 1);
        assert!(destroyer.is_empty());
    }

    #[test]
    fn exhausted_pool_is_reported_and_recovers_after_cull() {
        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config(2));

        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);
        let a = spawn_bullet(&mut store, &mut ctx, 500.0);
        let b = spawn_bullet(&mut store, &mut ctx, 0.0);
        let c = spawn_bullet(&mut store, &mut ctx, 0.0);
        destroyer.add(a, 0.0).unwrap();
        destroyer.add(b, 0.0).unwrap();
        assert!(matches!(
            destroyer.add(c, 0.0),
            Err(EngineError::BulletPoolExhausted { capacity: 2 })
        ));

        ctx.now = 2.0;
        destroyer.remove_out_of_bounds(view(), &mut store, &mut ctx);
        assert!(destroyer.has_capacity());
        destroyer.add(c, 2.0).unwrap();
        assert_eq!(destroyer.len(), 2);
    }

    #[test]
    fn clear_removes_every_bullet() {
        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config(4));

        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);
        for x in [0.0, 1.0, 2.0] {
            let id = spawn_bullet(&mut store, &mut ctx, x);
            destroyer.add(id, 0.0).unwrap();
        }
        destroyer.clear(&mut store, &mut ctx);
        drop(ctx);
        assert!(destroyer.is_empty());
        assert!(store.is_empty());
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn scaled_view_keeps_center() {
        let scaled = view().scaled(3.0);
        assert_eq!(scaled.min, Vec2::new(-30.0, -15.0));
        assert_eq!(scaled.max, Vec2::new(30.0, 15.0));
    }

    #[test]
    fn culling_checks_the_entries_swapped_into_place() {
        let mut physics = PhysicsWorld::new();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut destroyer = BulletDestroyer::new(&config(8));

        let mut ctx = SimContext::new(Some(&mut physics), &mut events, 0.0);
        let xs = [500.0, 0.0, -500.0, 5.0, 700.0];
        let ids: Vec<ActorId> = xs.iter().map(|&x| spawn_bullet(&mut store, &mut ctx, x)).collect();
        for &id in &ids {
            destroyer.add(id, 0.0).unwrap();
        }

        ctx.now = 1.0;
        assert_eq!(destroyer.remove_out_of_bounds(view(), &mut store, &mut ctx), 3);
        drop(ctx);
        let mut kept = destroyer.bullets();
        kept.sort();
        assert_eq!(kept, vec![ids[1], ids[3]]);
        assert_eq!(store.len(), 2);
        assert_eq!(physics.body_count(), 2);
        assert_eq!(destroyer.capacity() - destroyer.len(), 6);
    }
}
