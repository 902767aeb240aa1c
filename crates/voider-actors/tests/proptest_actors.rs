//! Property tests for actor bookkeeping.
//!
//! Random sequences of spawns, removals, contacts and health changes are run
//! against an [`ActorStore`] and checked against a simple reference model.

use std::collections::BTreeMap;

use glam::Vec2;
use proptest::prelude::*;
use voider_actors::prelude::*;

/// Backend that only counts live bodies.
#[derive(Default)]
struct CountingBodies {
    live: BTreeMap<u64, Vec2>,
    next: u64,
}

impl BodyBackend for CountingBodies {
    fn create_body(&mut self, desc: &BodyDesc<'_>) -> BodyHandle {
        self.next += 1;
        self.live.insert(self.next, desc.position);
        BodyHandle(self.next)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> bool {
        self.live.remove(&handle.0).is_some()
    }

    fn body_position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.live.get(&handle.0).copied()
    }

    fn body_angle(&self, _handle: BodyHandle) -> Option<f32> {
        Some(0.0)
    }

    fn set_body_transform(&mut self, handle: BodyHandle, position: Vec2, _angle: f32) {
        if let Some(p) = self.live.get_mut(&handle.0) {
            *p = position;
        }
    }

    fn set_collision_filter(&mut self, _handle: BodyHandle, _category: Category, _mask: Category) {}
}

#[derive(Debug, Clone)]
enum ActorOp {
    Spawn,
    Remove(usize),
    Activate(usize),
    Deactivate(usize),
    ContactBegin(usize, usize),
    ContactEnd(usize, usize),
    Damage(usize, f32),
    Heal(usize, f32),
    Update(f32),
}

fn actor_op_strategy() -> impl Strategy<Value = ActorOp> {
    prop_oneof![
        Just(ActorOp::Spawn),
        (0..32usize).prop_map(ActorOp::Remove),
        (0..32usize).prop_map(ActorOp::Activate),
        (0..32usize).prop_map(ActorOp::Deactivate),
        (0..32usize, 0..32usize).prop_map(|(a, b)| ActorOp::ContactBegin(a, b)),
        (0..32usize, 0..32usize).prop_map(|(a, b)| ActorOp::ContactEnd(a, b)),
        (0..32usize, 0.0f32..80.0).prop_map(|(i, d)| ActorOp::Damage(i, d)),
        (0..32usize, 0.0f32..80.0).prop_map(|(i, h)| ActorOp::Heal(i, h)),
        (0.0f32..0.1).prop_map(ActorOp::Update),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_actor_ops_preserve_invariants(ops in prop::collection::vec(actor_op_strategy(), 1..60)) {
        let def = ActorDefinition::named("drone")
            .with_health(100.0)
            .with_collision_damage(15.0)
            .shared();
        let mut bodies = CountingBodies::default();
        let mut events = EventBus::new();
        let mut store = ActorStore::new();
        let mut alive: Vec<ActorId> = Vec::new();
        // (low, high) -> contact count, mirrored into both actors.
        let mut contacts: BTreeMap<(ActorId, ActorId), u32> = BTreeMap::new();

        for op in ops {
            let mut ctx = SimContext::new(Some(&mut bodies), &mut events, 0.0);
            match op {
                ActorOp::Spawn => {
                    let kind = ActorKind::Enemy(EnemyState::default());
                    alive.push(store.spawn(def.clone(), kind, Vec2::ZERO));
                }
                ActorOp::Remove(i) if !alive.is_empty() => {
                    let id = alive.remove(i % alive.len());
                    prop_assert!(store.remove(id, &mut ctx).is_some());
                    contacts.retain(|&(a, b), _| a != id && b != id);
                }
                ActorOp::Activate(i) if !alive.is_empty() => {
                    let id = alive[i % alive.len()];
                    let actor = store.get_mut(id).unwrap();
                    if !actor.has_body() {
                        prop_assert!(actor.activate(&mut ctx).is_ok());
                    }
                }
                ActorOp::Deactivate(i) if !alive.is_empty() => {
                    let id = alive[i % alive.len()];
                    store.get_mut(id).unwrap().deactivate(&mut ctx);
                }
                ActorOp::ContactBegin(i, j) if alive.len() > 1 => {
                    let (a, b) = (alive[i % alive.len()], alive[j % alive.len()]);
                    if let Some((x, y)) = store.pair_mut(a, b) {
                        x.add_colliding_actor(b, &mut ctx);
                        y.add_colliding_actor(a, &mut ctx);
                        *contacts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                    }
                }
                ActorOp::ContactEnd(i, j) if alive.len() > 1 => {
                    let (a, b) = (alive[i % alive.len()], alive[j % alive.len()]);
                    let key = (a.min(b), a.max(b));
                    let expected = contacts.get(&key).copied().unwrap_or(0) > 0;
                    if let Some((x, y)) = store.pair_mut(a, b) {
                        prop_assert_eq!(x.remove_colliding_actor(b, &mut ctx), expected);
                        prop_assert_eq!(y.remove_colliding_actor(a, &mut ctx), expected);
                        if expected {
                            let count = contacts.get_mut(&key).unwrap();
                            *count -= 1;
                            if *count == 0 {
                                contacts.remove(&key);
                            }
                        }
                    }
                }
                ActorOp::Damage(i, amount) if !alive.is_empty() => {
                    let id = alive[i % alive.len()];
                    store.get_mut(id).unwrap().decrease_health(amount, &mut ctx);
                }
                ActorOp::Heal(i, amount) if !alive.is_empty() => {
                    let id = alive[i % alive.len()];
                    store.get_mut(id).unwrap().increase_health(amount, &mut ctx);
                }
                ActorOp::Update(dt) => {
                    for id in store.ids() {
                        store.update_actor(id, dt, &mut ctx);
                    }
                }
                _ => {}
            }

            // Invariants after every op.
            prop_assert_eq!(store.len(), alive.len());
            let mut live_bodies = 0;
            for actor in store.iter() {
                prop_assert!(actor.health() <= actor.health_max());
                prop_assert_eq!(actor.has_body(), actor.is_active());
                if actor.has_body() {
                    live_bodies += 1;
                }
                for other in actor.colliding_actors() {
                    prop_assert!(store.contains(other), "colliding set holds a removed actor");
                    let key = (actor.id().min(other), actor.id().max(other));
                    prop_assert_eq!(
                        actor.contact_count(other),
                        contacts.get(&key).copied().unwrap_or(0)
                    );
                }
            }
            prop_assert_eq!(bodies.live.len(), live_bodies);
        }
    }
}
