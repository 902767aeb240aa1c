//! Actor handles.
//!
//! Triggers, groups, weapons, colliding sets and physics user data all name
//! actors by [`ActorId`]. The id pairs the store slot with the slot's
//! generation at spawn time; [`ActorStore`](crate::store::ActorStore) bumps
//! the generation when the actor leaves, so an old id held anywhere stops
//! resolving once its bullet slot is recycled.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Slot and generation of one actor in the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId {
    slot: u32,
    generation: u32,
}

impl ActorId {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn index(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Packed form stored in rapier body and collider user data.
    pub fn user_data(self) -> u128 {
        u128::from(self.generation) << 32 | u128::from(self.slot)
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({self})")
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}/{}", self.slot, self.generation)
    }
}
