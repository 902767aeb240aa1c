//! Per-call simulation context handed to actor operations.

use crate::body::BodyBackend;
use crate::events::{EventBus, GameEvent};
use crate::id::ActorId;

/// Read-only view of the scrolling level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelView {
    /// Scroll coordinate: world x of the right screen edge.
    pub x_coord: f32,
    /// Scroll speed in world units per second.
    pub speed: f32,
}

/// Borrowed services an actor needs while it is being updated or hit.
///
/// The context is rebuilt by the caller for every phase of a tick, so it only
/// borrows and never owns.
pub struct SimContext<'a> {
    /// `None` when no physics world is attached.
    pub bodies: Option<&'a mut dyn BodyBackend>,
    pub events: &'a mut EventBus,
    /// Current game time in seconds.
    pub now: f32,
    pub level: LevelView,
    pub player: Option<ActorId>,
    /// Editor previews keep bodies still.
    pub editor_active: bool,
}

impl<'a> SimContext<'a> {
    pub fn new(bodies: Option<&'a mut dyn BodyBackend>, events: &'a mut EventBus, now: f32) -> Self {
        Self {
            bodies,
            events,
            now,
            level: LevelView::default(),
            player: None,
            editor_active: false,
        }
    }

    pub fn with_level(mut self, level: LevelView) -> Self {
        self.level = level;
        self
    }

    pub fn with_player(mut self, player: Option<ActorId>) -> Self {
        self.player = player;
        self
    }

    /// Reborrow the body backend for one call.
    pub fn bodies(&mut self) -> Option<&mut (dyn BodyBackend + 'a)> {
        self.bodies.as_deref_mut()
    }

    pub fn fire(&mut self, event: GameEvent) {
        self.events.fire(event);
    }
}
