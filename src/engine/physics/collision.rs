use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use std::sync::{Arc, Mutex};

/// Collision groups for filtering what objects can collide with each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroups {
    /// Default group - interacts with everything
    Default = 0b0000_0001,

    /// Player characters
    Player = 0b0000_0010,

    /// Moving platforms and other externally driven solids
    Mover = 0b0000_0100,

    /// Static ground, slopes and walls
    Platform = 0b0000_1000,

    /// Trigger volumes (speed zones, platform catch areas) - never block
    Trigger = 0b1000_0000,
}

impl CollisionGroups {
    /// Convert to rapier2d's InteractionGroups
    pub fn to_interaction_groups(self) -> InteractionGroups {
        let memberships = Group::from_bits_truncate(self as u32);

        let filter = match self {
            // Players collide with the environment and overlap triggers,
            // but never with other players
            CollisionGroups::Player => Group::from_bits_truncate(
                CollisionGroups::Default as u32
                    | CollisionGroups::Mover as u32
                    | CollisionGroups::Platform as u32
                    | CollisionGroups::Trigger as u32,
            ),

            // Solids collide with players and each other
            CollisionGroups::Mover | CollisionGroups::Platform => Group::from_bits_truncate(
                CollisionGroups::Default as u32
                    | CollisionGroups::Player as u32
                    | CollisionGroups::Mover as u32
                    | CollisionGroups::Platform as u32,
            ),

            // Triggers only care about players
            CollisionGroups::Trigger => Group::from_bits_truncate(CollisionGroups::Player as u32),

            CollisionGroups::Default => Group::ALL,
        };

        InteractionGroups::new(memberships, filter)
    }

    /// Mask containing only this group
    pub fn mask(self) -> CollisionMask {
        CollisionMask(self as u32)
    }
}

/// Set of collision groups a query is allowed to hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionMask(pub u32);

impl CollisionMask {
    /// Everything a character can stand on
    pub const ENVIRONMENT: CollisionMask = CollisionMask(
        CollisionGroups::Default as u32 | CollisionGroups::Mover as u32 | CollisionGroups::Platform as u32,
    );

    pub const ALL: CollisionMask = CollisionMask(u32::MAX);

    /// Check whether a group is part of this mask
    pub fn contains(self, group: CollisionGroups) -> bool {
        self.0 & group as u32 != 0
    }

    /// Query groups that hit every collider whose membership is in this mask
    pub fn to_query_groups(self) -> InteractionGroups {
        InteractionGroups::new(Group::ALL, Group::from_bits_truncate(self.0))
    }
}

impl Default for CollisionMask {
    fn default() -> Self {
        Self::ENVIRONMENT
    }
}

impl BitOr for CollisionMask {
    type Output = CollisionMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        CollisionMask(self.0 | rhs.0)
    }
}

impl From<CollisionGroups> for CollisionMask {
    fn from(group: CollisionGroups) -> Self {
        group.mask()
    }
}

/// Raw collision event as reported by rapier
#[derive(Debug, Clone, Copy)]
pub enum CollisionEvent {
    /// Two colliders started touching
    Started {
        collider1: ColliderHandle,
        collider2: ColliderHandle,
    },

    /// Two colliders stopped touching
    Stopped {
        collider1: ColliderHandle,
        collider2: ColliderHandle,
    },
}

/// Queue for storing collision events during physics step
pub struct CollisionEventQueue {
    events: Arc<Mutex<Vec<CollisionEvent>>>,
}

impl CollisionEventQueue {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::with_capacity(32))),
        }
    }

    /// Take every queued event, leaving the queue empty
    pub fn drain(&self) -> Vec<CollisionEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    /// Add a collision event
    fn push(&self, event: CollisionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for CollisionEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// Implement rapier2d's EventHandler trait for our event queue
impl EventHandler for CollisionEventQueue {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: rapier2d::prelude::CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        match event {
            rapier2d::prelude::CollisionEvent::Started(h1, h2, _flags) => {
                self.push(CollisionEvent::Started {
                    collider1: h1,
                    collider2: h2,
                });
            }
            rapier2d::prelude::CollisionEvent::Stopped(h1, h2, _flags) => {
                self.push(CollisionEvent::Stopped {
                    collider1: h1,
                    collider2: h2,
                });
            }
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}
