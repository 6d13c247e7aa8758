// Moving platforms and speed zones affecting a character
//
// Platforms and zones are owned by the host. The controller only holds shared
// references resolved through the `CapabilityRegistry` when contact starts.

use glam::Vec2;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use super::config::SKIN_WIDTH;
use crate::engine::physics::ColliderHandle;

/// Most movers a character tracks at once
pub const MAX_ACTIVE_MOVERS: usize = 5;

/// Something that carries characters along as it moves
pub trait PhysicsMover {
    /// Position at the start of this tick
    fn frame_position(&self) -> Vec2;
    /// Distance moved during the last tick
    fn frame_position_delta(&self) -> Vec2;
    /// Velocity handed to a character that leaves it
    fn takeoff_velocity(&self) -> Vec2;
    /// Only carries characters standing on it, never through a trigger
    fn requires_grounding(&self) -> bool;
    /// Keeps carrying a character after it steps off, until its trigger is left
    fn uses_bounding(&self) -> bool;
}

/// A zone scaling character velocity
pub trait SpeedModifier {
    fn in_air(&self) -> bool;
    fn on_ground(&self) -> bool;
    /// Added to the base multiplier of one on each axis
    fn modifier(&self) -> Vec2;
}

/// Platform moved by the host once per tick
#[derive(Debug)]
pub struct MovingPlatform {
    position: Cell<Vec2>,
    delta: Cell<Vec2>,
    velocity: Cell<Vec2>,
    requires_grounding: bool,
    uses_bounding: bool,
}

impl MovingPlatform {
    pub fn new(position: Vec2) -> Self {
        Self {
            position: Cell::new(position),
            delta: Cell::new(Vec2::ZERO),
            velocity: Cell::new(Vec2::ZERO),
            requires_grounding: true,
            uses_bounding: false,
        }
    }

    /// Also carry characters inside its trigger volume
    pub fn carries_without_grounding(mut self) -> Self {
        self.requires_grounding = false;
        self
    }

    pub fn with_bounding(mut self, uses_bounding: bool) -> Self {
        self.uses_bounding = uses_bounding;
        self
    }

    /// Record this tick's movement
    pub fn move_to(&self, position: Vec2, dt: f32) {
        let delta = position - self.position.get();
        self.delta.set(delta);
        if dt > 0.0 {
            self.velocity.set(delta / dt);
        }
        self.position.set(position);
    }

    pub fn position(&self) -> Vec2 {
        self.position.get()
    }
}

impl PhysicsMover for MovingPlatform {
    fn frame_position(&self) -> Vec2 {
        self.position.get()
    }

    fn frame_position_delta(&self) -> Vec2 {
        self.delta.get()
    }

    fn takeoff_velocity(&self) -> Vec2 {
        self.velocity.get()
    }

    fn requires_grounding(&self) -> bool {
        self.requires_grounding
    }

    fn uses_bounding(&self) -> bool {
        self.uses_bounding
    }
}

/// Speed modifier volume
#[derive(Debug, Clone)]
pub struct SpeedZone {
    pub in_air: bool,
    pub on_ground: bool,
    pub modifier: Vec2,
}

impl SpeedZone {
    /// Zone active both on the ground and in the air
    pub fn new(modifier: Vec2) -> Self {
        Self {
            in_air: true,
            on_ground: true,
            modifier,
        }
    }
}

impl SpeedModifier for SpeedZone {
    fn in_air(&self) -> bool {
        self.in_air
    }

    fn on_ground(&self) -> bool {
        self.on_ground
    }

    fn modifier(&self) -> Vec2 {
        self.modifier
    }
}

/// Maps colliders to the capabilities attached to them
#[derive(Default)]
pub struct CapabilityRegistry {
    movers: HashMap<ColliderHandle, Rc<dyn PhysicsMover>>,
    modifiers: HashMap<ColliderHandle, Rc<dyn SpeedModifier>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mover(&mut self, collider: ColliderHandle, mover: Rc<dyn PhysicsMover>) {
        self.movers.insert(collider, mover);
    }

    pub fn register_modifier(&mut self, collider: ColliderHandle, modifier: Rc<dyn SpeedModifier>) {
        self.modifiers.insert(collider, modifier);
    }

    pub fn unregister(&mut self, collider: ColliderHandle) {
        self.movers.remove(&collider);
        self.modifiers.remove(&collider);
    }

    pub fn mover(&self, collider: ColliderHandle) -> Option<Rc<dyn PhysicsMover>> {
        self.movers.get(&collider).cloned()
    }

    pub fn modifier(&self, collider: ColliderHandle) -> Option<Rc<dyn SpeedModifier>> {
        self.modifiers.get(&collider).cloned()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("movers", &self.movers.len())
            .field("modifiers", &self.modifiers.len())
            .finish()
    }
}

/// Movers and modifiers currently affecting one character
#[derive(Default)]
pub struct PlatformTracker {
    active_movers: Vec<(ColliderHandle, Rc<dyn PhysicsMover>)>,
    modifiers: Vec<(ColliderHandle, Rc<dyn SpeedModifier>)>,
    grounded_platform: Option<(ColliderHandle, Rc<dyn PhysicsMover>)>,
}

impl PlatformTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_mover_count(&self) -> usize {
        self.active_movers.len()
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_mover_active(&self, collider: ColliderHandle) -> bool {
        self.active_movers.iter().any(|(handle, _)| *handle == collider)
    }

    /// Platform the character stood on last tick
    pub fn grounded_platform(&self) -> Option<ColliderHandle> {
        self.grounded_platform.as_ref().map(|(handle, _)| *handle)
    }

    /// Track a mover. Returns false when the set is already full
    pub fn activate_mover(&mut self, collider: ColliderHandle, mover: Rc<dyn PhysicsMover>) -> bool {
        if self.is_mover_active(collider) {
            return true;
        }
        if self.active_movers.len() >= MAX_ACTIVE_MOVERS {
            log::debug!("Ignoring mover {:?}: {} movers already active", collider, MAX_ACTIVE_MOVERS);
            return false;
        }
        self.active_movers.push((collider, mover));
        true
    }

    pub fn deactivate_mover(&mut self, collider: ColliderHandle) {
        self.active_movers.retain(|(handle, _)| *handle != collider);
    }

    pub fn on_trigger_enter(&mut self, collider: ColliderHandle, registry: &CapabilityRegistry) {
        if let Some(modifier) = registry.modifier(collider) {
            if !self.modifiers.iter().any(|(handle, _)| *handle == collider) {
                self.modifiers.push((collider, modifier));
            }
        } else if let Some(mover) = registry.mover(collider) {
            if !mover.requires_grounding() {
                self.activate_mover(collider, mover);
            }
        }
    }

    pub fn on_trigger_exit(&mut self, collider: ColliderHandle) {
        let before = self.modifiers.len();
        self.modifiers.retain(|(handle, _)| *handle != collider);
        if self.modifiers.len() == before {
            self.deactivate_mover(collider);
        }
    }

    /// Record the platform under the character this tick.
    ///
    /// When it changed, a previous platform that does not use bounding stops
    /// carrying the character and its takeoff velocity is returned.
    pub fn set_grounded_platform(
        &mut self,
        current: Option<(ColliderHandle, Rc<dyn PhysicsMover>)>,
    ) -> Option<Vec2> {
        let current_handle = current.as_ref().map(|(handle, _)| *handle);
        if self.grounded_platform() == current_handle {
            return None;
        }

        let previous = std::mem::replace(&mut self.grounded_platform, current);
        let (handle, mover) = previous?;
        if mover.uses_bounding() {
            return None;
        }
        self.deactivate_mover(handle);
        Some(mover.takeoff_velocity())
    }

    /// Drop the platform under the character without a takeoff
    pub fn clear_grounded_platform(&mut self) {
        if let Some((handle, _)) = self.grounded_platform.take() {
            self.deactivate_mover(handle);
        }
    }

    /// Velocity carried over from active movers the character is not below
    pub fn carried_velocity(&self, position: Vec2, dt: f32) -> Vec2 {
        if dt <= 0.0 {
            return Vec2::ZERO;
        }
        self.active_movers
            .iter()
            .filter(|(_, mover)| position.y >= mover.frame_position().y - SKIN_WIDTH)
            .map(|(_, mover)| mover.frame_position_delta() / dt)
            .sum()
    }

    /// Speed multiplier target: one plus every modifier applicable in this state
    pub fn modifier_target(&self, grounded: bool) -> Vec2 {
        self.modifiers
            .iter()
            .filter(|(_, modifier)| {
                (modifier.on_ground() && grounded) || (modifier.in_air() && !grounded)
            })
            .fold(Vec2::ONE, |total, (_, modifier)| total + modifier.modifier())
    }
}

impl std::fmt::Debug for PlatformTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformTracker")
            .field("active_movers", &self.active_movers.len())
            .field("modifiers", &self.modifiers.len())
            .field("grounded_platform", &self.grounded_platform())
            .finish()
    }
}
