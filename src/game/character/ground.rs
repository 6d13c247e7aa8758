// Ground probing beneath the character

use glam::Vec2;

use super::config::{GeneratedCharacterSize, SKIN_WIDTH};
use crate::core::math::angle_between_deg;
use crate::engine::physics::{CollisionMask, PhysicsBackend, RayHit};

/// Number of probe pairs fanned out on each side of the central ray
pub const RAY_SIDE_COUNT: usize = 5;

/// Walkable surface found under the character
pub type GroundHit = RayHit;

/// Grounded state change produced by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTransition {
    Landed,
    Left,
}

/// Where and how far to probe this tick
#[derive(Debug, Clone, Copy)]
pub struct GroundProbe {
    pub position: Vec2,
    pub up: Vec2,
    pub right: Vec2,
    pub mask: CollisionMask,
    /// Steepest accepted surface, in degrees from `up`
    pub max_walkable_slope: f32,
}

/// Raycast grounding with a fan of side probes
#[derive(Debug, Clone, Default)]
pub struct GroundDetector {
    grounded: bool,
    hit: Option<GroundHit>,
    step_down_length: f32,
}

impl GroundDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Last accepted ground hit, `None` while airborne
    pub fn hit(&self) -> Option<&GroundHit> {
        self.hit.as_ref()
    }

    /// Extra probe reach below the step height
    pub fn step_down_length(&self) -> f32 {
        self.step_down_length
    }

    pub fn set_step_down_length(&mut self, length: f32) {
        self.step_down_length = length;
    }

    /// Overwrite the grounded flag without probing (state restore)
    pub fn force_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
        if !grounded {
            self.hit = None;
        }
    }

    /// Horizontal offsets of the side probes, innermost first
    pub fn ray_offsets(size: &GeneratedCharacterSize) -> impl Iterator<Item = f32> {
        let extent = size.standing.size.x / 2.0 - size.ray_inset;
        let spacing = extent / RAY_SIDE_COUNT as f32;
        (1..=RAY_SIDE_COUNT).map(move |i| spacing * i as f32)
    }

    /// Probe for ground. Returns a transition only when the grounded state changed
    pub fn detect(
        &mut self,
        backend: &dyn PhysicsBackend,
        probe: &GroundProbe,
        size: &GeneratedCharacterSize,
    ) -> Option<GroundTransition> {
        let origin = probe.position + probe.up * (size.step_height + SKIN_WIDTH);
        let length = size.step_height + SKIN_WIDTH + self.step_down_length;

        let cast = |point: Vec2| -> Option<GroundHit> {
            let hit = backend.raycast(point, -probe.up, length, probe.mask)?;
            (angle_between_deg(hit.normal, probe.up) <= probe.max_walkable_slope).then_some(hit)
        };

        let hit = cast(origin).or_else(|| {
            Self::ray_offsets(size).find_map(|offset| {
                cast(origin + probe.right * offset).or_else(|| cast(origin - probe.right * offset))
            })
        });

        let grounded = hit.is_some();
        self.hit = hit;

        match (grounded, self.grounded) {
            (true, false) => {
                self.grounded = true;
                Some(GroundTransition::Landed)
            }
            (false, true) => {
                self.grounded = false;
                Some(GroundTransition::Left)
            }
            _ => None,
        }
    }
}
