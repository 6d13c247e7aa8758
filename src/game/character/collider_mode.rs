// Collision geometry switching between standing, growing and airborne shapes

use glam::Vec2;

use super::config::{GeneratedCharacterSize, COLLIDER_EDGE_RADIUS, SKIN_WIDTH};
use crate::engine::physics::{
    BoxShape, CharacterShapes, CollisionMask, PhysicsBackend, RigidBodyHandle,
};

/// Active collision geometry of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderMode {
    /// Full-height primary box
    Standing,
    /// Primary box sized by the grow dimensions
    Growing,
    /// Capsule enabled, primary box left as it was
    Airborne,
}

/// Owns the character's current collider layout
#[derive(Debug, Clone)]
pub struct ColliderModeManager {
    mode: ColliderMode,
    primary: BoxShape,
}

impl ColliderModeManager {
    /// Start airborne with the standing box as primary
    pub fn new(size: &GeneratedCharacterSize) -> Self {
        Self {
            mode: ColliderMode::Airborne,
            primary: size.standing,
        }
    }

    pub fn mode(&self) -> ColliderMode {
        self.mode
    }

    /// Collider layout for the current mode
    pub fn shapes(&self, size: &GeneratedCharacterSize) -> CharacterShapes {
        CharacterShapes {
            primary: self.primary,
            primary_edge_radius: COLLIDER_EDGE_RADIUS,
            airborne: size.airborne,
            airborne_enabled: self.mode == ColliderMode::Airborne,
        }
    }

    /// Switch geometry and push it to the body
    pub fn set_mode(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: RigidBodyHandle,
        size: &GeneratedCharacterSize,
        mode: ColliderMode,
    ) {
        match mode {
            ColliderMode::Standing => self.primary = size.standing,
            ColliderMode::Growing => self.primary = size.growing,
            ColliderMode::Airborne => {}
        }
        if self.mode != mode {
            log::debug!("Collider mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        backend.set_character_shapes(body, &self.shapes(size));
    }

    /// Re-push the layout after the size changed
    pub fn reapply(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: RigidBodyHandle,
        size: &GeneratedCharacterSize,
    ) {
        let mode = self.mode;
        if mode == ColliderMode::Airborne {
            self.primary = size.standing;
        }
        self.set_mode(backend, body, size, mode);
    }

    /// Leave growing mode if the standing footprint is clear. Returns whether it did
    pub fn try_stand(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        body: RigidBodyHandle,
        position: Vec2,
        size: &GeneratedCharacterSize,
        mask: CollisionMask,
    ) -> bool {
        if !standing_clear(backend, position, size, mask) {
            return false;
        }
        self.set_mode(backend, body, size, ColliderMode::Standing);
        true
    }
}

/// Whether the standing footprint at `position` is free of solid geometry
pub fn standing_clear(
    backend: &dyn PhysicsBackend,
    position: Vec2,
    size: &GeneratedCharacterSize,
    mask: CollisionMask,
) -> bool {
    !backend.overlap_box(
        position + size.standing.offset,
        size.standing.size - Vec2::splat(SKIN_WIDTH),
        mask,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::SceneWorld;
    use crate::game::character::config::BASE_SIZE;

    fn setup() -> (SceneWorld, RigidBodyHandle, GeneratedCharacterSize, ColliderModeManager) {
        let size = BASE_SIZE.generate();
        let modes = ColliderModeManager::new(&size);
        let mut scene = SceneWorld::new();
        scene.add_ground(0.0, 20.0);
        let body = scene.spawn_character(Vec2::ZERO, &modes.shapes(&size));
        (scene, body, size, modes)
    }

    #[test]
    fn test_starts_airborne() {
        let (scene, body, _, modes) = setup();
        assert_eq!(modes.mode(), ColliderMode::Airborne);
        assert!(scene.character_shapes(body).unwrap().airborne_enabled);
    }

    #[test]
    fn test_exactly_one_mode_active() {
        let (mut scene, body, size, mut modes) = setup();

        modes.set_mode(&mut scene, body, &size, ColliderMode::Growing);
        let shapes = scene.character_shapes(body).unwrap();
        assert!(!shapes.airborne_enabled);
        assert_eq!(shapes.primary, size.growing);

        modes.set_mode(&mut scene, body, &size, ColliderMode::Airborne);
        let shapes = scene.character_shapes(body).unwrap();
        assert!(shapes.airborne_enabled);
        assert_eq!(shapes.primary, size.growing, "airborne keeps the primary box");

        modes.set_mode(&mut scene, body, &size, ColliderMode::Standing);
        let shapes = scene.character_shapes(body).unwrap();
        assert!(!shapes.airborne_enabled);
        assert_eq!(shapes.primary, size.standing);
    }

    #[test]
    fn test_stand_refused_under_ceiling() {
        let (mut scene, body, size, mut modes) = setup();
        // Ceiling above the grown box but inside the standing box
        let ceiling = scene.add_block(Vec2::new(0.0, 1.2), Vec2::new(4.0, 0.2));
        modes.set_mode(&mut scene, body, &size, ColliderMode::Growing);

        assert!(!modes.try_stand(&mut scene, body, Vec2::ZERO, &size, CollisionMask::ENVIRONMENT));
        assert_eq!(modes.mode(), ColliderMode::Growing);

        scene.set_collider_position(ceiling, Vec2::new(0.0, 10.0));
        assert!(modes.try_stand(&mut scene, body, Vec2::ZERO, &size, CollisionMask::ENVIRONMENT));
        assert_eq!(modes.mode(), ColliderMode::Standing);
    }

    #[test]
    fn test_triggers_never_block_standing() {
        let (mut scene, _, size, _) = setup();
        scene.add_trigger(Vec2::new(0.0, 1.0), Vec2::new(4.0, 4.0));
        assert!(standing_clear(&scene, Vec2::ZERO, &size, CollisionMask::ALL));
    }
}
