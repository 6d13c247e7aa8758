// Deterministic shape-query world
//
// Static and explicitly positioned colliders answered with parry2d queries.
// Bodies integrate gravity, constant force and velocity with semi-implicit
// Euler and have no collision response, so a tick's outcome depends only on
// what the controller asked for.

use glam::Vec2;
use parry2d::math::{Isometry, Point, Vector};
use parry2d::query::{self, Ray};
use parry2d::shape::{Cuboid, SharedShape};

use super::backend::{
    BodyState, CharacterShapes, ColliderHandle, PhysicsBackend, RayHit, RigidBodyHandle,
    TriggerEvent,
};
use super::collision::{CollisionGroups, CollisionMask};

/// A collider placed in the scene
#[derive(Clone)]
struct SceneCollider {
    shape: SharedShape,
    position: Vec2,
    angle: f32,
    group: CollisionGroups,
    sensor: bool,
}

impl SceneCollider {
    fn isometry(&self) -> Isometry<f32> {
        Isometry::new(Vector::new(self.position.x, self.position.y), self.angle)
    }
}

/// A character body
#[derive(Debug, Clone)]
struct SceneBody {
    position: Vec2,
    rotation: f32,
    velocity: Vec2,
    mass: f32,
    gravity_scale: f32,
    constant_force: Vec2,
    simulated: bool,
    shapes: CharacterShapes,
    /// Triggers overlapped after the last step
    touching: Vec<ColliderHandle>,
}

/// Physics backend made of plain shape queries
pub struct SceneWorld {
    gravity: Vec2,
    colliders: Vec<SceneCollider>,
    bodies: Vec<SceneBody>,
    pending_triggers: Vec<TriggerEvent>,
}

impl SceneWorld {
    pub fn new() -> Self {
        Self::with_gravity(Vec2::new(0.0, -9.81))
    }

    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            colliders: Vec::new(),
            bodies: Vec::new(),
            pending_triggers: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn insert(&mut self, collider: SceneCollider) -> ColliderHandle {
        self.colliders.push(collider);
        ColliderHandle::from_raw_parts(self.colliders.len() as u32 - 1, 0)
    }

    fn add_box(
        &mut self,
        center: Vec2,
        size: Vec2,
        angle: f32,
        group: CollisionGroups,
        sensor: bool,
    ) -> ColliderHandle {
        let half = size * 0.5;
        self.insert(SceneCollider {
            shape: SharedShape::cuboid(half.x, half.y),
            position: center,
            angle,
            group,
            sensor,
        })
    }

    /// Flat ground whose top surface sits at `top`
    pub fn add_ground(&mut self, top: f32, width: f32) -> ColliderHandle {
        self.add_box(
            Vec2::new(0.0, top - 0.5),
            Vec2::new(width, 1.0),
            0.0,
            CollisionGroups::Platform,
            false,
        )
    }

    /// Solid box, e.g. a wall or a ceiling
    pub fn add_block(&mut self, center: Vec2, size: Vec2) -> ColliderHandle {
        self.add_box(center, size, 0.0, CollisionGroups::Platform, false)
    }

    /// Slab rotated by `angle_deg` whose top surface passes through `surface_point`
    pub fn add_slope(&mut self, surface_point: Vec2, angle_deg: f32, length: f32) -> ColliderHandle {
        let angle = angle_deg.to_radians();
        let normal = Vec2::new(-angle.sin(), angle.cos());
        self.add_box(
            surface_point - normal * 0.5,
            Vec2::new(length, 1.0),
            angle,
            CollisionGroups::Platform,
            false,
        )
    }

    /// Solid platform in the mover group, repositioned with [`SceneWorld::set_collider_position`]
    pub fn add_mover(&mut self, center: Vec2, size: Vec2) -> ColliderHandle {
        self.add_box(center, size, 0.0, CollisionGroups::Mover, false)
    }

    /// Trigger volume
    pub fn add_trigger(&mut self, center: Vec2, size: Vec2) -> ColliderHandle {
        self.add_box(center, size, 0.0, CollisionGroups::Trigger, true)
    }

    /// Move a collider (platforms, triggers)
    pub fn set_collider_position(&mut self, collider: ColliderHandle, position: Vec2) {
        if let Some(collider) = self.collider_mut(collider) {
            collider.position = position;
        }
    }

    pub fn collider_position(&self, collider: ColliderHandle) -> Option<Vec2> {
        self.collider(collider).map(|collider| collider.position)
    }

    /// Spawn a character body with unit mass
    pub fn spawn_character(&mut self, position: Vec2, shapes: &CharacterShapes) -> RigidBodyHandle {
        self.bodies.push(SceneBody {
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            mass: 1.0,
            gravity_scale: 1.0,
            constant_force: Vec2::ZERO,
            simulated: true,
            shapes: *shapes,
            touching: Vec::new(),
        });
        RigidBodyHandle::from_raw_parts(self.bodies.len() as u32 - 1, 0)
    }

    pub fn set_mass(&mut self, body: RigidBodyHandle, mass: f32) {
        if let Some(body) = self.body_mut(body) {
            body.mass = mass.max(f32::EPSILON);
        }
    }

    pub fn gravity_scale(&self, body: RigidBodyHandle) -> Option<f32> {
        self.body(body).map(|body| body.gravity_scale)
    }

    pub fn constant_force(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.body(body).map(|body| body.constant_force)
    }

    pub fn is_simulated(&self, body: RigidBodyHandle) -> Option<bool> {
        self.body(body).map(|body| body.simulated)
    }

    pub fn character_shapes(&self, body: RigidBodyHandle) -> Option<CharacterShapes> {
        self.body(body).map(|body| body.shapes)
    }

    fn collider(&self, handle: ColliderHandle) -> Option<&SceneCollider> {
        self.colliders.get(handle.into_raw_parts().0 as usize)
    }

    fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut SceneCollider> {
        self.colliders.get_mut(handle.into_raw_parts().0 as usize)
    }

    fn body(&self, handle: RigidBodyHandle) -> Option<&SceneBody> {
        self.bodies.get(handle.into_raw_parts().0 as usize)
    }

    fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut SceneBody> {
        self.bodies.get_mut(handle.into_raw_parts().0 as usize)
    }

    fn solids(&self, mask: CollisionMask) -> impl Iterator<Item = (usize, &SceneCollider)> {
        self.colliders
            .iter()
            .enumerate()
            .filter(move |(_, collider)| !collider.sensor && mask.contains(collider.group))
    }

    /// Triggers overlapping the primary box of `body`
    fn overlapped_triggers(&self, body: &SceneBody) -> Vec<ColliderHandle> {
        let primary = body.shapes.primary;
        let half = primary.half_extents() + Vec2::splat(body.shapes.primary_edge_radius);
        let center = body.position + primary.offset;
        let footprint = Cuboid::new(Vector::new(half.x, half.y));
        let footprint_pos = Isometry::translation(center.x, center.y);

        self.colliders
            .iter()
            .enumerate()
            .filter(|(_, collider)| collider.sensor)
            .filter(|(_, collider)| {
                query::intersection_test(
                    &footprint_pos,
                    &footprint,
                    &collider.isometry(),
                    &*collider.shape,
                )
                .unwrap_or(false)
            })
            .map(|(index, _)| ColliderHandle::from_raw_parts(index as u32, 0))
            .collect()
    }

    fn update_triggers(&mut self) {
        for index in 0..self.bodies.len() {
            let now = self.overlapped_triggers(&self.bodies[index]);
            let handle = RigidBodyHandle::from_raw_parts(index as u32, 0);
            let body = &mut self.bodies[index];

            for trigger in body.touching.iter().filter(|t| !now.contains(t)) {
                self.pending_triggers.push(TriggerEvent {
                    body: handle,
                    trigger: *trigger,
                    entered: false,
                });
            }
            for trigger in now.iter().filter(|t| !body.touching.contains(t)) {
                self.pending_triggers.push(TriggerEvent {
                    body: handle,
                    trigger: *trigger,
                    entered: true,
                });
            }

            body.touching = now;
        }
    }
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for SceneWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let ray = Ray::new(
            Point::new(origin.x, origin.y),
            Vector::new(direction.x, direction.y),
        );

        self.solids(mask)
            .filter_map(|(index, collider)| {
                let pos = collider.isometry();
                if collider.shape.contains_point(&pos, &ray.origin) {
                    return None;
                }
                collider
                    .shape
                    .cast_ray_and_get_normal(&pos, &ray, max_distance, true)
                    .map(|hit| (index, hit))
            })
            .min_by(|(_, a), (_, b)| a.time_of_impact.total_cmp(&b.time_of_impact))
            .map(|(index, hit)| {
                let point = ray.point_at(hit.time_of_impact);
                RayHit {
                    distance: hit.time_of_impact,
                    normal: Vec2::new(hit.normal.x, hit.normal.y),
                    point: Vec2::new(point.x, point.y),
                    collider: ColliderHandle::from_raw_parts(index as u32, 0),
                }
            })
    }

    fn overlap_box(&self, center: Vec2, size: Vec2, mask: CollisionMask) -> bool {
        let half = (size * 0.5).max(Vec2::splat(0.0001));
        let probe = Cuboid::new(Vector::new(half.x, half.y));
        let probe_pos = Isometry::translation(center.x, center.y);

        self.solids(mask).any(|(_, collider)| {
            query::intersection_test(&probe_pos, &probe, &collider.isometry(), &*collider.shape)
                .unwrap_or(false)
        })
    }

    fn body_state(&self, body: RigidBodyHandle) -> Option<BodyState> {
        self.body(body).map(|body| BodyState {
            position: body.position,
            rotation: body.rotation,
            velocity: body.velocity,
            mass: body.mass,
        })
    }

    fn set_velocity(&mut self, body: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.body_mut(body) {
            body.velocity = velocity;
        }
    }

    fn set_position(&mut self, body: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.body_mut(body) {
            body.position = position;
        }
    }

    fn set_rotation(&mut self, body: RigidBodyHandle, rotation: f32) {
        if let Some(body) = self.body_mut(body) {
            body.rotation = rotation;
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec2) {
        if let Some(body) = self.body_mut(body) {
            if body.simulated {
                body.velocity += impulse / body.mass;
            }
        }
    }

    fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32) {
        if let Some(body) = self.body_mut(body) {
            body.gravity_scale = scale;
        }
    }

    fn set_constant_force(&mut self, body: RigidBodyHandle, force: Vec2) {
        if let Some(body) = self.body_mut(body) {
            body.constant_force = force;
        }
    }

    fn set_simulated(&mut self, body: RigidBodyHandle, simulated: bool) {
        if let Some(body) = self.body_mut(body) {
            body.simulated = simulated;
            if !simulated {
                body.constant_force = Vec2::ZERO;
            }
        }
    }

    fn set_character_shapes(&mut self, body: RigidBodyHandle, shapes: &CharacterShapes) {
        if let Some(body) = self.body_mut(body) {
            body.shapes = *shapes;
        }
    }

    fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut().filter(|body| body.simulated) {
            let acceleration = gravity * body.gravity_scale + body.constant_force / body.mass;
            body.velocity += acceleration * dt;
            body.position += body.velocity * dt;
        }

        self.update_triggers();
    }

    fn take_trigger_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.pending_triggers)
    }
}
