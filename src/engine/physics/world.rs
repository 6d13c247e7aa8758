use glam::Vec2;
use rapier2d::prelude::*;
use std::collections::HashMap;

use super::backend::{BodyState, CharacterShapes, PhysicsBackend, RayHit, TriggerEvent};
use super::body::{capsule_shape, presets};
use super::collision::{CollisionEvent, CollisionEventQueue, CollisionMask};

/// Colliders owned by a character body
#[derive(Debug, Clone, Copy)]
struct CharacterColliders {
    primary: ColliderHandle,
    airborne: ColliderHandle,
}

/// Physics world backed by rapier2d
pub struct PhysicsWorld {
    /// Gravity vector (default: -9.81 m/s² in y-axis)
    gravity: Vector<Real>,

    /// Integration parameters for the physics simulation
    integration_parameters: IntegrationParameters,

    /// Physics pipeline handles collision detection and solving
    physics_pipeline: PhysicsPipeline,

    /// Island manager for sleeping bodies
    island_manager: IslandManager,

    /// Broad phase collision detection
    broad_phase: DefaultBroadPhase,

    /// Narrow phase collision detection
    narrow_phase: NarrowPhase,

    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver for fast-moving objects
    ccd_solver: CCDSolver,

    /// Query pipeline for raycasts and overlap tests
    query_pipeline: QueryPipeline,

    /// Rigid body set
    rigid_body_set: RigidBodySet,

    /// Collider set
    collider_set: ColliderSet,

    /// Collision event handler
    collision_event_queue: CollisionEventQueue,

    /// Character bodies and their colliders
    characters: HashMap<RigidBodyHandle, CharacterColliders>,

    /// Trigger events waiting to be taken
    pending_triggers: Vec<TriggerEvent>,

    /// Velocity of frozen bodies, restored when they resume
    frozen_velocities: HashMap<RigidBodyHandle, Vector<Real>>,
}

impl PhysicsWorld {
    /// Create a new physics world with default settings
    pub fn new() -> Self {
        Self::with_gravity(Vec2::new(0.0, -9.81))
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            collision_event_queue: CollisionEventQueue::new(),
            characters: HashMap::new(),
            pending_triggers: Vec::new(),
            frozen_velocities: HashMap::new(),
        }
    }

    /// Add a rigid body to the physics world
    pub fn add_rigid_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.rigid_body_set.insert(body)
    }

    /// Add a collider attached to a rigid body
    pub fn add_collider(
        &mut self,
        collider: Collider,
        parent_handle: RigidBodyHandle,
    ) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, parent_handle, &mut self.rigid_body_set)
    }

    /// Spawn a character body with its primary and airborne colliders
    pub fn spawn_character(&mut self, position: Vec2, shapes: &CharacterShapes) -> RigidBodyHandle {
        let body = self.add_rigid_body(presets::character_body(position.x, position.y));
        let primary = self.add_collider(
            presets::character_primary_collider(&shapes.primary, shapes.primary_edge_radius),
            body,
        );
        let airborne = self.add_collider(
            presets::character_airborne_collider(&shapes.airborne, shapes.airborne_enabled),
            body,
        );
        self.characters
            .insert(body, CharacterColliders { primary, airborne });
        self.refresh_queries();
        body
    }

    /// Add a static ground box, rotated by `angle` radians
    pub fn add_ground(&mut self, center: Vec2, size: Vec2, angle: f32) -> ColliderHandle {
        let body = self.add_rigid_body(presets::ground_body(center.x, center.y, angle));
        let collider = self.add_collider(presets::ground_collider(size.x, size.y), body);
        self.refresh_queries();
        collider
    }

    /// Add a kinematic moving platform
    pub fn add_mover(&mut self, center: Vec2, size: Vec2) -> (RigidBodyHandle, ColliderHandle) {
        let body = self.add_rigid_body(presets::mover_body(center.x, center.y));
        let collider = self.add_collider(presets::mover_collider(size.x, size.y), body);
        self.refresh_queries();
        (body, collider)
    }

    /// Add a trigger volume
    pub fn add_trigger(&mut self, center: Vec2, size: Vec2) -> ColliderHandle {
        let body = self.add_rigid_body(presets::ground_body(center.x, center.y, 0.0));
        let collider = self.add_collider(presets::trigger_collider(size.x, size.y), body);
        self.refresh_queries();
        collider
    }

    /// Move a kinematic platform to `position` during the next step
    pub fn set_mover_position(&mut self, body: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.set_next_kinematic_translation(vector![position.x, position.y]);
        }
    }

    /// Remove a rigid body and all its attached colliders
    pub fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.characters.remove(&handle);
        self.frozen_velocities.remove(&handle);
    }

    /// Get a reference to a rigid body
    pub fn get_rigid_body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.rigid_body_set.get(handle)
    }

    /// Get a mutable reference to a rigid body
    pub fn get_rigid_body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(handle)
    }

    /// Get a reference to a collider
    pub fn get_collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    /// Rebuild the query acceleration structure after adding colliders
    pub fn refresh_queries(&mut self) {
        self.query_pipeline
            .update(&self.rigid_body_set, &self.collider_set);
    }

    /// Get current gravity
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    /// Set gravity for the physics world
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = vector![gravity.x, gravity.y];
    }

    fn solid_filter<'a>(mask: CollisionMask) -> QueryFilter<'a> {
        QueryFilter::default()
            .exclude_sensors()
            .groups(mask.to_query_groups())
    }

    /// Turn raw sensor contacts into character trigger events
    fn collect_trigger_events(&mut self) {
        for event in self.collision_event_queue.drain() {
            let (a, b, entered) = match event {
                CollisionEvent::Started { collider1, collider2 } => (collider1, collider2, true),
                CollisionEvent::Stopped { collider1, collider2 } => (collider1, collider2, false),
            };

            let Some((body, trigger)) = self
                .character_and_trigger(a, b)
                .or_else(|| self.character_and_trigger(b, a))
            else {
                continue;
            };

            self.pending_triggers.push(TriggerEvent {
                body,
                trigger,
                entered,
            });
        }
    }

    fn character_and_trigger(
        &self,
        character: ColliderHandle,
        trigger: ColliderHandle,
    ) -> Option<(RigidBodyHandle, ColliderHandle)> {
        let body = self.collider_set.get(character)?.parent()?;
        let colliders = self.characters.get(&body)?;
        // Only the primary collider reports, so mode swaps don't fake enter/exit pairs
        if colliders.primary != character {
            return None;
        }
        self.collider_set
            .get(trigger)
            .filter(|collider| collider.is_sensor())
            .map(|_| (body, trigger))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: CollisionMask,
    ) -> Option<RayHit> {
        let ray = Ray::new(point![origin.x, origin.y], vector![direction.x, direction.y]);
        // Rays starting inside a collider ignore it
        let outside = |_: ColliderHandle, collider: &Collider| {
            !collider
                .shape()
                .contains_point(collider.position(), &ray.origin)
        };
        let (collider, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            Self::solid_filter(mask).predicate(&outside),
        )?;
        let point = ray.point_at(hit.time_of_impact);

        Some(RayHit {
            distance: hit.time_of_impact,
            normal: Vec2::new(hit.normal.x, hit.normal.y),
            point: Vec2::new(point.x, point.y),
            collider,
        })
    }

    fn overlap_box(&self, center: Vec2, size: Vec2, mask: CollisionMask) -> bool {
        let half = (size * 0.5).max(Vec2::splat(0.0001));
        let shape = Cuboid::new(vector![half.x, half.y]);
        self.query_pipeline
            .intersection_with_shape(
                &self.rigid_body_set,
                &self.collider_set,
                &Isometry::translation(center.x, center.y),
                &shape,
                Self::solid_filter(mask),
            )
            .is_some()
    }

    fn body_state(&self, body: RigidBodyHandle) -> Option<BodyState> {
        let body = self.rigid_body_set.get(body)?;
        let position = body.translation();
        let velocity = body.linvel();
        Some(BodyState {
            position: Vec2::new(position.x, position.y),
            rotation: body.rotation().angle(),
            velocity: Vec2::new(velocity.x, velocity.y),
            mass: body.mass(),
        })
    }

    fn set_velocity(&mut self, body: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    fn set_position(&mut self, body: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.set_translation(vector![position.x, position.y], true);
        }
    }

    fn set_rotation(&mut self, body: RigidBodyHandle, rotation: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.set_rotation(Rotation::new(rotation), true);
        }
    }

    fn apply_impulse(&mut self, body: RigidBodyHandle, impulse: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    fn set_gravity_scale(&mut self, body: RigidBodyHandle, scale: f32) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.set_gravity_scale(scale, true);
        }
    }

    fn set_constant_force(&mut self, body: RigidBodyHandle, force: Vec2) {
        if let Some(body) = self.rigid_body_set.get_mut(body) {
            body.reset_forces(true);
            body.add_force(vector![force.x, force.y], true);
        }
    }

    fn set_simulated(&mut self, body: RigidBodyHandle, simulated: bool) {
        let Some(rigid_body) = self.rigid_body_set.get_mut(body) else {
            return;
        };
        if simulated {
            if !rigid_body.is_dynamic() {
                rigid_body.set_body_type(RigidBodyType::Dynamic, true);
                if let Some(velocity) = self.frozen_velocities.remove(&body) {
                    rigid_body.set_linvel(velocity, true);
                }
            }
        } else if rigid_body.is_dynamic() {
            self.frozen_velocities.insert(body, *rigid_body.linvel());
            rigid_body.reset_forces(false);
            rigid_body.set_linvel(Vector::zeros(), false);
            rigid_body.set_body_type(RigidBodyType::KinematicPositionBased, false);
        }
    }

    fn set_character_shapes(&mut self, body: RigidBodyHandle, shapes: &CharacterShapes) {
        let Some(colliders) = self.characters.get(&body).copied() else {
            log::warn!("set_character_shapes on unknown character body {:?}", body);
            return;
        };

        if let Some(primary) = self.collider_set.get_mut(colliders.primary) {
            let half = shapes.primary.half_extents();
            primary.set_shape(SharedShape::round_cuboid(
                half.x,
                half.y,
                shapes.primary_edge_radius,
            ));
            primary.set_translation_wrt_parent(vector![
                shapes.primary.offset.x,
                shapes.primary.offset.y
            ]);
        }

        if let Some(airborne) = self.collider_set.get_mut(colliders.airborne) {
            airborne.set_shape(capsule_shape(shapes.airborne.size.x, shapes.airborne.size.y));
            airborne.set_translation_wrt_parent(vector![
                shapes.airborne.offset.x,
                shapes.airborne.offset.y
            ]);
            airborne.set_enabled(shapes.airborne_enabled);
        }
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.collision_event_queue,
        );

        self.collect_trigger_events();
    }

    fn take_trigger_events(&mut self) -> Vec<TriggerEvent> {
        std::mem::take(&mut self.pending_triggers)
    }
}
