use super::backend::BoxShape;
use super::collision::CollisionGroups;
use rapier2d::prelude::*;

/// Builder for creating rigid bodies with common configurations
pub struct BodyBuilder {
    body_type: RigidBodyType,
    position: Isometry<Real>,
    gravity_scale: Real,
    can_sleep: bool,
    locked_axes: LockedAxes,
    ccd: bool,
}

impl BodyBuilder {
    fn with_type(body_type: RigidBodyType) -> Self {
        Self {
            body_type,
            position: Isometry::identity(),
            gravity_scale: if body_type == RigidBodyType::Dynamic { 1.0 } else { 0.0 },
            can_sleep: body_type != RigidBodyType::Dynamic,
            locked_axes: LockedAxes::empty(),
            ccd: false,
        }
    }

    /// Create a new dynamic body (affected by forces and collisions)
    pub fn new_dynamic() -> Self {
        Self::with_type(RigidBodyType::Dynamic)
    }

    /// Create a new kinematic position-based body (moved explicitly each step)
    pub fn new_kinematic_position_based() -> Self {
        Self::with_type(RigidBodyType::KinematicPositionBased)
    }

    /// Create a new fixed (static) body
    pub fn new_fixed() -> Self {
        Self::with_type(RigidBodyType::Fixed)
    }

    /// Set the initial position of the body
    pub fn position(mut self, x: Real, y: Real) -> Self {
        self.position = Isometry::translation(x, y);
        self
    }

    /// Set the initial position and rotation
    pub fn position_rotation(mut self, x: Real, y: Real, angle: Real) -> Self {
        self.position = Isometry::new(vector![x, y], angle);
        self
    }

    /// Set the gravity scale (1.0 = normal gravity, 0.0 = no gravity)
    pub fn gravity_scale(mut self, scale: Real) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set whether the body can sleep when inactive
    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    /// Lock rotation (characters stay upright)
    pub fn lock_rotation(mut self) -> Self {
        self.locked_axes = LockedAxes::ROTATION_LOCKED;
        self
    }

    /// Enable continuous collision detection
    pub fn ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    /// Build the rigid body
    pub fn build(self) -> RigidBody {
        RigidBodyBuilder::new(self.body_type)
            .position(self.position)
            .gravity_scale(self.gravity_scale)
            .can_sleep(self.can_sleep)
            .locked_axes(self.locked_axes)
            .ccd_enabled(self.ccd)
            .build()
    }
}

/// Builder for creating colliders with common configurations
pub struct ColliderBuilder2D {
    shape: SharedShape,
    offset: Vector<Real>,
    collision_groups: CollisionGroups,
    is_sensor: bool,
    friction: Real,
    density: Real,
    enabled: bool,
}

/// Vertical capsule fitting inside `width` x `height`
pub fn capsule_shape(width: Real, height: Real) -> SharedShape {
    let radius = width / 2.0;
    let half_segment = (height / 2.0 - radius).max(0.0);
    SharedShape::capsule_y(half_segment, radius)
}

impl ColliderBuilder2D {
    fn with_shape(shape: SharedShape) -> Self {
        Self {
            shape,
            offset: Vector::zeros(),
            collision_groups: CollisionGroups::Default,
            is_sensor: false,
            friction: 0.5,
            density: 1.0,
            enabled: true,
        }
    }

    /// Create a box-shaped collider
    pub fn box_shape(half_width: Real, half_height: Real) -> Self {
        Self::with_shape(SharedShape::cuboid(half_width, half_height))
    }

    /// Create a box with rounded corners; `half_width`/`half_height` exclude the rounding
    pub fn round_box(half_width: Real, half_height: Real, border_radius: Real) -> Self {
        Self::with_shape(SharedShape::round_cuboid(half_width, half_height, border_radius))
    }

    /// Create a vertical capsule fitting inside `width` x `height`
    pub fn capsule(width: Real, height: Real) -> Self {
        Self::with_shape(capsule_shape(width, height))
    }

    /// Offset the collider from its parent body
    pub fn offset(mut self, x: Real, y: Real) -> Self {
        self.offset = vector![x, y];
        self
    }

    /// Set the collision groups for filtering
    pub fn collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.collision_groups = groups;
        self
    }

    /// Make this a sensor (detects overlaps but doesn't cause physical response)
    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    /// Set friction coefficient
    pub fn friction(mut self, friction: Real) -> Self {
        self.friction = friction;
        self
    }

    /// Set density (mass will be calculated from shape area)
    pub fn density(mut self, density: Real) -> Self {
        self.density = density;
        self
    }

    /// Start enabled or disabled
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Build the collider
    pub fn build(self) -> Collider {
        let mut collider = ColliderBuilder::new(self.shape)
            .translation(self.offset)
            .collision_groups(self.collision_groups.to_interaction_groups())
            .sensor(self.is_sensor)
            .friction(self.friction)
            .density(self.density)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        collider.set_enabled(self.enabled);
        collider
    }
}

/// Common configurations for controller scenes
pub mod presets {
    use super::*;

    /// Character body: dynamic, upright, never sleeps
    pub fn character_body(x: Real, y: Real) -> RigidBody {
        BodyBuilder::new_dynamic()
            .position(x, y)
            .lock_rotation()
            .can_sleep(false)
            .ccd(true)
            .build()
    }

    /// Character primary box collider (rounded, frictionless)
    pub fn character_primary_collider(shape: &BoxShape, edge_radius: Real) -> Collider {
        let half = shape.half_extents();
        ColliderBuilder2D::round_box(half.x, half.y, edge_radius)
            .offset(shape.offset.x, shape.offset.y)
            .collision_groups(CollisionGroups::Player)
            .friction(0.0)
            .build()
    }

    /// Character airborne capsule collider
    pub fn character_airborne_collider(shape: &BoxShape, enabled: bool) -> Collider {
        ColliderBuilder2D::capsule(shape.size.x, shape.size.y)
            .offset(shape.offset.x, shape.offset.y)
            .collision_groups(CollisionGroups::Player)
            .friction(0.0)
            .enabled(enabled)
            .build()
    }

    /// Static ground body
    pub fn ground_body(x: Real, y: Real, angle: Real) -> RigidBody {
        BodyBuilder::new_fixed().position_rotation(x, y, angle).build()
    }

    /// Static ground collider (box shape)
    pub fn ground_collider(width: Real, height: Real) -> Collider {
        ColliderBuilder2D::box_shape(width / 2.0, height / 2.0)
            .collision_groups(CollisionGroups::Platform)
            .friction(0.3)
            .build()
    }

    /// Moving platform body, positioned explicitly every step
    pub fn mover_body(x: Real, y: Real) -> RigidBody {
        BodyBuilder::new_kinematic_position_based()
            .position(x, y)
            .build()
    }

    /// Moving platform collider
    pub fn mover_collider(width: Real, height: Real) -> Collider {
        ColliderBuilder2D::box_shape(width / 2.0, height / 2.0)
            .collision_groups(CollisionGroups::Mover)
            .friction(0.3)
            .build()
    }

    /// Trigger volume (detects but doesn't block)
    pub fn trigger_collider(width: Real, height: Real) -> Collider {
        ColliderBuilder2D::box_shape(width / 2.0, height / 2.0)
            .collision_groups(CollisionGroups::Trigger)
            .sensor(true)
            .build()
    }
}
