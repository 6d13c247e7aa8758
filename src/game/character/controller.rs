// Character controller: one fixed tick of grounding, jumping and movement

use glam::Vec2;
use std::rc::Rc;

use super::collider_mode::{standing_clear, ColliderMode, ColliderModeManager};
use super::config::{ControllerConfig, GeneratedCharacterSize};
use super::ground::{GroundDetector, GroundProbe, GroundTransition};
use super::jump::{JumpPhase, JumpStateMachine, GROW_JUMP_MULTIPLIER};
use super::platforms::{CapabilityRegistry, PlatformTracker};
use super::state::{ControllerState, ControllerStateStore};
use super::velocity::{extra_gravity, MotionInput, VelocitySolver};
use super::ControllerError;
use crate::core::math::angle_between_deg;
use crate::engine::events::{ControllerEvent, EventBus, JumpKind, ListenerId};
use crate::engine::input::FrameInput;
use crate::engine::physics::{CharacterShapes, ColliderHandle, PhysicsBackend, RigidBodyHandle};

/// Kinematic controller driving one character body
///
/// Call [`CharacterController::tick_update`] whenever input is sampled and
/// [`CharacterController::fixed_update`] once per fixed step, before the
/// physics backend steps.
#[derive(Debug)]
pub struct CharacterController {
    body: RigidBodyHandle,
    config: ControllerConfig,
    size: GeneratedCharacterSize,
    active: bool,

    // Frame data
    up: Vec2,
    right: Vec2,
    frame_position: Vec2,
    frame_rotation: f32,
    frame_mass: f32,
    velocity: Vec2,
    trimmed_velocity: Vec2,
    frame_direction: Vec2,
    ground_normal: Vec2,
    has_input: bool,
    input: FrameInput,
    time: f32,
    force_this_frame: Vec2,

    // Growing
    growing: bool,
    time_started_growing: f32,

    ground: GroundDetector,
    colliders: ColliderModeManager,
    jump: JumpStateMachine,
    solver: VelocitySolver,
    platforms: PlatformTracker,
    state: ControllerStateStore,
    events: EventBus,
}

impl CharacterController {
    /// Collider layout to spawn a character body with
    pub fn initial_shapes(config: &ControllerConfig) -> CharacterShapes {
        let size = config.character_size.generate();
        ColliderModeManager::new(&size).shapes(&size)
    }

    /// Take control of an existing body
    pub fn new(
        body: RigidBodyHandle,
        config: ControllerConfig,
        backend: &mut dyn PhysicsBackend,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let body_state = backend
            .body_state(body)
            .ok_or(ControllerError::MissingBody(body))?;

        let size = config.character_size.generate();
        let colliders = ColliderModeManager::new(&size);
        backend.set_character_shapes(body, &colliders.shapes(&size));

        let mut state = ControllerStateStore::new();
        state.capture(ControllerState {
            position: body_state.position,
            rotation: body_state.rotation,
            velocity: body_state.velocity,
            grounded: false,
        });

        log::info!("Character controller attached to body {:?}", body);

        Ok(Self {
            body,
            config,
            size,
            active: true,
            up: Vec2::Y,
            right: Vec2::X,
            frame_position: body_state.position,
            frame_rotation: body_state.rotation,
            frame_mass: body_state.mass,
            velocity: body_state.velocity,
            trimmed_velocity: Vec2::new(body_state.velocity.x, 0.0),
            frame_direction: Vec2::ZERO,
            ground_normal: Vec2::Y,
            has_input: false,
            input: FrameInput::default(),
            time: 0.0,
            force_this_frame: Vec2::ZERO,
            growing: false,
            time_started_growing: 0.0,
            ground: GroundDetector::new(),
            colliders,
            jump: JumpStateMachine::new(),
            solver: VelocitySolver::new(),
            platforms: PlatformTracker::new(),
            state,
            events: EventBus::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Loop
    // ---------------------------------------------------------------------

    /// Hand over freshly sampled input
    pub fn tick_update(&mut self, input: FrameInput, time: f32) {
        self.time = time;
        self.input = input.sanitized(self.config.horizontal_dead_zone, self.config.vertical_dead_zone);

        if input.jump_down && self.active {
            self.jump.request(time);
        }
    }

    /// Run one fixed tick
    pub fn fixed_update(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        registry: &CapabilityRegistry,
        dt: f32,
        time: f32,
    ) {
        self.time = time;
        if !self.active {
            self.jump.discard_press();
            return;
        }
        if dt <= 0.0 {
            return;
        }

        self.remove_transient_velocity(backend);
        if !self.set_frame_data(backend) {
            log::warn!("Character body {:?} missing from backend", self.body);
            return;
        }

        self.calculate_collisions(backend);
        self.calculate_direction();
        self.calculate_jump(backend);

        self.calculate_external_modifiers(dt);

        self.trace_ground(registry, dt);
        self.apply_movement(backend, dt);

        self.calculate_grow(backend);

        self.clean_frame_data();
        self.save_state();
    }

    fn remove_transient_velocity(&mut self, backend: &mut dyn PhysicsBackend) {
        let Some(body) = backend.body_state(self.body) else {
            return;
        };
        let stripped = self
            .solver
            .remove_transient(body.velocity, self.config.external_velocity_decay);
        self.set_velocity(backend, stripped);
    }

    fn set_frame_data(&mut self, backend: &dyn PhysicsBackend) -> bool {
        let Some(body) = backend.body_state(self.body) else {
            return false;
        };

        self.frame_rotation = body.rotation;
        self.up = Vec2::new(-body.rotation.sin(), body.rotation.cos());
        self.right = Vec2::new(self.up.y, -self.up.x);
        self.frame_position = body.position;
        self.frame_mass = body.mass;

        self.has_input = self.input.move_axis.x != 0.0;

        self.velocity = body.velocity;
        self.trimmed_velocity = Vec2::new(self.velocity.x, 0.0);
        true
    }

    fn clean_frame_data(&mut self) {
        self.jump.end_frame();
        self.force_this_frame = Vec2::ZERO;
    }

    fn save_state(&mut self) {
        self.state.capture(ControllerState {
            position: self.frame_position,
            rotation: self.frame_rotation,
            velocity: self.velocity,
            grounded: self.ground.is_grounded(),
        });
    }

    // ---------------------------------------------------------------------
    // Collisions
    // ---------------------------------------------------------------------

    fn calculate_collisions(&mut self, backend: &mut dyn PhysicsBackend) {
        let probe = GroundProbe {
            position: self.frame_position,
            up: self.up,
            right: self.right,
            mask: self.config.collision_mask,
            max_walkable_slope: self.config.max_walkable_slope,
        };

        match self.ground.detect(backend, &probe, &self.size) {
            Some(GroundTransition::Landed) => self.on_landed(backend),
            Some(GroundTransition::Left) => self.on_left_ground(backend),
            None => {}
        }
    }

    fn on_landed(&mut self, backend: &mut dyn PhysicsBackend) {
        let impact = self.velocity.y.abs();
        self.events.emit(ControllerEvent::GroundedChanged {
            grounded: true,
            impact,
        });

        backend.set_gravity_scale(self.body, 0.0);
        self.set_velocity(backend, self.trimmed_velocity);
        backend.set_constant_force(self.body, Vec2::ZERO);
        self.ground.set_step_down_length(self.size.step_height);
        self.jump.on_landed(&self.config);
        self.colliders
            .set_mode(backend, self.body, &self.size, ColliderMode::Standing);
    }

    fn on_left_ground(&mut self, backend: &mut dyn PhysicsBackend) {
        self.events.emit(ControllerEvent::GroundedChanged {
            grounded: false,
            impact: 0.0,
        });

        self.jump.on_left_ground(self.time);
        backend.set_gravity_scale(self.body, 1.0);
        self.colliders
            .set_mode(backend, self.body, &self.size, ColliderMode::Airborne);
    }

    // ---------------------------------------------------------------------
    // Direction
    // ---------------------------------------------------------------------

    fn calculate_direction(&mut self) {
        let mut direction = Vec2::new(self.input.move_axis.x, 0.0);

        if let Some(hit) = self.ground.hit().filter(|_| self.ground.is_grounded()) {
            self.ground_normal = hit.normal;
            let angle = angle_between_deg(self.ground_normal, self.up);
            if angle < self.config.max_walkable_slope && self.ground_normal.y != 0.0 {
                direction.y = direction.x * -self.ground_normal.x / self.ground_normal.y;
            }
        }

        self.frame_direction = direction.normalize_or_zero();
    }

    // ---------------------------------------------------------------------
    // Jump
    // ---------------------------------------------------------------------

    fn calculate_jump(&mut self, backend: &mut dyn PhysicsBackend) {
        let grounded = self.ground.is_grounded();

        if self.jump.wants_jump(self.time, &self.config)
            && standing_clear(backend, self.frame_position, &self.size, self.config.collision_mask)
        {
            if let Some(kind) = self.jump.select(grounded, self.time, &self.config) {
                self.execute_jump(backend, kind);
            }
        }

        self.jump
            .update_early_release(grounded, self.input.jump_held, self.velocity.y);
    }

    fn execute_jump(&mut self, backend: &mut dyn PhysicsBackend, kind: JumpKind) {
        self.set_velocity(backend, self.trimmed_velocity);
        self.jump.execute(kind, self.time);
        self.ground.set_step_down_length(0.0);

        let multiplier = if self.growing { GROW_JUMP_MULTIPLIER } else { 1.0 };
        self.force_this_frame += Vec2::new(0.0, self.config.jump_power * multiplier);

        self.events.emit(ControllerEvent::Jumped(kind));
    }

    // ---------------------------------------------------------------------
    // Growing
    // ---------------------------------------------------------------------

    fn calculate_grow(&mut self, backend: &mut dyn PhysicsBackend) {
        if self.input.grow && !self.growing {
            self.growing = true;
            self.time_started_growing = self.time;
            self.colliders
                .set_mode(backend, self.body, &self.size, ColliderMode::Growing);
        } else if !self.input.grow && self.growing {
            // Stays grown until there is room to stand
            if self.colliders.try_stand(
                backend,
                self.body,
                self.frame_position,
                &self.size,
                self.config.collision_mask,
            ) {
                self.growing = false;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Move
    // ---------------------------------------------------------------------

    fn calculate_external_modifiers(&mut self, dt: f32) {
        let target = self.platforms.modifier_target(self.ground.is_grounded());
        self.solver.blend_modifier(target, dt);
    }

    fn trace_ground(&mut self, registry: &CapabilityRegistry, dt: f32) {
        let mut current_platform = None;

        if self.ground.is_grounded() && !self.jump.within_clearance(self.time) {
            if let Some(hit) = self.ground.hit().copied() {
                self.solver.ground_correction(
                    self.size.step_height - hit.distance,
                    self.up,
                    self.config.position_correction_mode,
                    dt,
                );

                if let Some(mover) = registry.mover(hit.collider) {
                    self.platforms.activate_mover(hit.collider, Rc::clone(&mover));
                    current_platform = Some((hit.collider, mover));
                }
            }
        }

        if let Some(takeoff) = self.platforms.set_grounded_platform(current_platform) {
            self.solver
                .add_takeoff(takeoff, self.config.negative_y_velocity_negation);
        }

        let carried = self.platforms.carried_velocity(self.frame_position, dt);
        self.solver.add_platform_velocity(carried);
    }

    fn apply_movement(&mut self, backend: &mut dyn PhysicsBackend, dt: f32) {
        if self.force_this_frame != Vec2::ZERO {
            let transient = self.additional_frame_velocity(backend);
            backend.set_velocity(self.body, self.velocity + transient);
            backend.apply_impulse(self.body, self.force_this_frame * self.frame_mass);
            return;
        }

        let grounded = self.ground.is_grounded();
        let gravity = extra_gravity(
            grounded,
            self.jump.ended_jump_early(),
            self.velocity.y,
            &self.config,
        );
        backend.set_constant_force(self.body, gravity * self.frame_mass);

        let motion = MotionInput {
            velocity: self.velocity,
            direction: self.frame_direction,
            has_input: self.has_input,
            grounded,
            growing_for: self.growing.then(|| self.time - self.time_started_growing),
            dt,
        };
        let target = self.solver.target_velocity(&motion, &self.config);
        let transient = self.additional_frame_velocity(backend);

        let velocity = self.solver.apply_modifier(target + transient);
        self.set_velocity(backend, velocity);
    }

    fn additional_frame_velocity(&mut self, backend: &mut dyn PhysicsBackend) -> Vec2 {
        if let Some(offset) = self.solver.immediate_move() {
            backend.move_position(self.body, self.frame_position + offset);
        }
        self.solver.compose_transient()
    }

    fn set_velocity(&mut self, backend: &mut dyn PhysicsBackend, velocity: Vec2) {
        backend.set_velocity(self.body, velocity);
        self.velocity = velocity;
    }

    // ---------------------------------------------------------------------
    // External requests
    // ---------------------------------------------------------------------

    /// Apply `force` as an impulse on the next fixed tick, replacing normal movement for that tick
    pub fn add_frame_force(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        force: Vec2,
        reset_velocity: bool,
    ) {
        if reset_velocity {
            self.set_velocity(backend, Vec2::ZERO);
        }
        self.force_this_frame += force;
    }

    /// Restore a saved snapshot
    pub fn load_state(&mut self, backend: &mut dyn PhysicsBackend, state: ControllerState) {
        self.reposition_immediately(backend, state.position, false);
        backend.set_rotation(self.body, state.rotation);
        self.velocity = state.velocity;
        self.trimmed_velocity = Vec2::new(state.velocity.x, 0.0);
        self.solver.reset_transient();
        self.platforms.clear_grounded_platform();

        if state.grounded {
            self.ground.force_grounded(true);
            self.on_landed(backend);
        } else if self.ground.is_grounded() {
            self.ground.force_grounded(false);
            self.on_left_ground(backend);
        }

        self.set_velocity(backend, state.velocity);
        self.frame_position = state.position;
        self.frame_rotation = state.rotation;
        self.state.capture(state);
    }

    /// Teleport the character
    pub fn reposition_immediately(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        position: Vec2,
        reset_velocity: bool,
    ) {
        backend.set_position(self.body, position);
        if reset_velocity {
            self.set_velocity(backend, Vec2::ZERO);
        }
        self.events.emit(ControllerEvent::Repositioned(position));
    }

    /// Freeze or resume the character. Frozen characters keep their state
    pub fn toggle_active(&mut self, backend: &mut dyn PhysicsBackend, active: bool) {
        self.active = active;
        if !active {
            self.jump.discard_press();
        }
        backend.set_simulated(self.body, active);
        log::info!(
            "Character {:?} {}",
            self.body,
            if active { "activated" } else { "frozen" }
        );
        self.events.emit(ControllerEvent::ActiveToggled(active));
    }

    /// Apply a new config, regenerating the collider layout
    pub fn revalidate(
        &mut self,
        backend: &mut dyn PhysicsBackend,
        config: ControllerConfig,
    ) -> Result<(), ControllerError> {
        config.validate()?;
        self.size = config.character_size.generate();
        self.config = config;
        self.colliders.reapply(backend, self.body, &self.size);
        log::info!("Character {:?} config revalidated", self.body);
        Ok(())
    }

    pub fn on_trigger_enter(&mut self, collider: ColliderHandle, registry: &CapabilityRegistry) {
        self.platforms.on_trigger_enter(collider, registry);
    }

    pub fn on_trigger_exit(&mut self, collider: ColliderHandle) {
        self.platforms.on_trigger_exit(collider);
    }

    /// Register a listener for controller events
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ControllerEvent) + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn size(&self) -> &GeneratedCharacterSize {
        &self.size
    }

    /// Snapshot taken at the end of the last tick
    pub fn state(&self) -> ControllerState {
        self.state.current()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn up(&self) -> Vec2 {
        self.up
    }

    pub fn right(&self) -> Vec2 {
        self.right
    }

    pub fn is_growing(&self) -> bool {
        self.growing
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    /// Movement input of the last sample
    pub fn input(&self) -> Vec2 {
        self.input.move_axis
    }

    pub fn ground_normal(&self) -> Vec2 {
        self.ground_normal
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn collider_mode(&self) -> ColliderMode {
        self.colliders.mode()
    }

    pub fn air_jumps_remaining(&self) -> u32 {
        self.jump.air_jumps_remaining()
    }

    pub fn jump_phase(&self) -> JumpPhase {
        self.jump
            .phase(self.ground.is_grounded(), self.time, &self.config)
    }

    pub fn platforms(&self) -> &PlatformTracker {
        &self.platforms
    }

    pub fn solver(&self) -> &VelocitySolver {
        &self.solver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::SceneWorld;
    use crate::game::character::config::{BASE_CONFIG, SKIN_WIDTH};
    use std::cell::RefCell;

    const DT: f32 = 0.02;

    fn setup() -> (SceneWorld, CharacterController) {
        let mut scene = SceneWorld::new();
        scene.add_ground(0.0, 50.0);
        let body = scene.spawn_character(
            Vec2::new(0.0, -SKIN_WIDTH),
            &CharacterController::initial_shapes(&BASE_CONFIG),
        );
        let controller = CharacterController::new(body, BASE_CONFIG, &mut scene).unwrap();
        (scene, controller)
    }

    fn tick(scene: &mut SceneWorld, controller: &mut CharacterController, input: FrameInput, time: f32) {
        let registry = CapabilityRegistry::new();
        controller.tick_update(input, time);
        controller.fixed_update(scene, &registry, DT, time);
        scene.step(DT);
    }

    #[test]
    fn test_missing_body_rejected() {
        let mut scene = SceneWorld::new();
        let result = CharacterController::new(
            RigidBodyHandle::from_raw_parts(7, 0),
            BASE_CONFIG,
            &mut scene,
        );
        assert!(matches!(result, Err(ControllerError::MissingBody(_))));
    }

    #[test]
    fn test_lands_on_first_tick() {
        let (mut scene, mut controller) = setup();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        controller.subscribe(move |event| sink.borrow_mut().push(*event));

        tick(&mut scene, &mut controller, FrameInput::default(), 0.0);

        assert!(controller.is_grounded());
        assert!(controller.state().grounded);
        assert_eq!(controller.collider_mode(), ColliderMode::Standing);
        assert_eq!(scene.gravity_scale(controller.body()), Some(0.0));
        assert!(matches!(
            events.borrow()[0],
            ControllerEvent::GroundedChanged { grounded: true, .. }
        ));
    }

    #[test]
    fn test_jump_emits_event_and_leaves_ground() {
        let (mut scene, mut controller) = setup();
        let jumps = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&jumps);
        controller.subscribe(move |event| {
            if let ControllerEvent::Jumped(kind) = event {
                sink.borrow_mut().push(*kind);
            }
        });

        tick(&mut scene, &mut controller, FrameInput::default(), 0.0);
        tick(&mut scene, &mut controller, FrameInput::jump(), DT);
        assert_eq!(*jumps.borrow(), vec![JumpKind::Grounded]);

        let held = FrameInput {
            jump_held: true,
            ..Default::default()
        };
        tick(&mut scene, &mut controller, held, 2.0 * DT);
        assert!(!controller.is_grounded());
        assert_eq!(controller.collider_mode(), ColliderMode::Airborne);
    }

    #[test]
    fn test_frozen_controller_skips_ticks() {
        let (mut scene, mut controller) = setup();
        tick(&mut scene, &mut controller, FrameInput::default(), 0.0);
        let before = controller.state();

        controller.toggle_active(&mut scene, false);
        assert_eq!(scene.is_simulated(controller.body()), Some(false));
        for i in 1..10 {
            tick(&mut scene, &mut controller, FrameInput::moving(1.0), i as f32 * DT);
        }
        assert_eq!(controller.state(), before);

        controller.toggle_active(&mut scene, true);
        assert!(controller.is_active());
    }

    #[test]
    fn test_press_while_frozen_is_dropped() {
        let (mut scene, mut controller) = setup();
        tick(&mut scene, &mut controller, FrameInput::default(), 0.0);
        let jumped = Rc::new(RefCell::new(false));
        let sink = Rc::clone(&jumped);
        controller.subscribe(move |event| {
            if matches!(event, ControllerEvent::Jumped(_)) {
                *sink.borrow_mut() = true;
            }
        });

        controller.toggle_active(&mut scene, false);
        tick(&mut scene, &mut controller, FrameInput::jump(), DT);
        controller.toggle_active(&mut scene, true);
        for i in 2..6 {
            tick(&mut scene, &mut controller, FrameInput::default(), i as f32 * DT);
        }

        assert!(!*jumped.borrow());
        assert!(controller.is_grounded());
    }

    #[test]
    fn test_reposition_emits_event() {
        let (mut scene, mut controller) = setup();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        controller.subscribe(move |event| {
            if let ControllerEvent::Repositioned(position) = event {
                *sink.borrow_mut() = Some(*position);
            }
        });

        controller.reposition_immediately(&mut scene, Vec2::new(4.0, 2.0), true);
        assert_eq!(*seen.borrow(), Some(Vec2::new(4.0, 2.0)));
        let body = scene.body_state(controller.body()).unwrap();
        assert_eq!(body.position, Vec2::new(4.0, 2.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_revalidate_rejects_bad_config() {
        let (mut scene, mut controller) = setup();
        let bad = ControllerConfig {
            jump_power: f32::INFINITY,
            ..BASE_CONFIG
        };
        assert!(controller.revalidate(&mut scene, bad).is_err());
        assert_eq!(controller.config().jump_power, 20.0);

        let mut taller = BASE_CONFIG;
        taller.character_size.height = 2.4;
        controller.revalidate(&mut scene, taller).unwrap();
        assert_eq!(controller.size().height, 2.4);
    }
}
