// Simulation driver: owns the physics backend and every controlled character

use std::time::Duration;

use crate::engine::game_loop::{is_valid_timestep, GameLoop, SimClock};
use crate::engine::input::InputProvider;
use crate::engine::physics::{PhysicsBackend, RigidBodyHandle};
use crate::game::character::{CapabilityRegistry, CharacterController, ControllerConfig, ControllerError};

/// Unique identifier for a controlled character
pub type ControllerId = u32;

struct ControlledCharacter {
    id: ControllerId,
    controller: CharacterController,
    input: Box<dyn InputProvider>,
}

/// Runs controllers and the physics backend on a fixed step
///
/// Each fixed step runs every active controller in registration order, then
/// steps the backend once, then routes trigger events to their controllers.
pub struct Simulator<B: PhysicsBackend> {
    backend: B,
    registry: CapabilityRegistry,
    characters: Vec<ControlledCharacter>,
    game_loop: GameLoop,
    next_id: ControllerId,
}

impl<B: PhysicsBackend> Simulator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            registry: CapabilityRegistry::new(),
            characters: Vec::new(),
            game_loop: GameLoop::new(),
            next_id: 0,
        }
    }

    /// Create a simulator with a custom fixed step
    pub fn with_timestep(backend: B, timestep: f32) -> Result<Self, ControllerError> {
        if !is_valid_timestep(timestep) {
            return Err(ControllerError::InvalidConfig {
                field: "timestep",
                value: timestep,
            });
        }
        Ok(Self {
            game_loop: GameLoop::with_timestep(timestep),
            ..Self::new(backend)
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Colliders with platform or speed zone behavior attached
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    /// Attach a controller to an existing body
    pub fn add_controller(
        &mut self,
        body: RigidBodyHandle,
        config: ControllerConfig,
        input: Box<dyn InputProvider>,
    ) -> Result<ControllerId, ControllerError> {
        let controller = CharacterController::new(body, config, &mut self.backend)?;

        let id = self.next_id;
        self.next_id += 1;
        self.characters.push(ControlledCharacter {
            id,
            controller,
            input,
        });

        log::info!("Controller {} added for body {:?}", id, body);
        Ok(id)
    }

    /// Detach a controller. The body stays in the backend
    pub fn remove_controller(&mut self, id: ControllerId) -> Result<CharacterController, ControllerError> {
        let index = self
            .characters
            .iter()
            .position(|c| c.id == id)
            .ok_or(ControllerError::UnknownController(id))?;
        Ok(self.characters.remove(index).controller)
    }

    /// Get a controller by ID
    pub fn controller(&self, id: ControllerId) -> Option<&CharacterController> {
        self.characters
            .iter()
            .find(|c| c.id == id)
            .map(|c| &c.controller)
    }

    /// Get a mutable controller by ID
    pub fn controller_mut(&mut self, id: ControllerId) -> Option<&mut CharacterController> {
        self.characters
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| &mut c.controller)
    }

    /// Run `f` with a controller and the backend, for requests such as
    /// teleports or state loads that need both
    pub fn with_controller<R>(
        &mut self,
        id: ControllerId,
        f: impl FnOnce(&mut CharacterController, &mut B) -> R,
    ) -> Result<R, ControllerError> {
        let character = self
            .characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ControllerError::UnknownController(id))?;
        Ok(f(&mut character.controller, &mut self.backend))
    }

    /// Get the number of controlled characters
    pub fn count(&self) -> usize {
        self.characters.len()
    }

    pub fn clock(&self) -> SimClock {
        self.game_loop.clock()
    }

    pub fn is_paused(&self) -> bool {
        self.game_loop.is_paused()
    }

    pub fn pause(&mut self) {
        self.game_loop.pause();
    }

    pub fn resume(&mut self) {
        self.game_loop.resume();
    }

    /// Advance by a variable frame time: sample input once, then run
    /// as many fixed steps as have accumulated. Returns the number of steps
    pub fn frame(&mut self, frame_time: Duration) -> u32 {
        let updates = self.game_loop.advance(frame_time);
        if updates == 0 {
            return 0;
        }

        self.gather_input();
        for _ in 0..updates {
            self.fixed_step();
        }
        updates
    }

    /// Sample input and run exactly one fixed step. Does nothing while paused
    pub fn tick(&mut self) -> bool {
        if self.game_loop.is_paused() {
            return false;
        }
        self.gather_input();
        self.fixed_step();
        true
    }

    fn gather_input(&mut self) {
        let now = self.game_loop.clock().now();
        for character in &mut self.characters {
            let input = character.input.gather();
            character.controller.tick_update(input, now);
        }
    }

    fn fixed_step(&mut self) {
        let clock = self.game_loop.clock();
        let (dt, now) = (clock.timestep(), clock.now());

        for character in &mut self.characters {
            character
                .controller
                .fixed_update(&mut self.backend, &self.registry, dt, now);
        }

        self.backend.step(dt);

        for event in self.backend.take_trigger_events() {
            let Some(character) = self
                .characters
                .iter_mut()
                .find(|c| c.controller.body() == event.body)
            else {
                continue;
            };
            if event.entered {
                character
                    .controller
                    .on_trigger_enter(event.trigger, &self.registry);
            } else {
                character.controller.on_trigger_exit(event.trigger);
            }
        }

        self.game_loop.complete_update();
    }
}

impl<B: PhysicsBackend> std::fmt::Debug for Simulator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("characters", &self.characters.len())
            .field("registry", &self.registry)
            .field("clock", &self.game_loop.clock())
            .finish()
    }
}
