// Shared fixture: one controller driven over a deterministic scene

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rusted_controller::engine::events::{ControllerEvent, JumpKind};
use rusted_controller::engine::input::FrameInput;
use rusted_controller::engine::physics::{BodyState, PhysicsBackend, SceneWorld};
use rusted_controller::game::character::config::SKIN_WIDTH;
use rusted_controller::game::character::{CapabilityRegistry, CharacterController, ControllerConfig};

pub const DT: f32 = 0.02;

pub struct Harness {
    pub scene: SceneWorld,
    pub registry: CapabilityRegistry,
    pub controller: CharacterController,
    pub events: Rc<RefCell<Vec<ControllerEvent>>>,
    pub ticks: u32,
}

impl Harness {
    /// Character spawned with its feet at `feet`
    pub fn new(mut scene: SceneWorld, feet: Vec2, config: ControllerConfig) -> Self {
        let body = scene.spawn_character(feet, &CharacterController::initial_shapes(&config));
        let mut controller = CharacterController::new(body, config, &mut scene)
            .expect("character body exists");

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        controller.subscribe(move |event| sink.borrow_mut().push(*event));

        Self {
            scene,
            registry: CapabilityRegistry::new(),
            controller,
            events,
            ticks: 0,
        }
    }

    /// Character resting on a wide floor whose top is at y = 0
    pub fn on_flat_ground(config: ControllerConfig) -> Self {
        let mut scene = SceneWorld::new();
        scene.add_ground(0.0, 400.0);
        Self::new(scene, Vec2::new(0.0, -SKIN_WIDTH), config)
    }

    pub fn time(&self) -> f32 {
        self.ticks as f32 * DT
    }

    /// Sample input, run one controller tick, step the scene and route triggers
    pub fn tick(&mut self, input: FrameInput) {
        let time = self.time();
        self.controller.tick_update(input, time);
        self.controller
            .fixed_update(&mut self.scene, &self.registry, DT, time);
        self.scene.step(DT);

        for event in self.scene.take_trigger_events() {
            if event.body != self.controller.body() {
                continue;
            }
            if event.entered {
                self.controller.on_trigger_enter(event.trigger, &self.registry);
            } else {
                self.controller.on_trigger_exit(event.trigger);
            }
        }
        self.ticks += 1;
    }

    pub fn run(&mut self, input: FrameInput, ticks: u32) {
        for _ in 0..ticks {
            self.tick(input);
        }
    }

    /// Tick with `input` until grounded, up to `limit` ticks. Returns whether it landed
    pub fn run_until_grounded(&mut self, input: FrameInput, limit: u32) -> bool {
        for _ in 0..limit {
            self.tick(input);
            if self.controller.is_grounded() {
                return true;
            }
        }
        false
    }

    pub fn body(&self) -> BodyState {
        self.scene
            .body_state(self.controller.body())
            .expect("character body exists")
    }

    pub fn jumps(&self) -> Vec<JumpKind> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ControllerEvent::Jumped(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn landings(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, ControllerEvent::GroundedChanged { grounded: true, .. }))
            .count()
    }
}

/// Jump held without a fresh press
pub fn holding_jump() -> FrameInput {
    FrameInput {
        jump_held: true,
        ..Default::default()
    }
}

pub fn growing(input: FrameInput) -> FrameInput {
    FrameInput {
        grow: true,
        ..input
    }
}
