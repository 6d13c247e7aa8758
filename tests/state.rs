// Saved state, growing under geometry and freezing

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{growing, Harness, DT};
use glam::Vec2;
use rusted_controller::engine::events::ControllerEvent;
use rusted_controller::engine::input::{Action, FrameInput, PlayerInput, ScriptedInput};
use rusted_controller::engine::physics::{PhysicsBackend, SceneWorld};
use rusted_controller::game::character::config::SKIN_WIDTH;
use rusted_controller::game::character::{
    CharacterController, ColliderMode, ControllerState, MovingPlatform, PhysicsMover, BASE_CONFIG,
};
use rusted_controller::game::Simulator;

#[test]
fn test_load_state_restores_snapshot() {
    let mut h = Harness::on_flat_ground(BASE_CONFIG);
    h.run(FrameInput::moving(1.0), 20);
    let saved = h.controller.state();
    assert!(saved.grounded);

    h.run(FrameInput::moving(-1.0), 15);
    h.tick(FrameInput::jump());
    h.run(FrameInput::default(), 12);
    assert!(!h.controller.is_grounded());

    h.controller.load_state(&mut h.scene, saved);

    assert_eq!(h.controller.state(), saved);
    assert!(h.controller.is_grounded());
    assert_eq!(h.controller.collider_mode(), ColliderMode::Standing);
    let body = h.body();
    assert_eq!(body.position, saved.position);
    assert_eq!(body.velocity, saved.velocity);
    assert!(h
        .events
        .borrow()
        .contains(&ControllerEvent::Repositioned(saved.position)));

    h.tick(FrameInput::moving(1.0));
    assert!(h.controller.is_grounded());
}

#[test]
fn test_load_after_platform_ride_does_not_drift() {
    let mut scene = SceneWorld::new();
    scene.add_ground(0.0, 400.0);
    // Platform top at y = 2, far from the spawn
    let start = Vec2::new(20.0, 1.75);
    let collider = scene.add_mover(start, Vec2::new(4.0, 0.5));
    let platform = Rc::new(MovingPlatform::new(start));

    let mut h = Harness::new(scene, Vec2::new(0.0, -SKIN_WIDTH), BASE_CONFIG);
    let mover: Rc<dyn PhysicsMover> = platform.clone();
    h.registry.register_mover(collider, mover);

    h.run(FrameInput::default(), 5);
    let saved = h.controller.state();

    h.controller
        .reposition_immediately(&mut h.scene, Vec2::new(20.0, 2.0 - SKIN_WIDTH), true);
    for _ in 0..10 {
        let next = platform.position() + Vec2::new(0.1, 0.0);
        platform.move_to(next, DT);
        h.scene.set_collider_position(collider, next);
        h.tick(FrameInput::default());
    }
    assert_eq!(h.controller.platforms().grounded_platform(), Some(collider));
    assert!(h.body().velocity.x > 4.0);

    h.controller.load_state(&mut h.scene, saved);
    assert_eq!(h.controller.platforms().grounded_platform(), None);
    assert!(!h.controller.platforms().is_mover_active(collider));

    for _ in 0..10 {
        h.tick(FrameInput::default());
        assert!(h.body().velocity.x.abs() < 1e-4);
    }
    assert!((h.body().position.x - saved.position.x).abs() < 1e-4);
    assert!(h.controller.is_grounded());
}

#[test]
fn test_state_survives_json() {
    let mut h = Harness::on_flat_ground(BASE_CONFIG);
    h.run(FrameInput::moving(1.0), 12);
    let saved = h.controller.state();

    let json = serde_json::to_string(&saved).unwrap();
    let restored: ControllerState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, saved);

    h.run(FrameInput::moving(1.0), 12);
    h.controller.load_state(&mut h.scene, restored);
    assert_eq!(h.controller.state(), saved);
    assert_eq!(h.body().position, saved.position);
}

#[test]
fn test_cannot_stand_or_jump_under_ceiling() {
    let mut scene = SceneWorld::new();
    scene.add_ground(0.0, 400.0);
    // Bottom at y = 1, low enough to block the standing box
    scene.add_block(Vec2::new(0.0, 1.5), Vec2::new(4.0, 1.0));
    let mut h = Harness::new(scene, Vec2::new(0.0, -SKIN_WIDTH), BASE_CONFIG);

    h.tick(growing(FrameInput::default()));
    assert!(h.controller.is_growing());

    h.tick(FrameInput::default());
    assert!(h.controller.is_growing());
    assert_eq!(h.controller.collider_mode(), ColliderMode::Growing);

    h.tick(FrameInput::jump());
    assert!(h.jumps().is_empty());

    // Wait out the jump buffer before leaving the ceiling
    h.run(FrameInput::default(), 10);
    assert!(h.controller.is_growing());

    h.controller
        .reposition_immediately(&mut h.scene, Vec2::new(10.0, -SKIN_WIDTH), true);
    h.tick(FrameInput::default());

    assert!(!h.controller.is_growing());
    assert_eq!(h.controller.collider_mode(), ColliderMode::Standing);
    assert!(h.jumps().is_empty());
}

#[test]
fn test_frozen_controller_keeps_state_until_resumed() {
    let mut h = Harness::on_flat_ground(BASE_CONFIG);
    h.run(FrameInput::moving(1.0), 10);
    let before = h.controller.state();

    h.controller.toggle_active(&mut h.scene, false);
    h.run(FrameInput::moving(1.0), 20);
    assert_eq!(h.controller.state(), before);
    assert_eq!(h.body().position, before.position);

    h.controller.toggle_active(&mut h.scene, true);
    h.run(FrameInput::moving(1.0), 5);
    assert!(h.controller.state().position.x > before.position.x);
    assert!(h
        .events
        .borrow()
        .contains(&ControllerEvent::ActiveToggled(false)));
}

#[test]
fn test_simulator_runs_controllers_in_order() {
    let mut scene = SceneWorld::new();
    scene.add_ground(0.0, 400.0);
    let shapes = CharacterController::initial_shapes(&BASE_CONFIG);
    let left = scene.spawn_character(Vec2::new(-5.0, -SKIN_WIDTH), &shapes);
    let right = scene.spawn_character(Vec2::new(5.0, -SKIN_WIDTH), &shapes);

    let mut sim = Simulator::new(scene);
    let mut player = PlayerInput::new(0);
    player.press(Action::MoveLeft);
    let a = sim.add_controller(left, BASE_CONFIG, Box::new(player)).unwrap();
    let b = sim
        .add_controller(
            right,
            BASE_CONFIG,
            Box::new(ScriptedInput::default().then_repeat(FrameInput::moving(1.0))),
        )
        .unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    for id in [a, b] {
        let sink = Rc::clone(&order);
        sim.controller_mut(id)
            .unwrap()
            .subscribe(move |event| {
                if matches!(event, ControllerEvent::GroundedChanged { grounded: true, .. }) {
                    sink.borrow_mut().push(id);
                }
            });
    }

    for _ in 0..20 {
        sim.tick();
    }

    assert_eq!(*order.borrow(), vec![a, b]);
    let left_x = sim.backend().body_state(left).unwrap().position.x;
    let right_x = sim.backend().body_state(right).unwrap().position.x;
    assert!(left_x < -5.5);
    assert!(right_x > 5.5);
}
