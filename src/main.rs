use std::rc::Rc;

use anyhow::{Context, Result};
use glam::Vec2;
use log::info;

use rusted_controller::engine::events::ControllerEvent;
use rusted_controller::engine::input::{FrameInput, ScriptedInput};
use rusted_controller::engine::physics::PhysicsWorld;
use rusted_controller::game::character::{
    CharacterController, MovingPlatform, PhysicsMover, SpeedZone, BASE_CONFIG,
};
use rusted_controller::game::Simulator;

/// Ticks the demo runs for (10 seconds at 50 Hz)
const DEMO_TICKS: u32 = 500;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Rusted Controller demo...");

    let mut world = PhysicsWorld::new();

    // Floor, a walkable slope and a speed zone above the floor
    world.add_ground(Vec2::new(0.0, -0.5), Vec2::new(60.0, 1.0), 0.0);
    world.add_ground(Vec2::new(14.0, 0.5), Vec2::new(8.0, 1.0), 20f32.to_radians());
    let zone = world.add_trigger(Vec2::new(-6.0, 1.0), Vec2::new(4.0, 2.0));

    // Platform bobbing left of the spawn
    let platform_start = Vec2::new(-14.0, 1.5);
    let (platform_body, platform_collider) = world.add_mover(platform_start, Vec2::new(3.0, 0.5));
    let platform = Rc::new(MovingPlatform::new(platform_start));

    let body = world.spawn_character(
        Vec2::new(0.0, 0.5),
        &CharacterController::initial_shapes(&BASE_CONFIG),
    );

    let mut script = ScriptedInput::default();
    script.push_repeated(FrameInput::default(), 25);
    script.push_repeated(FrameInput::moving(1.0), 150);
    script.push_repeated(FrameInput::jump(), 1);
    script.push_repeated(
        FrameInput {
            move_axis: Vec2::new(1.0, 0.0),
            jump_held: true,
            ..Default::default()
        },
        20,
    );
    script.push_repeated(FrameInput::moving(-1.0), 100);
    script.push_repeated(
        FrameInput {
            grow: true,
            ..FrameInput::moving(-1.0)
        },
        50,
    );
    let script = script.then_repeat(FrameInput::moving(-1.0));

    let mut sim = Simulator::new(world);
    sim.registry_mut()
        .register_modifier(zone, Rc::new(SpeedZone::new(Vec2::new(0.5, 0.0))));
    let mover: Rc<dyn PhysicsMover> = platform.clone();
    sim.registry_mut().register_mover(platform_collider, mover);

    let id = sim
        .add_controller(body, BASE_CONFIG, Box::new(script))
        .context("Failed to attach the character controller")?;

    sim.controller_mut(id)
        .context("Controller vanished after creation")?
        .subscribe(|event| match event {
            ControllerEvent::Jumped(kind) => info!("Jumped ({:?})", kind),
            ControllerEvent::GroundedChanged { grounded: true, impact } => {
                info!("Landed, impact {:.2}", impact)
            }
            ControllerEvent::GroundedChanged { grounded: false, .. } => info!("Left ground"),
            other => info!("{:?}", other),
        });

    let dt = sim.clock().timestep();
    for tick in 0..DEMO_TICKS {
        let t = tick as f32 * dt;
        let target = platform_start + Vec2::new(0.0, (t * 1.5).sin() * 1.5);
        platform.move_to(target, dt);
        sim.backend_mut().set_mover_position(platform_body, target);

        sim.tick();

        if tick % 50 == 0 {
            let controller = sim.controller(id).context("Controller missing")?;
            let state = controller.state();
            info!(
                "t={:.2}s pos=({:.2}, {:.2}) vel=({:.2}, {:.2}) grounded={} mode={:?}",
                sim.clock().now(),
                state.position.x,
                state.position.y,
                state.velocity.x,
                state.velocity.y,
                state.grounded,
                controller.collider_mode()
            );
        }
    }

    info!("Demo finished after {} ticks", sim.clock().ticks());
    Ok(())
}
