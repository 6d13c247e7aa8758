/// Game loop timing and control system
///
/// Implements a fixed timestep game loop with variable-rate input sampling.
/// Controller logic only ever sees the fixed step and the simulation clock,
/// never wall-clock time, so pausing freezes every timing window.
use std::time::Duration;

/// Default physics/update rate (50 updates per second)
pub const FIXED_TIMESTEP: f32 = 1.0 / 50.0;

/// Maximum number of physics steps per frame to prevent spiral of death
const MAX_PHYSICS_STEPS: u32 = 5;

/// Longest fixed step accepted, in seconds
pub const MAX_TIMESTEP: f32 = 1.0;

/// Whether `timestep` can drive the loop
pub fn is_valid_timestep(timestep: f32) -> bool {
    timestep.is_finite() && timestep > 0.0 && timestep <= MAX_TIMESTEP
}

/// Monotonic simulation clock, advanced only by fixed steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    ticks: u64,
    timestep: f32,
}

impl SimClock {
    /// Create a clock at tick zero
    pub fn new(timestep: f32) -> Self {
        Self { ticks: 0, timestep }
    }

    /// Advance by one fixed step
    pub fn tick(&mut self) {
        self.ticks += 1;
    }

    /// Number of fixed steps taken so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Length of one fixed step in seconds
    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Simulation time in seconds
    pub fn now(&self) -> f32 {
        (self.ticks as f64 * self.timestep as f64) as f32
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(FIXED_TIMESTEP)
    }
}

/// Game loop timing state
pub struct GameLoop {
    /// Accumulated time for fixed timestep updates
    accumulator: Duration,

    /// Duration of one fixed step
    fixed_duration: Duration,

    /// Whether the game is paused
    paused: bool,

    /// Current frame number
    frame_count: u64,

    /// Simulation clock driven by executed updates
    clock: SimClock,
}

impl GameLoop {
    /// Create a new game loop running at [`FIXED_TIMESTEP`]
    pub fn new() -> Self {
        Self::with_timestep(FIXED_TIMESTEP)
    }

    /// Create a new game loop with a custom fixed step.
    /// Invalid steps fall back to [`FIXED_TIMESTEP`]
    pub fn with_timestep(timestep: f32) -> Self {
        let timestep = if is_valid_timestep(timestep) {
            timestep
        } else {
            log::warn!("Invalid timestep {}, using {}", timestep, FIXED_TIMESTEP);
            FIXED_TIMESTEP
        };

        Self {
            accumulator: Duration::ZERO,
            fixed_duration: Duration::from_secs_f32(timestep),
            paused: false,
            frame_count: 0,
            clock: SimClock::new(timestep),
        }
    }

    /// Feed an explicit frame duration, returns the number of fixed updates to run
    ///
    /// The caller must call [`GameLoop::complete_update`] once per returned update.
    pub fn advance(&mut self, frame_time: Duration) -> u32 {
        self.frame_count += 1;

        // If paused, don't accumulate time for updates
        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;

        let mut updates = 0;
        while self.accumulator >= self.fixed_duration && updates < MAX_PHYSICS_STEPS {
            self.accumulator -= self.fixed_duration;
            updates += 1;
        }

        // Drop the backlog we refused to simulate
        if updates == MAX_PHYSICS_STEPS && self.accumulator >= self.fixed_duration {
            log::debug!(
                "Dropping {:?} of simulation backlog",
                self.accumulator - self.accumulator.min(self.fixed_duration)
            );
            self.accumulator = self.accumulator.min(self.fixed_duration);
        }

        updates
    }

    /// Mark one fixed update as executed, advancing the simulation clock
    pub fn complete_update(&mut self) {
        self.clock.tick();
    }

    /// Get the fixed timestep for physics updates (in seconds)
    pub fn fixed_timestep(&self) -> f32 {
        self.clock.timestep()
    }

    /// Get the simulation clock
    pub fn clock(&self) -> SimClock {
        self.clock
    }

    /// Get the interpolation alpha for smooth rendering between physics steps
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.fixed_duration.as_secs_f32()
    }

    /// Get total number of frames seen
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get total number of updates executed
    pub fn update_count(&self) -> u64 {
        self.clock.ticks()
    }

    /// Check if game is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause the game
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Simulation paused");
        }
    }

    /// Resume the game
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Reset accumulator to prevent update burst
            self.accumulator = Duration::ZERO;
            log::info!("Simulation resumed");
        }
    }

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}
