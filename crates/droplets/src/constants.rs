//! Physical and numerical constants for the droplet simulation.

/// Gravity acceleration (m/s^2) - negative Y direction
pub const GRAVITY: f32 = -9.8;

/// Default fixed time step (one 60 Hz frame)
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Default droplet radius (m)
pub const DEFAULT_RADIUS: f32 = 0.5;

/// Default number of collision passes per step. One pass resolves each
/// pair once; more passes settle dense piles faster.
pub const DEFAULT_SOLVER_ITERATIONS: usize = 1;

/// Grid cells span this many particle radii, so touching droplets
/// (distance < r_a + r_b <= 2 * r_max) always sit in adjacent cells.
pub const CELL_SIZE_PER_RADIUS: f32 = 2.0;

/// Tolerance used when checking the floor and overlap invariants.
pub const CONTACT_EPSILON: f32 = 1e-4;

/// Fixed-step clock: backlog cap so a long hitch doesn't trigger a burst of steps
pub const DEFAULT_MAX_STEPS_PER_FRAME: usize = 8;
