//! Simulation parameters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DT, DEFAULT_RADIUS, DEFAULT_SOLVER_ITERATIONS, GRAVITY};
use crate::error::{Result, SimError};

/// Tunables for [`crate::Simulator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Fixed time step (s). Must be positive.
    pub dt: f32,
    /// Vertical acceleration (m/s^2), negative is down.
    pub gravity: f32,
    /// Fraction of downward speed kept when bouncing off terrain (0 = stick).
    pub terrain_restitution: f32,
    /// Fraction of horizontal speed removed per terrain contact.
    pub terrain_friction: f32,
    /// Droplet-droplet restitution along the contact normal (0 = inelastic).
    pub pair_restitution: f32,
    /// Air drag, fraction of velocity removed per second.
    pub linear_damping: f32,
    /// Radius used to size the grid before any particles exist.
    pub initial_radius: f32,
    /// Collision passes per step. The default single pass resolves each
    /// overlapping pair once; extra passes settle stacked droplets faster.
    pub solver_iterations: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            gravity: GRAVITY,
            terrain_restitution: 0.0,
            terrain_friction: 0.0,
            pair_restitution: 0.0,
            linear_damping: 0.0,
            initial_radius: DEFAULT_RADIUS,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
        }
    }
}

impl SimParams {
    /// Check every field, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(SimError::InvalidDeltaTime(self.dt));
        }
        if !(self.initial_radius > 0.0 && self.initial_radius.is_finite()) {
            return Err(SimError::InvalidRadius(self.initial_radius));
        }
        if !self.gravity.is_finite() {
            return Err(invalid("gravity must be finite"));
        }
        for (name, value) in [
            ("terrain_restitution", self.terrain_restitution),
            ("terrain_friction", self.terrain_friction),
            ("pair_restitution", self.pair_restitution),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(&format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        if !(self.linear_damping >= 0.0 && self.linear_damping.is_finite()) {
            return Err(invalid(&format!(
                "linear_damping must be non-negative, got {}",
                self.linear_damping
            )));
        }
        if self.solver_iterations == 0 {
            return Err(invalid("solver_iterations must be at least 1"));
        }
        Ok(())
    }

    /// Save parameters to a JSON file
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let params: SimParams = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }
}

fn invalid(msg: &str) -> SimError {
    SimError::InvalidParams(msg.to_string())
}
