//! Discrete commands from the UI / input layer.
//!
//! Every command is a single synchronous call on the simulator, applied
//! between steps. They serialize to JSON so scripted scenarios can replay a
//! session.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::simulation::Simulator;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Add droplets at `centers`, all sharing `radius`
    RegisterParticles {
        #[serde(with = "crate::serde_utils::vec3_list")]
        centers: Vec<Vec3>,
        radius: f32,
    },
    /// Add one droplet at the current radius
    SpawnParticle {
        #[serde(with = "crate::serde_utils::vec3")]
        center: Vec3,
    },
    /// Change the droplet radius (clears the simulation)
    SetRadius(f32),
    /// Remove all droplets and grid entries
    Clear,
    SetPaused(bool),
    TogglePause,
    SetDeltaTime(f32),
}

impl Simulator {
    /// Apply one command. Failed commands leave the simulator unchanged.
    pub fn apply(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::RegisterParticles { centers, radius } => {
                self.register_particles(centers, *radius)?;
            }
            Command::SpawnParticle { center } => {
                self.spawn_particle(*center)?;
            }
            Command::SetRadius(radius) => self.set_radius(*radius)?,
            Command::Clear => self.reset(),
            Command::SetPaused(paused) => self.set_paused(*paused),
            Command::TogglePause => self.toggle_paused(),
            Command::SetDeltaTime(dt) => self.set_delta_time(*dt)?,
        }
        Ok(())
    }
}
