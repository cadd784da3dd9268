//! Droplet simulation over a terrain heightfield.
//!
//! Droplets fall under gravity, land on a terrain [`HeightField`] and push
//! each other apart. Contacts are found through a uniform [`SpatialGrid`]
//! whose cells are sized from the droplet radius, so each query scans only
//! the 27 cells around a droplet.
//!
//! # Example
//!
//! ```
//! use droplets::{generate_samples, SimParams, Simulator, TerrainConfig, Vec3};
//!
//! let terrain = TerrainConfig {
//!     res_x: 32,
//!     res_z: 32,
//!     width: 20.0,
//!     length: 20.0,
//!     base_elevation: 0.0,
//!     ..Default::default()
//! };
//!
//! let mut sim = Simulator::new(SimParams::default()).unwrap();
//! sim.set_terrain(&generate_samples(&terrain)).unwrap();
//!
//! // A small column of droplets
//! let centers: Vec<Vec3> = (0..8).map(|i| Vec3::new(0.0, 5.0 + i as f32, 0.0)).collect();
//! sim.register_particles(&centers, 0.25).unwrap();
//!
//! for _ in 0..120 {
//!     sim.step().unwrap();
//! }
//!
//! let snapshot = sim.snapshot();
//! assert_eq!(snapshot.positions.len(), 8);
//! ```

pub mod clock;
pub mod command;
pub mod constants;
pub mod error;
pub mod grid;
pub mod heightfield;
pub mod params;
pub mod particle;
pub mod serde_utils;
pub mod simulation;
pub mod snapshot;
pub mod terrain_generator;

pub use clock::StepClock;
pub use command::Command;
pub use error::{Result, SimError};
pub use glam::{Vec2, Vec3};
pub use grid::{CellKey, SpatialGrid};
pub use heightfield::HeightField;
pub use params::SimParams;
pub use particle::{Particle, Particles};
pub use simulation::{SimState, Simulator, StepStats};
pub use snapshot::{Snapshot, SnapshotBuffer, SnapshotReader};
pub use terrain_generator::{generate_indices, generate_samples, TerrainConfig};
