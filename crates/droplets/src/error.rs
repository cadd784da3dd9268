//! Error types for the droplet simulation.
//!
//! Configuration errors are returned to the caller and leave the simulator
//! unchanged. Grid consistency problems are reported through
//! [`SimError::GridDesync`] by [`crate::Simulator::validate_grid`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("No terrain installed: call set_terrain before registering or stepping")]
    NoTerrain,
    #[error("Terrain sample set is empty")]
    EmptyTerrain,
    #[error("Terrain sample {index} has a non-finite coordinate")]
    NonFiniteTerrain { index: usize },
    #[error("Particle radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("Delta time must be positive and finite, got {0}")]
    InvalidDeltaTime(f32),
    #[error("Grid cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    #[error("Particle center {index} has a non-finite coordinate")]
    NonFiniteCenter { index: usize },
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(String),
    #[error(
        "Spatial grid out of sync with particles: {missing} missing, {duplicated} duplicated, {stale} stale"
    )]
    GridDesync {
        missing: usize,
        duplicated: usize,
        stale: usize,
    },
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
