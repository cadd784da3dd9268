//! Procedural terrain samples for the droplet scene.
//!
//! Produces a `res_x * res_z` lattice of vertices centered on the origin,
//! with elevation from fractal Perlin noise. The simulator only consumes the
//! samples; the renderer also takes the triangle indices.

use glam::Vec3;
use noise::{Fbm, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Configuration for terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Samples along X (at least 2)
    pub res_x: u32,
    /// Samples along Z (at least 2)
    pub res_z: u32,
    /// Extent along X (m)
    pub width: f32,
    /// Extent along Z (m)
    pub length: f32,
    /// Elevation where the noise is zero
    pub base_elevation: f32,
    pub seed: u32,
    /// Noise frequency per world unit
    pub frequency: f32,
    /// Noise amplitude (m)
    pub height_multiplier: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            res_x: 1000,
            res_z: 1000,
            width: 100.0,
            length: 100.0,
            base_elevation: -10.0,
            seed: 1338,
            frequency: 0.005,
            height_multiplier: 5.0,
        }
    }
}

impl TerrainConfig {
    fn resolution(&self) -> (usize, usize) {
        (self.res_x.max(2) as usize, self.res_z.max(2) as usize)
    }
}

/// Generate terrain vertices, row by row along Z.
pub fn generate_samples(config: &TerrainConfig) -> Vec<Vec3> {
    let (nx, nz) = config.resolution();
    let noise: Fbm<Perlin> = Fbm::new(config.seed);

    let step_x = config.width / (nx - 1) as f32;
    let step_z = config.length / (nz - 1) as f32;
    let origin_x = -config.width * 0.5;
    let origin_z = -config.length * 0.5;
    let freq = config.frequency as f64;

    let mut samples = Vec::with_capacity(nx * nz);
    for iz in 0..nz {
        let z = origin_z + iz as f32 * step_z;
        for ix in 0..nx {
            let x = origin_x + ix as f32 * step_x;
            let n = noise.get([x as f64 * freq, z as f64 * freq]) as f32;
            samples.push(Vec3::new(
                x,
                config.base_elevation + n * config.height_multiplier,
                z,
            ));
        }
    }
    samples
}

/// Two counter-clockwise (seen from +Y) triangles per lattice quad.
pub fn generate_indices(res_x: u32, res_z: u32) -> Vec<u32> {
    let nx = res_x.max(2);
    let nz = res_z.max(2);
    let mut indices = Vec::with_capacity(((nx - 1) * (nz - 1) * 6) as usize);
    for iz in 0..nz - 1 {
        for ix in 0..nx - 1 {
            let i0 = iz * nx + ix;
            let i1 = i0 + 1;
            let i2 = i0 + nx;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    indices
}
