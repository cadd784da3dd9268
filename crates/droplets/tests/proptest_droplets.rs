//! Property-based tests for the droplet simulator using proptest
//!
//! These tests verify invariants hold across random initial conditions:
//! - No droplet ends a step below the terrain surface
//! - No NaN values in positions/velocities
//! - Particle count conservation
//! - Grid index matches the particle list

use droplets::{generate_samples, SimParams, Simulator, TerrainConfig, Vec3};
use proptest::prelude::*;

const MAX_PARTICLES: usize = 60;
const SIMULATION_STEPS: usize = 30;
const EXTENT: f32 = 6.0;

fn simulator_on_terrain(seed: u32, restitution: f32) -> Simulator {
    let params = SimParams {
        terrain_restitution: restitution,
        pair_restitution: restitution,
        ..Default::default()
    };
    let mut sim = Simulator::new(params).unwrap();
    sim.set_terrain(&generate_samples(&TerrainConfig {
        res_x: 25,
        res_z: 25,
        width: 2.0 * EXTENT,
        length: 2.0 * EXTENT,
        base_elevation: 0.0,
        seed,
        frequency: 0.2,
        height_multiplier: 1.5,
    }))
    .unwrap();
    sim
}

/// Strategy for generating droplet centers above the terrain
fn particle_set() -> impl Strategy<Value = Vec<Vec3>> {
    prop::collection::vec(
        (-EXTENT..EXTENT, 0.0f32..8.0, -EXTENT..EXTENT).prop_map(|(x, y, z)| Vec3::new(x, y, z)),
        1..MAX_PARTICLES,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: droplets never end a step underground
    #[test]
    fn test_floor_holds(
        centers in particle_set(),
        radius in 0.1f32..0.6,
        seed in 0u32..1000,
        restitution in 0.0f32..1.0,
    ) {
        let mut sim = simulator_on_terrain(seed, restitution);
        sim.register_particles(&centers, radius).unwrap();

        for _ in 0..SIMULATION_STEPS {
            sim.step().unwrap();
            let terrain = sim.terrain().unwrap();
            for (i, p) in sim.particles().iter().enumerate() {
                let floor = terrain.elevation_at(p.position.x, p.position.z);
                prop_assert!(
                    p.bottom() >= floor - 1e-4,
                    "Droplet {} below floor: bottom {} < {}", i, p.bottom(), floor
                );
            }
        }
    }

    /// Property: state stays finite and the particle count is conserved
    #[test]
    fn test_finite_and_conserved(centers in particle_set(), radius in 0.1f32..0.6) {
        let mut sim = simulator_on_terrain(1338, 0.2);
        sim.register_particles(&centers, radius).unwrap();
        let initial_count = sim.particle_count();

        for _ in 0..SIMULATION_STEPS {
            sim.step().unwrap();
        }

        prop_assert_eq!(sim.particle_count(), initial_count);
        for (i, p) in sim.particles().iter().enumerate() {
            prop_assert!(p.position.is_finite(), "Position {} not finite: {:?}", i, p.position);
            prop_assert!(p.velocity.is_finite(), "Velocity {} not finite: {:?}", i, p.velocity);
        }
    }

    /// Property: the grid files every droplet exactly once after each step
    #[test]
    fn test_grid_consistent(
        first in particle_set(),
        second in particle_set(),
        r1 in 0.1f32..0.6,
        r2 in 0.1f32..0.6,
    ) {
        let mut sim = simulator_on_terrain(7, 0.0);
        sim.register_particles(&first, r1).unwrap();
        for _ in 0..5 {
            sim.step().unwrap();
        }
        // Second batch with another radius forces a regrid
        sim.register_particles(&second, r2).unwrap();
        prop_assert!(sim.validate_grid().is_ok());

        for _ in 0..SIMULATION_STEPS {
            sim.step().unwrap();
            prop_assert!(sim.validate_grid().is_ok());
        }
    }
}
