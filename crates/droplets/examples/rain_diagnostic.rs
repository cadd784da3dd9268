//! Rain diagnostic - drops a cloud of droplets onto generated terrain
//!
//! PASS CRITERIA:
//! 1. No droplet ends below the terrain surface
//! 2. Grid index matches the particle list after every frame
//! 3. Residual overlap between droplets stays small once settled
//!
//! Run with: RUST_LOG=debug cargo run --example rain_diagnostic -p droplets --release

use droplets::{
    generate_samples, SimParams, Simulator, SnapshotBuffer, StepClock, TerrainConfig, Vec3,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

const DROPLETS: usize = 2000;
const RADIUS: f32 = 0.25;
const FRAMES: usize = 600;
const FRAME_TIME: f32 = 1.0 / 60.0;

fn main() {
    env_logger::init();

    println!("=== RAIN DIAGNOSTIC ===\n");

    let terrain = TerrainConfig {
        res_x: 128,
        res_z: 128,
        width: 40.0,
        length: 40.0,
        base_elevation: 0.0,
        frequency: 0.08,
        height_multiplier: 3.0,
        ..Default::default()
    };

    let params = SimParams {
        terrain_friction: 0.2,
        solver_iterations: 6,
        ..Default::default()
    };

    let mut sim = Simulator::new(params.clone()).expect("default params are valid");
    let samples = generate_samples(&terrain);
    sim.set_terrain(&samples).expect("generated terrain is valid");
    println!(
        "Terrain: {}x{} samples, {:.0}x{:.0} m",
        terrain.res_x, terrain.res_z, terrain.width, terrain.length
    );

    let mut rng = StdRng::seed_from_u64(42);
    let centers: Vec<Vec3> = (0..DROPLETS)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-8.0..8.0),
                rng.gen_range(6.0..16.0),
                rng.gen_range(-8.0..8.0),
            )
        })
        .collect();
    sim.register_particles(&centers, RADIUS)
        .expect("centers are finite");
    println!("Droplets: {} at radius {}\n", sim.particle_count(), RADIUS);

    let mut clock = StepClock::with_dt(params.dt);
    let mut buffer = SnapshotBuffer::new();
    let reader = buffer.reader();

    let mut below_floor_frames = 0;
    let mut desync_frames = 0;
    let mut total_steps = 0;
    let start = Instant::now();

    for frame in 0..FRAMES {
        let steps = clock.advance(FRAME_TIME);
        for _ in 0..steps {
            sim.step().expect("terrain is installed");
        }
        total_steps += steps;
        buffer.publish(&sim);

        let terrain_hf = sim.terrain().expect("terrain is installed");
        let below = sim
            .particles()
            .iter()
            .filter(|p| p.bottom() < terrain_hf.elevation_at(p.position.x, p.position.z) - 1e-4)
            .count();
        if below > 0 {
            below_floor_frames += 1;
        }
        if sim.validate_grid().is_err() {
            desync_frames += 1;
        }

        if frame % 100 == 0 {
            let (version, snapshot) = reader.latest();
            let mean_y = snapshot.positions.iter().map(|p| p.y).sum::<f32>()
                / snapshot.len().max(1) as f32;
            println!(
                "Frame {:4} | step {:5} | snapshot v{:4} | mean y {:6.2} | below floor {}",
                frame, snapshot.step, version, mean_y, below
            );
        }
    }

    let elapsed = start.elapsed().as_secs_f32();
    let worst = worst_overlap(&sim);

    println!("\n=== RESULTS ===");
    println!(
        "Steps: {} in {:.2}s ({:.2} ms/step)",
        total_steps,
        elapsed,
        elapsed * 1000.0 / total_steps.max(1) as f32
    );
    println!("Frames with droplets below floor: {}", below_floor_frames);
    println!("Frames with grid desync: {}", desync_frames);
    println!("Worst residual overlap: {:.5} m", worst);

    let pass = below_floor_frames == 0 && desync_frames == 0 && worst < RADIUS * 0.2;
    println!("\n{}", if pass { "PASS" } else { "FAIL" });
}

fn worst_overlap(sim: &Simulator) -> f32 {
    let particles = sim.particles();
    let mut worst = 0.0f32;
    for (i, p) in particles.iter().enumerate() {
        for j in sim.query_neighbors(p.position, p.radius * 2.0) {
            if j <= i {
                continue;
            }
            let q = &particles[j];
            let overlap = p.radius + q.radius - p.position.distance(q.position);
            worst = worst.max(overlap);
        }
    }
    worst
}
