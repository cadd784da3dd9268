//! Droplet simulator: integration, terrain collision, droplet contacts.
//!
//! One call to [`Simulator::step`] advances every droplet by the fixed `dt`:
//!
//! 1. Semi-implicit Euler: velocity picks up gravity first, then moves the droplet.
//! 2. Collision passes in particle-array order: terrain floor clamp, then
//!    pairwise separation against higher-id neighbors from the spatial grid.
//!    With the default single pass every overlapping pair is resolved once.
//! 3. A last position-only floor clamp so pair pushes never leave a droplet
//!    underground.
//! 4. The grid is brought in line with the final positions.

use std::ops::Range;

use glam::Vec3;

use crate::constants::CELL_SIZE_PER_RADIUS;
use crate::error::{Result, SimError};
use crate::grid::SpatialGrid;
use crate::heightfield::HeightField;
use crate::params::SimParams;
use crate::particle::{Particle, Particles};

/// Lifecycle state. Stepping happens inside `&mut self` and is never observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    /// No terrain installed yet
    Uninitialized,
    /// Terrain installed; particles may be registered and stepped
    Ready,
}

/// What a call to [`Simulator::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// False when the step was skipped (paused or no particles)
    pub advanced: bool,
    /// Floor corrections applied
    pub terrain_contacts: usize,
    /// Overlapping droplet pairs separated
    pub pair_contacts: usize,
    /// Grid cell changes
    pub relocated: usize,
}

/// Owns the terrain, the droplets and the spatial grid over them.
pub struct Simulator {
    params: SimParams,
    terrain: Option<HeightField>,
    grid: SpatialGrid,
    particles: Particles,
    /// Shared radius for newly spawned droplets
    radius: f32,
    paused: bool,
    step_count: u64,

    /// Positions the grid currently files each particle under
    synced: Vec<Vec3>,
    neighbors: Vec<usize>,
}

impl Simulator {
    /// Create a simulator with no terrain. The grid is sized for `params.initial_radius`.
    pub fn new(params: SimParams) -> Result<Self> {
        params.validate()?;
        let grid = SpatialGrid::new(params.initial_radius * CELL_SIZE_PER_RADIUS)?;
        Ok(Self {
            radius: params.initial_radius,
            params,
            terrain: None,
            grid,
            particles: Particles::new(),
            paused: false,
            step_count: 0,
            synced: Vec::new(),
            neighbors: Vec::new(),
        })
    }

    pub fn state(&self) -> SimState {
        if self.terrain.is_some() {
            SimState::Ready
        } else {
            SimState::Uninitialized
        }
    }

    /// Install or replace the terrain. On error the previous terrain stays.
    pub fn set_terrain(&mut self, samples: &[Vec3]) -> Result<()> {
        let terrain = HeightField::from_samples(samples)?;
        match terrain.resolution() {
            Some((nx, nz)) => log::info!(
                "Terrain installed: {}x{} lattice, elevation {:.2}..{:.2}",
                nx,
                nz,
                terrain.min_elevation(),
                terrain.max_elevation()
            ),
            None => log::info!(
                "Terrain installed: {} scattered samples, elevation {:.2}..{:.2}",
                samples.len(),
                terrain.min_elevation(),
                terrain.max_elevation()
            ),
        }
        self.terrain = Some(terrain);
        Ok(())
    }

    /// Add stationary droplets at `centers`, all with `radius`.
    ///
    /// `radius` becomes the shared spawn radius. If the grid's cell size no
    /// longer matches the largest live radius, the grid is resized and
    /// rebuilt from every particle. Returns the ids created.
    pub fn register_particles(&mut self, centers: &[Vec3], radius: f32) -> Result<Range<usize>> {
        if self.terrain.is_none() {
            return Err(SimError::NoTerrain);
        }
        check_radius(radius)?;
        if let Some(index) = centers.iter().position(|c| !c.is_finite()) {
            return Err(SimError::NonFiniteCenter { index });
        }

        let start = self.particles.len();
        for &center in centers {
            self.particles.spawn_at(center, radius);
        }
        self.radius = radius;

        let cell_size = self.particles.max_radius().unwrap_or(radius) * CELL_SIZE_PER_RADIUS;
        if cell_size != self.grid.cell_size() {
            self.grid.configure(cell_size)?;
            self.grid.rebuild(&self.particles.list);
            log::info!(
                "Spatial grid resized to {:.3} for radius {:.3}, rebuilt with {} particles",
                cell_size,
                radius,
                self.particles.len()
            );
        } else {
            for id in start..self.particles.len() {
                self.grid.insert(id, self.particles.list[id].position);
            }
        }

        Ok(start..self.particles.len())
    }

    /// Add one droplet at the current shared radius.
    pub fn spawn_particle(&mut self, center: Vec3) -> Result<usize> {
        self.register_particles(&[center], self.radius)
            .map(|ids| ids.start)
    }

    /// Change the shared radius. Existing droplets are discarded since the
    /// grid sizing they were filed under no longer applies.
    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        check_radius(radius)?;
        self.reset();
        self.grid.configure(radius * CELL_SIZE_PER_RADIUS)?;
        self.radius = radius;
        log::info!("Droplet radius set to {:.3}", radius);
        Ok(())
    }

    /// Remove all droplets. The grid is left as is; pair with
    /// [`Simulator::clear_particle_grid`] or use [`Simulator::reset`].
    pub fn clear_particles(&mut self) {
        self.particles.clear();
    }

    /// Empty the grid buckets without touching the droplets.
    pub fn clear_particle_grid(&mut self) {
        self.grid.clear();
    }

    /// Remove all droplets and grid entries together.
    pub fn reset(&mut self) {
        let removed = self.particles.len();
        self.clear_particles();
        self.clear_particle_grid();
        log::info!("Simulation reset, {} particles removed", removed);
    }

    /// Set the fixed step. Rejected values leave the old step in place.
    pub fn set_delta_time(&mut self, dt: f32) -> Result<()> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimError::InvalidDeltaTime(dt));
        }
        self.params.dt = dt;
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_paused(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Advance every droplet by one fixed step.
    ///
    /// Fails only when no terrain is installed. Paused or empty simulations
    /// return without touching anything.
    pub fn step(&mut self) -> Result<StepStats> {
        let Self {
            params,
            terrain,
            grid,
            particles,
            synced,
            neighbors,
            paused,
            ..
        } = self;

        let terrain = terrain.as_ref().ok_or(SimError::NoTerrain)?;
        if *paused || particles.is_empty() {
            return Ok(StepStats::default());
        }

        synced.clear();
        synced.extend(particles.positions());

        let list = &mut particles.list;
        let dt = params.dt;
        let mut stats = StepStats {
            advanced: true,
            ..Default::default()
        };

        // 1. Integrate
        let gravity = Vec3::new(0.0, params.gravity, 0.0);
        let drag = (1.0 - params.linear_damping * dt).max(0.0);
        for p in list.iter_mut() {
            p.velocity += gravity * dt;
            p.velocity *= drag;
            p.position += p.velocity * dt;
        }

        // 2. Collide
        let max_radius = list.iter().map(|p| p.radius).fold(0.0f32, f32::max);
        for _ in 0..params.solver_iterations {
            stats.relocated += sync_grid(grid, list, synced);

            for i in 0..list.len() {
                if resolve_terrain(&mut list[i], terrain, params) {
                    stats.terrain_contacts += 1;
                }

                let query_radius = list[i].radius + max_radius;
                grid.query_neighbors_into(list[i].position, query_radius, list, neighbors);
                for &j in neighbors.iter() {
                    if j <= i {
                        continue;
                    }
                    let (head, tail) = list.split_at_mut(j);
                    if resolve_pair(&mut head[i], &mut tail[0], params.pair_restitution) {
                        stats.pair_contacts += 1;
                    }
                }
            }
        }

        // 3. Floor wins over pair pushes
        for p in list.iter_mut() {
            if clamp_to_floor(p, terrain) {
                stats.terrain_contacts += 1;
            }
        }

        // 4. Re-bucket
        stats.relocated += sync_grid(grid, list, synced);

        self.step_count += 1;

        #[cfg(debug_assertions)]
        {
            if let Err(e) = self.validate_grid() {
                log::error!("Step {}: {}", self.step_count, e);
            }
        }

        log::debug!(
            "Step {}: {} terrain contacts, {} pair contacts, {} cell changes",
            self.step_count,
            stats.terrain_contacts,
            stats.pair_contacts,
            stats.relocated
        );

        Ok(stats)
    }

    /// Check that every droplet is filed exactly once, in the cell its
    /// position maps to, and that the grid holds nothing else.
    pub fn validate_grid(&self) -> Result<()> {
        let list = &self.particles.list;
        let mut seen = vec![0usize; list.len()];
        let mut stale = 0;

        for (key, ids) in self.grid.entries() {
            for &id in ids {
                match list.get(id) {
                    Some(p) if self.grid.cell_of(p.position) == key => seen[id] += 1,
                    _ => stale += 1,
                }
            }
        }

        let missing = seen.iter().filter(|&&count| count == 0).count();
        let duplicated = seen.iter().map(|&count| count.saturating_sub(1)).sum();

        if missing == 0 && duplicated == 0 && stale == 0 {
            Ok(())
        } else {
            Err(SimError::GridDesync {
                missing,
                duplicated,
                stale,
            })
        }
    }

    /// Ids of droplets within `radius` of `position`, ascending.
    pub fn query_neighbors(&self, position: Vec3, radius: f32) -> Vec<usize> {
        self.grid
            .query_neighbors(position, radius, &self.particles.list)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles.list
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Shared radius for new droplets.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn delta_time(&self) -> f32 {
        self.params.dt
    }

    pub fn terrain(&self) -> Option<&HeightField> {
        self.terrain.as_ref()
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Steps actually advanced (skipped steps don't count).
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}

fn check_radius(radius: f32) -> Result<()> {
    if radius > 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidRadius(radius))
    }
}

/// Move each particle's grid entry from `synced[i]` to its current position.
fn sync_grid(grid: &mut SpatialGrid, list: &[Particle], synced: &mut [Vec3]) -> usize {
    let mut moved = 0;
    for (id, (p, last)) in list.iter().zip(synced.iter_mut()).enumerate() {
        if grid.relocate(id, *last, p.position) {
            moved += 1;
        }
        *last = p.position;
    }
    moved
}

/// Keep the droplet above the terrain. Returns true if it had sunk in.
fn resolve_terrain(p: &mut Particle, terrain: &HeightField, params: &SimParams) -> bool {
    let floor = terrain.elevation_at(p.position.x, p.position.z) + p.radius;
    if p.position.y >= floor {
        return false;
    }

    p.position.y = floor;
    if p.velocity.y < 0.0 {
        p.velocity.y = -p.velocity.y * params.terrain_restitution;
    }
    let keep = 1.0 - params.terrain_friction;
    p.velocity.x *= keep;
    p.velocity.z *= keep;
    true
}

/// Lift a droplet pushed underground by a pair contact. Only the position
/// and the downward speed change; the bounce was handled in the pass.
fn clamp_to_floor(p: &mut Particle, terrain: &HeightField) -> bool {
    let floor = terrain.elevation_at(p.position.x, p.position.z) + p.radius;
    if p.position.y >= floor {
        return false;
    }
    p.position.y = floor;
    p.velocity.y = p.velocity.y.max(0.0);
    true
}

/// Push an overlapping pair apart, half the overlap each, and damp their
/// approach along the contact normal. Returns true if they overlapped.
fn resolve_pair(a: &mut Particle, b: &mut Particle, restitution: f32) -> bool {
    if !a.overlaps(b) {
        return false;
    }

    let delta = b.position - a.position;
    let reach = a.radius + b.radius;
    let dist = delta.length();
    // Coincident centers: separate along +X
    let normal = if dist > 1e-6 { delta / dist } else { Vec3::X };
    let correction = normal * ((reach - dist) * 0.5);
    a.position -= correction;
    b.position += correction;

    let approach = (b.velocity - a.velocity).dot(normal);
    if approach < 0.0 {
        let impulse = normal * (approach * 0.5 * (1.0 + restitution));
        a.velocity += impulse;
        b.velocity -= impulse;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn flat_simulator(params: SimParams) -> Simulator {
        let mut sim = Simulator::new(params).unwrap();
        let hf = HeightField::flat(Vec2::splat(-50.0), Vec2::splat(50.0), 0.0).unwrap();
        sim.set_terrain(hf.samples()).unwrap();
        sim
    }

    #[test]
    fn test_new_is_uninitialized() {
        let sim = Simulator::new(SimParams::default()).unwrap();
        assert_eq!(sim.state(), SimState::Uninitialized);
        assert_eq!(sim.particle_count(), 0);
        assert_eq!(sim.grid().cell_size(), 1.0);
    }

    #[test]
    fn test_gravity_accelerates_downward() {
        let mut sim = flat_simulator(SimParams::default());
        sim.register_particles(&[Vec3::new(0.0, 10.0, 0.0)], 0.5).unwrap();

        let stats = sim.step().unwrap();
        assert!(stats.advanced);
        let p = sim.particles()[0];
        assert!(p.velocity.y < 0.0);
        assert!(p.position.y < 10.0);
    }

    #[test]
    fn test_velocity_updates_before_position() {
        let params = SimParams {
            dt: 0.5,
            gravity: -2.0,
            ..Default::default()
        };
        let mut sim = flat_simulator(params);
        sim.register_particles(&[Vec3::new(0.0, 10.0, 0.0)], 0.5).unwrap();
        sim.step().unwrap();

        // v = -1.0 after one step, then x += v * dt
        let p = sim.particles()[0];
        assert!((p.velocity.y + 1.0).abs() < 1e-6);
        assert!((p.position.y - 9.5).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_pair_splits_overlap() {
        let mut a = Particle::at(Vec3::ZERO, 0.5);
        let mut b = Particle::at(Vec3::new(0.6, 0.0, 0.0), 0.5);
        assert!(resolve_pair(&mut a, &mut b, 0.0));
        assert!((a.position.x + 0.2).abs() < 1e-6);
        assert!((b.position.x - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_pair_inelastic_matches_normal_velocity() {
        let mut a = Particle::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.5);
        let mut b = Particle::new(Vec3::new(0.9, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0.5);
        resolve_pair(&mut a, &mut b, 0.0);
        assert!(a.velocity.x.abs() < 1e-6);
        assert!(b.velocity.x.abs() < 1e-6);
    }

    #[test]
    fn test_resolve_pair_coincident_centers() {
        let mut a = Particle::at(Vec3::ONE, 0.5);
        let mut b = Particle::at(Vec3::ONE, 0.5);
        assert!(resolve_pair(&mut a, &mut b, 0.0));
        assert!((b.position.x - a.position.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_terrain_bounce_with_restitution() {
        let params = SimParams {
            terrain_restitution: 0.5,
            ..Default::default()
        };
        let hf = HeightField::flat(Vec2::splat(-1.0), Vec2::splat(1.0), 0.0).unwrap();
        let mut p = Particle::new(Vec3::new(0.0, 0.2, 0.0), Vec3::new(0.0, -4.0, 0.0), 0.5);
        assert!(resolve_terrain(&mut p, &hf, &params));
        assert_eq!(p.position.y, 0.5);
        assert!((p.velocity.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_final_clamp_skips_bounce_and_friction() {
        let hf = HeightField::flat(Vec2::splat(-1.0), Vec2::splat(1.0), 0.0).unwrap();
        let mut p = Particle::new(Vec3::new(0.0, 0.2, 0.0), Vec3::new(3.0, -4.0, 0.0), 0.5);
        assert!(clamp_to_floor(&mut p, &hf));
        assert_eq!(p.position.y, 0.5);
        assert_eq!(p.velocity, Vec3::new(3.0, 0.0, 0.0));
        assert!(!clamp_to_floor(&mut p, &hf));
    }

    #[test]
    fn test_paused_step_is_noop() {
        let mut sim = flat_simulator(SimParams::default());
        sim.register_particles(&[Vec3::new(0.0, 5.0, 0.0)], 0.5).unwrap();
        sim.set_paused(true);
        let before = sim.particles().to_vec();
        let stats = sim.step().unwrap();
        assert!(!stats.advanced);
        assert_eq!(sim.particles(), before.as_slice());
        assert_eq!(sim.step_count(), 0);

        sim.toggle_paused();
        assert!(sim.step().unwrap().advanced);
    }

    #[test]
    fn test_grid_valid_after_steps() {
        let mut sim = flat_simulator(SimParams::default());
        let centers: Vec<Vec3> = (0..20)
            .map(|i| Vec3::new((i % 5) as f32 * 0.8, 3.0 + (i / 5) as f32, 0.0))
            .collect();
        sim.register_particles(&centers, 0.5).unwrap();
        for _ in 0..60 {
            sim.step().unwrap();
            sim.validate_grid().unwrap();
        }
    }
}
