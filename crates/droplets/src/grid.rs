//! Uniform 3D spatial grid for droplet neighbor queries.
//!
//! Cells are cubes of `cell_size`, keyed by `floor(position / cell_size)` per
//! axis and stored sparsely in a hash map, so droplets can wander anywhere
//! without a fixed world box. With `cell_size >= 2 * max_radius` every
//! touching pair lives in adjacent cells and a contact query scans 27 cells.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::error::{Result, SimError};
use crate::particle::Particle;

/// Integer cell coordinate.
pub type CellKey = (i32, i32, i32);

/// Sparse bucket grid mapping cells to the particle ids inside them.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: FxHashMap<CellKey, Vec<usize>>,
    /// Total ids stored across all buckets
    entries: usize,
}

impl SpatialGrid {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_size: f32) -> Result<Self> {
        check_cell_size(cell_size)?;
        Ok(Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: FxHashMap::default(),
            entries: 0,
        })
    }

    /// Change the cell size. Empties every bucket; the caller reinserts
    /// the live particles (see [`SpatialGrid::rebuild`]).
    pub fn configure(&mut self, cell_size: f32) -> Result<()> {
        check_cell_size(cell_size)?;
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;
        self.clear();
        Ok(())
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing a world position.
    pub fn cell_of(&self, position: Vec3) -> CellKey {
        let c = (position * self.inv_cell_size).floor();
        (c.x as i32, c.y as i32, c.z as i32)
    }

    /// Add `id` to the bucket for `position`. Re-inserting into the same
    /// cell is a no-op.
    pub fn insert(&mut self, id: usize, position: Vec3) {
        let bucket = self.cells.entry(self.cell_of(position)).or_default();
        if !bucket.contains(&id) {
            bucket.push(id);
            self.entries += 1;
        }
    }

    /// Remove `id` from the bucket for `position`.
    ///
    /// Returns false (and logs) when the id isn't there, which means the
    /// grid and the particle array have drifted apart.
    pub fn remove(&mut self, id: usize, position: Vec3) -> bool {
        let key = self.cell_of(position);
        let removed = match self.cells.get_mut(&key) {
            Some(bucket) => match bucket.iter().position(|&other| other == id) {
                Some(slot) => {
                    bucket.swap_remove(slot);
                    if bucket.is_empty() {
                        self.cells.remove(&key);
                    }
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            self.entries -= 1;
        } else {
            log::warn!(
                "SpatialGrid::remove: particle {} not found in cell {:?}",
                id,
                key
            );
        }
        removed
    }

    /// Move `id` from the cell of `old` to the cell of `new`.
    ///
    /// Returns true when the particle changed cell.
    pub fn relocate(&mut self, id: usize, old: Vec3, new: Vec3) -> bool {
        if self.cell_of(old) == self.cell_of(new) {
            return false;
        }
        self.remove(id, old);
        self.insert(id, new);
        true
    }

    /// Ids of particles within `radius` of `position`, ascending.
    ///
    /// Scans the 3x3x3 block around the query cell (wider if `radius`
    /// exceeds the cell size) and filters by true distance using `particles`.
    /// When that block would hold more cells than are occupied, every
    /// occupied bucket is filtered instead, so huge radii stay bounded.
    pub fn query_neighbors(&self, position: Vec3, radius: f32, particles: &[Particle]) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_neighbors_into(position, radius, particles, &mut out);
        out
    }

    /// Allocation-reusing form of [`SpatialGrid::query_neighbors`]; clears `out` first.
    pub fn query_neighbors_into(
        &self,
        position: Vec3,
        radius: f32,
        particles: &[Particle],
        out: &mut Vec<usize>,
    ) {
        out.clear();
        if !(radius >= 0.0) {
            return;
        }

        let (cx, cy, cz) = self.cell_of(position);
        let rings = (radius * self.inv_cell_size).ceil().max(1.0);
        let radius_sq = radius * radius;
        let mut stale = 0usize;

        let mut visit = |bucket: &Vec<usize>| {
            for &id in bucket {
                match particles.get(id) {
                    Some(p) if p.position.distance_squared(position) <= radius_sq => out.push(id),
                    Some(_) => {}
                    None => stale += 1,
                }
            }
        };

        // Past a few rings the block holds more cells than are occupied
        let block = (2.0 * rings as f64 + 1.0).powi(3);
        if block > self.cells.len() as f64 {
            for bucket in self.cells.values() {
                visit(bucket);
            }
        } else {
            let rings = rings as i32;
            for dx in -rings..=rings {
                for dy in -rings..=rings {
                    for dz in -rings..=rings {
                        let key = (
                            cx.saturating_add(dx),
                            cy.saturating_add(dy),
                            cz.saturating_add(dz),
                        );
                        if let Some(bucket) = self.cells.get(&key) {
                            visit(bucket);
                        }
                    }
                }
            }
        }

        if stale > 0 {
            log::warn!(
                "SpatialGrid::query_neighbors: skipped {} stale ids near cell {:?}",
                stale,
                (cx, cy, cz)
            );
        }

        // Array order keeps pair resolution reproducible; a desynced grid
        // can list an id twice.
        out.sort_unstable();
        out.dedup();
    }

    /// Clear the grid and insert every particle at its current position.
    pub fn rebuild(&mut self, particles: &[Particle]) {
        self.clear();
        for (id, p) in particles.iter().enumerate() {
            self.insert(id, p.position);
        }
    }

    /// Empty all buckets, keeping the cell size.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries = 0;
    }

    /// True if `id` is stored in the cell for `position`.
    pub fn contains(&self, id: usize, position: Vec3) -> bool {
        self.cells
            .get(&self.cell_of(position))
            .is_some_and(|bucket| bucket.contains(&id))
    }

    /// Number of stored ids.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Iterate over non-empty cells and their ids.
    pub fn entries(&self) -> impl Iterator<Item = (CellKey, &[usize])> + '_ {
        self.cells.iter().map(|(key, ids)| (*key, ids.as_slice()))
    }
}

fn check_cell_size(cell_size: f32) -> Result<()> {
    if cell_size > 0.0 && cell_size.is_finite() {
        Ok(())
    } else {
        Err(SimError::InvalidCellSize(cell_size))
    }
}
