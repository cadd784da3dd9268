//! Terrain elevation sampler built from terrain vertices.
//!
//! Samples that form a complete rectilinear lattice (the normal output of the
//! terrain generator) are bilinearly interpolated. Anything else falls back to
//! a nearest-sample lookup through a 2D bucket index. Queries outside the
//! sampled extent clamp to the edge instead of failing.

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::error::{Result, SimError};

/// Immutable terrain height query surface.
#[derive(Clone, Debug)]
pub struct HeightField {
    samples: Vec<Vec3>,
    /// Minimum (x, z) of the sampled extent
    min: Vec2,
    /// Maximum (x, z) of the sampled extent
    max: Vec2,
    min_elevation: f32,
    max_elevation: f32,
    lookup: Lookup,
}

#[derive(Clone, Debug)]
enum Lookup {
    /// Complete lattice; heights stored row-major, `heights[iz * xs.len() + ix]`.
    Lattice {
        xs: Vec<f32>,
        zs: Vec<f32>,
        heights: Vec<f32>,
    },
    /// Irregular samples bucketed on a uniform (x, z) grid.
    Scattered {
        cell_size: f32,
        cells_x: i32,
        cells_z: i32,
        buckets: FxHashMap<(i32, i32), Vec<usize>>,
    },
}

impl HeightField {
    /// Build from terrain sample points (x, elevation, z).
    pub fn from_samples(samples: &[Vec3]) -> Result<Self> {
        if samples.is_empty() {
            return Err(SimError::EmptyTerrain);
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(SimError::NonFiniteTerrain { index });
        }

        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut min_elevation = f32::MAX;
        let mut max_elevation = f32::MIN;
        for s in samples {
            min = min.min(Vec2::new(s.x, s.z));
            max = max.max(Vec2::new(s.x, s.z));
            min_elevation = min_elevation.min(s.y);
            max_elevation = max_elevation.max(s.y);
        }

        let lookup = build_lattice(samples, min, max)
            .unwrap_or_else(|| build_scattered(samples, min, max));

        Ok(Self {
            samples: samples.to_vec(),
            min,
            max,
            min_elevation,
            max_elevation,
            lookup,
        })
    }

    /// Flat terrain covering `min..max` in (x, z) at the given elevation.
    pub fn flat(min: Vec2, max: Vec2, elevation: f32) -> Result<Self> {
        Self::from_samples(&[
            Vec3::new(min.x, elevation, min.y),
            Vec3::new(max.x, elevation, min.y),
            Vec3::new(min.x, elevation, max.y),
            Vec3::new(max.x, elevation, max.y),
        ])
    }

    /// Terrain height at a horizontal coordinate.
    pub fn elevation_at(&self, x: f32, z: f32) -> f32 {
        match &self.lookup {
            Lookup::Lattice { xs, zs, heights } => {
                let nx = xs.len();
                let (ix0, ix1, tx) = locate(xs, x);
                let (iz0, iz1, tz) = locate(zs, z);

                let h00 = heights[iz0 * nx + ix0];
                let h10 = heights[iz0 * nx + ix1];
                let h01 = heights[iz1 * nx + ix0];
                let h11 = heights[iz1 * nx + ix1];

                let near = h00 + (h10 - h00) * tx;
                let far = h01 + (h11 - h01) * tx;
                near + (far - near) * tz
            }
            Lookup::Scattered {
                cell_size,
                cells_x,
                cells_z,
                buckets,
            } => {
                let query = self.clamp_to_extent(x, z);
                let index =
                    self.nearest_sample(query, *cell_size, *cells_x, *cells_z, buckets);
                self.samples[index].y
            }
        }
    }

    /// The samples this field was built from, in their original order.
    pub fn samples(&self) -> &[Vec3] {
        &self.samples
    }

    /// Horizontal extent as (min, max), with `Vec2::y` holding world z.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    /// Extent along X.
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Extent along Z.
    pub fn length(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn min_elevation(&self) -> f32 {
        self.min_elevation
    }

    pub fn max_elevation(&self) -> f32 {
        self.max_elevation
    }

    /// True when samples were recognized as a complete lattice.
    pub fn is_lattice(&self) -> bool {
        matches!(self.lookup, Lookup::Lattice { .. })
    }

    /// Lattice resolution (samples along X, samples along Z).
    pub fn resolution(&self) -> Option<(usize, usize)> {
        match &self.lookup {
            Lookup::Lattice { xs, zs, .. } => Some((xs.len(), zs.len())),
            Lookup::Scattered { .. } => None,
        }
    }

    fn clamp_to_extent(&self, x: f32, z: f32) -> Vec2 {
        let x = if x.is_nan() { self.min.x } else { x };
        let z = if z.is_nan() { self.min.y } else { z };
        Vec2::new(x, z).clamp(self.min, self.max)
    }

    /// Ring search outward from the query's bucket. A ring at distance `r`
    /// cannot hold anything closer than `(r - 1) * cell_size`, which bounds
    /// the search once a candidate is found. Once the rings cover more
    /// buckets than are occupied, a plain scan over the samples is cheaper.
    fn nearest_sample(
        &self,
        query: Vec2,
        cell_size: f32,
        cells_x: i32,
        cells_z: i32,
        buckets: &FxHashMap<(i32, i32), Vec<usize>>,
    ) -> usize {
        let (cx, cz) = bucket_of(query, self.min, cell_size);
        let max_ring = cells_x.max(cells_z) + 1;
        let mut best: Option<(f32, usize)> = None;

        for ring in 0..=max_ring {
            let side = 2 * ring as usize + 1;
            if side * side > buckets.len() {
                return self.nearest_by_scan(query);
            }

            for dz in -ring..=ring {
                let step = if dz.abs() == ring { 1 } else { (2 * ring) as usize };
                for dx in (-ring..=ring).step_by(step.max(1)) {
                    let Some(indices) = buckets.get(&(cx + dx, cz + dz)) else {
                        continue;
                    };
                    for &i in indices {
                        self.offer(query, i, &mut best);
                    }
                }
            }

            if let Some((best_d, _)) = best {
                let reach = ring as f32 * cell_size;
                if best_d <= reach * reach {
                    break;
                }
            }
        }

        match best {
            Some((_, i)) => i,
            None => self.nearest_by_scan(query),
        }
    }

    fn nearest_by_scan(&self, query: Vec2) -> usize {
        let mut best = None;
        for i in 0..self.samples.len() {
            self.offer(query, i, &mut best);
        }
        best.map(|(_, i)| i).unwrap_or(0)
    }

    /// Keep sample `i` if it is closer than `best`; ties go to the lower index.
    fn offer(&self, query: Vec2, i: usize, best: &mut Option<(f32, usize)>) {
        let s = self.samples[i];
        let d = Vec2::new(s.x, s.z).distance_squared(query);
        let better = match *best {
            None => true,
            Some((best_d, best_i)) => d < best_d || (d == best_d && i < best_i),
        };
        if better {
            *best = Some((d, i));
        }
    }
}

fn bucket_of(p: Vec2, origin: Vec2, cell_size: f32) -> (i32, i32) {
    let rel = (p - origin) / cell_size;
    (rel.x.floor() as i32, rel.y.floor() as i32)
}

/// Sorted distinct values, merging anything closer than `tol`.
fn distinct_axis(values: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut axis: Vec<f32> = values.collect();
    axis.sort_by(f32::total_cmp);
    axis.dedup_by(|b, a| (*b - *a).abs() <= tol);
    axis
}

fn axis_index(axis: &[f32], v: f32, tol: f32) -> Option<usize> {
    let i = axis.partition_point(|&a| a < v - tol);
    (i < axis.len() && (axis[i] - v).abs() <= tol).then_some(i)
}

fn build_lattice(samples: &[Vec3], min: Vec2, max: Vec2) -> Option<Lookup> {
    let extent = (max - min).max_element().max(1.0);
    let tol = extent * 1e-5;

    let xs = distinct_axis(samples.iter().map(|s| s.x), tol);
    let zs = distinct_axis(samples.iter().map(|s| s.z), tol);
    if xs.len() * zs.len() != samples.len() {
        return None;
    }

    let mut heights = vec![f32::NAN; samples.len()];
    for s in samples {
        let ix = axis_index(&xs, s.x, tol)?;
        let iz = axis_index(&zs, s.z, tol)?;
        let slot = &mut heights[iz * xs.len() + ix];
        if !slot.is_nan() {
            // Two samples on one lattice node: not a lattice.
            return None;
        }
        *slot = s.y;
    }

    Some(Lookup::Lattice { xs, zs, heights })
}

fn build_scattered(samples: &[Vec3], min: Vec2, max: Vec2) -> Lookup {
    let extent = max - min;
    let area = extent.x * extent.y;
    let n = samples.len() as f32;
    let cell_size = if area > f32::EPSILON {
        (area / n).sqrt()
    } else {
        extent.max_element() / n
    }
    .max(1e-3);

    let cells_x = (extent.x / cell_size).ceil() as i32 + 1;
    let cells_z = (extent.y / cell_size).ceil() as i32 + 1;

    let mut buckets: FxHashMap<(i32, i32), Vec<usize>> = FxHashMap::default();
    for (i, s) in samples.iter().enumerate() {
        let key = bucket_of(Vec2::new(s.x, s.z), min, cell_size);
        buckets.entry(key).or_default().push(i);
    }

    Lookup::Scattered {
        cell_size,
        cells_x,
        cells_z,
        buckets,
    }
}

/// Bracketing indices and blend factor for `v` along a sorted axis,
/// clamped to the axis ends.
fn locate(axis: &[f32], v: f32) -> (usize, usize, f32) {
    let n = axis.len();
    if n == 1 || v.is_nan() || v <= axis[0] {
        return (0, 0, 0.0);
    }
    if v >= axis[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let i = axis.partition_point(|&a| a <= v).saturating_sub(1).min(n - 2);
    let span = axis[i + 1] - axis[i];
    let t = if span > 0.0 { (v - axis[i]) / span } else { 0.0 };
    (i, i + 1, t.clamp(0.0, 1.0))
}
