//! Droplet representation.

use glam::Vec3;

/// A single droplet.
///
/// Grid-cell membership is not stored here; the spatial grid derives it from
/// `position` every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World position (droplet center)
    pub position: Vec3,
    /// Current velocity
    pub velocity: Vec3,
    /// Collision radius, always positive
    pub radius: f32,
}

impl Particle {
    /// Create a new particle at the given position with initial velocity.
    pub fn new(position: Vec3, velocity: Vec3, radius: f32) -> Self {
        debug_assert!(radius > 0.0, "particle radius must be positive");
        Self {
            position,
            velocity,
            radius,
        }
    }

    /// Create a stationary particle at the given position.
    pub fn at(position: Vec3, radius: f32) -> Self {
        Self::new(position, Vec3::ZERO, radius)
    }

    /// Lowest point of the droplet.
    pub fn bottom(&self) -> f32 {
        self.position.y - self.radius
    }

    /// True if this droplet and `other` interpenetrate.
    pub fn overlaps(&self, other: &Particle) -> bool {
        let reach = self.radius + other.radius;
        self.position.distance_squared(other.position) < reach * reach
    }
}

/// Collection of droplets. A particle's id is its index in `list`.
#[derive(Clone, Debug, Default)]
pub struct Particles {
    pub list: Vec<Particle>,
}

impl Particles {
    /// Create an empty particle collection.
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    /// Add a stationary particle and return its id.
    pub fn spawn_at(&mut self, position: Vec3, radius: f32) -> usize {
        self.list.push(Particle::at(position, radius));
        self.list.len() - 1
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Clear all particles.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// Largest radius among live particles, or `None` when empty.
    pub fn max_radius(&self) -> Option<f32> {
        self.list.iter().map(|p| p.radius).reduce(f32::max)
    }

    /// Iterate over particle positions in id order.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.list.iter().map(|p| p.position)
    }
}
