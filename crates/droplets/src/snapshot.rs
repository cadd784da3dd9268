//! Read-only hand-off of droplet state to a renderer.
//!
//! A [`Snapshot`] is an owned copy of one completed step. [`SnapshotBuffer`]
//! double-buffers snapshots so a render thread can read while the simulation
//! thread writes, and always sees a whole step.

use std::sync::{Arc, Mutex, MutexGuard};

use glam::Vec3;

use crate::simulation::Simulator;

/// Droplet positions and radii after a given step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// `Simulator::step_count` when taken
    pub step: u64,
    /// Shared spawn radius (for instanced draw scaling)
    pub radius: f32,
    pub positions: Vec<Vec3>,
    pub radii: Vec<f32>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Simulator {
    /// Copy out the current droplet state.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        self.snapshot_into(&mut snapshot);
        snapshot
    }

    /// Fill an existing snapshot, reusing its allocations.
    pub fn snapshot_into(&self, snapshot: &mut Snapshot) {
        snapshot.step = self.step_count();
        snapshot.radius = self.radius();
        snapshot.positions.clear();
        snapshot.positions.extend(self.particles().iter().map(|p| p.position));
        snapshot.radii.clear();
        snapshot.radii.extend(self.particles().iter().map(|p| p.radius));
    }
}

struct Buffers {
    front: Snapshot,
    version: u64,
}

/// Double-buffered snapshot shared between a writer and any number of readers.
///
/// The writer owns the back buffer outright and only takes the lock to swap
/// it to the front, so readers never wait on a step and never see a
/// half-written one.
pub struct SnapshotBuffer {
    shared: Arc<Mutex<Buffers>>,
    back: Snapshot,
}

/// Cloneable read side of a [`SnapshotBuffer`].
#[derive(Clone)]
pub struct SnapshotReader {
    shared: Arc<Mutex<Buffers>>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Buffers {
                front: Snapshot::default(),
                version: 0,
            })),
            back: Snapshot::default(),
        }
    }

    /// Handle for the render side.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Capture the simulator's state and make it the visible snapshot.
    /// Returns the new version number.
    pub fn publish(&mut self, sim: &Simulator) -> u64 {
        sim.snapshot_into(&mut self.back);
        let mut buffers = lock(&self.shared);
        std::mem::swap(&mut buffers.front, &mut self.back);
        buffers.version += 1;
        buffers.version
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotReader {
    /// Clone of the most recently published snapshot and its version.
    pub fn latest(&self) -> (u64, Snapshot) {
        let buffers = lock(&self.shared);
        (buffers.version, buffers.front.clone())
    }

    /// Copy the latest snapshot into `out` if it is newer than `seen`.
    /// Returns the version now held by `out`.
    pub fn latest_into(&self, seen: u64, out: &mut Snapshot) -> u64 {
        let buffers = lock(&self.shared);
        if buffers.version != seen {
            out.clone_from(&buffers.front);
        }
        buffers.version
    }

    pub fn version(&self) -> u64 {
        lock(&self.shared).version
    }
}

/// A panic on the other side can't leave a half-swapped buffer, so a
/// poisoned lock is still safe to read.
fn lock(shared: &Mutex<Buffers>) -> MutexGuard<'_, Buffers> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::HeightField;
    use crate::params::SimParams;
    use glam::Vec2;

    fn simulator_with_drops(count: usize) -> Simulator {
        let mut sim = Simulator::new(SimParams::default()).unwrap();
        let hf = HeightField::flat(Vec2::splat(-20.0), Vec2::splat(20.0), 0.0).unwrap();
        sim.set_terrain(hf.samples()).unwrap();
        let centers: Vec<Vec3> = (0..count)
            .map(|i| Vec3::new(i as f32 * 2.0, 5.0, 0.0))
            .collect();
        sim.register_particles(&centers, 0.5).unwrap();
        sim
    }

    #[test]
    fn test_snapshot_copies_state() {
        let mut sim = simulator_with_drops(3);
        sim.step().unwrap();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.step, 1);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.radii, vec![0.5; 3]);
        assert_eq!(snapshot.positions[1], sim.particles()[1].position);
    }

    #[test]
    fn test_publish_swaps_whole_steps() {
        let mut sim = simulator_with_drops(2);
        let mut buffer = SnapshotBuffer::new();
        let reader = buffer.reader();
        assert_eq!(reader.version(), 0);

        buffer.publish(&sim);
        sim.step().unwrap();
        let version = buffer.publish(&sim);

        let (seen, snapshot) = reader.latest();
        assert_eq!(seen, version);
        assert_eq!(snapshot.step, 1);

        let mut out = Snapshot::default();
        assert_eq!(reader.latest_into(0, &mut out), 2);
        assert_eq!(out, snapshot);
        // Already up to date: untouched
        out.positions.clear();
        reader.latest_into(2, &mut out);
        assert!(out.positions.is_empty());
    }

    #[test]
    fn test_reader_on_another_thread() {
        let mut sim = simulator_with_drops(4);
        let mut buffer = SnapshotBuffer::new();
        let reader = buffer.reader();

        let handle = std::thread::spawn(move || {
            let mut last = 0;
            let mut snapshot = Snapshot::default();
            while last < 10 {
                last = reader.latest_into(last, &mut snapshot);
                // Either nothing yet or a complete step
                assert!(snapshot.is_empty() || snapshot.len() == 4);
                std::thread::yield_now();
            }
            snapshot.step
        });

        for _ in 0..10 {
            sim.step().unwrap();
            buffer.publish(&sim);
        }
        assert_eq!(handle.join().unwrap(), 10);
    }
}
