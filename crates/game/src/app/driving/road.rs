use std::f64::consts::TAU;

use engine::autopilot::{PatchId, RoadPatches, Vec3};

/// Flat circular track driven counter-clockwise, split into equal patches.
///
/// Quad coordinate `u` runs across the road from the inner edge (0) to the
/// outer edge (3); `v` runs along it in driving direction.
#[derive(Debug, Clone)]
pub(crate) struct RingRoad {
    radius: f64,
    width: f64,
    patch_count: u32,
}

impl RingRoad {
    pub(crate) fn new(radius: f64, width: f64, patch_count: u32) -> Self {
        Self {
            radius,
            width,
            patch_count: patch_count.max(3),
        }
    }

    pub(crate) fn radius(&self) -> f64 {
        self.radius
    }

    pub(crate) fn width(&self) -> f64 {
        self.width
    }

    fn patch_angle(&self) -> f64 {
        TAU / self.patch_count as f64
    }

    /// Point on the centre line at `angle`, with the driving direction.
    pub(crate) fn start_pose(&self, angle: f64) -> (Vec3, f64) {
        let position = Vec3::new(self.radius * angle.cos(), self.radius * angle.sin(), 0.0);
        (position, angle + TAU / 4.0)
    }

    /// Signed distance from the centre line, positive towards the outside.
    pub(crate) fn lateral_offset(&self, position: Vec3) -> f64 {
        position.x.hypot(position.y) - self.radius
    }

    pub(crate) fn patch_at(&self, position: Vec3) -> Option<PatchId> {
        if self.lateral_offset(position).abs() > self.width / 2.0 {
            return None;
        }
        let angle = position.y.atan2(position.x).rem_euclid(TAU);
        let index = (angle / self.patch_angle()) as u32;
        Some(PatchId(index.min(self.patch_count - 1)))
    }
}

impl RoadPatches for RingRoad {
    fn next_patch(&self, patch: PatchId) -> Option<PatchId> {
        (patch.0 < self.patch_count).then(|| PatchId((patch.0 + 1) % self.patch_count))
    }

    fn point(&self, patch: PatchId, u: usize, v: usize) -> Option<Vec3> {
        if patch.0 >= self.patch_count || u > 3 || v > 3 {
            return None;
        }
        let across = (u as f64 / 3.0 - 0.5) * self.width;
        let angle = (patch.0 as f64 + v as f64 / 3.0) * self.patch_angle();
        let radius = self.radius + across;
        Some(Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0))
    }
}
