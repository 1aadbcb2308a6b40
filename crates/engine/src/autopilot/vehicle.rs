//! Read-only views of the vehicle and road consumed by the autopilot, and the
//! plain-data records copied across the script boundary.

use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: usize) -> Option<f64> {
        match axis {
            0 => Some(self.x),
            1 => Some(self.y),
            2 => Some(self.z),
            _ => None,
        }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Row-major 3x3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    pub rows: [[f64; 3]; 3],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3 {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Rotation about the vertical (z) axis.
    pub fn from_yaw(yaw: f64) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self {
            rows: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn row(&self, row: usize) -> Option<Vec3> {
        self.rows
            .get(row)
            .map(|[x, y, z]| Vec3::new(*x, *y, *z))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row).and_then(|values| values.get(col)).copied()
    }
}

/// Handle into the road geometry provider. Never dereferenced on the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

pub trait VehicleState {
    fn center_of_mass(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn orientation(&self) -> Mat3;
    fn angular_velocity(&self) -> Vec3;
    /// Road patch the wheel is touching, if any.
    fn wheel_patch(&self, wheel: Wheel) -> Option<PatchId>;
}

/// Chain of road patches, each a 4x4 control-point quad.
pub trait RoadPatches {
    fn next_patch(&self, patch: PatchId) -> Option<PatchId>;
    /// Control point at quad coordinates `(u, v)`, both in `0..=3`.
    /// `None` for unknown patches.
    fn point(&self, patch: PatchId, u: usize, v: usize) -> Option<Vec3>;
}

/// Corner control points of a patch: (0,0), (0,3), (3,0), (3,3).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PatchCorners {
    pub corners: [Vec3; 4],
}

const CORNER_COORDS: [(usize, usize); 4] = [(0, 0), (0, 3), (3, 0), (3, 3)];

/// Longest walk `lookahead_corners` will take. Closed tracks link back to
/// their start, so the walk needs a host-side bound.
pub const MAX_LOOKAHEAD: i64 = 256;

/// Walks `lookahead` links from `start` and returns the corners of the patch
/// reached. `None` when there is no start patch, the chain ends early, or
/// `lookahead` exceeds [`MAX_LOOKAHEAD`].
pub fn lookahead_corners(
    road: &dyn RoadPatches,
    start: Option<PatchId>,
    lookahead: i64,
) -> Option<PatchCorners> {
    if lookahead > MAX_LOOKAHEAD {
        return None;
    }
    let mut patch = start?;
    for _ in 0..lookahead.max(0) {
        patch = road.next_patch(patch)?;
    }

    let mut corners = [Vec3::ZERO; 4];
    for (corner, (u, v)) in corners.iter_mut().zip(CORNER_COORDS) {
        *corner = road.point(patch, u, v)?;
    }
    Some(PatchCorners { corners })
}

/// Vehicle state copied out of the dynamics engine for one autopilot step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VehicleSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Mat3,
    pub angular_velocity: Vec3,
    pub patch: Option<PatchId>,
}

impl VehicleSnapshot {
    pub fn capture(car: &dyn VehicleState) -> Self {
        Self {
            position: car.center_of_mass(),
            velocity: car.velocity(),
            orientation: car.orientation(),
            angular_velocity: car.angular_velocity(),
            patch: current_patch(car),
        }
    }
}

/// Front-left contact first, front-right as fallback.
pub fn current_patch(car: &dyn VehicleState) -> Option<PatchId> {
    car.wheel_patch(Wheel::FrontLeft)
        .or_else(|| car.wheel_patch(Wheel::FrontRight))
}


#[cfg(test)]
mod tests {
    use super::fixtures::{LoopRoad, StraightRoad, StubCar};
    use super::*;

    #[test]
    fn lookahead_zero_returns_start_corners() {
        let road = StraightRoad { patch_count: 3 };
        let corners = lookahead_corners(&road, Some(PatchId(1)), 0).expect("corners");

        assert_eq!(corners.corners[0], Vec3::new(3.0, -1.5, 0.0));
        assert_eq!(corners.corners[1], Vec3::new(6.0, -1.5, 0.0));
        assert_eq!(corners.corners[2], Vec3::new(3.0, 1.5, 0.0));
        assert_eq!(corners.corners[3], Vec3::new(6.0, 1.5, 0.0));
    }

    #[test]
    fn lookahead_walks_next_links() {
        let road = StraightRoad { patch_count: 5 };
        let corners = lookahead_corners(&road, Some(PatchId(0)), 4).expect("corners");

        assert_eq!(corners.corners[0].x, 12.0);
    }

    #[test]
    fn lookahead_past_chain_end_fails() {
        let road = StraightRoad { patch_count: 3 };

        assert_eq!(lookahead_corners(&road, Some(PatchId(0)), 3), None);
        assert_eq!(lookahead_corners(&road, None, 0), None);
    }

    #[test]
    fn lookahead_on_closed_loop_wraps_within_bound() {
        let road = LoopRoad { patch_count: 4 };
        let corners = lookahead_corners(&road, Some(PatchId(3)), MAX_LOOKAHEAD).expect("corners");

        assert_eq!(corners.corners[0].x, 3.0);
    }

    #[test]
    fn lookahead_beyond_bound_fails_on_closed_loop() {
        let road = LoopRoad { patch_count: 4 };

        assert_eq!(lookahead_corners(&road, Some(PatchId(0)), MAX_LOOKAHEAD + 1), None);
        assert_eq!(lookahead_corners(&road, Some(PatchId(0)), 4_000_000_000_000), None);
        assert_eq!(lookahead_corners(&road, Some(PatchId(0)), i64::MAX), None);
    }

    #[test]
    fn negative_lookahead_stays_on_start() {
        let road = StraightRoad { patch_count: 3 };

        assert_eq!(
            lookahead_corners(&road, Some(PatchId(2)), -4),
            lookahead_corners(&road, Some(PatchId(2)), 0)
        );
    }

    #[test]
    fn current_patch_prefers_front_left() {
        let mut car = StubCar {
            front_left: Some(PatchId(4)),
            front_right: Some(PatchId(5)),
            ..StubCar::default()
        };
        assert_eq!(current_patch(&car), Some(PatchId(4)));

        car.front_left = None;
        assert_eq!(current_patch(&car), Some(PatchId(5)));

        car.front_right = None;
        assert_eq!(current_patch(&car), None);
    }

    #[test]
    fn snapshot_copies_vehicle_state() {
        let car = StubCar {
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::new(4.0, 0.0, 0.0),
            orientation: Mat3::from_yaw(0.0),
            angular_velocity: Vec3::new(0.0, 0.0, 0.1),
            front_left: None,
            front_right: Some(PatchId(9)),
        };
        let snapshot = VehicleSnapshot::capture(&car);

        assert_eq!(snapshot.position, car.position);
        assert_eq!(snapshot.velocity, car.velocity);
        assert_eq!(snapshot.orientation, Mat3::IDENTITY);
        assert_eq!(snapshot.angular_velocity, car.angular_velocity);
        assert_eq!(snapshot.patch, Some(PatchId(9)));
    }

    #[test]
    fn matrix_accessors_are_bounds_checked() {
        let matrix = Mat3::from_yaw(std::f64::consts::FRAC_PI_2);

        assert!((matrix.get(1, 0).expect("entry") - 1.0).abs() < 1e-12);
        assert_eq!(matrix.get(3, 0), None);
        assert_eq!(matrix.row(2), Some(Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(matrix.row(3), None);
    }
}
