use std::rc::Rc;

use engine::autopilot::{CarInput, ControlInputs, Mat3, PatchId, Vec3, VehicleState, Wheel};

use super::road::RingRoad;

const MAX_ACCEL: f64 = 6.0;
const MAX_BRAKE: f64 = 12.0;
const HANDBRAKE_DECEL: f64 = 8.0;
const ROLLING_DRAG: f64 = 0.05;
const MAX_SPEED: f64 = 60.0;
const MAX_STEER_RADIANS: f64 = 0.5;
const WHEELBASE: f64 = 2.6;
const TRACK: f64 = 1.6;

/// Kinematic bicycle-model car standing in for a full dynamics engine.
#[derive(Debug, Clone)]
pub(crate) struct KinematicCar {
    road: Rc<RingRoad>,
    position: Vec3,
    heading: f64,
    speed: f64,
    yaw_rate: f64,
}

impl KinematicCar {
    pub(crate) fn new(road: Rc<RingRoad>, position: Vec3, heading: f64) -> Self {
        Self {
            road,
            position,
            heading,
            speed: 0.0,
            yaw_rate: 0.0,
        }
    }

    pub(crate) fn speed(&self) -> f64 {
        self.speed
    }

    #[cfg(test)]
    pub(crate) fn heading(&self) -> f64 {
        self.heading
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.0, MAX_SPEED);
    }

    fn forward(&self) -> Vec3 {
        Vec3::new(self.heading.cos(), self.heading.sin(), 0.0)
    }

    fn left(&self) -> Vec3 {
        Vec3::new(-self.heading.sin(), self.heading.cos(), 0.0)
    }

    /// Integrates one fixed step under `inputs`.
    pub(crate) fn step(&mut self, inputs: &ControlInputs, dt: f64) {
        let throttle = channel(inputs, CarInput::Throttle);
        let brake = channel(inputs, CarInput::Brake);
        let handbrake = channel(inputs, CarInput::Handbrake);
        let steer = channel(inputs, CarInput::SteerLeft) - channel(inputs, CarInput::SteerRight);

        let accel = throttle * MAX_ACCEL
            - brake * MAX_BRAKE
            - handbrake * HANDBRAKE_DECEL
            - ROLLING_DRAG * self.speed;
        self.set_speed(self.speed + accel * dt);

        self.yaw_rate = self.speed * (steer * MAX_STEER_RADIANS).tan() / WHEELBASE;
        self.heading += self.yaw_rate * dt;
        self.position = self.position + self.forward() * (self.speed * dt);
    }

    fn wheel_position(&self, wheel: Wheel) -> Vec3 {
        let (along, across) = match wheel {
            Wheel::FrontLeft => (WHEELBASE / 2.0, TRACK / 2.0),
            Wheel::FrontRight => (WHEELBASE / 2.0, -TRACK / 2.0),
            Wheel::RearLeft => (-WHEELBASE / 2.0, TRACK / 2.0),
            Wheel::RearRight => (-WHEELBASE / 2.0, -TRACK / 2.0),
        };
        self.position + self.forward() * along + self.left() * across
    }
}

fn channel(inputs: &ControlInputs, input: CarInput) -> f64 {
    f64::from(inputs.get(input).clamp(0.0, 1.0))
}

impl VehicleState for KinematicCar {
    fn center_of_mass(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.forward() * self.speed
    }

    fn orientation(&self) -> Mat3 {
        Mat3::from_yaw(self.heading)
    }

    fn angular_velocity(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.yaw_rate)
    }

    fn wheel_patch(&self, wheel: Wheel) -> Option<PatchId> {
        self.road.patch_at(self.wheel_position(wheel))
    }
}
