use std::rc::Rc;

use engine::autopilot::{
    AutopilotError, AutopilotState, CarAutopilot, CarInput, ControlInputs, RoadPatches,
    ScriptLimits, ScriptSource, VehicleState, Wheel,
};
use engine::{EventSystem, KeyCode, LoopCommand, Simulation};
use tracing::{info, warn};

use super::car::KinematicCar;
use super::road::RingRoad;

const RING_RADIUS: f64 = 60.0;
const RING_WIDTH: f64 = 8.0;
const RING_PATCHES: u32 = 48;

const TOGGLE_AUTOPILOT_KEY: KeyCode = KeyCode::Space;
const QUIT_KEY: KeyCode = KeyCode::Escape;

const MANUAL_BINDINGS: [(CarInput, [KeyCode; 2]); 5] = [
    (CarInput::Throttle, [KeyCode::ArrowUp, KeyCode::KeyW]),
    (CarInput::Brake, [KeyCode::ArrowDown, KeyCode::KeyS]),
    (CarInput::SteerLeft, [KeyCode::ArrowLeft, KeyCode::KeyA]),
    (CarInput::SteerRight, [KeyCode::ArrowRight, KeyCode::KeyD]),
    (CarInput::Handbrake, [KeyCode::ShiftLeft, KeyCode::ShiftRight]),
];

/// Demo track: one car on a ring road, driven by keyboard or autopilot.
pub(crate) struct DrivingSim {
    road: Rc<RingRoad>,
    car: KinematicCar,
    autopilot: CarAutopilot,
    manual: ControlInputs,
    laps_angle: f64,
}

impl DrivingSim {
    pub(crate) fn new(script: ScriptSource, limits: ScriptLimits) -> Self {
        let road = Rc::new(RingRoad::new(RING_RADIUS, RING_WIDTH, RING_PATCHES));
        let (position, heading) = road.start_pose(0.0);
        let car = KinematicCar::new(Rc::clone(&road), position, heading);
        let patches: Rc<dyn RoadPatches> = road.clone();

        Self {
            autopilot: CarAutopilot::new(script, patches, limits),
            road,
            car,
            manual: ControlInputs::default(),
            laps_angle: 0.0,
        }
    }

    pub(crate) fn engage_autopilot(&mut self) -> Result<(), AutopilotError> {
        self.autopilot.engage(true)
    }

    pub(crate) fn autopilot_state(&self) -> AutopilotState {
        self.autopilot.state()
    }

    #[cfg(test)]
    pub(crate) fn car(&self) -> &KinematicCar {
        &self.car
    }

    #[cfg(test)]
    pub(crate) fn road(&self) -> &RingRoad {
        &self.road
    }

    /// Angle travelled around the ring, in laps.
    pub(crate) fn laps(&self) -> f64 {
        self.laps_angle / std::f64::consts::TAU
    }

    fn toggle_autopilot(&mut self) {
        let engage = !self.autopilot.is_engaged();
        if let Err(err) = self.autopilot.engage(engage) {
            warn!(error = %err, "autopilot_toggle_failed");
        }
    }

    fn read_manual_controls(&mut self, events: &EventSystem) {
        for (input, keys) in MANUAL_BINDINGS {
            let held = keys.iter().any(|key| events.key_state(*key).is_held());
            self.manual.set(input, if held { 1.0 } else { 0.0 });
        }
    }

    fn track_progress(&mut self, before: f64) {
        let position = self.car.position();
        let after = position.y.atan2(position.x);
        let mut delta = after - before;
        if delta > std::f64::consts::PI {
            delta -= std::f64::consts::TAU;
        } else if delta < -std::f64::consts::PI {
            delta += std::f64::consts::TAU;
        }
        self.laps_angle += delta;
    }
}

impl Simulation for DrivingSim {
    fn load(&mut self) {
        info!(
            script = %self.autopilot.script_name(),
            radius = self.road.radius(),
            width = self.road.width(),
            "track_loaded"
        );
    }

    fn handle_input(&mut self, events: &EventSystem) -> LoopCommand {
        if events.key_state(QUIT_KEY).just_pressed() {
            info!(reason = "escape_key", "shutdown_requested");
            return LoopCommand::Quit;
        }
        if events.key_state(TOGGLE_AUTOPILOT_KEY).just_pressed() {
            self.toggle_autopilot();
        }
        self.read_manual_controls(events);
        LoopCommand::Continue
    }

    fn update(&mut self, fixed_dt_seconds: f64) -> LoopCommand {
        if self.autopilot.is_engaged() {
            // Failures are logged by the controller, which drops back to manual.
            let _ = self.autopilot.update(fixed_dt_seconds, &self.car);
        }

        let inputs = if self.autopilot.is_engaged() {
            self.autopilot.inputs()
        } else {
            self.manual
        };

        let position = self.car.position();
        self.car.step(&inputs, fixed_dt_seconds);
        self.track_progress(position.y.atan2(position.x));
        LoopCommand::Continue
    }

    fn autopilot_engaged(&self) -> bool {
        self.autopilot.is_engaged()
    }

    fn status_line(&self) -> Option<String> {
        let patch = self
            .car
            .wheel_patch(Wheel::FrontLeft)
            .map_or_else(|| "off road".to_string(), |patch| format!("patch {}", patch.0));
        Some(format!(
            "{:.1} m/s | {patch} | autopilot {:?} | lap {:.2}",
            self.car.speed(),
            self.autopilot_state(),
            self.laps()
        ))
    }

    fn shutdown(&mut self) {
        info!(laps = self.laps(), "drive_finished");
    }
}
