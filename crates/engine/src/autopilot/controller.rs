use std::rc::Rc;

use tracing::{error, info, warn};

use super::car_input::ControlInputs;
use super::error::AutopilotError;
use super::script::{ControlBuffer, ScriptLimits, ScriptSession, ScriptSource};
use super::vehicle::{RoadPatches, VehicleSnapshot, VehicleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotState {
    Disengaged,
    /// Only observable from inside `reset`.
    Engaging,
    Engaged,
    /// Disengaged by a script failure.
    Faulted,
}

/// Drives [`ControlInputs`] from a script once per simulation step.
pub struct CarAutopilot {
    source: ScriptSource,
    road: Rc<dyn RoadPatches>,
    limits: ScriptLimits,
    session: Option<ScriptSession>,
    state: AutopilotState,
    outputs: ControlBuffer,
}

impl CarAutopilot {
    pub fn new(source: ScriptSource, road: Rc<dyn RoadPatches>, limits: ScriptLimits) -> Self {
        Self {
            source,
            road,
            limits,
            session: None,
            state: AutopilotState::Disengaged,
            outputs: ControlBuffer::default(),
        }
    }

    pub fn state(&self) -> AutopilotState {
        self.state
    }

    pub fn is_engaged(&self) -> bool {
        self.state == AutopilotState::Engaged
    }

    pub fn script_name(&self) -> String {
        self.source.name()
    }

    /// Latest values written by the script; zeroed on every reset.
    pub fn inputs(&self) -> ControlInputs {
        self.outputs.snapshot()
    }

    pub fn engage(&mut self, on: bool) -> Result<(), AutopilotError> {
        if !on {
            if self.state != AutopilotState::Disengaged {
                info!(script = %self.source.name(), "autopilot_disengaged");
            }
            self.state = AutopilotState::Disengaged;
            return Ok(());
        }
        if self.is_engaged() {
            return Ok(());
        }

        self.reset()?;
        info!(script = %self.source.name(), "autopilot_engaged");
        Ok(())
    }

    /// Replaces the interpreter session with a freshly compiled one. On
    /// failure the controller is left disengaged without a session.
    pub fn reset(&mut self) -> Result<(), AutopilotError> {
        self.state = AutopilotState::Engaging;
        self.session = None;
        self.outputs.clear();

        match ScriptSession::open(&self.source, Rc::clone(&self.road), self.limits) {
            Ok(session) => {
                self.session = Some(session);
                self.state = AutopilotState::Engaged;
                Ok(())
            }
            Err(err) => {
                self.state = AutopilotState::Disengaged;
                error!(error = %err, "autopilot_reset_failed");
                Err(err)
            }
        }
    }

    /// Runs one script step. Any failure leaves the controller `Faulted`.
    pub fn update(&mut self, dt: f64, car: &dyn VehicleState) -> Result<(), AutopilotError> {
        if !self.is_engaged() {
            return Err(AutopilotError::NotEngaged);
        }
        let Some(session) = self.session.as_mut() else {
            self.state = AutopilotState::Disengaged;
            return Err(AutopilotError::NotEngaged);
        };

        let snapshot = VehicleSnapshot::capture(car);
        let outcome = match session.call_update(&self.outputs, &snapshot, dt) {
            Ok(true) => return Ok(()),
            Ok(false) => AutopilotError::UpdateRejected {
                file: session.name().to_string(),
            },
            Err(err) => err,
        };

        self.state = AutopilotState::Faulted;
        match &outcome {
            AutopilotError::UpdateRejected { file } => {
                warn!(script = %file, "autopilot_update_rejected")
            }
            err => error!(error = %err, "autopilot_update_failed"),
        }
        Err(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::autopilot::car_input::CarInput;
    use crate::autopilot::vehicle::fixtures::{StraightRoad, StubCar};
    use crate::autopilot::vehicle::{PatchId, Vec3};

    fn autopilot(source: &str) -> CarAutopilot {
        CarAutopilot::new(
            ScriptSource::inline("drive.rhai", source),
            Rc::new(StraightRoad { patch_count: 3 }),
            ScriptLimits::default(),
        )
    }

    fn car_on(patch: Option<PatchId>) -> StubCar {
        StubCar {
            velocity: Vec3::new(5.0, 0.0, 0.0),
            front_left: patch,
            ..StubCar::default()
        }
    }

    #[test]
    fn new_controller_is_disengaged() {
        let mut pilot = autopilot("fn update(o, p, r, a, v, x, dt) { true }");

        assert_eq!(pilot.state(), AutopilotState::Disengaged);
        assert!(matches!(
            pilot.update(0.01, &car_on(None)),
            Err(AutopilotError::NotEngaged)
        ));
    }

    #[test]
    fn engage_without_update_stays_disengaged() {
        let mut pilot = autopilot("fn steer() { 0.0 }");

        let result = pilot.engage(true);

        assert!(matches!(result, Err(AutopilotError::MissingEntryPoint { .. })));
        assert!(!pilot.is_engaged());
        assert!(matches!(
            pilot.update(0.01, &car_on(None)),
            Err(AutopilotError::NotEngaged)
        ));
        assert_eq!(pilot.inputs(), ControlInputs::default());
    }

    #[test]
    fn compile_failure_stays_disengaged() {
        let mut pilot = autopilot("fn update(o, p, r, a, v, x, dt) {\n    true +\n}");

        let result = pilot.engage(true);

        assert!(matches!(result, Err(AutopilotError::Compile { .. })));
        assert_eq!(pilot.state(), AutopilotState::Disengaged);
    }

    #[test]
    fn engaged_update_writes_inputs() {
        let mut pilot = autopilot(
            r#"
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                outputs[input::THROTTLE] = 0.75;
                outputs[input::STEER_RIGHT] = vel.x / 10.0;
                true
            }
            "#,
        );
        pilot.engage(true).expect("engage");

        pilot.update(0.01, &car_on(Some(PatchId(0)))).expect("update");

        assert!(pilot.is_engaged());
        assert_eq!(pilot.inputs().get(CarInput::Throttle), 0.75);
        assert_eq!(pilot.inputs().get(CarInput::SteerRight), 0.5);
    }

    #[test]
    fn falsy_return_faults_controller() {
        let mut pilot = autopilot(
            r#"
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                patch.valid
            }
            "#,
        );
        pilot.engage(true).expect("engage");

        pilot.update(0.01, &car_on(Some(PatchId(1)))).expect("on road");
        let result = pilot.update(0.01, &car_on(None));

        assert!(matches!(result, Err(AutopilotError::UpdateRejected { .. })));
        assert_eq!(pilot.state(), AutopilotState::Faulted);
        assert!(matches!(
            pilot.update(0.01, &car_on(Some(PatchId(1)))),
            Err(AutopilotError::NotEngaged)
        ));
    }

    #[test]
    fn runtime_error_faults_controller() {
        let mut pilot = autopilot(
            r#"
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                throw "wheel fell off";
            }
            "#,
        );
        pilot.engage(true).expect("engage");

        let result = pilot.update(0.01, &car_on(None));

        assert!(matches!(result, Err(AutopilotError::Runtime { .. })));
        assert_eq!(pilot.state(), AutopilotState::Faulted);
    }

    #[test]
    fn lookahead_off_chain_end_reports_failure() {
        let mut pilot = autopilot(
            r#"
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                let corners = patch_corners();
                if getPatchData(corners, 5, patch) {
                    outputs[input::THROTTLE] = 1.0;
                }
                outputs[input::BRAKE] = corners[2].y;
                true
            }
            "#,
        );
        pilot.engage(true).expect("engage");

        pilot.update(0.01, &car_on(Some(PatchId(0)))).expect("update");

        assert_eq!(pilot.inputs().get(CarInput::Throttle), 0.0);
        assert_eq!(pilot.inputs().get(CarInput::Brake), 0.0);
    }

    #[test]
    fn reengage_resets_script_state() {
        let mut pilot = autopilot(
            r#"
            fn init() {
                this.steps = 0;
            }
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                this.steps += 1;
                outputs[input::THROTTLE] = this.steps;
                true
            }
            "#,
        );
        pilot.engage(true).expect("engage");
        pilot.update(0.01, &car_on(None)).expect("first");
        pilot.update(0.01, &car_on(None)).expect("second");
        assert_eq!(pilot.inputs().get(CarInput::Throttle), 2.0);

        pilot.engage(false).expect("disengage");
        assert_eq!(pilot.state(), AutopilotState::Disengaged);
        pilot.engage(true).expect("re-engage");
        assert_eq!(pilot.inputs().get(CarInput::Throttle), 0.0);

        pilot.update(0.01, &car_on(None)).expect("after reset");
        assert_eq!(pilot.inputs().get(CarInput::Throttle), 1.0);
    }

    #[test]
    fn engage_twice_keeps_session() {
        let mut pilot = autopilot(
            r#"
            fn init() {
                this.steps = 0;
            }
            fn update(outputs, patch, rate, att, vel, pos, dt) {
                this.steps += 1;
                outputs[input::BRAKE] = this.steps;
                true
            }
            "#,
        );
        pilot.engage(true).expect("engage");
        pilot.update(0.01, &car_on(None)).expect("first");
        pilot.engage(true).expect("engage again");
        pilot.update(0.01, &car_on(None)).expect("second");

        assert_eq!(pilot.inputs().get(CarInput::Brake), 2.0);
    }

    #[test]
    fn script_loads_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".rhai")
            .tempfile()
            .expect("temp script");
        writeln!(
            file,
            "fn update(outputs, patch, rate, att, vel, pos, dt) {{ outputs[input::HANDBRAKE] = 1; true }}"
        )
        .expect("write script");

        let mut pilot = CarAutopilot::new(
            ScriptSource::File(file.path().to_path_buf()),
            Rc::new(StraightRoad { patch_count: 1 }),
            ScriptLimits::default(),
        );
        pilot.engage(true).expect("engage");
        pilot.update(0.02, &car_on(None)).expect("update");

        assert_eq!(pilot.inputs().get(CarInput::Handbrake), 1.0);
    }
}
