/// Control channels a driver (human or script) can set on the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarInput {
    Throttle,
    Nos,
    Brake,
    Handbrake,
    Clutch,
    SteerLeft,
    SteerRight,
    ShiftUp,
    ShiftDown,
    StartEngine,
    AbsToggle,
    TcsToggle,
    Neutral,
    FirstGear,
    SecondGear,
    ThirdGear,
    FourthGear,
    FifthGear,
    SixthGear,
    Reverse,
    Rollover,
}

impl CarInput {
    pub const COUNT: usize = 21;

    pub const ALL: [CarInput; Self::COUNT] = [
        CarInput::Throttle,
        CarInput::Nos,
        CarInput::Brake,
        CarInput::Handbrake,
        CarInput::Clutch,
        CarInput::SteerLeft,
        CarInput::SteerRight,
        CarInput::ShiftUp,
        CarInput::ShiftDown,
        CarInput::StartEngine,
        CarInput::AbsToggle,
        CarInput::TcsToggle,
        CarInput::Neutral,
        CarInput::FirstGear,
        CarInput::SecondGear,
        CarInput::ThirdGear,
        CarInput::FourthGear,
        CarInput::FifthGear,
        CarInput::SixthGear,
        CarInput::Reverse,
        CarInput::Rollover,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name of the constant exposed to autopilot scripts.
    pub const fn script_name(self) -> &'static str {
        match self {
            CarInput::Throttle => "THROTTLE",
            CarInput::Nos => "NOS",
            CarInput::Brake => "BRAKE",
            CarInput::Handbrake => "HANDBRAKE",
            CarInput::Clutch => "CLUTCH",
            CarInput::SteerLeft => "STEER_LEFT",
            CarInput::SteerRight => "STEER_RIGHT",
            CarInput::ShiftUp => "SHIFT_UP",
            CarInput::ShiftDown => "SHIFT_DOWN",
            CarInput::StartEngine => "START_ENGINE",
            CarInput::AbsToggle => "ABS_TOGGLE",
            CarInput::TcsToggle => "TCS_TOGGLE",
            CarInput::Neutral => "NEUTRAL",
            CarInput::FirstGear => "FIRST_GEAR",
            CarInput::SecondGear => "SECOND_GEAR",
            CarInput::ThirdGear => "THIRD_GEAR",
            CarInput::FourthGear => "FOURTH_GEAR",
            CarInput::FifthGear => "FIFTH_GEAR",
            CarInput::SixthGear => "SIXTH_GEAR",
            CarInput::Reverse => "REVERSE",
            CarInput::Rollover => "ROLLOVER",
        }
    }
}

/// One value per [`CarInput`] channel, indexed by [`CarInput::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs {
    values: [f32; CarInput::COUNT],
}

impl Default for ControlInputs {
    fn default() -> Self {
        Self {
            values: [0.0; CarInput::COUNT],
        }
    }
}

impl ControlInputs {
    pub fn get(&self, input: CarInput) -> f32 {
        self.values[input.index()]
    }

    pub fn set(&mut self, input: CarInput, value: f32) {
        self.values[input.index()] = value;
    }

    pub fn get_index(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn set_index(&mut self, index: usize, value: f32) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.values = [0.0; CarInput::COUNT];
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
