mod car_input;
mod controller;
mod error;
mod script;
mod vehicle;

pub use car_input::{CarInput, ControlInputs};
pub use controller::{AutopilotState, CarAutopilot};
pub use error::{AutopilotError, StackFrame};
pub use script::{
    ControlBuffer, CornerBuffer, PatchRef, ScriptLimits, ScriptSession, ScriptSource,
    DEFAULT_MAX_CALL_LEVELS, DEFAULT_MAX_OPERATIONS, ENTRY_POINT, INIT_HOOK, MAX_STACK_FRAMES,
    PATCH_DATA_CALLBACK,
};
pub use vehicle::{
    current_patch, lookahead_corners, Mat3, PatchCorners, PatchId, RoadPatches, Vec3,
    VehicleSnapshot, VehicleState, Wheel, MAX_LOOKAHEAD,
};
