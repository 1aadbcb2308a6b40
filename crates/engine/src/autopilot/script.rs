//! rhai session hosting one autopilot script.
//!
//! Everything the script sees is a copy (`Vec3`, `Mat3`, `PatchRef`) or a
//! host-owned output buffer (`ControlInputs`, `PatchCorners`); no live engine
//! object is handed across.
//!
//! Script functions cannot see top-level variables, so state that must survive
//! between steps lives in `this`, an object map owned by the session. An
//! optional `fn init()` runs once per session to seed it.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use rhai::{
    CallFnOptions, Dynamic, Engine, EvalAltResult, Map, Module, ParseError, Position, Scope, AST,
    FLOAT, INT,
};
use tracing::{debug, info};

use super::car_input::{CarInput, ControlInputs};
use super::error::{AutopilotError, StackFrame};
use super::vehicle::{lookahead_corners, Mat3, PatchCorners, PatchId, RoadPatches, Vec3, VehicleSnapshot};

pub const ENTRY_POINT: &str = "update";
const ENTRY_POINT_ARITY: usize = 7;
pub const INIT_HOOK: &str = "init";
pub const PATCH_DATA_CALLBACK: &str = "getPatchData";
pub const MAX_STACK_FRAMES: usize = 10;
pub const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;
pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    File(PathBuf),
    Inline { name: String, source: String },
}

impl ScriptSource {
    pub fn inline(name: impl Into<String>, source: impl Into<String>) -> Self {
        ScriptSource::Inline {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ScriptSource::File(path) => path.display().to_string(),
            ScriptSource::Inline { name, .. } => name.clone(),
        }
    }

    fn load(&self) -> Result<String, AutopilotError> {
        match self {
            ScriptSource::File(path) => {
                fs::read_to_string(path).map_err(|source| AutopilotError::ScriptRead {
                    path: path.clone(),
                    source,
                })
            }
            ScriptSource::Inline { source, .. } => Ok(source.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_operations: DEFAULT_MAX_OPERATIONS,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
        }
    }
}

/// Control vector shared between the host and the running script.
#[derive(Debug, Clone, Default)]
pub struct ControlBuffer(Rc<RefCell<ControlInputs>>);

impl ControlBuffer {
    pub fn snapshot(&self) -> ControlInputs {
        *self.0.borrow()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Corner output buffer filled by `getPatchData`.
#[derive(Debug, Clone, Default)]
pub struct CornerBuffer(Rc<RefCell<PatchCorners>>);

impl CornerBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Opaque patch handle; only the host can resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRef(pub Option<PatchId>);

/// A compiled script plus the interpreter it runs in. Dropping the session
/// discards every piece of script state.
pub struct ScriptSession {
    name: String,
    engine: Engine,
    ast: AST,
    scope: Scope<'static>,
    state: Dynamic,
}

impl ScriptSession {
    pub fn open(
        source: &ScriptSource,
        road: Rc<dyn RoadPatches>,
        limits: ScriptLimits,
    ) -> Result<Self, AutopilotError> {
        let name = source.name();
        let text = source.load()?;
        let engine = build_engine(road, limits);

        let ast = engine
            .compile(&text)
            .map_err(|error| compile_error(&name, &error))?;

        if !defines_function(&ast, ENTRY_POINT, ENTRY_POINT_ARITY) {
            return Err(AutopilotError::MissingEntryPoint {
                file: name,
                entry: ENTRY_POINT,
            });
        }

        let mut scope = Scope::new();
        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|error| runtime_error(&name, &error))?;

        let mut state = Dynamic::from_map(Map::new());
        if defines_function(&ast, INIT_HOOK, 0) {
            let options = CallFnOptions::new()
                .eval_ast(false)
                .rewind_scope(true)
                .bind_this_ptr(&mut state);
            engine
                .call_fn_with_options::<Dynamic>(options, &mut scope, &ast, INIT_HOOK, ())
                .map_err(|error| runtime_error(&name, &error))?;
        }

        debug!(script = %name, "script_session_opened");
        Ok(Self {
            name,
            engine,
            ast,
            scope,
            state,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls `update(outputs, patch, rate, att, vel, pos, dt)` and reports the
    /// truthiness of its result.
    pub fn call_update(
        &mut self,
        outputs: &ControlBuffer,
        vehicle: &VehicleSnapshot,
        dt: f64,
    ) -> Result<bool, AutopilotError> {
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut self.state);
        let args = (
            outputs.clone(),
            PatchRef(vehicle.patch),
            vehicle.angular_velocity,
            vehicle.orientation,
            vehicle.velocity,
            vehicle.position,
            dt as FLOAT,
        );

        let result = self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, ENTRY_POINT, args)
            .map_err(|error| runtime_error(&self.name, &error))?;
        Ok(is_truthy(&result))
    }
}

fn defines_function(ast: &AST, name: &str, arity: usize) -> bool {
    ast.iter_functions()
        .any(|function| function.name == name && function.params.len() == arity)
}

fn build_engine(road: Rc<dyn RoadPatches>, limits: ScriptLimits) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.on_print(|text| info!(target: "autopilot_script", "{text}"));
    engine.on_debug(|text, source, position| {
        debug!(target: "autopilot_script", source, line = position.line(), "{text}")
    });

    register_vector_api(&mut engine);
    register_control_api(&mut engine);
    register_patch_api(&mut engine, road);
    engine.register_static_module("input", car_input_module().into());
    engine
}

fn car_input_module() -> Module {
    let mut module = Module::new();
    for input in CarInput::ALL {
        module.set_var(input.script_name(), input.index() as INT);
    }
    module
}

fn register_vector_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<Vec3>("Vec3")
        .register_get("x", |vector: &mut Vec3| vector.x)
        .register_get("y", |vector: &mut Vec3| vector.y)
        .register_get("z", |vector: &mut Vec3| vector.z)
        .register_indexer_get(
            |vector: &mut Vec3, axis: INT| -> Result<FLOAT, Box<EvalAltResult>> {
                checked_index(axis, 3).and_then(|axis| vector.get(axis)).ok_or_else(|| bounds_error(3, axis))
            },
        );

    engine
        .register_type_with_name::<Mat3>("Mat3")
        .register_indexer_get(
            |matrix: &mut Mat3, row: INT| -> Result<Vec3, Box<EvalAltResult>> {
                checked_index(row, 3).and_then(|row| matrix.row(row)).ok_or_else(|| bounds_error(3, row))
            },
        )
        .register_fn(
            "get",
            |matrix: &mut Mat3, row: INT, col: INT| -> Result<FLOAT, Box<EvalAltResult>> {
                let value = checked_index(row, 3)
                    .zip(checked_index(col, 3))
                    .and_then(|(row, col)| matrix.get(row, col));
                value.ok_or_else(|| bounds_error(3, row.max(col)))
            },
        );
}

fn register_control_api(engine: &mut Engine) {
    engine
        .register_type_with_name::<ControlBuffer>("ControlInputs")
        .register_fn("len", |_: &mut ControlBuffer| CarInput::COUNT as INT)
        .register_indexer_get(
            |buffer: &mut ControlBuffer, index: INT| -> Result<FLOAT, Box<EvalAltResult>> {
                checked_index(index, CarInput::COUNT)
                    .and_then(|index| buffer.0.borrow().get_index(index))
                    .map(FLOAT::from)
                    .ok_or_else(|| bounds_error(CarInput::COUNT, index))
            },
        )
        .register_indexer_set(
            |buffer: &mut ControlBuffer, index: INT, value: FLOAT| -> Result<(), Box<EvalAltResult>> {
                set_control(buffer, index, value as f32)
            },
        )
        .register_indexer_set(
            |buffer: &mut ControlBuffer, index: INT, value: INT| -> Result<(), Box<EvalAltResult>> {
                set_control(buffer, index, value as f32)
            },
        );
}

fn set_control(buffer: &ControlBuffer, index: INT, value: f32) -> Result<(), Box<EvalAltResult>> {
    let written = checked_index(index, CarInput::COUNT)
        .is_some_and(|index| buffer.0.borrow_mut().set_index(index, value));
    if written {
        Ok(())
    } else {
        Err(bounds_error(CarInput::COUNT, index))
    }
}

fn register_patch_api(engine: &mut Engine, road: Rc<dyn RoadPatches>) {
    engine
        .register_type_with_name::<PatchRef>("PatchRef")
        .register_get("valid", |patch: &mut PatchRef| patch.0.is_some());

    engine
        .register_type_with_name::<CornerBuffer>("PatchCorners")
        .register_fn("patch_corners", CornerBuffer::new)
        .register_indexer_get(
            |buffer: &mut CornerBuffer, corner: INT| -> Result<Vec3, Box<EvalAltResult>> {
                checked_index(corner, 4)
                    .map(|corner| buffer.0.borrow().corners[corner])
                    .ok_or_else(|| bounds_error(4, corner))
            },
        );

    engine.register_fn(
        PATCH_DATA_CALLBACK,
        move |out: &mut CornerBuffer, lookahead: INT, patch: PatchRef| -> bool {
            match lookahead_corners(road.as_ref(), patch.0, lookahead) {
                Some(corners) => {
                    *out.0.borrow_mut() = corners;
                    true
                }
                None => false,
            }
        },
    );
}

fn checked_index(index: INT, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|index| *index < len)
}

fn bounds_error(len: usize, index: INT) -> Box<EvalAltResult> {
    EvalAltResult::ErrorArrayBounds(len, index, Position::NONE).into()
}

fn is_truthy(value: &Dynamic) -> bool {
    if let Ok(flag) = value.as_bool() {
        return flag;
    }
    if let Ok(number) = value.as_int() {
        return number != 0;
    }
    !value.is_unit()
}

fn compile_error(file: &str, error: &ParseError) -> AutopilotError {
    let position = error.position();
    AutopilotError::Compile {
        file: file.to_string(),
        line: position.line().unwrap_or(0),
        column: position.position().unwrap_or(0),
        message: error.err_type().to_string(),
    }
}

fn runtime_error(file: &str, error: &EvalAltResult) -> AutopilotError {
    let mut stack = Vec::new();
    let mut innermost = error;
    while let EvalAltResult::ErrorInFunctionCall(function, _, inner, position) = innermost {
        stack.push(StackFrame {
            function: function.clone(),
            line: position.line().unwrap_or(0),
        });
        innermost = inner.as_ref();
    }
    stack.reverse();
    stack.truncate(MAX_STACK_FRAMES);

    AutopilotError::Runtime {
        file: file.to_string(),
        line: innermost.position().line().unwrap_or(0),
        message: innermost.to_string(),
        stack,
    }
}
