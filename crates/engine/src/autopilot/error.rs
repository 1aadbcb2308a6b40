use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// One entry of a script call stack, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    /// Line of the call site, 0 when unknown.
    pub line: usize,
}

#[derive(Debug, Error)]
pub enum AutopilotError {
    #[error("failed to read autopilot script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("script error {file}({line}, {column}): {message}")]
    Compile {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("script error {file}: {entry}() not found")]
    MissingEntryPoint { file: String, entry: &'static str },
    #[error("script runtime error {file}({line}): {message}\nstack trace:\n{}", render_stack(.stack))]
    Runtime {
        file: String,
        line: usize,
        message: String,
        stack: Vec<StackFrame>,
    },
    #[error("script {file}: update() failed")]
    UpdateRejected { file: String },
    #[error("autopilot is not engaged")]
    NotEngaged,
}

fn render_stack(stack: &[StackFrame]) -> String {
    stack
        .iter()
        .map(|frame| format!("{}: {}\n", frame.line, frame.function))
        .collect()
}
