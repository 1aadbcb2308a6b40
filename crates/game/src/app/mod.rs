pub(crate) mod bootstrap;
pub(crate) mod driving;
pub(crate) mod loop_runner;
