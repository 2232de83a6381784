//! Where fatal task errors are reported before the task is dropped.

use tracing::error;

use crate::core::errors::fatal_location;

/// Receives fatal task errors.
pub trait Diagnostics {
    fn fatal(&mut self, task: &str, error: &anyhow::Error);
}

/// Reports through `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn fatal(&mut self, task: &str, error: &anyhow::Error) {
        match fatal_location(error) {
            Some(location) => error!(
                task,
                file = location.file(),
                line = location.line(),
                "exclusive task halted: {error:#}"
            ),
            None => error!(task, "exclusive task halted: {error:#}"),
        }
    }
}
