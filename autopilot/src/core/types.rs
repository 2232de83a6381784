//! Shared types for the scheduling core.

use serde::{Deserialize, Serialize};

/// Result of driving one exclusive task for one host tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Rate limited: the procedure was not resumed this tick.
    Throttled,
    /// Resumed and parked again at a suspension point.
    Suspended,
    /// The procedure returned.
    Done,
}

/// Host-side state transitions routed to the active task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChange {
    ViewscreenChanged,
    Paused,
    Unpaused,
}

/// Per-task settings applied when a task enters the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDefaults {
    /// Host ticks per logical step for tasks that do not choose their own.
    pub wait_multiplier: usize,
    /// Bound on consecutive dismissed-screen waits inside `delay`.
    pub dismissed_wait_limit: Option<u32>,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            wait_multiplier: 1,
            dismissed_wait_limit: None,
        }
    }
}
