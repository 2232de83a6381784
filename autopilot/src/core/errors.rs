//! Fatal logic errors raised inside exclusive tasks.
//!
//! Every error here means the procedure's own assumptions were wrong. None of
//! them is retried: the step driver drops the task and the scheduler reports
//! the error to its diagnostics sink. Callers recover the concrete type with
//! `anyhow::Error::downcast_ref`.

use std::fmt;
use std::panic::Location;

use crate::core::screen::{ScreenExpectation, ScreenState};

/// The screen did not match the registered expectation on the first check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenMismatch {
    pub task: String,
    pub expected: ScreenExpectation,
    pub actual: ScreenState,
    pub location: &'static Location<'static>,
}

impl fmt::Display for ScreenMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exclusive task \"{}\" expected screen to be {}, but it is {} (at {})",
            self.task, self.expected, self.actual, self.location
        )
    }
}

impl std::error::Error for ScreenMismatch {}

/// A loop iteration finished without suspending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDelay {
    pub task: String,
    pub location: &'static Location<'static>,
}

impl fmt::Display for MissingDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "previous iteration of exclusive task \"{}\" did not call delay (at {})",
            self.task, self.location
        )
    }
}

impl std::error::Error for MissingDelay {}

/// A procedure was resumed after it had already returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumedCompleted;

impl fmt::Display for ResumedCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resumed a procedure that already completed")
    }
}

impl std::error::Error for ResumedCompleted {}

/// A character has no keystroke equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappableChar {
    pub task: String,
    pub ch: char,
    pub location: &'static Location<'static>,
}

impl fmt::Display for UnmappableChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exclusive task \"{}\" tried to type {:?}, which has no key (at {})",
            self.task, self.ch, self.location
        )
    }
}

impl std::error::Error for UnmappableChar {}

/// The host kept its screen dismissed for longer than the configured bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissedTimeout {
    pub task: String,
    pub steps: u32,
    pub location: &'static Location<'static>,
}

impl fmt::Display for DismissedTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exclusive task \"{}\" waited {} steps for a dismissed screen to clear (at {})",
            self.task, self.steps, self.location
        )
    }
}

impl std::error::Error for DismissedTimeout {}

/// Call-site location carried by a fatal error, if it records one.
pub fn fatal_location(err: &anyhow::Error) -> Option<&'static Location<'static>> {
    if let Some(mismatch) = err.downcast_ref::<ScreenMismatch>() {
        return Some(mismatch.location);
    }
    if let Some(unmappable) = err.downcast_ref::<UnmappableChar>() {
        return Some(unmappable.location);
    }
    if let Some(missing) = err.downcast_ref::<MissingDelay>() {
        return Some(missing.location);
    }
    if let Some(timeout) = err.downcast_ref::<DismissedTimeout>() {
        return Some(timeout.location);
    }
    None
}
