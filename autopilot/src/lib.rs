//! Exclusive UI-automation tasks driven one host tick at a time.
//!
//! A task is written as straight-line async code that presses keys and
//! declares which screen it expects to be on. The scheduler runs at most one
//! task at a time, resumes it once per host tick (or less often, per the
//! task's rate), and feeds the keys it produced to the host. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (coroutines, tasks, screen
//!   matching, key names). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config and scenario files,
//!   transcripts, diagnostics).
//!
//! Orchestration modules ([`scheduler`], [`sim`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod scheduler;
pub mod sim;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
