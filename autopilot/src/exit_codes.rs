//! Stable exit codes for autopilot CLI commands.

/// Command succeeded; every simulated task completed.
pub const OK: i32 = 0;
/// Command failed due to invalid config/scenario files or other errors.
pub const INVALID: i32 = 1;
/// `autopilot simulate` stopped on a fatal task error.
pub const HALTED: i32 = 2;
/// `autopilot simulate` hit its tick limit with tasks still queued.
pub const INCOMPLETE: i32 = 3;
