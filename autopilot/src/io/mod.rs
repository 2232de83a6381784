//! I/O helpers for autopilot commands.

pub mod config;
pub mod diagnostics;
pub mod scenario;
pub mod transcript;
