//! Deterministic, pure logic for exclusive tasks.
//!
//! Core modules must be free of I/O side effects. The host is reached only
//! through the [`screen::Host`] and [`keys::InputSink`] traits, so every
//! module here runs against in-memory fakes in tests.

pub mod coroutine;
pub mod errors;
pub mod keys;
pub mod screen;
pub mod task;
pub mod types;
