//! JSON transcript of a simulation run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::sim::{KeyFeed, SimulationOutcome, SimulationStop};

#[derive(Debug, Clone, Serialize)]
pub struct Transcript<'a> {
    pub scenario: &'a str,
    pub ticks: u64,
    pub stop: &'a SimulationStop,
    pub completed: &'a [String],
    pub feeds: &'a [KeyFeed],
}

impl<'a> Transcript<'a> {
    pub fn new(scenario: &'a str, outcome: &'a SimulationOutcome) -> Self {
        Self {
            scenario,
            ticks: outcome.ticks,
            stop: &outcome.stop,
            completed: &outcome.completed,
            feeds: &outcome.feeds,
        }
    }
}

/// Write the transcript as pretty JSON with a trailing newline.
pub fn write_transcript(path: &Path, transcript: &Transcript<'_>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create transcript dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(transcript).context("serialize transcript")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
