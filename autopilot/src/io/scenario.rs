//! Simulation scenarios: a scripted host timeline plus scripted tasks.
//!
//! ```toml
//! name = "open military screen"
//!
//! [[screens]]
//! tick = 0
//! id = "dwarfmode"
//! focus = ["dwarfmode/Default"]
//!
//! [[dismissed]]
//! from = 4
//! until = 6
//!
//! [[tasks]]
//! description = "draft"
//! wait_multiplier = 2
//! steps = [
//!   { op = "expect", screen = "dwarfmode", focus = "dwarfmode/Default" },
//!   { op = "key", key = "D_MILITARY" },
//!   { op = "await", screen = "military" },
//!   { op = "text", text = "Urist" },
//! ]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::keys::Key;
use crate::core::screen::ScreenExpectation;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Screen shown from `tick` onwards, until the next frame.
    #[serde(default)]
    pub screens: Vec<ScreenFrame>,
    /// Tick ranges during which the host screen is dismissed.
    #[serde(default)]
    pub dismissed: Vec<TickRange>,
    /// Ticks at which an alternate frontend attaches or detaches.
    #[serde(default)]
    pub frontend: Vec<FrontendChange>,
    #[serde(default)]
    pub tasks: Vec<TaskScript>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScreenFrame {
    pub tick: u64,
    pub id: String,
    #[serde(default)]
    pub focus: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_focus: Vec<String>,
}

/// Half-open tick range `[from, until)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TickRange {
    pub from: u64,
    pub until: u64,
}

impl TickRange {
    pub fn contains(&self, tick: u64) -> bool {
        self.from <= tick && tick < self.until
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FrontendChange {
    pub tick: u64,
    pub attached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskScript {
    pub description: String,
    #[serde(default)]
    pub wait_multiplier: Option<usize>,
    /// Hold this task while an alternate frontend is attached.
    #[serde(default)]
    pub blacklisted: bool,
    /// Start over from the first step when the screen changes mid-task.
    #[serde(default)]
    pub restart_on_screen_change: bool,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptStep {
    Delay {
        #[serde(default = "one_step")]
        steps: usize,
    },
    Key {
        key: Key,
    },
    /// Keys buffered together and fed on the next suspension.
    Burst {
        keys: Vec<Key>,
    },
    Text {
        text: String,
    },
    /// The host must already show this screen.
    Expect(ScreenExpectation),
    /// Wait for the host to show this screen.
    Await(ScreenExpectation),
    Clear,
}

fn one_step() -> usize {
    1
}

impl Scenario {
    pub fn validate(&self) -> Result<()> {
        if !self
            .screens
            .windows(2)
            .all(|pair| pair[0].tick < pair[1].tick)
        {
            return Err(anyhow!("screens must be sorted by strictly increasing tick"));
        }
        if let Some(first) = self.screens.first() {
            if first.tick != 0 {
                return Err(anyhow!("first screen must start at tick 0"));
            }
        }
        for range in &self.dismissed {
            if range.from >= range.until {
                return Err(anyhow!(
                    "dismissed range {}..{} is empty",
                    range.from,
                    range.until
                ));
            }
        }
        for (index, task) in self.tasks.iter().enumerate() {
            if task.description.trim().is_empty() {
                return Err(anyhow!("tasks[{index}]: description must be non-empty"));
            }
            if task.wait_multiplier == Some(0) {
                return Err(anyhow!(
                    "tasks[{index}] ({}): wait_multiplier must be > 0",
                    task.description
                ));
            }
            if let Some(step) = task
                .steps
                .iter()
                .position(|step| matches!(step, ScriptStep::Delay { steps: 0 }))
            {
                return Err(anyhow!(
                    "tasks[{index}] ({}): steps[{step}] delays for 0 steps",
                    task.description
                ));
            }
        }
        Ok(())
    }
}

/// Load and validate a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let scenario: Scenario =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(scenario)
}
