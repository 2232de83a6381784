//! Scheduler configuration stored as TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::TaskDefaults;

/// Scheduler configuration (TOML).
///
/// Missing fields take their defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Host ticks per logical step for tasks that don't pick their own rate.
    pub default_wait_multiplier: usize,

    /// Give up (fatally) after this many consecutive dismissed-screen waits
    /// inside a single delay. Unbounded when absent.
    pub dismissed_wait_limit: Option<u32>,

    /// An alternate frontend is attached; blacklisted tasks are held back.
    pub alternate_frontend: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_wait_multiplier: 1,
            dismissed_wait_limit: None,
            alternate_frontend: false,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_wait_multiplier == 0 {
            return Err(anyhow!("default_wait_multiplier must be > 0"));
        }
        if self.dismissed_wait_limit == Some(0) {
            return Err(anyhow!("dismissed_wait_limit must be > 0 when set"));
        }
        Ok(())
    }

    pub fn task_defaults(&self) -> TaskDefaults {
        TaskDefaults {
            wait_multiplier: self.default_wait_multiplier,
            dismissed_wait_limit: self.dismissed_wait_limit,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SchedulerConfig::default()`.
pub fn load_config(path: &Path) -> Result<SchedulerConfig> {
    if !path.exists() {
        let cfg = SchedulerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SchedulerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

const CONFIG_HEADER: &str = "# autopilot scheduler config\n";

/// Write `cfg` as TOML for `autopilot init`.
///
/// Refuses to replace an existing file unless `overwrite` is set. The file is
/// staged next to its destination and renamed into place, so readers never
/// see a partial config.
pub fn write_config(path: &Path, cfg: &SchedulerConfig, overwrite: bool) -> Result<()> {
    cfg.validate()?;
    if path.exists() && !overwrite {
        return Err(anyhow!(
            "{} already exists (pass --force to replace it)",
            path.display()
        ));
    }
    let body = toml::to_string_pretty(cfg).context("serialize config toml")?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    let staged = path.with_extension("toml.partial");
    fs::write(&staged, format!("{CONFIG_HEADER}{body}"))
        .with_context(|| format!("stage config {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| format!("install config {}", path.display()))
}
