//! Host screen identity and the expectation match rule.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the host currently displays: a screen identity, its focus path, and
/// the same pair for the screen underneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenState {
    pub id: String,
    #[serde(default)]
    pub focus: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_focus: Vec<String>,
}

impl ScreenState {
    pub fn new(id: &str, focus: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            focus: focus.iter().map(|s| s.to_string()).collect(),
            parent_id: None,
            parent_focus: Vec::new(),
        }
    }

    pub fn with_parent(mut self, id: &str, focus: &[&str]) -> Self {
        self.parent_id = Some(id.to_string());
        self.parent_focus = focus.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:[{}]", self.id, self.focus.join(", "))?;
        if let Some(parent) = &self.parent_id {
            write!(f, " over {}:[{}]", parent, self.parent_focus.join(", "))?;
        }
        Ok(())
    }
}

/// Screen a task assumes it is looking at.
///
/// Empty focus fields match any focus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenExpectation {
    #[serde(rename = "screen")]
    pub id: String,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub parent_focus: Option<String>,
}

impl ScreenExpectation {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            focus: None,
            parent_focus: None,
        }
    }

    pub fn with_focus(mut self, focus: &str) -> Self {
        self.focus = Some(focus.to_string());
        self
    }

    pub fn with_parent_focus(mut self, focus: &str) -> Self {
        self.parent_focus = Some(focus.to_string());
        self
    }

    pub fn matches(&self, screen: &ScreenState) -> bool {
        self.id == screen.id
            && focus_matches(self.focus.as_deref(), &screen.focus)
            && focus_matches(self.parent_focus.as_deref(), &screen.parent_focus)
    }
}

fn focus_matches(expected: Option<&str>, actual: &[String]) -> bool {
    match expected {
        None | Some("") => true,
        Some(want) => actual.iter().any(|focus| focus == want),
    }
}

impl fmt::Display for ScreenExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.id,
            self.focus.as_deref().unwrap_or(""),
            self.parent_focus.as_deref().unwrap_or("")
        )
    }
}

/// UI introspection the host exposes to running tasks.
///
/// A fresh host handle is passed into every step, so implementations report
/// the state as of the current tick.
pub trait Host {
    fn current_screen(&self) -> ScreenState;

    /// True while the current screen is being torn down and no real screen
    /// has replaced it yet.
    fn is_dismissed(&self) -> bool;
}
