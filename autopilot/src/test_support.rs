//! Test-only helpers: a controllable host, closure-backed tasks, and a
//! diagnostics sink that records what it was told.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use anyhow::Result;

use crate::core::keys::Key;
use crate::core::screen::{Host, ScreenState};
use crate::core::task::{ExclusiveTask, TaskContext, TaskFuture};
use crate::core::types::StateChange;
use crate::io::diagnostics::Diagnostics;
use crate::scheduler::Scheduler;

/// Host whose screen and dismissed flag are set by the test between ticks.
#[derive(Debug, Default)]
pub struct FakeHost {
    screen: RefCell<ScreenState>,
    dismissed: Cell<bool>,
}

impl FakeHost {
    pub fn new(screen: ScreenState) -> Rc<Self> {
        Rc::new(Self {
            screen: RefCell::new(screen),
            dismissed: Cell::new(false),
        })
    }

    pub fn set_screen(&self, screen: ScreenState) {
        *self.screen.borrow_mut() = screen;
    }

    pub fn set_dismissed(&self, dismissed: bool) {
        self.dismissed.set(dismissed);
    }
}

impl Host for FakeHost {
    fn current_screen(&self) -> ScreenState {
        self.screen.borrow().clone()
    }

    fn is_dismissed(&self) -> bool {
        self.dismissed.get()
    }
}

/// Shorthand for a screen with no parent.
pub fn screen(id: &str, focus: &[&str]) -> ScreenState {
    ScreenState::new(id, focus)
}

type Body = Box<dyn Fn(TaskContext<FakeHost>) -> TaskFuture>;

/// Exclusive task whose procedure is a closure.
pub struct FnTask {
    description: String,
    wait_multiplier: Option<usize>,
    blacklisted: bool,
    suppress: Vec<StateChange>,
    successor: Option<Box<dyn Fn() -> FnTask>>,
    body: Body,
}

impl FnTask {
    pub fn new<F, Fut>(description: &str, body: F) -> Self
    where
        F: Fn(TaskContext<FakeHost>) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        Self {
            description: description.to_string(),
            wait_multiplier: None,
            blacklisted: false,
            suppress: Vec::new(),
            successor: None,
            body: Box::new(move |cx| -> TaskFuture { Box::pin(body(cx)) }),
        }
    }

    pub fn with_wait_multiplier(mut self, wait_multiplier: usize) -> Self {
        self.wait_multiplier = Some(wait_multiplier);
        self
    }

    pub fn blacklisted(mut self) -> Self {
        self.blacklisted = true;
        self
    }

    pub fn suppressing(mut self, event: StateChange) -> Self {
        self.suppress.push(event);
        self
    }

    pub fn replaced_by<F: Fn() -> FnTask + 'static>(mut self, successor: F) -> Self {
        self.successor = Some(Box::new(successor));
        self
    }
}

impl ExclusiveTask<FakeHost> for FnTask {
    fn description(&self) -> &str {
        &self.description
    }

    fn run(self: Rc<Self>, cx: TaskContext<FakeHost>) -> TaskFuture {
        (self.body)(cx)
    }

    fn wait_multiplier(&self) -> Option<usize> {
        self.wait_multiplier
    }

    fn alternate_frontend_blacklisted(&self) -> bool {
        self.blacklisted
    }

    fn replace_on_screen_change(&self) -> Option<Rc<dyn ExclusiveTask<FakeHost>>> {
        let successor = self.successor.as_ref()?;
        Some(Rc::new(successor()))
    }

    fn suppress_state_change(&self, event: StateChange) -> bool {
        self.suppress.contains(&event)
    }
}

/// Task that presses one key and returns.
pub fn press(description: &str, key: Key) -> FnTask {
    FnTask::new(description, move |cx| async move { cx.key(key).await })
}

/// Diagnostics sink that keeps every report.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    pub reports: Rc<RefCell<Vec<String>>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn fatal(&mut self, task: &str, error: &anyhow::Error) {
        self.reports.borrow_mut().push(format!("{task}: {error}"));
    }
}

/// Tick `scheduler` `ticks` times, returning the keys fed on each tick.
pub fn run_ticks(
    scheduler: &mut Scheduler<FakeHost>,
    host: &Rc<FakeHost>,
    ticks: usize,
) -> Result<Vec<Vec<Key>>> {
    let mut per_tick = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let mut fed = Vec::new();
        scheduler.tick(Rc::clone(host), &mut |keys: Vec<Key>| fed.extend(keys))?;
        per_tick.push(fed);
    }
    Ok(per_tick)
}
