//! Exclusive task scheduler driven once per host tick.
//!
//! Tasks wait in a FIFO queue. At most one is active; it alone may feed keys
//! to the host until it completes, fails, or is replaced by its own successor
//! after a screen change.

use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::keys::InputSink;
use crate::core::screen::Host;
use crate::core::task::{ExclusiveCallback, ExclusiveTask, downcast_task};
use crate::core::types::{StateChange, StepStatus, TaskDefaults};
use crate::io::config::SchedulerConfig;
use crate::io::diagnostics::Diagnostics;

/// What happened during one [`Scheduler::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No task could run.
    Idle,
    /// The active task is rate limited this tick.
    Throttled,
    /// The active task ran one step and is suspended again.
    Stepped,
    /// The active task finished during this tick.
    Completed { task: String },
}

pub struct Scheduler<H: Host + ?Sized + 'static> {
    active: Option<ExclusiveCallback<H>>,
    pending: VecDeque<ExclusiveCallback<H>>,
    defaults: TaskDefaults,
    alternate_frontend: bool,
    diagnostics: Box<dyn Diagnostics>,
}

impl<H: Host + ?Sized + 'static> Scheduler<H> {
    pub fn new(config: &SchedulerConfig, diagnostics: Box<dyn Diagnostics>) -> Self {
        Self {
            active: None,
            pending: VecDeque::new(),
            defaults: config.task_defaults(),
            alternate_frontend: config.alternate_frontend,
            diagnostics,
        }
    }

    /// Queue a task behind every task already waiting.
    pub fn enqueue_exclusive(&mut self, task: Rc<dyn ExclusiveTask<H>>) {
        let callback = ExclusiveCallback::new(task, &self.defaults);
        debug!(
            task = callback.description(),
            pending = self.pending.len(),
            "queued exclusive task"
        );
        self.pending.push_back(callback);
    }

    pub fn enqueue<T: ExclusiveTask<H>>(&mut self, task: T) {
        self.enqueue_exclusive(Rc::new(task));
    }

    /// Whether a task of type `T` is active, or also queued when
    /// `include_pending` is set.
    pub fn has_exclusive<T: 'static>(&self, include_pending: bool) -> bool {
        let active = self
            .active
            .iter()
            .any(|cb| downcast_task::<H, T>(cb.task()).is_some());
        active
            || (include_pending
                && self
                    .pending
                    .iter()
                    .any(|cb| downcast_task::<H, T>(cb.task()).is_some()))
    }

    /// Visit the active task, then queued tasks, of type `T` in order.
    ///
    /// Stops early and returns true once `visit` returns true.
    pub fn each_exclusive<T: 'static>(&self, mut visit: impl FnMut(&T) -> bool) -> bool {
        self.active
            .iter()
            .chain(self.pending.iter())
            .filter_map(|cb| downcast_task::<H, T>(cb.task()))
            .any(|task| visit(task))
    }

    pub fn has_active_task(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_description(&self) -> Option<&str> {
        self.active.as_ref().map(ExclusiveCallback::description)
    }

    /// The task the next tick will step: the active one, else the queue head.
    pub fn next_description(&self) -> Option<&str> {
        self.active_description()
            .or_else(|| self.pending.front().map(ExclusiveCallback::description))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is active and nothing is queued.
    pub fn is_drained(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    pub fn set_alternate_frontend(&mut self, attached: bool) {
        if self.alternate_frontend != attached {
            info!(attached, "alternate frontend attachment changed");
        }
        self.alternate_frontend = attached;
    }

    /// Drive the scheduler for one host tick.
    ///
    /// Activates the head of the queue when nothing is active, then steps the
    /// active task once. A fatal task error is reported to the diagnostics
    /// sink, the task is dropped, and the error is returned.
    pub fn tick<S: InputSink + ?Sized>(&mut self, host: Rc<H>, sink: &mut S) -> Result<TickOutcome> {
        if self.active.is_none() && !self.activate_next() {
            return Ok(TickOutcome::Idle);
        }
        let Some(active) = self.active.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        match active.step(host, sink) {
            Ok(StepStatus::Throttled) => Ok(TickOutcome::Throttled),
            Ok(StepStatus::Suspended) => Ok(TickOutcome::Stepped),
            Ok(StepStatus::Done) => {
                let task = active.description().to_string();
                self.active = None;
                info!(task = %task, pending = self.pending.len(), "exclusive task completed");
                Ok(TickOutcome::Completed { task })
            }
            Err(err) => {
                let task = active.description().to_string();
                self.active = None;
                self.diagnostics.fatal(&task, &err);
                Err(err)
            }
        }
    }

    /// Route a host state change through the active task.
    ///
    /// Returns false when the active task suppresses the event. On a screen
    /// change, a task that names a successor is replaced by it in place.
    pub fn on_state_change(&mut self, event: StateChange) -> bool {
        let Some(active) = self.active.as_ref() else {
            return true;
        };
        if active.task().suppress_state_change(event) {
            debug!(task = active.description(), ?event, "state change suppressed");
            return false;
        }
        if event == StateChange::ViewscreenChanged {
            if let Some(successor) = active.task().replace_on_screen_change() {
                let replaced = ExclusiveCallback::new(successor, &self.defaults);
                warn!(
                    from = active.description(),
                    to = replaced.description(),
                    "screen changed under exclusive task; replacing it"
                );
                self.active = Some(replaced);
            }
        }
        true
    }

    /// One-line summary of the active task and queue.
    pub fn status(&self) -> String {
        let active = self.active_description().unwrap_or("none");
        if self.pending.is_empty() {
            return format!("exclusive: {active}");
        }
        let queued: Vec<&str> = self
            .pending
            .iter()
            .map(ExclusiveCallback::description)
            .collect();
        format!(
            "exclusive: {active} (pending {}: {})",
            queued.len(),
            queued.join(", ")
        )
    }

    /// Drop every task, active and queued. Used when the session stops.
    pub fn clear(&mut self) {
        let dropped = self.pending.len() + usize::from(self.active.is_some());
        if dropped > 0 {
            info!(dropped, "discarding exclusive tasks");
        }
        self.active = None;
        self.pending.clear();
    }

    fn activate_next(&mut self) -> bool {
        let Some(head) = self.pending.front() else {
            return false;
        };
        if self.alternate_frontend && head.is_alternate_frontend_blacklisted() {
            debug!(task = head.description(), "holding task while alternate frontend is attached");
            return false;
        }
        self.active = self.pending.pop_front();
        if let Some(active) = &self.active {
            info!(task = active.description(), "exclusive task activated");
        }
        self.active.is_some()
    }
}
