//! Exclusive tasks: UI-driving procedures written as straight-line code.
//!
//! A task implements [`ExclusiveTask::run`] as an async block that calls the
//! suspension operations on its [`TaskContext`]: `delay`, `key`, `char`, and
//! the screen expectation helpers. [`ExclusiveCallback`] wraps the procedure
//! in a [`Coroutine`] and resumes it at most once per host tick.

use std::any::Any;
use std::cell::RefCell;
use std::future::Future;
use std::mem;
use std::panic::Location;
use std::pin::Pin;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::core::coroutine::{Coroutine, CoroutineState, Yielder};
use crate::core::errors::{DismissedTimeout, MissingDelay, ScreenMismatch, UnmappableChar};
use crate::core::keys::{InputSink, Key};
use crate::core::screen::{Host, ScreenExpectation};
use crate::core::types::{StateChange, StepStatus, TaskDefaults};

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>>>>;

/// Type erasure helper so the scheduler can find tasks by concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A procedure that needs sole ownership of the host's input stream.
pub trait ExclusiveTask<H: Host + ?Sized + 'static>: AsAny {
    /// Human-readable name used in diagnostics.
    fn description(&self) -> &str;

    /// The procedure body. Returning ends the task.
    fn run(self: Rc<Self>, cx: TaskContext<H>) -> TaskFuture;

    /// Host ticks per logical step; the scheduler default when `None`.
    fn wait_multiplier(&self) -> Option<usize> {
        None
    }

    /// Tasks that must not run while an alternate frontend is attached.
    fn alternate_frontend_blacklisted(&self) -> bool {
        false
    }

    /// Successor to run instead of this task when the host's screen changes
    /// underneath it.
    fn replace_on_screen_change(&self) -> Option<Rc<dyn ExclusiveTask<H>>> {
        None
    }

    /// Whether to hide a host state change from other handlers while this
    /// task is active.
    fn suppress_state_change(&self, _event: StateChange) -> bool {
        false
    }
}

pub(crate) fn downcast_task<H, T>(task: &Rc<dyn ExclusiveTask<H>>) -> Option<&T>
where
    H: Host + ?Sized + 'static,
    T: 'static,
{
    <dyn ExclusiveTask<H> as AsAny>::as_any(task.as_ref()).downcast_ref::<T>()
}

struct TaskState {
    description: String,
    wait_multiplier: usize,
    did_delay: bool,
    feed_keys: Vec<Key>,
    expectation: Option<ScreenExpectation>,
    dismissed_wait_limit: Option<u32>,
}

/// Procedure-side view of a running task.
pub struct TaskContext<H: ?Sized> {
    state: Rc<RefCell<TaskState>>,
    yielder: Yielder<Rc<H>>,
}

impl<H: ?Sized> Clone for TaskContext<H> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            yielder: self.yielder.clone(),
        }
    }
}

impl<H: Host + ?Sized + 'static> TaskContext<H> {
    /// Host handle for the current step.
    pub fn host(&self) -> Result<Rc<H>> {
        self.yielder
            .current()
            .ok_or_else(|| anyhow!("host context is only available during a step"))
    }

    pub fn description(&self) -> String {
        self.state.borrow().description.clone()
    }

    /// Suspend for one logical step.
    #[track_caller]
    pub fn delay(&self) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        self.delay_at(1, location)
    }

    /// Suspend for `steps` logical steps, then keep waiting one host tick at
    /// a time while the host screen is dismissed.
    ///
    /// `delay_steps(0)` returns at once and does not count as a delay for
    /// [`assert_delayed`](Self::assert_delayed).
    #[track_caller]
    pub fn delay_steps(&self, steps: usize) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        self.delay_at(steps, location)
    }

    /// Buffer a keystroke without suspending.
    pub fn key_no_delay(&self, key: Key) {
        self.state.borrow_mut().feed_keys.push(key);
    }

    /// Press a key on the expected screen and wait one step.
    #[track_caller]
    pub fn key(&self, key: Key) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        self.key_at(key, location)
    }

    /// Type one character.
    #[track_caller]
    pub fn char(&self, c: char) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        async move {
            let key = self.char_key(c, location)?;
            self.key_at(key, location).await
        }
    }

    /// Type a string one character per step.
    #[track_caller]
    pub fn text<'a>(&'a self, text: &'a str) -> impl Future<Output = Result<()>> + 'a {
        let location = Location::caller();
        async move {
            for c in text.chars() {
                let key = self.char_key(c, location)?;
                self.key_at(key, location).await?;
            }
            Ok(())
        }
    }

    /// Fails unless `delay` ran since the previous call. Call once at the top
    /// of every loop iteration in `run`.
    #[track_caller]
    pub fn assert_delayed(&self) -> Result<()> {
        let location = Location::caller();
        let mut state = self.state.borrow_mut();
        if !state.did_delay {
            return Err(MissingDelay {
                task: state.description.clone(),
                location,
            }
            .into());
        }
        state.did_delay = false;
        Ok(())
    }

    /// Declare the screen the task is on. The host must already show it.
    #[track_caller]
    pub fn expect_screen(
        &self,
        expected: ScreenExpectation,
    ) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        self.state.borrow_mut().expectation = Some(expected);
        self.check_screen(location, true)
    }

    /// Declare the screen the task is heading to and wait until the host
    /// shows it, tolerating intermediate screens.
    #[track_caller]
    pub fn await_screen(
        &self,
        expected: ScreenExpectation,
    ) -> impl Future<Output = Result<()>> + '_ {
        let location = Location::caller();
        self.state.borrow_mut().expectation = Some(expected);
        self.check_screen(location, false)
    }

    /// Record `expected` only if the host shows it right now.
    pub fn maybe_expect_screen(&self, expected: ScreenExpectation) -> Result<bool> {
        let current = self.host()?.current_screen();
        if !expected.matches(&current) {
            return Ok(false);
        }
        self.state.borrow_mut().expectation = Some(expected);
        Ok(true)
    }

    /// Set an expectation for the lifetime of the returned guard.
    ///
    /// The previous expectation comes back when the guard drops.
    pub fn scoped_screen(&self, expected: ScreenExpectation) -> ExpectedScreen {
        let previous = self.state.borrow_mut().expectation.replace(expected);
        ExpectedScreen {
            state: Rc::clone(&self.state),
            previous,
        }
    }

    pub fn clear_expectation(&self) {
        self.state.borrow_mut().expectation = None;
    }

    pub fn expectation(&self) -> Option<ScreenExpectation> {
        self.state.borrow().expectation.clone()
    }

    async fn delay_at(&self, steps: usize, location: &'static Location<'static>) -> Result<()> {
        if steps == 0 {
            return Ok(());
        }
        for _ in 0..steps {
            self.yielder.suspend().await?;
        }

        let mut waited = 0u32;
        while self.host()?.is_dismissed() {
            let limit = self.state.borrow().dismissed_wait_limit;
            if limit.is_some_and(|limit| waited >= limit) {
                return Err(DismissedTimeout {
                    task: self.description(),
                    steps: waited,
                    location,
                }
                .into());
            }
            let real_multiplier = mem::replace(&mut self.state.borrow_mut().wait_multiplier, 1);
            let resumed = self.yielder.suspend().await;
            self.state.borrow_mut().wait_multiplier = real_multiplier;
            resumed?;
            waited += 1;
        }

        self.state.borrow_mut().did_delay = true;
        Ok(())
    }

    async fn key_at(&self, key: Key, location: &'static Location<'static>) -> Result<()> {
        self.check_screen(location, true).await?;
        self.key_no_delay(key);
        self.delay_at(1, location).await
    }

    fn char_key(&self, c: char, location: &'static Location<'static>) -> Result<Key> {
        Key::from_char(c).ok_or_else(|| {
            UnmappableChar {
                task: self.description(),
                ch: c,
                location,
            }
            .into()
        })
    }

    /// Screen expectation guard.
    ///
    /// With `strict_first`, a mismatch on the first look is fatal. Every later
    /// look, and every look without `strict_first`, waits a step and retries.
    async fn check_screen(
        &self,
        location: &'static Location<'static>,
        strict_first: bool,
    ) -> Result<()> {
        let Some(expected) = self.expectation() else {
            return Ok(());
        };

        let mut first = strict_first;
        loop {
            let actual = self.host()?.current_screen();
            let matched = expected.matches(&actual);
            if first && !matched {
                return Err(ScreenMismatch {
                    task: self.description(),
                    expected,
                    actual,
                    location,
                }
                .into());
            }
            if matched {
                return Ok(());
            }
            first = false;
            self.delay_at(1, location).await?;
        }
    }

    fn has_pending_keys(&self) -> bool {
        !self.state.borrow().feed_keys.is_empty()
    }
}

/// Restores the previous screen expectation on drop.
pub struct ExpectedScreen {
    state: Rc<RefCell<TaskState>>,
    previous: Option<ScreenExpectation>,
}

impl Drop for ExpectedScreen {
    fn drop(&mut self) {
        self.state.borrow_mut().expectation = self.previous.take();
    }
}

/// Step driver for one exclusive task.
pub struct ExclusiveCallback<H: Host + ?Sized + 'static> {
    task: Rc<dyn ExclusiveTask<H>>,
    state: Rc<RefCell<TaskState>>,
    coroutine: Coroutine<Rc<H>>,
    wait_frames: usize,
}

impl<H: Host + ?Sized + 'static> ExclusiveCallback<H> {
    pub fn new(task: Rc<dyn ExclusiveTask<H>>, defaults: &TaskDefaults) -> Self {
        let wait_multiplier = task
            .wait_multiplier()
            .unwrap_or(defaults.wait_multiplier)
            .max(1);
        let state = Rc::new(RefCell::new(TaskState {
            description: task.description().to_string(),
            wait_multiplier,
            did_delay: true,
            feed_keys: Vec::new(),
            expectation: None,
            dismissed_wait_limit: defaults.dismissed_wait_limit,
        }));

        let body_task = Rc::clone(&task);
        let body_state = Rc::clone(&state);
        let coroutine = Coroutine::new(move |yielder| {
            let cx = TaskContext {
                state: body_state,
                yielder,
            };
            let procedure = body_task.run(cx.clone());
            async move {
                procedure.await?;
                // Keys buffered by a trailing `key_no_delay` still need a step
                // to reach the host and let its screen settle.
                if cx.has_pending_keys() {
                    cx.state.borrow_mut().wait_multiplier = 1;
                    cx.delay().await?;
                }
                Ok(())
            }
        });

        Self {
            task,
            state,
            coroutine,
            wait_frames: 0,
        }
    }

    /// Advance the task by one host tick.
    ///
    /// Keys produced by the step go to `sink` in the order they were pressed.
    /// A failing step feeds nothing.
    pub fn step<S: InputSink + ?Sized>(&mut self, host: Rc<H>, sink: &mut S) -> Result<StepStatus> {
        if self.wait_frames > 0 {
            self.wait_frames -= 1;
            return Ok(StepStatus::Throttled);
        }

        let resumed = self.coroutine.resume(host);
        let keys = mem::take(&mut self.state.borrow_mut().feed_keys);
        let state = resumed?;
        if !keys.is_empty() {
            sink.feed_keys(keys);
        }

        match state {
            CoroutineState::Suspended => {
                self.wait_frames = self.state.borrow().wait_multiplier - 1;
                Ok(StepStatus::Suspended)
            }
            CoroutineState::Complete => Ok(StepStatus::Done),
        }
    }

    pub fn task(&self) -> &Rc<dyn ExclusiveTask<H>> {
        &self.task
    }

    pub fn description(&self) -> &str {
        self.task.description()
    }

    pub fn wait_multiplier(&self) -> usize {
        self.state.borrow().wait_multiplier
    }

    pub fn is_complete(&self) -> bool {
        self.coroutine.is_complete()
    }

    pub fn is_alternate_frontend_blacklisted(&self) -> bool {
        self.task.alternate_frontend_blacklisted()
    }
}
