//! Cooperative suspension primitive.
//!
//! A [`Coroutine`] owns a procedure written as ordinary async code. The driver
//! calls [`Coroutine::resume`] with a fresh context; the procedure calls
//! [`Yielder::suspend`] from any call depth to hand control back, and gets the
//! context of the next `resume` when it continues. No async runtime is
//! involved: each `resume` polls the procedure exactly once with a no-op waker.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use anyhow::{Result, anyhow};

use crate::core::errors::ResumedCompleted;

type Procedure = Pin<Box<dyn Future<Output = Result<()>>>>;

/// Where a procedure stands after a `resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineState {
    /// Parked at a suspension point, waiting for the next `resume`.
    Suspended,
    /// Returned normally.
    Complete,
}

pub struct Coroutine<C> {
    slot: Rc<RefCell<Option<C>>>,
    body: Option<Procedure>,
}

impl<C: 'static> Coroutine<C> {
    /// Wrap a procedure. It does not start running until the first `resume`.
    pub fn new<F, Fut>(start: F) -> Self
    where
        F: FnOnce(Yielder<C>) -> Fut,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let yielder = Yielder {
            slot: Rc::clone(&slot),
        };
        Self {
            slot,
            body: Some(Box::pin(start(yielder))),
        }
    }

    /// Run the procedure until it suspends or returns.
    ///
    /// Errors raised by the procedure end it; resuming a procedure that has
    /// ended fails with [`ResumedCompleted`].
    pub fn resume(&mut self, context: C) -> Result<CoroutineState> {
        let Some(body) = self.body.as_mut() else {
            return Err(ResumedCompleted.into());
        };
        *self.slot.borrow_mut() = Some(context);
        let mut cx = Context::from_waker(Waker::noop());
        match body.as_mut().poll(&mut cx) {
            Poll::Pending => Ok(CoroutineState::Suspended),
            Poll::Ready(result) => {
                self.body = None;
                self.slot.borrow_mut().take();
                result.map(|()| CoroutineState::Complete)
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.body.is_none()
    }
}

/// Procedure-side handle of a [`Coroutine`].
pub struct Yielder<C> {
    slot: Rc<RefCell<Option<C>>>,
}

impl<C> Clone for Yielder<C> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<C: Clone> Yielder<C> {
    /// Context handed to the current `resume`; `None` outside of a step.
    pub fn current(&self) -> Option<C> {
        self.slot.borrow().clone()
    }

    /// Give control back to the driver. Returns the context of the `resume`
    /// that continues the procedure.
    pub async fn suspend(&self) -> Result<C> {
        self.slot.borrow_mut().take();
        YieldOnce::default().await;
        self.current()
            .ok_or_else(|| anyhow!("procedure continued without a context"))
    }
}

/// Pending on the first poll, ready on the second.
#[derive(Default)]
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}
