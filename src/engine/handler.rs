//! Lifecycle handlers and the cancellation signal.

use thiserror::Error;

/// Signal raised by a handler to abort the interaction in progress.
///
/// Returned from [`FsmHandler::fsm_starts`], [`FsmHandler::fsm_updates`] or
/// [`FsmHandler::fsm_stops`], it stops the notification loop, makes the
/// machine run its cancelling procedure and is then handed back to whoever
/// called [`Fsm::process`](crate::engine::Fsm::process).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("interaction cancelled by a lifecycle handler")]
pub struct CancelFsm;

/// Observer of an interaction's lifecycle.
///
/// All callbacks default to doing nothing. The cancel callback cannot raise a
/// further cancellation.
pub trait FsmHandler: Send {
    /// The interaction starts.
    fn fsm_starts(&mut self) -> Result<(), CancelFsm> {
        Ok(())
    }

    /// The interaction moved to a new state after it started.
    fn fsm_updates(&mut self) -> Result<(), CancelFsm> {
        Ok(())
    }

    /// The interaction completed.
    fn fsm_stops(&mut self) -> Result<(), CancelFsm> {
        Ok(())
    }

    /// The interaction was aborted.
    fn fsm_cancels(&mut self) {}
}

/// Registration ticket returned by [`Fsm::add_handler`](crate::engine::Fsm::add_handler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Notifications that a handler may interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notification {
    Start,
    Update,
    Stop,
}

impl Notification {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Update => "update",
            Self::Stop => "stop",
        }
    }
}

/// Registration-ordered set of handlers.
#[derive(Default)]
pub(crate) struct HandlerSet {
    handlers: Vec<(HandlerId, Box<dyn FsmHandler>)>,
    next_id: u64,
}

impl HandlerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, handler: Box<dyn FsmHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    pub(crate) fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(registered, _)| *registered != id);
        self.handlers.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver an interruptible notification, stopping at the first handler
    /// that cancels.
    pub(crate) fn notify(&mut self, notification: Notification) -> Result<(), CancelFsm> {
        self.handlers
            .iter_mut()
            .try_for_each(|(_, handler)| match notification {
                Notification::Start => handler.fsm_starts(),
                Notification::Update => handler.fsm_updates(),
                Notification::Stop => handler.fsm_stops(),
            })
    }

    /// Deliver the cancel notification to every handler.
    pub(crate) fn notify_cancel(&mut self) {
        for (_, handler) in self.handlers.iter_mut() {
            handler.fsm_cancels();
        }
    }
}
