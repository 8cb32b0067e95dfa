//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Guard, InputState, OutputState, StateId};
use crate::engine::transition::{Action, Capture, DurationFn, Predicate, TransitionKind};
use crate::engine::{Fsm, Transition, WidgetSlot};
use std::collections::BTreeSet;
use std::time::Duration;

/// Builder for constructing transitions with a fluent API.
///
/// A transition needs a source, a target and exactly one trigger:
/// [`accept`](Self::accept) (optionally with [`widget`](Self::widget)),
/// [`timeout`](Self::timeout) or [`sub_fsm`](Self::sub_fsm).
pub struct TransitionBuilder<E> {
    from: Option<StateId>,
    to: Option<StateId>,
    accept: Option<Predicate<E>>,
    capture: Option<Capture<E>>,
    timeout: Option<DurationFn>,
    sub_fsm: Option<Option<Box<Fsm<E>>>>,
    guard: Option<Guard<E>>,
    action: Option<Action<E>>,
    events: BTreeSet<&'static str>,
}

impl<E> TransitionBuilder<E> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            from: None,
            to: None,
            accept: None,
            capture: None,
            timeout: None,
            sub_fsm: None,
            guard: None,
            action: None,
            events: BTreeSet::new(),
        }
    }

    /// Set the source state (required). Terminal and cancelling states have
    /// no outgoing transitions.
    pub fn from(mut self, state: impl OutputState) -> Self {
        self.from = Some(state.id());
        self
    }

    /// Set the target state (required). The init state is never a target.
    pub fn to(mut self, state: impl InputState) -> Self {
        self.to = Some(state.id());
        self
    }

    /// Fire on events the predicate accepts.
    pub fn accept<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.accept = Some(Box::new(predicate));
        self
    }

    /// Add a guard predicate (optional).
    pub fn guard(mut self, guard: Guard<E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Set the action run when the transition fires (optional).
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: FnMut(Option<&E>) + Send + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Declare the event kinds this transition reacts to.
    pub fn events<I>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.events.extend(events);
        self
    }

    /// Capture the widget targeted by the accepted event into `slot` when the
    /// transition fires, before its action runs.
    pub fn widget<W, F>(mut self, slot: &WidgetSlot<W>, pick: F) -> Self
    where
        W: Send + 'static,
        F: Fn(&E) -> Option<W> + Send + 'static,
    {
        let slot = slot.clone();
        self.capture = Some(Box::new(move |event| slot.set(pick(event))));
        self
    }

    /// Fire once the source state has been current for the duration the
    /// closure returns when the timer is armed. A zero duration arms nothing.
    /// Timeout transitions fire without an event, so they cannot be guarded.
    pub fn timeout<F>(mut self, duration: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        self.timeout = Some(Box::new(duration));
        self
    }

    /// Run a whole child machine between the source and the target.
    pub fn sub_fsm(mut self, child: impl Into<Option<Fsm<E>>>) -> Self {
        self.sub_fsm = Some(child.into().map(Box::new));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition<E>, BuildError> {
        let source = self.from.ok_or(BuildError::MissingSourceState)?;
        let target = self.to.ok_or(BuildError::MissingTargetState)?;

        let kind = match (self.accept, self.capture, self.timeout, self.sub_fsm) {
            (Some(accept), None, None, None) => TransitionKind::Plain { accept },
            (Some(accept), Some(capture), None, None) => TransitionKind::Widget { accept, capture },
            (None, None, Some(_), None) if self.guard.is_some() => {
                return Err(BuildError::GuardedTimeout)
            }
            (None, None, Some(duration), None) => TransitionKind::Timeout { duration },
            (None, None, None, Some(Some(child))) => TransitionKind::SubFsm { child },
            (None, None, None, Some(None)) => return Err(BuildError::MissingSubFsm),
            (None, _, None, None) => return Err(BuildError::MissingTrigger),
            _ => return Err(BuildError::AmbiguousTrigger),
        };

        Ok(Transition {
            source,
            target,
            kind,
            guard: self.guard,
            action: self.action,
            events: self.events,
        })
    }
}

impl<E> Default for TransitionBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
