//! Embedding of a child machine into a transition of its parent.
//!
//! While a sub-machine transition is active, the parent forwards every event
//! (and every timeout ticket armed by the child) to the child. The child does
//! not call into its parent; it queues [`Mirrored`] signals as its handlers
//! succeed, and the parent drains them right after the child returns:
//!
//! - start: the parent leaves the transition's source state
//! - update: the parent adopts the child's current state and updates
//! - stop: the parent runs the transition action, releases the child and
//!   handles the transition's target
//! - cancel: the parent releases the child and cancels itself

use crate::core::{StateId, StateKind};
use crate::engine::handler::CancelFsm;
use crate::engine::machine::{Fsm, Mirrored, Reset};
use crate::engine::timeout::{TimeoutTicket, TransitionRef};
use std::collections::VecDeque;

impl<E> Fsm<E> {
    /// Start queueing lifecycle signals for a parent.
    pub(crate) fn attach_embedding(&mut self) {
        self.inner = true;
        self.embedding = Some(VecDeque::new());
    }

    /// Stop queueing lifecycle signals; pending ones are dropped.
    pub(crate) fn detach_embedding(&mut self) {
        self.embedding = None;
    }

    pub(crate) fn mirror(&mut self, signal: Mirrored) {
        if let Some(queue) = self.embedding.as_mut() {
            queue.push_back(signal);
        }
    }

    fn next_mirrored(&mut self) -> Option<Mirrored> {
        self.embedding.as_mut()?.pop_front()
    }

    /// Activate the child of the transition at `at` and hand it the event
    /// that fired the transition. The transition's target is only entered
    /// once the child stops.
    pub(crate) fn embed_child(&mut self, at: TransitionRef, event: &E) -> Result<(), CancelFsm> {
        self.stop_current_timeout();
        let Some(child) = self.child_at_mut(at) else {
            return Ok(());
        };
        child.attach_embedding();
        self.child = Some(at);
        self.trace("sub-FSM engaged");

        self.forward_to_child(at, event).map(|_| ())
    }

    /// Hand an event to the active child, then apply what it reported.
    pub(crate) fn forward_to_child(&mut self, at: TransitionRef, event: &E) -> Result<bool, CancelFsm> {
        let processed = match self.child_at_mut(at) {
            Some(child) => child.process_event(event),
            None => Ok(false),
        };
        let mirrored = self.drain_child_signals(at);
        let processed = processed?;
        mirrored?;
        Ok(processed)
    }

    /// Hand a timeout ticket to the active child, then apply what it reported.
    pub(crate) fn forward_timeout_to_child(
        &mut self,
        at: TransitionRef,
        ticket: TimeoutTicket,
    ) -> Result<bool, CancelFsm> {
        let fired = match self.child_at_mut(at) {
            Some(child) => child.on_timeout(ticket),
            None => Ok(false),
        };
        let mirrored = self.drain_child_signals(at);
        let fired = fired?;
        mirrored?;
        Ok(fired)
    }

    /// Apply the child's queued signals in order, until the queue is empty
    /// or the child is no longer active.
    fn drain_child_signals(&mut self, at: TransitionRef) -> Result<(), CancelFsm> {
        while self.child == Some(at) {
            let Some(signal) = self.child_at_mut(at).and_then(|child| child.next_mirrored()) else {
                break;
            };
            match signal {
                Mirrored::Start => {
                    self.trace("sub-FSM started");
                    self.exit_state(StateId::new(self.id, at.state))?;
                }
                Mirrored::Update(state) => {
                    self.set_current(state);
                    self.on_updating()?;
                }
                Mirrored::Stop => return self.conclude_child(at),
                Mirrored::Cancel => {
                    self.trace("sub-FSM cancelled");
                    self.detach_child(at);
                    self.on_cancelling();
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// The child stopped: run the wrapping transition's action, release the
    /// child and handle the target.
    fn conclude_child(&mut self, at: TransitionRef) -> Result<(), CancelFsm> {
        self.trace("sub-FSM stopped");
        if let Some(transition) = self.transition_at_mut(at) {
            transition.run_action(None);
        }
        self.detach_child(at);
        let Some(target) = self.transition_at(at).map(|tr| tr.target) else {
            return Ok(());
        };
        match self.state_kind(target) {
            Some(StateKind::Cancelling) => {
                self.on_cancelling();
                Ok(())
            }
            Some(_) => self.enter_state(target),
            None => Ok(()),
        }
    }

    fn detach_child(&mut self, at: TransitionRef) {
        if self.child == Some(at) {
            self.child = None;
        }
        if let Some(child) = self.child_at_mut(at) {
            child.detach_embedding();
        }
    }

    /// Release the active child, resetting it the way this machine resets.
    pub(crate) fn release_child(&mut self, mode: Reset) {
        let Some(at) = self.child.take() else {
            return;
        };
        if let Some(child) = self.child_at_mut(at) {
            child.detach_embedding();
            match mode {
                Reset::Soft => child.reinit(),
                Reset::Hard => child.full_reinit(),
                Reset::Cancel => child.on_cancelling(),
            }
        }
    }
}
