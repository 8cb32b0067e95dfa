//! The interaction state machine.

use crate::builder::{BuildError, TransitionBuilder};
use crate::core::{
    CancellingState, FsmId, InitState, StartingState, StateChange, StateHandle, StateId,
    StateKind, StatePublisher, StdState, TerminalState,
};
use crate::engine::handler::{CancelFsm, FsmHandler, HandlerId, HandlerSet, Notification};
use crate::engine::recycle::Recycler;
use crate::engine::timeout::{Marshal, PendingTimeout, TimeoutScheduler, TimeoutTicket, TransitionRef};
use crate::engine::transition::Transition;
use crossbeam_channel::Receiver;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// A state and the transitions leaving it.
pub(crate) struct StateNode<E> {
    pub(crate) name: String,
    pub(crate) kind: StateKind,
    pub(crate) transitions: Vec<Transition<E>>,
}

/// Lifecycle notification of an embedded machine, queued for its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mirrored {
    Start,
    Update(StateId),
    Stop,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reset {
    /// Back to init, recycled events kept.
    Soft,
    /// Back to init, recycled events discarded.
    Hard,
    /// Hard reset that also cancels an active child.
    Cancel,
}

/// Finite state machine driving one user interaction.
///
/// The machine owns its states (an arena; the init state is index `0`), their
/// transitions, the handlers observing its lifecycle, the queue of recycled
/// events, at most one armed timeout and at most one active child machine.
///
/// # Example
///
/// ```rust
/// use gesture_fsm::builder::TransitionBuilder;
/// use gesture_fsm::core::StateHandle;
/// use gesture_fsm::engine::Fsm;
///
/// let mut fsm: Fsm<&'static str> = Fsm::new();
/// let init = fsm.init_state();
/// let pressed = fsm.add_std_state("pressed");
/// let released = fsm.add_terminal_state("released");
///
/// fsm.add_transition(
///     TransitionBuilder::new()
///         .from(init)
///         .to(pressed)
///         .accept(|e: &&str| *e == "press"),
/// )
/// .unwrap();
/// fsm.add_transition(
///     TransitionBuilder::new()
///         .from(pressed)
///         .to(released)
///         .accept(|e: &&str| *e == "release"),
/// )
/// .unwrap();
///
/// assert_eq!(fsm.process(&"press"), Ok(true));
/// assert_eq!(fsm.state_name(fsm.current_state()), Some("pressed"));
/// assert_eq!(fsm.process(&"release"), Ok(true));
/// assert_eq!(fsm.current_state(), fsm.init_state().id());
/// ```
pub struct Fsm<E> {
    pub(crate) id: FsmId,
    pub(crate) name: String,
    pub(crate) log: bool,
    pub(crate) inner: bool,
    pub(crate) states: Vec<StateNode<E>>,
    pub(crate) current: StateId,
    pub(crate) starting: Option<StateId>,
    pub(crate) started: bool,
    pub(crate) handlers: HandlerSet,
    pub(crate) embedding: Option<VecDeque<Mirrored>>,
    pub(crate) recycled: Recycler<E>,
    pub(crate) scheduler: TimeoutScheduler,
    pub(crate) timeout: Option<PendingTimeout>,
    pub(crate) child: Option<TransitionRef>,
    pub(crate) changes: StatePublisher,
}

impl<E> Fsm<E> {
    /// Create a machine holding only its init state.
    pub fn new() -> Self {
        Self::named("fsm")
    }

    /// Create a machine with a diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        let id = FsmId::new();
        let init = StateId::new(id, 0);
        Self {
            id,
            name: name.into(),
            log: false,
            inner: false,
            states: vec![StateNode {
                name: "init".to_string(),
                kind: StateKind::Init,
                transitions: Vec::new(),
            }],
            current: init,
            starting: Some(init),
            started: false,
            handlers: HandlerSet::new(),
            embedding: None,
            recycled: Recycler::new(),
            scheduler: TimeoutScheduler::new(),
            timeout: None,
            child: None,
            changes: StatePublisher::new(),
        }
    }

    /// This machine's identity.
    pub fn id(&self) -> FsmId {
        self.id
    }

    /// The diagnostic name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle on the init state.
    pub fn init_state(&self) -> InitState {
        InitState::new(self.init_id())
    }

    pub(crate) fn init_id(&self) -> StateId {
        StateId::new(self.id, 0)
    }

    fn add_state(&mut self, name: impl Into<String>, kind: StateKind) -> StateId {
        let id = StateId::new(self.id, self.states.len());
        self.states.push(StateNode {
            name: name.into(),
            kind,
            transitions: Vec::new(),
        });
        id
    }

    /// Add an intermediate state.
    pub fn add_std_state(&mut self, name: impl Into<String>) -> StdState {
        StdState::new(self.add_state(name, StateKind::Std))
    }

    /// Add a state whose entry completes the interaction.
    pub fn add_terminal_state(&mut self, name: impl Into<String>) -> TerminalState {
        TerminalState::new(self.add_state(name, StateKind::Terminal))
    }

    /// Add a state whose entry aborts the interaction.
    pub fn add_cancelling_state(&mut self, name: impl Into<String>) -> CancellingState {
        CancellingState::new(self.add_state(name, StateKind::Cancelling))
    }

    fn check_owned(&self, state: StateId) -> Result<(), BuildError> {
        if state.fsm() == self.id && state.index() < self.states.len() {
            Ok(())
        } else {
            Err(BuildError::ForeignState {
                state: format!("{}#{}", state.fsm(), state.index()),
            })
        }
    }

    /// Build a transition and append it to its source state.
    ///
    /// Both endpoints must be states of this machine. A transition embedding a
    /// child machine makes the child inner and routes its timeouts through
    /// this machine's marshal hook.
    pub fn add_transition(&mut self, builder: TransitionBuilder<E>) -> Result<(), BuildError> {
        let mut transition = builder.build()?;
        self.check_owned(transition.source)?;
        self.check_owned(transition.target)?;
        let marshal = self.scheduler.marshal();
        if let Some(child) = transition.child_mut() {
            child.inner = true;
            child.set_marshal(marshal);
        }
        self.states[transition.source.index()]
            .transitions
            .push(transition);
        Ok(())
    }

    /// Designate the state that triggers the start notification: leaving it
    /// for the init state, entering it otherwise. Defaults to the init state.
    pub fn set_starting_state(&mut self, state: impl StartingState) -> Result<(), BuildError> {
        self.check_owned(state.id())?;
        self.starting = Some(state.id());
        Ok(())
    }

    /// The designated starting state; `None` once uninstalled.
    pub fn starting_state(&self) -> Option<StateId> {
        self.starting
    }

    /// Replace the hook that hands elapsed timeouts to the owning context.
    /// Embedded machines share it.
    pub fn set_marshal(&mut self, marshal: Marshal) {
        for node in &mut self.states {
            for transition in &mut node.transitions {
                if let Some(child) = transition.child_mut() {
                    child.set_marshal(marshal.clone());
                }
            }
        }
        self.scheduler.set_marshal(marshal);
    }

    /// Enable or disable the diagnostic log of this machine.
    pub fn log(&mut self, enabled: bool) {
        self.log = enabled;
    }

    /// Whether the diagnostic log is enabled.
    pub fn is_logging(&self) -> bool {
        self.log
    }

    /// Whether this machine is embedded in another one.
    pub fn is_inner(&self) -> bool {
        self.inner
    }

    /// Whether the start notification fired since the last reset.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The current state. While a child machine is active and has reported
    /// progress, this is the child's state.
    pub fn current_state(&self) -> StateId {
        self.current
    }

    /// Every state of this machine, followed by the states of the active
    /// child machine, if any.
    pub fn states(&self) -> Vec<StateId> {
        let mut states: Vec<StateId> = (0..self.states.len())
            .map(|index| StateId::new(self.id, index))
            .collect();
        if let Some(child) = self.active_child() {
            states.extend(child.states());
        }
        states
    }

    /// Whether the state belongs to this machine or to its active child.
    pub fn contains_state(&self, state: StateId) -> bool {
        if state.fsm() == self.id {
            return state.index() < self.states.len();
        }
        self.active_child()
            .is_some_and(|child| child.contains_state(state))
    }

    /// Diagnostic name of a state of this machine or of its active child.
    pub fn state_name(&self, state: StateId) -> Option<&str> {
        match self.own_node(state) {
            Some(node) => Some(&node.name),
            None => self.active_child()?.state_name(state),
        }
    }

    /// Kind of a state of this machine or of its active child.
    pub fn state_kind(&self, state: StateId) -> Option<StateKind> {
        match self.own_node(state) {
            Some(node) => Some(node.kind),
            None => self.active_child()?.state_kind(state),
        }
    }

    /// Transitions leaving a state of this machine, in priority order.
    pub fn transitions_of(&self, state: impl StateHandle) -> &[Transition<E>] {
        self.own_node(state.id())
            .map(|node| node.transitions.as_slice())
            .unwrap_or_default()
    }

    /// Event kinds the machine reacts to in its current situation.
    pub fn accepted_events(&self) -> BTreeSet<&'static str> {
        if let Some(child) = self.active_child() {
            return child.accepted_events();
        }
        self.own_node(self.current)
            .map(|node| {
                node.transitions
                    .iter()
                    .flat_map(|tr| tr.accepted_events())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The child machine currently driving this one, if any.
    pub fn active_child(&self) -> Option<&Fsm<E>> {
        let at = self.child?;
        self.transition_at(at)?.child()
    }

    /// Attach a lifecycle handler.
    pub fn add_handler(&mut self, handler: impl FsmHandler + 'static) -> HandlerId {
        self.handlers.add(Box::new(handler))
    }

    /// Detach a lifecycle handler. Returns whether it was attached.
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(id)
    }

    /// Number of attached lifecycle handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Flag an event as still relevant once the current interaction ends.
    pub fn recycle(&self, event: E) {
        self.recycled.push(event);
    }

    /// Shared handle on the recycled-event queue, for producers that cannot
    /// reach the machine (transition actions, handlers, other threads).
    pub fn recycler(&self) -> Recycler<E> {
        self.recycled.clone()
    }

    /// Subscribe to (previous, current) state changes. The channel closes on
    /// [`uninstall`](Self::uninstall).
    pub fn subscribe(&mut self) -> Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Receiver of the tickets queued by the default marshal hook.
    pub fn timeouts(&self) -> Receiver<TimeoutTicket> {
        self.scheduler.fired()
    }

    /// Whether a timer is currently armed.
    pub fn has_active_timeout(&self) -> bool {
        self.timeout.is_some()
    }

    /// Whether [`uninstall`](Self::uninstall) was called.
    pub fn is_uninstalled(&self) -> bool {
        self.changes.is_closed()
    }

    pub(crate) fn own_node(&self, state: StateId) -> Option<&StateNode<E>> {
        if state.fsm() != self.id {
            return None;
        }
        self.states.get(state.index())
    }

    fn own_kind(&self, state: StateId) -> Option<StateKind> {
        self.own_node(state).map(|node| node.kind)
    }

    pub(crate) fn transition_at(&self, at: TransitionRef) -> Option<&Transition<E>> {
        self.states.get(at.state)?.transitions.get(at.index)
    }

    pub(crate) fn transition_at_mut(&mut self, at: TransitionRef) -> Option<&mut Transition<E>> {
        self.states.get_mut(at.state)?.transitions.get_mut(at.index)
    }

    pub(crate) fn child_at_mut(&mut self, at: TransitionRef) -> Option<&mut Fsm<E>> {
        self.transition_at_mut(at)?.child_mut()
    }

    /// First init-state transition accepting the event.
    pub(crate) fn init_transition_for(&self, event: &E) -> Option<&Transition<E>> {
        self.states
            .first()?
            .transitions
            .iter()
            .find(|tr| tr.accept(event))
    }

    pub(crate) fn init_accepted_events(&self) -> BTreeSet<&'static str> {
        self.states
            .first()
            .map(|node| {
                node.transitions
                    .iter()
                    .flat_map(|tr| tr.accepted_events())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn trace(&self, message: &str) {
        if self.log {
            debug!(fsm = %self.name, "{}", message);
        }
    }

    fn trace_state(&self, message: &str, state: StateId) {
        if self.log {
            let name = self.state_name(state).unwrap_or("?");
            debug!(fsm = %self.name, state = name, "{}", message);
        }
    }

    /// Feed an event to the machine.
    ///
    /// Returns `Ok(false)` when the event is absent or no transition of the
    /// current state accepts it, `Ok(true)` when a transition fired, and
    /// `Err(CancelFsm)` when a handler cancelled the interaction, in which
    /// case the machine is already back in its init state.
    pub fn process<'a>(&mut self, event: impl Into<Option<&'a E>>) -> Result<bool, CancelFsm>
    where
        E: 'a,
    {
        match event.into() {
            Some(event) => self.process_event(event),
            None => Ok(false),
        }
    }

    pub(crate) fn process_event(&mut self, event: &E) -> Result<bool, CancelFsm> {
        if let Some(at) = self.child {
            return self.forward_to_child(at, event);
        }
        let Some(node) = self.own_node(self.current) else {
            return Ok(false);
        };
        let Some(index) = node.transitions.iter().position(|tr| tr.is_guard_ok(event)) else {
            return Ok(false);
        };
        let at = TransitionRef {
            state: self.current.index(),
            index,
        };
        Ok(self.execute(at, Some(event))?.is_some())
    }

    /// Fire the transition at `at` if it applies: exit its source, run its
    /// action, enter its target. A sub-machine transition instead hands the
    /// event to its child and returns its target without entering it.
    pub(crate) fn execute(
        &mut self,
        at: TransitionRef,
        event: Option<&E>,
    ) -> Result<Option<StateId>, CancelFsm> {
        let Some(transition) = self.transition_at(at) else {
            return Ok(None);
        };
        let fires = match event {
            Some(event) => transition.is_guard_ok(event),
            None => transition.is_timeout(),
        };
        if !fires {
            return Ok(None);
        }
        let (source, target) = (transition.source, transition.target);

        if transition.is_sub_fsm() {
            return match event {
                Some(event) => self.embed_child(at, event).map(|_| Some(target)),
                None => Ok(None),
            };
        }

        self.exit_state(source)?;
        if let Some(transition) = self.transition_at_mut(at) {
            transition.run_action(event);
        }
        self.enter_state(target)?;
        Ok(Some(target))
    }

    pub(crate) fn exit_state(&mut self, state: StateId) -> Result<(), CancelFsm> {
        let Some(kind) = self.own_kind(state) else {
            return Ok(());
        };
        self.trace_state("exiting state", state);
        if kind == StateKind::Init {
            self.check_starting_state(state)?;
        }
        Ok(())
    }

    pub(crate) fn enter_state(&mut self, state: StateId) -> Result<(), CancelFsm> {
        let Some(kind) = self.own_kind(state) else {
            return Ok(());
        };
        self.trace_state("entering state", state);
        match kind {
            StateKind::Std => {
                self.check_starting_state(state)?;
                self.enter_std_state(state)
            }
            StateKind::Terminal => {
                self.check_starting_state(state)?;
                self.on_terminating()
            }
            StateKind::Cancelling => {
                self.on_cancelling();
                Ok(())
            }
            StateKind::Init => {
                self.reset(Reset::Soft);
                Ok(())
            }
        }
    }

    fn check_starting_state(&mut self, state: StateId) -> Result<(), CancelFsm> {
        if !self.started && self.starting == Some(state) {
            self.on_starting()?;
        }
        Ok(())
    }

    fn enter_std_state(&mut self, state: StateId) -> Result<(), CancelFsm> {
        self.set_current(state);
        self.check_timeout_transition();
        if self.started {
            self.on_updating()?;
        }
        Ok(())
    }

    pub(crate) fn set_current(&mut self, state: StateId) {
        let previous = std::mem::replace(&mut self.current, state);
        self.changes.publish(previous, state);
    }

    fn on_starting(&mut self) -> Result<(), CancelFsm> {
        self.trace("FSM started");
        self.started = true;
        self.notify(Notification::Start)
    }

    pub(crate) fn on_updating(&mut self) -> Result<(), CancelFsm> {
        if self.started {
            self.trace("FSM updated");
            self.notify(Notification::Update)?;
        }
        Ok(())
    }

    fn on_terminating(&mut self) -> Result<(), CancelFsm> {
        self.trace("FSM ended");
        if self.started {
            self.notify(Notification::Stop)?;
        }
        self.reset(Reset::Soft);
        self.process_remaining_events();
        Ok(())
    }

    pub(crate) fn on_cancelling(&mut self) {
        self.trace("FSM cancelled");
        if self.started {
            self.handlers.notify_cancel();
            self.mirror(Mirrored::Cancel);
        }
        self.reset(Reset::Cancel);
    }

    fn notify(&mut self, notification: Notification) -> Result<(), CancelFsm> {
        if self.log {
            debug!(fsm = %self.name, notification = notification.name(), "notifying handlers");
        }
        if let Err(cancel) = self.handlers.notify(notification) {
            self.trace("handler cancelled the interaction");
            self.on_cancelling();
            return Err(cancel);
        }
        let mirrored = match notification {
            Notification::Start => Mirrored::Start,
            Notification::Update => Mirrored::Update(self.current),
            Notification::Stop => Mirrored::Stop,
        };
        self.mirror(mirrored);
        Ok(())
    }

    /// Replay recycled events, oldest first. Events recycled during the
    /// replay are replayed too.
    fn process_remaining_events(&mut self) {
        while let Some(event) = self.recycled.pop_front() {
            self.trace("recycling event");
            if self.process_event(&event).is_err() {
                self.trace("recycled event led to a cancellation");
            }
        }
    }

    pub(crate) fn reset(&mut self, mode: Reset) {
        if mode != Reset::Soft {
            self.recycled.clear();
        }
        self.stop_current_timeout();
        self.started = false;
        self.set_current(self.init_id());
        self.release_child(mode);
    }

    /// Soft reset: back to the init state, recycled events kept.
    pub fn reinit(&mut self) {
        self.trace("FSM reinitialised");
        self.reset(Reset::Soft);
    }

    /// Hard reset: back to the init state, recycled events discarded.
    pub fn full_reinit(&mut self) {
        self.trace("FSM fully reinitialised");
        self.reset(Reset::Hard);
    }

    /// Hard reset, then detach every handler, close the state-change channel
    /// and drop all states. Embedded machines are uninstalled too. The
    /// machine must not be used afterwards.
    pub fn uninstall(&mut self) {
        self.full_reinit();
        self.log = false;
        self.changes.close();
        self.starting = None;
        self.handlers.clear();
        for node in &mut self.states {
            for transition in &mut node.transitions {
                if let Some(child) = transition.child_mut() {
                    child.uninstall();
                }
            }
        }
        self.states.clear();
    }

    pub(crate) fn stop_current_timeout(&mut self) {
        if self.timeout.take().is_some() {
            self.trace("timeout stopped");
        }
    }

    /// Supersede any armed timer, then arm the first timeout transition of
    /// the current state, if any.
    fn check_timeout_transition(&mut self) {
        self.stop_current_timeout();
        let Some(node) = self.own_node(self.current) else {
            return;
        };
        let Some((index, duration)) = node
            .transitions
            .iter()
            .enumerate()
            .find_map(|(index, tr)| tr.timeout_duration().map(|d| (index, d)))
        else {
            return;
        };
        let at = TransitionRef {
            state: self.current.index(),
            index,
        };
        self.trace("timeout starting");
        self.timeout = self.scheduler.schedule(self.id, at, duration);
    }

    /// Apply an elapsed timeout on the context that owns the machine.
    ///
    /// Tickets of superseded timers are ignored. Tickets armed by an active
    /// child machine are routed to it. Returns whether a timeout transition
    /// fired.
    pub fn on_timeout(&mut self, ticket: TimeoutTicket) -> Result<bool, CancelFsm> {
        if ticket.fsm() != self.id {
            return match self.child {
                Some(at) => self.forward_timeout_to_child(at, ticket),
                None => Ok(false),
            };
        }
        let at = match &self.timeout {
            Some(pending) if pending.ticket == ticket => pending.at,
            _ => return Ok(false),
        };
        self.timeout = None;
        self.trace("timeout fired");
        Ok(self.execute(at, None)?.is_some())
    }

    /// Apply every ticket queued by the default marshal hook. Returns how
    /// many timeout transitions fired.
    pub fn process_timeouts(&mut self) -> Result<usize, CancelFsm> {
        let mut fired = 0;
        while let Some(ticket) = self.scheduler.try_fired() {
            if self.on_timeout(ticket)? {
                fired += 1;
            }
        }
        Ok(fired)
    }
}

impl<E> Default for Fsm<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Fsm<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fsm")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("current", &self.current)
            .field("started", &self.started)
            .field("inner", &self.inner)
            .field("states", &self.states.len())
            .finish()
    }
}
