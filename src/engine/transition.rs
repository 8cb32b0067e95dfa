//! Transitions between states.

use crate::core::{Guard, StateId};
use crate::engine::machine::Fsm;
use std::collections::BTreeSet;
use std::time::Duration;

/// Type-level acceptance test of an event.
pub(crate) type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

/// Side effect run when a transition fires. Timeout transitions and the
/// conclusion of a sub-machine run it without an event.
pub(crate) type Action<E> = Box<dyn FnMut(Option<&E>) + Send>;

/// Extracts a widget from the event into a shared slot.
pub(crate) type Capture<E> = Box<dyn FnMut(&E) + Send>;

/// Duration of a timeout, evaluated when its timer is armed.
pub(crate) type DurationFn = Box<dyn Fn() -> Duration + Send + Sync>;

/// What makes a transition fire.
pub(crate) enum TransitionKind<E> {
    /// Fires on an accepted event.
    Plain { accept: Predicate<E> },
    /// Fires on an accepted event and captures the widget it targets.
    Widget {
        accept: Predicate<E>,
        capture: Capture<E>,
    },
    /// Fires when the source state has been current for a duration.
    Timeout { duration: DurationFn },
    /// Runs a whole nested machine before reaching the target.
    SubFsm { child: Box<Fsm<E>> },
}

impl<E> TransitionKind<E> {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Plain { .. } => "plain",
            Self::Widget { .. } => "widget",
            Self::Timeout { .. } => "timeout",
            Self::SubFsm { .. } => "sub_fsm",
        }
    }
}

/// Directed edge from an output state to an input state.
///
/// Transitions are owned by their source state, in insertion order; the
/// first one whose [`is_guard_ok`](Self::is_guard_ok) holds wins.
pub struct Transition<E> {
    pub(crate) source: StateId,
    pub(crate) target: StateId,
    pub(crate) kind: TransitionKind<E>,
    pub(crate) guard: Option<Guard<E>>,
    pub(crate) action: Option<Action<E>>,
    pub(crate) events: BTreeSet<&'static str>,
}

impl<E> Transition<E> {
    /// The state this transition leaves.
    pub fn source(&self) -> StateId {
        self.source
    }

    /// The state this transition enters.
    pub fn target(&self) -> StateId {
        self.target
    }

    /// Whether the transition is driven by a timer instead of events.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, TransitionKind::Timeout { .. })
    }

    /// Whether the transition embeds a nested machine.
    pub fn is_sub_fsm(&self) -> bool {
        matches!(self.kind, TransitionKind::SubFsm { .. })
    }

    /// Type-level applicability of the event; the guard is not evaluated.
    ///
    /// A sub-machine transition accepts what its child's init state accepts;
    /// a timeout transition accepts no event.
    pub fn accept(&self, event: &E) -> bool {
        match &self.kind {
            TransitionKind::Plain { accept } | TransitionKind::Widget { accept, .. } => {
                accept(event)
            }
            TransitionKind::Timeout { .. } => false,
            TransitionKind::SubFsm { child } => child.init_transition_for(event).is_some(),
        }
    }

    /// The event is accepted and the guard holds.
    pub fn is_guard_ok(&self, event: &E) -> bool {
        let own_guard = || self.guard.as_ref().is_none_or(|g| g.check(event));
        match &self.kind {
            TransitionKind::SubFsm { child } => child
                .init_transition_for(event)
                .is_some_and(|tr| tr.is_guard_ok(event) && own_guard()),
            _ => self.accept(event) && own_guard(),
        }
    }

    /// Event kinds this transition reacts to, as declared when it was built.
    /// A sub-machine transition reports its child's init-state kinds.
    pub fn accepted_events(&self) -> BTreeSet<&'static str> {
        match &self.kind {
            TransitionKind::SubFsm { child } => child.init_accepted_events(),
            TransitionKind::Timeout { .. } => BTreeSet::new(),
            _ => self.events.clone(),
        }
    }

    /// Evaluate the configured timeout duration, if this is a timeout transition.
    pub(crate) fn timeout_duration(&self) -> Option<Duration> {
        match &self.kind {
            TransitionKind::Timeout { duration } => Some(duration()),
            _ => None,
        }
    }

    /// Run the widget capture then the action.
    pub(crate) fn run_action(&mut self, event: Option<&E>) {
        if let (TransitionKind::Widget { capture, .. }, Some(event)) = (&mut self.kind, event) {
            capture(event);
        }
        if let Some(action) = self.action.as_mut() {
            action(event);
        }
    }

    pub(crate) fn child(&self) -> Option<&Fsm<E>> {
        match &self.kind {
            TransitionKind::SubFsm { child } => Some(child),
            _ => None,
        }
    }

    pub(crate) fn child_mut(&mut self) -> Option<&mut Fsm<E>> {
        match &mut self.kind {
            TransitionKind::SubFsm { child } => Some(child),
            _ => None,
        }
    }
}

impl<E> std::fmt::Debug for Transition<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("kind", &self.kind.name())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TransitionBuilder;
    use crate::core::StateHandle;
    use crate::engine::WidgetSlot;
    use std::sync::{Arc, Mutex};

    type Ev = &'static str;

    fn on(name: &'static str) -> impl Fn(&Ev) -> bool + Send + Sync + 'static {
        move |event: &Ev| *event == name
    }

    #[test]
    fn accept_ignores_the_guard() {
        let mut fsm: Fsm<Ev> = Fsm::new();
        let init = fsm.init_state();
        let pressed = fsm.add_std_state("pressed");
        let transition = TransitionBuilder::new()
            .from(init)
            .to(pressed)
            .accept(on("press"))
            .when(|_: &Ev| false)
            .build()
            .unwrap();

        assert!(transition.accept(&"press"));
        assert!(!transition.is_guard_ok(&"press"));
        assert!(!transition.accept(&"release"));
        assert_eq!(transition.source(), init.id());
        assert_eq!(transition.target(), pressed.id());
    }

    #[test]
    fn timeout_transition_accepts_no_event() {
        let mut fsm: Fsm<Ev> = Fsm::new();
        let held = fsm.add_std_state("held");
        let done = fsm.add_terminal_state("done");
        let transition = TransitionBuilder::new()
            .from(held)
            .to(done)
            .timeout(|| Duration::from_millis(300))
            .build()
            .unwrap();

        assert!(transition.is_timeout());
        assert!(!transition.accept(&"press"));
        assert!(!transition.is_guard_ok(&"press"));
        assert!(transition.accepted_events().is_empty());
        assert_eq!(transition.timeout_duration(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn sub_fsm_transition_delegates_to_child_init_state() {
        let mut child: Fsm<Ev> = Fsm::new();
        let child_init = child.init_state();
        let clicked = child.add_terminal_state("clicked");
        child
            .add_transition(
                TransitionBuilder::new()
                    .from(child_init)
                    .to(clicked)
                    .accept(on("click"))
                    .when(|e: &Ev| !e.is_empty())
                    .events(["click"]),
            )
            .unwrap();

        let mut parent: Fsm<Ev> = Fsm::new();
        let init = parent.init_state();
        let locked = parent.add_std_state("locked");
        let transition = TransitionBuilder::new()
            .from(init)
            .to(locked)
            .sub_fsm(child)
            .build()
            .unwrap();

        assert!(transition.is_sub_fsm());
        assert!(transition.accept(&"click"));
        assert!(transition.is_guard_ok(&"click"));
        assert!(!transition.accept(&"move"));
        assert!(!transition.is_guard_ok(&"move"));
        assert_eq!(
            transition.accepted_events().into_iter().collect::<Vec<_>>(),
            vec!["click"]
        );
    }

    #[test]
    fn widget_transition_captures_before_the_action() {
        let mut fsm: Fsm<Ev> = Fsm::new();
        let init = fsm.init_state();
        let done = fsm.add_terminal_state("done");
        let slot = WidgetSlot::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_action = Arc::clone(&seen);
        let slot_in_action = slot.clone();

        let mut transition = TransitionBuilder::new()
            .from(init)
            .to(done)
            .accept(on("click"))
            .widget(&slot, |e: &Ev| Some(e.len()))
            .action(move |_| *seen_in_action.lock().unwrap() = slot_in_action.get())
            .build()
            .unwrap();

        transition.run_action(Some(&"click"));

        assert_eq!(slot.get(), Some(5));
        assert_eq!(*seen.lock().unwrap(), Some(5));
    }
}
