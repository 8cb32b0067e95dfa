//! State identities and capability traits.
//!
//! States live in an arena owned by their [`Fsm`](crate::engine::Fsm). Callers
//! only ever hold lightweight, copyable handles that carry the owning machine's
//! identity and the state's arena index. The four handle types mirror the four
//! state kinds; which of them may own outgoing transitions or be a transition
//! target is expressed by the [`OutputState`] and [`InputState`] traits, so an
//! invalid edge (e.g. leaving a terminal state) does not type-check.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one state machine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FsmId(Uuid);

impl FsmId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a state: the owning machine plus the state's arena index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId {
    fsm: FsmId,
    index: usize,
}

impl StateId {
    pub(crate) fn new(fsm: FsmId, index: usize) -> Self {
        Self { fsm, index }
    }

    /// The machine that owns this state.
    pub fn fsm(&self) -> FsmId {
        self.fsm
    }

    /// Position of the state in its machine. The init state is always `0`.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The four kinds of state an interaction is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Initial state and re-entry point after every reset.
    Init,
    /// Intermediate state.
    Std,
    /// Entering it completes the interaction.
    Terminal,
    /// Entering it aborts the interaction.
    Cancelling,
}

impl StateKind {
    /// Get the kind's name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Std => "std",
            Self::Terminal => "terminal",
            Self::Cancelling => "cancelling",
        }
    }

    /// Whether states of this kind may own outgoing transitions.
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Init | Self::Std)
    }

    /// Whether states of this kind may be the target of a transition.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Std | Self::Terminal | Self::Cancelling)
    }

    /// Whether entering a state of this kind ends the interaction.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Terminal | Self::Cancelling)
    }
}

/// A typed handle on a state of some machine.
pub trait StateHandle: Copy + fmt::Debug {
    /// The state's identity.
    fn id(&self) -> StateId;

    /// The state's kind, fixed by the handle type.
    fn kind(&self) -> StateKind;
}

/// States that may own outgoing transitions (init and standard states).
pub trait OutputState: StateHandle {}

/// States that may be the target of a transition (standard, terminal and
/// cancelling states).
pub trait InputState: StateHandle {}

/// States whose entry (or, for the init state, whose exit) may be designated
/// as the moment the interaction starts.
pub trait StartingState: StateHandle {}

macro_rules! state_handles {
    (
        $(
            $(#[$meta:meta])*
            $name:ident => $kind:ident
        ),* $(,)?
    ) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(StateId);

            impl $name {
                pub(crate) fn new(id: StateId) -> Self {
                    Self(id)
                }
            }

            impl StateHandle for $name {
                fn id(&self) -> StateId {
                    self.0
                }

                fn kind(&self) -> StateKind {
                    StateKind::$kind
                }
            }

            impl From<$name> for StateId {
                fn from(handle: $name) -> StateId {
                    handle.0
                }
            }
        )*
    };
}

macro_rules! capability {
    ($cap:ident: $($name:ident),+) => {
        $(impl $cap for $name {})+
    };
}

state_handles! {
    /// Handle on a machine's init state.
    InitState => Init,
    /// Handle on an intermediate state.
    StdState => Std,
    /// Handle on a state that completes the interaction.
    TerminalState => Terminal,
    /// Handle on a state that aborts the interaction.
    CancellingState => Cancelling,
}

capability!(OutputState: InitState, StdState);
capability!(InputState: StdState, TerminalState, CancellingState);
capability!(StartingState: InitState, StdState, TerminalState);

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> StateId {
        StateId::new(FsmId::new(), index)
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(StateKind::Init.name(), "init");
        assert_eq!(StateKind::Std.name(), "std");
        assert_eq!(StateKind::Terminal.name(), "terminal");
        assert_eq!(StateKind::Cancelling.name(), "cancelling");
    }

    #[test]
    fn capabilities_split_output_and_input() {
        assert!(StateKind::Init.is_output());
        assert!(!StateKind::Init.is_input());
        assert!(StateKind::Std.is_output());
        assert!(StateKind::Std.is_input());
        assert!(!StateKind::Terminal.is_output());
        assert!(StateKind::Terminal.is_input());
        assert!(!StateKind::Cancelling.is_output());
        assert!(StateKind::Cancelling.is_input());
    }

    #[test]
    fn only_terminal_and_cancelling_are_final() {
        assert!(!StateKind::Init.is_final());
        assert!(!StateKind::Std.is_final());
        assert!(StateKind::Terminal.is_final());
        assert!(StateKind::Cancelling.is_final());
    }

    #[test]
    fn handles_report_their_kind_and_id() {
        let state_id = id(3);
        let std = StdState::new(state_id);
        assert_eq!(std.id(), state_id);
        assert_eq!(std.kind(), StateKind::Std);
        assert_eq!(TerminalState::new(state_id).kind(), StateKind::Terminal);
        assert_eq!(CancellingState::new(state_id).kind(), StateKind::Cancelling);
        assert_eq!(InitState::new(state_id).kind(), StateKind::Init);
        assert_eq!(StateId::from(std), state_id);
    }

    #[test]
    fn state_ids_of_different_machines_differ() {
        assert_ne!(id(0), id(0));
        let fsm = FsmId::new();
        assert_eq!(StateId::new(fsm, 1), StateId::new(fsm, 1));
        assert_eq!(StateId::new(fsm, 1).fsm(), fsm);
        assert_eq!(StateId::new(fsm, 1).index(), 1);
    }

    #[test]
    fn state_kind_serializes_in_snake_case() {
        let json = serde_json::to_string(&StateKind::Cancelling).unwrap();
        assert_eq!(json, "\"cancelling\"");
        let kind: StateKind = serde_json::from_str("\"terminal\"").unwrap();
        assert_eq!(kind, StateKind::Terminal);
    }
}
