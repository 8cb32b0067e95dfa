//! Core value types of the engine.
//!
//! This module contains the building blocks the engine is assembled from:
//! - State identities, kinds and capability traits
//! - Guard predicates over events
//! - Current-state change records

mod change;
mod guard;
mod state;

pub(crate) use change::StatePublisher;
pub use change::StateChange;
pub use guard::Guard;
pub use state::{
    CancellingState, FsmId, InitState, InputState, OutputState, StartingState, StateHandle,
    StateId, StateKind, StdState, TerminalState,
};
