//! Build errors for machine and transition builders.

use thiserror::Error;

/// Errors that can occur when building machines and transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Transition source state not specified. Call .from(state)")]
    MissingSourceState,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingTargetState,

    #[error("Transition trigger not specified. Call .accept(..), .timeout(..) or .sub_fsm(..)")]
    MissingTrigger,

    #[error("Sub-FSM transition built without a child machine")]
    MissingSubFsm,

    #[error("State {state} does not belong to this machine")]
    ForeignState { state: String },

    #[error("Transition has more than one trigger; use exactly one of accept, timeout or sub_fsm")]
    AmbiguousTrigger,

    #[error("Timeout transitions fire without an event and cannot be guarded")]
    GuardedTimeout,
}
