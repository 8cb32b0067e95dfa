//! Structural problems a machine graph can have.

use thiserror::Error;

/// Issues found when checking a machine's graph
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphIssue {
    #[error("State '{state}' cannot be reached from the init state")]
    UnreachableState { state: String },

    #[error("Standard state '{state}' has no outgoing transition")]
    DeadEnd { state: String },

    #[error("Starting state '{state}' cannot be reached, the machine never starts")]
    UnreachableStartingState { state: String },

    #[error("State '{state}' has {count} timeout transitions, only the first one is armed")]
    MultipleTimeouts { state: String, count: usize },

    #[error("In sub-FSM '{fsm}': {issue}")]
    InSubFsm { fsm: String, issue: Box<GraphIssue> },
}
