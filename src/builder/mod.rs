//! Builder API for machine and transition construction.
//!
//! This module provides fluent builders for creating machines and their
//! transitions, and the errors they report.

pub mod error;
pub mod machine;
pub mod transition;

pub use error::BuildError;
pub use machine::{FsmBuilder, FsmConfig};
pub use transition::TransitionBuilder;
