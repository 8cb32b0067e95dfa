//! The interaction engine.
//!
//! This module contains the runtime side of the crate:
//! - The machine, its dispatch loop and lifecycle
//! - Transitions and their triggers
//! - Composition of child machines
//! - Timers, lifecycle handlers and event recycling

pub mod handler;
pub mod machine;
pub mod recycle;
mod subfsm;
pub mod timeout;
pub mod transition;
pub mod widget;

pub use handler::{CancelFsm, FsmHandler, HandlerId};
pub use machine::Fsm;
pub use recycle::Recycler;
pub use timeout::{Marshal, TimeoutTicket};
pub use transition::Transition;
pub use widget::WidgetSlot;
