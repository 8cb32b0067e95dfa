//! Gesture FSM: finite state machines for user interactions
//!
//! An interaction (click, drag, double-click, multi-touch, ...) is modelled as
//! a machine fed with low-level input events. The machine walks from its init
//! state through standard states, and ends either in a terminal state (the
//! interaction completed) or in a cancelling state (it was aborted). Lifecycle
//! handlers observe the interaction starting, updating, stopping or being
//! cancelled, and may cancel it themselves.
//!
//! # Core Concepts
//!
//! - **States**: Typed handles issued by the machine that owns them
//! - **Transitions**: Event-triggered, widget-capturing, timed or wrapping a
//!   whole child machine
//! - **Guards**: Predicates over the event that gate a transition
//! - **Handlers**: Start/update/stop/cancel observers
//! - **Recycling**: Events replayed once the current interaction ends
//!
//! # Example
//!
//! ```rust
//! use gesture_fsm::builder::{FsmBuilder, TransitionBuilder};
//! use gesture_fsm::engine::{CancelFsm, Fsm, FsmHandler};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Debug)]
//! enum Mouse {
//!     Press { x: i32, y: i32 },
//!     Move { x: i32, y: i32 },
//!     Release,
//! }
//!
//! struct Log(Arc<Mutex<Vec<&'static str>>>);
//!
//! impl FsmHandler for Log {
//!     fn fsm_starts(&mut self) -> Result<(), CancelFsm> {
//!         self.0.lock().unwrap().push("start");
//!         Ok(())
//!     }
//!
//!     fn fsm_stops(&mut self) -> Result<(), CancelFsm> {
//!         self.0.lock().unwrap().push("stop");
//!         Ok(())
//!     }
//! }
//!
//! let mut drag: Fsm<Mouse> = FsmBuilder::new().name("drag").build();
//! let init = drag.init_state();
//! let pressed = drag.add_std_state("pressed");
//! let dragged = drag.add_std_state("dragged");
//! let released = drag.add_terminal_state("released");
//!
//! drag.add_transition(
//!     TransitionBuilder::new()
//!         .from(init)
//!         .to(pressed)
//!         .accept(|e: &Mouse| matches!(e, Mouse::Press { .. })),
//! )
//! .unwrap();
//! drag.add_transition(
//!     TransitionBuilder::new()
//!         .from(pressed)
//!         .to(dragged)
//!         .accept(|e: &Mouse| matches!(e, Mouse::Move { .. })),
//! )
//! .unwrap();
//! drag.add_transition(
//!     TransitionBuilder::new()
//!         .from(dragged)
//!         .to(dragged)
//!         .accept(|e: &Mouse| matches!(e, Mouse::Move { .. })),
//! )
//! .unwrap();
//! drag.add_transition(
//!     TransitionBuilder::new()
//!         .from(dragged)
//!         .to(released)
//!         .accept(|e: &Mouse| matches!(e, Mouse::Release)),
//! )
//! .unwrap();
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! drag.add_handler(Log(Arc::clone(&log)));
//!
//! for event in [
//!     Mouse::Press { x: 0, y: 0 },
//!     Mouse::Move { x: 4, y: 2 },
//!     Mouse::Move { x: 9, y: 5 },
//!     Mouse::Release,
//! ] {
//!     drag.process(&event).unwrap();
//! }
//!
//! assert_eq!(*log.lock().unwrap(), vec!["start", "stop"]);
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod snapshot;
pub mod validation;

// Re-export commonly used types
pub use builder::{BuildError, FsmBuilder, FsmConfig, TransitionBuilder};
pub use core::{Guard, StateChange, StateHandle, StateId, StateKind};
pub use engine::{CancelFsm, Fsm, FsmHandler, HandlerId, Recycler, TimeoutTicket, WidgetSlot};
pub use snapshot::{FsmSnapshot, SnapshotError};
pub use validation::GraphIssue;
