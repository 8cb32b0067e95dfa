//! Validation-based checks of a machine's graph.
//!
//! Checking uses Stillwater's `Validation` type to accumulate ALL issues
//! instead of stopping at the first one, so a machine definition can be fixed
//! in a single pass. Issues of embedded machines are reported too, tagged
//! with the embedded machine's name.
//!
//! # Example
//!
//! ```rust
//! use gesture_fsm::builder::TransitionBuilder;
//! use gesture_fsm::engine::Fsm;
//! use stillwater::validation::Validation;
//!
//! let mut fsm: Fsm<&'static str> = Fsm::new();
//! let init = fsm.init_state();
//! let pressed = fsm.add_std_state("pressed");
//! fsm.add_std_state("orphan");
//! fsm.add_transition(
//!     TransitionBuilder::new()
//!         .from(init)
//!         .to(pressed)
//!         .accept(|e: &&str| *e == "press"),
//! )
//! .unwrap();
//!
//! match fsm.validate() {
//!     Validation::Failure(issues) => assert_eq!(issues.len(), 3),
//!     Validation::Success(_) => panic!("expected issues"),
//! }
//! ```

use crate::engine::Fsm;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub mod issues;

pub use issues::GraphIssue;

/// Outcome of a graph check.
pub type GraphValidation = Validation<(), NonEmptyVec<GraphIssue>>;

impl<E> Fsm<E> {
    /// Indices of the states reachable from the init state.
    fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.states.len()];
        let mut pending = vec![0];
        while let Some(index) = pending.pop() {
            if seen.get(index).copied().unwrap_or(true) {
                continue;
            }
            seen[index] = true;
            for transition in &self.states[index].transitions {
                pending.push(transition.target.index());
            }
        }
        seen
    }

    /// Check the graph, accumulating ALL issues.
    /// Returns `Validation::Success(())` if the graph is sound.
    pub fn validate(&self) -> GraphValidation {
        let mut checks: Vec<GraphValidation> = Vec::new();
        let reachable = self.reachable();

        for (index, node) in self.states.iter().enumerate() {
            let check = if reachable[index] {
                Validation::success(())
            } else {
                Validation::fail(GraphIssue::UnreachableState {
                    state: node.name.clone(),
                })
            };
            checks.push(check);

            if node.kind == crate::core::StateKind::Std && node.transitions.is_empty() {
                checks.push(Validation::fail(GraphIssue::DeadEnd {
                    state: node.name.clone(),
                }));
            }

            let timeouts = node.transitions.iter().filter(|tr| tr.is_timeout()).count();
            if timeouts > 1 {
                checks.push(Validation::fail(GraphIssue::MultipleTimeouts {
                    state: node.name.clone(),
                    count: timeouts,
                }));
            }

            for child in node.transitions.iter().filter_map(|tr| tr.child()) {
                if let Validation::Failure(issues) = child.validate() {
                    for issue in issues.iter() {
                        checks.push(Validation::fail(GraphIssue::InSubFsm {
                            fsm: child.name().to_string(),
                            issue: Box::new(issue.clone()),
                        }));
                    }
                }
            }
        }

        if let Some(starting) = self.starting {
            if !reachable.get(starting.index()).copied().unwrap_or(false) {
                let state = self.state_name(starting).unwrap_or("?").to_string();
                checks.push(Validation::fail(GraphIssue::UnreachableStartingState {
                    state,
                }));
            }
        }

        // Accumulate ALL failures using all_vec
        Validation::all_vec(checks).map(|_| ())
    }
}
