//! Diagnostic snapshots of a running machine.
//!
//! A snapshot describes the structure of a machine (states, transitions) and
//! where it currently stands. Closures (predicates, guards, actions) are not
//! serializable, so a snapshot cannot be turned back into a machine; it is
//! meant for debugging tools and logs.

use crate::core::{FsmId, StateId, StateKind};
use crate::engine::Fsm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// A transition, without its closures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    pub target: StateId,
    /// `plain`, `widget`, `timeout` or `sub_fsm`
    pub trigger: String,
    pub guarded: bool,
    pub events: Vec<String>,
}

/// A state and its outgoing transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub id: StateId,
    pub name: String,
    pub kind: StateKind,
    pub transitions: Vec<TransitionSnapshot>,
}

/// Serializable picture of a machine at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FsmSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    pub id: FsmId,
    pub name: String,
    pub current_state: StateId,
    pub starting_state: Option<StateId>,
    pub started: bool,
    pub inner: bool,

    /// Own states, init first
    pub states: Vec<StateSnapshot>,

    /// Number of events waiting for replay
    pub recycled: usize,

    /// Whether a timer is armed
    pub timeout_armed: bool,

    /// The child machine driving this one, if any
    pub active_child: Option<Box<FsmSnapshot>>,
}

impl FsmSnapshot {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    /// Read a snapshot back from JSON.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    /// Name of a state of this snapshot or of its active child.
    pub fn state_name(&self, state: StateId) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.id == state)
            .map(|s| s.name.as_str())
            .or_else(|| self.active_child.as_ref()?.state_name(state))
    }
}

impl<E> Fsm<E> {
    /// Capture the machine's structure and position.
    pub fn snapshot(&self) -> FsmSnapshot {
        let states = self
            .states
            .iter()
            .enumerate()
            .map(|(index, node)| StateSnapshot {
                id: StateId::new(self.id, index),
                name: node.name.clone(),
                kind: node.kind,
                transitions: node
                    .transitions
                    .iter()
                    .map(|tr| TransitionSnapshot {
                        target: tr.target,
                        trigger: tr.kind.name().to_string(),
                        guarded: tr.guard.is_some(),
                        events: tr
                            .accepted_events()
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        FsmSnapshot {
            version: SNAPSHOT_VERSION,
            timestamp: Utc::now(),
            id: self.id,
            name: self.name.clone(),
            current_state: self.current,
            starting_state: self.starting,
            started: self.started,
            inner: self.inner,
            states,
            recycled: self.recycled.len(),
            timeout_armed: self.timeout.is_some(),
            active_child: self.active_child().map(|child| Box::new(child.snapshot())),
        }
    }
}
