//! Current-state change notifications.
//!
//! Every time a machine moves its current-state pointer it publishes a
//! [`StateChange`] to all subscribers. Subscribers receive changes on a
//! crossbeam channel; the channel is closed when the machine is uninstalled.

use super::state::StateId;
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Record of a single move of a machine's current-state pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// The state being left
    pub previous: StateId,
    /// The state now current
    pub current: StateId,
    /// When the change happened
    pub timestamp: DateTime<Utc>,
}

/// Fan-out of state changes to subscribed receivers.
#[derive(Debug, Default)]
pub(crate) struct StatePublisher {
    subscribers: Vec<Sender<StateChange>>,
    closed: bool,
}

impl StatePublisher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Open a new subscription. Subscribing to a closed publisher yields an
    /// already disconnected receiver.
    pub(crate) fn subscribe(&mut self) -> Receiver<StateChange> {
        let (tx, rx) = unbounded();
        if !self.closed {
            self.subscribers.push(tx);
        }
        rx
    }

    /// Publish a change; subscribers whose receiver was dropped are forgotten.
    pub(crate) fn publish(&mut self, previous: StateId, current: StateId) {
        if self.subscribers.is_empty() {
            return;
        }
        let change = StateChange {
            previous,
            current,
            timestamp: Utc::now(),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }

    /// Close every subscription. Receivers drain what was already published
    /// and then report disconnection.
    pub(crate) fn close(&mut self) {
        self.subscribers.clear();
        self.closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}
