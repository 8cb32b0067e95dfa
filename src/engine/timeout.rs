//! Timer thread and the hand-off of elapsed timeouts to the owning context.
//!
//! A machine arms at most one timer at a time. The timer waits on a dedicated
//! thread; when it elapses, the thread does not touch the machine. It hands a
//! [`TimeoutTicket`] to the machine's marshal hook, and whoever owns the
//! machine later feeds that ticket to [`Fsm::on_timeout`](crate::engine::Fsm::on_timeout).
//! Cancelling a timer drops its cancel sender, which wakes the thread early.

use crate::core::FsmId;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// Proof that a timer armed by some machine elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeoutTicket {
    fsm: FsmId,
    generation: u64,
}

impl TimeoutTicket {
    /// The machine that armed the timer.
    pub fn fsm(&self) -> FsmId {
        self.fsm
    }
}

/// Hook invoked on the timer thread to hand an elapsed ticket to the context
/// that owns the machine.
pub type Marshal = Arc<dyn Fn(TimeoutTicket) + Send + Sync>;

/// Location of a transition: source state index and position in its list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TransitionRef {
    pub(crate) state: usize,
    pub(crate) index: usize,
}

/// An armed timer. Dropping it cancels the timer.
#[derive(Debug)]
pub(crate) struct PendingTimeout {
    pub(crate) ticket: TimeoutTicket,
    pub(crate) at: TransitionRef,
    _cancel: Sender<()>,
}

pub(crate) struct TimeoutScheduler {
    marshal: Marshal,
    fired: Receiver<TimeoutTicket>,
    generation: u64,
}

impl TimeoutScheduler {
    /// Scheduler whose marshal hook queues tickets on an internal channel,
    /// drained by [`Fsm::process_timeouts`](crate::engine::Fsm::process_timeouts).
    pub(crate) fn new() -> Self {
        let (tx, rx) = unbounded();
        let marshal: Marshal = Arc::new(move |ticket: TimeoutTicket| {
            let _ = tx.send(ticket);
        });
        Self {
            marshal,
            fired: rx,
            generation: 0,
        }
    }

    pub(crate) fn marshal(&self) -> Marshal {
        Arc::clone(&self.marshal)
    }

    pub(crate) fn set_marshal(&mut self, marshal: Marshal) {
        self.marshal = marshal;
    }

    pub(crate) fn fired(&self) -> Receiver<TimeoutTicket> {
        self.fired.clone()
    }

    pub(crate) fn try_fired(&self) -> Option<TimeoutTicket> {
        self.fired.try_recv().ok()
    }

    /// Arm a timer for the transition at `at`. A zero duration arms nothing.
    pub(crate) fn schedule(
        &mut self,
        fsm: FsmId,
        at: TransitionRef,
        duration: Duration,
    ) -> Option<PendingTimeout> {
        if duration.is_zero() {
            return None;
        }
        self.generation += 1;
        let ticket = TimeoutTicket {
            fsm,
            generation: self.generation,
        };
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let marshal = Arc::clone(&self.marshal);

        let spawned = thread::Builder::new()
            .name("fsm-timeout".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(duration) {
                    marshal(ticket);
                }
            });

        match spawned {
            Ok(_) => Some(PendingTimeout {
                ticket,
                at,
                _cancel: cancel_tx,
            }),
            Err(err) => {
                warn!(fsm = %fsm, error = %err, "failed to spawn timeout thread");
                None
            }
        }
    }
}

impl std::fmt::Debug for TimeoutScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutScheduler")
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const AT: TransitionRef = TransitionRef { state: 1, index: 0 };

    #[test]
    fn elapsed_timer_reaches_the_default_channel() {
        let mut scheduler = TimeoutScheduler::new();
        let fsm = FsmId::new();
        let pending = scheduler
            .schedule(fsm, AT, Duration::from_millis(10))
            .unwrap();

        let ticket = scheduler
            .fired()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(ticket, pending.ticket);
        assert_eq!(ticket.fsm(), fsm);
    }

    #[test]
    fn dropped_timer_never_fires() {
        let mut scheduler = TimeoutScheduler::new();
        let pending = scheduler
            .schedule(FsmId::new(), AT, Duration::from_millis(50))
            .unwrap();
        drop(pending);

        assert!(scheduler
            .fired()
            .recv_timeout(Duration::from_millis(200))
            .is_err());
    }

    #[test]
    fn zero_duration_arms_nothing() {
        let mut scheduler = TimeoutScheduler::new();
        assert!(scheduler
            .schedule(FsmId::new(), AT, Duration::ZERO)
            .is_none());
    }

    #[test]
    fn each_timer_gets_a_fresh_ticket() {
        let mut scheduler = TimeoutScheduler::new();
        let fsm = FsmId::new();
        let first = scheduler.schedule(fsm, AT, Duration::from_secs(60)).unwrap();
        let second = scheduler.schedule(fsm, AT, Duration::from_secs(60)).unwrap();
        assert_ne!(first.ticket, second.ticket);
    }

    #[test]
    fn custom_marshal_receives_tickets() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut scheduler = TimeoutScheduler::new();
        scheduler.set_marshal(Arc::new(move |ticket: TimeoutTicket| {
            sink.lock().unwrap().push(ticket)
        }));

        let pending = scheduler
            .schedule(FsmId::new(), AT, Duration::from_millis(5))
            .unwrap();
        for _ in 0..200 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(*seen.lock().unwrap(), vec![pending.ticket]);
        assert!(scheduler.try_fired().is_none());
    }
}
