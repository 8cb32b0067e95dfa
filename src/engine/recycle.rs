//! Queue of events that outlive the interaction that consumed them.
//!
//! When a key is still held after the gesture that used it completes, the
//! key event is pushed here and replayed once the machine is back in its init
//! state, so the next interaction can start from it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared FIFO of recycled events.
///
/// Cloning yields another handle on the same queue, which lets transition
/// actions and handlers flag events while the machine is dispatching.
pub struct Recycler<E> {
    queue: Arc<Mutex<VecDeque<E>>>,
}

impl<E> Recycler<E> {
    pub(crate) fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<E>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flag an event as still relevant after the current interaction.
    pub fn push(&self, event: E) {
        self.lock().push_back(event);
    }

    /// Number of events waiting for replay.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no event waits for replay.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return the oldest event.
    pub(crate) fn pop_front(&self) -> Option<E> {
        self.lock().pop_front()
    }

    /// Discard every queued event.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }
}

impl<E> Clone for Recycler<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<E> std::fmt::Debug for Recycler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recycler").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn events_come_back_in_fifo_order() {
        let recycler = Recycler::new();
        recycler.push("ctrl");
        recycler.push("shift");

        assert_eq!(recycler.len(), 2);
        assert_eq!(recycler.pop_front(), Some("ctrl"));
        assert_eq!(recycler.pop_front(), Some("shift"));
        assert_eq!(recycler.pop_front(), None);
        assert!(recycler.is_empty());
    }

    #[test]
    fn clones_share_the_queue() {
        let recycler = Recycler::new();
        let producer = recycler.clone();
        producer.push(1);

        assert_eq!(recycler.len(), 1);
        recycler.clear();
        assert!(producer.is_empty());
    }

    #[test]
    fn producers_on_other_threads_append() {
        let recycler = Recycler::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let producer = recycler.clone();
                thread::spawn(move || producer.push(i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recycler.len(), 4);
    }
}
