//! Guard predicates over events.
//!
//! A guard is evaluated only once a transition has accepted an event, and
//! decides from the event's data whether the transition may fire.

use std::marker::PhantomData;

/// Pure predicate that determines if a transition can fire for an event.
///
/// # Example
///
/// ```rust
/// use gesture_fsm::core::Guard;
///
/// #[derive(Debug)]
/// enum Pointer {
///     Press { button: u8 },
///     Release { button: u8 },
/// }
///
/// let left_only = Guard::new(|event: &Pointer| match event {
///     Pointer::Press { button } | Pointer::Release { button } => *button == 1,
/// });
///
/// assert!(left_only.check(&Pointer::Press { button: 1 }));
/// assert!(!left_only.check(&Pointer::Release { button: 3 }));
/// ```
pub struct Guard<E> {
    predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
    _phantom: PhantomData<fn(&E)>,
}

impl<E> Guard<E> {
    /// Create a guard from a predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
            _phantom: PhantomData,
        }
    }

    /// Check if the guard lets the event through.
    pub fn check(&self, event: &E) -> bool {
        (self.predicate)(event)
    }
}

impl<E> std::fmt::Debug for Guard<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestEvent {
        Press(u8),
        Move { x: i32, y: i32 },
        Release(u8),
    }

    #[test]
    fn guard_allows_matching_events() {
        let guard = Guard::new(|e: &TestEvent| matches!(e, TestEvent::Press(1)));

        assert!(guard.check(&TestEvent::Press(1)));
        assert!(!guard.check(&TestEvent::Press(2)));
        assert!(!guard.check(&TestEvent::Release(1)));
    }

    #[test]
    fn guard_reads_event_payload() {
        let guard = Guard::new(|e: &TestEvent| match e {
            TestEvent::Move { x, y } => x.abs() + y.abs() > 3,
            _ => false,
        });

        assert!(guard.check(&TestEvent::Move { x: 2, y: -2 }));
        assert!(!guard.check(&TestEvent::Move { x: 1, y: 1 }));
    }

    #[test]
    fn guard_is_deterministic() {
        let event = TestEvent::Release(3);
        let guard = Guard::new(|e: &TestEvent| matches!(e, TestEvent::Release(b) if *b > 2));

        assert_eq!(guard.check(&event), guard.check(&event));
    }
}
