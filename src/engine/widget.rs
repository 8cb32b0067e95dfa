//! Widget payloads carried by transitions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared slot a widget transition fills with the widget its event targets.
///
/// The binding layer keeps one handle, the transition another; cloning shares
/// the slot.
pub struct WidgetSlot<W> {
    widget: Arc<Mutex<Option<W>>>,
}

impl<W> WidgetSlot<W> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            widget: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<W>> {
        self.widget.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a widget. An absent widget leaves the current one in place.
    pub fn set(&self, widget: Option<W>) {
        if let Some(widget) = widget {
            *self.lock() = Some(widget);
        }
    }

    /// Empty the slot.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Whether a widget was captured.
    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }
}

impl<W: Clone> WidgetSlot<W> {
    /// The captured widget, if any.
    pub fn get(&self) -> Option<W> {
        self.lock().clone()
    }
}

impl<W> Clone for WidgetSlot<W> {
    fn clone(&self) -> Self {
        Self {
            widget: Arc::clone(&self.widget),
        }
    }
}

impl<W> Default for WidgetSlot<W> {
    fn default() -> Self {
        Self::new()
    }
}
