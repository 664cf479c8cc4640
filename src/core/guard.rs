//! Guard predicates for controlling transitions.
//!
//! A guard is evaluated every time its transition is considered: once per
//! matching event for event-triggered transitions, and on every
//! re-evaluation pass for eventless and timer-triggered ones.

use super::event::Payload;
use std::fmt;
use std::sync::Arc;

/// Predicate over the machine data and the triggering event's payload.
///
/// Eventless and timer-triggered transitions see `None` as the payload.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Guard;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct Meter {
///     paid: AtomicU32,
/// }
///
/// let paid_enough = Guard::new(|meter: &Meter, _| meter.paid.load(Ordering::SeqCst) >= 300);
/// let meter = Meter { paid: AtomicU32::new(250) };
///
/// assert!(!paid_enough.check(&meter, None));
/// meter.paid.store(300, Ordering::SeqCst);
/// assert!(paid_enough.check(&meter, None));
/// ```
pub struct Guard<D> {
    predicate: Arc<dyn Fn(&D, Option<&Payload>) -> bool + Send + Sync>,
}

impl<D> Guard<D> {
    /// Create a guard from a predicate function.
    ///
    /// The predicate may run on any thread and may run many times for a
    /// single logical decision, so it should not have side effects.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&D, Option<&Payload>) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// A guard that always passes. Transitions default to this.
    pub fn always() -> Self {
        Guard::new(|_, _| true)
    }

    pub fn check(&self, data: &D, payload: Option<&Payload>) -> bool {
        (self.predicate)(data, payload)
    }
}

impl<D> Clone for Guard<D> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<D> Default for Guard<D> {
    fn default() -> Self {
        Self::always()
    }
}

impl<D> fmt::Debug for Guard<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
