//! Events dispatched into a state machine.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque event payload. The engine never inspects it; guards and effects
/// downcast it to whatever type the caller agreed on.
pub type Payload = dyn Any + Send + Sync;

/// An immutable, cheaply cloneable event.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Event;
///
/// let coin = Event::new("InsertCoin").with_payload(50u32).with_labels(["coin"]);
///
/// assert_eq!(coin.name(), "InsertCoin");
/// assert_eq!(coin.payload_as::<u32>(), Some(&50));
/// assert_eq!(coin.labels(), ["coin"]);
/// ```
#[derive(Clone)]
pub struct Event {
    name: String,
    payload: Option<Arc<Payload>>,
    labels: Vec<String>,
}

impl Event {
    /// Create an event with no payload and no labels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            labels: Vec::new(),
        }
    }

    /// Attach a payload, replacing any previous one.
    pub fn with_payload<T>(mut self, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Append descriptive labels.
    pub fn with_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_deref()
    }

    /// Borrow the payload as `T`, if there is one and it has that type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload()?.downcast_ref::<T>()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("has_payload", &self.payload.is_some())
            .field("labels", &self.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_without_payload() {
        let event = Event::new("TurnOn");

        assert_eq!(event.name(), "TurnOn");
        assert!(event.payload().is_none());
        assert!(event.payload_as::<u32>().is_none());
        assert!(event.labels().is_empty());
    }

    #[test]
    fn payload_downcasts_only_to_its_own_type() {
        let event = Event::new("InsertCoin").with_payload(50u32);

        assert_eq!(event.payload_as::<u32>(), Some(&50));
        assert!(event.payload_as::<u64>().is_none());
        assert!(event.payload_as::<String>().is_none());
    }

    #[test]
    fn clones_share_the_payload() {
        let event = Event::new("Reading").with_payload(vec![1, 2, 3]);
        let cloned = event.clone();

        let original = event.payload_as::<Vec<i32>>().unwrap();
        let copy = cloned.payload_as::<Vec<i32>>().unwrap();
        assert!(std::ptr::eq(original, copy));
    }

    #[test]
    fn labels_accumulate_in_order() {
        let event = Event::new("Alarm")
            .with_labels(["urgent"])
            .with_labels(vec![String::from("external")]);

        assert_eq!(event.labels(), ["urgent", "external"]);
    }

    #[test]
    fn debug_output_hides_payload_contents() {
        let event = Event::new("Secret").with_payload("hunter2");
        let rendered = format!("{event:?}");

        assert!(rendered.contains("Secret"));
        assert!(rendered.contains("has_payload: true"));
        assert!(!rendered.contains("hunter2"));
    }
}
