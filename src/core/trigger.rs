//! What makes a transition eligible.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Trigger kind of a transition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Eligible on every re-evaluation pass, pending its guard.
    #[default]
    None,

    /// Eligible only when an event with this name is dispatched.
    Event(String),

    /// Eligible once this long has passed since the source state was entered.
    Timer(Duration),
}

impl Trigger {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Event(name) => Some(name),
            _ => None,
        }
    }

    pub fn timer_duration(&self) -> Option<Duration> {
        match self {
            Self::Timer(duration) => Some(*duration),
            _ => None,
        }
    }

    pub fn is_timer(&self) -> bool {
        matches!(self, Self::Timer(_))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Event(name) => f.write_str(name),
            Self::Timer(duration) => write!(f, "after {}ms", duration.as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_the_variant() {
        let event = Trigger::Event("TurnOn".into());
        let timer = Trigger::Timer(Duration::from_millis(15));

        assert_eq!(event.event_name(), Some("TurnOn"));
        assert_eq!(event.timer_duration(), None);
        assert_eq!(timer.timer_duration(), Some(Duration::from_millis(15)));
        assert_eq!(timer.event_name(), None);
        assert!(timer.is_timer());
        assert!(!Trigger::None.is_timer());
    }

    #[test]
    fn display_is_diagram_friendly() {
        assert_eq!(Trigger::None.to_string(), "");
        assert_eq!(Trigger::Event("TurnOff".into()).to_string(), "TurnOff");
        assert_eq!(
            Trigger::Timer(Duration::from_millis(250)).to_string(),
            "after 250ms"
        );
    }

    #[test]
    fn trigger_serializes_correctly() {
        let trigger = Trigger::Event("TurnOn".into());
        let json = serde_json::to_string(&trigger).unwrap();
        let deserialized: Trigger = serde_json::from_str(&json).unwrap();

        assert_eq!(trigger, deserialized);
    }
}
