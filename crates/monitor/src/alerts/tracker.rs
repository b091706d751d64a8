use std::collections::HashMap;

use crate::types::HealthState;

/// A change in a service's classified state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub service_key: String,
    pub from: HealthState,
    pub to: HealthState,
}

impl Transition {
    /// Coming back up from a known bad state, as opposed to the first sighting.
    pub fn is_recovery(&self) -> bool {
        self.to == HealthState::Up && matches!(self.from, HealthState::Down | HealthState::Degraded)
    }
}

/// Last known state per service.
///
/// Owned by the scheduler task and never shared; a restart starts every
/// service from [`HealthState::Unknown`].
#[derive(Debug, Default)]
pub struct AlertTracker {
    states: HashMap<String, HealthState>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result and return the transition it caused, if any.
    pub fn observe(&mut self, service_key: &str, ok: bool, degraded: bool) -> Option<Transition> {
        let to = HealthState::classify(ok, degraded);
        let from = self.state(service_key);
        if from == to {
            return None;
        }

        self.states.insert(service_key.to_owned(), to);
        Some(Transition { service_key: service_key.to_owned(), from, to })
    }

    pub fn state(&self, service_key: &str) -> HealthState {
        self.states.get(service_key).copied().unwrap_or(HealthState::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_result_leaves_unknown() {
        let mut tracker = AlertTracker::new();

        let t = tracker.observe("web", true, false).unwrap();

        assert_eq!((t.from, t.to), (HealthState::Unknown, HealthState::Up));
        assert!(!t.is_recovery());
        assert_eq!(tracker.state("web"), HealthState::Up);
    }

    #[test]
    fn test_emits_only_on_change() {
        let mut tracker = AlertTracker::new();
        tracker.observe("web", true, false);

        let down = tracker.observe("web", false, false).unwrap();
        assert_eq!((down.from, down.to), (HealthState::Up, HealthState::Down));

        assert!(tracker.observe("web", false, false).is_none());
        assert!(tracker.observe("web", false, true).is_none());

        let up = tracker.observe("web", true, false).unwrap();
        assert_eq!((up.from, up.to), (HealthState::Down, HealthState::Up));
        assert!(up.is_recovery());
    }

    #[test]
    fn test_degraded_is_its_own_state() {
        let mut tracker = AlertTracker::new();
        tracker.observe("web", true, false);

        let slow = tracker.observe("web", true, true).unwrap();
        assert_eq!(slow.to, HealthState::Degraded);
        assert!(tracker.observe("web", true, true).is_none());
        assert!(tracker.observe("web", true, false).unwrap().is_recovery());
    }

    #[test]
    fn test_services_are_tracked_independently() {
        let mut tracker = AlertTracker::new();
        tracker.observe("web", false, false);

        assert!(tracker.observe("ssh", false, false).is_some());
        assert_eq!(tracker.state("web"), HealthState::Down);
        assert_eq!(tracker.state("nas"), HealthState::Unknown);
    }
}
