//! Render debouncing.
//!
//! Editors emit several events per save. Every qualifying change pushes a
//! single deadline out by the debounce delay, so the render fires once the
//! sources have been quiet for that long.

use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period before a render fires, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Single trailing-edge timer.
///
/// Holds at most one pending deadline. Arming replaces it.
#[derive(Debug)]
pub(crate) struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record a change seen at `now`, superseding any pending deadline.
    pub(crate) fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Pending deadline, if armed.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return `true` if the deadline has passed at `now`.
    pub(crate) fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_new_is_idle() {
        let debouncer = Debouncer::new(DELAY);
        assert!(!debouncer.is_armed());
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn test_arm_sets_deadline_after_delay() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.arm(start);

        assert!(debouncer.is_armed());
        assert_eq!(debouncer.deadline(), Some(start + DELAY));
    }

    #[test]
    fn test_rearm_supersedes_pending_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.arm(start);
        debouncer.arm(start + Duration::from_millis(30));
        debouncer.arm(start + Duration::from_millis(60));

        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(160))
        );
        // The first deadline has been replaced, not kept alongside
        assert!(!debouncer.take_due(start + DELAY));
        assert!(debouncer.take_due(start + Duration::from_millis(160)));
    }

    #[test]
    fn test_take_due_fires_once() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.arm(start);

        assert!(!debouncer.take_due(start + Duration::from_millis(99)));
        assert!(debouncer.take_due(start + DELAY));
        assert!(!debouncer.is_armed());
        assert!(!debouncer.take_due(start + Duration::from_secs(10)));
    }

    #[test]
    fn test_take_due_when_idle() {
        let mut debouncer = Debouncer::new(DELAY);
        assert!(!debouncer.take_due(Instant::now()));
    }

    #[test]
    fn test_new_cycle_after_firing() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.arm(start);
        assert!(debouncer.take_due(start + DELAY));

        let later = start + Duration::from_millis(500);
        debouncer.arm(later);
        assert_eq!(debouncer.deadline(), Some(later + DELAY));
    }
}
