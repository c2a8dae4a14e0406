//! Quiet-period debouncer for the search box.
//!
//! Time is passed in by the caller, so the debouncer owns no timer thread
//! and tests drive it with synthetic instants.

use std::time::{Duration, Instant};

/// Quiet period between the last keystroke and the fetch.
pub const SEARCH_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Holds at most one pending search. A new keystroke replaces it and
/// restarts the quiet period.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    quiet: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_QUIET_PERIOD)
    }
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record the current contents of the search box.
    pub fn keystroke(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.to_string(), now + self.quiet));
    }

    /// Take the pending text once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }

    /// Drop any pending search; used when Enter or the search button fires.
    pub fn cancel(&mut self) -> Option<String> {
        self.pending.take().map(|(text, _)| text)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending search will fire.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn rapid_keystrokes_collapse_into_one() {
        let t0 = Instant::now();
        let mut debouncer = SearchDebouncer::default();
        debouncer.keystroke("a", t0);
        debouncer.keystroke("an", t0 + ms(100));
        debouncer.keystroke("ana", t0 + ms(200));

        assert_eq!(debouncer.poll(t0 + ms(499)), None);
        assert_eq!(debouncer.poll(t0 + ms(500)).as_deref(), Some("ana"));
        assert_eq!(debouncer.poll(t0 + ms(900)), None);
    }

    #[test]
    fn pause_longer_than_quiet_period_fires_twice() {
        let t0 = Instant::now();
        let mut debouncer = SearchDebouncer::default();
        debouncer.keystroke("a", t0);
        assert_eq!(debouncer.poll(t0 + ms(400)).as_deref(), Some("a"));

        debouncer.keystroke("ana", t0 + ms(400));
        assert_eq!(debouncer.poll(t0 + ms(650)), None);
        assert_eq!(debouncer.poll(t0 + ms(700)).as_deref(), Some("ana"));
    }

    #[test]
    fn cancel_clears_the_timer() {
        let t0 = Instant::now();
        let mut debouncer = SearchDebouncer::default();
        debouncer.keystroke("jo", t0);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.deadline(), Some(t0 + SEARCH_QUIET_PERIOD));
        assert_eq!(debouncer.cancel().as_deref(), Some("jo"));
        assert_eq!(debouncer.poll(t0 + ms(1000)), None);
    }
}
