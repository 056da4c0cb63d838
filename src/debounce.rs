use std::time::{Duration, Instant};

/// Default quiet period before search text is committed.
pub const DEFAULT_QUIET: Duration = Duration::from_millis(300);

/// Coalesces rapid edits into one commit.
///
/// Each [`push`](Debouncer::push) schedules the value to be committed once
/// `quiet` has elapsed with no further pushes; a newer push cancels the
/// pending one and restarts the timer. The owner's event loop calls
/// [`poll`](Debouncer::poll) and sleeps no longer than [`deadline`](Debouncer::deadline).
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.quiet));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    /// Commit immediately, e.g. when the input is confirmed.
    pub fn flush(&mut self) -> Option<T> {
        self.cancel()
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(v, _)| v)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Time left until the pending commit, zero if overdue.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|at| at.saturating_duration_since(now))
    }

    /// The pending value if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now >= *at => self.cancel(),
            _ => None,
        }
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET)
    }
}
