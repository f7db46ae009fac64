//! Stability debouncing of the smoothed candidate emotion
//!
//! A candidate only becomes the committed emotion after it has been the
//! smoother's output continuously for the stability threshold. Any change
//! of candidate restarts the timer from zero.

use std::time::{Duration, Instant};

use super::PlaybackCategory;

/// Default time a candidate must hold before it is committed
pub const DEFAULT_STABILITY_THRESHOLD: Duration = Duration::from_secs(3);

/// State of the debouncer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
    /// Nothing committed yet
    Uncommitted,
    /// A category has been committed and drives playback
    Stable(PlaybackCategory),
}

/// Emitted when the committed category changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    /// Previously committed category, if any
    pub previous: Option<PlaybackCategory>,
    /// Newly committed category
    pub category: PlaybackCategory,
}

/// Candidate currently accumulating stability time
#[derive(Debug, Clone)]
struct Pending {
    category: PlaybackCategory,
    since: Instant,
}

/// Commits a candidate emotion only once it has been stable long enough
#[derive(Debug, Clone)]
pub struct StabilityDebouncer {
    threshold: Duration,
    pending: Option<Pending>,
    state: DebounceState,
}

impl Default for StabilityDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_STABILITY_THRESHOLD)
    }
}

impl StabilityDebouncer {
    /// Create a debouncer with the given stability threshold
    #[must_use]
    pub const fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: None,
            state: DebounceState::Uncommitted,
        }
    }

    /// Feed the latest candidate observed at `now`
    ///
    /// Returns an event only when the committed category actually changes.
    /// A `None` candidate leaves everything untouched.
    pub fn evaluate(
        &mut self,
        candidate: Option<&PlaybackCategory>,
        now: Instant,
    ) -> Option<CommitEvent> {
        let candidate = candidate?;

        let since = match &self.pending {
            Some(pending) if pending.category == *candidate => pending.since,
            _ => {
                tracing::debug!(
                    candidate = %candidate,
                    committed = ?self.committed().map(PlaybackCategory::as_str),
                    "candidate changed, stability timer restarted"
                );
                self.pending = Some(Pending {
                    category: candidate.clone(),
                    since: now,
                });
                return None;
            }
        };

        if now.saturating_duration_since(since) < self.threshold {
            return None;
        }

        match &self.state {
            DebounceState::Stable(committed) if committed == candidate => None,
            _ => {
                let previous = match std::mem::replace(
                    &mut self.state,
                    DebounceState::Stable(candidate.clone()),
                ) {
                    DebounceState::Stable(previous) => Some(previous),
                    DebounceState::Uncommitted => None,
                };

                tracing::info!(
                    category = %candidate,
                    previous = ?previous.as_ref().map(PlaybackCategory::as_str),
                    "emotion committed"
                );

                Some(CommitEvent {
                    previous,
                    category: candidate.clone(),
                })
            }
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &DebounceState {
        &self.state
    }

    /// Currently committed category
    #[must_use]
    pub const fn committed(&self) -> Option<&PlaybackCategory> {
        match &self.state {
            DebounceState::Stable(category) => Some(category),
            DebounceState::Uncommitted => None,
        }
    }

    /// Candidate accumulating stability time, if it differs from the committed one
    #[must_use]
    pub fn pending(&self) -> Option<&PlaybackCategory> {
        self.pending
            .as_ref()
            .map(|p| &p.category)
            .filter(|c| self.committed() != Some(*c))
    }

    /// Time left before the pending candidate would commit
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending()?;
        self.pending.as_ref().map(|p| {
            self.threshold
                .saturating_sub(now.saturating_duration_since(p.since))
        })
    }

    /// Configured stability threshold
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Forget pending and committed state
    pub fn reset(&mut self) {
        self.pending = None;
        self.state = DebounceState::Uncommitted;
    }
}
