//! Bounded history of accepted observations with majority-vote smoothing

use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::time::Instant;

use super::PlaybackCategory;

/// Default number of observations kept
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Valid range for the history size
pub const HISTORY_SIZE_RANGE: RangeInclusive<usize> = 5..=20;

/// One accepted detection
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Category the raw label mapped to
    pub category: PlaybackCategory,
    /// Detector confidence in `[0, 1]`
    pub confidence: f32,
    /// When the frame was processed
    pub timestamp: Instant,
}

impl Observation {
    /// Create an observation
    #[must_use]
    pub const fn new(category: PlaybackCategory, confidence: f32, timestamp: Instant) -> Self {
        Self {
            category,
            confidence,
            timestamp,
        }
    }
}

/// Fixed-capacity, time-ordered buffer of the last N observations
///
/// The candidate emotion is the category occurring most often in the
/// buffer. On a tie, the category whose latest occurrence is most recent
/// wins.
#[derive(Debug, Clone)]
pub struct EmotionHistory {
    entries: VecDeque<Observation>,
    capacity: usize,
    min_observations: usize,
}

impl EmotionHistory {
    /// Create an empty history holding at most `capacity` observations
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            min_observations: 1,
        }
    }

    /// Require at least `min` observations before a candidate is produced
    #[must_use]
    pub fn with_min_observations(mut self, min: usize) -> Self {
        self.min_observations = min.clamp(1, self.capacity);
        self
    }

    /// Append an observation, evicting and returning the oldest when full
    pub fn push(&mut self, observation: Observation) -> Option<Observation> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(observation);
        evicted
    }

    /// Majority category over the buffer, `None` while there is too little evidence
    #[must_use]
    pub fn candidate(&self) -> Option<PlaybackCategory> {
        if self.entries.len() < self.min_observations {
            return None;
        }

        // category -> (count, index of latest occurrence)
        let mut tally: HashMap<&PlaybackCategory, (usize, usize)> = HashMap::new();
        for (idx, obs) in self.entries.iter().enumerate() {
            let entry = tally.entry(&obs.category).or_insert((0, idx));
            entry.0 += 1;
            entry.1 = idx;
        }

        tally
            .into_iter()
            .max_by_key(|(_, score)| *score)
            .map(|(category, _)| category.clone())
    }

    /// Categories of the last `n` observations, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<&PlaybackCategory> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|o| &o.category).collect()
    }

    /// Iterate observations, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    /// Number of observations held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of observations held
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every observation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(labels: &[&str]) -> EmotionHistory {
        let now = Instant::now();
        let mut history = EmotionHistory::new(DEFAULT_HISTORY_SIZE);
        for label in labels {
            history.push(Observation::new(PlaybackCategory::new(label), 0.9, now));
        }
        history
    }

    #[test]
    fn test_empty_history_has_no_candidate() {
        assert_eq!(history_of(&[]).candidate(), None);
    }

    #[test]
    fn test_majority_wins() {
        let history = history_of(&["sad", "happy", "happy", "neutral", "happy", "sad"]);
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("happy")));
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let history = history_of(&["happy", "sad", "happy", "sad"]);
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("sad")));

        let history = history_of(&["sad", "happy", "sad", "happy"]);
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("happy")));
    }

    #[test]
    fn test_three_way_tie() {
        let history = history_of(&["neutral", "happy", "sad", "sad", "happy", "neutral"]);
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("neutral")));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let now = Instant::now();
        let mut history = EmotionHistory::new(5);
        for i in 0..5 {
            let label = if i == 0 { "sad" } else { "happy" };
            assert!(
                history
                    .push(Observation::new(PlaybackCategory::new(label), 0.5, now))
                    .is_none()
            );
        }

        let evicted = history
            .push(Observation::new(PlaybackCategory::new("neutral"), 0.5, now))
            .unwrap();
        assert_eq!(evicted.category.as_str(), "sad");
        assert_eq!(history.len(), 5);
        assert_eq!(
            history.recent(2),
            vec![&PlaybackCategory::new("happy"), &PlaybackCategory::new("neutral")]
        );
    }

    #[test]
    fn test_min_observations() {
        let now = Instant::now();
        let mut history = EmotionHistory::new(10).with_min_observations(3);
        history.push(Observation::new(PlaybackCategory::new("happy"), 0.9, now));
        history.push(Observation::new(PlaybackCategory::new("happy"), 0.9, now));
        assert_eq!(history.candidate(), None);

        history.push(Observation::new(PlaybackCategory::new("happy"), 0.9, now));
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("happy")));
    }

    #[test]
    fn test_min_observations_clamped_to_capacity() {
        let now = Instant::now();
        let mut history = EmotionHistory::new(5).with_min_observations(50);
        for _ in 0..5 {
            history.push(Observation::new(PlaybackCategory::new("sad"), 0.9, now));
        }
        assert_eq!(history.candidate(), Some(PlaybackCategory::new("sad")));
    }
}
