//! Confidence gate for per-frame detections

use std::ops::RangeInclusive;

/// Default minimum confidence for an observation to count
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Valid range for the confidence threshold
pub const CONFIDENCE_THRESHOLD_RANGE: RangeInclusive<f32> = 0.2..=0.5;

/// Check a detector confidence against a threshold
///
/// `NaN` confidences are rejected.
#[must_use]
pub fn accept(confidence: f32, threshold: f32) -> bool {
    confidence >= threshold
}

/// Drops detections whose confidence is below a floor
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ConfidenceGate {
    /// Create a gate with the given threshold
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Whether a detection with this confidence should enter the history
    #[must_use]
    pub fn accept(&self, confidence: f32) -> bool {
        accept(confidence, self.threshold)
    }

    /// Configured threshold
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let gate = ConfidenceGate::new(0.3);
        assert!(gate.accept(0.3));
        assert!(gate.accept(0.9));
        assert!(!gate.accept(0.299));
    }

    #[test]
    fn test_nan_rejected() {
        assert!(!accept(f32::NAN, 0.3));
    }

    #[test]
    fn test_default_threshold_in_range() {
        assert!(CONFIDENCE_THRESHOLD_RANGE.contains(&ConfidenceGate::default().threshold()));
    }
}
