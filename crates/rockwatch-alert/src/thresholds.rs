use rockwatch_common::types::Severity;
use serde::{Deserialize, Serialize};

/// Score cut-offs mapping a continuous risk score onto [`Severity`].
///
/// A score at or above `high` is HIGH, at or above `medium` is MEDIUM,
/// everything else is LOW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SeverityThresholds {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_high() -> f64 {
    0.7
}

fn default_medium() -> f64 {
    0.4
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl SeverityThresholds {
    /// # Examples
    ///
    /// ```
    /// use rockwatch_alert::thresholds::SeverityThresholds;
    /// use rockwatch_common::types::Severity;
    ///
    /// let t = SeverityThresholds::default();
    /// assert_eq!(t.classify(0.85), Severity::High);
    /// assert_eq!(t.classify(0.4), Severity::Medium);
    /// assert_eq!(t.classify(0.30), Severity::Low);
    /// ```
    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.high {
            Severity::High
        } else if score >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn is_high(&self, score: f64) -> bool {
        score >= self.high
    }

    /// Rejects inverted or out-of-range cut-offs.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.high) || !in_range(self.medium) {
            return Err(format!(
                "thresholds must lie in [0, 1] (high={}, medium={})",
                self.high, self.medium
            ));
        }
        if self.medium > self.high {
            return Err(format!(
                "medium threshold {} exceeds high threshold {}",
                self.medium, self.high
            ));
        }
        Ok(())
    }
}
