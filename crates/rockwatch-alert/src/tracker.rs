use crate::thresholds::SeverityThresholds;
use chrono::{DateTime, Duration, Utc};
use rockwatch_common::types::Severity;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identity of one continuous above-threshold episode.
///
/// The score is bucketed to one decimal place, so small fluctuations map to
/// the same key while a material jump produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub facility_id: String,
    pub severity: Severity,
    /// Tenths of the score as `{:.1}` renders it, so `0.85` lands in 8.
    pub score_bucket: i64,
}

impl DedupKey {
    pub fn new(facility_id: &str, severity: Severity, score: f64) -> Self {
        Self {
            facility_id: facility_id.to_string(),
            severity,
            score_bucket: score_bucket(score),
        }
    }
}

/// Rounds on the exact binary value, matching one-decimal formatting
/// rather than `round(score * 10)`.
fn score_bucket(score: f64) -> i64 {
    format!("{score:.1}")
        .parse::<f64>()
        .map(|tenths| (tenths * 10.0).round() as i64)
        .unwrap_or_else(|_| (score * 10.0).round() as i64)
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{:.1}",
            self.facility_id,
            self.severity,
            self.score_bucket as f64 / 10.0
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerDecision {
    /// Dispatch, then call [`AlertTracker::record`] with this key.
    Fire(DedupKey),
    /// Facility alerted less than one cooldown window ago.
    Cooldown { remaining: Duration },
    /// This episode was already alerted.
    Duplicate(DedupKey),
    /// Score under the HIGH threshold; the facility's keys were cleared.
    BelowThreshold,
}

/// Per-facility cooldown and dedup state for the risk monitor.
///
/// Owned by a single monitor; callers serialize access.
pub struct AlertTracker {
    thresholds: SeverityThresholds,
    cooldown: Duration,
    last_alert: HashMap<String, DateTime<Utc>>,
    active_keys: HashSet<DedupKey>,
}

impl AlertTracker {
    pub fn new(thresholds: SeverityThresholds, cooldown: Duration) -> Self {
        Self {
            thresholds,
            cooldown,
            last_alert: HashMap::new(),
            active_keys: HashSet::new(),
        }
    }

    pub fn thresholds(&self) -> SeverityThresholds {
        self.thresholds
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Decides whether an observation of `score` for `facility_id` should
    /// produce a HIGH alert. Observations under the threshold clear the
    /// facility's dedup keys so the next crossing alerts again.
    pub fn evaluate(&mut self, facility_id: &str, score: f64, now: DateTime<Utc>) -> TrackerDecision {
        if !self.thresholds.is_high(score) {
            self.clear_facility(facility_id);
            return TrackerDecision::BelowThreshold;
        }

        if let Some(remaining) = self.cooldown_remaining(facility_id, now) {
            return TrackerDecision::Cooldown { remaining };
        }

        let key = DedupKey::new(facility_id, Severity::High, score);
        if self.active_keys.contains(&key) {
            return TrackerDecision::Duplicate(key);
        }
        TrackerDecision::Fire(key)
    }

    /// Stamps the facility's last-alert time and remembers the key.
    pub fn record(&mut self, key: DedupKey, now: DateTime<Utc>) {
        self.last_alert.insert(key.facility_id.clone(), now);
        self.active_keys.insert(key);
    }

    /// Drops every dedup key belonging to `facility_id`. The cooldown stamp
    /// is kept.
    pub fn clear_facility(&mut self, facility_id: &str) -> usize {
        let before = self.active_keys.len();
        self.active_keys.retain(|k| k.facility_id != facility_id);
        let removed = before - self.active_keys.len();
        if removed > 0 {
            tracing::debug!(facility_id, removed, "Cleared dedup keys (score below threshold)");
        }
        removed
    }

    pub fn in_cooldown(&self, facility_id: &str, now: DateTime<Utc>) -> bool {
        self.cooldown_remaining(facility_id, now).is_some()
    }

    fn cooldown_remaining(&self, facility_id: &str, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_alert.get(facility_id)?;
        let elapsed = now - *last;
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    pub fn last_alert(&self, facility_id: &str) -> Option<DateTime<Utc>> {
        self.last_alert.get(facility_id).copied()
    }

    pub fn active_key_count(&self) -> usize {
        self.active_keys.len()
    }
}
