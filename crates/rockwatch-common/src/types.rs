use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Named numeric sensor readings for one facility (e.g. `vibration → 8.2`).
pub type SensorSnapshot = BTreeMap<String, f64>;

/// Coarse risk tier, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use rockwatch_common::types::Severity;
///
/// let sev: Severity = "high".parse().unwrap();
/// assert_eq!(sev, Severity::High);
/// assert_eq!(sev.to_string(), "HIGH");
/// assert!(Severity::High > Severity::Low);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Stable uppercase code, also used as a translation key suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle state of an [`Alert`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "ACTIVE"),
            AlertStatus::Acknowledged => write!(f, "ACKNOWLEDGED"),
            AlertStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// A delivery mechanism. The declaration order is the dispatch priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Email,
    Sms,
    Messaging,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => write!(f, "EMAIL"),
            Channel::Sms => write!(f, "SMS"),
            Channel::Messaging => write!(f, "MESSAGING"),
        }
    }
}

/// A monitored site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Facility {
    pub id: String,
    pub name: String,
    /// Free-text location, e.g. `"Dhanbad, Jharkhand"`.
    pub location: String,
    /// Optional explicit region; falls back to `location` for language lookup.
    #[serde(default)]
    pub region: Option<String>,
}

impl Facility {
    /// The text used to resolve the facility's region code.
    pub fn region_hint(&self) -> &str {
        self.region.as_deref().unwrap_or(&self.location)
    }
}

/// Output of the external risk predictor for one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RiskAssessment {
    /// Score in `[0, 1]`.
    pub risk_score: f64,
    pub risk_level: Severity,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub key_factors: Vec<String>,
    /// The snapshot the score was computed from; feeds the explainer.
    #[serde(default)]
    pub sensor_snapshot: SensorSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ContributingFactor {
    /// Sensor type, e.g. `"vibration"`.
    pub factor: String,
    pub current_value: f64,
    pub risk_level: String,
    pub contribution_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ThresholdViolation {
    pub sensor_type: String,
    pub current_value: f64,
    pub threshold_value: f64,
    pub percentage_over: f64,
}

/// Structured explanation produced by the optional explainer collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RiskExplanation {
    #[serde(default)]
    pub primary_explanation: String,
    #[serde(default)]
    pub contributing_factors: Vec<ContributingFactor>,
    #[serde(default)]
    pub threshold_violations: Vec<ThresholdViolation>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence_level: f64,
}

impl RiskExplanation {
    /// The single factor with the highest contribution score.
    pub fn top_factor(&self) -> Option<&ContributingFactor> {
        self.contributing_factors
            .iter()
            .max_by(|a, b| a.contribution_score.total_cmp(&b.contribution_score))
    }

    /// Up to `n` factors ordered by descending contribution score.
    ///
    /// # Examples
    ///
    /// ```
    /// use rockwatch_common::types::{ContributingFactor, RiskExplanation};
    ///
    /// let factor = |name: &str, score: f64| ContributingFactor {
    ///     factor: name.to_string(),
    ///     current_value: 1.0,
    ///     risk_level: "HIGH".to_string(),
    ///     contribution_score: score,
    /// };
    /// let explanation = RiskExplanation {
    ///     contributing_factors: vec![factor("humidity", 0.1), factor("vibration", 0.9)],
    ///     ..Default::default()
    /// };
    /// let top: Vec<_> = explanation.top_factors(1).iter().map(|f| f.factor.as_str()).collect();
    /// assert_eq!(top, vec!["vibration"]);
    /// ```
    pub fn top_factors(&self, n: usize) -> Vec<&ContributingFactor> {
        let mut factors: Vec<&ContributingFactor> = self.contributing_factors.iter().collect();
        factors.sort_by(|a, b| b.contribution_score.total_cmp(&a.contribution_score));
        factors.truncate(n);
        factors
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("alert {0} is already resolved")]
    AlreadyResolved(String),
}

/// One notification episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Alert {
    pub id: String,
    pub facility_id: String,
    pub facility_name: String,
    pub location: String,
    pub severity: Severity,
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub channels_attempted: BTreeSet<Channel>,
    pub channels_succeeded: BTreeSet<Channel>,
    /// Ordered as supplied by the explainer.
    #[serde(default)]
    pub contributing_factors: Vec<ContributingFactor>,
    /// Predictor key factors, used when no explanation is available.
    #[serde(default)]
    pub key_factors: Vec<String>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
}

impl Alert {
    /// A fresh `ACTIVE` alert with no delivery history.
    pub fn new(
        id: String,
        facility: &Facility,
        severity: Severity,
        risk_score: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            facility_id: facility.id.clone(),
            facility_name: facility.name.clone(),
            location: facility.location.clone(),
            severity,
            risk_score,
            created_at,
            status: AlertStatus::Active,
            channels_attempted: BTreeSet::new(),
            channels_succeeded: BTreeSet::new(),
            contributing_factors: Vec::new(),
            key_factors: Vec::new(),
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    /// `ACTIVE → ACKNOWLEDGED`. Re-acknowledging refreshes the metadata;
    /// a resolved alert is never reopened.
    pub fn acknowledge(&mut self, by: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status == AlertStatus::Resolved {
            return Err(TransitionError::AlreadyResolved(self.id.clone()));
        }
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = Some(by.to_string());
        self.acknowledged_at = Some(at);
        Ok(())
    }

    /// `ACTIVE|ACKNOWLEDGED → RESOLVED`. On an already resolved alert only the
    /// resolution metadata is rewritten. Acknowledgement fields are untouched.
    pub fn resolve(&mut self, by: &str, notes: &str, at: DateTime<Utc>) {
        self.status = AlertStatus::Resolved;
        self.resolved_by = Some(by.to_string());
        self.resolved_at = Some(at);
        self.resolution_notes = Some(notes.to_string());
    }

    pub fn is_resolved(&self) -> bool {
        self.status == AlertStatus::Resolved
    }
}
