//! Alert decision state for rockfall risk monitoring.
//!
//! This crate owns the pieces of state that decide *whether* an alert
//! exists: severity thresholds, the per-facility cooldown and dedup
//! tracker, and the in-memory [`registry::AlertRegistry`] ledger. It also
//! defines the collaborator traits through which risk scores and
//! explanations are obtained.

pub mod registry;
pub mod thresholds;
pub mod tracker;


use anyhow::Result;
use async_trait::async_trait;
use rockwatch_common::types::{
    Facility, RiskAssessment, RiskExplanation, SensorSnapshot, Severity,
};

/// Computes the current risk for a facility.
///
/// Implementations typically call an external scoring service with the
/// facility's latest sensor snapshot.
#[async_trait]
pub trait RiskPredictor: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be fetched or scored.
    async fn assess(&self, facility: &Facility) -> Result<RiskAssessment>;
}

/// Produces a structured explanation of a risk score. Optional collaborator.
#[async_trait]
pub trait RiskExplainer: Send + Sync {
    async fn explain(
        &self,
        snapshot: &SensorSnapshot,
        risk_score: f64,
        risk_level: Severity,
        history: Option<&[SensorSnapshot]>,
    ) -> Result<RiskExplanation>;
}

/// Source of monitored facilities.
pub trait FacilityDirectory: Send + Sync {
    fn list(&self) -> Vec<Facility>;

    fn get(&self, id: &str) -> Option<Facility>;
}
