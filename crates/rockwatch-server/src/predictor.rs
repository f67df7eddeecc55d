//! HTTP clients for the external risk-scoring and explanation services.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rockwatch_alert::{RiskExplainer, RiskPredictor};
use rockwatch_common::types::{
    Facility, RiskAssessment, RiskExplanation, SensorSnapshot, Severity,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct PredictRequest<'a> {
    facility_id: &'a str,
    name: &'a str,
    location: &'a str,
}

#[derive(Deserialize)]
struct PredictResponse {
    risk_score: f64,
    risk_level: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    key_factors: Vec<String>,
    #[serde(default, alias = "sensor_data")]
    sensor_snapshot: SensorSnapshot,
}

impl PredictResponse {
    fn into_assessment(self) -> Result<RiskAssessment> {
        if !(0.0..=1.0).contains(&self.risk_score) {
            anyhow::bail!("risk_score {} outside [0, 1]", self.risk_score);
        }
        let risk_level: Severity = self
            .risk_level
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        Ok(RiskAssessment {
            risk_score: self.risk_score,
            risk_level,
            confidence: self.confidence,
            key_factors: self.key_factors,
            sensor_snapshot: self.sensor_snapshot,
        })
    }
}

/// Calls `POST {base_url}/predict`. The service owns the sensor feed and
/// returns the snapshot it scored.
pub struct HttpRiskPredictor {
    client: Client,
    base_url: String,
}

impl HttpRiskPredictor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RiskPredictor for HttpRiskPredictor {
    async fn assess(&self, facility: &Facility) -> Result<RiskAssessment> {
        let resp = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&PredictRequest {
                facility_id: &facility.id,
                name: &facility.name,
                location: &facility.location,
            })
            .send()
            .await
            .context("Failed to send request to predictor")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Predictor error {status}: {body}");
        }

        let parsed: PredictResponse = resp
            .json()
            .await
            .context("Failed to parse predictor response")?;
        parsed.into_assessment()
    }
}

#[derive(Serialize)]
struct ExplainRequest<'a> {
    sensor_data: &'a SensorSnapshot,
    risk_score: f64,
    risk_level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    historical_data: Option<&'a [SensorSnapshot]>,
}

/// Calls `POST {base_url}/explain`.
pub struct HttpRiskExplainer {
    client: Client,
    base_url: String,
}

impl HttpRiskExplainer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RiskExplainer for HttpRiskExplainer {
    async fn explain(
        &self,
        snapshot: &SensorSnapshot,
        risk_score: f64,
        risk_level: Severity,
        history: Option<&[SensorSnapshot]>,
    ) -> Result<RiskExplanation> {
        let resp = self
            .client
            .post(format!("{}/explain", self.base_url))
            .json(&ExplainRequest {
                sensor_data: snapshot,
                risk_score,
                risk_level,
                historical_data: history,
            })
            .send()
            .await
            .context("Failed to send request to explainer")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Explainer error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse explainer response")
    }
}
