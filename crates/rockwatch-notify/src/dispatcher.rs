use crate::channels::email::EmailChannel;
use crate::channels::messaging::MessagingChannel;
use crate::channels::sms::SmsChannel;
use crate::formatter::MessageFormatter;
use crate::recipients::{RecipientDirectory, RecipientGroupName, ResolvedRecipients};
use crate::ChannelReport;
use chrono::{DateTime, Utc};
use rockwatch_alert::registry::AlertRegistry;
use rockwatch_alert::RiskExplainer;
use rockwatch_common::types::{
    Alert, Channel, Facility, RiskAssessment, RiskExplanation, Severity,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Progress of a single send.
///
/// `Idle → EmailAttempted → (HIGH ? SmsAttempted : Done) →
/// (SMS reached nobody ? MessagingAttempted : Done) → Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum DispatchStage {
    Idle,
    EmailAttempted,
    SmsAttempted,
    MessagingAttempted,
    Done,
}

/// Aggregated outcome of one send. Returned for every send, including ones
/// where every channel failed.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct DispatchResult {
    /// At least one channel reached at least one recipient.
    pub success: bool,
    pub alert_id: String,
    /// Channels that succeeded, in priority order.
    pub channels_used: Vec<Channel>,
    /// Succeeded channels / attempted channels. Skipped channels are not attempts.
    pub success_rate: f64,
    /// Number of recipient groups notified.
    pub recipient_count: usize,
    /// Distinct endpoints targeted by the channels this severity uses.
    pub endpoint_count: usize,
    pub recipient_groups: Vec<RecipientGroupName>,
    /// Stages visited, ending in `Done`.
    pub stages: Vec<DispatchStage>,
    pub channels: Vec<ChannelReport>,
}

/// Routes an alert to its recipient groups across email, SMS and the
/// messaging fallback, then records it in the registry.
pub struct Dispatcher {
    recipients: RecipientDirectory,
    email: EmailChannel,
    sms: SmsChannel,
    messaging: MessagingChannel,
    explainer: Option<Arc<dyn RiskExplainer>>,
    explainer_timeout: Duration,
    registry: Arc<AlertRegistry>,
}

impl Dispatcher {
    pub fn new(
        recipients: RecipientDirectory,
        email: EmailChannel,
        sms: SmsChannel,
        messaging: MessagingChannel,
        registry: Arc<AlertRegistry>,
    ) -> Self {
        Self {
            recipients,
            email,
            sms,
            messaging,
            explainer: None,
            explainer_timeout: Duration::from_secs(10),
            registry,
        }
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn RiskExplainer>, timeout: Duration) -> Self {
        self.explainer = Some(explainer);
        self.explainer_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    pub fn recipients(&self) -> &RecipientDirectory {
        &self.recipients
    }

    pub async fn send_alert(
        &self,
        facility: &Facility,
        severity: Severity,
        risk: &RiskAssessment,
    ) -> DispatchResult {
        self.send_alert_at(facility, severity, risk, Utc::now()).await
    }

    /// Sends with an explicit timestamp for the alert id and schedule times.
    pub async fn send_alert_at(
        &self,
        facility: &Facility,
        severity: Severity,
        risk: &RiskAssessment,
        now: DateTime<Utc>,
    ) -> DispatchResult {
        let alert_id = rockwatch_common::id::alert_id(&facility.id, now);
        tracing::info!(
            alert_id = %alert_id,
            facility_id = %facility.id,
            severity = %severity,
            risk_score = risk.risk_score,
            "Dispatching alert"
        );

        let explanation = self.explain(facility, severity, risk).await;
        let resolved = self.recipients.resolve(severity);
        let formatter = MessageFormatter::for_region(facility.region_hint());

        let mut alert = Alert::new(alert_id.clone(), facility, severity, risk.risk_score, now);
        alert.key_factors = risk.key_factors.clone();
        if let Some(exp) = &explanation {
            alert.contributing_factors = exp.contributing_factors.clone();
        }

        let mut stages = vec![DispatchStage::Idle];
        let mut reports: Vec<ChannelReport> = Vec::with_capacity(3);
        let mut stage = DispatchStage::Idle;

        while stage != DispatchStage::Done {
            stage = match stage {
                DispatchStage::Idle => {
                    let report = self
                        .email
                        .deliver(
                            &resolved.emails,
                            &formatter.email_subject(&alert),
                            &formatter.email_body(&alert, explanation.as_ref()),
                        )
                        .await;
                    reports.push(report);
                    DispatchStage::EmailAttempted
                }
                DispatchStage::EmailAttempted if severity == Severity::High => {
                    let variants = formatter.sms_variants(&alert, explanation.as_ref());
                    reports.push(self.sms.deliver(&resolved.phones, &variants).await);
                    DispatchStage::SmsAttempted
                }
                DispatchStage::SmsAttempted if sms_reached_nobody(&reports) => {
                    tracing::warn!(
                        alert_id = %alert_id,
                        "SMS reached no recipients, falling back to messaging"
                    );
                    let body = formatter.messaging_body(&alert, explanation.as_ref());
                    reports.push(self.messaging.deliver(&resolved.phones, &body, now).await);
                    DispatchStage::MessagingAttempted
                }
                _ => DispatchStage::Done,
            };
            stages.push(stage);
        }

        for report in &reports {
            if report.attempted() {
                alert.channels_attempted.insert(report.channel);
            }
            if report.success {
                alert.channels_succeeded.insert(report.channel);
            }
        }

        let attempted = alert.channels_attempted.len();
        let succeeded = alert.channels_succeeded.len();
        let success_rate = if attempted == 0 {
            0.0
        } else {
            succeeded as f64 / attempted as f64
        };
        let channels_used: Vec<Channel> = alert.channels_succeeded.iter().copied().collect();
        let endpoint_count = targeted_endpoints(&resolved, severity);

        if succeeded == 0 {
            tracing::error!(alert_id = %alert_id, facility_id = %facility.id, "Alert reached no channel");
        } else {
            tracing::info!(
                alert_id = %alert_id,
                channels = ?channels_used,
                success_rate,
                "Alert dispatched"
            );
        }

        self.registry.append(alert);
        self.registry.purge_expired_at(now);

        DispatchResult {
            success: succeeded > 0,
            alert_id,
            channels_used,
            success_rate,
            recipient_count: resolved.groups.len(),
            endpoint_count,
            recipient_groups: resolved.groups,
            stages,
            channels: reports,
        }
    }

    /// Explanations are optional; a failed or slow explainer degrades the
    /// message, never the send.
    async fn explain(
        &self,
        facility: &Facility,
        severity: Severity,
        risk: &RiskAssessment,
    ) -> Option<RiskExplanation> {
        let explainer = self.explainer.as_ref()?;
        if risk.sensor_snapshot.is_empty() {
            return None;
        }
        let fut = explainer.explain(&risk.sensor_snapshot, risk.risk_score, severity, None);
        match tokio::time::timeout(self.explainer_timeout, fut).await {
            Ok(Ok(exp)) => Some(exp),
            Ok(Err(e)) => {
                tracing::warn!(facility_id = %facility.id, error = %e, "Risk explanation failed");
                None
            }
            Err(_) => {
                tracing::warn!(facility_id = %facility.id, "Risk explanation timed out");
                None
            }
        }
    }
}

fn sms_reached_nobody(reports: &[ChannelReport]) -> bool {
    reports
        .iter()
        .find(|r| r.channel == Channel::Sms)
        .is_some_and(|r| r.sent == 0)
}

fn targeted_endpoints(resolved: &ResolvedRecipients, severity: Severity) -> usize {
    if severity == Severity::High {
        resolved.endpoint_count()
    } else {
        resolved.emails.len()
    }
}
