use crate::channels::email::{EmailChannel, EmailGateway};
use crate::channels::messaging::{MessagingChannel, MessagingGateway, ScheduledAck};
use crate::channels::sms::{DeliveryStatus, SmsChannel, SmsErrorCategory, SmsGateway};
use crate::dispatcher::{DispatchStage, Dispatcher};
use crate::error::{FailureKind, NotifyError, Result};
use crate::formatter::{MessageFormatter, SmsVariant};
use crate::recipients::{groups_for, RecipientDirectory, RecipientGroup, RecipientGroupName};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rockwatch_alert::registry::AlertRegistry;
use rockwatch_alert::RiskExplainer;
use rockwatch_common::types::{
    Alert, Channel, ContributingFactor, Facility, RiskAssessment, RiskExplanation,
    SensorSnapshot, Severity, ThresholdViolation,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---- fakes ----

#[derive(Default)]
struct FakeEmail {
    fail_with: Option<String>,
    calls: Mutex<Vec<(Vec<String>, String, String)>>,
}

#[async_trait]
impl EmailGateway for FakeEmail {
    async fn send(&self, recipients: &[String], subject: &str, html_body: &str) -> Result<()> {
        self.calls.lock().unwrap().push((
            recipients.to_vec(),
            subject.to_string(),
            html_body.to_string(),
        ));
        match &self.fail_with {
            Some(msg) => Err(NotifyError::Smtp(msg.clone())),
            None => Ok(()),
        }
    }
}

enum Reply {
    Status(DeliveryStatus),
    Error(String),
}

/// Replies per phone are consumed in order; phones without a script accept.
#[derive(Default)]
struct ScriptedSms {
    script: Mutex<HashMap<String, Vec<Reply>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSms {
    fn script(self, phone: &str, replies: Vec<Reply>) -> Self {
        self.script.lock().unwrap().insert(phone.to_string(), replies);
        self
    }

    fn calls_for(&self, phone: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == phone)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SmsGateway for ScriptedSms {
    async fn send(&self, body: &str, to: &str) -> Result<DeliveryStatus> {
        self.calls
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        let next = {
            let mut script = self.script.lock().unwrap();
            script
                .get_mut(to)
                .and_then(|r| (!r.is_empty()).then(|| r.remove(0)))
        };
        match next {
            Some(Reply::Status(s)) => Ok(s),
            Some(Reply::Error(e)) => Err(NotifyError::Provider(e)),
            None => Ok(DeliveryStatus::Queued),
        }
    }
}

#[derive(Default)]
struct FakeMessaging {
    fail: bool,
    calls: Mutex<Vec<(String, String, DateTime<Utc>)>>,
}

#[async_trait]
impl MessagingGateway for FakeMessaging {
    async fn schedule(&self, phone: &str, message: &str, send_at: DateTime<Utc>) -> Result<ScheduledAck> {
        self.calls
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string(), send_at));
        if self.fail {
            return Err(NotifyError::Provider("browser session expired".into()));
        }
        Ok(ScheduledAck {
            phone: phone.to_string(),
            scheduled_for: send_at,
            reference: None,
        })
    }
}

struct FakeExplainer {
    result: std::result::Result<RiskExplanation, String>,
}

#[async_trait]
impl RiskExplainer for FakeExplainer {
    async fn explain(
        &self,
        _snapshot: &SensorSnapshot,
        _risk_score: f64,
        _risk_level: Severity,
        _history: Option<&[SensorSnapshot]>,
    ) -> anyhow::Result<RiskExplanation> {
        self.result.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

/// Gateway that never answers within any reasonable timeout.
struct HangingSms;

#[async_trait]
impl SmsGateway for HangingSms {
    async fn send(&self, _body: &str, _to: &str) -> Result<DeliveryStatus> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(DeliveryStatus::Delivered)
    }
}

// ---- fixtures ----

const TIMEOUT: Duration = Duration::from_secs(15);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
}

fn jharia() -> Facility {
    Facility {
        id: "mine_001".into(),
        name: "Jharia Coalfield".into(),
        location: "Dhanbad, Jharkhand".into(),
        region: None,
    }
}

fn group(emails: &[&str], phones: &[&str]) -> RecipientGroup {
    RecipientGroup {
        emails: emails.iter().map(|s| s.to_string()).collect(),
        phones: phones.iter().map(|s| s.to_string()).collect(),
    }
}

fn directory() -> RecipientDirectory {
    RecipientDirectory {
        emergency: group(&["emergency@mine.example"], &["+919000000001", "+919000000002"]),
        managers: group(&["manager@mine.example"], &[]),
        operators: group(&["ops@mine.example", "manager@mine.example"], &[]),
    }
}

fn assessment(score: f64, level: Severity) -> RiskAssessment {
    RiskAssessment {
        risk_score: score,
        risk_level: level,
        confidence: 0.9,
        key_factors: vec!["High vibration levels".into(), "Rainfall".into()],
        sensor_snapshot: [("vibration".to_string(), 8.2), ("humidity".to_string(), 81.0)]
            .into_iter()
            .collect(),
    }
}

fn factor(name: &str, value: f64, score: f64) -> ContributingFactor {
    ContributingFactor {
        factor: name.into(),
        current_value: value,
        risk_level: "HIGH".into(),
        contribution_score: score,
    }
}

fn explanation() -> RiskExplanation {
    RiskExplanation {
        primary_explanation: "Vibration well above the safe band for this bench.".into(),
        contributing_factors: vec![
            factor("humidity", 81.0, 3.0),
            factor("vibration", 8.2, 9.5),
            factor("acoustic", 92.0, 4.0),
            factor("pressure", 1002.0, 1.0),
        ],
        threshold_violations: (0..5)
            .map(|i| ThresholdViolation {
                sensor_type: format!("sensor_{i}"),
                current_value: 10.0,
                threshold_value: 5.0,
                percentage_over: 100.0,
            })
            .collect(),
        recommendations: (1..=7).map(|i| format!("Recommendation {i}")).collect(),
        confidence_level: 0.8,
    }
}

struct Harness {
    email: Arc<FakeEmail>,
    sms: Arc<ScriptedSms>,
    messaging: Arc<FakeMessaging>,
    registry: Arc<AlertRegistry>,
    dispatcher: Dispatcher,
}

fn harness_with(email: Option<FakeEmail>, sms: Option<ScriptedSms>, messaging: Option<FakeMessaging>) -> Harness {
    let registry = Arc::new(AlertRegistry::default());
    let email_gw = Arc::new(email.unwrap_or_default());
    let sms_gw = Arc::new(sms.unwrap_or_default());
    let msg_gw = Arc::new(messaging.unwrap_or_default());
    harness_from(Some(email_gw), Some(sms_gw), Some(msg_gw), registry)
}

fn harness_from(
    email: Option<Arc<FakeEmail>>,
    sms: Option<Arc<ScriptedSms>>,
    messaging: Option<Arc<FakeMessaging>>,
    registry: Arc<AlertRegistry>,
) -> Harness {
    let dispatcher = Dispatcher::new(
        directory(),
        EmailChannel::new(email.clone().map(|g| g as Arc<dyn EmailGateway>), TIMEOUT),
        SmsChannel::new(sms.clone().map(|g| g as Arc<dyn SmsGateway>), TIMEOUT),
        MessagingChannel::new(
            messaging.clone().map(|g| g as Arc<dyn MessagingGateway>),
            TIMEOUT,
            ChronoDuration::minutes(2),
            "+91",
        ),
        registry.clone(),
    );
    Harness {
        email: email.unwrap_or_default(),
        sms: sms.unwrap_or_default(),
        messaging: messaging.unwrap_or_default(),
        registry,
        dispatcher,
    }
}

// ---- recipients ----

#[test]
fn severity_table_selects_exact_groups() {
    use RecipientGroupName::*;
    assert_eq!(groups_for(Severity::High), &[Emergency, Managers, Operators]);
    assert_eq!(groups_for(Severity::Medium), &[Managers, Operators]);
    assert_eq!(groups_for(Severity::Low), &[Operators]);
}

#[test]
fn resolve_unions_groups_without_duplicates() {
    let resolved = directory().resolve(Severity::High);
    assert_eq!(
        resolved.emails,
        vec!["emergency@mine.example", "manager@mine.example", "ops@mine.example"]
    );
    assert_eq!(resolved.phones.len(), 2);

    let low = directory().resolve(Severity::Low);
    assert_eq!(low.emails, vec!["ops@mine.example", "manager@mine.example"]);
    assert!(low.phones.is_empty());
}

#[test]
fn resolve_skips_blank_entries() {
    let dir = RecipientDirectory {
        operators: group(&["", "  ", "ops@mine.example"], &[""]),
        ..Default::default()
    };
    let resolved = dir.resolve(Severity::Low);
    assert_eq!(resolved.emails, vec!["ops@mine.example"]);
    assert!(resolved.phones.is_empty());
}

// ---- formatter ----

fn alert_at(severity: Severity, score: f64) -> Alert {
    let mut alert = Alert::new("alert_x".into(), &jharia(), severity, score, t0());
    alert.key_factors = vec!["High vibration levels".into()];
    alert
}

#[test]
fn sms_variants_are_ordered_full_short_minimal() {
    let fmt = MessageFormatter::for_region("Dhanbad, Jharkhand");
    let variants = fmt.sms_variants(&alert_at(Severity::High, 0.85), None);
    let names: Vec<_> = variants.iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["full", "short", "minimal"]);
    assert_eq!(
        variants[1].body,
        "MINING ALERT: HIGH risk at Jharia Coalfield. Score: 0.85. Time: 14:07. Immediate action required."
    );
    assert_eq!(variants[2].body, "ALERT: HIGH risk - Jharia Coalfield - 0.85");
}

#[test]
fn full_sms_keeps_language_order_on_every_line() {
    let fmt = MessageFormatter::for_region("Talcher, Odisha");
    let body = fmt.sms_variants(&alert_at(Severity::High, 0.85), None)[0].body.clone();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "🚨 ପଥର ଖସିବା ଚେତାବନୀ | शिलाखंड अलर्ट | ROCKFALL ALERT");
    assert!(lines.contains(&"ଖଣି | खान | Mine: Jharia Coalfield"));
    assert!(lines.contains(&"ବିପଦ | जोखिम | Risk: ଅଧିକ ବିପଦ | उच्च जोखिम | HIGH RISK"));
    assert!(lines.contains(&"ସମୟ | समय | Time: 14:07"));
    assert!(lines.contains(&"ସ୍କୋର | स्कोर | Score: 0.85"));
    assert!(body.ends_with("- AI ପଥର ଖସିବା ସିଷ୍ଟମ | AI शिलाखंड सिस्टम | AI Rockfall System"));
}

#[test]
fn unmatched_region_renders_hindi_then_english() {
    let fmt = MessageFormatter::for_region("Unknown Plateau");
    let body = fmt.sms_variants(&alert_at(Severity::Low, 0.2), None)[0].body.clone();
    assert!(body.starts_with("🚨 शिलाखंड अलर्ट | ROCKFALL ALERT"));
    assert!(body.contains("सावधानी बरतें। निगरानी जारी रखें। | Continue with caution. Monitor closely."));
}

#[test]
fn full_sms_embeds_only_highest_contribution_factor() {
    let fmt = MessageFormatter::for_region("Jharkhand");
    let exp = explanation();
    let body = fmt.sms_variants(&alert_at(Severity::High, 0.85), Some(&exp))[0].body.clone();
    assert!(body.contains("📊 कंपन: 8.2Hz | Vibration: 8.2Hz"), "{body}");
    assert!(!body.contains("Humidity"));
    assert!(!body.contains("Sound"));
}

#[test]
fn factor_line_skips_languages_without_label() {
    let fmt = MessageFormatter::for_region("Bangalore, Karnataka");
    let exp = explanation();
    let body = fmt.sms_variants(&alert_at(Severity::High, 0.85), Some(&exp))[0].body.clone();
    assert!(body.contains("📊 कंपन: 8.2Hz | Vibration: 8.2Hz"), "{body}");
}

#[test]
fn email_embeds_bounded_explanation_sections() {
    let fmt = MessageFormatter::for_region("Jharkhand");
    let exp = explanation();
    let html = fmt.email_body(&alert_at(Severity::High, 0.85), Some(&exp));

    assert!(html.contains("#dc3545"));
    assert!(html.contains("Vibration well above the safe band"));
    // top three factors by contribution
    assert!(html.contains("<strong>Vibration:</strong>"));
    assert!(html.contains("<strong>Acoustic:</strong>"));
    assert!(html.contains("<strong>Humidity:</strong>"));
    assert!(!html.contains("<strong>Pressure:</strong>"));
    assert_eq!(html.matches("% over limit").count(), 3);
    assert!(html.contains("Recommendation 5"));
    assert!(!html.contains("Recommendation 6"));
    // key factors are only a fallback
    assert!(!html.contains("High vibration levels"));
    assert!(html.contains("AI जोखिम विश्लेषण | AI Risk Analysis"));
}

#[test]
fn email_falls_back_to_key_factors_without_explanation() {
    let fmt = MessageFormatter::for_region("Jharkhand");
    let html = fmt.email_body(&alert_at(Severity::Medium, 0.5), None);
    assert!(html.contains("मुख्य जोखिम कारक | Key Risk Factors"));
    assert!(html.contains("<li>High vibration levels</li>"));
    assert!(html.contains("#ffc107"));
    assert!(html.contains("Prepare evacuation procedures"));
}

#[test]
fn email_subject_is_localized() {
    let fmt = MessageFormatter::for_region("Jharkhand");
    assert_eq!(
        fmt.email_subject(&alert_at(Severity::High, 0.9)),
        "🚨 शिलाखंड अलर्ट | ROCKFALL ALERT - उच्च जोखिम | HIGH RISK - Jharia Coalfield"
    );
}

#[test]
fn messaging_body_truncates_analysis_and_limits_lists() {
    let fmt = MessageFormatter::for_region("Jharkhand");
    let mut exp = explanation();
    exp.primary_explanation = "x".repeat(500);
    let body = fmt.messaging_body(&alert_at(Severity::High, 0.85), Some(&exp));

    assert!(body.starts_with("🚨🔴 *MINING SAFETY ALERT* 🚨🔴"));
    assert!(body.contains(&format!("{}...", "x".repeat(200))));
    assert!(!body.contains(&"x".repeat(201)));
    assert!(body.contains("• Vibration: 8.2 (HIGH level)"));
    assert!(body.contains("3. Recommendation 3"));
    assert!(!body.contains("4. Recommendation 4"));
    assert!(body.contains("🆘 *Emergency:* Call 108"));
}

// ---- SMS channel ----

fn variants() -> Vec<SmsVariant> {
    ["full", "short", "minimal"]
        .into_iter()
        .map(|name| SmsVariant {
            name,
            body: format!("{name} body"),
        })
        .collect()
}

#[tokio::test]
async fn sms_stops_at_first_accepted_variant() {
    let gw = Arc::new(ScriptedSms::default().script(
        "+911",
        vec![Reply::Error("Error 30044: message filtered".into())],
    ));
    let channel = SmsChannel::new(Some(gw.clone()), TIMEOUT);
    let report = channel.deliver(&["+911".to_string()], &variants()).await;

    assert!(report.success);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(gw.calls_for("+911"), vec!["full body", "short body"]);
    assert_eq!(report.recipients[0].detail.as_deref(), Some("short"));
    // the rejected variant is still reported
    assert_eq!(report.errors.len(), 1);
    assert!(report.diagnostics.unwrap().starts_with("Carrier blocking"));
    assert!(report.suggestions.is_empty());
}

#[tokio::test]
async fn sms_non_accepted_status_counts_as_variant_failure() {
    let gw = Arc::new(ScriptedSms::default().script(
        "+911",
        vec![
            Reply::Status(DeliveryStatus::Failed),
            Reply::Status(DeliveryStatus::Undelivered),
            Reply::Status(DeliveryStatus::Delivered),
        ],
    ));
    let channel = SmsChannel::new(Some(gw.clone()), TIMEOUT);
    let report = channel.deliver(&["+911".to_string()], &variants()).await;
    assert!(report.success);
    assert_eq!(report.recipients[0].detail.as_deref(), Some("minimal"));
}

#[tokio::test]
async fn sms_total_failure_carries_diagnostics_and_suggestions() {
    let fail = || {
        vec![
            Reply::Error("Error 21608: unverified number on trial account".into()),
            Reply::Error("Error 21211: invalid 'To' phone number".into()),
            Reply::Error("Error 21608: unverified number on trial account".into()),
        ]
    };
    let gw = Arc::new(ScriptedSms::default().script("+911", fail()).script("+912", fail()));
    let channel = SmsChannel::new(Some(gw.clone()), TIMEOUT);
    let report = channel
        .deliver(&["+911".to_string(), "+912".to_string()], &variants())
        .await;

    assert!(!report.success);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failure, Some(FailureKind::TotalChannelFailure));
    assert_eq!(gw.call_count(), 6);
    assert_eq!(report.errors.len(), 6);
    assert!(report.diagnostics.unwrap().starts_with("Phone number format"));
    assert!(!report.suggestions.is_empty());
}

#[test]
fn sms_error_summary_precedence() {
    use SmsErrorCategory::*;
    assert_eq!(SmsErrorCategory::classify("Error 30044: filtered"), CarrierBlock);
    assert_eq!(SmsErrorCategory::classify("The number is INVALID"), InvalidNumber);
    assert_eq!(SmsErrorCategory::classify("Trial accounts cannot send"), TrialRestriction);
    assert_eq!(SmsErrorCategory::classify("connection reset"), Other);

    let summary = |c: &[SmsErrorCategory]| SmsErrorCategory::summarize(c).unwrap();
    assert!(summary(&[TrialRestriction, InvalidNumber, CarrierBlock]).starts_with("Carrier"));
    assert!(summary(&[TrialRestriction, InvalidNumber]).starts_with("Phone number"));
    assert!(summary(&[Other, TrialRestriction]).starts_with("Trial"));
    assert!(summary(&[Other]).starts_with("Mixed"));
    assert!(SmsErrorCategory::summarize(&[]).is_none());
}

#[tokio::test(start_paused = true)]
async fn sms_gateway_call_is_bounded_by_timeout() {
    let channel = SmsChannel::new(Some(Arc::new(HangingSms)), Duration::from_secs(5));
    let report = channel.deliver(&["+911".to_string()], &variants()).await;
    assert!(!report.success);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors[0].contains("timed out"));
}

#[tokio::test]
async fn unconfigured_channels_are_skipped_not_attempted() {
    let email = EmailChannel::new(None, TIMEOUT);
    let report = email.deliver(&["a@b.example".into()], "s", "b").await;
    assert_eq!(report.failure, Some(FailureKind::ConfigurationMissing));
    assert!(!report.attempted());

    let sms = SmsChannel::new(Some(Arc::new(ScriptedSms::default())), TIMEOUT);
    let report = sms.deliver(&[], &variants()).await;
    assert_eq!(report.failure, Some(FailureKind::NoRecipients));
    assert!(!report.attempted());
}

#[tokio::test]
async fn email_provider_failure_is_single_attempt() {
    let gw = Arc::new(FakeEmail {
        fail_with: Some("451 temporary failure".into()),
        ..Default::default()
    });
    let channel = EmailChannel::new(Some(gw.clone()), TIMEOUT);
    let report = channel
        .deliver(&["a@b.example".into(), "c@d.example".into()], "s", "b")
        .await;
    assert_eq!(gw.calls.lock().unwrap().len(), 1);
    assert_eq!(report.failure, Some(FailureKind::ProviderError));
    assert_eq!(report.failed, 2);
    assert!(report.errors[0].contains("451 temporary failure"));
}

#[tokio::test]
async fn messaging_normalizes_phones_and_schedules_ahead() {
    let gw = Arc::new(FakeMessaging::default());
    let channel = MessagingChannel::new(Some(gw.clone()), TIMEOUT, ChronoDuration::minutes(2), "+91");
    let report = channel
        .deliver(&["98765 43210".to_string()], "hello", t0())
        .await;
    assert!(report.success);
    let calls = gw.calls.lock().unwrap();
    assert_eq!(calls[0].0, "+919876543210");
    assert_eq!(calls[0].2, t0() + ChronoDuration::minutes(2));
}

// ---- dispatcher ----

#[tokio::test]
async fn high_alert_partial_sms_delivery_scenario() {
    let sms = ScriptedSms::default().script(
        "+919000000001",
        vec![
            Reply::Error("Error 30044: filtered".into()),
            Reply::Error("Error 30044: filtered".into()),
            Reply::Error("Error 30044: filtered".into()),
        ],
    );
    let h = harness_with(None, Some(sms), None);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.85, Severity::High), t0())
        .await;

    assert!(result.success);
    assert_eq!(result.channels_used, vec![Channel::Email, Channel::Sms]);
    assert_eq!(result.success_rate, 1.0);
    let sms_report = result.channels.iter().find(|r| r.channel == Channel::Sms).unwrap();
    assert_eq!(sms_report.sent, 1);
    assert_eq!(sms_report.failed, 1);
    assert_eq!(sms_report.failure, Some(FailureKind::PartialDelivery));
    assert!(h.messaging.calls.lock().unwrap().is_empty());
    assert_eq!(
        result.stages,
        vec![
            DispatchStage::Idle,
            DispatchStage::EmailAttempted,
            DispatchStage::SmsAttempted,
            DispatchStage::Done
        ]
    );
    assert_eq!(result.recipient_groups.len(), 3);
    assert_eq!(result.recipient_count, 3);
    assert_eq!(result.endpoint_count, 5);
}

#[tokio::test]
async fn low_alert_emails_operators_only_and_skips_sms() {
    let h = harness_with(None, None, None);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::Low, &assessment(0.30, Severity::Low), t0())
        .await;

    assert!(result.success);
    assert_eq!(result.channels_used, vec![Channel::Email]);
    assert_eq!(result.recipient_groups, vec![RecipientGroupName::Operators]);
    let calls = h.email.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, vec!["ops@mine.example", "manager@mine.example"]);
    assert_eq!(h.sms.call_count(), 0);
    assert_eq!(
        result.stages,
        vec![DispatchStage::Idle, DispatchStage::EmailAttempted, DispatchStage::Done]
    );
}

#[tokio::test]
async fn sms_only_send_when_email_unconfigured() {
    let registry = Arc::new(AlertRegistry::default());
    let sms = Arc::new(ScriptedSms::default());
    let h = harness_from(None, Some(sms), Some(Arc::new(FakeMessaging::default())), registry);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.9, Severity::High), t0())
        .await;

    assert!(result.success);
    assert_eq!(result.channels_used, vec![Channel::Sms]);
    assert_eq!(result.success_rate, 1.0);
    let email = result.channels.iter().find(|r| r.channel == Channel::Email).unwrap();
    assert_eq!(email.failure, Some(FailureKind::ConfigurationMissing));

    let alert = h.registry.get(&result.alert_id).unwrap();
    assert!(!alert.channels_attempted.contains(&Channel::Email));
    assert!(alert.channels_succeeded.contains(&Channel::Sms));
}

#[tokio::test]
async fn messaging_fallback_fires_when_sms_reaches_nobody() {
    let all_fail = || (0..3).map(|_| Reply::Error("Error 30044: filtered".into())).collect();
    let sms = ScriptedSms::default()
        .script("+919000000001", all_fail())
        .script("+919000000002", all_fail());
    let h = harness_with(None, Some(sms), None);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.85, Severity::High), t0())
        .await;

    assert!(result.success);
    assert_eq!(result.channels_used, vec![Channel::Email, Channel::Messaging]);
    // email + sms + messaging attempted, two succeeded
    assert!((result.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.stages.last(), Some(&DispatchStage::Done));
    assert!(result.stages.contains(&DispatchStage::MessagingAttempted));

    let calls = h.messaging.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|(_, _, at)| *at == t0() + ChronoDuration::minutes(2)));
    assert!(calls[0].1.contains("Jharia Coalfield"));
}

#[tokio::test]
async fn messaging_fallback_fires_when_sms_unconfigured() {
    let registry = Arc::new(AlertRegistry::default());
    let messaging = Arc::new(FakeMessaging::default());
    let h = harness_from(Some(Arc::new(FakeEmail::default())), None, Some(messaging), registry);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.85, Severity::High), t0())
        .await;
    assert_eq!(result.channels_used, vec![Channel::Email, Channel::Messaging]);
    assert_eq!(h.messaging.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn medium_alert_never_uses_phone_channels() {
    let all_fail = || (0..3).map(|_| Reply::Error("x".into())).collect();
    let sms = ScriptedSms::default().script("+919000000001", all_fail());
    let h = harness_with(None, Some(sms), None);
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::Medium, &assessment(0.5, Severity::Medium), t0())
        .await;
    assert_eq!(h.sms.call_count(), 0);
    assert!(h.messaging.calls.lock().unwrap().is_empty());
    assert_eq!(result.channels.len(), 1);
    assert_eq!(result.recipient_count, 2);
    // two group emails; phones are not targeted below HIGH
    assert_eq!(result.endpoint_count, 2);
}

#[tokio::test]
async fn fully_failed_send_is_still_recorded() {
    let email = FakeEmail {
        fail_with: Some("connection refused".into()),
        ..Default::default()
    };
    let all_fail = || (0..3).map(|_| Reply::Error("x".into())).collect();
    let sms = ScriptedSms::default()
        .script("+919000000001", all_fail())
        .script("+919000000002", all_fail());
    let messaging = FakeMessaging {
        fail: true,
        ..Default::default()
    };
    let h = harness_with(Some(email), Some(sms), Some(messaging));
    let result = h
        .dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.95, Severity::High), t0())
        .await;

    assert!(!result.success);
    assert!(result.channels_used.is_empty());
    assert_eq!(result.success_rate, 0.0);

    let stored = h.registry.get(&result.alert_id).expect("alert recorded");
    assert_eq!(stored.channels_attempted.len(), 3);
    assert!(stored.channels_succeeded.is_empty());
    assert_eq!(stored.key_factors.len(), 2);
}

#[tokio::test]
async fn explanation_enriches_messages_and_alert() {
    let registry = Arc::new(AlertRegistry::default());
    let email = Arc::new(FakeEmail::default());
    let sms = Arc::new(ScriptedSms::default());
    let h = harness_from(Some(email), Some(sms), None, registry);
    let dispatcher = h.dispatcher.with_explainer(
        Arc::new(FakeExplainer {
            result: Ok(explanation()),
        }),
        TIMEOUT,
    );
    let result = dispatcher
        .send_alert_at(&jharia(), Severity::High, &assessment(0.85, Severity::High), t0())
        .await;

    let alert = h.registry.get(&result.alert_id).unwrap();
    assert_eq!(alert.contributing_factors.len(), 4);
    let email_calls = h.email.calls.lock().unwrap();
    assert!(email_calls[0].2.contains("Vibration well above"));
    let sms_bodies = h.sms.calls_for("+919000000001");
    assert!(sms_bodies[0].contains("📊 कंपन: 8.2Hz | Vibration: 8.2Hz"));
}

#[tokio::test]
async fn explainer_failure_degrades_to_key_factors() {
    let registry = Arc::new(AlertRegistry::default());
    let email = Arc::new(FakeEmail::default());
    let h = harness_from(Some(email), None, None, registry);
    let dispatcher = h.dispatcher.with_explainer(
        Arc::new(FakeExplainer {
            result: Err("model unavailable".into()),
        }),
        TIMEOUT,
    );
    let result = dispatcher
        .send_alert_at(&jharia(), Severity::Medium, &assessment(0.5, Severity::Medium), t0())
        .await;
    assert!(result.success);
    let email_calls = h.email.calls.lock().unwrap();
    assert!(email_calls[0].2.contains("<li>High vibration levels</li>"));
}

#[tokio::test]
async fn dispatch_purges_expired_alerts_after_append() {
    let h = harness_with(None, None, None);
    let old = Alert::new(
        "alert_old".into(),
        &jharia(),
        Severity::Low,
        0.1,
        t0() - ChronoDuration::hours(30),
    );
    h.registry.append(old);
    h.dispatcher
        .send_alert_at(&jharia(), Severity::Low, &assessment(0.2, Severity::Low), t0())
        .await;
    assert!(h.registry.get("alert_old").is_none());
    assert_eq!(h.registry.len(), 1);
}
