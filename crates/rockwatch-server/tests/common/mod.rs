#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use rockwatch_alert::tracker::AlertTracker;
use rockwatch_alert::RiskPredictor;
use rockwatch_common::types::{Facility, RiskAssessment, SensorSnapshot, Severity};
use rockwatch_notify::channels::email::{EmailChannel, EmailGateway};
use rockwatch_notify::channels::messaging::MessagingChannel;
use rockwatch_notify::channels::sms::SmsChannel;
use rockwatch_notify::dispatcher::Dispatcher;
use rockwatch_notify::error::NotifyError;
use rockwatch_notify::recipients::{RecipientDirectory, RecipientGroup};
use rockwatch_server::app;
use rockwatch_server::config::{ApiConfig, ApiKeyConfig, MonitorConfig, ServerConfig};
use rockwatch_server::facility::StaticFacilityDirectory;
use rockwatch_server::monitor::RiskMonitor;
use rockwatch_server::state::AppState;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const SITE_KEY: &str = "test-site-key";

/// Predictor whose score per facility is set by the test. Facilities marked
/// failing return an error.
pub struct ScriptedPredictor {
    scores: Mutex<HashMap<String, f64>>,
    failing: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedPredictor {
    fn new() -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_score(&self, facility_id: &str, score: f64) {
        self.scores
            .lock()
            .expect("scores lock")
            .insert(facility_id.to_string(), score);
    }

    pub fn fail(&self, facility_id: &str) {
        self.failing
            .lock()
            .expect("failing lock")
            .push(facility_id.to_string());
    }
}

#[async_trait]
impl RiskPredictor for ScriptedPredictor {
    async fn assess(&self, facility: &Facility) -> Result<RiskAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing
            .lock()
            .expect("failing lock")
            .contains(&facility.id)
        {
            anyhow::bail!("predictor unavailable for {}", facility.id);
        }
        let score = self
            .scores
            .lock()
            .expect("scores lock")
            .get(&facility.id)
            .copied()
            .unwrap_or(0.1);
        let level = if score >= 0.7 {
            Severity::High
        } else if score >= 0.4 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Ok(RiskAssessment {
            risk_score: score,
            risk_level: level,
            confidence: 0.9,
            key_factors: vec!["High rainfall".to_string()],
            sensor_snapshot: SensorSnapshot::from([("rainfall".to_string(), 42.0)]),
        })
    }
}

/// Email gateway that records every send and can be switched to failing.
#[derive(Default)]
pub struct RecordingEmail {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(Vec<String>, String)>>,
}

impl RecordingEmail {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("sent lock").len()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("sent lock")
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }
}

#[async_trait]
impl EmailGateway for RecordingEmail {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        _html_body: &str,
    ) -> rockwatch_notify::error::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Provider("550 mailbox unavailable".to_string()));
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((recipients.to_vec(), subject.to_string()));
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
    pub predictor: Arc<ScriptedPredictor>,
    pub email: Arc<RecordingEmail>,
}

pub fn test_facilities() -> Vec<Facility> {
    vec![
        Facility {
            id: "mine_001".to_string(),
            name: "Jharia Open Cast".to_string(),
            location: "Dhanbad, Jharkhand".to_string(),
            region: None,
        },
        Facility {
            id: "mine_002".to_string(),
            name: "Talcher Coalfield".to_string(),
            location: "Angul, Odisha".to_string(),
            region: None,
        },
    ]
}

fn test_recipients() -> RecipientDirectory {
    RecipientDirectory {
        emergency: RecipientGroup {
            emails: vec!["emergency@example.com".to_string()],
            phones: vec!["+919800000001".to_string()],
        },
        managers: RecipientGroup {
            emails: vec!["manager@example.com".to_string()],
            phones: vec!["+919800000002".to_string()],
        },
        operators: RecipientGroup {
            emails: vec!["operator@example.com".to_string()],
            phones: Vec::new(),
        },
    }
}

pub fn build_test_context() -> TestContext {
    build_test_context_with_cooldown(3600)
}

/// Email is the only configured channel; SMS and messaging are left
/// unconfigured so no network is touched.
pub fn build_test_context_with_cooldown(cooldown_secs: i64) -> TestContext {
    rockwatch_common::id::init(1, 1);

    let config = ServerConfig {
        monitor: MonitorConfig {
            autostart: false,
            poll_interval_secs: 60,
            cooldown_secs: cooldown_secs as u64,
        },
        recipients: test_recipients(),
        facilities: test_facilities(),
        api: ApiConfig {
            require_key: true,
            keys: vec![
                ApiKeyConfig {
                    key: ADMIN_KEY.to_string(),
                    name: "control-room".to_string(),
                    facilities: vec!["*".to_string()],
                },
                ApiKeyConfig {
                    key: SITE_KEY.to_string(),
                    name: "jharia-site".to_string(),
                    facilities: vec!["mine_001".to_string()],
                },
            ],
        },
        ..ServerConfig::default()
    };

    let registry = Arc::new(config.new_registry());
    let email = Arc::new(RecordingEmail::default());
    let timeout = Duration::from_secs(5);
    let dispatcher = Arc::new(Dispatcher::new(
        config.recipients.clone(),
        EmailChannel::new(Some(email.clone()), timeout),
        SmsChannel::new(None, timeout),
        MessagingChannel::new(None, timeout, chrono::Duration::seconds(120), "+91"),
        Arc::clone(&registry),
    ));

    let predictor = Arc::new(ScriptedPredictor::new());
    let facilities = Arc::new(StaticFacilityDirectory::new(config.facilities.clone()));
    let tracker = AlertTracker::new(config.thresholds, chrono::Duration::seconds(cooldown_secs));
    let monitor = Arc::new(RiskMonitor::new(
        predictor.clone(),
        facilities.clone(),
        Arc::clone(&dispatcher),
        tracker,
        Duration::from_secs(config.monitor.poll_interval_secs),
        Duration::from_secs(5),
    ));

    let state = AppState {
        registry,
        dispatcher,
        monitor,
        predictor: predictor.clone(),
        facilities,
        thresholds: config.thresholds,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    TestContext {
        state,
        app,
        predictor,
        email,
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }
    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}
