use chrono::{DateTime, Utc};
use rockwatch_alert::tracker::{AlertTracker, TrackerDecision};
use rockwatch_alert::{FacilityDirectory, RiskPredictor};
use rockwatch_common::types::Severity;
use rockwatch_notify::dispatcher::{DispatchResult, Dispatcher};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use utoipa::ToSchema;

/// Snapshot of the monitor's configuration and progress.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonitorStatus {
    pub running: bool,
    pub poll_interval_secs: u64,
    pub cooldown_secs: i64,
    pub facility_count: usize,
    /// Dedup keys for facilities currently above the HIGH threshold.
    pub active_dedup_keys: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub checks_completed: u64,
}

/// Background poller that scores every facility each tick and dispatches a
/// HIGH alert when the cooldown and dedup rules allow it.
///
/// Dispatches run as independent tasks so a slow gateway never delays the
/// next facility's check.
pub struct RiskMonitor {
    predictor: Arc<dyn RiskPredictor>,
    facilities: Arc<dyn FacilityDirectory>,
    dispatcher: Arc<Dispatcher>,
    tracker: Mutex<AlertTracker>,
    poll_interval: Duration,
    predictor_timeout: Duration,
    running: AtomicBool,
    /// Bumped on every start; a loop exits once its generation is stale.
    generation: AtomicU64,
    checks_completed: AtomicU64,
    last_check: Mutex<Option<DateTime<Utc>>>,
}

impl RiskMonitor {
    pub fn new(
        predictor: Arc<dyn RiskPredictor>,
        facilities: Arc<dyn FacilityDirectory>,
        dispatcher: Arc<Dispatcher>,
        tracker: AlertTracker,
        poll_interval: Duration,
        predictor_timeout: Duration,
    ) -> Self {
        Self {
            predictor,
            facilities,
            dispatcher,
            tracker: Mutex::new(tracker),
            poll_interval,
            predictor_timeout,
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            checks_completed: AtomicU64::new(0),
            last_check: Mutex::new(None),
        }
    }

    fn tracker(&self) -> MutexGuard<'_, AlertTracker> {
        self.tracker.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Spawns the polling loop. Returns `false` if it was already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Risk monitor already running");
            return false;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            facilities = self.facilities.list().len(),
            "Risk monitor started"
        );
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run(generation).await });
        true
    }

    /// Asks the loop to exit at the top of its next tick. In-flight
    /// dispatches run to completion. Returns `false` if already stopped.
    pub fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if was_running {
            tracing::info!("Risk monitor stopping");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(self: Arc<Self>, generation: u64) {
        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if !self.is_current(generation) {
                break;
            }
            self.check_all().await;
        }
        tracing::info!(generation, "Risk monitor loop exited");
    }

    pub async fn check_all(&self) -> Vec<JoinHandle<DispatchResult>> {
        self.check_all_at(Utc::now()).await
    }

    /// One pass over every facility. A failure for one facility is logged
    /// and the pass continues. Returns handles for the dispatches started.
    pub async fn check_all_at(&self, now: DateTime<Utc>) -> Vec<JoinHandle<DispatchResult>> {
        let facilities = self.facilities.list();
        let mut handles = Vec::new();
        let mut failures = 0usize;

        for facility in facilities.iter() {
            let assessment =
                match tokio::time::timeout(self.predictor_timeout, self.predictor.assess(facility)).await {
                    Ok(Ok(a)) => a,
                    Ok(Err(e)) => {
                        failures += 1;
                        tracing::warn!(facility_id = %facility.id, error = %e, "Risk check failed");
                        continue;
                    }
                    Err(_) => {
                        failures += 1;
                        tracing::warn!(facility_id = %facility.id, "Risk check timed out");
                        continue;
                    }
                };

            let decision = {
                let mut tracker = self.tracker();
                let decision = tracker.evaluate(&facility.id, assessment.risk_score, now);
                if let TrackerDecision::Fire(key) = &decision {
                    tracker.record(key.clone(), now);
                }
                decision
            };

            match decision {
                TrackerDecision::Fire(key) => {
                    tracing::warn!(
                        facility_id = %facility.id,
                        risk_score = assessment.risk_score,
                        dedup_key = %key,
                        "HIGH risk detected, dispatching alert"
                    );
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let facility = facility.clone();
                    handles.push(tokio::spawn(async move {
                        dispatcher
                            .send_alert_at(&facility, Severity::High, &assessment, now)
                            .await
                    }));
                }
                TrackerDecision::Cooldown { remaining } => {
                    tracing::debug!(
                        facility_id = %facility.id,
                        remaining_secs = remaining.num_seconds(),
                        "Alert suppressed (cooldown)"
                    );
                }
                TrackerDecision::Duplicate(key) => {
                    tracing::debug!(facility_id = %facility.id, dedup_key = %key, "Alert suppressed (duplicate)");
                }
                TrackerDecision::BelowThreshold => {}
            }
        }

        *self.last_check.lock().unwrap_or_else(|p| p.into_inner()) = Some(now);
        self.checks_completed.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            facilities = facilities.len(),
            dispatched = handles.len(),
            failures,
            "Risk check pass completed"
        );
        handles
    }

    pub fn status(&self) -> MonitorStatus {
        let (cooldown, active_keys) = {
            let tracker = self.tracker();
            (tracker.cooldown(), tracker.active_key_count())
        };
        MonitorStatus {
            running: self.is_running(),
            poll_interval_secs: self.poll_interval.as_secs(),
            cooldown_secs: cooldown.num_seconds(),
            facility_count: self.facilities.list().len(),
            active_dedup_keys: active_keys,
            last_check: *self.last_check.lock().unwrap_or_else(|p| p.into_inner()),
            checks_completed: self.checks_completed.load(Ordering::SeqCst),
        }
    }
}
