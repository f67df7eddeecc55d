use chrono::{DateTime, Duration, Utc};
use rockwatch_common::types::{Alert, AlertStatus, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Default retention window for alert records.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Aggregate counts over the retained alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct AlertStats {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_status: BTreeMap<AlertStatus, usize>,
    /// `total - resolved`.
    pub unresolved: usize,
}

/// In-memory alert ledger shared by the monitor and the HTTP API.
///
/// Every mutation goes through one mutex. Records older than the retention
/// window are purged by [`list_active`](Self::list_active), [`stats`](Self::stats)
/// and [`purge_expired`](Self::purge_expired) regardless of status. State is
/// not persisted.
pub struct AlertRegistry {
    alerts: Mutex<Vec<Alert>>,
    retention: Duration,
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

impl AlertRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alert>> {
        self.alerts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Adds a record. Returns `false` (and stores nothing) if the id is
    /// already present.
    pub fn append(&self, alert: Alert) -> bool {
        let mut alerts = self.lock();
        if alerts.iter().any(|a| a.id == alert.id) {
            tracing::warn!(alert_id = %alert.id, "Duplicate alert id rejected by registry");
            return false;
        }
        alerts.push(alert);
        true
    }

    pub fn get(&self, id: &str) -> Option<Alert> {
        self.lock().iter().find(|a| a.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn acknowledge(&self, id: &str, by: &str) -> bool {
        self.acknowledge_at(id, by, Utc::now())
    }

    /// `false` if the id is absent or the alert is already resolved.
    pub fn acknowledge_at(&self, id: &str, by: &str, now: DateTime<Utc>) -> bool {
        let mut alerts = self.lock();
        let Some(alert) = alerts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        match alert.acknowledge(by, now) {
            Ok(()) => {
                tracing::info!(alert_id = id, acknowledged_by = by, "Alert acknowledged");
                true
            }
            Err(e) => {
                tracing::debug!(alert_id = id, error = %e, "Acknowledge rejected");
                false
            }
        }
    }

    pub fn resolve(&self, id: &str, by: &str, notes: &str) -> bool {
        self.resolve_at(id, by, notes, Utc::now())
    }

    /// `false` if the id is absent, in which case nothing is mutated.
    pub fn resolve_at(&self, id: &str, by: &str, notes: &str, now: DateTime<Utc>) -> bool {
        let mut alerts = self.lock();
        let Some(alert) = alerts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        alert.resolve(by, notes, now);
        tracing::info!(alert_id = id, resolved_by = by, "Alert resolved");
        true
    }

    pub fn list_active(&self) -> Vec<Alert> {
        self.list_active_at(Utc::now())
    }

    /// Purges expired records, then returns every retained record.
    pub fn list_active_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = self.lock();
        Self::purge_locked(&mut alerts, self.retention, now);
        alerts.clone()
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    /// Removes records whose `created_at` is more than one retention window
    /// before `now`. Returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut alerts = self.lock();
        Self::purge_locked(&mut alerts, self.retention, now)
    }

    fn purge_locked(alerts: &mut Vec<Alert>, retention: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - retention;
        let before = alerts.len();
        alerts.retain(|a| a.created_at >= cutoff);
        let removed = before - alerts.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired alerts");
        }
        removed
    }

    pub fn stats(&self) -> AlertStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> AlertStats {
        let mut alerts = self.lock();
        Self::purge_locked(&mut alerts, self.retention, now);
        AlertStats::from_alerts(alerts.iter())
    }
}

impl AlertStats {
    /// Counts over an arbitrary subset of alerts, e.g. one caller's facilities.
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Self {
        let mut by_severity: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_status: BTreeMap<AlertStatus, usize> = [
            AlertStatus::Active,
            AlertStatus::Acknowledged,
            AlertStatus::Resolved,
        ]
        .into_iter()
        .map(|s| (s, 0))
        .collect();

        let mut total = 0;
        for alert in alerts {
            total += 1;
            *by_severity.entry(alert.severity).or_default() += 1;
            *by_status.entry(alert.status).or_default() += 1;
        }

        let resolved = by_status.get(&AlertStatus::Resolved).copied().unwrap_or(0);
        Self {
            total,
            by_severity,
            by_status,
            unresolved: total - resolved,
        }
    }
}
