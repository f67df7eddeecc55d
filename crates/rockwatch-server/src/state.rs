use crate::config::ServerConfig;
use crate::monitor::RiskMonitor;
use chrono::{DateTime, Utc};
use rockwatch_alert::registry::AlertRegistry;
use rockwatch_alert::thresholds::SeverityThresholds;
use rockwatch_alert::{FacilityDirectory, RiskPredictor};
use rockwatch_notify::dispatcher::Dispatcher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AlertRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub monitor: Arc<RiskMonitor>,
    pub predictor: Arc<dyn RiskPredictor>,
    pub facilities: Arc<dyn FacilityDirectory>,
    pub thresholds: SeverityThresholds,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}
