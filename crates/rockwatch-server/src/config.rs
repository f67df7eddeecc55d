use rockwatch_alert::registry::AlertRegistry;
use rockwatch_alert::thresholds::SeverityThresholds;
use rockwatch_common::types::Facility;
use rockwatch_notify::channels::email::{EmailChannel, EmailGateway, SmtpEmailGateway};
use rockwatch_notify::channels::messaging::{
    MessagingChannel, MessagingGateway, WebhookMessagingGateway,
};
use rockwatch_notify::channels::sms::{SmsChannel, SmsGateway, TwilioSmsGateway};
use rockwatch_notify::dispatcher::Dispatcher;
use rockwatch_notify::recipients::RecipientDirectory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub thresholds: SeverityThresholds,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub recipients: RecipientDirectory,
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Optional explanation service; messages degrade to key factors without it.
    #[serde(default)]
    pub explainer: Option<ExplainerConfig>,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            monitor: MonitorConfig::default(),
            thresholds: SeverityThresholds::default(),
            registry: RegistryConfig::default(),
            channels: ChannelsConfig::default(),
            recipients: RecipientDirectory::default(),
            facilities: Vec::new(),
            predictor: PredictorConfig::default(),
            explainer: None,
            api: ApiConfig::default(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Start the polling loop when the server boots.
    #[serde(default = "default_monitor_autostart")]
    pub autostart: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum time between two alerts for the same facility.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            autostart: default_monitor_autostart(),
            poll_interval_secs: default_poll_interval_secs(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_monitor_autostart() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_cooldown_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
        }
    }
}

fn default_retention_hours() -> i64 {
    rockwatch_alert::registry::DEFAULT_RETENTION_HOURS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Upper bound for every individual gateway call.
    #[serde(default = "default_channel_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_channel_timeout_secs(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

fn default_channel_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from: String::new(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.trim().is_empty() && !self.from.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_sms_api_base")]
    pub api_base: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_sms_api_base(),
        }
    }
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com".to_string()
}

impl SmsConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.trim().is_empty()
            && !self.auth_token.trim().is_empty()
            && !self.from_number.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Scheduling webhook. Empty leaves the fallback channel unconfigured.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// How far ahead of "now" messages are scheduled.
    #[serde(default = "default_lead_time_secs")]
    pub lead_time_secs: i64,
    /// Prepended to numbers without a leading `+`.
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            lead_time_secs: default_lead_time_secs(),
            country_code: default_country_code(),
        }
    }
}

fn default_lead_time_secs() -> i64 {
    120
}

fn default_country_code() -> String {
    "+91".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_predictor_url")]
    pub url: String,
    #[serde(default = "default_collaborator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: default_predictor_url(),
            timeout_secs: default_collaborator_timeout_secs(),
        }
    }
}

fn default_predictor_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_collaborator_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainerConfig {
    pub url: String,
    #[serde(default = "default_collaborator_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// When false every request is treated as a wildcard key.
    #[serde(default = "default_require_key")]
    pub require_key: bool,
    #[serde(default)]
    pub keys: Vec<ApiKeyConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            require_key: default_require_key(),
            keys: Vec::new(),
        }
    }
}

fn default_require_key() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub key: String,
    pub name: String,
    /// Facility IDs this key may act on. `"*"` grants all.
    #[serde(default)]
    pub facilities: Vec<String>,
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.thresholds
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [thresholds]: {e}"))?;
        if self.monitor.poll_interval_secs == 0 {
            anyhow::bail!("monitor.poll_interval_secs must be greater than 0");
        }
        if self.registry.retention_hours <= 0 {
            anyhow::bail!("registry.retention_hours must be greater than 0");
        }
        let mut seen = std::collections::HashSet::new();
        for facility in &self.facilities {
            if !seen.insert(facility.id.as_str()) {
                anyhow::bail!("duplicate facility id '{}'", facility.id);
            }
        }
        Ok(())
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channels.timeout_secs)
    }

    pub fn new_registry(&self) -> AlertRegistry {
        AlertRegistry::new(chrono::Duration::hours(self.registry.retention_hours))
    }

    /// Wires the configured gateways into a dispatcher. Channels with
    /// missing or unusable credentials are left unconfigured.
    pub fn build_dispatcher(&self, client: reqwest::Client, registry: Arc<AlertRegistry>) -> Dispatcher {
        let timeout = self.channel_timeout();
        Dispatcher::new(
            self.recipients.clone(),
            EmailChannel::new(self.email_gateway(), timeout),
            SmsChannel::new(self.sms_gateway(client.clone()), timeout),
            MessagingChannel::new(
                self.messaging_gateway(client),
                timeout,
                chrono::Duration::seconds(self.channels.messaging.lead_time_secs),
                &self.channels.messaging.country_code,
            ),
            registry,
        )
    }

    fn email_gateway(&self) -> Option<Arc<dyn EmailGateway>> {
        let cfg = &self.channels.email;
        if !cfg.is_configured() {
            tracing::warn!("Email channel not configured");
            return None;
        }
        match SmtpEmailGateway::new(
            &cfg.smtp_host,
            cfg.smtp_port,
            cfg.username.as_deref(),
            cfg.password.as_deref(),
            &cfg.from,
        ) {
            Ok(gateway) => Some(Arc::new(gateway)),
            Err(e) => {
                tracing::error!(error = %e, "Email channel disabled");
                None
            }
        }
    }

    fn sms_gateway(&self, client: reqwest::Client) -> Option<Arc<dyn SmsGateway>> {
        let cfg = &self.channels.sms;
        if !cfg.is_configured() {
            tracing::warn!("SMS channel not configured");
            return None;
        }
        Some(Arc::new(TwilioSmsGateway::new(
            client,
            &cfg.api_base,
            &cfg.account_sid,
            &cfg.auth_token,
            &cfg.from_number,
        )))
    }

    fn messaging_gateway(&self, client: reqwest::Client) -> Option<Arc<dyn MessagingGateway>> {
        let cfg = &self.channels.messaging;
        if cfg.url.trim().is_empty() {
            tracing::warn!("Messaging channel not configured");
            return None;
        }
        Some(Arc::new(WebhookMessagingGateway::new(
            client,
            &cfg.url,
            cfg.api_key.clone(),
        )))
    }
}
