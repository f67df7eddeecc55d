use anyhow::Result;
use chrono::Utc;
use rockwatch_alert::tracker::AlertTracker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use rockwatch_server::app;
use rockwatch_server::config::ServerConfig;
use rockwatch_server::facility::StaticFacilityDirectory;
use rockwatch_server::monitor::RiskMonitor;
use rockwatch_server::predictor::{HttpRiskExplainer, HttpRiskPredictor};
use rockwatch_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  rockwatch-server [config.toml]    Start the server (default: config/rockwatch.toml)");
    eprintln!("  rockwatch-server --help           Show this message");
}

#[tokio::main]
async fn main() -> Result<()> {
    rockwatch_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rockwatch=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("-h") | Some("--help") => {
            print_usage();
            Ok(())
        }
        Some(other) if other.starts_with('-') => {
            print_usage();
            anyhow::bail!("unknown option '{other}'")
        }
        path => run_server(path.unwrap_or("config/rockwatch.toml")).await,
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config '{config_path}': {e}"))?;
    tracing::info!(
        config = config_path,
        http_port = config.http_port,
        facilities = config.facilities.len(),
        "rockwatch-server starting"
    );

    let client = reqwest::Client::builder()
        .timeout(config.channel_timeout())
        .build()?;

    let registry = Arc::new(config.new_registry());
    let mut dispatcher = config.build_dispatcher(client, Arc::clone(&registry));
    if let Some(explainer) = &config.explainer {
        let timeout = Duration::from_secs(explainer.timeout_secs);
        match HttpRiskExplainer::new(&explainer.url, timeout) {
            Ok(e) => {
                tracing::info!(url = %explainer.url, "Risk explainer enabled");
                dispatcher = dispatcher.with_explainer(Arc::new(e), timeout);
            }
            Err(e) => tracing::error!(error = %e, "Risk explainer disabled"),
        }
    }
    let dispatcher = Arc::new(dispatcher);

    let predictor_timeout = Duration::from_secs(config.predictor.timeout_secs);
    let predictor = Arc::new(HttpRiskPredictor::new(&config.predictor.url, predictor_timeout)?);
    let facilities = Arc::new(StaticFacilityDirectory::new(config.facilities.clone()));

    let cooldown_secs = i64::try_from(config.monitor.cooldown_secs).unwrap_or(i64::MAX);
    let tracker = AlertTracker::new(config.thresholds, chrono::Duration::seconds(cooldown_secs));
    let monitor = Arc::new(RiskMonitor::new(
        predictor.clone(),
        facilities.clone(),
        Arc::clone(&dispatcher),
        tracker,
        Duration::from_secs(config.monitor.poll_interval_secs),
        predictor_timeout,
    ));
    if config.monitor.autostart {
        monitor.start();
    } else {
        tracing::info!("Risk monitor autostart disabled");
    }

    let http_port = config.http_port;
    let state = AppState {
        registry,
        dispatcher,
        monitor: Arc::clone(&monitor),
        predictor,
        facilities,
        thresholds: config.thresholds,
        start_time: Utc::now(),
        config: Arc::new(config),
    };

    let http_app = app::build_http_app(state);
    let http_addr: SocketAddr = ([0, 0, 0, 0], http_port).into();
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(addr = %http_addr, "HTTP server listening");

    if let Err(e) = axum::serve(http_listener, http_app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    monitor.stop();
    tracing::info!("rockwatch-server stopped");
    Ok(())
}
