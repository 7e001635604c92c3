use anyhow::{Context, Result};
use fuelwatch::{
    config::DashboardConfig,
    dashboard::{Dashboard, PresentationSink},
    sink::{JsonExportSink, LogSink},
    source::HttpSource,
};
use std::{env, sync::Arc};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "fuelwatch.yaml".to_string());
    let config = DashboardConfig::load(&config_path)?;
    info!(
        config = %config_path,
        url = %config.source.url,
        format = ?config.source.format,
        region = ?config.filter.region,
        "loaded config"
    );

    // ─── 3) wire source and sinks ────────────────────────────────────
    let source = HttpSource::new(config.source.clone())?;
    let mut sinks: Vec<Box<dyn PresentationSink>> = vec![Box::new(LogSink)];
    if let Some(path) = &config.export_path {
        info!(path = %path, "exporting sites on every refresh");
        sinks.push(Box::new(JsonExportSink::new(path)));
    }
    let dashboard = Arc::new(Dashboard::new(source, sinks, &config));

    // ─── 4) refresh until ctrl-c ─────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_loop = tokio::spawn(
        Arc::clone(&dashboard).run(config.refresh_interval(), shutdown_rx),
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutting down");
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresh_loop.await {
        error!("refresh loop panicked: {}", e);
    }

    info!("all done");
    Ok(())
}
