//! Notifier entry-point: runs the scheduler alongside the HTTP surface, or a
//! single pass for cron-style deployments.

mod server;

use std::ffi::OsString;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use actix_web::web;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lending_backend::config::NotifierSettings;
use lending_backend::domain::ports::{NoOpNotificationPassMetrics, NotificationPassMetrics};
use lending_backend::inbound::http::health::HealthState;
use lending_backend::inbound::http::state::HttpState;
use lending_backend::inbound::scheduler::OverdueNotificationScheduler;
#[cfg(feature = "metrics")]
use lending_backend::outbound::metrics::PrometheusNotificationPassMetrics;

const PROGRAM_NAME: &str = "lending-backend";

/// Overdue loan notifier.
#[derive(Debug, Parser)]
#[command(name = PROGRAM_NAME, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Mode {
    /// Run the scheduler and HTTP server until interrupted (default).
    Serve,
    /// Run one pass, print its summary, and exit.
    ProcessOnce,
}

fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("notifier")
        .endpoint("/metrics")
        .build()
        .map_err(|err| eyre!("configure Prometheus metrics: {err}"))
}

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let settings = NotifierSettings::load_from_iter([OsString::from(PROGRAM_NAME)])
        .map_err(|err| eyre!("load notifier settings: {err}"))?;

    match cli.mode.unwrap_or(Mode::Serve) {
        Mode::ProcessOnce => process_once(&settings).await,
        Mode::Serve => serve(&settings).await,
    }
}

async fn process_once(settings: &NotifierSettings) -> Result<()> {
    let metrics: Arc<dyn NotificationPassMetrics> = Arc::new(NoOpNotificationPassMetrics);
    let wiring = server::wiring::build(settings, metrics).await?;
    let summary = wiring
        .processor
        .process_once()
        .await
        .wrap_err("overdue notification pass failed")?;
    info!(
        overdue_loans_seen = summary.overdue_loans_seen,
        notifications_created = summary.notifications_created,
        notifications_sent = summary.notifications_sent,
        notifications_failed = summary.notifications_failed,
        retries_attempted = summary.retries_attempted,
        "single pass finished"
    );
    Ok(())
}

async fn serve(settings: &NotifierSettings) -> Result<()> {
    let bind_addr = settings.bind_addr()?;
    let scheduler_config = settings.scheduler_config()?;

    #[cfg(feature = "metrics")]
    let prometheus = make_metrics()?;
    #[cfg(feature = "metrics")]
    let metrics: Arc<dyn NotificationPassMetrics> = Arc::new(
        PrometheusNotificationPassMetrics::new(&prometheus.registry)
            .wrap_err("register notification pass metrics")?,
    );
    #[cfg(not(feature = "metrics"))]
    let metrics: Arc<dyn NotificationPassMetrics> = Arc::new(NoOpNotificationPassMetrics);

    let wiring = server::wiring::build(settings, metrics).await?;
    let health_state = web::Data::new(HealthState::new());
    let http_state = HttpState::new(wiring.processor.clone(), wiring.notifications);

    let http_server = server::create_server(
        health_state.clone(),
        http_state,
        bind_addr,
        #[cfg(feature = "metrics")]
        prometheus,
    )
    .wrap_err_with(|| format!("bind HTTP server on {bind_addr}"))?;

    let scheduler = OverdueNotificationScheduler::new(wiring.processor, scheduler_config).start();
    health_state.mark_ready();
    info!(%bind_addr, "notifier listening");

    let served = http_server.await;
    health_state.mark_draining();
    let report = scheduler.stop().await?;
    info!(
        passes_completed = report.passes_completed,
        passes_failed = report.passes_failed,
        "notifier stopped"
    );
    served.wrap_err("HTTP server failed")
}
