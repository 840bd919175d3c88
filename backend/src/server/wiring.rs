//! Adapter selection for the notifier binary.
//!
//! PostgreSQL backs discovery and notifications when a database URL is
//! configured; otherwise a seeded in-memory store is used. Reminders go to the
//! HTTP email gateway when one is configured and to the log otherwise.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use lending_backend::config::NotifierSettings;
use lending_backend::domain::ports::{
    DeliveryChannel, NotificationPassMetrics, NotificationRepository, OverdueLoanSource,
};
use lending_backend::domain::{OverdueNotificationPorts, OverdueNotificationProcessor};
use lending_backend::outbound::delivery::{HttpEmailGateway, LoggingDeliveryChannel};
use lending_backend::outbound::memory::InMemoryLendingStore;
use lending_backend::outbound::persistence::{
    DbPool, DieselNotificationRepository, DieselOverdueLoanSource, run_pending_migrations,
};

const SIMULATED_LATENCY: Duration = Duration::from_millis(100);

/// Processor plus the read port the HTTP layer needs.
pub struct Wiring {
    /// Processor shared by the scheduler and the manual trigger.
    pub processor: Arc<OverdueNotificationProcessor>,
    /// Notification store used by inspection endpoints.
    pub notifications: Arc<dyn NotificationRepository>,
}

async fn build_store(
    settings: &NotifierSettings,
    clock: &dyn Clock,
) -> Result<(Arc<dyn OverdueLoanSource>, Arc<dyn NotificationRepository>)> {
    let Some(pool_config) = settings.pool_config()? else {
        warn!("no database configured; using seeded in-memory lending store");
        let store = Arc::new(InMemoryLendingStore::seeded(clock.utc()));
        return Ok((store.clone(), store));
    };

    run_pending_migrations(pool_config.database_url())
        .await
        .wrap_err("apply database migrations")?;
    let pool = DbPool::connect(&pool_config)
        .await
        .wrap_err("connect to database")?;
    info!(max_connections = pool_config.max_size(), "using PostgreSQL lending store");
    Ok((
        Arc::new(DieselOverdueLoanSource::new(pool.clone())),
        Arc::new(DieselNotificationRepository::new(pool)),
    ))
}

fn build_channel(
    settings: &NotifierSettings,
    timeout: Duration,
) -> Result<Arc<dyn DeliveryChannel>> {
    if let Some(endpoint) = settings.email_gateway_url()? {
        info!(endpoint = %endpoint, "delivering reminders through email gateway");
        let gateway =
            HttpEmailGateway::new(endpoint, timeout).wrap_err("build email gateway client")?;
        return Ok(Arc::new(gateway));
    }

    let failure_rate = settings.simulated_failure_rate()?;
    info!(failure_rate, "delivering reminders to the log");
    Ok(Arc::new(
        LoggingDeliveryChannel::new()
            .with_failure_rate(failure_rate)
            .with_latency(SIMULATED_LATENCY),
    ))
}

/// Build the processor and its collaborators from settings.
pub async fn build(
    settings: &NotifierSettings,
    metrics: Arc<dyn NotificationPassMetrics>,
) -> Result<Wiring> {
    let config = settings.processor_config()?;
    let clock = Arc::new(DefaultClock);
    let (loans, notifications) = build_store(settings, clock.as_ref()).await?;
    let channel = build_channel(settings, config.delivery_timeout)?;
    let ports =
        OverdueNotificationPorts::new(loans, notifications.clone(), channel).with_metrics(metrics);
    let processor = OverdueNotificationProcessor::new(ports, clock, config);
    Ok(Wiring {
        processor: Arc::new(processor),
        notifications,
    })
}
