//! Scheduling core worker binary.
//!
//! Composition root: loads configuration, selects the repository backend,
//! wires the scheduler service with the notification dispatcher, and runs
//! the retention sweeper on an interval until shutdown. The HTTP surface
//! lives in a separate service and talks to this crate through its library
//! API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use fotoagenda::config::SchedulingConfig;
use fotoagenda::db::RepositoryFactory;
use fotoagenda::services::{
    NotificationDispatcher, NotificationGateway, NotificationQueue, RetentionSweeper,
    SchedulerService, SystemClock,
};

const NOTIFICATION_QUEUE_CAPACITY: usize = 256;
const RETENTION_INTERVAL_SECS: u64 = 6 * 60 * 60;
const RETENTION_AGE_DAYS: i64 = 180;

/// Stand-in push gateway that logs instead of calling a provider. The
/// production gateway is injected by the messaging service.
struct LoggingGateway;

#[async_trait]
impl NotificationGateway for LoggingGateway {
    async fn send_notification(
        &self,
        token: &str,
        title: &str,
        _body: &str,
    ) -> Result<(), String> {
        tracing::info!(token, title, "push.delivered");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = SchedulingConfig::from_env();
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let repo = RepositoryFactory::from_env()
        .await
        .map_err(|e| anyhow::anyhow!("repository init failed: {e}"))?;

    let (queue, receiver) = NotificationQueue::bounded(NOTIFICATION_QUEUE_CAPACITY);
    let dispatcher = NotificationDispatcher::new(repo.clone(), Arc::new(LoggingGateway));
    let dispatcher_handle = dispatcher.spawn(receiver);

    let _service = SchedulerService::new(
        repo.clone(),
        Arc::new(SystemClock),
        queue,
        cfg.clone(),
    )
    .map_err(|e| anyhow::anyhow!("service init failed: {e}"))?;

    let sweeper = RetentionSweeper::new(repo, cfg);

    tracing::info!("fotoagenda scheduling worker started");

    let mut ticker = tokio::time::interval(Duration::from_secs(RETENTION_INTERVAL_SECS));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cutoff = chrono::Utc::now() - chrono::Duration::days(RETENTION_AGE_DAYS);
                match sweeper.run_once(cutoff).await {
                    Ok((bookings, agenda)) => {
                        tracing::debug!(bookings, agenda, "retention.sweep_complete");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "retention.sweep_failed");
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for shutdown signal")?;
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    drop(_service);
    dispatcher_handle.abort();
    Ok(())
}
