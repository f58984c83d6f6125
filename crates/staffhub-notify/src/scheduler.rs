//! Cron scheduler for notification retention tasks.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use staffhub_core::error::AppError;
use staffhub_database::NotificationStore;

/// Cron-based scheduler for periodic notification maintenance.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Notification store the tasks run against.
    store: Arc<dyn NotificationStore>,
    /// Days after which terminal notifications are purged.
    retention_days: u32,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(
        store: Arc<dyn NotificationStore>,
        retention_days: u32,
    ) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            store,
            retention_days,
        })
    }

    /// Register all default scheduled tasks.
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_expiry_sweep().await?;
        self.register_retention_purge().await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Expiry sweep — every 5 minutes.
    ///
    /// Pending notifications whose `expires_at` passed without ever being
    /// claimed move to the terminal `expired` state.
    async fn register_expiry_sweep(&self) -> Result<(), AppError> {
        let store = Arc::clone(&self.store);
        let job = CronJob::new_async("0 */5 * * * *", move |_uuid, _lock| {
            let store = Arc::clone(&store);
            Box::pin(async move {
                match store.expire_overdue(Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!(count, "Expired overdue notifications"),
                    Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create expiry_sweep schedule: {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add expiry_sweep schedule: {e}")))?;

        tracing::info!("Registered: expiry_sweep (every 5min)");
        Ok(())
    }

    /// Retention purge — daily at 2 AM.
    async fn register_retention_purge(&self) -> Result<(), AppError> {
        let store = Arc::clone(&self.store);
        let retention_days = self.retention_days;
        let job = CronJob::new_async("0 0 2 * * *", move |_uuid, _lock| {
            let store = Arc::clone(&store);
            Box::pin(async move {
                let cutoff = Utc::now() - Duration::days(retention_days as i64);
                match store.purge_older_than(cutoff).await {
                    Ok(count) => {
                        tracing::info!(count, retention_days, "Purged old notifications")
                    }
                    Err(e) => tracing::error!(error = %e, "Retention purge failed"),
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create retention_purge schedule: {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add retention_purge schedule: {e}"))
        })?;

        tracing::info!("Registered: retention_purge (daily at 2AM)");
        Ok(())
    }
}
