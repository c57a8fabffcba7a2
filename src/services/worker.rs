use crate::services::links::LinkService;
use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

const SWEEP_INTERVAL_SECS: u64 = 900;

/// Periodically removes expired, unredeemed link rows. Correctness never
/// depends on this: redemption already rejects expired rows.
pub struct BackgroundWorker {
    db: SqlitePool,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(db: SqlitePool, shutdown: watch::Receiver<bool>) -> Self {
        Self { db, shutdown }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Background worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    async fn perform_cleanup(&self) {
        match LinkService::sweep_expired(&self.db).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("🧹 Swept {} expired one-time links", n),
            Err(e) => tracing::error!("Link sweep failed: {}", e),
        }
    }
}
