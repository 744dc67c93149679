use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use litterlog_db::Database;

/// Background task that deletes session rows past their `expires_at`.
///
/// Expired sessions are already invisible to lookups; this keeps the
/// table from accumulating dead rows. Errors are logged and retried at
/// the next tick.
pub async fn run_session_prune_loop(db: Arc<Database>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match db.prune_expired_sessions() {
            Ok(count) => {
                if count > 0 {
                    info!("Pruned {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Session prune error: {}", e);
            }
        }
    }
}
