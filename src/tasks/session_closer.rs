use crate::engine::VotingEngine;
use crate::error::VoteResult;
use crate::models::Actor;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically stops a session whose `end_time` has passed.
///
/// The engine never expires sessions itself; this loop is only a timer that
/// calls the regular `stop` operation as the system admin.
pub async fn check_expired_session_task(engine: Arc<VotingEngine>, every: Duration) {
    let every = if every.is_zero() {
        warn!("Session check interval must be non-zero, using {:?}", MIN_CHECK_INTERVAL);
        MIN_CHECK_INTERVAL
    } else {
        every
    };
    info!("Starting background task to close expired voting sessions (every {:?})", every);
    let mut interval = interval(every);

    loop {
        interval.tick().await;
        let now = Utc::now();
        debug!("Checking voting session expiry at {}", now.to_rfc3339());

        match close_if_expired(&engine, now).await {
            Ok(true) => info!("Closed expired voting session"),
            Ok(false) => {}
            Err(e) => error!("Failed to check voting session expiry: {}", e),
        }
    }
}

/// Stops voting if it is still active past its end time. Returns whether it did.
pub async fn close_if_expired(engine: &VotingEngine, now: DateTime<Utc>) -> VoteResult<bool> {
    let settings = engine.get_settings().await?;
    if !settings.is_expired_at(now) {
        return Ok(false);
    }

    info!(
        "Voting session ended at {}, stopping it",
        settings.end_time.map(|end| end.to_rfc3339()).unwrap_or_default()
    );
    engine.stop(&Actor::system()).await?;
    Ok(true)
}
