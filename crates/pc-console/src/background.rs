use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{info, warn};

use crate::state::AppState;
use crate::stores::assignment::AssignmentStore;
use crate::stores::session::SessionStore;

/// Spawns the maintenance loop: promote due rate assignments and sweep
/// expired admin sessions.
pub fn spawn(state: AppState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            run_once(&state).await;
        }
    });
}

pub async fn run_once(state: &AppState) {
    let now = Utc::now();

    match AssignmentStore::new(state.db_pool.clone())
        .promote_due(now.date_naive())
        .await
    {
        Ok(0) => {}
        Ok(changed) => info!(changed, "promoted due rate assignments"),
        Err(err) => warn!(error = %err, "rate assignment promotion failed"),
    }

    match SessionStore::new(state.db_pool.clone())
        .delete_expired(now)
        .await
    {
        Ok(0) => {}
        Ok(removed) => info!(removed, "swept expired admin sessions"),
        Err(err) => warn!(error = %err, "admin session sweep failed"),
    }
}
