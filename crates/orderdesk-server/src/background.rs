//! Background tasks for the orderdesk server.
//!
//! Includes:
//! - Evicting call sessions that went quiet without `end_conversation`.

use crate::AppState;
use orderdesk_agent::CallSession;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

/// Saves the partial record of a session already removed from the map.
pub(crate) async fn hang_up(session: Arc<Mutex<CallSession>>) -> Result<bool, String> {
    tokio::task::spawn_blocking(move || {
        let mut guard = session
            .lock()
            .map_err(|_| "session lock poisoned".to_string())?;
        Ok(guard.hang_up())
    })
    .await
    .map_err(|e| format!("task join error: {e}"))?
}

/// Removes every session idle for at least `idle_timeout` and saves what it
/// recorded. Returns how many sessions were closed.
///
/// Sessions whose lock is held are mid-request and never count as idle.
pub async fn evict_idle_sessions(state: &AppState, idle_timeout: Duration) -> usize {
    let idle: Vec<(String, Arc<Mutex<CallSession>>)> = {
        let Ok(mut sessions) = state.sessions.write() else {
            tracing::error!("session map lock poisoned, skipping eviction");
            return 0;
        };
        let ids: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| {
                session
                    .try_lock()
                    .is_ok_and(|s| s.idle_for() >= idle_timeout)
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.into_iter()
            .filter_map(|id| sessions.remove(&id).map(|session| (id, session)))
            .collect()
    };

    let count = idle.len();
    for (id, session) in idle {
        match hang_up(session).await {
            Ok(_) => tracing::info!(session_id = %id, "evicted idle call session"),
            Err(e) => tracing::error!(session_id = %id, error = %e, "failed to close idle session"),
        }
    }
    count
}

/// Starts the idle-session eviction task.
///
/// Runs indefinitely, checking every `timeout / 2` seconds (between 1 and 60).
pub async fn start_session_reaper(state: AppState, idle_timeout_secs: u64) {
    if idle_timeout_secs == 0 {
        tracing::warn!("idle session eviction disabled (timeout=0)");
        return;
    }

    let interval_seconds = (idle_timeout_secs / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);
    let idle_timeout = Duration::from_secs(idle_timeout_secs);

    tracing::info!(
        idle_timeout_secs,
        interval_seconds,
        "starting idle session eviction task"
    );

    loop {
        sleep(interval).await;
        let evicted = evict_idle_sessions(&state, idle_timeout).await;
        if evicted > 0 {
            tracing::info!(count = evicted, "evicted idle call sessions");
        }
    }
}
