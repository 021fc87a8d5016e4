//! Live tally feed for the staff dashboard.
//!
//! Best-effort background refresh of today's poll on a fixed interval. A
//! failed interval keeps the last-known-good snapshot and raises the `stale`
//! flag; the interval keeps running regardless. Dropping the feed aborts the
//! task, so a torn-down view never receives further updates.

use canteen_client::CanteenApi;
use canteen_client::types::VotePoll;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Last-known tally state.
#[derive(Debug, Clone, Default)]
pub struct TallySnapshot {
    /// Today's poll with live counts; `None` until the first fetch lands
    /// (or when no poll exists today).
    pub poll: Option<VotePoll>,
    /// Set when the most recent refresh failed and `poll` is stale.
    pub stale: bool,
}

/// One refresh step: replace the snapshot on success, mark it stale on
/// failure without touching the last good poll.
pub async fn refresh_once(api: &dyn CanteenApi, snapshot: &mut TallySnapshot) {
    match api.poll_today().await {
        Ok(poll) => {
            snapshot.poll = poll;
            snapshot.stale = false;
        }
        Err(e) => {
            warn!(error = %e, "tally refresh failed, keeping last snapshot");
            snapshot.stale = true;
        }
    }
}

/// Handle to the background refresh task.
pub struct LiveTallyFeed {
    handle: JoinHandle<()>,
    rx: watch::Receiver<TallySnapshot>,
}

impl LiveTallyFeed {
    /// Spawn the refresh loop. The first fetch happens immediately, then
    /// every `refresh_interval`.
    #[must_use]
    pub fn spawn(api: Arc<dyn CanteenApi>, refresh_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(TallySnapshot::default());
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut snapshot = TallySnapshot::default();
            loop {
                ticker.tick().await;
                refresh_once(api.as_ref(), &mut snapshot).await;
                if tx.send(snapshot.clone()).is_err() {
                    // Every receiver is gone.
                    break;
                }
            }
        });
        Self { handle, rx }
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TallySnapshot> {
        self.rx.clone()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TallySnapshot {
        self.rx.borrow().clone()
    }
}

impl Drop for LiveTallyFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
