use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use log::{debug, error};

use super::{RaftMessage, Router};

/// Periodic heartbeat broadcaster for a node while it is Leader.
///
/// The first heartbeat goes out immediately, then one per interval until
/// stopped. Dropping the task cancels it as well, but only `stop` waits
/// for it to finish.
pub struct HeartbeatTask {
    leader_id: String,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatTask {
    pub fn start(router: Arc<Router>, leader_id: String, term: u64, period: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let id = leader_id.clone();

        let handle = tokio::spawn(async move {
            debug!("Heartbeat task for {id} started in term {term}");
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Fires on an explicit stop and when the task is dropped.
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let message = RaftMessage::HeartbeatRequest {
                            term,
                            sender_id: id.clone(),
                        };
                        router.broadcast(&id, message).await;
                    }
                }
            }
            debug!("Heartbeat task for {id} stopped");
        });

        Self {
            leader_id,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Wake the task, even mid-interval, and wait until it has exited.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Heartbeat task for {} failed: {}", self.leader_id, e);
            }
        }
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}
