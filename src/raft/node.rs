use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use log::{debug, info};

use super::{
    HeartbeatTask, Inbox, MessageProcessor, NodeState, RaftError, RaftMessage,
    Received, Router, Transition,
};
use crate::observe::StateSink;

/// Owner's handle on a running node worker.
pub struct RaftNode {
    id: String,
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl RaftNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Signal the worker to exit; returns immediately.
    pub fn signal_stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait until the worker has fully exited.
    pub async fn join(self) -> Result<(), RaftError> {
        self.worker.await.map_err(|e| RaftError::WorkerPanicked {
            node: self.id,
            reason: e.to_string(),
        })
    }
}

/// Everything a node worker needs that outlives a single iteration.
pub struct NodeWorker {
    state: NodeState,
    published: Arc<RwLock<NodeState>>,
    inbox: Inbox,
    processor: MessageProcessor,
    router: Arc<Router>,
    sink: Arc<dyn StateSink>,
    heartbeat_interval: Duration,
    heartbeat: Option<HeartbeatTask>,
}

impl NodeWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        published: Arc<RwLock<NodeState>>,
        inbox: mpsc::UnboundedReceiver<RaftMessage>,
        shutdown: watch::Receiver<bool>,
        processor: MessageProcessor,
        router: Arc<Router>,
        sink: Arc<dyn StateSink>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            state: NodeState::new(id),
            published,
            inbox: Inbox::new(inbox, shutdown),
            processor,
            router,
            sink,
            heartbeat_interval,
            heartbeat: None,
        }
    }

    /// Spawn the worker. It stays idle until `start` flips to true.
    pub fn spawn(self, shutdown: watch::Sender<bool>, start: watch::Receiver<bool>) -> RaftNode {
        let id = self.state.id.clone();
        let worker = tokio::spawn(self.run(start));
        RaftNode {
            id,
            shutdown,
            worker,
        }
    }

    async fn run(mut self, mut start: watch::Receiver<bool>) {
        let started = tokio::select! {
            biased;
            _ = self.inbox.recv_shutdown() => false,
            started = wait_for_start(&mut start) => started,
        };
        if !started {
            debug!("Node {} stopped before the cluster started", self.state.id);
            return;
        }

        assert_eq!(
            self.state.term, 0,
            "node {} armed its election clock after leaving term 0",
            self.state.id
        );
        self.state.election_timeout = Some(self.processor.timer().sample());
        self.publish();
        info!(
            "Node {} started with election timeout {:?}s",
            self.state.id, self.state.election_timeout
        );

        loop {
            let deadline = self.state.election_timeout.map(Duration::from_secs);
            match self.inbox.recv(deadline).await {
                Received::Shutdown => break,
                Received::Messages(batch) => {
                    for message in batch {
                        let transition = self.processor.process(self.state.clone(), message);
                        self.apply(transition).await;
                    }
                }
                Received::TimedOut => {
                    let transition = self.processor.election_timeout(self.state.clone());
                    self.apply(transition).await;
                }
            }
            self.publish();
        }

        if let Some(task) = self.heartbeat.take() {
            task.stop().await;
        }
        let dropped = self.inbox.close();
        debug!(
            "Node {} shut down with {} undelivered messages",
            self.state.id,
            dropped.len()
        );
    }

    async fn apply(&mut self, transition: Transition) {
        let Transition {
            state,
            outbound,
            notes,
        } = transition;

        let was_leader = self.state.is_leader();
        self.state = state;
        self.store();

        match (was_leader, self.state.is_leader()) {
            (false, true) => {
                self.heartbeat = Some(HeartbeatTask::start(
                    Arc::clone(&self.router),
                    self.state.id.clone(),
                    self.state.term,
                    self.heartbeat_interval,
                ));
            }
            (true, false) => {
                if let Some(task) = self.heartbeat.take() {
                    task.stop().await;
                }
            }
            _ => {}
        }

        for note in notes {
            self.sink.append_log(note);
        }
        for message in outbound {
            self.router.deliver(message).await;
        }
    }

    /// Make the current state visible to the router.
    fn store(&self) {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *published = self.state.clone();
    }

    fn publish(&self) {
        self.store();
        self.sink.publish_state(&self.state.id, &self.state);
    }
}

async fn wait_for_start(start: &mut watch::Receiver<bool>) -> bool {
    loop {
        if *start.borrow_and_update() {
            return true;
        }
        if start.changed().await.is_err() {
            return false;
        }
    }
}
