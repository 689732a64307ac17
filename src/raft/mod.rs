mod error;
mod heartbeat;
mod inbox;
mod message;
mod node;
mod processor;
mod quorum;
mod router;
mod state;
mod timer;

pub use self::error::RaftError;
pub use self::heartbeat::HeartbeatTask;
pub use self::inbox::{Inbox, Received};
pub use self::message::{Outbound, RaftMessage};
pub use self::node::{NodeWorker, RaftNode};
pub use self::processor::{MessageProcessor, Transition};
pub use self::quorum::Quorum;
pub use self::router::{NodeLink, Router};
pub use self::state::{NodeRole, NodeState};
pub use self::timer::ElectionTimer;

use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, watch};
use log::{error, info};

use crate::config::ClusterConfig;
use crate::observe::StateSink;

/// A fixed set of simulated nodes wired to one router.
///
/// Must be created inside a tokio runtime. Workers are spawned right away
/// but stay idle until `start`.
pub struct Cluster {
    router: Arc<Router>,
    nodes: Vec<RaftNode>,
    start: watch::Sender<bool>,
}

impl Cluster {
    pub fn new(config: &ClusterConfig, sink: Arc<dyn StateSink>) -> Result<Self, RaftError> {
        config.validate()?;

        let mut links = Vec::with_capacity(config.node_ids.len());
        let mut pending = Vec::with_capacity(config.node_ids.len());
        for id in &config.node_ids {
            let (tx, rx) = mpsc::unbounded_channel();
            let published = Arc::new(RwLock::new(NodeState::new(id.as_str())));
            links.push(NodeLink::new(id.as_str(), tx, Arc::clone(&published)));
            pending.push((id.as_str(), published, rx));
        }

        let router = Arc::new(Router::new(links, config.vote_delay()));
        let processor = MessageProcessor::new(router.quorum(), config.election_timer());
        let (start, start_rx) = watch::channel(false);

        let nodes = pending
            .into_iter()
            .map(|(id, published, rx)| {
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                NodeWorker::new(
                    id,
                    published,
                    rx,
                    shutdown_rx,
                    processor.clone(),
                    Arc::clone(&router),
                    Arc::clone(&sink),
                    config.heartbeat_interval(),
                )
                .spawn(shutdown_tx, start_rx.clone())
            })
            .collect();

        info!(
            "Cluster of {} nodes ready, quorum is {} votes",
            router.cluster_size(),
            router.quorum().votes_needed()
        );

        Ok(Self {
            router,
            nodes,
            start,
        })
    }

    /// Arm every node's election clock at once.
    pub fn start(&self) {
        info!("Starting election clocks");
        let _ = self.start.send(true);
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    pub fn kill_node(&self, id: &str) {
        self.router.kill_node(id);
    }

    pub fn restart_node(&self, id: &str) {
        self.router.restart_node(id);
    }

    pub fn all_nodes(&self) -> &[NodeLink] {
        self.router.all_nodes()
    }

    pub fn random_node(&self) -> Option<&NodeLink> {
        self.router.random_node()
    }

    /// Stop every worker, then wait for each one to exit. Workers release
    /// their own heartbeat tasks on the way out.
    pub async fn shutdown(self) -> Result<(), RaftError> {
        for node in &self.nodes {
            node.signal_stop();
        }

        let mut first_failure = None;
        for node in self.nodes {
            let id = node.id().to_string();
            if let Err(e) = node.join().await {
                error!("Node {id} did not stop cleanly: {e}");
                first_failure.get_or_insert(e);
            }
        }
        info!("Cluster shut down");

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
