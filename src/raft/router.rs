use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use rand::seq::{IndexedRandom, SliceRandom};
use tokio::sync::mpsc;
use tokio::time::sleep;
use log::debug;

use super::{NodeRole, NodeState, Outbound, Quorum, RaftMessage};

/// The router's view of one node: where to deliver, and the node's
/// most recently published state.
#[derive(Debug, Clone)]
pub struct NodeLink {
    id: String,
    inbox: mpsc::UnboundedSender<RaftMessage>,
    state: Arc<RwLock<NodeState>>,
}

impl NodeLink {
    pub fn new(
        id: impl Into<String>,
        inbox: mpsc::UnboundedSender<RaftMessage>,
        state: Arc<RwLock<NodeState>>,
    ) -> Self {
        Self {
            id: id.into(),
            inbox,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn role(&self) -> NodeRole {
        self.state.read().unwrap_or_else(PoisonError::into_inner).role
    }

    pub fn term(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).term
    }

    pub fn is_dead(&self) -> bool {
        self.role() == NodeRole::Dead
    }

    fn push(&self, message: RaftMessage) {
        if self.inbox.send(message).is_err() {
            debug!("Inbox of {} is closed, message dropped", self.id);
        }
    }
}

/// In-process message transport over a fixed node table.
///
/// Membership is set once at construction, so the table is read without
/// locking; only the per-node snapshots are synchronized.
#[derive(Debug)]
pub struct Router {
    nodes: Vec<NodeLink>,
    vote_delay: Duration,
}

impl Router {
    pub fn new(nodes: Vec<NodeLink>, vote_delay: Duration) -> Self {
        Self { nodes, vote_delay }
    }

    pub fn cluster_size(&self) -> usize {
        self.nodes.len()
    }

    pub fn quorum(&self) -> Quorum {
        Quorum::new(self.nodes.len())
    }

    pub fn has_quorum(&self, votes: u64) -> bool {
        self.quorum().is_reached(votes)
    }

    pub fn all_nodes(&self) -> &[NodeLink] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NodeLink> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn random_node(&self) -> Option<&NodeLink> {
        self.nodes.choose(&mut rand::rng())
    }

    /// Deliver to the first node with a matching id. Unknown ids and dead
    /// targets are dropped silently, except that restarts reach the dead.
    pub fn send_to(&self, target: &str, message: RaftMessage) {
        let Some(node) = self.node(target) else {
            debug!("No node named {target}, dropping {}", message.kind());
            return;
        };
        if node.is_dead() && !message.reaches_dead_nodes() {
            debug!("Node {target} is dead, dropping {}", message.kind());
            return;
        }
        node.push(message);
    }

    /// Fan out to every live node except `source`, in a fresh random order.
    /// Vote requests are held back by the configured delay first.
    pub async fn broadcast(&self, source: &str, message: RaftMessage) {
        if matches!(message, RaftMessage::VoteRequest { .. }) && !self.vote_delay.is_zero() {
            sleep(self.vote_delay).await;
        }

        if self.node(source).is_some_and(NodeLink::is_dead) {
            debug!("Source {source} is dead, dropping {} broadcast", message.kind());
            return;
        }

        let mut targets: Vec<&NodeLink> = self.nodes.iter().filter(|n| n.id != source).collect();
        targets.shuffle(&mut rand::rng());

        for node in targets {
            if node.is_dead() {
                continue;
            }
            node.push(message.clone());
        }
    }

    pub async fn deliver(&self, outbound: Outbound) {
        match outbound {
            Outbound::Unicast { target, message } => self.send_to(&target, message),
            Outbound::Broadcast { source, message } => self.broadcast(&source, message).await,
        }
    }

    pub fn kill_node(&self, id: &str) {
        self.send_to(id, RaftMessage::AdminKill);
    }

    pub fn restart_node(&self, id: &str) {
        self.send_to(id, RaftMessage::AdminRestart);
    }
}
