use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
    Dead,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Follower => "Follower",
            NodeRole::Candidate => "Candidate",
            NodeRole::Leader => "Leader",
            NodeRole::Dead => "Dead",
        };
        f.write_str(name)
    }
}

/// Election bookkeeping for a single node.
///
/// Owned by the node's worker; everyone else only ever sees clones of it,
/// either inside a `VoteRequest` or through the published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: String,
    pub term: u64,
    pub role: NodeRole,
    /// Seconds of silence before the node stands for election.
    /// `None` while Leader or Dead.
    pub election_timeout: Option<u64>,
    pub votes_received: u64,
    pub last_voted_term: u64,
    /// Heartbeats seen in the current term.
    pub heartbeat_count: u64,
}

impl NodeState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            term: 0,
            role: NodeRole::Follower,
            election_timeout: None,
            votes_received: 0,
            last_voted_term: 0,
            heartbeat_count: 0,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.role == NodeRole::Dead
    }

    pub fn is_leader(&self) -> bool {
        self.role == NodeRole::Leader
    }

    pub fn next_term(&mut self) -> u64 {
        self.term += 1;
        self.term
    }

    pub fn clear_election_timeout(&mut self) {
        self.election_timeout = None;
    }
}
