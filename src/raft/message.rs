use super::NodeState;

// Message types exchanged between simulated nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaftMessage {
    // Leader election messages
    VoteRequest {
        candidate: NodeState,
    },
    VoteResponse {
        term: u64,
    },

    // Leader liveness messages
    HeartbeatRequest {
        term: u64,
        sender_id: String,
    },
    HeartbeatResponse,

    // Admin messages injected by the harness
    AdminKill,
    AdminRestart,
}

impl RaftMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            RaftMessage::VoteRequest { .. } => "VoteRequest",
            RaftMessage::VoteResponse { .. } => "VoteResponse",
            RaftMessage::HeartbeatRequest { .. } => "HeartbeatRequest",
            RaftMessage::HeartbeatResponse => "HeartbeatResponse",
            RaftMessage::AdminKill => "AdminKill",
            RaftMessage::AdminRestart => "AdminRestart",
        }
    }

    /// Only a restart may reach a node that is Dead.
    pub fn reaches_dead_nodes(&self) -> bool {
        matches!(self, RaftMessage::AdminRestart)
    }
}

/// A message a node wants the router to deliver on its behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Unicast { target: String, message: RaftMessage },
    Broadcast { source: String, message: RaftMessage },
}
