//! Observability sinks fed by the node workers.
//!
//! Nothing published here feeds back into protocol decisions.

mod console;

pub use self::console::{Visualizer, LOG_OVERFLOW_PLACEHOLDER, MAX_LOG_LINE_LEN};

use crate::raft::NodeState;

pub trait StateSink: Send + Sync {
    /// Called once per worker iteration with the node's latest state.
    fn publish_state(&self, node_id: &str, state: &NodeState);

    /// Called on notable transitions: votes, elections, kills, restarts.
    fn append_log(&self, line: String);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StateSink for NullSink {
    fn publish_state(&self, _node_id: &str, _state: &NodeState) {}

    fn append_log(&self, _line: String) {}
}
