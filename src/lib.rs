// Election core
pub mod raft;
pub mod config;

// Collaborators around the core
pub mod observe;
pub mod harness;

// Public exports
pub use config::ClusterConfig;
pub use harness::AdminCommand;
pub use observe::{NullSink, StateSink, Visualizer};
pub use raft::{Cluster, NodeRole, NodeState, RaftError, RaftMessage, Router};
