use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::raft::{ElectionTimer, RaftError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub node_ids: Vec<String>,
    pub election_timeout_min_secs: u64, // inclusive
    pub election_timeout_max_secs: u64, // inclusive
    pub heartbeat_interval_ms: u64,
    pub vote_delay_ms: u64,
    pub log_window: usize,
    pub refresh_interval_ms: u64,
}

impl ClusterConfig {
    /// Cluster of `count` nodes named `n1..nN`, other settings default.
    pub fn with_nodes(count: usize) -> Self {
        Self {
            node_ids: (1..=count).map(|i| format!("n{i}")).collect(),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RaftError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RaftError> {
        if self.node_ids.is_empty() {
            return Err(RaftError::InvalidConfig("cluster has no nodes".to_string()));
        }

        let mut seen = HashSet::new();
        for id in &self.node_ids {
            if id.trim().is_empty() {
                return Err(RaftError::InvalidConfig("node id is blank".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(RaftError::DuplicateNode(id.clone()));
            }
        }

        if self.election_timeout_min_secs == 0 {
            return Err(RaftError::InvalidConfig(
                "election timeout must be at least one second".to_string(),
            ));
        }
        if self.election_timeout_min_secs > self.election_timeout_max_secs {
            return Err(RaftError::InvalidConfig(format!(
                "election timeout range {}..={} is empty",
                self.election_timeout_min_secs, self.election_timeout_max_secs
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(RaftError::InvalidConfig(
                "heartbeat interval must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn election_timer(&self) -> ElectionTimer {
        ElectionTimer::new(self.election_timeout_min_secs, self.election_timeout_max_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn vote_delay(&self) -> Duration {
        Duration::from_millis(self.vote_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_ids: (1..=5).map(|i| format!("n{i}")).collect(),
            election_timeout_min_secs: 3,
            election_timeout_max_secs: 10,
            heartbeat_interval_ms: 1000,
            vote_delay_ms: 2000,
            log_window: 10,
            refresh_interval_ms: 500,
        }
    }
}
