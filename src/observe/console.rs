use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use super::StateSink;
use crate::raft::NodeState;

pub const MAX_LOG_LINE_LEN: usize = 512;
pub const LOG_OVERFLOW_PLACEHOLDER: &str = "buffer overflow";

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

#[derive(Debug, Default)]
struct Screen {
    states: BTreeMap<String, NodeState>,
    logs: VecDeque<String>,
}

/// Console view of the cluster: a rolling log window above one status
/// line per node.
#[derive(Debug)]
pub struct Visualizer {
    window: usize,
    screen: Mutex<Screen>,
}

impl Visualizer {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            screen: Mutex::new(Screen::default()),
        }
    }

    pub fn logs(&self) -> Vec<String> {
        self.lock().logs.iter().cloned().collect()
    }

    pub fn state_of(&self, node_id: &str) -> Option<NodeState> {
        self.lock().states.get(node_id).cloned()
    }

    pub fn render(&self) -> String {
        let screen = self.lock();
        let mut out = String::new();

        for line in &screen.logs {
            out.push_str(line);
            out.push('\n');
        }
        for _ in screen.logs.len()..self.window {
            out.push('\n');
        }

        for (id, state) in &screen.states {
            let timeout = state.election_timeout.map_or(-1, |t| t as i64);
            let _ = writeln!(
                out,
                "{} : state [{}], term ({}), votes({}), election_timeout({}) heartbeat({})",
                id, state.role, state.term, state.votes_received, timeout, state.heartbeat_count
            );
        }
        out
    }

    /// Redraw the terminal.
    pub fn spin_once(&self) -> io::Result<()> {
        let frame = self.render();
        let mut stdout = io::stdout().lock();
        stdout.write_all(CLEAR_SCREEN.as_bytes())?;
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for Visualizer {
    fn publish_state(&self, node_id: &str, state: &NodeState) {
        self.lock().states.insert(node_id.to_string(), state.clone());
    }

    fn append_log(&self, line: String) {
        let line = if line.len() > MAX_LOG_LINE_LEN {
            LOG_OVERFLOW_PLACEHOLDER.to_string()
        } else {
            line
        };

        let mut screen = self.lock();
        screen.logs.push_back(line);
        while screen.logs.len() > self.window {
            screen.logs.pop_front();
        }
    }
}
