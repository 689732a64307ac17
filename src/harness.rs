use std::ops::ControlFlow;

use log::info;

use crate::raft::Router;

/// Operator commands typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Kill(String),
    Restart(String),
    Quit,
}

impl AdminCommand {
    /// `d <id>` kills, `r <id>` restarts, `q` quits.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut chars = line.chars();
        let cmd = chars.next()?;
        let arg = chars.as_str().trim();

        match cmd {
            'q' if arg.is_empty() => Some(AdminCommand::Quit),
            'd' if !arg.is_empty() => Some(AdminCommand::Kill(arg.to_string())),
            'r' if !arg.is_empty() => Some(AdminCommand::Restart(arg.to_string())),
            _ => None,
        }
    }

    pub fn apply(&self, router: &Router) -> ControlFlow<()> {
        match self {
            AdminCommand::Kill(id) => {
                info!("Admin: kill {id}");
                router.kill_node(id);
            }
            AdminCommand::Restart(id) => {
                info!("Admin: restart {id}");
                router.restart_node(id);
            }
            AdminCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }
}
