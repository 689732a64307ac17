use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use super::RaftMessage;

/// Why a node worker woke up.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    /// Everything that was queued at wake-up time, in arrival order.
    Messages(Vec<RaftMessage>),
    TimedOut,
    Shutdown,
}

/// Receiving half of a node's unbounded FIFO queue, paired with the
/// node's shutdown signal.
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<RaftMessage>,
    shutdown: watch::Receiver<bool>,
}

impl Inbox {
    pub fn new(rx: mpsc::UnboundedReceiver<RaftMessage>, shutdown: watch::Receiver<bool>) -> Self {
        Self { rx, shutdown }
    }

    /// Wait for messages, the deadline, or shutdown, whichever comes first.
    /// `None` waits without a deadline.
    pub async fn recv(&mut self, deadline: Option<Duration>) -> Received {
        if *self.shutdown.borrow() {
            return Received::Shutdown;
        }

        let Inbox { rx, shutdown } = self;
        let first = tokio::select! {
            biased;
            _ = shutdown.changed() => return Received::Shutdown,
            first = Self::next(rx, deadline) => first,
        };

        match first {
            Some(Some(message)) => {
                let mut batch = vec![message];
                while let Ok(message) = rx.try_recv() {
                    batch.push(message);
                }
                Received::Messages(batch)
            }
            // Every sender is gone; nothing can ever arrive again.
            Some(None) => Received::Shutdown,
            None => Received::TimedOut,
        }
    }

    /// Resolves once shutdown is requested or its owner has gone away.
    pub async fn recv_shutdown(&mut self) {
        while !*self.shutdown.borrow_and_update() {
            if self.shutdown.changed().await.is_err() {
                return;
            }
        }
    }

    /// Closes the queue and returns whatever was still pending.
    pub fn close(&mut self) -> Vec<RaftMessage> {
        self.rx.close();
        let mut pending = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            pending.push(message);
        }
        pending
    }

    async fn next(
        rx: &mut mpsc::UnboundedReceiver<RaftMessage>,
        deadline: Option<Duration>,
    ) -> Option<Option<RaftMessage>> {
        match deadline {
            Some(deadline) => timeout(deadline, rx.recv()).await.ok(),
            None => Some(rx.recv().await),
        }
    }
}
