use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

/// Delivers countdown ticks after a fixed interval. At most one tick is pending at a time and
/// a pending tick can always be cancelled before it fires.
#[derive(Debug)]
pub struct TickScheduler {
    interval: Duration,
    sender: mpsc::UnboundedSender<u64>,
    pending: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Scheduler delivering generations on `sender` after `interval`.
    pub fn new(interval: Duration, sender: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            interval,
            sender,
            pending: None,
        }
    }

    /// Replace any pending tick with one carrying `generation`.
    pub fn schedule(&mut self, generation: u64) {
        self.cancel();
        let sender = self.sender.clone();
        let interval = self.interval;
        self.pending = Some(tokio::spawn(async move {
            sleep(interval).await;
            let _ = sender.send(generation);
        }));
    }

    /// Abort the pending tick, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// A tick is scheduled and not yet delivered.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
