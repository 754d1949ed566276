//! Answer countdown and the bus that carries its start/stop edges.

use tokio::sync::broadcast;

/// Seconds shown when a countdown starts.
pub const COUNTDOWN_START: u8 = 5;

/// Edge emitted when the viewer enters or leaves an answer window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The viewer entered an answer window; the countdown restarts at [`COUNTDOWN_START`].
    Start,
    /// The window closed; the countdown halts at zero.
    Stop,
}

/// Result of delivering a tick to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a cancelled run and was ignored.
    Stale,
    /// Value decremented; schedule the next tick for this generation.
    Continue(u64),
    /// Value reached zero; nothing more to schedule.
    Finished,
}

/// Countdown state. Every start or stop bumps the generation so that ticks scheduled by an
/// earlier run are recognisably stale.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u8,
    generation: u64,
}

impl Countdown {
    /// Idle countdown at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to [`COUNTDOWN_START`] and return the generation the first tick must carry.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.remaining = COUNTDOWN_START;
        self.generation
    }

    /// Halt the countdown at zero and invalidate any pending tick.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.remaining = 0;
    }

    /// Consume the tick scheduled for `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation || self.remaining == 0 {
            return TickOutcome::Stale;
        }
        if self.remaining > 1 {
            self.remaining -= 1;
            TickOutcome::Continue(self.generation)
        } else {
            self.remaining = 0;
            TickOutcome::Finished
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// True when no countdown is running.
    pub fn is_idle(&self) -> bool {
        self.remaining == 0
    }
}

/// Start/stop edges fanned out from reconciliation to the mounted surface.
///
/// The surface drains its receiver after every applied snapshot, so the queue only ever holds the
/// edges of a single snapshot.
#[derive(Debug)]
pub struct TimerBus {
    edges: broadcast::Sender<TimerEvent>,
}

impl TimerBus {
    /// Bus that queues up to `capacity` undrained edges per surface.
    pub fn with_capacity(capacity: usize) -> Self {
        let (edges, _) = broadcast::channel(capacity);
        Self { edges }
    }

    /// Attach a surface countdown; only edges fired after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.edges.subscribe()
    }

    /// Fire `event` and return how many countdowns heard it. No surface mounted yet counts as 0.
    pub fn fire(&self, event: TimerEvent) -> usize {
        self.edges.send(event).unwrap_or(0)
    }
}

impl Default for TimerBus {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}
