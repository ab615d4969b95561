//! Per-question countdown driven by a cancellable tokio task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// One elapsed period of the countdown that was current when it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Owns at most one running countdown.
///
/// Each `start` cancels the previous countdown and bumps the generation, so a
/// tick already queued by an older countdown is recognisably stale. Dropping
/// the timer aborts its task.
#[derive(Debug)]
pub struct QuestionTimer {
    period: Duration,
    generation: u64,
    tx: mpsc::UnboundedSender<Tick>,
    task: Option<JoinHandle<()>>,
}

impl QuestionTimer {
    /// One tick per second.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Tick>) {
        Self::with_period(Duration::from_secs(1))
    }

    #[must_use]
    pub fn with_period(period: Duration) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            period,
            generation: 0,
            tx,
            task: None,
        };
        (timer, rx)
    }

    /// Begin a fresh countdown, cancelling any running one. Returns its generation.
    pub fn start(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let tx = self.tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));
        generation
    }

    /// Stop the running countdown, if any. Ticks it already queued become stale.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// True if `tick` came from the countdown that is running now.
    #[must_use]
    pub fn is_current(&self, tick: Tick) -> bool {
        self.is_running() && tick.generation == self.generation
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
