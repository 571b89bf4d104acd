//! Async tick source for the breathing timer
//!
//! A single tokio task owns the `CycleState`. Commands and ticks are handled
//! in one `select!` loop, so a start/stop never lands halfway through a tick
//! and no tick can touch the state once a stop has been processed.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::timer::{CycleState, PhaseDisplay};

/// Recommended tick cadence
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Shutdown,
}

/// Handle to a running breathing timer task
pub struct TimerDriver {
    commands: mpsc::UnboundedSender<Command>,
    display: watch::Receiver<PhaseDisplay>,
    task: JoinHandle<()>,
}

impl TimerDriver {
    /// Spawn the timer task on the current tokio runtime
    pub fn spawn(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (commands, rx) = mpsc::unbounded_channel();
        let (publish, display) = watch::channel(CycleState::idle().display());
        let task = tokio::spawn(run(period, rx, publish));
        Self {
            commands,
            display,
            task,
        }
    }

    /// Queue a start. Returns false if the task has already exited.
    pub fn start(&self) -> bool {
        self.commands.send(Command::Start).is_ok()
    }

    /// Queue a stop. Returns false if the task has already exited.
    pub fn stop(&self) -> bool {
        self.commands.send(Command::Stop).is_ok()
    }

    /// Most recently published display
    pub fn display(&self) -> PhaseDisplay {
        *self.display.borrow()
    }

    /// Receiver that is notified after every processed command or tick
    pub fn subscribe(&self) -> watch::Receiver<PhaseDisplay> {
        self.display.clone()
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "breathing timer task ended abnormally");
        }
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
            Instant::now()
        }
        None => std::future::pending().await,
    }
}

async fn run(
    period: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    publish: watch::Sender<PhaseDisplay>,
) {
    let mut state = CycleState::idle();
    // Only armed while running
    let mut ticker: Option<Interval> = None;
    // Time already fed to the state machine, in whole milliseconds
    let mut accounted = Instant::now();

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Command::Start) => {
                    if !state.is_running() {
                        state = state.start();
                        accounted = Instant::now();
                        ticker = Some(new_ticker(period));
                        tracing::debug!("breathing session started");
                    }
                }
                Some(Command::Stop) => {
                    state = state.stop();
                    ticker = None;
                    tracing::debug!("breathing session stopped");
                }
                Some(Command::Shutdown) | None => break,
            },

            now = next_tick(&mut ticker) => {
                let dt_ms = now.saturating_duration_since(accounted).as_millis() as u64;
                accounted += Duration::from_millis(dt_ms);
                state = state.tick(dt_ms);
            }
        }

        publish.send_replace(state.display());
    }
}
