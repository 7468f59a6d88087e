//! Recording timer
//!
//! Periodic tick source for the recording clock. Each start opens a new
//! generation so ticks queued by an earlier run can be told apart and
//! dropped.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub struct RecordingTimer {
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
    tick_tx: mpsc::UnboundedSender<u64>,
    tick_rx: mpsc::UnboundedReceiver<u64>,
}

impl RecordingTimer {
    pub fn new(period: Duration) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            period,
            generation: 0,
            task: None,
            tick_tx,
            tick_rx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start ticking; the first tick arrives one period from now
    pub fn start(&mut self) {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let tick_tx = self.tick_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tick_tx.send(generation).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!("Recording timer started (generation {})", generation);
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Recording timer stopped (generation {})", self.generation);
        }
    }

    /// Start or stop so the timer runs exactly while `recording` holds
    pub fn sync(&mut self, recording: bool) {
        match (recording, self.is_running()) {
            (true, false) => self.start(),
            (false, true) => self.stop(),
            _ => {}
        }
    }

    /// Wait for the next tick from any generation
    pub async fn next_tick(&mut self) -> Option<u64> {
        self.tick_rx.recv().await
    }

    /// Whether a tick belongs to the current, still running generation
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let mut timer = RecordingTimer::new(Duration::from_secs(1));
        timer.start();

        let mut ticks = 0;
        for _ in 0..3 {
            let generation = timer.next_tick().await.unwrap();
            assert!(timer.is_current(generation));
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_old_ticks() {
        let mut timer = RecordingTimer::new(Duration::from_secs(1));
        timer.start();
        let first = timer.next_tick().await.unwrap();

        timer.start();
        assert!(!timer.is_current(first));
        let second = timer.next_tick().await.unwrap();
        assert!(timer.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_follows_recording_flag() {
        let mut timer = RecordingTimer::new(Duration::from_secs(1));
        timer.sync(true);
        assert!(timer.is_running());
        timer.sync(false);
        assert!(!timer.is_running());

        time::sleep(Duration::from_secs(5)).await;
        assert!(timer.tick_rx.try_recv().is_err());
    }
}
