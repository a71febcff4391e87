// Request file poller
// Watches the queue file's modification time and wakes the host once per observed change

use chrono::Local;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;

use super::journal::{JournalWriter, TriggerRecord};
use super::waker::{AutomationError, HostWaker};
use crate::config::BridgeConfig;
use crate::queue::RequestQueue;

/// Timing and retry policy for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub poll_interval: Duration,
    pub post_dispatch_delay: Duration,
    /// Total attempts per dispatch
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    /// Consecutive failed dispatches before the aggregated warning
    pub failure_warning_threshold: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            poll_interval: Duration::from_millis(300),
            post_dispatch_delay: Duration::from_millis(300),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(500),
            failure_warning_threshold: 3,
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &BridgeConfig) -> Self {
        PollSettings {
            poll_interval: config.poll_interval(),
            post_dispatch_delay: config.post_dispatch_delay(),
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff(),
            failure_warning_threshold: config.failure_warning_threshold,
        }
    }
}

/// Everything the loop remembers between ticks
#[derive(Debug, Clone, PartialEq)]
pub struct PollerState {
    pub last_seen_mtime: SystemTime,
    /// Triggers delivered to the host
    pub trigger_count: u64,
    /// Dispatches attempted, delivered or not
    pub dispatch_count: u64,
    pub consecutive_failures: u32,
}

/// Result of one dispatch, after retries
#[derive(Debug)]
pub enum DispatchOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: AutomationError },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DispatchOutcome::Delivered { attempts } | DispatchOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

pub struct Poller<W: HostWaker> {
    queue: RequestQueue,
    waker: W,
    settings: PollSettings,
    state: PollerState,
    journal: Option<JournalWriter>,
}

impl<W: HostWaker> Poller<W> {
    /// Start from the file's current mtime, so requests already on disk wait for the next change
    pub fn new(queue: RequestQueue, waker: W, settings: PollSettings) -> Self {
        let last_seen_mtime = file_mtime(queue.path()).unwrap_or(UNIX_EPOCH);

        Poller {
            queue,
            waker,
            settings,
            state: PollerState {
                last_seen_mtime,
                trigger_count: 0,
                dispatch_count: 0,
                consecutive_failures: 0,
            },
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn waker(&self) -> &W {
        &self.waker
    }

    /// True when the file changed since the last look and holds pending requests
    ///
    /// The new mtime is remembered either way, so one change yields at most one dispatch.
    pub fn observe_change(&mut self) -> bool {
        let Some(mtime) = file_mtime(self.queue.path()) else {
            return false;
        };
        if mtime <= self.state.last_seen_mtime {
            return false;
        }

        self.state.last_seen_mtime = mtime;
        self.queue.has_pending()
    }

    /// One tick: dispatch if the file changed and is non-empty
    pub async fn poll_once(&mut self) -> Option<DispatchOutcome> {
        if !self.observe_change() {
            return None;
        }

        log::info!("New requests detected (#{})", self.state.trigger_count + 1);
        let outcome = self.dispatch().await;
        self.record(&outcome);

        // Give the host time to drain the queue
        tokio::time::sleep(self.settings.post_dispatch_delay).await;

        Some(outcome)
    }

    /// Wake the host, retrying timeouts and script failures within the attempt budget
    pub async fn dispatch(&mut self) -> DispatchOutcome {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.waker.wake_host().await {
                Ok(()) => return DispatchOutcome::Delivered { attempts: attempt },
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    log::warn!("Attempt {} failed ({}), retrying...", attempt, error);
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
                Err(error) => {
                    return DispatchOutcome::Failed {
                        attempts: attempt,
                        error,
                    }
                }
            }
        }
    }

    fn record(&mut self, outcome: &DispatchOutcome) {
        self.state.dispatch_count += 1;
        let sequence = self.state.dispatch_count;

        let record = match outcome {
            DispatchOutcome::Delivered { attempts } => {
                self.state.trigger_count += 1;
                self.state.consecutive_failures = 0;
                log::info!("Trigger sent, completed at {}", Local::now().format("%H:%M:%S"));
                TriggerRecord::delivered(sequence, *attempts)
            }
            DispatchOutcome::Failed { attempts, error } => {
                log::error!("Trigger failed after {} attempt(s): {}", attempts, error);
                if let Some(hint) = error.hint() {
                    log::warn!("{}", hint);
                }

                self.state.consecutive_failures += 1;
                if self.state.consecutive_failures >= self.settings.failure_warning_threshold.max(1) {
                    log::warn!(
                        "{} consecutive trigger failures. Check FL Studio is running with a piano roll open.",
                        self.state.consecutive_failures
                    );
                    self.state.consecutive_failures = 0;
                }
                TriggerRecord::failed(sequence, *attempts, error.to_string())
            }
        };

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.write(&record) {
                log::warn!("Failed to write trigger journal {}: {}", journal.path().display(), e);
            }
        }
    }

    /// Poll until `shutdown` resolves; a dispatch in flight always runs to completion
    pub async fn run<F: Future<Output = ()>>(mut self, shutdown: F) -> PollerState {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            self.poll_once().await;
        }

        self.state
    }
}
