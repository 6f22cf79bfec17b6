//! Status polling loop with a hard ceiling.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    /// Polling stops unconditionally after this long
    pub ceiling: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ceiling: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe reported completion
    Completed { polls: u64 },
    /// Stopped through the cancellation token
    Cancelled { polls: u64 },
    /// The ceiling timer fired first
    CeilingReached { polls: u64 },
}

/// Runs a probe periodically until it completes, is cancelled, or the
/// ceiling elapses.
pub struct StatusPoller {
    settings: PollerSettings,
    cancel: CancellationToken,
}

impl StatusPoller {
    pub fn new(settings: PollerSettings) -> Self {
        Self {
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Polls `probe` every `interval`, starting immediately.
    ///
    /// The ceiling is enforced by a separate timer task that cancels the loop,
    /// so a slow probe is abandoned at the ceiling rather than awaited.
    pub async fn run<F, Fut>(&self, mut probe: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ControlFlow<()>>,
    {
        let stop = self.cancel.child_token();
        let ceiling_hit = CancellationToken::new();

        let ceiling_timer = {
            let stop = stop.clone();
            let ceiling_hit = ceiling_hit.clone();
            let ceiling = self.settings.ceiling;
            tokio::spawn(async move {
                tokio::time::sleep(ceiling).await;
                tracing::info!("[StatusPoller] Ceiling of {:?} reached, stopping", ceiling);
                ceiling_hit.cancel();
                stop.cancel();
            })
        };

        let mut polls = 0u64;
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break None,
                _ = interval.tick() => {}
            }

            polls += 1;
            let flow = tokio::select! {
                biased;
                _ = stop.cancelled() => break None,
                flow = probe() => flow,
            };
            if flow.is_break() {
                tracing::debug!("[StatusPoller] Probe completed after {} poll(s)", polls);
                break Some(PollOutcome::Completed { polls });
            }
        };

        ceiling_timer.abort();
        match outcome {
            Some(outcome) => outcome,
            None if ceiling_hit.is_cancelled() => PollOutcome::CeilingReached { polls },
            None => PollOutcome::Cancelled { polls },
        }
    }
}
