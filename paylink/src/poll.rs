//! Bounded confirmation polling.
//!
//! After a grace delay the poller fetches one page of recent signatures for
//! the watched address on every interval tick and looks for the request's
//! memo. It stops on the first match or after `max_attempts` ticks.
//!
//! Every tick counts against the budget, including ticks whose fetch failed.
//! A failed fetch only updates the status text; it never ends the loop early.
//! The effective timeout is therefore `grace_delay + max_attempts * interval`.
//!
//! [`PollState`] holds the decision logic and has no timers, so it can be
//! driven by hand. [`ConfirmationPoller`] runs it on a tokio task.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;

use crate::memo::Memo;

/// Polling parameters.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Wait before the first tick, giving the user time to scan the QR code.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "grace_delay_ms")]
    pub grace_delay: Duration,

    /// Time between ticks.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "interval_ms")]
    pub interval: Duration,

    /// Ticks before giving up.
    pub max_attempts: u32,

    /// Signatures fetched per tick.
    pub signature_limit: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_secs(3),
            interval: Duration::from_secs(2),
            max_attempts: 90,
            signature_limit: 10,
        }
    }
}

impl PollConfig {
    /// Upper bound on how long a poll can run.
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.grace_delay + self.interval.saturating_mul(self.max_attempts)
    }
}

/// One recent transaction touching the watched address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMemo {
    /// Transaction signature.
    pub signature: String,
    /// Memo log of the transaction, if it had one.
    pub memo: Option<String>,
}

/// Source of recent signatures for the address being watched.
///
/// Implementations already know which address to query: the recipient for
/// native payments, or its associated token account.
pub trait MemoSource: Send + Sync + 'static {
    /// Fetch failure. Treated as transient by the poller.
    type Error: fmt::Display + Send;

    /// Returns up to `limit` of the most recent signatures.
    fn recent_memos(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SignatureMemo>, Self::Error>> + Send;
}

/// Progress reported by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// Still scanning; human-readable status.
    Status(String),
    /// The memo was found. Terminal.
    Confirmed {
        /// Signature of the matching transaction.
        signature: String,
    },
    /// The attempt budget ran out. Terminal.
    TimedOut {
        /// Ticks spent.
        attempts: u32,
    },
}

impl PollEvent {
    /// Whether polling ends with this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Status(_))
    }
}

/// Timer-free polling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    memo: Memo,
    attempt: u32,
    max_attempts: u32,
    outcome: Option<PollEvent>,
}

impl PollState {
    /// Starts at attempt zero. A budget of zero is treated as one.
    #[must_use]
    pub fn new(memo: Memo, max_attempts: u32) -> Self {
        Self {
            memo,
            attempt: 0,
            max_attempts: max_attempts.max(1),
            outcome: None,
        }
    }

    /// Ticks spent so far.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The memo being looked for.
    #[must_use]
    pub const fn memo(&self) -> &Memo {
        &self.memo
    }

    /// Whether a terminal event was produced.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records one tick.
    ///
    /// `page` is the fetched signatures, or the fetch error rendered as text.
    /// A match wins even on the last attempt. Once finished, the terminal
    /// event is returned again and the page is ignored.
    pub fn observe(&mut self, page: Result<&[SignatureMemo], String>) -> PollEvent {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        self.attempt += 1;

        let found = page.as_ref().ok().and_then(|page| {
            page.iter().find(|entry| {
                entry
                    .memo
                    .as_deref()
                    .is_some_and(|memo| self.memo.matches(memo))
            })
        });
        if let Some(entry) = found {
            return self.finish(PollEvent::Confirmed {
                signature: entry.signature.clone(),
            });
        }

        if self.attempt >= self.max_attempts {
            return self.finish(PollEvent::TimedOut {
                attempts: self.attempt,
            });
        }

        let status = match page {
            Ok(_) => format!(
                "Waiting for payment ({}/{})",
                self.attempt, self.max_attempts
            ),
            Err(_) => format!(
                "Network hiccup, retrying ({}/{})",
                self.attempt, self.max_attempts
            ),
        };
        PollEvent::Status(status)
    }

    fn finish(&mut self, event: PollEvent) -> PollEvent {
        self.outcome = Some(event.clone());
        event
    }
}

struct Running {
    token: CancellationToken,
    alive: Arc<Mutex<bool>>,
    handle: JoinHandle<()>,
}

/// Runs at most one polling loop at a time.
///
/// Once [`stop`](Self::stop) returns, the event callback of the stopped loop
/// is never invoked again. Dropping the poller stops it.
#[derive(Default)]
pub struct ConfirmationPoller {
    running: Option<Running>,
}

impl fmt::Debug for ConfirmationPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationPoller")
            .field("running", &self.is_running())
            .finish()
    }
}

impl ConfirmationPoller {
    /// Creates an idle poller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling for `memo`, stopping any previous loop first.
    ///
    /// `on_event` receives every [`PollEvent`]; the loop ends after the first
    /// terminal one.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start<S, F>(&mut self, source: Arc<S>, memo: Memo, config: PollConfig, on_event: F)
    where
        S: MemoSource,
        F: FnMut(PollEvent) + Send + 'static,
    {
        self.stop();

        let token = CancellationToken::new();
        let alive = Arc::new(Mutex::new(true));

        #[cfg(feature = "telemetry")]
        tracing::info!(%memo, max_attempts = config.max_attempts, "confirmation polling started");

        let handle = tokio::spawn(run(
            source,
            memo,
            config,
            token.clone(),
            Arc::clone(&alive),
            on_event,
        ));
        self.running = Some(Running {
            token,
            alive,
            handle,
        });
    }

    /// Stops the current loop, if any.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        *running.alive.lock().unwrap_or_else(PoisonError::into_inner) = false;
        running.token.cancel();
        running.handle.abort();

        #[cfg(feature = "telemetry")]
        tracing::debug!("confirmation polling stopped");
    }

    /// Whether a loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.token.is_cancelled() && !r.handle.is_finished())
    }
}

impl Drop for ConfirmationPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S, F>(
    source: Arc<S>,
    memo: Memo,
    config: PollConfig,
    token: CancellationToken,
    alive: Arc<Mutex<bool>>,
    mut on_event: F,
) where
    S: MemoSource,
    F: FnMut(PollEvent) + Send + 'static,
{
    tokio::select! {
        biased;
        () = token.cancelled() => return,
        () = sleep(config.grace_delay) => {}
    }

    let period = config.interval.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut state = PollState::new(memo, config.max_attempts);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let page = tokio::select! {
            biased;
            () = token.cancelled() => return,
            page = source.recent_memos(config.signature_limit) => page,
        };

        #[cfg(feature = "telemetry")]
        if let Err(err) = &page {
            tracing::debug!(attempt = state.attempt() + 1, error = %err, "signature fetch failed");
        }

        let event = state.observe(page.as_deref().map_err(ToString::to_string));
        let terminal = event.is_terminal();

        #[cfg(feature = "telemetry")]
        match &event {
            PollEvent::Confirmed { signature } => {
                tracing::info!(%signature, attempt = state.attempt(), "payment confirmed");
            }
            PollEvent::TimedOut { attempts } => {
                tracing::info!(attempts, "confirmation polling timed out");
            }
            PollEvent::Status(_) => {}
        }

        {
            let alive = alive.lock().unwrap_or_else(PoisonError::into_inner);
            if !*alive || token.is_cancelled() {
                return;
            }
            on_event(event);
        }

        if terminal {
            token.cancel();
            return;
        }
    }
}
