//! The watch loop.

use std::process::ExitCode;
use std::sync::Arc;

use paylink::{ConfirmationPoller, Memo, MemoSource, PollConfig, PollEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The memo was found on chain.
    Confirmed {
        /// Signature of the paying transaction.
        signature: String,
    },
    /// The attempt budget ran out.
    TimedOut {
        /// Ticks spent.
        attempts: u32,
    },
    /// Shutdown was requested first.
    Cancelled,
}

impl Outcome {
    /// Whether the payment went through.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Zero only for a confirmed payment.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.is_confirmed() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Polls `source` for `memo` until it confirms, times out or `shutdown` fires.
///
/// Status updates are logged at `info`.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub async fn watch<S: MemoSource>(
    source: Arc<S>,
    memo: Memo,
    config: PollConfig,
    shutdown: CancellationToken,
) -> Outcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut poller = ConfirmationPoller::new();
    poller.start(source, memo, config, move |event| {
        tx.send(event).ok();
    });

    loop {
        let event = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                poller.stop();
                return Outcome::Cancelled;
            }
            event = rx.recv() => event,
        };
        match event {
            Some(PollEvent::Status(status)) => tracing::info!(%status, "waiting"),
            Some(PollEvent::Confirmed { signature }) => return Outcome::Confirmed { signature },
            Some(PollEvent::TimedOut { attempts }) => return Outcome::TimedOut { attempts },
            None => {
                tracing::warn!("poller ended without a result");
                return Outcome::Cancelled;
            }
        }
    }
}
