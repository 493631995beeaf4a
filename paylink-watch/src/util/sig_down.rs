//! Shutdown on SIGINT or SIGTERM.
//!
//! [`SigDown`] listens in a background task and cancels a
//! [`CancellationToken`] when the process is asked to stop, so the watch loop
//! can give up cleanly instead of being killed mid-request. On platforms
//! without Unix signals only Ctrl+C is observed.

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels a token on the first shutdown signal.
///
/// Dropping it stops listening; the token stays uncancelled.
#[derive(Debug)]
pub struct SigDown {
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl SigDown {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if a handler cannot be registered.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[allow(clippy::unnecessary_wraps)] // only fallible on Unix
    pub fn try_new() -> Result<Self, std::io::Error> {
        let token = CancellationToken::new();
        let trigger = token.clone();

        #[cfg(unix)]
        let listener = {
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, stopping"),
                    _ = sigint.recv() => tracing::info!("received SIGINT, stopping"),
                }
                trigger.cancel();
            })
        };

        #[cfg(not(unix))]
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl+C, stopping");
                trigger.cancel();
            }
        });

        Ok(Self { token, listener })
    }

    /// A token cancelled when a shutdown signal arrives.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for SigDown {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
