//! The payment state machine a widget renders.
//!
//! A [`PaymentSession`] owns one [`PaymentRequest`] and composes the message
//! channel, the connect flow and the confirmation poller into a single
//! observable [`PaymentPhase`].
//!
//! ```text
//! Idle --show_qr--> Scanning --memo found--> Success
//!  |                   |
//!  |                   +--budget spent--> Error --retry--> Scanning
//!  |
//!  +--connect_wallet--> Connecting --connected--> Processing --paid--> Success
//!                           |                         |
//!                           +------failed------> Error <--payment error
//! ```
//!
//! Subscribers get every transition through a `watch` channel. After
//! [`close`](PaymentSession::close) the phase never changes again.

use std::fmt;
use std::sync::Arc;

use paylink_proto::WalletInfo;
use tokio::sync::watch;

use crate::channel::{InboundEvent, MessageChannel, MessagePort};
use crate::config::{HostContext, SessionConfig};
use crate::connect::{ConnectEvent, ConnectFlow};
use crate::error::ConnectError;
use crate::origin::FrameEnvironment;
use crate::poll::{ConfirmationPoller, MemoSource, PollConfig, PollEvent};
use crate::request::PaymentRequest;

/// A terminal failure shown with a retry action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentFailure {
    /// The parent could not connect the wallet.
    #[error("{wallet_name}: {message}")]
    ConnectFailed {
        /// Wallet the user picked.
        wallet_name: String,
        /// Reason reported by the parent.
        message: String,
    },
    /// The parent reported a failed payment.
    #[error("{message}")]
    PaymentFailed {
        /// Reason reported by the parent.
        message: String,
    },
    /// No matching transaction showed up in time.
    #[error("payment not detected after {attempts} checks")]
    Timeout {
        /// Checks performed.
        attempts: u32,
    },
}

/// What the widget should currently display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaymentPhase {
    /// Choosing between QR and wallet.
    #[default]
    Idle,
    /// QR shown, watching the ledger.
    Scanning {
        /// Latest poller status, once the first check ran.
        status: Option<String>,
    },
    /// Waiting for the parent to connect a wallet.
    Connecting {
        /// Wallet the user picked.
        wallet_name: String,
    },
    /// Wallet connected, waiting for the payment outcome.
    Processing {
        /// Connected wallet.
        wallet_name: String,
    },
    /// Payment landed.
    Success {
        /// Transaction signature.
        signature: String,
    },
    /// Something failed; [`PaymentSession::retry`] recovers.
    Error(PaymentFailure),
}

impl PaymentPhase {
    /// Whether the phase ends the payment attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error(_))
    }
}

/// Operations the session refuses.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was closed.
    #[error("payment session is closed")]
    Closed,
    /// The host page does not bridge wallet connections.
    #[error("the host page does not support wallet connections")]
    BridgeUnavailable,
    /// The wallet is not in the host's sanitized list.
    #[error("unknown wallet: {0}")]
    UnknownWallet(String),
    /// The connect request failed locally.
    #[error(transparent)]
    Connect(#[from] ConnectError),
}

/// One payment attempt, from QR or wallet choice to a terminal phase.
pub struct PaymentSession<P, S> {
    channel: MessageChannel<P>,
    connect: ConnectFlow,
    host: HostContext,
    request: PaymentRequest,
    source: Arc<S>,
    poller: ConfirmationPoller,
    poll_config: PollConfig,
    phase: Arc<watch::Sender<PaymentPhase>>,
    closed: bool,
}

impl<P, S> fmt::Debug for PaymentSession<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSession")
            .field("memo", self.request.memo())
            .field("phase", &*self.phase.borrow())
            .field("poller", &self.poller)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<P: MessagePort, S: MemoSource> PaymentSession<P, S> {
    /// Creates an idle session.
    ///
    /// `source` must already watch the address `request` pays into.
    pub fn new<E: FrameEnvironment + ?Sized>(
        port: P,
        env: &E,
        host: HostContext,
        request: PaymentRequest,
        source: Arc<S>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            channel: MessageChannel::new(port, env, &config.channel),
            connect: ConnectFlow::new(config.request_ids),
            host,
            request,
            source,
            poller: ConfirmationPoller::new(),
            poll_config: config.poll,
            phase: Arc::new(watch::Sender::new(PaymentPhase::Idle)),
            closed: false,
        }
    }

    /// Shows the QR code and starts watching the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after [`close`](Self::close).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn show_qr(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.connect.reset();
        self.set_phase(PaymentPhase::Scanning { status: None });

        let phase = Arc::clone(&self.phase);
        self.poller.start(
            Arc::clone(&self.source),
            self.request.memo().clone(),
            self.poll_config,
            move |event| {
                let next = match event {
                    PollEvent::Status(status) => PaymentPhase::Scanning {
                        status: Some(status),
                    },
                    PollEvent::Confirmed { signature } => PaymentPhase::Success { signature },
                    PollEvent::TimedOut { attempts } => {
                        PaymentPhase::Error(PaymentFailure::Timeout { attempts })
                    }
                };
                phase.send_replace(next);
            },
        );
        Ok(())
    }

    /// Asks the parent to connect `wallet_name` and pay.
    ///
    /// Stops any QR polling once the request is out.
    ///
    /// # Errors
    ///
    /// Fails without side effects when the session is closed, the host has
    /// no wallet bridge, the wallet is unknown, or the connect flow refuses.
    pub fn connect_wallet(
        &mut self,
        wallet_name: &str,
        custom_amount: Option<&str>,
    ) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !self.host.supports_wallet_connect() {
            return Err(SessionError::BridgeUnavailable);
        }
        if self.host.wallet(wallet_name).is_none() {
            return Err(SessionError::UnknownWallet(wallet_name.to_owned()));
        }
        self.connect.request_connect(
            &self.channel,
            wallet_name,
            custom_amount,
            self.request.amount(),
            self.request.currency(),
        )?;

        self.poller.stop();
        self.set_phase(PaymentPhase::Connecting {
            wallet_name: wallet_name.to_owned(),
        });
        Ok(())
    }

    /// Feeds a `message` event received by the frame.
    ///
    /// Events that fail origin or shape checks are dropped and change
    /// nothing.
    pub fn handle_event(&mut self, event: &InboundEvent) -> ConnectEvent {
        if self.closed {
            return ConnectEvent::Ignored;
        }
        let Ok(message) = self.channel.accept(event) else {
            return ConnectEvent::Ignored;
        };

        let outcome = self.connect.on_message(&message);
        match &outcome {
            ConnectEvent::Ignored => {}
            ConnectEvent::Failed { wallet_name, error } => {
                self.set_phase(PaymentPhase::Error(PaymentFailure::ConnectFailed {
                    wallet_name: wallet_name.clone(),
                    message: error.clone(),
                }));
            }
            ConnectEvent::Connected { wallet_name, .. } => {
                self.set_phase(PaymentPhase::Processing {
                    wallet_name: wallet_name.clone(),
                });
            }
            ConnectEvent::Paid { signature } => {
                self.poller.stop();
                self.set_phase(PaymentPhase::Success {
                    signature: signature.clone(),
                });
            }
            ConnectEvent::PaymentFailed { error } => {
                self.set_phase(PaymentPhase::Error(PaymentFailure::PaymentFailed {
                    message: error.clone(),
                }));
            }
        }
        outcome
    }

    /// Recovers from an error.
    ///
    /// A QR timeout starts scanning again with a fresh attempt budget. Any
    /// other failure resets the connect flow and returns to idle.
    pub fn retry(&mut self) {
        if self.closed {
            return;
        }
        self.poller.stop();
        self.connect.reset();
        let timed_out = matches!(
            *self.phase.borrow(),
            PaymentPhase::Error(PaymentFailure::Timeout { .. })
        );
        if timed_out && self.show_qr().is_ok() {
            return;
        }
        self.set_phase(PaymentPhase::Idle);
    }

    /// Swaps in a new request, e.g. after the amount changed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after [`close`](Self::close).
    pub fn replace_request(&mut self, request: PaymentRequest) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.poller.stop();
        self.connect.reset();
        self.request = request;
        self.set_phase(PaymentPhase::Idle);
        Ok(())
    }

    /// Tears the session down. Nothing changes the phase afterwards.
    pub fn close(&mut self) {
        self.poller.stop();
        self.connect.reset();
        self.closed = true;

        #[cfg(feature = "telemetry")]
        tracing::debug!(memo = %self.request.memo(), "payment session closed");
    }

    /// Watches phase changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PaymentPhase> {
        self.phase.subscribe()
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> PaymentPhase {
        self.phase.borrow().clone()
    }

    /// Wallets the host offers.
    #[must_use]
    pub fn wallets(&self) -> &[WalletInfo] {
        self.host.wallets()
    }

    /// The request being paid.
    #[must_use]
    pub const fn request(&self) -> &PaymentRequest {
        &self.request
    }

    /// The underlying channel.
    #[must_use]
    pub const fn channel(&self) -> &MessageChannel<P> {
        &self.channel
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    const fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn set_phase(&self, next: PaymentPhase) {
        #[cfg(feature = "telemetry")]
        tracing::debug!(phase = ?next, "payment phase changed");
        self.phase.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::channel::tests::RecordingPort;
    use crate::memo::Memo;
    use crate::origin::StaticFrame;
    use crate::poll::SignatureMemo;
    use crate::request::CurrencySpec;

    const PARENT: &str = "https://shop.example";

    /// Source that returns the matching memo once `hits` is reached.
    struct LedgerSource {
        memo: String,
        hit_on: u32,
        calls: AtomicU32,
    }

    impl MemoSource for LedgerSource {
        type Error = String;

        async fn recent_memos(&self, _limit: usize) -> Result<Vec<SignatureMemo>, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                return Err("rpc unavailable".into());
            }
            if call >= self.hit_on {
                return Ok(vec![SignatureMemo {
                    signature: "5confirmed".into(),
                    memo: Some(format!("[{}] {}", self.memo.len(), self.memo)),
                }]);
            }
            Ok(Vec::new())
        }
    }

    /// Source whose first fetch blocks until released.
    struct GatedSource {
        memo: String,
        gate: Notify,
        calls: AtomicU32,
    }

    impl MemoSource for GatedSource {
        type Error = String;

        async fn recent_memos(&self, _limit: usize) -> Result<Vec<SignatureMemo>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(vec![SignatureMemo {
                signature: "late".into(),
                memo: Some(self.memo.clone()),
            }])
        }
    }

    fn request() -> PaymentRequest {
        let usdc = CurrencySpec {
            symbol: "USDC",
            decimals: 6,
            mint: Some("mint"),
        };
        PaymentRequest::new("merchant", Decimal::new(25, 1), &usdc, |r| {
            format!("qr:{}", r.memo())
        })
        .unwrap()
    }

    fn host() -> HostContext {
        HostContext::new(
            &json!([{ "name": "Phantom", "installed": true }, { "name": "Solflare" }]),
            true,
        )
    }

    fn config(max_attempts: u32) -> SessionConfig {
        SessionConfig {
            poll: PollConfig {
                grace_delay: Duration::from_secs(3),
                interval: Duration::from_secs(2),
                max_attempts,
                signature_limit: 10,
            },
            ..SessionConfig::default()
        }
    }

    fn session<S: MemoSource>(
        source: Arc<S>,
        host: HostContext,
        max_attempts: u32,
    ) -> PaymentSession<RecordingPort, S> {
        let env = StaticFrame::new("https://widget.example").with_referrer("https://shop.example/pay");
        PaymentSession::new(
            RecordingPort::default(),
            &env,
            host,
            request(),
            source,
            &config(max_attempts),
        )
    }

    fn ledger(memo: &Memo, hit_on: u32) -> Arc<LedgerSource> {
        Arc::new(LedgerSource {
            memo: memo.to_string(),
            hit_on,
            calls: AtomicU32::new(0),
        })
    }

    fn parent(data: serde_json::Value) -> InboundEvent {
        InboundEvent::from_parent(PARENT, data)
    }

    async fn wait_terminal(rx: &mut watch::Receiver<PaymentPhase>) -> PaymentPhase {
        rx.wait_for(PaymentPhase::is_terminal).await.unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_qr_path_confirms() {
        let request = request();
        let source = ledger(request.memo(), 3);
        let mut session = session(Arc::clone(&source), host(), 10);
        session.replace_request(request).unwrap();
        let mut rx = session.subscribe();

        session.show_qr().unwrap();
        assert_eq!(session.phase(), PaymentPhase::Scanning { status: None });

        let phase = wait_terminal(&mut rx).await;
        assert_eq!(
            phase,
            PaymentPhase::Success {
                signature: "5confirmed".into()
            }
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_qr_path_times_out_and_retries() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(Arc::clone(&source), host(), 4);
        let mut rx = session.subscribe();

        session.show_qr().unwrap();
        assert_eq!(
            wait_terminal(&mut rx).await,
            PaymentPhase::Error(PaymentFailure::Timeout { attempts: 4 })
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);

        session.retry();
        assert_eq!(session.phase(), PaymentPhase::Scanning { status: None });

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert_eq!(
            wait_terminal(&mut rx).await,
            PaymentPhase::Error(PaymentFailure::Timeout { attempts: 4 })
        );
        assert_eq!(source.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_fetch_freezes_phase() {
        let request = request();
        let source = Arc::new(GatedSource {
            memo: request.memo().to_string(),
            gate: Notify::new(),
            calls: AtomicU32::new(0),
        });
        let mut session = session(Arc::clone(&source), host(), 10);
        session.replace_request(request).unwrap();

        session.show_qr().unwrap();
        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        session.close();
        source.gate.notify_waiters();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(session.phase(), PaymentPhase::Scanning { status: None });
        assert!(matches!(session.show_qr(), Err(SessionError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_path_success() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(source, host(), 10);

        session.connect_wallet("Phantom", None).unwrap();
        assert_eq!(
            session.phase(),
            PaymentPhase::Connecting {
                wallet_name: "Phantom".into()
            }
        );
        let sent = session.channel().port().sent();
        assert_eq!(sent[0].1, PARENT);
        assert_eq!(sent[0].0["amount"], 2.5);
        let request_id = sent[0].0["requestId"].clone();

        session.handle_event(&parent(json!({
            "type": "walletConnectResult",
            "walletName": "Phantom",
            "success": true,
            "requestId": request_id,
        })));
        assert_eq!(
            session.phase(),
            PaymentPhase::Processing {
                wallet_name: "Phantom".into()
            }
        );

        session.handle_event(&parent(json!({ "type": "paymentSuccess", "signature": "5sig" })));
        assert_eq!(
            session.phase(),
            PaymentPhase::Success {
                signature: "5sig".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_connect_failure_is_retryable() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(source, host(), 10);
        session.connect_wallet("Solflare", Some("4")).unwrap();
        session.handle_event(&parent(json!({
            "type": "walletConnectResult",
            "walletName": "Solflare",
            "success": false,
            "error": "User rejected the request"
        })));
        assert_eq!(
            session.phase(),
            PaymentPhase::Error(PaymentFailure::ConnectFailed {
                wallet_name: "Solflare".into(),
                message: "User rejected the request".into()
            })
        );

        session.retry();
        assert_eq!(session.phase(), PaymentPhase::Idle);
        assert!(session.connect_wallet("Solflare", None).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_error_surfaces() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(source, host(), 10);
        session.connect_wallet("Phantom", None).unwrap();
        session.handle_event(&parent(json!({
            "type": "walletConnectResult",
            "walletName": "Phantom",
            "success": true
        })));
        session.handle_event(&parent(json!({ "type": "paymentError", "error": "Insufficient funds" })));
        assert_eq!(
            session.phase(),
            PaymentPhase::Error(PaymentFailure::PaymentFailed {
                message: "Insufficient funds".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_origin_changes_nothing() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(source, host(), 10);
        session.connect_wallet("Phantom", None).unwrap();
        let before = session.phase();

        let outcome = session.handle_event(&InboundEvent::from_parent(
            "https://evil.example",
            json!({ "type": "paymentSuccess", "signature": "forged" }),
        ));
        assert_eq!(outcome, ConnectEvent::Ignored);
        assert_eq!(session.phase(), before);

        let outcome = session.handle_event(&InboundEvent {
            origin: PARENT.into(),
            from_parent: false,
            data: json!({ "type": "paymentSuccess", "signature": "forged" }),
        });
        assert_eq!(outcome, ConnectEvent::Ignored);
        assert_eq!(session.phase(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_preconditions() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(Arc::clone(&source), host(), 10);
        assert!(matches!(
            session.connect_wallet("Backpack", None),
            Err(SessionError::UnknownWallet(_))
        ));
        assert!(matches!(
            session.connect_wallet("Phantom", Some("ten")),
            Err(SessionError::Connect(ConnectError::InvalidAmount(_)))
        ));
        assert_eq!(session.phase(), PaymentPhase::Idle);
        assert!(session.channel().port().sent().is_empty());

        let mut qr_only = self::session(source, HostContext::qr_only(), 10);
        assert!(matches!(
            qr_only.connect_wallet("Phantom", None),
            Err(SessionError::BridgeUnavailable)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_stops_qr_polling() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(Arc::clone(&source), host(), 10);
        session.show_qr().unwrap();
        session.connect_wallet("Phantom", None).unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.phase(),
            PaymentPhase::Connecting {
                wallet_name: "Phantom".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_ignores_events() {
        let source = ledger(&Memo::new("never"), u32::MAX);
        let mut session = session(source, host(), 10);
        session.connect_wallet("Phantom", None).unwrap();
        session.close();
        assert_eq!(
            session.handle_event(&parent(json!({ "type": "paymentSuccess", "signature": "x" }))),
            ConnectEvent::Ignored
        );
        assert!(session.is_closed());
        assert!(matches!(
            session.connect_wallet("Phantom", None),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn test_wallets_are_sanitized() {
        let host = HostContext::new(&json!([{ "name": " Phantom " }, { "icon": "x" }]), true);
        let source = ledger(&Memo::new("never"), u32::MAX);
        let session = session(source, host, 10);
        assert_eq!(session.wallets().len(), 1);
        assert_eq!(session.wallets()[0].name(), "Phantom");
    }
}
