//! Wallet connect round trip.
//!
//! ```text
//! Idle --request_connect--> Connecting --result ok--> Processing --paymentSuccess--> Completed
//!                               |                          |
//!                               +--result failed--> Idle <-+--paymentError
//! ```
//!
//! A connected wallet is not a payment: the flow waits in `Processing` until
//! the parent reports the transaction outcome.

use paylink_proto::{WalletConnect, WalletConnectResult, WidgetMessage};
use rust_decimal::Decimal;

use crate::amount::parse_amount;
use crate::channel::{MessageChannel, MessagePort};
use crate::error::ConnectError;

const DEFAULT_CONNECT_ERROR: &str = "Wallet connection failed";
const DEFAULT_PAYMENT_ERROR: &str = "Payment failed";

/// Where a connect attempt stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Waiting for `walletConnectResult`.
    Connecting {
        /// Wallet the user picked.
        wallet_name: String,
        /// Correlation id sent with the request.
        request_id: Option<String>,
    },
    /// Wallet connected, waiting for the payment outcome.
    Processing {
        /// Connected wallet.
        wallet_name: String,
        /// Accounts reported by the parent.
        accounts: Vec<String>,
    },
    /// The parent reported a submitted transaction.
    Completed {
        /// Transaction signature.
        signature: String,
    },
}

/// What an inbound message did to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectEvent {
    /// The message does not apply to the current state.
    Ignored,
    /// The parent could not connect the wallet; back to idle.
    Failed {
        /// Wallet the request was for.
        wallet_name: String,
        /// Reason reported by the parent.
        error: String,
    },
    /// The wallet connected.
    Connected {
        /// Connected wallet.
        wallet_name: String,
        /// Accounts reported by the parent.
        accounts: Vec<String>,
    },
    /// The payment transaction was submitted.
    Paid {
        /// Transaction signature.
        signature: String,
    },
    /// The payment failed; back to idle.
    PaymentFailed {
        /// Reason reported by the parent.
        error: String,
    },
}

/// One connect attempt at a time over a [`MessageChannel`].
#[derive(Debug, Default)]
pub struct ConnectFlow {
    state: ConnectState,
    request_ids: bool,
    next_request_id: u64,
}

impl ConnectFlow {
    /// Creates an idle flow. With `request_ids`, each request carries a
    /// `requestId` and mismatching results are ignored.
    #[must_use]
    pub fn new(request_ids: bool) -> Self {
        Self {
            request_ids,
            ..Self::default()
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ConnectState {
        &self.state
    }

    /// Whether an attempt is waiting on the parent.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        matches!(
            self.state,
            ConnectState::Connecting { .. } | ConnectState::Processing { .. }
        )
    }

    /// Asks the parent to connect `wallet_name` and pay.
    ///
    /// `custom_amount` is the raw text the user typed, if any; otherwise
    /// `default_amount` is sent.
    ///
    /// # Errors
    ///
    /// Fails without sending anything when an attempt is in flight, when the
    /// channel has no trusted target, or when the custom amount is invalid.
    pub fn request_connect<P: MessagePort>(
        &mut self,
        channel: &MessageChannel<P>,
        wallet_name: &str,
        custom_amount: Option<&str>,
        default_amount: Decimal,
        currency: &str,
    ) -> Result<(), ConnectError> {
        if self.in_flight() {
            return Err(ConnectError::InFlight);
        }
        if !channel.has_trust_context() {
            return Err(ConnectError::NoOriginContext);
        }
        let amount = match custom_amount {
            Some(raw) => parse_amount(raw)?,
            None => default_amount,
        };

        let request_id = self.request_ids.then(|| {
            self.next_request_id += 1;
            format!("connect-{}", self.next_request_id)
        });
        channel.send(&WidgetMessage::WalletConnect(WalletConnect {
            wallet_name: wallet_name.to_owned(),
            amount,
            currency: currency.to_owned(),
            request_id: request_id.clone(),
        }))?;

        #[cfg(feature = "telemetry")]
        tracing::info!(wallet = wallet_name, %amount, currency, "requested wallet connect");

        self.state = ConnectState::Connecting {
            wallet_name: wallet_name.to_owned(),
            request_id,
        };
        Ok(())
    }

    /// Applies an accepted parent message.
    pub fn on_message(&mut self, message: &WidgetMessage) -> ConnectEvent {
        match message {
            WidgetMessage::WalletConnectResult(result) => self.on_result(result),
            WidgetMessage::PaymentSuccess(success) if self.in_flight() => {
                self.state = ConnectState::Completed {
                    signature: success.signature.clone(),
                };
                ConnectEvent::Paid {
                    signature: success.signature.clone(),
                }
            }
            WidgetMessage::PaymentError(failure) if self.in_flight() => {
                self.state = ConnectState::Idle;
                ConnectEvent::PaymentFailed {
                    error: failure
                        .error
                        .clone()
                        .unwrap_or_else(|| DEFAULT_PAYMENT_ERROR.to_owned()),
                }
            }
            _ => ConnectEvent::Ignored,
        }
    }

    fn on_result(&mut self, result: &WalletConnectResult) -> ConnectEvent {
        let ConnectState::Connecting {
            wallet_name,
            request_id,
        } = &self.state
        else {
            return ConnectEvent::Ignored;
        };
        if let (Some(sent), Some(received)) = (request_id, &result.request_id)
            && sent != received
        {
            return ConnectEvent::Ignored;
        }
        let wallet_name = wallet_name.clone();

        if result.success {
            let accounts = result.accounts.clone().unwrap_or_default();
            self.state = ConnectState::Processing {
                wallet_name: wallet_name.clone(),
                accounts: accounts.clone(),
            };
            ConnectEvent::Connected {
                wallet_name,
                accounts,
            }
        } else {
            self.state = ConnectState::Idle;
            ConnectEvent::Failed {
                wallet_name,
                error: result
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONNECT_ERROR.to_owned()),
            }
        }
    }

    /// Drops any attempt in flight.
    pub fn reset(&mut self) {
        self.state = ConnectState::Idle;
    }
}
