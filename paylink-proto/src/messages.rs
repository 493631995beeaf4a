//! Messages exchanged between the widget frame and its host page.
//!
//! One logical channel carries four message types. The widget (child) only
//! ever sends [`WalletConnect`]; the host (parent) answers with the other
//! three.
//!
//! # JSON Format
//!
//! ```json
//! { "type": "walletConnect", "walletName": "Phantom", "amount": 1.5, "currency": "USDC" }
//! { "type": "walletConnectResult", "walletName": "Phantom", "success": true, "accounts": ["..."] }
//! { "type": "paymentSuccess", "signature": "5VER..." }
//! { "type": "paymentError", "error": "User rejected the request" }
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A message crossing the frame boundary, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetMessage {
    /// Child asks the parent to connect a wallet and pay.
    WalletConnect(WalletConnect),
    /// Parent reports the outcome of a connect request.
    WalletConnectResult(WalletConnectResult),
    /// Parent reports a submitted payment transaction.
    PaymentSuccess(PaymentSuccess),
    /// Parent reports that the payment failed.
    PaymentError(PaymentError),
}

impl WidgetMessage {
    /// Returns the discriminator of this message.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::WalletConnect(_) => MessageKind::WalletConnect,
            Self::WalletConnectResult(_) => MessageKind::WalletConnectResult,
            Self::PaymentSuccess(_) => MessageKind::PaymentSuccess,
            Self::PaymentError(_) => MessageKind::PaymentError,
        }
    }

    /// Returns the direction this message is allowed to travel in.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.kind().direction()
    }
}

/// Request sent by the widget when the user picks a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnect {
    /// Name of the wallet the user picked, as advertised by the parent.
    pub wallet_name: String,

    /// Decimal amount in display units (e.g. `1.5` USDC), sent as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Currency symbol (e.g. `"USDC"`, `"SOL"`).
    pub currency: String,

    /// Optional correlation id echoed back in [`WalletConnectResult`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Outcome of a connect request, reported by the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectResult {
    /// Name of the wallet the parent tried to connect.
    pub wallet_name: String,

    /// Whether the wallet connected.
    pub success: bool,

    /// Connected account addresses, when the parent shares them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,

    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Correlation id copied from the originating [`WalletConnect`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// A payment transaction was submitted by the parent's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccess {
    /// Transaction signature.
    pub signature: String,
}

/// The payment failed on the parent's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentError {
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Message discriminator, i.e. the value of the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `walletConnect`
    WalletConnect,
    /// `walletConnectResult`
    WalletConnectResult,
    /// `paymentSuccess`
    PaymentSuccess,
    /// `paymentError`
    PaymentError,
}

impl MessageKind {
    /// Returns the wire name of this message type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WalletConnect => "walletConnect",
            Self::WalletConnectResult => "walletConnectResult",
            Self::PaymentSuccess => "paymentSuccess",
            Self::PaymentError => "paymentError",
        }
    }

    /// Returns the direction messages of this type travel in.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::WalletConnect => Direction::ChildToParent,
            Self::WalletConnectResult | Self::PaymentSuccess | Self::PaymentError => {
                Direction::ParentToChild
            }
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `type` value names no known message.
#[derive(Debug, thiserror::Error)]
#[error("unknown message type {0}")]
pub struct UnknownMessageKind(pub String);

impl FromStr for MessageKind {
    type Err = UnknownMessageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "walletConnect" => Ok(Self::WalletConnect),
            "walletConnectResult" => Ok(Self::WalletConnectResult),
            "paymentSuccess" => Ok(Self::PaymentSuccess),
            "paymentError" => Ok(Self::PaymentError),
            other => Err(UnknownMessageKind(other.to_owned())),
        }
    }
}

/// Which way a message travels across the frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Widget frame to hosting page.
    ChildToParent,
    /// Hosting page to widget frame.
    ParentToChild,
}
