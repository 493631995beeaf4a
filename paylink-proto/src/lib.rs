//! Wire format types for the paylink frame bridge.
//!
//! This crate defines the data that crosses the boundary between a sandboxed
//! payment widget and the page hosting it. Everything here treats the other
//! side as untrusted: inbound JSON goes through [`parse_message`] before any
//! field is read, and wallet metadata pushed by the host only becomes a
//! [`WalletInfo`] through [`sanitize_wallets`].
//!
//! # Modules
//!
//! - [`messages`]: the message union (`walletConnect`, `walletConnectResult`,
//!   `paymentSuccess`, `paymentError`)
//! - [`helpers`]: type detection and validating parsing of raw JSON values
//! - [`wallet`]: wallet metadata and the sanitizer for host-provided lists

pub mod helpers;
pub mod messages;
pub mod wallet;

pub use helpers::{message_type, parse_message, parse_message_str};
pub use messages::{
    Direction, MessageKind, PaymentError, PaymentSuccess, WalletConnect, WalletConnectResult,
    WidgetMessage,
};
pub use wallet::{FALLBACK_WALLET_ICON, WalletInfo, sanitize_icon, sanitize_wallets};

/// Errors that can occur when parsing a message received from the other frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The message data is not a JSON object.
    #[error("message is not an object")]
    NotAnObject,

    /// The `type` discriminator is missing or not a string.
    #[error("missing message type")]
    MissingType,

    /// The `type` discriminator names no known message.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The payload does not have the shape required by its declared type.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// The declared message type.
        kind: MessageKind,
        /// The underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// The raw text is not JSON at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
