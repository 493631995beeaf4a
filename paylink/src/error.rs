//! Error types for the frame bridge.
//!
//! Nothing here is fatal to the widget. [`ProtocolViolation`]s are dropped by
//! the channel, [`SendError`]s and [`ConnectError`]s are surfaced to the
//! caller before any state changes.

use paylink_proto::{MessageKind, ProtocolError};

use crate::amount::AmountError;
use crate::channel::PortError;

/// Reasons an inbound message was rejected by the channel.
///
/// Violations are never shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolViolation {
    /// `event.source` is not the parent window.
    #[error("message does not come from the parent frame")]
    WrongSource,

    /// `event.origin` differs from the locked-in parent origin.
    #[error("origin mismatch: expected {expected}, got {actual}")]
    OriginMismatch {
        /// The trusted origin.
        expected: String,
        /// The origin the event carried.
        actual: String,
    },

    /// No origin is trusted yet and the frame is not in `srcDoc` mode.
    #[error("no trusted parent origin for message from {0}")]
    NoTrustedOrigin(String),

    /// A `srcDoc` first message carried an origin that is not `http(s)`.
    #[error("untrusted origin {0}")]
    UntrustedOrigin(String),

    /// The data failed validation.
    #[error("malformed message: {0}")]
    Malformed(#[from] ProtocolError),

    /// The parent sent a message only the child may send.
    #[error("{0} is not accepted from the parent")]
    UnexpectedDirection(MessageKind),
}

/// Failures sending a message to the parent.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// No origin is trusted and the `"*"` fallback is not permitted.
    #[error("no target origin for the parent frame")]
    NoTargetOrigin,

    /// The message type travels from parent to child only.
    #[error("{0} cannot be sent to the parent")]
    WrongDirection(MessageKind),

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The underlying port refused the message.
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Local failures of a connect request. No message was sent.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Another connect attempt is still waiting for an answer.
    #[error("a wallet connection is already in progress")]
    InFlight,

    /// Neither a trusted parent origin nor the `srcDoc` fallback exists.
    #[error("no parent origin to send the connect request to")]
    NoOriginContext,

    /// The custom amount entered by the user is not usable.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// The request could not be posted.
    #[error(transparent)]
    Send(#[from] SendError),
}
