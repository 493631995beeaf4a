#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core of the paylink frame bridge.
//!
//! A payment widget rendered in a sandboxed, cross-origin iframe cannot reach
//! browser wallet providers. This crate lets it delegate wallet connection and
//! signing to the hosting page over an origin-checked message channel, and
//! confirm on its own that a payment landed by polling recent signatures for
//! a memo it generated.
//!
//! # Overview
//!
//! A chain crate (such as `paylink-svm`) builds a [`PaymentRequest`] carrying a
//! unique [`Memo`]. A [`PaymentSession`] then drives one of two paths:
//!
//! - **Wallet**: [`ConnectFlow`] sends a `walletConnect` message through the
//!   [`MessageChannel`] and follows the parent's answers.
//! - **QR**: [`ConfirmationPoller`] scans a [`MemoSource`] until the memo shows
//!   up on-chain or the attempt budget runs out.
//!
//! # Modules
//!
//! - [`amount`] - Exact decimal to minor-unit conversion
//! - [`channel`] - Origin-checked postMessage wrapper
//! - [`config`] - Host context and channel configuration
//! - [`connect`] - Wallet connect request/response flow
//! - [`error`] - Error taxonomy shared by the flows
//! - [`memo`] - Correlation memos and on-chain memo matching
//! - [`origin`] - Parent origin detection and validation
//! - [`poll`] - Bounded confirmation polling
//! - [`request`] - Payment request descriptor
//! - [`session`] - The payment state machine consumers render
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation
//! - `web` - Browser bindings over `web-sys` (only on `wasm32`)

pub mod amount;
pub mod channel;
pub mod config;
pub mod connect;
pub mod error;
pub mod memo;
pub mod origin;
pub mod poll;
pub mod request;
pub mod session;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

pub use amount::{AmountError, decimal_to_minor_units, parse_amount, to_minor_units};
pub use channel::{InboundEvent, MessageChannel, MessagePort, PortError};
pub use config::{ChannelConfig, HostContext, SessionConfig};
pub use connect::{ConnectEvent, ConnectFlow, ConnectState};
pub use error::{ConnectError, ProtocolViolation, SendError};
pub use memo::Memo;
pub use origin::{FrameAccessError, FrameEnvironment, Origin, StaticFrame};
pub use poll::{ConfirmationPoller, MemoSource, PollConfig, PollEvent, PollState, SignatureMemo};
pub use request::{CurrencySpec, PaymentRequest};
pub use session::{PaymentFailure, PaymentPhase, PaymentSession, SessionError};

pub use paylink_proto as proto;
