#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana support for paylink.
//!
//! This crate turns a recipient, an amount and a currency symbol into a
//! [`PaymentRequest`](paylink::PaymentRequest) whose QR payload is a Solana
//! Pay transfer URI, and knows which address to watch for the payment: the
//! recipient itself for SOL, or its associated token account for SPL tokens.
//!
//! # Modules
//!
//! - [`chain`] - Base58 addresses and clusters
//! - [`networks`] - Program ids and the built-in currency table
//! - [`ata`] - Associated token account derivation
//! - [`request`] - Payment request builder and watch address selection
//! - [`rpc`] - Signature lookup over `solana-client` (feature `rpc`)
//!
//! # Feature Flags
//!
//! - `rpc` - [`SolanaMemoSource`](rpc::SolanaMemoSource) backed by the
//!   nonblocking `RpcClient`
//! - `telemetry` - Tracing instrumentation
//!
//! # Example
//!
//! ```
//! use paylink_svm::{Cluster, SolanaPaymentBuilder};
//! use rust_decimal::Decimal;
//!
//! let builder = SolanaPaymentBuilder::new(Cluster::Mainnet);
//! let request = builder
//!     .build("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM", Decimal::new(15, 1), "USDC")
//!     .unwrap();
//! assert_eq!(request.amount_minor_units(), 1_500_000);
//! assert!(request.qr_payload().starts_with("solana:9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM?"));
//! ```

pub mod ata;
pub mod chain;
pub mod error;
pub mod networks;
pub mod request;

#[cfg(feature = "rpc")]
pub mod rpc;

pub use ata::associated_token_address;
pub use chain::{Address, AddressParseError, Cluster, ClusterParseError};
pub use error::{RequestBuildError, UnsupportedCurrencyError, WatchAddressError};
pub use networks::{Currency, TokenProgram};
pub use request::{SolanaPaymentBuilder, watch_address};
