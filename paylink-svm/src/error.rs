//! Error types for building Solana payment requests.

use paylink::AmountError;

use crate::chain::{AddressParseError, Cluster};

/// The currency is not in the table for this cluster.
///
/// A configuration error: it is returned from
/// [`SolanaPaymentBuilder::build`](crate::SolanaPaymentBuilder::build) and
/// never recovered from inside the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency {symbol} on {cluster}")]
pub struct UnsupportedCurrencyError {
    /// The requested symbol.
    pub symbol: String,
    /// The builder's cluster.
    pub cluster: Cluster,
}

/// Failures building a payment request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestBuildError {
    /// Unknown currency.
    #[error(transparent)]
    UnsupportedCurrency(#[from] UnsupportedCurrencyError),
    /// The recipient is not a Solana address.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] AddressParseError),
    /// The amount cannot be expressed in minor units.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
}

/// Failures selecting the address to watch for a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchAddressError {
    /// The request's recipient or mint is not a Solana address.
    #[error(transparent)]
    InvalidAddress(#[from] AddressParseError),
    /// The request's token is not in the table for this cluster.
    #[error(transparent)]
    UnsupportedCurrency(#[from] UnsupportedCurrencyError),
}
