//! Signature lookup against a Solana RPC node.
//!
//! [`SignatureLookup`] is the only RPC call the confirmation poller needs. It
//! is implemented for anything that can lend out a nonblocking
//! [`RpcClient`], and can be faked in tests.

use std::future::Future;
use std::sync::Arc;

use paylink::{MemoSource, PaymentRequest, SignatureMemo};
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_commitment_config::CommitmentConfig;
use solana_pubkey::Pubkey;

use crate::chain::{Address, Cluster};
use crate::error::WatchAddressError;
use crate::request::watch_address;

/// `getSignaturesForAddress`.
pub trait SignatureLookup {
    /// Most recent signatures touching `address`, newest first.
    fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Vec<RpcConfirmedTransactionStatusWithSignature>, ClientError>>
    + Send;
}

impl<Container: AsRef<RpcClient>> SignatureLookup for Container {
    fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Vec<RpcConfirmedTransactionStatusWithSignature>, ClientError>>
    + Send {
        RpcClient::get_signatures_for_address_with_config(
            self.as_ref(),
            address,
            GetConfirmedSignaturesForAddress2Config {
                limit: Some(limit),
                commitment: Some(commitment),
                ..GetConfirmedSignaturesForAddress2Config::default()
            },
        )
    }
}

/// [`MemoSource`] for one watched address.
#[derive(Debug)]
pub struct SolanaMemoSource<L> {
    lookup: L,
    address: Address,
    commitment: CommitmentConfig,
}

impl<L> SolanaMemoSource<L> {
    /// Watches `address` at `confirmed` commitment.
    #[must_use]
    pub fn new(lookup: L, address: Address) -> Self {
        Self {
            lookup,
            address,
            commitment: CommitmentConfig::confirmed(),
        }
    }

    /// Watches the address `request` pays into.
    ///
    /// # Errors
    ///
    /// Fails if the request's addresses or token are not valid on `cluster`.
    pub fn for_request(
        lookup: L,
        request: &PaymentRequest,
        cluster: Cluster,
    ) -> Result<Self, WatchAddressError> {
        Ok(Self::new(lookup, watch_address(request, cluster)?))
    }

    /// Overrides the commitment level.
    #[must_use]
    pub const fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    /// The watched address.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }
}

impl<L> MemoSource for SolanaMemoSource<L>
where
    L: SignatureLookup + Send + Sync + 'static,
{
    type Error = ClientError;

    async fn recent_memos(&self, limit: usize) -> Result<Vec<SignatureMemo>, ClientError> {
        let statuses = self
            .lookup
            .signatures_for_address(self.address.pubkey(), limit, self.commitment)
            .await?;

        #[cfg(feature = "telemetry")]
        tracing::trace!(address = %self.address, count = statuses.len(), "fetched signatures");

        Ok(statuses
            .into_iter()
            .map(|status| SignatureMemo {
                signature: status.signature,
                memo: status.memo,
            })
            .collect())
    }
}

/// Connects to `url` with the given commitment.
#[must_use]
pub fn rpc_client(url: &str, commitment: CommitmentConfig) -> Arc<RpcClient> {
    Arc::new(RpcClient::new_with_commitment(url.to_owned(), commitment))
}
