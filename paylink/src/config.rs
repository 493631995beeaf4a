//! Configuration and host-provided context.
//!
//! [`HostContext`] replaces the globals a host page would otherwise inject
//! into the frame: it is built once before the widget mounts, sanitizes the
//! wallet list on construction, and is read-only afterwards.

use paylink_proto::{WalletInfo, sanitize_wallets};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::origin::Origin;
use crate::poll::PollConfig;

/// Message channel settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Parent origin passed out-of-band by the host.
    ///
    /// When set, the channel trusts only this origin from the start and never
    /// infers one from the first message, even in `srcDoc` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_origin: Option<Origin>,

    /// Log dropped messages (requires the `telemetry` feature).
    pub debug: bool,
}

impl ChannelConfig {
    /// Pins the parent origin.
    #[must_use]
    pub fn with_expected_origin(mut self, origin: Origin) -> Self {
        self.expected_origin = Some(origin);
        self
    }
}

/// What the hosting page provides before the widget mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    wallets: Vec<WalletInfo>,
    wallet_connect: bool,
}

impl HostContext {
    /// Builds the context from the host's raw wallet list.
    ///
    /// `wallet_connect` tells whether the parent answers `walletConnect`.
    #[must_use]
    pub fn new(raw_wallets: &Value, wallet_connect: bool) -> Self {
        Self {
            wallets: sanitize_wallets(raw_wallets),
            wallet_connect,
        }
    }

    /// A host that offers no wallet bridge at all (QR only).
    #[must_use]
    pub fn qr_only() -> Self {
        Self::default()
    }

    /// The sanitized wallet list.
    #[must_use]
    pub fn wallets(&self) -> &[WalletInfo] {
        &self.wallets
    }

    /// Whether the parent page handles wallet connection.
    #[must_use]
    pub const fn supports_wallet_connect(&self) -> bool {
        self.wallet_connect
    }

    /// Looks up an advertised wallet by name.
    #[must_use]
    pub fn wallet(&self, name: &str) -> Option<&WalletInfo> {
        self.wallets.iter().find(|w| w.name() == name)
    }
}

/// Settings for a [`PaymentSession`](crate::session::PaymentSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Channel settings.
    pub channel: ChannelConfig,
    /// Confirmation polling settings.
    pub poll: PollConfig,
    /// Attach a `requestId` to each connect request.
    pub request_ids: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            poll: PollConfig::default(),
            request_ids: true,
        }
    }
}
