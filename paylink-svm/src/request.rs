//! Solana payment requests.
//!
//! The QR payload is a Solana Pay transfer request:
//!
//! ```text
//! solana:<recipient>?amount=<decimal>[&spl-token=<mint>]&memo=<memo>[&label=..][&message=..]
//! ```

use paylink::memo::DEFAULT_MEMO_PREFIX;
use paylink::{Memo, PaymentRequest};
use rust_decimal::Decimal;
use url::Url;

use crate::ata::associated_token_address;
use crate::chain::{Address, Cluster};
use crate::error::{RequestBuildError, UnsupportedCurrencyError, WatchAddressError};
use crate::networks::{Currency, currency_spec};

/// URI scheme of Solana Pay requests.
pub const SOLANA_PAY_SCHEME: &str = "solana";

/// Builds [`PaymentRequest`]s for one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaPaymentBuilder {
    cluster: Cluster,
    memo_prefix: String,
    label: Option<String>,
    message: Option<String>,
}

impl SolanaPaymentBuilder {
    /// A builder for `cluster`.
    #[must_use]
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            memo_prefix: DEFAULT_MEMO_PREFIX.to_owned(),
            label: None,
            message: None,
        }
    }

    /// Prefix of generated memos.
    #[must_use]
    pub fn with_memo_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.memo_prefix = prefix.into();
        self
    }

    /// Merchant label shown by wallets.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Message shown by wallets.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The builder's cluster.
    #[must_use]
    pub const fn cluster(&self) -> Cluster {
        self.cluster
    }

    /// Builds a request paying `amount` of `currency` to `recipient`.
    ///
    /// # Errors
    ///
    /// [`RequestBuildError::UnsupportedCurrency`] if the symbol is not known
    /// on this cluster, [`RequestBuildError::InvalidRecipient`] for a bad
    /// address, [`RequestBuildError::InvalidAmount`] for a negative or
    /// oversized amount.
    pub fn build(
        &self,
        recipient: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentRequest, RequestBuildError> {
        let currency = Currency::lookup(self.cluster, currency).ok_or_else(|| {
            UnsupportedCurrencyError {
                symbol: currency.to_owned(),
                cluster: self.cluster,
            }
        })?;
        let recipient: Address = recipient.parse()?;
        let mint = currency.mint().map(|m| m.to_string());
        let spec = currency_spec(currency, mint.as_deref());

        let request = PaymentRequest::with_memo(
            recipient.to_string(),
            amount,
            &spec,
            Memo::generate(&self.memo_prefix),
            |request| self.transfer_uri(request),
        )?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            cluster = %self.cluster,
            recipient = request.recipient(),
            currency = request.currency(),
            amount_minor_units = request.amount_minor_units(),
            memo = %request.memo(),
            "built payment request"
        );

        Ok(request)
    }

    fn transfer_uri(&self, request: &PaymentRequest) -> String {
        let base = format!("{SOLANA_PAY_SCHEME}:{}", request.recipient());
        let Ok(mut uri) = Url::parse(&base) else {
            return base;
        };
        {
            let mut query = uri.query_pairs_mut();
            query.append_pair("amount", &request.amount().to_string());
            if let Some(mint) = request.token_mint() {
                query.append_pair("spl-token", mint);
            }
            query.append_pair("memo", request.memo().as_str());
            if let Some(label) = &self.label {
                query.append_pair("label", label);
            }
            if let Some(message) = &self.message {
                query.append_pair("message", message);
            }
        }
        uri.into()
    }
}

/// Address whose signatures reveal the payment: the recipient for SOL, its
/// associated token account for tokens.
///
/// # Errors
///
/// Fails if the request was not built for this cluster's currency table.
pub fn watch_address(
    request: &PaymentRequest,
    cluster: Cluster,
) -> Result<Address, WatchAddressError> {
    let recipient: Address = request.recipient().parse()?;
    let Some(mint) = request.token_mint() else {
        return Ok(recipient);
    };
    let mint: Address = mint.parse()?;
    let program = Currency::all(cluster)
        .find_map(|c| c.token.filter(|(m, _)| *m == mint))
        .map(|(_, program)| program)
        .ok_or_else(|| UnsupportedCurrencyError {
            symbol: request.currency().to_owned(),
            cluster,
        })?;
    Ok(associated_token_address(&recipient, &mint, program))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::networks::TokenProgram;

    const MERCHANT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const USDC_MAINNET: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_build_usdc() {
        let request = SolanaPaymentBuilder::new(Cluster::Mainnet)
            .build(MERCHANT, dec("10.50"), "USDC")
            .unwrap();
        assert_eq!(request.amount_minor_units(), 10_500_000);
        assert_eq!(request.token_mint(), Some(USDC_MAINNET));
        assert_eq!(request.currency(), "USDC");

        let uri = Url::parse(request.qr_payload()).unwrap();
        assert_eq!(uri.scheme(), "solana");
        assert_eq!(uri.path(), MERCHANT);
        let pairs: Vec<(String, String)> = uri.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("amount".to_owned(), "10.5".to_owned()),
                ("spl-token".to_owned(), USDC_MAINNET.to_owned()),
                ("memo".to_owned(), request.memo().to_string()),
            ]
        );
    }

    #[test]
    fn test_build_sol() {
        let request = SolanaPaymentBuilder::new(Cluster::Devnet)
            .with_label("Coffee Shop")
            .build(MERCHANT, dec("0.001"), "sol")
            .unwrap();
        assert!(request.is_native());
        assert_eq!(request.amount_minor_units(), 1_000_000);
        assert!(!request.qr_payload().contains("spl-token"));
        assert!(request.qr_payload().contains("label=Coffee+Shop"));
    }

    #[test]
    fn test_unsupported_currency_is_eager() {
        let err = SolanaPaymentBuilder::new(Cluster::Devnet)
            .build(MERCHANT, Decimal::ONE, "PYUSD")
            .unwrap_err();
        assert_eq!(
            err,
            RequestBuildError::UnsupportedCurrency(UnsupportedCurrencyError {
                symbol: "PYUSD".into(),
                cluster: Cluster::Devnet,
            })
        );
    }

    #[test]
    fn test_invalid_recipient_and_amount() {
        let builder = SolanaPaymentBuilder::new(Cluster::Mainnet);
        assert!(matches!(
            builder.build("0xabc", Decimal::ONE, "USDC"),
            Err(RequestBuildError::InvalidRecipient(_))
        ));
        assert!(matches!(
            builder.build(MERCHANT, Decimal::NEGATIVE_ONE, "USDC"),
            Err(RequestBuildError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_memo_prefix_and_uniqueness() {
        let builder = SolanaPaymentBuilder::new(Cluster::Mainnet).with_memo_prefix("shop");
        let a = builder.build(MERCHANT, Decimal::ONE, "USDC").unwrap();
        let b = builder.build(MERCHANT, Decimal::ONE, "USDC").unwrap();
        assert!(a.memo().as_str().starts_with("shop-"));
        assert_ne!(a.memo(), b.memo());
        assert_ne!(a.qr_payload(), b.qr_payload());
    }

    #[test]
    fn test_watch_address() {
        let builder = SolanaPaymentBuilder::new(Cluster::Mainnet);
        let merchant: Address = MERCHANT.parse().unwrap();

        let sol = builder.build(MERCHANT, Decimal::ONE, "SOL").unwrap();
        assert_eq!(watch_address(&sol, Cluster::Mainnet).unwrap(), merchant);

        let usdc = builder.build(MERCHANT, Decimal::ONE, "USDC").unwrap();
        let expected = associated_token_address(
            &merchant,
            &USDC_MAINNET.parse().unwrap(),
            TokenProgram::Spl,
        );
        assert_eq!(watch_address(&usdc, Cluster::Mainnet).unwrap(), expected);

        let pyusd = builder.build(MERCHANT, Decimal::ONE, "PYUSD").unwrap();
        let watched = watch_address(&pyusd, Cluster::Mainnet).unwrap();
        assert_ne!(watched, merchant);
    }

    #[test]
    fn test_watch_address_wrong_cluster() {
        let usdc = SolanaPaymentBuilder::new(Cluster::Mainnet)
            .build(MERCHANT, Decimal::ONE, "USDC")
            .unwrap();
        assert!(matches!(
            watch_address(&usdc, Cluster::Devnet),
            Err(WatchAddressError::UnsupportedCurrency(_))
        ));
    }
}
