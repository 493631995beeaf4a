//! Payment request descriptor.
//!
//! A [`PaymentRequest`] is created once per form submission and never
//! mutated. Chain crates validate addresses and pick the currency; this type
//! only fixes the amount in minor units and carries a fresh [`Memo`].

use rust_decimal::Decimal;
use serde::Serialize;

use crate::amount::{AmountError, decimal_to_minor_units};
use crate::memo::{DEFAULT_MEMO_PREFIX, Memo};

/// Currency parameters needed to build a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencySpec<'a> {
    /// Ticker symbol, e.g. `"USDC"`.
    pub symbol: &'a str,
    /// Decimal precision of the on-chain amount.
    pub decimals: u32,
    /// Token mint address, `None` for the chain's native asset.
    pub mint: Option<&'a str>,
}

/// An immutable payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    recipient: String,
    amount: Decimal,
    currency: String,
    amount_minor_units: u64,
    token_mint: Option<String>,
    memo: Memo,
    qr_payload: String,
}

impl PaymentRequest {
    /// Builds a request with a freshly generated memo.
    ///
    /// `encode_qr` receives the finished request and returns the payload
    /// shown in the QR code.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if `amount` is negative or too large.
    pub fn new<F>(
        recipient: impl Into<String>,
        amount: Decimal,
        currency: &CurrencySpec<'_>,
        encode_qr: F,
    ) -> Result<Self, AmountError>
    where
        F: FnOnce(&Self) -> String,
    {
        Self::with_memo(
            recipient,
            amount,
            currency,
            Memo::generate(DEFAULT_MEMO_PREFIX),
            encode_qr,
        )
    }

    /// Builds a request around a caller-provided memo.
    ///
    /// The memo must be unique; use [`Memo::generate`].
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if `amount` is negative or too large.
    pub fn with_memo<F>(
        recipient: impl Into<String>,
        amount: Decimal,
        currency: &CurrencySpec<'_>,
        memo: Memo,
        encode_qr: F,
    ) -> Result<Self, AmountError>
    where
        F: FnOnce(&Self) -> String,
    {
        let amount_minor_units = decimal_to_minor_units(amount, currency.decimals)?;
        let mut request = Self {
            recipient: recipient.into(),
            amount: amount.normalize(),
            currency: currency.symbol.to_owned(),
            amount_minor_units,
            token_mint: currency.mint.map(str::to_owned),
            memo,
            qr_payload: String::new(),
        };
        request.qr_payload = encode_qr(&request);
        Ok(request)
    }

    /// Recipient's main address.
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Amount in display units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency symbol.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Amount in the currency's smallest unit.
    #[must_use]
    pub const fn amount_minor_units(&self) -> u64 {
        self.amount_minor_units
    }

    /// Token mint, `None` for the native asset.
    #[must_use]
    pub fn token_mint(&self) -> Option<&str> {
        self.token_mint.as_deref()
    }

    /// Whether the payment is in the native asset.
    #[must_use]
    pub const fn is_native(&self) -> bool {
        self.token_mint.is_none()
    }

    /// The correlation memo.
    #[must_use]
    pub const fn memo(&self) -> &Memo {
        &self.memo
    }

    /// Payload to render as a QR code.
    #[must_use]
    pub fn qr_payload(&self) -> &str {
        &self.qr_payload
    }
}
