//! Exact conversion of decimal amounts to integer minor units.
//!
//! Amounts are never multiplied as floating point numbers. The decimal text
//! of the amount is split into integer and fractional digits, the fraction is
//! right-padded or truncated to the currency's precision, and the two parts
//! are combined as `integer * 10^decimals + fraction`.
//!
//! ```
//! use paylink::amount::to_minor_units;
//!
//! assert_eq!(to_minor_units(1.5, 6).unwrap(), 1_500_000);
//! assert_eq!(to_minor_units(0.001, 9).unwrap(), 1_000_000);
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;

/// Errors produced while validating or converting an amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The amount is NaN or infinite.
    #[error("amount is not a finite number")]
    NotFinite,
    /// The amount is below zero.
    #[error("amount must not be negative")]
    Negative,
    /// The decimal precision is negative.
    #[error("decimals must not be negative, got {0}")]
    InvalidDecimals(i32),
    /// The text is not a plain decimal number.
    #[error("invalid number format: {0}")]
    InvalidFormat(String),
    /// The result does not fit in a `u64`.
    #[error("amount is too large")]
    Overflow,
}

/// Converts a floating point amount into minor units with `decimals` digits
/// of precision.
///
/// Uses the shortest decimal text that round-trips the float, so `0.1`
/// converts as the decimal `0.1` and not as its binary approximation.
/// Fractional digits beyond `decimals` are truncated.
///
/// # Errors
///
/// Returns [`AmountError::NotFinite`] for NaN and infinities,
/// [`AmountError::InvalidDecimals`] for negative precision,
/// [`AmountError::Negative`] for negative amounts and
/// [`AmountError::Overflow`] when the result exceeds `u64`.
pub fn to_minor_units(amount: f64, decimals: i32) -> Result<u64, AmountError> {
    if !amount.is_finite() {
        return Err(AmountError::NotFinite);
    }
    let decimals = u32::try_from(decimals).map_err(|_| AmountError::InvalidDecimals(decimals))?;
    if amount < 0.0 {
        return Err(AmountError::Negative);
    }
    // `abs` folds negative zero into "0".
    minor_units_from_str(&amount.abs().to_string(), decimals)
}

/// Converts a [`Decimal`] into minor units with `decimals` digits of precision.
///
/// # Errors
///
/// Returns [`AmountError::Negative`] for negative values and
/// [`AmountError::Overflow`] when the result exceeds `u64`.
pub fn decimal_to_minor_units(amount: Decimal, decimals: u32) -> Result<u64, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative);
    }
    minor_units_from_str(&amount.abs().normalize().to_string(), decimals)
}

/// Parses a user-entered amount.
///
/// Accepts plain decimal text (`"10"`, `"0.25"`, `" 3.5 "`). Rejects empty
/// input, anything that is not a finite number, and negative values.
///
/// # Errors
///
/// Returns [`AmountError::InvalidFormat`] or [`AmountError::Negative`].
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::InvalidFormat(input.to_owned()));
    }
    let value =
        Decimal::from_str(trimmed).map_err(|_| AmountError::InvalidFormat(input.to_owned()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative);
    }
    Ok(value)
}

/// Combines the integer and fractional digits of a non-negative decimal text.
fn minor_units_from_str(text: &str, decimals: u32) -> Result<u64, AmountError> {
    let (integer, fraction) = text.split_once('.').unwrap_or((text, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (integer.is_empty() && fraction.is_empty()) || !digits_only(integer) || !digits_only(fraction)
    {
        return Err(AmountError::InvalidFormat(text.to_owned()));
    }

    let scale = usize::try_from(decimals).map_err(|_| AmountError::Overflow)?;
    let mut fraction: String = fraction.chars().take(scale).collect();
    while fraction.len() < scale {
        fraction.push('0');
    }

    let integer = parse_digits(integer)?;
    let fraction = parse_digits(&fraction)?;
    let multiplier = 10u128.checked_pow(decimals).ok_or(AmountError::Overflow)?;
    let total = integer
        .checked_mul(multiplier)
        .and_then(|v| v.checked_add(fraction))
        .ok_or(AmountError::Overflow)?;
    u64::try_from(total).map_err(|_| AmountError::Overflow)
}

fn parse_digits(digits: &str) -> Result<u128, AmountError> {
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse().map_err(|_| AmountError::Overflow)
}
