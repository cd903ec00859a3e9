//! Conversion between bitcoin and satoshi amounts.

use bitcoin::Amount;

use crate::error::{DecodeError, InsightError};

pub const SATOSHIS_PER_BITCOIN: u64 = 100_000_000;

/// Convert satoshis to bitcoin.
pub fn satoshi_to_bitcoin(satoshis: u64) -> f64 {
    Amount::from_sat(satoshis).to_btc()
}

/// Convert bitcoin to satoshis, rounding to the nearest satoshi.
///
/// Accepts every amount [`satoshi_to_bitcoin`] can produce, not just the
/// monetary supply. Rejects negative and non-finite values and anything
/// that does not fit in a `u64`.
pub fn bitcoin_to_satoshi(bitcoins: f64) -> Result<u64, InsightError> {
    let satoshis = (bitcoins * SATOSHIS_PER_BITCOIN as f64).round();
    if !satoshis.is_finite() || satoshis < 0.0 || satoshis >= u64::MAX as f64 {
        return Err(InsightError::Param(format!(
            "bitcoin amount out of range: {bitcoins}"
        )));
    }
    Ok(satoshis as u64)
}

/// Parse a plain-text balance body (`addr/{a}/balance` and friends).
///
/// These endpoints answer with a bare integer count of satoshis, which is
/// negative for an unconfirmed balance that spends more than it receives.
pub fn parse_satoshi_text(body: &str) -> Result<i64, DecodeError> {
    body.trim()
        .parse::<i64>()
        .map_err(|e| DecodeError::Malformed {
            record: "balance",
            message: format!("expected integer satoshis, got `{}`: {e}", body.trim()),
        })
}
