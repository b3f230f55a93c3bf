//! Decimal text form of fixed-point amounts
//!
//! Configuration files and RPC responses carry amounts as strings such as
//! `"1.5"` because neither TOML nor JSON numbers hold a full `u128`.

use thiserror::Error;
use crate::constants::UNIT;
use super::Amount;

const DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseUnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid character in amount: {0:?}")]
    InvalidDigit(String),
    #[error("more than 18 decimal places: {0:?}")]
    TooPrecise(String),
    #[error("amount out of range: {0:?}")]
    Overflow(String),
}

/// Parse `"12"`, `"12.5"` or `".25"` into base units
pub fn parse_units(text: &str) -> Result<Amount, ParseUnitsError> {
    let text = text.trim().replace('_', "");
    if text.is_empty() || text == "." {
        return Err(ParseUnitsError::Empty);
    }
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(ParseUnitsError::InvalidDigit(text.clone()));
    }
    if frac.len() > DECIMALS {
        return Err(ParseUnitsError::TooPrecise(text.clone()));
    }

    let overflow = || ParseUnitsError::Overflow(text.clone());
    let whole: Amount = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| overflow())? };
    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = DECIMALS);
        padded.parse().map_err(|_| overflow())?
    };
    whole
        .checked_mul(UNIT)
        .and_then(|units| units.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Render base units as a decimal string without trailing zeros
pub fn format_units(value: Amount) -> String {
    let whole = value / UNIT;
    let frac = value % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0>width$}", width = DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
