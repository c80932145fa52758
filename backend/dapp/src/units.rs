//! Fixed-point conversion between on-chain integers and decimal strings.

use crate::errors::{DappError, Result};

/// Decimal places used by every QKA-side token amount.
pub const TOKEN_DECIMALS: u32 = 8;

/// Render `value / 10^decimals` without trailing zeros (`150000000` → `"1.5"`).
pub fn format_units(value: u128, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = 10u128.pow(decimals);
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{frac:0>width$}", width = decimals as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse a non-negative decimal string into its fixed-point integer (`"1.5"` → `150000000`).
///
/// More fractional digits than `decimals` is an error rather than a silent rounding.
pub fn parse_units(raw: &str, decimals: u32) -> Result<u128> {
    let invalid = || DappError::InvalidAmount(raw.to_string());
    let raw_trimmed = raw.trim();
    let (whole, frac) = match raw_trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw_trimmed, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac.len() > decimals as usize {
        return Err(invalid());
    }

    let scale = 10u128.pow(decimals);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_token_renders_as_one() {
        assert_eq!(format_units(100_000_000, TOKEN_DECIMALS), "1");
        assert_eq!(format_units(0, TOKEN_DECIMALS), "0");
    }

    #[test]
    fn fractions_drop_trailing_zeros() {
        assert_eq!(format_units(150_000_000, TOKEN_DECIMALS), "1.5");
        assert_eq!(format_units(1, TOKEN_DECIMALS), "0.00000001");
        assert_eq!(format_units(1_234_500_000_000, TOKEN_DECIMALS), "12345");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn parse_whole_and_fractional_amounts() {
        assert_eq!(parse_units("1", TOKEN_DECIMALS).unwrap(), 100_000_000);
        assert_eq!(parse_units("0.5", TOKEN_DECIMALS).unwrap(), 50_000_000);
        assert_eq!(parse_units(".25", TOKEN_DECIMALS).unwrap(), 25_000_000);
        assert_eq!(parse_units("3.", TOKEN_DECIMALS).unwrap(), 300_000_000);
        assert_eq!(parse_units("0", TOKEN_DECIMALS).unwrap(), 0);
    }

    #[test]
    fn parse_rejects_bad_input() {
        for raw in ["", ".", "-1", "1e5", "abc", "1.123456789", "1.2.3"] {
            assert!(
                matches!(parse_units(raw, TOKEN_DECIMALS), Err(DappError::InvalidAmount(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(40);
        assert!(parse_units(&huge, TOKEN_DECIMALS).is_err());
    }
}
