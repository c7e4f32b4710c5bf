//! Unit formatting

use alloy_primitives::U256;

/// Render a raw integer amount with `decimals` fractional digits.
///
/// Trailing zeros are trimmed but at least one fractional digit is kept,
/// so `format_units(0, 18)` is `"0.0"` and `format_units(15, 1)` is `"1.5"`.
pub fn format_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return format!("{raw}.0");
    }

    let digits = raw.to_string();
    let decimals = usize::from(decimals);
    let padded = if digits.len() <= decimals {
        format!("{digits:0>width$}", width = decimals + 1)
    } else {
        digits
    };

    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };

    format!("{whole}.{frac}")
}
