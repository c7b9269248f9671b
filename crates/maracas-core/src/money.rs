//! Integer minor-unit money helpers.
//!
//! Every amount in the system is an `i64` number of cents. Conversion to a
//! decimal representation happens only at display time.

use crate::CURRENCY;

/// Extended price of one line: unit price times quantity, in cents.
#[must_use]
pub fn line_total(unit_price_cents: i64, quantity: u32) -> i64 {
    unit_price_cents * i64::from(quantity)
}

/// Formats cents as a display amount, e.g. `TTD $12.34`.
#[must_use]
pub fn format_minor_units(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{CURRENCY} ${}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_exactly() {
        assert_eq!(line_total(300, 2), 600);
        assert_eq!(line_total(0, 99), 0);
        assert_eq!(line_total(1, 1), 1);
    }

    #[test]
    fn format_pads_cents_to_two_places() {
        assert_eq!(format_minor_units(500), "TTD $5.00");
        assert_eq!(format_minor_units(1205), "TTD $12.05");
        assert_eq!(format_minor_units(9), "TTD $0.09");
    }

    #[test]
    fn format_handles_negative_amounts() {
        assert_eq!(format_minor_units(-150), "-TTD $1.50");
    }
}
