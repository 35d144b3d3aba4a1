//! Integer-cent money helpers. Every amount in the pipeline is an `i64`
//! count of minor units; fractions of a cent only ever appear transiently
//! inside `round_fraction` and are rounded immediately, per stage, never
//! on a cumulative total.

pub type Cents = i64;

/// Apply a fractional rate to an amount and round to the nearest cent,
/// halves away from zero (`f64::round` semantics, the documented rounding
/// rule for this service).
pub fn round_fraction(amount: Cents, rate: f64) -> Cents {
    (amount as f64 * rate).round() as Cents
}

/// Format cents as a dollar string for messages and line items.
pub fn format_usd(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        // 2.5 cents -> 3
        assert_eq!(round_fraction(50, 0.05), 3);
        // 0.5 cents -> 1
        assert_eq!(round_fraction(10, 0.05), 1);
        assert_eq!(round_fraction(7000, 0.06), 420);
        assert_eq!(round_fraction(6300, 0.06), 378);
    }

    #[test]
    fn rounds_down_below_half() {
        // 4.9 cents -> 5, 4.4 cents -> 4
        assert_eq!(round_fraction(49, 0.1), 5);
        assert_eq!(round_fraction(44, 0.1), 4);
    }

    #[test]
    fn zero_rate_is_zero() {
        assert_eq!(round_fraction(123_456, 0.0), 0);
    }

    #[test]
    fn formats_usd() {
        assert_eq!(format_usd(3500), "$35.00");
        assert_eq!(format_usd(7), "$0.07");
        assert_eq!(format_usd(-150), "-$1.50");
    }
}
