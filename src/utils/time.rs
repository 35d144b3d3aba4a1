use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Parse an IANA zone name, falling back to the given default and then to
/// America/New_York if both are unparseable. Events always carry a zone;
/// a bad name in the catalog should degrade, not 500.
pub fn parse_timezone(name: &str, fallback: &str) -> Tz {
    name.parse::<Tz>()
        .or_else(|_| fallback.parse::<Tz>())
        .unwrap_or(chrono_tz::America::New_York)
}

/// The instant after which cancellation/refund is disallowed: the event
/// start minus its cutoff hours. Computed on instants, so it is the same
/// moment in every zone.
pub fn refund_cutoff(starts_at: DateTime<Utc>, cutoff_hours: i64) -> DateTime<Utc> {
    starts_at - Duration::hours(cutoff_hours)
}

/// Human-readable event time in the event's own timezone, for
/// confirmation messages and checkout line items.
pub fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%b %-d, %Y %-I:%M %p %Z")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_known_zone() {
        let tz = parse_timezone("America/Chicago", "America/New_York");
        assert_eq!(tz, chrono_tz::America::Chicago);
    }

    #[test]
    fn falls_back_on_unknown_zone() {
        let tz = parse_timezone("Not/AZone", "America/Los_Angeles");
        assert_eq!(tz, chrono_tz::America::Los_Angeles);
        let tz = parse_timezone("Not/AZone", "Also/Bad");
        assert_eq!(tz, chrono_tz::America::New_York);
    }

    #[test]
    fn cutoff_is_start_minus_hours() {
        let starts_at = Utc.with_ymd_and_hms(2026, 9, 12, 23, 30, 0).unwrap();
        let cutoff = refund_cutoff(starts_at, 3);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 9, 12, 20, 30, 0).unwrap());
    }

    #[test]
    fn local_formatting_crosses_midnight_correctly() {
        // 01:30 UTC is still the previous evening in New York.
        let instant = Utc.with_ymd_and_hms(2026, 9, 13, 1, 30, 0).unwrap();
        let formatted = format_local(instant, chrono_tz::America::New_York);
        assert!(formatted.starts_with("Sep 12"), "got {formatted}");
    }
}
