use crate::models::PriceTier;
use chrono::{DateTime, Utc};

/// Resolve the tier in effect at `now`.
///
/// A tier is a candidate when `now` falls inside its window; either bound
/// may be open, and both comparisons are inclusive. Among multiple
/// candidates the first in declared order wins — catalog authors control
/// precedence by ordering, not by price or window width. `None` means the
/// caller charges the event's base price.
pub fn active_tier(tiers: &[PriceTier], now: DateTime<Utc>) -> Option<&PriceTier> {
    tiers.iter().find(|tier| {
        tier.starts_at.map_or(true, |starts_at| now >= starts_at)
            && tier.ends_at.map_or(true, |ends_at| now <= ends_at)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn tier(
        name: &str,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
        price: i64,
        position: i32,
    ) -> PriceTier {
        PriceTier {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: name.to_string(),
            starts_at,
            ends_at,
            price,
            position,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn no_tiers_resolves_to_none() {
        assert!(active_tier(&[], at(10, 12)).is_none());
    }

    #[test]
    fn open_bounds_always_match() {
        let tiers = vec![tier("Anytime", None, None, 3000, 0)];
        assert_eq!(active_tier(&tiers, at(1, 0)).unwrap().name, "Anytime");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let tiers = vec![tier("Early Bird", Some(at(1, 0)), Some(at(5, 0)), 3000, 0)];
        assert!(active_tier(&tiers, at(1, 0)).is_some());
        assert!(active_tier(&tiers, at(5, 0)).is_some());
        assert!(active_tier(&tiers, at(5, 1)).is_none());
    }

    #[test]
    fn before_start_is_not_a_candidate() {
        let tiers = vec![tier("Later", Some(at(10, 0)), None, 2500, 0)];
        assert!(active_tier(&tiers, at(9, 23)).is_none());
        assert!(active_tier(&tiers, at(10, 0)).is_some());
    }

    #[test]
    fn first_declared_tier_wins_among_overlaps() {
        // Both windows cover "now"; the cheaper one comes second and must
        // NOT be chosen.
        let tiers = vec![
            tier("Standard", Some(at(1, 0)), Some(at(20, 0)), 4000, 0),
            tier("Flash Sale", Some(at(1, 0)), Some(at(20, 0)), 2000, 1),
        ];
        assert_eq!(active_tier(&tiers, at(10, 0)).unwrap().name, "Standard");
    }

    #[test]
    fn exactly_one_tier_or_none() {
        let tiers = vec![
            tier("A", Some(at(1, 0)), Some(at(2, 0)), 1000, 0),
            tier("B", Some(at(3, 0)), Some(at(4, 0)), 2000, 1),
        ];
        assert_eq!(active_tier(&tiers, at(1, 12)).unwrap().name, "A");
        assert_eq!(active_tier(&tiers, at(3, 12)).unwrap().name, "B");
        assert!(active_tier(&tiers, at(2, 12)).is_none());
    }
}
