use crate::models::PromoCode;
use crate::pricing::money::{Cents, round_fraction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// The discount a valid promo code yielded for a concrete subtotal.
/// "No promo applied" is represented by `Option::None` on the pricing
/// result, never by an error — stale or mistyped codes degrade silently.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedPromo {
    pub id: Uuid,
    pub code: String,
    pub amount: Cents,
}

impl PromoCode {
    /// A code is usable when `now` is inside its validity window and its
    /// usage cap (if any) has not been reached.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.starts_at.is_some_and(|starts_at| now < starts_at) {
            return false;
        }
        if self.ends_at.is_some_and(|ends_at| now > ends_at) {
            return false;
        }
        if self.max_uses.is_some_and(|max_uses| self.used >= max_uses) {
            return false;
        }
        true
    }

    /// Discount for a subtotal: percentage codes round per the money
    /// rules, flat codes return their face value (the caller floors the
    /// discounted subtotal at zero, so the effective discount caps at the
    /// subtotal).
    pub fn discount_for(&self, subtotal: Cents) -> Cents {
        if let Some(percent) = self.percent {
            round_fraction(subtotal, percent)
        } else {
            self.amount_off.unwrap_or(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn code(
        percent: Option<f64>,
        amount_off: Option<i64>,
        starts_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
        max_uses: Option<i64>,
        used: i64,
    ) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "GAMEDAY".to_string(),
            percent,
            amount_off,
            starts_at,
            ends_at,
            max_uses,
            used,
            created_at: Utc::now(),
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn open_ended_code_is_valid() {
        let promo = code(Some(0.1), None, None, None, None, 99);
        assert!(promo.is_valid_at(at(1)));
    }

    #[test]
    fn invalid_before_window_opens() {
        let promo = code(Some(0.1), None, Some(at(10)), None, None, 0);
        assert!(!promo.is_valid_at(at(9)));
        assert!(promo.is_valid_at(at(10)));
    }

    #[test]
    fn invalid_after_window_closes() {
        let promo = code(Some(0.1), None, None, Some(at(10)), None, 0);
        assert!(promo.is_valid_at(at(10)));
        assert!(!promo.is_valid_at(at(11)));
    }

    #[test]
    fn invalid_once_usage_cap_reached() {
        let promo = code(Some(0.1), None, None, None, Some(5), 5);
        assert!(!promo.is_valid_at(at(1)));
        let promo = code(Some(0.1), None, None, None, Some(5), 4);
        assert!(promo.is_valid_at(at(1)));
    }

    #[test]
    fn percent_discount_rounds_per_stage() {
        let promo = code(Some(0.1), None, None, None, None, 0);
        assert_eq!(promo.discount_for(7000), 700);
        // 333 * 0.1 = 33.3 -> 33
        assert_eq!(promo.discount_for(333), 33);
    }

    #[test]
    fn flat_discount_is_face_value() {
        let promo = code(None, Some(1500), None, None, None, 0);
        assert_eq!(promo.discount_for(7000), 1500);
        // Can exceed the subtotal; the calculator floors at zero.
        assert_eq!(promo.discount_for(1000), 1500);
    }
}
