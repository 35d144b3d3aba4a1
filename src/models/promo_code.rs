use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Global discount token. Exactly one of `percent` / `amount_off` is set
/// (enforced by a DB check); `used` only ever moves forward, on confirmed
/// payment of an order that referenced the code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub percent: Option<f64>,
    pub amount_off: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub used: i64,
    pub created_at: DateTime<Utc>,
}
