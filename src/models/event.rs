use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A bookable occasion with a fixed number of parking spots. Monetary
/// columns are integer cents; rates are fractions in `[0, 1]`.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub gates_open_at: Option<DateTime<Utc>>,
    pub timezone: String,
    pub capacity: i64,
    pub base_price: i64,
    pub service_fee_pct: f64,
    pub tax_pct: f64,
    pub cutoff_hours: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time-windowed price override. Windows may overlap; resolution is
/// first-wins in `position` order.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct PriceTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub price: i64,
    pub position: i32,
}

/// Flat-fee extra attached to an order (not per spot).
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Addon {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
}

/// Event with its owned tiers (in declared order) and add-ons.
#[derive(Debug, Clone)]
pub struct EventDetail {
    pub event: Event,
    pub tiers: Vec<PriceTier>,
    pub addons: Vec<Addon>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AvailabilitySnapshot {
    pub capacity: i64,
    pub booked: i64,
    pub remaining: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub gates_open_at: Option<DateTime<Utc>>,
    pub timezone: String,
    pub base_price: i64,
    pub service_fee_pct: f64,
    pub tax_pct: f64,
    pub cutoff_hours: i64,
    pub tiers: Vec<PriceTier>,
    pub addons: Vec<Addon>,
    pub availability: AvailabilitySnapshot,
}

impl EventResponse {
    pub fn from_detail(detail: EventDetail, availability: AvailabilitySnapshot) -> Self {
        Self {
            id: detail.event.id,
            slug: detail.event.slug,
            title: detail.event.title,
            description: detail.event.description,
            starts_at: detail.event.starts_at,
            gates_open_at: detail.event.gates_open_at,
            timezone: detail.event.timezone,
            base_price: detail.event.base_price,
            service_fee_pct: detail.event.service_fee_pct,
            tax_pct: detail.event.tax_pct,
            cutoff_hours: detail.event.cutoff_hours,
            tiers: detail.tiers,
            addons: detail.addons,
            availability,
        }
    }
}
