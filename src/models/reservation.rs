use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Order lifecycle. Transitions are owned by `ReservationService`:
/// PENDING -> PAID (payment confirmed), PENDING -> CANCELED (abandoned or
/// explicit cancel), PAID -> REFUNDED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Pending,
    Paid,
    Canceled,
    Refunded,
}

/// One customer's order for N spots, with the price snapshot frozen at
/// creation time. Later tier or catalog edits never alter these amounts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub qty: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub license_plate: Option<String>,
    pub notes: Option<String>,
    pub unit_price: i64,
    pub addons_total: i64,
    pub discount: i64,
    pub service_fee: i64,
    pub tax: i64,
    pub total: i64,
    pub status: ReservationStatus,
    pub promo_code_id: Option<Uuid>,
    pub stripe_session: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot copy of a selected add-on, owned by the reservation.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ReservationAddon {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub addon_id: Uuid,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub event_id: Uuid,
    pub qty: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub license_plate: Option<String>,
    pub notes: Option<String>,
    pub promo_code: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateBookingResponse {
    pub reservation_id: Uuid,
    pub redirect_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub qty: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub license_plate: Option<String>,
    pub notes: Option<String>,
    pub unit_price: i64,
    pub addons_total: i64,
    pub discount: i64,
    pub service_fee: i64,
    pub tax: i64,
    pub total: i64,
    pub status: ReservationStatus,
    pub addons: Vec<ReservationAddon>,
    pub created_at: DateTime<Utc>,
}

impl ReservationResponse {
    pub fn from_parts(reservation: Reservation, addons: Vec<ReservationAddon>) -> Self {
        Self {
            id: reservation.id,
            event_id: reservation.event_id,
            qty: reservation.qty,
            first_name: reservation.first_name,
            last_name: reservation.last_name,
            email: reservation.email,
            phone: reservation.phone,
            license_plate: reservation.license_plate,
            notes: reservation.notes,
            unit_price: reservation.unit_price,
            addons_total: reservation.addons_total,
            discount: reservation.discount,
            service_fee: reservation.service_fee,
            tax: reservation.tax,
            total: reservation.total,
            status: reservation.status,
            addons,
            created_at: reservation.created_at,
        }
    }
}
