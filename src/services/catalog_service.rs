use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Addon, Event, EventDetail, PromoCode};
use chrono::Utc;
use uuid::Uuid;

/// Read side of the event catalog: events with their owned tiers and
/// add-ons, and global promo codes. All mutation of capacity and promo
/// usage goes through the ledger and orchestrator, never through here.
#[derive(Clone)]
pub struct CatalogService {
    pool: DbPool,
}

const EVENT_COLUMNS: &str = "id, slug, title, description, starts_at, gates_open_at, timezone, \
     capacity, base_price, service_fee_pct, tax_pct, cutoff_hours, created_at, updated_at";

impl CatalogService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_event(&self, event_id: Uuid) -> AppResult<EventDetail> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        self.load_detail(event).await
    }

    pub async fn get_event_by_slug(&self, slug: &str) -> AppResult<EventDetail> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        self.load_detail(event).await
    }

    pub async fn list_upcoming_events(&self) -> AppResult<Vec<EventDetail>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE starts_at >= $1 ORDER BY starts_at ASC"
        ))
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(events.len());
        for event in events {
            details.push(self.load_detail(event).await?);
        }
        Ok(details)
    }

    async fn load_detail(&self, event: Event) -> AppResult<EventDetail> {
        // Declared order matters: tier resolution is first-wins.
        let tiers = sqlx::query_as::<_, crate::models::PriceTier>(
            "SELECT id, event_id, name, starts_at, ends_at, price, position \
             FROM price_tiers WHERE event_id = $1 ORDER BY position ASC",
        )
        .bind(event.id)
        .fetch_all(&self.pool)
        .await?;

        let addons = sqlx::query_as::<_, Addon>(
            "SELECT id, event_id, name, description, price \
             FROM addons WHERE event_id = $1 ORDER BY name ASC",
        )
        .bind(event.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(EventDetail {
            event,
            tiers,
            addons,
        })
    }

    /// Look up a promo code by its (case-insensitive) code string. Returns
    /// `None` for unknown codes; validity at a given instant is the
    /// caller's check.
    pub async fn find_promo_code(&self, code: &str) -> AppResult<Option<PromoCode>> {
        let promo = sqlx::query_as::<_, PromoCode>(
            "SELECT id, code, percent, amount_off, starts_at, ends_at, max_uses, used, created_at \
             FROM promo_codes WHERE code = $1",
        )
        .bind(code.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(promo)
    }
}
