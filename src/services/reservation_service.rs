use crate::config::BookingConfig;
use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::external::{CheckoutLineItem, NotifyService, StripeService};
use crate::models::{
    Addon, CreateBookingRequest, CreateBookingResponse, Event, EventDetail, PromoCode,
    Reservation, ReservationAddon, ReservationResponse, ReservationStatus,
};
use crate::pricing::{PriceBreakdown, PricingInput, compute_pricing, money::format_usd};
use crate::services::availability_service::PgAvailabilityLedger;
use crate::services::catalog_service::CatalogService;
use crate::utils::{format_local, parse_timezone, refund_cutoff, require_nonempty, validate_email};
use chrono::Utc;
use uuid::Uuid;

/// The booking orchestrator. Owns the reservation state machine:
/// PENDING -> PAID | CANCELED, PAID -> REFUNDED. No other component
/// writes reservation status.
#[derive(Clone)]
pub struct ReservationService {
    pool: DbPool,
    catalog: CatalogService,
    ledger: PgAvailabilityLedger,
    redemptions: PgRedemptions,
    stripe: StripeService,
    notify: NotifyService,
    booking: BookingConfig,
}

/// Credits a promo redemption, refusing to move `used` past the usage
/// cap. Returns whether the redemption was credited. Kept as a seam so
/// the cap-under-concurrency property is testable in-process.
pub trait RedemptionStore: Send + Sync {
    async fn redeem(&self, promo_id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgRedemptions {
    pool: DbPool,
}

impl PgRedemptions {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RedemptionStore for PgRedemptions {
    async fn redeem(&self, promo_id: Uuid) -> AppResult<bool> {
        // Single atomic statement; concurrent confirmations cannot both
        // observe used < max_uses and increment past the cap.
        let updated = sqlx::query(
            "UPDATE promo_codes SET used = used + 1 \
             WHERE id = $1 AND (max_uses IS NULL OR used < max_uses)",
        )
        .bind(promo_id)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }
}

const RESERVATION_COLUMNS: &str = "id, event_id, qty, first_name, last_name, email, phone, \
     license_plate, notes, unit_price, addons_total, discount, service_fee, tax, total, \
     status, promo_code_id, stripe_session, created_at, updated_at";

impl ReservationService {
    pub fn new(
        pool: DbPool,
        catalog: CatalogService,
        ledger: PgAvailabilityLedger,
        stripe: StripeService,
        notify: NotifyService,
        booking: BookingConfig,
    ) -> Self {
        Self {
            redemptions: PgRedemptions::new(pool.clone()),
            pool,
            catalog,
            ledger,
            stripe,
            notify,
            booking,
        }
    }

    /// End-to-end booking: validate, reserve capacity, price, persist the
    /// PENDING hold, then hand off to the gateway. The capacity guard is
    /// dropped as soon as the hold is durable — never held across the
    /// Stripe round-trip.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> AppResult<CreateBookingResponse> {
        require_nonempty(&request.first_name, "First name")?;
        require_nonempty(&request.last_name, "Last name")?;
        validate_email(&request.email)?;
        if request.qty < 1 {
            return Err(AppError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let detail = self.catalog.get_event(request.event_id).await?;
        let selected_addons = select_addons(&detail, &request.addon_ids)?;

        let now = Utc::now();
        let promo = match &request.promo_code {
            Some(code) if !code.trim().is_empty() => self
                .catalog
                .find_promo_code(code)
                .await?
                .filter(|promo| promo.is_valid_at(now)),
            _ => None,
        };

        // Serialized check-and-reserve; the guard stays alive until the
        // PENDING row is committed so a conflicting booking sees the hold.
        let guard = self.ledger.reserve(detail.event.id, request.qty).await?;

        let breakdown = compute_pricing(PricingInput {
            event: &detail.event,
            tiers: &detail.tiers,
            quantity: request.qty,
            addons: &selected_addons,
            promo: promo.as_ref(),
            now,
        })?;

        let remaining_before = guard.remaining;
        let reservation_id = self
            .insert_pending(&request, &breakdown, promo.as_ref(), &selected_addons)
            .await?;
        drop(guard);

        log::info!(
            "Reservation {reservation_id} pending: event {}, qty {} of {remaining_before} remaining, total {}",
            detail.event.id,
            request.qty,
            format_usd(breakdown.total),
        );

        let tz = parse_timezone(&detail.event.timezone, &self.booking.default_timezone);
        let when = format_local(detail.event.starts_at, tz);

        // A fully discounted order has nothing to charge and the gateway
        // rejects zero-amount lines, so it is confirmed directly.
        let Some(line_items) = checkout_line_items(&detail.event, request.qty, &breakdown, &when)
        else {
            let reservation = self.fetch(reservation_id).await?;
            self.transition_to_paid(&reservation).await?;
            self.send_confirmation(&reservation).await;
            return Ok(CreateBookingResponse {
                reservation_id,
                redirect_url: format!(
                    "{}/success?order={}",
                    self.booking.site_url, reservation_id
                ),
            });
        };

        // Blocking I/O boundary. A failure here must not leave an orphaned
        // hold, so the PENDING row is canceled as compensation.
        let session = match self
            .create_session(detail.event.id, request.email.trim(), &line_items, reservation_id)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                log::error!(
                    "Checkout session failed for reservation {reservation_id}, releasing hold: {err}"
                );
                self.set_status(reservation_id, ReservationStatus::Canceled)
                    .await?;
                return Err(err);
            }
        };

        sqlx::query("UPDATE reservations SET stripe_session = $1, updated_at = now() WHERE id = $2")
            .bind(&session.id)
            .bind(reservation_id)
            .execute(&self.pool)
            .await?;

        Ok(CreateBookingResponse {
            reservation_id,
            redirect_url: session.url,
        })
    }

    async fn insert_pending(
        &self,
        request: &CreateBookingRequest,
        breakdown: &PriceBreakdown,
        promo: Option<&PromoCode>,
        addons: &[Addon],
    ) -> AppResult<Uuid> {
        let reservation_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, event_id, qty, first_name, last_name, email, phone,
                license_plate, notes, unit_price, addons_total, discount,
                service_fee, tax, total, status, promo_code_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(reservation_id)
        .bind(request.event_id)
        .bind(request.qty)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.email.trim())
        .bind(&request.phone)
        .bind(&request.license_plate)
        .bind(&request.notes)
        .bind(breakdown.unit_price)
        .bind(breakdown.addons_total)
        .bind(breakdown.discount)
        .bind(breakdown.service_fee)
        .bind(breakdown.tax)
        .bind(breakdown.total)
        .bind(ReservationStatus::Pending)
        .bind(promo.map(|p| p.id))
        .execute(&mut *tx)
        .await?;

        for addon in addons {
            sqlx::query(
                "INSERT INTO reservation_addons (reservation_id, addon_id, name, price) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(reservation_id)
            .bind(addon.id)
            .bind(&addon.name)
            .bind(addon.price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(reservation_id)
    }

    async fn create_session(
        &self,
        event_id: Uuid,
        customer_email: &str,
        line_items: &[CheckoutLineItem],
        reservation_id: Uuid,
    ) -> AppResult<crate::external::CheckoutSession> {
        let success_url = format!(
            "{}/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.booking.site_url
        );
        let cancel_url = format!("{}/cancel?order={}", self.booking.site_url, reservation_id);
        let metadata = [
            ("reservation_id", reservation_id.to_string()),
            ("event_id", event_id.to_string()),
        ];

        self.stripe
            .create_checkout_session(line_items, customer_email, &metadata, &success_url, &cancel_url)
            .await
    }

    pub async fn get_reservation(&self, reservation_id: Uuid) -> AppResult<ReservationResponse> {
        let reservation = self.fetch(reservation_id).await?;
        let addons = self.fetch_addons(reservation_id).await?;
        Ok(ReservationResponse::from_parts(reservation, addons))
    }

    /// Explicit user cancel of an unpaid reservation. Releases the hold by
    /// virtue of the status change.
    pub async fn cancel(&self, reservation_id: Uuid) -> AppResult<ReservationResponse> {
        let reservation = self.fetch(reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::ValidationError(
                "Only pending reservations can be canceled".to_string(),
            ));
        }
        self.set_status(reservation_id, ReservationStatus::Canceled)
            .await?;
        self.get_reservation(reservation_id).await
    }

    /// Post-payment reversal, allowed until the event's cutoff. The
    /// released capacity becomes available again immediately.
    pub async fn refund(&self, reservation_id: Uuid) -> AppResult<ReservationResponse> {
        let reservation = self.fetch(reservation_id).await?;
        if reservation.status != ReservationStatus::Paid {
            return Err(AppError::ValidationError(
                "Only paid reservations can be refunded".to_string(),
            ));
        }

        let detail = self.catalog.get_event(reservation.event_id).await?;
        let cutoff = refund_cutoff(detail.event.starts_at, detail.event.cutoff_hours);
        if Utc::now() > cutoff {
            return Err(AppError::ValidationError(format!(
                "Refunds closed {} hour(s) before the event",
                detail.event.cutoff_hours
            )));
        }

        self.set_status(reservation_id, ReservationStatus::Refunded)
            .await?;
        self.get_reservation(reservation_id).await
    }

    /// Gateway reported a completed payment for a checkout session.
    /// Unknown sessions are a reconciliation error: logged, never fatal.
    pub async fn handle_payment_succeeded(&self, session_id: &str) -> AppResult<()> {
        let Some(reservation) = self.find_by_session(session_id).await? else {
            log::error!("Reconciliation: payment for unknown checkout session {session_id}");
            return Ok(());
        };

        match reservation.status {
            ReservationStatus::Paid => {
                log::info!("Reservation {} already paid; webhook replay", reservation.id);
                Ok(())
            }
            ReservationStatus::Refunded => {
                log::warn!(
                    "Payment completed for refunded reservation {}; ignoring",
                    reservation.id
                );
                Ok(())
            }
            ReservationStatus::Pending
                if reservation.created_at > self.ledger.hold_horizon() =>
            {
                // Hold still live; the capacity it counted is simply
                // converted from provisional to confirmed.
                if self.transition_to_paid(&reservation).await? {
                    self.send_confirmation(&reservation).await;
                }
                Ok(())
            }
            ReservationStatus::Pending | ReservationStatus::Canceled => {
                // The hold lapsed (or the sweep already canceled it). Only
                // confirm if the spots are still free, checked under the
                // event lock so the check cannot race a live booking.
                match self
                    .ledger
                    .confirm_lapsed(reservation.event_id, reservation.id, reservation.qty)
                    .await
                {
                    Ok(guard) => {
                        // The guard covers only the DB transition; it must
                        // be released before any notification I/O runs.
                        let confirmed = self.transition_to_paid(&reservation).await;
                        drop(guard);
                        if confirmed? {
                            self.send_confirmation(&reservation).await;
                        }
                        Ok(())
                    }
                    Err(AppError::Capacity(err)) => {
                        log::error!(
                            "Reconciliation: payment for lapsed reservation {} but capacity is gone ({err}); \
                             leaving canceled, manual refund required",
                            reservation.id
                        );
                        self.set_status(reservation.id, ReservationStatus::Canceled)
                            .await?;
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Gateway reported the checkout expired or was abandoned.
    pub async fn handle_session_expired(&self, session_id: &str) -> AppResult<()> {
        let Some(reservation) = self.find_by_session(session_id).await? else {
            log::error!("Reconciliation: expiry for unknown checkout session {session_id}");
            return Ok(());
        };
        if reservation.status == ReservationStatus::Pending {
            self.set_status(reservation.id, ReservationStatus::Canceled)
                .await?;
            log::info!("Reservation {} canceled after checkout expiry", reservation.id);
        }
        Ok(())
    }

    /// Flip to PAID and credit the promo. The status update is
    /// conditional: a replayed confirmation changes zero rows and must
    /// not credit the promo a second time. Returns whether this call
    /// performed the transition. DB work only; callers send
    /// notifications after any capacity guard has been released.
    async fn transition_to_paid(&self, reservation: &Reservation) -> AppResult<bool> {
        let updated = sqlx::query(
            "UPDATE reservations SET status = $1, updated_at = now() \
             WHERE id = $2 AND status NOT IN ('PAID', 'REFUNDED')",
        )
        .bind(ReservationStatus::Paid)
        .bind(reservation.id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            log::info!(
                "Reservation {} already settled; duplicate confirmation ignored",
                reservation.id
            );
            return Ok(false);
        }

        if let Some(promo_code_id) = reservation.promo_code_id
            && !self.redemptions.redeem(promo_code_id).await?
        {
            log::warn!(
                "Promo {promo_code_id} at usage cap during confirmation of reservation {}; \
                 not credited",
                reservation.id
            );
        }

        log::info!("Reservation {} confirmed paid", reservation.id);
        Ok(true)
    }

    async fn send_confirmation(&self, reservation: &Reservation) {
        let detail = match self.catalog.get_event(reservation.event_id).await {
            Ok(detail) => detail,
            Err(err) => {
                log::error!("Skipping confirmation message, event load failed: {err}");
                return;
            }
        };
        let tz = parse_timezone(&detail.event.timezone, &self.booking.default_timezone);
        let when = format_local(detail.event.starts_at, tz);

        let subject = format!("Parking confirmed — {}", detail.event.title);
        let html = format!(
            "<p>Your parking is booked!</p>\
             <p><strong>{}</strong><br>{}</p>\
             <p>Spots: {} &middot; Total: {}</p>\
             <p>Reservation: {}</p>",
            detail.event.title,
            when,
            reservation.qty,
            format_usd(reservation.total),
            reservation.id,
        );
        if let Err(err) = self.notify.send_email(&reservation.email, &subject, &html).await {
            log::error!("Confirmation email failed for {}: {err}", reservation.id);
        }

        if let Some(phone) = &reservation.phone {
            let body = format!(
                "Parking confirmed: {} on {}, {} spot(s), {}. Ref {}",
                detail.event.title,
                when,
                reservation.qty,
                format_usd(reservation.total),
                reservation.id,
            );
            if let Err(err) = self.notify.send_sms(phone, &body).await {
                log::error!("Confirmation SMS failed for {}: {err}", reservation.id);
            }
        }
    }

    /// Cancel PENDING holds older than the TTL. The consumption query
    /// already ignores them, so this is bookkeeping for the order list,
    /// not the oversell guard.
    pub async fn expire_stale_holds(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE reservations SET status = $1, updated_at = now() \
             WHERE status = $2 AND created_at < $3",
        )
        .bind(ReservationStatus::Canceled)
        .bind(ReservationStatus::Pending)
        .bind(self.ledger.hold_horizon())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn fetch(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
    }

    async fn find_by_session(&self, session_id: &str) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE stripe_session = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn fetch_addons(&self, reservation_id: Uuid) -> AppResult<Vec<ReservationAddon>> {
        let addons = sqlx::query_as::<_, ReservationAddon>(
            "SELECT id, reservation_id, addon_id, name, price \
             FROM reservation_addons WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(addons)
    }

    async fn set_status(&self, reservation_id: Uuid, status: ReservationStatus) -> AppResult<()> {
        sqlx::query("UPDATE reservations SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status)
            .bind(reservation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Resolve requested add-on ids against the event's catalog. Unknown and
/// duplicated ids are rejected rather than silently dropped; each add-on
/// is charged at most once per order.
fn select_addons(detail: &EventDetail, addon_ids: &[Uuid]) -> AppResult<Vec<Addon>> {
    let mut selected = Vec::with_capacity(addon_ids.len());
    let mut seen = std::collections::HashSet::with_capacity(addon_ids.len());
    for addon_id in addon_ids {
        if !seen.insert(*addon_id) {
            return Err(AppError::ValidationError(format!(
                "Duplicate add-on in selection: {addon_id}"
            )));
        }
        let addon = detail
            .addons
            .iter()
            .find(|addon| addon.id == *addon_id)
            .ok_or_else(|| {
                AppError::ValidationError(format!("Unknown add-on for this event: {addon_id}"))
            })?;
        selected.push(addon.clone());
    }
    Ok(selected)
}

/// Checkout line items mirror the frozen breakdown. With a promo applied
/// the per-line amounts would overstate the charge (the gateway has no
/// negative line items), so the charge collapses to a single discounted
/// line instead. A fully discounted order has nothing to charge — the
/// gateway rejects zero-amount lines — so it yields `None` and the caller
/// confirms it without a session.
fn checkout_line_items(
    event: &Event,
    qty: i64,
    breakdown: &PriceBreakdown,
    when: &str,
) -> Option<Vec<CheckoutLineItem>> {
    if breakdown.total == 0 {
        return None;
    }

    if breakdown.discount > 0 {
        let code = breakdown
            .applied_promo
            .as_ref()
            .map(|promo| promo.code.as_str())
            .unwrap_or("promo");
        return Some(vec![CheckoutLineItem {
            name: format!("{} parking × {qty} (promo {code})", event.title),
            description: Some(format!("Event on {when}")),
            unit_amount: breakdown.total,
            quantity: 1,
        }]);
    }

    let mut items = vec![CheckoutLineItem {
        name: format!("{} parking", event.title),
        description: Some(format!("Event on {when}")),
        unit_amount: breakdown.unit_price,
        quantity: qty,
    }];
    if breakdown.addons_total > 0 {
        items.push(CheckoutLineItem {
            name: "Add-ons".to_string(),
            description: None,
            unit_amount: breakdown.addons_total,
            quantity: 1,
        });
    }
    if breakdown.service_fee > 0 {
        items.push(CheckoutLineItem {
            name: "Service fee".to_string(),
            description: None,
            unit_amount: breakdown.service_fee,
            quantity: 1,
        });
    }
    if breakdown.tax > 0 {
        items.push(CheckoutLineItem {
            name: "Estimated tax".to_string(),
            description: None,
            unit_amount: breakdown.tax,
            quantity: 1,
        });
    }
    Some(items)
}
