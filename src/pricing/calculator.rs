use crate::error::{AppError, AppResult};
use crate::models::{Addon, Event, PriceTier, PromoCode};
use crate::pricing::money::{Cents, round_fraction};
use crate::pricing::promo::AppliedPromo;
use crate::pricing::tier::active_tier;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Inputs to one pricing computation. `promo` must already have passed
/// `is_valid_at`; an invalid code is simply not passed in.
#[derive(Debug)]
pub struct PricingInput<'a> {
    pub event: &'a Event,
    pub tiers: &'a [PriceTier],
    pub quantity: i64,
    pub addons: &'a [Addon],
    pub promo: Option<&'a PromoCode>,
    pub now: DateTime<Utc>,
}

/// The frozen line-item breakdown persisted onto a reservation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceBreakdown {
    pub unit_price: Cents,
    pub addons_total: Cents,
    pub discount: Cents,
    pub subtotal: Cents,
    pub service_fee: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub applied_promo: Option<AppliedPromo>,
}

/// Compute the charge for a booking. The stage order is load-bearing:
/// tiered unit price, flat add-ons, promo discount (subtotal floored at
/// zero), service fee on the discounted subtotal, tax on subtotal plus
/// fee. Each percentage stage rounds independently.
pub fn compute_pricing(input: PricingInput<'_>) -> AppResult<PriceBreakdown> {
    if input.quantity < 1 {
        return Err(AppError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }

    if let Some(addon) = input
        .addons
        .iter()
        .find(|addon| addon.event_id != input.event.id)
    {
        return Err(AppError::ValidationError(format!(
            "Add-on '{}' does not belong to this event",
            addon.name
        )));
    }

    let unit_price = active_tier(input.tiers, input.now)
        .map(|tier| tier.price)
        .unwrap_or(input.event.base_price);

    // Add-ons are a flat charge per order, independent of quantity.
    let addons_total: Cents = input.addons.iter().map(|addon| addon.price).sum();
    let mut subtotal = unit_price * input.quantity + addons_total;

    let mut discount = 0;
    let applied_promo = input.promo.map(|promo| {
        discount = promo.discount_for(subtotal);
        subtotal = (subtotal - discount).max(0);
        AppliedPromo {
            id: promo.id,
            code: promo.code.clone(),
            amount: discount,
        }
    });

    let service_fee = round_fraction(subtotal, input.event.service_fee_pct);
    let taxable = subtotal + service_fee;
    let tax = round_fraction(taxable, input.event.tax_pct);
    let total = taxable + tax;

    Ok(PriceBreakdown {
        unit_price,
        addons_total,
        discount,
        subtotal,
        service_fee,
        tax,
        total,
        applied_promo,
    })
}
