//! The pricing engine: money rounding, active-tier resolution, promo code
//! validity, and the fixed-order fee/tax pipeline. Everything in here is a
//! pure function of its inputs and "now" — no I/O, no clocks.

pub mod calculator;
pub mod money;
pub mod promo;
pub mod tier;

pub use calculator::{PriceBreakdown, PricingInput, compute_pricing};
pub use money::{Cents, round_fraction};
pub use promo::AppliedPromo;
pub use tier::active_tier;
