pub mod notify;
pub mod stripe;

pub use notify::NotifyService;
pub use stripe::{CheckoutLineItem, CheckoutSession, StripeService};
