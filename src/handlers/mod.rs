pub mod bookings;
pub mod events;
pub mod webhook;

pub use bookings::bookings_config;
pub use events::events_config;
pub use webhook::webhook_config;
