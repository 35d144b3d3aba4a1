pub mod availability_service;
pub mod catalog_service;
pub mod reservation_service;

pub use availability_service::{
    AvailabilityLedger, CapacityGuard, CapacityStore, PgAvailabilityLedger, PgCapacityStore,
};
pub use catalog_service::CatalogService;
pub use reservation_service::{PgRedemptions, RedemptionStore, ReservationService};
