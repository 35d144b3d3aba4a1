use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::pricing::PriceBreakdown;
use crate::pricing::promo::AppliedPromo;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::get_availability,
        handlers::bookings::create_booking,
        handlers::bookings::get_booking,
        handlers::bookings::cancel_booking,
        handlers::bookings::refund_booking,
    ),
    components(
        schemas(
            Event,
            PriceTier,
            Addon,
            AvailabilitySnapshot,
            EventResponse,
            ReservationStatus,
            ReservationAddon,
            CreateBookingRequest,
            CreateBookingResponse,
            ReservationResponse,
            PriceBreakdown,
            AppliedPromo,
        )
    ),
    tags(
        (name = "events", description = "Event catalog and availability"),
        (name = "bookings", description = "Reservations and checkout")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
