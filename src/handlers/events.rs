use crate::models::{ApiResponse, EventResponse};
use crate::services::{CatalogService, PgAvailabilityLedger};
use actix_web::{HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    responses(
        (status = 200, description = "Upcoming events with availability")
    )
)]
pub async fn list_events(
    catalog: web::Data<CatalogService>,
    ledger: web::Data<PgAvailabilityLedger>,
) -> Result<HttpResponse> {
    let details = match catalog.list_upcoming_events().await {
        Ok(details) => details,
        Err(e) => return Ok(e.error_response()),
    };

    let mut events = Vec::with_capacity(details.len());
    for detail in details {
        match ledger.snapshot(detail.event.id).await {
            Ok(availability) => events.push(EventResponse::from_detail(detail, availability)),
            Err(e) => return Ok(e.error_response()),
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(events)))
}

#[utoipa::path(
    get,
    path = "/events/{slug}",
    tag = "events",
    params(
        ("slug" = String, Path, description = "Event slug")
    ),
    responses(
        (status = 200, description = "Event detail with tiers, add-ons and availability"),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn get_event(
    catalog: web::Data<CatalogService>,
    ledger: web::Data<PgAvailabilityLedger>,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    let detail = match catalog.get_event_by_slug(&slug).await {
        Ok(detail) => detail,
        Err(e) => return Ok(e.error_response()),
    };
    match ledger.snapshot(detail.event.id).await {
        Ok(availability) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success(EventResponse::from_detail(detail, availability)))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{id}/availability",
    tag = "events",
    params(
        ("id" = Uuid, Path, description = "Event id")
    ),
    responses(
        (status = 200, description = "Capacity, booked and remaining counts"),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn get_availability(
    ledger: web::Data<PgAvailabilityLedger>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match ledger.snapshot(*event_id).await {
        Ok(availability) => Ok(HttpResponse::Ok().json(ApiResponse::success(availability))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn events_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("/{id}/availability", web::get().to(get_availability))
            .route("/{slug}", web::get().to(get_event)),
    );
}
