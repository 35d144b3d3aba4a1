use crate::models::{ApiResponse, CreateBookingRequest};
use crate::services::ReservationService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Reservation created; redirect to hosted checkout"),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Unknown event"),
        (status = 409, description = "Sold out / insufficient capacity / over per-order limit"),
        (status = 502, description = "Payment gateway unavailable, retryable")
    )
)]
pub async fn create_booking(
    reservations: web::Data<ReservationService>,
    request: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse> {
    match reservations.create_booking(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Reservation with its frozen line-item snapshot"),
        (status = 404, description = "Unknown reservation")
    )
)]
pub async fn get_booking(
    reservations: web::Data<ReservationService>,
    reservation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match reservations.get_reservation(*reservation_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/cancel",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Pending reservation canceled, hold released"),
        (status = 400, description = "Reservation is not pending"),
        (status = 404, description = "Unknown reservation")
    )
)]
pub async fn cancel_booking(
    reservations: web::Data<ReservationService>,
    reservation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match reservations.cancel(*reservation_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            response,
            "Reservation canceled".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/bookings/{id}/refund",
    tag = "bookings",
    params(
        ("id" = Uuid, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Paid reservation refunded, capacity released"),
        (status = 400, description = "Not refundable (not paid, or past the cutoff)"),
        (status = 404, description = "Unknown reservation")
    )
)]
pub async fn refund_booking(
    reservations: web::Data<ReservationService>,
    reservation_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match reservations.refund(*reservation_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            response,
            "Reservation refunded".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn bookings_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create_booking))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/cancel", web::post().to(cancel_booking))
            .route("/{id}/refund", web::post().to(refund_booking)),
    );
}
